// Relevance Grader
// Batch-level yes/no judgement of retrieved chunks against the question

use std::sync::Arc;

use crate::graph::state::RelevanceDecision;
use crate::llm::{CompletionRequest, LlmError, LlmProvider};
use crate::rag::RetrievedChunk;

/// What the model's reply actually said.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedRelevance {
    Relevant,
    NotRelevant,
    Unparseable,
}

/// Grader decision plus the reason when it came from the fallback rule.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeVerdict {
    pub decision: RelevanceDecision,
    pub fallback_reason: Option<String>,
}

impl GradeVerdict {
    fn parsed(decision: RelevanceDecision) -> Self {
        Self {
            decision,
            fallback_reason: None,
        }
    }
}

const POSITIVE: [&str; 4] = ["yes", "relevant", "helpful", "useful"];
const NEGATIVE: [&str; 4] = ["no", "irrelevant", "unrelated", "unhelpful"];
/// How many preceding words a "not" reaches.
const NEGATION_WINDOW: usize = 4;

pub struct RelevanceGrader {
    llm: Arc<dyn LlmProvider>,
    excerpt_chars: usize,
    fail_open: bool,
}

impl RelevanceGrader {
    pub fn new(llm: Arc<dyn LlmProvider>, excerpt_chars: usize, fail_open: bool) -> Self {
        Self {
            llm,
            excerpt_chars,
            fail_open,
        }
    }

    pub fn fail_open(&self) -> bool {
        self.fail_open
    }

    /// Grades the whole batch. An empty batch is NOT_RELEVANT without a model call.
    ///
    /// Call failures are returned to the caller, which owns the fail-open
    /// policy for them; unparseable replies are resolved here.
    pub async fn grade(
        &self,
        question: &str,
        documents: &[RetrievedChunk],
    ) -> Result<GradeVerdict, LlmError> {
        if documents.is_empty() {
            return Ok(GradeVerdict::parsed(RelevanceDecision::NotRelevant));
        }

        let prompt = grading_prompt(question, documents, self.excerpt_chars);
        let request = CompletionRequest::new(prompt).temperature(0.0).max_tokens(8);
        let reply = self.llm.complete(request).await?;

        let verdict = match parse_relevance(&reply) {
            ParsedRelevance::Relevant => GradeVerdict::parsed(RelevanceDecision::Relevant),
            ParsedRelevance::NotRelevant => GradeVerdict::parsed(RelevanceDecision::NotRelevant),
            ParsedRelevance::Unparseable => {
                let decision = if self.fail_open {
                    RelevanceDecision::Relevant
                } else {
                    RelevanceDecision::NotRelevant
                };
                GradeVerdict {
                    decision,
                    fallback_reason: Some(format!(
                        "unparseable grading reply: {:?}",
                        truncate_chars(reply.trim(), 80)
                    )),
                }
            }
        };

        Ok(verdict)
    }
}

pub fn grading_prompt(question: &str, documents: &[RetrievedChunk], excerpt_chars: usize) -> String {
    let sources = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Source {} ({}):\n{}",
                i + 1,
                doc.metadata.file_name,
                truncate_chars(doc.text.trim(), excerpt_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        concat!(
            "You are checking course material for a computer science tutor.\n",
            "Decide whether the sources below, taken together, contain information ",
            "that helps answer the student's question.\n\n",
            "Question: {}\n\n",
            "{}\n\n",
            "Reply with exactly one word: \"yes\" if the sources are relevant, ",
            "\"no\" if they are off-topic or unhelpful.\n",
            "Reply:"
        ),
        question.trim(),
        sources
    )
}

/// Reads a yes/no verdict out of free-form model text.
///
/// A decisive first word wins ("not" counts as negative there). Otherwise
/// exactly one polarity must appear anywhere in the text. A positive word
/// within a few words after "not" (or an `n't` contraction) reads as negative.
pub fn parse_relevance(text: &str) -> ParsedRelevance {
    let lower = expand_negations(&text.to_lowercase());
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return ParsedRelevance::Unparseable;
    }

    let polarity_at = |idx: usize| -> Option<bool> {
        let word = words[idx];
        if NEGATIVE.contains(&word) {
            return Some(false);
        }
        if POSITIVE.contains(&word) {
            let negated = words[idx.saturating_sub(NEGATION_WINDOW)..idx].contains(&"not");
            return Some(!negated);
        }
        None
    };

    if words[0] == "not" {
        return ParsedRelevance::NotRelevant;
    }
    match polarity_at(0) {
        Some(true) => return ParsedRelevance::Relevant,
        Some(false) => return ParsedRelevance::NotRelevant,
        None => {}
    }

    let mut positive = false;
    let mut negative = false;
    for idx in 0..words.len() {
        match polarity_at(idx) {
            Some(true) => positive = true,
            Some(false) => negative = true,
            None => {}
        }
    }

    match (positive, negative) {
        (true, false) => ParsedRelevance::Relevant,
        (false, true) => ParsedRelevance::NotRelevant,
        _ => ParsedRelevance::Unparseable,
    }
}

/// "aren't" -> "are not", "don't" -> "do not", for straight and curly apostrophes.
fn expand_negations(text: &str) -> String {
    text.replace("n't", " not").replace("n\u{2019}t", " not")
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{unavailable, ScriptedLlm};
    use crate::rag::mock::chunk;

    #[test]
    fn parses_plain_answers() {
        assert_eq!(parse_relevance("yes"), ParsedRelevance::Relevant);
        assert_eq!(parse_relevance(" Yes."), ParsedRelevance::Relevant);
        assert_eq!(parse_relevance("NO"), ParsedRelevance::NotRelevant);
        assert_eq!(parse_relevance("Relevant"), ParsedRelevance::Relevant);
        assert_eq!(parse_relevance("irrelevant"), ParsedRelevance::NotRelevant);
    }

    #[test]
    fn leading_negative_wins_over_later_words() {
        assert_eq!(
            parse_relevance("no, these documents are not relevant"),
            ParsedRelevance::NotRelevant
        );
        assert_eq!(parse_relevance("yes and no"), ParsedRelevance::Relevant);
    }

    #[test]
    fn negated_positive_counts_as_negative() {
        assert_eq!(
            parse_relevance("The documents are not relevant."),
            ParsedRelevance::NotRelevant
        );
        assert_eq!(
            parse_relevance("Not relevant to the question"),
            ParsedRelevance::NotRelevant
        );
        assert_eq!(
            parse_relevance("These sources are relevant"),
            ParsedRelevance::Relevant
        );
    }

    #[test]
    fn contractions_negate_the_positive_word() {
        for reply in [
            "The sources aren't relevant.",
            "These documents isn't relevant",
            "I don't think they are relevant",
            "It doesn't look helpful",
            "That wasn't useful for this question",
            "They aren\u{2019}t relevant",
        ] {
            assert_eq!(parse_relevance(reply), ParsedRelevance::NotRelevant, "{}", reply);
        }
    }

    #[test]
    fn leading_not_is_decisive() {
        assert_eq!(parse_relevance("Not sure"), ParsedRelevance::NotRelevant);
        assert_eq!(parse_relevance("Not really."), ParsedRelevance::NotRelevant);
    }

    #[test]
    fn ambiguous_or_empty_is_unparseable() {
        assert_eq!(parse_relevance(""), ParsedRelevance::Unparseable);
        assert_eq!(parse_relevance("   \n"), ParsedRelevance::Unparseable);
        assert_eq!(parse_relevance("maybe"), ParsedRelevance::Unparseable);
        assert_eq!(
            parse_relevance("Source 1 is relevant but Source 2 is irrelevant"),
            ParsedRelevance::Unparseable
        );
    }

    #[test]
    fn words_are_not_matched_inside_other_words() {
        // "know" and "nothing" must not read as "no"
        assert_eq!(parse_relevance("I know nothing"), ParsedRelevance::Unparseable);
    }

    #[test]
    fn prompt_labels_and_truncates_sources() {
        let long_text = "a".repeat(400);
        let docs = vec![
            chunk("Recursion is when a function calls itself.", "cs101.pdf", Some("12"), 0.9),
            chunk(&long_text, "cs101.pdf", None, 0.5),
        ];

        let prompt = grading_prompt("What is recursion?", &docs, 300);

        assert!(prompt.contains("Question: What is recursion?"));
        assert!(prompt.contains("Source 1 (cs101.pdf):\nRecursion is when"));
        assert!(prompt.contains("Source 2 (cs101.pdf):"));
        assert!(prompt.contains(&format!("{}...", "a".repeat(300))));
        assert!(!prompt.contains(&"a".repeat(301)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[tokio::test]
    async fn empty_batch_skips_model() {
        let llm = Arc::new(ScriptedLlm::replying("yes"));
        let grader = RelevanceGrader::new(llm.clone(), 300, true);

        let verdict = grader.grade("What is recursion?", &[]).await.unwrap();

        assert_eq!(verdict.decision, RelevanceDecision::NotRelevant);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn grading_uses_deterministic_sampling() {
        let llm = Arc::new(ScriptedLlm::replying("no"));
        let grader = RelevanceGrader::new(llm.clone(), 300, true);
        let docs = vec![chunk("Pointers hold addresses.", "cs101.pdf", None, 0.4)];

        let verdict = grader.grade("What is recursion?", &docs).await.unwrap();

        assert_eq!(verdict, GradeVerdict::parsed(RelevanceDecision::NotRelevant));
        let request = &llm.requests()[0];
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(8));
    }

    #[tokio::test]
    async fn unparseable_reply_follows_fail_open_setting() {
        let docs = vec![chunk("Stacks are LIFO.", "cs101.pdf", None, 0.6)];

        let open = RelevanceGrader::new(Arc::new(ScriptedLlm::replying("hmm")), 300, true);
        let verdict = open.grade("What is a stack?", &docs).await.unwrap();
        assert_eq!(verdict.decision, RelevanceDecision::Relevant);
        assert!(verdict.fallback_reason.unwrap().contains("hmm"));

        let closed = RelevanceGrader::new(Arc::new(ScriptedLlm::replying("hmm")), 300, false);
        let verdict = closed.grade("What is a stack?", &docs).await.unwrap();
        assert_eq!(verdict.decision, RelevanceDecision::NotRelevant);
        assert!(verdict.fallback_reason.is_some());
    }

    #[tokio::test]
    async fn call_failure_is_returned() {
        let llm = Arc::new(ScriptedLlm::sequence(vec![Err(unavailable())]));
        let grader = RelevanceGrader::new(llm, 300, true);
        let docs = vec![chunk("Stacks are LIFO.", "cs101.pdf", None, 0.6)];

        assert!(grader.grade("What is a stack?", &docs).await.is_err());
    }
}
