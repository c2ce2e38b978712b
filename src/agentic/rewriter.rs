// Query Rewriter
// Rephrases a question that retrieved nothing useful

use std::sync::Arc;

use crate::llm::{CompletionRequest, LlmError, LlmProvider};

const LABEL_PREFIXES: [&str; 5] = [
    "rewritten question:",
    "rewritten query:",
    "search query:",
    "query:",
    "question:",
];

/// Next retrieval query. `fell_back` is set when the model gave nothing
/// usable and the input was returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub query: String,
    pub fell_back: bool,
}

pub struct QueryRewriter {
    llm: Arc<dyn LlmProvider>,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn rewrite(&self, question: &str) -> Result<Rewrite, LlmError> {
        let request = CompletionRequest::new(rewrite_prompt(question))
            .temperature(0.3)
            .max_tokens(96)
            .stop(&["\n\n"]);
        let reply = self.llm.complete(request).await?;

        Ok(match clean_rewrite(&reply) {
            Some(query) => Rewrite {
                query,
                fell_back: false,
            },
            None => Rewrite {
                query: question.to_string(),
                fell_back: true,
            },
        })
    }
}

pub fn rewrite_prompt(question: &str) -> String {
    format!(
        concat!(
            "A search over computer science course material found nothing useful for this question.\n",
            "Rewrite it as a single search query that is more likely to match textbook passages: ",
            "expand abbreviations, use the standard technical terms and drop conversational phrasing. ",
            "Keep the meaning unchanged.\n\n",
            "Question: {}\n\n",
            "Rewritten question:"
        ),
        question.trim()
    )
}

/// First line of the reply that holds a query, without labels or quotes.
/// Preamble lines ending in a colon are skipped.
pub fn clean_rewrite(raw: &str) -> Option<String> {
    raw.lines().find_map(clean_line)
}

fn clean_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.ends_with(':') {
        return None;
    }

    let mut text = line;
    for prefix in LABEL_PREFIXES {
        if text.len() >= prefix.len()
            && text.is_char_boundary(prefix.len())
            && text[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            text = text[prefix.len()..].trim_start();
            break;
        }
    }

    let text = text
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '`'))
        .trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
