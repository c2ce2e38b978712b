// Answer Generator
// Grounded, cited answer for an introductory CS student

use std::sync::Arc;

use crate::llm::{CompletionRequest, LlmError, LlmProvider};
use crate::rag::{ChunkMetadata, RetrievedChunk};

/// Returned instead of calling the model when retrieval found nothing.
pub const NO_MATERIAL_ANSWER: &str = "I couldn't find anything in the course materials that covers this question, so I don't have enough information to answer it reliably. Try rephrasing the question with the key terms from your lecture, or check the textbook index for the relevant chapter.";

pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            llm,
            temperature,
            max_tokens,
        }
    }

    pub async fn generate(
        &self,
        question: &str,
        documents: &[RetrievedChunk],
    ) -> Result<String, LlmError> {
        if documents.is_empty() {
            return Ok(NO_MATERIAL_ANSWER.to_string());
        }

        let request = CompletionRequest::new(answer_prompt(question, documents))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        self.llm.complete(request).await
    }
}

/// `[Source N: file, p. X]`, page omitted when unknown.
pub fn citation_label(index: usize, metadata: &ChunkMetadata) -> String {
    match metadata.page_label.as_deref() {
        Some(page) if !page.trim().is_empty() => {
            format!("[Source {}: {}, p. {}]", index, metadata.file_name, page.trim())
        }
        _ => format!("[Source {}: {}]", index, metadata.file_name),
    }
}

pub fn answer_prompt(question: &str, documents: &[RetrievedChunk]) -> String {
    let context = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("{}\n{}", citation_label(i + 1, &doc.metadata), doc.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        concat!(
            "You are an expert Computer Science mentor helping a student in an introductory course.\n\n",
            "Course material:\n{}\n\n",
            "Student question: {}\n\n",
            "Instructions:\n",
            "- Answer using ONLY the course material above. Do not add facts it does not support.\n",
            "- If the material does not cover the question, or covers only part of it, say so plainly instead of guessing.\n",
            "- Cite every claim with its source label exactly as written above, e.g. [Source 1: file.pdf, p. 12].\n",
            "- If the question has several parts, answer each part.\n",
            "- Explain at a beginner's level: define jargon, prefer short examples or analogies, and keep an encouraging tone.\n\n",
            "Answer:"
        ),
        context,
        question.trim()
    )
}
