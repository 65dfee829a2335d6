//! Prompt templates for RAG generation

use crate::types::ChunkRecord;

/// Separator placed between context chunks
pub const CONTEXT_DELIMITER: &str = "\n---\n";

/// Reply the model is told to give when the context lacks the answer
pub const NOT_FOUND_ANSWER: &str = "The answer is not available in the documents provided.";

/// Returned in place of an answer when the generation backend is unavailable
pub const FALLBACK_ANSWER: &str = "I apologize, but I'm unable to generate a response at the moment. \
Please check if Ollama is running and the model is available.";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join chunk texts in retrieval order
    pub fn build_context(chunks: &[ChunkRecord]) -> String {
        chunks
            .iter()
            .map(|c| c.chunk_text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER)
    }

    /// Build the full RAG prompt
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"
You are a helpful assistant. Answer the user's question using only the context below.
If the answer is not in the context, reply with: '{not_found}'

Context:
{context}

Question:
{question}

Answer:
"#,
            not_found = NOT_FOUND_ANSWER,
            context = context,
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, id: u64) -> ChunkRecord {
        ChunkRecord {
            chunk_text: text.into(),
            filename: "a.txt".into(),
            chunk_id: id,
            source_ref: Some("Paragraph: 1".into()),
            page: None,
            total_pages: None,
        }
    }

    #[test]
    fn test_context_joined_in_order() {
        let context = PromptBuilder::build_context(&[chunk("first", 0), chunk("second", 1)]);
        assert_eq!(context, "first\n---\nsecond");
        assert_eq!(PromptBuilder::build_context(&[]), "");
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = PromptBuilder::build_rag_prompt("Who?", "alpha\n---\nbeta");

        assert!(prompt.contains("using only the context below"));
        assert!(prompt.contains(NOT_FOUND_ANSWER));
        assert!(prompt.contains("Context:\nalpha\n---\nbeta\n"));
        assert!(prompt.contains("Question:\nWho?\n"));
        assert!(prompt.trim_end().ends_with("Answer:"));
    }
}
