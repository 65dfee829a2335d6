//! Answer generation with a bounded wait and a fallback reply

use std::sync::Arc;
use std::time::Duration;

use crate::providers::LlmProvider;
use crate::timer::Timer;
use crate::types::{Answer, ChunkRecord, Citation};

use super::prompt::{PromptBuilder, FALLBACK_ANSWER};

/// Generation gateway: prompt, call the LLM, cite the context
pub struct Generator {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl Generator {
    /// Create a generator that waits at most `timeout` for the LLM
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Underlying provider
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Answer `question` from `chunks`.
    ///
    /// Never fails: an unreachable, failing or slow backend yields
    /// [`FALLBACK_ANSWER`] with `fallback` set. Sources always echo the
    /// chunks' provenance in context order.
    pub async fn answer(&self, question: &str, chunks: &[ChunkRecord]) -> Answer {
        let _timer = Timer::start("generate_answer");

        let context = PromptBuilder::build_context(chunks);
        let prompt = PromptBuilder::build_rag_prompt(question, &context);
        let sources: Vec<Citation> = chunks.iter().map(Citation::from_chunk).collect();

        tracing::debug!(
            "Prompting {} ({}) with {} context chunk(s)",
            self.llm.name(),
            self.llm.model(),
            chunks.len()
        );

        let (text, fallback) = match tokio::time::timeout(self.timeout, self.llm.generate(&prompt)).await
        {
            Ok(Ok(text)) => (text, false),
            Ok(Err(e)) => {
                tracing::warn!("Generation failed, returning fallback answer: {}", e);
                (FALLBACK_ANSWER.to_string(), true)
            }
            Err(_) => {
                tracing::warn!(
                    "Generation timed out after {:?}, returning fallback answer",
                    self.timeout
                );
                (FALLBACK_ANSWER.to_string(), true)
            }
        };

        Answer {
            text,
            sources,
            fallback,
        }
    }
}
