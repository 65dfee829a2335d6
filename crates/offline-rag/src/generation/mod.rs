//! LLM answer generation

mod answer;
mod ollama;
mod prompt;

pub use answer::Generator;
pub use ollama::OllamaClient;
pub use prompt::{PromptBuilder, CONTEXT_DELIMITER, FALLBACK_ANSWER, NOT_FOUND_ANSWER};

#[cfg(test)]
pub(crate) use answer::tests::ScriptedLlm;
