//! The text oracle: the chat-completion capability behind planning,
//! synthesis, verification, and summarization.
//!
//! The engine only ever needs `complete(prompt, temperature) -> text`.
//! Implementations handle transport, retries, and deadlines; stage logic
//! stays decoupled from any particular vendor.

pub mod json;
mod openai;

pub use openai::OpenAiOracle;

use async_trait::async_trait;

use crate::error::OracleError;

/// Trait for text-in / text-out completion backends.
///
/// Planning, synthesis, and verification call with temperature 0.0;
/// summarization calls with 0.3. Prompts that expect JSON must tolerate
/// markdown fences and surrounding prose in the response; parse with
/// [`json::extract_object`] / [`json::extract_string_array`].
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Completes a prompt, returning the model's text.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] on timeout, transport failure, or an empty
    /// response. Callers recover per stage with typed defaults.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, OracleError>;
}
