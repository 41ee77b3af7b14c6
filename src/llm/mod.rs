//! Generative text backends.
//!
//! The rest of the job only sees [`TextGenerator`]: one prompt in, one block
//! of text out. The live implementation is [`GeminiClient`]; tests plug in
//! their own.

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::GenerationError;

/// Capability: generate text for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name used in logs and errors.
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Return the model's text for `prompt`, unmodified.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Cap provider error bodies so a large HTML error page doesn't flood the log.
pub(crate) fn truncate_body(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        return body.to_string();
    }
    let mut out: String = body.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_are_kept() {
        assert_eq!(truncate_body("bad request", 50), "bad request");
    }

    #[test]
    fn long_bodies_are_cut_on_char_boundaries() {
        let body = "é".repeat(10);
        assert_eq!(truncate_body(&body, 3), "ééé…");
    }
}
