//! Gemini `generateContent` client over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::llm::{TextGenerator, truncate_body};

const PROVIDER: &str = "gemini";

/// Longest provider error body kept in a [`GenerationError::Status`].
const MAX_ERROR_BODY: usize = 500;

/// Gemini REST client authenticated with an API key.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn transport_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout {
                provider: PROVIDER.into(),
                timeout: self.timeout,
            }
        } else {
            GenerationError::RequestFailed {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let raw = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            tracing::warn!(status = %status, model = %self.model, "Gemini request failed");
            return Err(GenerationError::Status {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                body: truncate_body(&raw, MAX_ERROR_BODY),
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&raw).map_err(|e| GenerationError::InvalidResponse {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;

        extract_text(parsed)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(GenerationError::Blocked {
            provider: PROVIDER.into(),
            reason,
        });
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GenerationError::EmptyResponse {
            provider: PROVIDER.into(),
        });
    };

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r.as_str() != "STOP") {
            return Err(GenerationError::Blocked {
                provider: PROVIDER.into(),
                reason: format!("finish reason {reason}"),
            });
        }
        return Err(GenerationError::EmptyResponse {
            provider: PROVIDER.into(),
        });
    }

    tracing::debug!(
        chars = text.chars().count(),
        finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
        "Gemini response received"
    );
    Ok(text)
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
