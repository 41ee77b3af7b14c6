//! Error types for the horoscope mailer.

use std::time::Duration;

/// Top-level error type for a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Chart data error: {0}")]
    Chart(#[from] ChartError),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// Chart input errors.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Failed to parse chart JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected 12 house cusps, got {0}")]
    HouseCount(usize),

    #[error("Longitude for {name} is not a finite number")]
    NonFinite { name: String },
}

/// Failures of the generative text service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} blocked the prompt: {reason}")]
    Blocked { provider: String, reason: String },

    #[error("Provider {provider} returned no text")]
    EmptyResponse { provider: String },
}

/// Failures of the email delivery service.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Mailer {mailer} request failed: {reason}")]
    RequestFailed { mailer: String, reason: String },

    #[error("Mailer {mailer} rejected the message with HTTP {status}: {body}")]
    Rejected {
        mailer: String,
        status: u16,
        body: String,
    },

    #[error("Failed to build message: {0}")]
    InvalidMessage(String),
}
