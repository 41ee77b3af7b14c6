//! Outbound email.
//!
//! [`Mailer`] is the single seam between the job and the delivery provider.
//! Two live mailers exist: SendGrid's HTTP API and SendGrid's SMTP relay.

pub mod sendgrid;
pub mod smtp;

pub use sendgrid::SendGridClient;
pub use smtp::SmtpMailer;

use std::str::FromStr;

use async_trait::async_trait;
use lettre::Address;

use crate::error::DeliveryError;

/// MIME type of the report body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Html,
    Plain,
}

impl BodyFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            BodyFormat::Html => "text/html",
            BodyFormat::Plain => "text/plain",
        }
    }
}

impl FromStr for BodyFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "text/html" => Ok(Self::Html),
            "plain" | "text" | "text/plain" => Ok(Self::Plain),
            other => Err(format!("expected `html` or `plain`, got `{other}`")),
        }
    }
}

/// A fully addressed message, ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from: Address,
    pub to: Address,
    pub subject: String,
    pub body: String,
    pub format: BodyFormat,
}

/// What the provider told us about an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider-assigned id, when the provider returns one.
    pub message_id: Option<String>,
}

/// Capability: send an email to one recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Mailer name used in logs and errors.
    fn name(&self) -> &str;

    /// Send exactly once. Implementations must not retry.
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, DeliveryError>;
}
