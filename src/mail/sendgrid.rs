//! SendGrid v3 `mail/send` client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::DeliveryError;
use crate::llm::truncate_body;
use crate::mail::{Mailer, OutgoingEmail, SendReceipt};

const MAILER: &str = "sendgrid";
const MAX_ERROR_BODY: usize = 500;

/// SendGrid HTTP API mailer authenticated with a bearer API key.
pub struct SendGridClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl SendGridClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/mail/send", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Mailer for SendGridClient {
    fn name(&self) -> &str {
        MAILER
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, DeliveryError> {
        let payload = MailSend::from_email(email);

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::RequestFailed {
                mailer: MAILER.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let message_id = resp
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "SendGrid rejected the message");
            return Err(DeliveryError::Rejected {
                mailer: MAILER.into(),
                status: status.as_u16(),
                body: truncate_body(&body, MAX_ERROR_BODY),
            });
        }

        tracing::info!(
            status = %status,
            message_id = message_id.as_deref().unwrap_or("-"),
            to = %email.to,
            "SendGrid accepted the message"
        );
        Ok(SendReceipt { message_id })
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MailSend<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    subject: &'a str,
    content: Vec<MailContent<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct MailContent<'a> {
    #[serde(rename = "type")]
    mime_type: &'static str,
    value: &'a str,
}

impl<'a> MailSend<'a> {
    fn from_email(email: &'a OutgoingEmail) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: email.to.as_ref(),
                }],
            }],
            from: EmailAddress {
                email: email.from.as_ref(),
            },
            subject: &email.subject,
            content: vec![MailContent {
                mime_type: email.format.mime_type(),
                value: &email.body,
            }],
        }
    }
}
