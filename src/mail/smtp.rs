//! SendGrid SMTP relay via lettre.
//!
//! SendGrid accepts the literal user name `apikey` with the API key as the
//! password, so the same credential works for both transports.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use crate::error::DeliveryError;
use crate::mail::{BodyFormat, Mailer, OutgoingEmail, SendReceipt};

const MAILER: &str = "smtp";
const SMTP_USERNAME: &str = "apikey";
/// Port on which the relay expects implicit TLS; anything else uses STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// How the TLS session with the relay is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS from the first byte.
    Implicit,
    /// Plain connection upgraded with `STARTTLS`.
    StartTls,
}

impl TlsMode {
    pub fn for_port(port: u16) -> Self {
        if port == IMPLICIT_TLS_PORT {
            TlsMode::Implicit
        } else {
            TlsMode::StartTls
        }
    }
}

/// SMTP mailer for a relay that authenticates with an API key.
pub struct SmtpMailer {
    host: String,
    port: u16,
    api_key: SecretString,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(host: impl Into<String>, port: u16, api_key: SecretString, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            api_key,
            timeout,
        }
    }

    fn transport(&self) -> Result<SmtpTransport, DeliveryError> {
        let builder = match TlsMode::for_port(self.port) {
            TlsMode::Implicit => SmtpTransport::relay(&self.host),
            TlsMode::StartTls => SmtpTransport::starttls_relay(&self.host),
        }
        .map_err(|e| DeliveryError::RequestFailed {
            mailer: MAILER.into(),
            reason: format!("SMTP relay error: {e}"),
        })?;

        let (username, password) = login(&self.api_key);
        let creds = Credentials::new(username, password);

        Ok(builder
            .port(self.port)
            .credentials(creds)
            .timeout(Some(self.timeout))
            .build())
    }
}

/// Relay login: the literal user `apikey` with the key as password.
fn login(api_key: &SecretString) -> (String, String) {
    (SMTP_USERNAME.to_string(), api_key.expose_secret().to_string())
}

/// Hand a message to a blocking transport on the blocking pool.
async fn deliver<T>(transport: T, message: Message) -> Result<(), DeliveryError>
where
    T: Transport + Send + 'static,
    T::Error: Display + Send + 'static,
    T::Ok: Send + 'static,
{
    tokio::task::spawn_blocking(move || transport.send(&message))
        .await
        .map_err(|e| DeliveryError::RequestFailed {
            mailer: MAILER.into(),
            reason: format!("SMTP send task failed: {e}"),
        })?
        .map_err(|e| DeliveryError::RequestFailed {
            mailer: MAILER.into(),
            reason: format!("SMTP send failed: {e}"),
        })?;
    Ok(())
}

/// Build the RFC 5322 message for an outgoing email.
pub(crate) fn build_message(email: &OutgoingEmail) -> Result<Message, DeliveryError> {
    let content_type = match email.format {
        BodyFormat::Html => ContentType::TEXT_HTML,
        BodyFormat::Plain => ContentType::TEXT_PLAIN,
    };

    Message::builder()
        .from(Mailbox::new(None, email.from.clone()))
        .to(Mailbox::new(None, email.to.clone()))
        .subject(email.subject.as_str())
        .header(content_type)
        .body(email.body.clone())
        .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &str {
        MAILER
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, DeliveryError> {
        let message = build_message(email)?;
        let transport = self.transport()?;

        deliver(transport, message).await?;

        tracing::info!(host = %self.host, port = self.port, to = %email.to, "Email relayed over SMTP");
        Ok(SendReceipt { message_id: None })
    }
}
