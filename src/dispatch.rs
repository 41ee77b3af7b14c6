//! Report dispatcher: one delivery attempt per run.

use std::sync::Arc;

use crate::config::RunConfig;
use crate::error::DeliveryError;
use crate::generator::HoroscopeContent;
use crate::mail::{Mailer, OutgoingEmail};

/// Outcome of the single delivery attempt.
#[derive(Debug)]
pub enum DeliveryResult {
    Delivered { message_id: Option<String> },
    Failed(DeliveryError),
}

/// Subject line: configured prefix plus the run date as `YYYY/MM/DD`.
pub fn subject_for(config: &RunConfig, content: &HoroscopeContent) -> String {
    format!(
        "{} ({})",
        config.mail.subject_prefix,
        content.date().format("%Y/%m/%d")
    )
}

/// Address the report. The body is the generated text, unchanged.
pub fn compose(config: &RunConfig, content: HoroscopeContent) -> OutgoingEmail {
    OutgoingEmail {
        from: config.from_email.clone(),
        to: config.to_email.clone(),
        subject: subject_for(config, &content),
        body: content.into_text(),
        format: config.mail.body_format,
    }
}

/// Sends the report through a [`Mailer`]. Never retries.
pub struct ReportDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl ReportDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub async fn dispatch(&self, config: &RunConfig, content: HoroscopeContent) -> DeliveryResult {
        let email = compose(config, content);
        tracing::info!(
            mailer = self.mailer.name(),
            to = %email.to,
            subject = %email.subject,
            "Dispatching report"
        );

        match self.mailer.send(&email).await {
            Ok(receipt) => DeliveryResult::Delivered {
                message_id: receipt.message_id,
            },
            Err(e) => DeliveryResult::Failed(e),
        }
    }
}
