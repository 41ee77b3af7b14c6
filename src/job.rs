//! Run orchestration.
//!
//! One run walks `Configuring → Generating → Dispatching` and ends in either
//! [`RunOutcome::Success`] or [`RunOutcome::Failed`]. A failing stage ends the
//! run immediately; later stages are never entered and nothing is retried.

use std::fmt;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::config::{MailTransport, RunConfig};
use crate::dispatch::{DeliveryResult, ReportDispatcher};
use crate::error::{ConfigError, Error};
use crate::generator::ContentGenerator;
use crate::llm::{GeminiClient, TextGenerator};
use crate::mail::{Mailer, SendGridClient, SmtpMailer};

/// Stage of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuring,
    Generating,
    Dispatching,
}

impl Stage {
    /// Process exit status when a run fails in this stage.
    pub fn exit_status(self) -> u8 {
        match self {
            Stage::Configuring => 2,
            Stage::Generating => 3,
            Stage::Dispatching => 4,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuring => "configuring",
            Stage::Generating => "generating",
            Stage::Dispatching => "dispatching",
        };
        f.write_str(name)
    }
}

/// Terminal state of a run.
#[derive(Debug)]
pub enum RunOutcome {
    Success {
        run_date: NaiveDate,
        message_id: Option<String>,
    },
    Failed {
        stage: Stage,
        cause: Error,
    },
}

impl RunOutcome {
    fn failed(stage: Stage, cause: impl Into<Error>) -> Self {
        RunOutcome::Failed {
            stage,
            cause: cause.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    /// Stage that failed, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            RunOutcome::Success { .. } => None,
            RunOutcome::Failed { stage, .. } => Some(*stage),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunOutcome::Success { .. } => ExitCode::SUCCESS,
            RunOutcome::Failed { stage, .. } => ExitCode::from(stage.exit_status()),
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success { run_date, .. } => {
                write!(f, "horoscope for {run_date} delivered")
            }
            RunOutcome::Failed { stage, cause } => {
                write!(f, "run failed while {stage}: {cause}")
            }
        }
    }
}

/// Builds the two outbound services from a resolved configuration.
pub trait Backends {
    fn text_generator(&self, config: &RunConfig) -> Result<Arc<dyn TextGenerator>, ConfigError>;

    fn mailer(&self, config: &RunConfig) -> Result<Arc<dyn Mailer>, ConfigError>;
}

/// Real Gemini and SendGrid clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveBackends;

impl LiveBackends {
    fn http_client(config: &RunConfig) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }
}

impl Backends for LiveBackends {
    fn text_generator(&self, config: &RunConfig) -> Result<Arc<dyn TextGenerator>, ConfigError> {
        Ok(Arc::new(GeminiClient::new(
            Self::http_client(config)?,
            config.gemini.base_url.clone(),
            config.gemini.model.clone(),
            config.gemini_api_key.clone(),
            config.http_timeout,
        )))
    }

    fn mailer(&self, config: &RunConfig) -> Result<Arc<dyn Mailer>, ConfigError> {
        let mailer: Arc<dyn Mailer> = match config.mail.transport {
            MailTransport::Api => Arc::new(SendGridClient::new(
                Self::http_client(config)?,
                config.mail.sendgrid_base_url.clone(),
                config.sendgrid_api_key.clone(),
            )),
            MailTransport::Smtp => Arc::new(SmtpMailer::new(
                config.mail.smtp_host.clone(),
                config.mail.smtp_port,
                config.sendgrid_api_key.clone(),
                config.http_timeout,
            )),
        };
        Ok(mailer)
    }
}

/// Drives one run through its stages.
pub struct Orchestrator<B> {
    backends: B,
}

impl<B: Backends> Orchestrator<B> {
    pub fn new(backends: B) -> Self {
        Self { backends }
    }

    /// Execute one run. `resolve` is the configuring stage.
    pub async fn run<F>(&self, resolve: F) -> RunOutcome
    where
        F: FnOnce() -> Result<RunConfig, ConfigError>,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        let outcome = self.run_stages(resolve).instrument(span.clone()).await;

        span.in_scope(|| match &outcome {
            RunOutcome::Success { message_id, .. } => info!(
                message_id = message_id.as_deref().unwrap_or("-"),
                "{outcome}"
            ),
            RunOutcome::Failed { stage, cause } => {
                error!(stage = %stage, error = %cause, "Run failed");
            }
        });
        outcome
    }

    async fn run_stages<F>(&self, resolve: F) -> RunOutcome
    where
        F: FnOnce() -> Result<RunConfig, ConfigError>,
    {
        info!(stage = %Stage::Configuring, "Run started");
        let config = match resolve() {
            Ok(config) => config,
            Err(e) => return RunOutcome::failed(Stage::Configuring, e),
        };
        let llm = match self.backends.text_generator(&config) {
            Ok(llm) => llm,
            Err(e) => return RunOutcome::failed(Stage::Configuring, e),
        };
        let mailer = match self.backends.mailer(&config) {
            Ok(mailer) => mailer,
            Err(e) => return RunOutcome::failed(Stage::Configuring, e),
        };

        info!(stage = %Stage::Generating, "Stage entered");
        let content = match ContentGenerator::new(llm).generate(&config).await {
            Ok(content) => content,
            Err(e) => return RunOutcome::failed(Stage::Generating, e),
        };

        info!(stage = %Stage::Dispatching, "Stage entered");
        match ReportDispatcher::new(mailer).dispatch(&config, content).await {
            DeliveryResult::Delivered { message_id } => RunOutcome::Success {
                run_date: config.run_date,
                message_id,
            },
            DeliveryResult::Failed(e) => RunOutcome::failed(Stage::Dispatching, e),
        }
    }
}
