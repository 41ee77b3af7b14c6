//! Run configuration, resolved once from the process environment.
//!
//! Business logic never touches `std::env`; everything it needs is carried
//! by [`RunConfig`], which is built here and then passed by reference.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use lettre::Address;
use secrecy::SecretString;

use crate::astro::Chart;
use crate::error::ConfigError;
use crate::mail::BodyFormat;
use crate::prompt::PromptTemplate;

pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const SENDGRID_API_KEY: &str = "SENDGRID_API_KEY";
pub const TO_EMAIL: &str = "TO_EMAIL";

/// Variables without which a run cannot start, in the order they are checked.
pub const REQUIRED_VARS: [&str; 3] = [GEMINI_API_KEY, SENDGRID_API_KEY, TO_EMAIL];

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";
pub const DEFAULT_SMTP_HOST: &str = "smtp.sendgrid.net";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SUBJECT_PREFIX: &str = "Today's Horoscope";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Prompt file picked up from the working directory when `PROMPT_PATH` is unset.
const DEFAULT_PROMPT_FILE: &str = "prompt.txt";

/// How the report leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// SendGrid v3 HTTP API.
    Api,
    /// SendGrid SMTP relay.
    Smtp,
}

impl FromStr for MailTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" | "http" => Ok(Self::Api),
            "smtp" => Ok(Self::Smtp),
            other => Err(format!("expected `api` or `smtp`, got `{other}`")),
        }
    }
}

/// Generative service settings.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
}

/// Email delivery settings.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub transport: MailTransport,
    pub sendgrid_base_url: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub body_format: BodyFormat,
    pub subject_prefix: String,
}

/// Everything a single run needs. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub gemini_api_key: SecretString,
    pub sendgrid_api_key: SecretString,
    pub to_email: Address,
    pub from_email: Address,
    /// Calendar date of the report in the configured offset.
    pub run_date: NaiveDate,
    pub utc_offset: FixedOffset,
    pub gemini: GeminiSettings,
    pub mail: MailSettings,
    pub prompt: PromptTemplate,
    pub chart: Option<Chart>,
    pub http_timeout: Duration,
}

impl RunConfig {
    /// Resolve from the real process environment at the current instant.
    ///
    /// Without `PROMPT_PATH`, a `prompt.txt` in the working directory is used
    /// when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve_with_prompt_file(
            |key| std::env::var(key).ok(),
            Utc::now(),
            Some(Path::new(DEFAULT_PROMPT_FILE)),
        )
    }

    /// Resolve from an arbitrary variable lookup. Never touches the working
    /// directory: without `PROMPT_PATH` the builtin prompt is used.
    ///
    /// Fails on the first missing required variable (in [`REQUIRED_VARS`]
    /// order); all missing names are logged. Secret values are never logged.
    pub fn resolve<F>(lookup: F, now: DateTime<Utc>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::resolve_with_prompt_file(lookup, now, None)
    }

    /// Like [`RunConfig::resolve`], falling back to `default_prompt` (if it
    /// exists) when `PROMPT_PATH` is unset.
    pub fn resolve_with_prompt_file<F>(
        lookup: F,
        now: DateTime<Utc>,
        default_prompt: Option<&Path>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| env.get(key).is_none())
            .collect();
        if let Some(first) = missing.first() {
            tracing::error!(missing = ?missing, "Required environment variables are not set");
            return Err(ConfigError::MissingEnvVar((*first).to_string()));
        }

        let gemini_api_key = SecretString::from(env.required(GEMINI_API_KEY)?);
        let sendgrid_api_key = SecretString::from(env.required(SENDGRID_API_KEY)?);
        let to_email = parse_address(TO_EMAIL, &env.required(TO_EMAIL)?)?;
        let from_email = match env.get("FROM_EMAIL") {
            Some(raw) => parse_address("FROM_EMAIL", &raw)?,
            None => to_email.clone(),
        };

        let offset_hours: i32 = env.parse_or("REPORT_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        let utc_offset = utc_offset(offset_hours)?;
        let run_date = now.with_timezone(&utc_offset).date_naive();

        let gemini = GeminiSettings {
            model: env
                .get("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: env
                .get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        };

        let mail = MailSettings {
            transport: env.parse_or("MAIL_TRANSPORT", MailTransport::Api)?,
            sendgrid_base_url: env
                .get("SENDGRID_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SENDGRID_BASE_URL.to_string()),
            smtp_host: env
                .get("SMTP_HOST")
                .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: env.parse_or("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            body_format: env.parse_or("MAIL_BODY_FORMAT", BodyFormat::Html)?,
            subject_prefix: env
                .get("MAIL_SUBJECT_PREFIX")
                .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
        };

        let prompt = match env.get("PROMPT_PATH") {
            Some(path) => PromptTemplate::load(Path::new(&path))?,
            None => match default_prompt.filter(|path| path.is_file()) {
                Some(path) => PromptTemplate::load(path)?,
                None => PromptTemplate::builtin(),
            },
        };

        let chart = env
            .get("ASTRO_CHART_PATH")
            .map(|path| Chart::load(&PathBuf::from(path)))
            .transpose()?;

        let timeout_secs: u64 = env.parse_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HTTP_TIMEOUT_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }

        tracing::info!(
            to = %to_email,
            from = %from_email,
            run_date = %run_date,
            model = %gemini.model,
            transport = ?mail.transport,
            chart = chart.is_some(),
            "Configuration resolved"
        );

        Ok(Self {
            gemini_api_key,
            sendgrid_api_key,
            to_email,
            from_email,
            run_date,
            utc_offset,
            gemini,
            mail,
            prompt,
            chart,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Thin wrapper that trims values and treats empty ones as unset.
struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }
}

fn parse_address(key: &str, raw: &str) -> Result<Address, ConfigError> {
    raw.parse::<Address>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("not a valid email address: {e}"),
    })
}

fn utc_offset(hours: i32) -> Result<FixedOffset, ConfigError> {
    if !(-12..=14).contains(&hours) {
        return Err(ConfigError::InvalidValue {
            key: "REPORT_UTC_OFFSET_HOURS".into(),
            message: format!("{hours} is outside -12..=14"),
        });
    }
    FixedOffset::east_opt(hours * 3600).ok_or_else(|| ConfigError::InvalidValue {
        key: "REPORT_UTC_OFFSET_HOURS".into(),
        message: format!("{hours} is not a valid offset"),
    })
}
