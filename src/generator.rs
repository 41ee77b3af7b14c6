//! Content generator: turns the run date and chart into the report text.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::GenerationError;
use crate::llm::TextGenerator;

/// The generated report body for one run date.
///
/// Never empty: construction fails on blank text, so a dispatch can only
/// ever happen with real content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoroscopeContent {
    text: String,
    date: NaiveDate,
}

impl HoroscopeContent {
    /// `None` if `text` is empty or whitespace-only.
    pub fn new(text: impl Into<String>, date: NaiveDate) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        Some(Self { text, date })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Builds the prompt and asks a [`TextGenerator`] for the report.
pub struct ContentGenerator {
    llm: Arc<dyn TextGenerator>,
}

impl ContentGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Prompt for the configured run date and chart.
    pub fn build_prompt(config: &RunConfig) -> String {
        let astro_data = config
            .chart
            .as_ref()
            .map(|chart| chart.summary())
            .unwrap_or_default();
        if !astro_data.is_empty() {
            debug!(astro_data = %astro_data, "Chart summary for prompt");
        }
        let date = config.run_date.format("%Y-%m-%d").to_string();
        config.prompt.render(&date, &astro_data)
    }

    /// Generate the report. The returned text is exactly what the provider sent.
    pub async fn generate(&self, config: &RunConfig) -> Result<HoroscopeContent, GenerationError> {
        let prompt = Self::build_prompt(config);

        info!(
            provider = self.llm.provider_name(),
            model = self.llm.model_name(),
            prompt_chars = prompt.chars().count(),
            "Generating report"
        );

        let text = self.llm.generate_text(&prompt).await?;

        let content = HoroscopeContent::new(text, config.run_date).ok_or_else(|| {
            GenerationError::EmptyResponse {
                provider: self.llm.provider_name().to_string(),
            }
        })?;

        info!(chars = content.text().chars().count(), "Report generated");
        Ok(content)
    }
}
