//! Prompt template with `{date}` and `{astro_data}` placeholders.

use std::path::Path;

use crate::error::ConfigError;

const BUILTIN_TEMPLATE: &str = "\
You are an experienced Western astrologer writing a personal daily horoscope.

Today's date: {date}

Chart data for today (may be empty):
{astro_data}

Write today's reading in a warm, grounded tone. Cover the overall mood of the day,
work, relationships and one concrete piece of advice. When chart data is present,
refer to the placements and aspects that matter most instead of listing all of them.

Format the reading as a short HTML fragment (h2, p and ul elements only) suitable
for an email body. Do not wrap it in a code block.";

/// A report prompt. Placeholders: `{date}`, `{astro_data}`. `{{` and `}}` are
/// literal braces; anything else in braces is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The template used when no prompt file is configured.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_TEMPLATE)
    }

    /// Load a template from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if source.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "PROMPT_PATH".into(),
                message: format!("{} is empty", path.display()),
            });
        }
        tracing::debug!(path = %path.display(), "Loaded prompt template");
        Ok(Self::new(source))
    }

    pub fn render(&self, date: &str, astro_data: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + astro_data.len());
        let mut rest = self.source.as_str();

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some(tail) = rest.strip_prefix("{{") {
                out.push('{');
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix("}}") {
                out.push('}');
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix("{date}") {
                out.push_str(date);
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix("{astro_data}") {
                out.push_str(astro_data);
                rest = tail;
            } else {
                out.push_str(&rest[..1]);
                rest = &rest[1..];
            }
        }
        out.push_str(rest);
        out
    }
}
