//! Optional natural-language formatter seam.
//!
//! A formatter rewrites the raw decision summary into readable prose in the
//! query's language. It is strictly additive: the orchestrator stores its
//! output next to the summary and falls back to the summary on any failure.

use crate::error::FormatError;
use crate::intent::Locale;
use async_trait::async_trait;

#[async_trait]
pub trait AnswerFormatter: Send + Sync {
    async fn format(&self, summary: &str, locale: Locale) -> Result<String, FormatError>;
}

/// Formatter with a fixed outcome, for tests
#[derive(Debug, Clone)]
pub struct StaticFormatter {
    outcome: Result<String, FormatError>,
}

impl StaticFormatter {
    pub fn answering(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
        }
    }

    pub fn failing(error: FormatError) -> Self {
        Self { outcome: Err(error) }
    }
}

#[async_trait]
impl AnswerFormatter for StaticFormatter {
    async fn format(&self, _summary: &str, _locale: Locale) -> Result<String, FormatError> {
        self.outcome.clone()
    }
}
