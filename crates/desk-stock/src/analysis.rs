//! Analysis categories and tagged analysis outcomes

use crate::error::DeskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis category offered by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisCategory {
    Sentiment,
    Technical,
    Quantitative,
    Risk,
    /// Composite request populating the four categories above at once
    All,
}

impl AnalysisCategory {
    /// The four individual categories, in display order
    pub const INDIVIDUAL: [AnalysisCategory; 4] = [
        AnalysisCategory::Sentiment,
        AnalysisCategory::Technical,
        AnalysisCategory::Quantitative,
        AnalysisCategory::Risk,
    ];

    /// Backend endpoint path, relative to the API base
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment-analysis",
            Self::Technical => "technical-analysis",
            Self::Quantitative => "quantitative-analysis",
            Self::Risk => "risk-analysis",
            Self::All => "full-analysis",
        }
    }

    /// Lower-case label used in transcript lines
    pub fn label(self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Technical => "technical",
            Self::Quantitative => "quantitative",
            Self::Risk => "risk",
            Self::All => "full",
        }
    }

    /// Title used for tab headings
    pub fn title(self) -> &'static str {
        match self {
            Self::Sentiment => "Sentiment Analysis",
            Self::Technical => "Technical Analysis",
            Self::Quantitative => "Quantitative Analysis",
            Self::Risk => "Risk Assessment",
            Self::All => "Full Analysis",
        }
    }

    pub fn is_composite(self) -> bool {
        self == Self::All
    }

    /// Whether formatted content gets an extracted metrics block
    pub fn shows_metrics(self) -> bool {
        matches!(self, Self::Technical | Self::Quantitative | Self::Risk)
    }

    /// Categories whose records a fetch of `self` writes
    pub fn covered(self) -> &'static [AnalysisCategory] {
        match self {
            Self::Sentiment => &[Self::Sentiment],
            Self::Technical => &[Self::Technical],
            Self::Quantitative => &[Self::Quantitative],
            Self::Risk => &[Self::Risk],
            Self::All => &Self::INDIVIDUAL,
        }
    }
}

impl fmt::Display for AnalysisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AnalysisCategory {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sentiment" => Ok(Self::Sentiment),
            "technical" => Ok(Self::Technical),
            "quantitative" | "quant" => Ok(Self::Quantitative),
            "risk" => Ok(Self::Risk),
            "all" | "full" => Ok(Self::All),
            other => Err(DeskError::Command(format!(
                "Unknown analysis category: {other}"
            ))),
        }
    }
}

/// Result of one analysis fetch as stored per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "lowercase")]
pub enum AnalysisOutcome {
    /// Narrative produced by the backend
    Ready(String),
    /// Failure description; always contains the word "error"
    Failed(String),
}

impl AnalysisOutcome {
    /// Build a failure, prefixing `Error: ` unless the message already leads with it
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim_start().to_lowercase().starts_with("error") {
            Self::Failed(message)
        } else {
            Self::Failed(format!("Error: {message}"))
        }
    }

    /// Classify a backend `result` string
    ///
    /// The backend reports timeouts and crew failures as HTTP 200 with
    /// prose in the `result` field; those are failures, not content.
    pub fn from_backend_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            return Self::failed("Unexpected response format from server");
        }
        if looks_like_failure(&text) {
            Self::failed(text)
        } else {
            Self::Ready(text)
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Ready(text) | Self::Failed(text) => text,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Content when ready
    pub fn ready_text(&self) -> Option<&str> {
        match self {
            Self::Ready(text) => Some(text),
            Self::Failed(_) => None,
        }
    }
}

fn looks_like_failure(text: &str) -> bool {
    let lower = text.trim_start().to_lowercase();
    lower.starts_with("error")
        || lower.contains("could not be completed")
        || lower.contains("could not complete")
        || (lower.contains("timed out") && lower.contains("try"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_endpoints() {
        assert_eq!(AnalysisCategory::Risk.endpoint(), "risk-analysis");
        assert_eq!(AnalysisCategory::All.endpoint(), "full-analysis");
        assert_eq!(AnalysisCategory::All.covered().len(), 4);
        assert_eq!(AnalysisCategory::Technical.covered(), &[AnalysisCategory::Technical]);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Quant".parse::<AnalysisCategory>().unwrap(), AnalysisCategory::Quantitative);
        assert_eq!("full".parse::<AnalysisCategory>().unwrap(), AnalysisCategory::All);
        assert!("momentum".parse::<AnalysisCategory>().is_err());
        assert!("tech".parse::<AnalysisCategory>().is_err());
    }

    #[test]
    fn test_failed_always_mentions_error() {
        let outcome = AnalysisOutcome::failed("connection refused");
        assert_eq!(outcome.text(), "Error: connection refused");

        let outcome = AnalysisOutcome::failed("Error: already tagged");
        assert_eq!(outcome.text(), "Error: already tagged");
    }

    #[test]
    fn test_backend_text_classification() {
        let outcome = AnalysisOutcome::from_backend_text("# Technical Analysis\n- **RSI:** 55");
        assert!(outcome.is_ready());

        let outcome = AnalysisOutcome::from_backend_text(
            "Technical analysis for AAPL timed out. Please try again later.",
        );
        assert!(outcome.is_failed());
        assert!(outcome.text().to_lowercase().contains("error"));

        let outcome = AnalysisOutcome::from_backend_text(
            "Risk assessment for AAPL could not be completed. Error: boom",
        );
        assert!(outcome.is_failed());

        let outcome = AnalysisOutcome::from_backend_text("   ");
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_backend_text_mentioning_error_inside_prose_is_content() {
        let outcome = AnalysisOutcome::from_backend_text(
            "## Risk\n- **Tracking Error:** 2.1%",
        );
        assert!(outcome.is_ready());
    }
}
