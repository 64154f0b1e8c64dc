//! Metric and sentiment extraction

use super::{Metric, Polarity, Section};
use regex::Regex;
use std::sync::LazyLock;

static METRIC_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-*]\s+\*\*(.*?):\*\*\s+(.*)").expect("valid metric regex"));

static SENTIMENT_SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Sentiment Score:\s*([-+]?\d+)").expect("valid score regex")
});

// `.` and the class exclude newlines, so the label never runs into the next line
static SENTIMENT_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Overall.+Sentiment:\s*([A-Za-z ]+)").expect("valid sentiment regex")
});

/// Scores beyond this magnitude are polarised
const SENTIMENT_THRESHOLD: i64 = 20;

/// Sentiment indicator values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentReading {
    pub score: i64,
    pub text: String,
    pub polarity: Polarity,
}

/// Parse a `- **Name:** value` bullet
pub fn parse_metric(line: &str) -> Option<Metric> {
    let caps = METRIC_LINE.captures(line)?;
    let name = caps.get(1)?.as_str().to_string();
    let value = caps.get(2)?.as_str().trim_end().to_string();
    let class = classify_value(&value);
    Some(Metric { name, value, class })
}

/// Every metric bullet in the given sections, in document order
pub fn extract_metrics(sections: &[Section]) -> Vec<Metric> {
    sections
        .iter()
        .flat_map(|s| s.lines.iter())
        .filter_map(|line| parse_metric(line))
        .collect()
}

/// Keyword and sign based polarity of a metric value
pub fn classify_value(value: &str) -> Polarity {
    let lower = value.to_lowercase();
    if value.contains('+')
        || lower.contains("positive")
        || lower.contains("strong buy")
        || lower.contains("low risk")
    {
        Polarity::Positive
    } else if value.contains('-')
        || lower.contains("negative")
        || lower.contains("sell")
        || lower.contains("high risk")
    {
        Polarity::Negative
    } else {
        Polarity::Neutral
    }
}

pub fn score_polarity(score: i64) -> Polarity {
    if score > SENTIMENT_THRESHOLD {
        Polarity::Positive
    } else if score < -SENTIMENT_THRESHOLD {
        Polarity::Negative
    } else {
        Polarity::Neutral
    }
}

/// Score and overall label; both must be present
pub fn extract_sentiment(content: &str) -> Option<SentimentReading> {
    let score = SENTIMENT_SCORE
        .captures(content)?
        .get(1)?
        .as_str()
        .parse::<i64>()
        .ok()?;
    let text = SENTIMENT_TEXT
        .captures(content)?
        .get(1)?
        .as_str()
        .trim()
        .to_string();

    Some(SentimentReading {
        score,
        text,
        polarity: score_polarity(score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_line() {
        let metric = parse_metric("- **Beta:** 1.2").unwrap();
        assert_eq!(metric.name, "Beta");
        assert_eq!(metric.value, "1.2");
        assert_eq!(metric.class, Polarity::Neutral);

        let metric = parse_metric("* **Recommendation:** Strong Buy").unwrap();
        assert_eq!(metric.class, Polarity::Positive);

        assert!(parse_metric("Beta: 1.2").is_none());
        assert!(parse_metric("- plain bullet").is_none());
    }

    #[test]
    fn test_value_classification() {
        assert_eq!(classify_value("+3.4%"), Polarity::Positive);
        assert_eq!(classify_value("Low Risk"), Polarity::Positive);
        assert_eq!(classify_value("-12%"), Polarity::Negative);
        assert_eq!(classify_value("Sell"), Polarity::Negative);
        assert_eq!(classify_value("High Risk"), Polarity::Negative);
        assert_eq!(classify_value("Hold"), Polarity::Neutral);
        // sign wins over later keywords
        assert_eq!(classify_value("+1 (high risk)"), Polarity::Positive);
    }

    #[test]
    fn test_sentiment_reading() {
        let reading = extract_sentiment(
            "# Sentiment\nSentiment Score: 35\nOverall Market Sentiment: Positive\nMore text",
        )
        .unwrap();
        assert_eq!(reading.score, 35);
        assert_eq!(reading.text, "Positive");
        assert_eq!(reading.polarity, Polarity::Positive);

        let reading = extract_sentiment(
            "sentiment score: -45\noverall news sentiment: Very Negative",
        )
        .unwrap();
        assert_eq!(reading.polarity, Polarity::Negative);
        assert_eq!(reading.text, "Very Negative");
    }

    #[test]
    fn test_sentiment_needs_both_parts() {
        assert!(extract_sentiment("Sentiment Score: 10").is_none());
        assert!(extract_sentiment("Overall Sentiment: Neutral").is_none());
    }

    #[test]
    fn test_score_thresholds() {
        assert_eq!(score_polarity(20), Polarity::Neutral);
        assert_eq!(score_polarity(21), Polarity::Positive);
        assert_eq!(score_polarity(-20), Polarity::Neutral);
        assert_eq!(score_polarity(-21), Polarity::Negative);
    }
}
