//! Analysis content formatting
//!
//! Turns the backend's semi-structured narrative (markdown-ish headings,
//! bullets, `- **Name:** value` metric lines) into a [`FormattedDocument`]:
//! an ordered list of display blocks. Technical, quantitative and risk
//! documents get an extracted metrics block; sentiment documents get a
//! score indicator. Formatting is a pure function of its input and never
//! drops any of the original text.

mod html;
mod metrics;

pub use html::report;
pub use metrics::{SentimentReading, classify_value, extract_sentiment, parse_metric};

use crate::analysis::AnalysisCategory;
use serde::Serialize;

/// Colouring of a metric or indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// A labeled value pulled out of a bullet line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: String,
    pub class: Polarity,
}

/// One display block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// `#` is level 1, `##` level 2, `###` level 3
    Heading { level: u8, text: String },
    /// Consecutive text lines; each line is a soft break
    Paragraph(Vec<String>),
    /// Bullet items without their marker
    List(Vec<String>),
    Metrics(Vec<Metric>),
    Sentiment {
        score: i64,
        text: String,
        polarity: Polarity,
    },
}

/// Structured rendering of one analysis text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormattedDocument {
    pub blocks: Vec<Block>,
}

impl FormattedDocument {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Text of the first top-level heading
    pub fn title(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Heading { level: 1, text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn metrics(&self) -> Option<&[Metric]> {
        self.blocks.iter().find_map(|b| match b {
            Block::Metrics(items) => Some(items.as_slice()),
            _ => None,
        })
    }

    fn first_heading(&self, accept: impl Fn(u8) -> bool) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| matches!(b, Block::Heading { level, .. } if accept(*level)))
    }

    /// Insert after the first matching heading, else at the top
    fn insert_after(&mut self, heading: Option<usize>, block: Block) {
        let at = heading.map_or(0, |i| i + 1);
        self.blocks.insert(at, block);
    }
}

/// A named run of lines
///
/// Lines before the first `##`/`###` heading belong to `main`. A `#` line
/// is the document title and is not part of any section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading lower-cased with whitespace runs replaced by `_`
    pub key: String,
    pub lines: Vec<String>,
}

/// Split content into sections
pub fn sections(content: &str) -> Vec<Section> {
    let mut sections = vec![Section {
        key: "main".to_string(),
        lines: Vec::new(),
    }];

    for line in content.lines() {
        match heading(line) {
            Some((1, _)) => {}
            Some((_, text)) => sections.push(Section {
                key: section_key(text),
                lines: Vec::new(),
            }),
            None => {
                if let Some(current) = sections.last_mut() {
                    current.lines.push(line.to_string());
                }
            }
        }
    }
    sections
}

fn section_key(heading: &str) -> String {
    heading
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// `(level, text)` of a `#`, `##` or `###` line
fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let level = u8::try_from(hashes).ok()?;
    Some((level, rest.trim()))
}

/// Text of a `-` or `*` bullet
fn bullet(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Formatter for analysis narratives
pub struct ContentFormatter;

impl ContentFormatter {
    /// Format `content` for display in the tab of `category`
    ///
    /// Pass [`AnalysisCategory::All`] for plain structure without any
    /// extracted blocks.
    pub fn format(content: &str, category: AnalysisCategory) -> FormattedDocument {
        let mut doc = Self::structure(content);

        if category.shows_metrics() {
            let found = metrics::extract_metrics(&sections(content));
            if !found.is_empty() {
                let anchor = doc
                    .first_heading(|level| level >= 2)
                    .or_else(|| doc.first_heading(|level| level == 1));
                doc.insert_after(anchor, Block::Metrics(found));
            }
        }

        if category == AnalysisCategory::Sentiment {
            if let Some(reading) = extract_sentiment(content) {
                let anchor = doc.first_heading(|level| level == 1);
                doc.insert_after(
                    anchor,
                    Block::Sentiment {
                        score: reading.score,
                        text: reading.text,
                        polarity: reading.polarity,
                    },
                );
            }
        }

        doc
    }

    /// Headings, bullet lists and paragraphs, in order
    fn structure(content: &str) -> FormattedDocument {
        let mut blocks = Vec::new();
        let mut paragraph: Vec<String> = Vec::new();
        let mut list: Vec<String> = Vec::new();

        let flush = |blocks: &mut Vec<Block>, paragraph: &mut Vec<String>, list: &mut Vec<String>| {
            if !paragraph.is_empty() {
                blocks.push(Block::Paragraph(std::mem::take(paragraph)));
            }
            if !list.is_empty() {
                blocks.push(Block::List(std::mem::take(list)));
            }
        };

        for line in content.lines() {
            if line.trim().is_empty() {
                flush(&mut blocks, &mut paragraph, &mut list);
            } else if let Some((level, text)) = heading(line) {
                flush(&mut blocks, &mut paragraph, &mut list);
                blocks.push(Block::Heading {
                    level,
                    text: text.to_string(),
                });
            } else if let Some(item) = bullet(line) {
                if !paragraph.is_empty() {
                    flush(&mut blocks, &mut paragraph, &mut list);
                }
                list.push(item.to_string());
            } else {
                if !list.is_empty() {
                    flush(&mut blocks, &mut paragraph, &mut list);
                }
                paragraph.push(line.trim_end().to_string());
            }
        }
        flush(&mut blocks, &mut paragraph, &mut list);

        FormattedDocument { blocks }
    }
}
