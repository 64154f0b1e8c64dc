//! HTML rendering of formatted documents

use super::{Block, FormattedDocument, Metric, Polarity};
use std::fmt::Write;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn card(out: &mut String, title: &str, value: &str, class: Polarity) {
    let _ = write!(
        out,
        r#"<div class="metric-card"><div class="metric-title">{}</div><div class="metric-value {}">{}</div></div>"#,
        escape(title),
        class.as_str(),
        escape(value)
    );
}

fn metrics(out: &mut String, items: &[Metric]) {
    out.push_str(r#"<div class="metrics-container">"#);
    for metric in items {
        card(out, &metric.name, &metric.value, metric.class);
    }
    out.push_str("</div>");
}

impl FormattedDocument {
    /// Render as an HTML fragment
    ///
    /// Headings shift down one level (`#` becomes `<h2>`); all text is
    /// escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();

        for block in &self.blocks {
            match block {
                Block::Heading { level, text } => {
                    let tag = level.saturating_add(1).min(6);
                    let _ = write!(out, "<h{tag}>{}</h{tag}>", escape(text));
                }
                Block::Paragraph(lines) => {
                    let body: Vec<String> = lines.iter().map(|l| escape(l)).collect();
                    let _ = write!(out, "<p>{}</p>", body.join("<br>"));
                }
                Block::List(items) => {
                    out.push_str("<ul>");
                    for item in items {
                        let _ = write!(out, "<li>{}</li>", escape(item));
                    }
                    out.push_str("</ul>");
                }
                Block::Metrics(items) => metrics(&mut out, items),
                Block::Sentiment {
                    score,
                    text,
                    polarity,
                } => {
                    out.push_str(r#"<div class="sentiment-indicator">"#);
                    card(&mut out, "Sentiment Score", &score.to_string(), *polarity);
                    card(&mut out, "Overall Sentiment", text, *polarity);
                    out.push_str("</div>");
                }
            }
        }
        out
    }
}

/// Standalone HTML page with one section per analysis tab
pub fn report(symbol: &str, tabs: &[(&str, FormattedDocument)]) -> String {
    let symbol = escape(symbol);
    let mut out = format!(
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>{symbol} analysis</title></head><body><h1>{symbol}</h1>"#
    );
    for (title, doc) in tabs {
        let _ = write!(
            out,
            r#"<section><h2 class="tab-title">{}</h2>{}</section>"#,
            escape(title),
            doc.to_html()
        );
    }
    out.push_str("</body></html>");
    out
}
