//! Terminal rendering

use crate::controller::CategoryStatus;
use crate::formatter::{Block, FormattedDocument, Metric, Polarity};
use crate::market::{PriceBar, StockSnapshot, format_compact};
use crate::session::RecordState;
use crate::transcript::{ChatMessage, Sender};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn colored(text: impl ToString, polarity: Polarity) -> Cell {
    let cell = Cell::new(text.to_string());
    match polarity {
        Polarity::Positive => cell.fg(Color::Green),
        Polarity::Negative => cell.fg(Color::Red),
        Polarity::Neutral => cell,
    }
}

fn numeric(text: impl ToString) -> Cell {
    Cell::new(text.to_string()).set_alignment(CellAlignment::Right)
}

fn metrics_table(metrics: &[Metric]) -> String {
    let mut table = table();
    table.set_header(vec!["Metric", "Value"]);
    for metric in metrics {
        table.add_row(vec![
            Cell::new(&metric.name),
            colored(&metric.value, metric.class),
        ]);
    }
    table.to_string()
}

/// Render a formatted analysis for the terminal
pub fn document(doc: &FormattedDocument) -> String {
    let mut out: Vec<String> = Vec::new();

    for block in &doc.blocks {
        match block {
            Block::Heading { level: 1, text } => {
                out.push(text.to_uppercase());
                out.push("=".repeat(text.chars().count()));
            }
            Block::Heading { text, .. } => {
                out.push(String::new());
                out.push(text.clone());
                out.push("-".repeat(text.chars().count()));
            }
            Block::Paragraph(lines) => {
                out.extend(lines.iter().cloned());
                out.push(String::new());
            }
            Block::List(items) => {
                out.extend(items.iter().map(|item| format!("  • {item}")));
                out.push(String::new());
            }
            Block::Metrics(metrics) => {
                out.push(metrics_table(metrics));
                out.push(String::new());
            }
            Block::Sentiment {
                score,
                text,
                polarity,
            } => {
                let mut table = table();
                table.set_header(vec!["Sentiment Score", "Overall Sentiment"]);
                table.add_row(vec![colored(score, *polarity), colored(text, *polarity)]);
                out.push(table.to_string());
                out.push(String::new());
            }
        }
    }

    out.join("\n").trim_end().to_string()
}

/// Price table, newest first, at most `rows` rows
pub fn prices(bars: &[PriceBar], rows: usize) -> String {
    let mut table = table();
    table.set_header(vec![
        "Date", "Open", "High", "Low", "Close", "Volume", "Change", "% Change",
    ]);

    for bar in bars.iter().take(rows) {
        let polarity = if bar.is_up() {
            Polarity::Positive
        } else {
            Polarity::Negative
        };
        table.add_row(vec![
            Cell::new(bar.date),
            numeric(format!("{:.2}", bar.open)),
            numeric(format!("{:.2}", bar.high)),
            numeric(format!("{:.2}", bar.low)),
            numeric(format!("{:.2}", bar.close)),
            numeric(format_compact(bar.volume as f64)),
            colored(format!("{:+.2}", bar.change), polarity).set_alignment(CellAlignment::Right),
            colored(format!("{:+.2}%", bar.percent_change), polarity)
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

fn optional(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map_or_else(|| "N/A".to_string(), format)
}

/// Company snapshot panel
pub fn snapshot(snapshot: &StockSnapshot) -> String {
    let polarity = if snapshot.is_up() {
        Polarity::Positive
    } else {
        Polarity::Negative
    };

    let mut table = table();
    table.set_header(vec![
        Cell::new(format!("{} ({})", snapshot.name, snapshot.symbol)),
        Cell::new(""),
    ]);
    table.add_row(vec![Cell::new("Sector"), Cell::new(&snapshot.sector)]);
    table.add_row(vec![Cell::new("Industry"), Cell::new(&snapshot.industry)]);
    table.add_row(vec![
        Cell::new("Price"),
        numeric(format!("${:.2}", snapshot.price)),
    ]);
    table.add_row(vec![
        Cell::new("Change"),
        colored(
            format!("{:+.2} ({:+.2}%)", snapshot.change, snapshot.percent_change),
            polarity,
        ),
    ]);
    table.add_row(vec![
        Cell::new("Period high"),
        numeric(format!("${:.2}", snapshot.period_high)),
    ]);
    table.add_row(vec![
        Cell::new("Period low"),
        numeric(format!("${:.2}", snapshot.period_low)),
    ]);
    table.add_row(vec![
        Cell::new("Market cap"),
        numeric(optional(snapshot.market_cap, |v| format!("${}", format_compact(v)))),
    ]);
    table.add_row(vec![
        Cell::new("Beta"),
        numeric(optional(snapshot.beta, |v| format!("{v:.2}"))),
    ]);
    table.add_row(vec![
        Cell::new("P/E"),
        numeric(optional(snapshot.pe_ratio, |v| format!("{v:.2}"))),
    ]);
    table.add_row(vec![
        Cell::new("Dividend yield"),
        numeric(optional(snapshot.dividend_yield, |v| format!("{:.2}%", v * 100.0))),
    ]);
    table.to_string()
}

pub fn state_label(state: RecordState) -> &'static str {
    match state {
        RecordState::Absent => "pending",
        RecordState::Fetching => "running",
        RecordState::Populated => "completed",
        RecordState::Errored => "failed",
    }
}

/// Analysis status panel
pub fn status(symbol: &str, statuses: &[CategoryStatus]) -> String {
    let mut table = table();
    table.set_header(vec![Cell::new(symbol), Cell::new("Status")]);
    for entry in statuses {
        let polarity = match entry.state {
            RecordState::Populated => Polarity::Positive,
            RecordState::Errored => Polarity::Negative,
            RecordState::Absent | RecordState::Fetching => Polarity::Neutral,
        };
        table.add_row(vec![
            Cell::new(entry.category.title()),
            colored(state_label(entry.state), polarity),
        ]);
    }
    table.to_string()
}

fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You",
        Sender::Assistant => "Assistant",
        Sender::System => "Desk",
    }
}

/// One line per message, `[HH:MM] Who: text`
pub fn messages(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("[{}] {}: {}", m.timestamp, sender_label(m.sender), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}
