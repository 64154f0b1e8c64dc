//! Slash commands of the desk REPL
//!
//! Anything not starting with `/` is chat and goes through the intent router.

use crate::analysis::AnalysisCategory;
use crate::error::{DeskError, Result};
use std::path::PathBuf;

/// Rows shown by `/data` without an argument
pub const DEFAULT_DATA_ROWS: usize = 10;

/// Messages shown by `/history` without an argument
pub const DEFAULT_HISTORY: usize = 20;

/// Parsed user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Select a ticker and load everything for it
    Ticker { symbol: String },
    /// Reload the selected ticker, bypassing the price cache
    Refresh,
    /// Show one analysis tab, fetching it if needed
    Show { category: AnalysisCategory },
    /// Retry one category, or every failed one
    Retry { category: Option<AnalysisCategory> },
    /// Price table, newest first
    Data { rows: usize },
    /// Company snapshot
    Info,
    /// Write the ready analyses to an HTML file
    Export { path: PathBuf },
    /// Per-category status panel
    Status,
    /// Backend health check
    Health,
    /// Recent transcript messages
    History { count: usize },
    /// Clear the transcript
    Clear,
    Help,
    Exit,
    /// Free text for the chat box
    Chat { text: String },
}

fn count_arg(args: &[&str], default: usize, what: &str) -> Result<usize> {
    match args.first() {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| DeskError::Command(format!("{what} must be a positive number"))),
    }
}

impl Command {
    /// Parse a line of user input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            return Err(DeskError::Command("Empty input".to_string()));
        }

        let Some(body) = input.strip_prefix('/') else {
            return Ok(Command::Chat {
                text: input.to_string(),
            });
        };

        let parts: Vec<&str> = body.split_whitespace().collect();
        let Some((cmd, args)) = parts.split_first() else {
            return Err(DeskError::Command("Empty command".to_string()));
        };
        let cmd = cmd.to_lowercase();

        match cmd.as_str() {
            "ticker" | "search" | "s" => {
                let symbol = args.first().ok_or_else(|| {
                    DeskError::Command("Missing symbol for ticker command".to_string())
                })?;
                Ok(Command::Ticker {
                    symbol: symbol.to_uppercase(),
                })
            }
            "refresh" | "reload" => Ok(Command::Refresh),
            "sentiment" => Ok(Command::Show {
                category: AnalysisCategory::Sentiment,
            }),
            "technical" | "tech" | "t" => Ok(Command::Show {
                category: AnalysisCategory::Technical,
            }),
            "quantitative" | "quant" | "q" => Ok(Command::Show {
                category: AnalysisCategory::Quantitative,
            }),
            "risk" | "r" => Ok(Command::Show {
                category: AnalysisCategory::Risk,
            }),
            "all" | "full" => Ok(Command::Show {
                category: AnalysisCategory::All,
            }),
            "show" | "tab" => {
                let raw = args.first().ok_or_else(|| {
                    DeskError::Command("Missing category for show command".to_string())
                })?;
                Ok(Command::Show {
                    category: raw.parse()?,
                })
            }
            "retry" => {
                let category = args.first().map(|raw| raw.parse()).transpose()?;
                Ok(Command::Retry { category })
            }
            "data" | "prices" => Ok(Command::Data {
                rows: count_arg(args, DEFAULT_DATA_ROWS, "Row count")?,
            }),
            "info" | "i" => Ok(Command::Info),
            "export" => {
                let path = args.first().ok_or_else(|| {
                    DeskError::Command("Missing file path for export command".to_string())
                })?;
                Ok(Command::Export {
                    path: PathBuf::from(path),
                })
            }
            "status" => Ok(Command::Status),
            "health" => Ok(Command::Health),
            "history" => Ok(Command::History {
                count: count_arg(args, DEFAULT_HISTORY, "Message count")?,
            }),
            "clear" | "cls" => Ok(Command::Clear),
            "help" | "h" | "?" => Ok(Command::Help),
            "exit" | "quit" => Ok(Command::Exit),
            _ => Err(DeskError::Command(format!("Unknown command: {cmd}"))),
        }
    }

    /// Help text for all commands
    pub fn help_text() -> &'static str {
        r#"
Stock Desk Commands
===================

Ticker:
  /ticker <symbol>        Select a ticker and run the full analysis
  /data [rows]            Price table, newest first (default 10 rows)
  /info                   Company snapshot
  /refresh                Reload the ticker, skipping cached prices

Analysis tabs:
  /sentiment              Sentiment analysis
  /technical              Technical analysis
  /quant                  Quantitative analysis
  /risk                   Risk assessment
  /all                    Full analysis (all four tabs)
  /show <category>        Any of the above by name
  /retry [category]       Retry one category, or every failed one
  /status                 Analysis status per category
  /export <file>          Save the ready analyses as an HTML page

Other:
  /history [n]            Last n transcript messages (default 20)
  /clear                  Clear the transcript
  /health                 Check the analysis backend
  /help                   Show this help
  /exit                   Exit

Aliases:
  /s = /ticker   /t = /technical   /q = /quant   /r = /risk   /i = /info

Chat:
  Anything else is sent to the chat. "find ticker MSFT" switches ticker;
  other messages are answered about the selected ticker.
"#
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Ticker { .. } => "Select ticker",
            Command::Refresh => "Reload ticker",
            Command::Show { .. } => "Show analysis",
            Command::Retry { .. } => "Retry analysis",
            Command::Data { .. } => "Price table",
            Command::Info => "Company snapshot",
            Command::Export { .. } => "Export report",
            Command::Status => "Analysis status",
            Command::Health => "Backend health",
            Command::History { .. } => "Transcript history",
            Command::Clear => "Clear transcript",
            Command::Help => "Show help",
            Command::Exit => "Exit the desk",
            Command::Chat { .. } => "Chat message",
        }
    }
}
