//! Stock desk REPL bot
//!
//! Wraps a [`DeskController`] with slash commands and terminal rendering.
//! Every reply starts with the transcript lines produced since the previous
//! reply, followed by whatever the command displays. Commands that call the
//! backend return at once; their results are collected later.
//!
//! # Example
//!
//! ```rust,ignore
//! use desk_stock::bot::{BotConfig, BotReply, DeskBot};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut bot = DeskBot::new(BotConfig::from_env()?)?;
//!     println!("{}", bot.welcome().await);
//!     if let BotReply::Output(text) = bot.process_input("/ticker AAPL").await? {
//!         println!("{text}");
//!     }
//!     while let Some(text) = bot.next_completion().await {
//!         println!("{text}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod render;

use crate::analysis::{AnalysisCategory, AnalysisOutcome};
use crate::config::DeskConfig;
use crate::controller::{DeskController, DeskState, RequestStatus, normalize_search};
use crate::error::{DeskError, Result};
use crate::formatter::ContentFormatter;
use crate::session::{FetchMode, RecordState, SkipReason};
use crate::transcript::{ChatMessage, Sender};
use tokio::task::JoinSet;

pub use commands::Command;

/// Configuration for the desk bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Controller and backend configuration
    pub desk: DeskConfig,
    /// Prompt prefix
    pub prompt: String,
    /// Whether transcript lines carry their `HH:MM` stamp
    pub show_timestamps: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            desk: DeskConfig::default(),
            prompt: "desk> ".to_string(),
            show_timestamps: true,
        }
    }
}

impl BotConfig {
    /// Desk configuration from `STOCK_DESK_*` variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            desk: DeskConfig::builder().with_env().build()?,
            ..Default::default()
        })
    }

    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }
}

/// Builder for BotConfig
#[derive(Debug, Default)]
pub struct BotConfigBuilder {
    desk: Option<DeskConfig>,
    prompt: Option<String>,
    show_timestamps: Option<bool>,
}

impl BotConfigBuilder {
    pub fn desk(mut self, config: DeskConfig) -> Self {
        self.desk = Some(config);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = Some(show);
        self
    }

    pub fn build(self) -> BotConfig {
        let defaults = BotConfig::default();
        BotConfig {
            desk: self.desk.unwrap_or(defaults.desk),
            prompt: self.prompt.unwrap_or(defaults.prompt),
            show_timestamps: self.show_timestamps.unwrap_or(defaults.show_timestamps),
        }
    }
}

/// Outcome of one line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReply {
    Output(String),
    Exit,
}

/// What a background command finished with
#[derive(Debug)]
enum Completion {
    /// Ticker load or refresh
    Loaded,
    /// One tab fetch
    Tab(AnalysisCategory, RequestStatus),
    /// Retry of every failed category
    Retried(Vec<(AnalysisCategory, RequestStatus)>),
    /// Chat message handled
    Chat,
}

/// Interactive desk
///
/// Commands that reach the backend run as background tasks, so input keeps
/// flowing while an analysis is outstanding. Their results come back
/// through [`DeskBot::next_completion`]; transcript lines written in the
/// meantime through [`DeskBot::progress`].
pub struct DeskBot {
    controller: DeskController,
    config: BotConfig,
    /// Id of the newest transcript message already shown
    last_seen: u64,
    tasks: JoinSet<Completion>,
}

impl DeskBot {
    /// Create a bot talking to the HTTP backend
    pub fn new(config: BotConfig) -> Result<Self> {
        let controller = DeskController::from_config(config.desk.clone())?;
        Ok(Self::with_controller(controller, config))
    }

    /// Create a bot over an existing controller
    pub fn with_controller(controller: DeskController, config: BotConfig) -> Self {
        Self {
            controller,
            config,
            last_seen: 0,
            tasks: JoinSet::new(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.config.prompt
    }

    pub fn controller(&self) -> &DeskController {
        &self.controller
    }

    /// Number of background commands still running
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Transcript lines written before any input, usually the welcome
    pub async fn welcome(&mut self) -> String {
        self.progress().await
    }

    /// Transcript lines written since the last reply
    pub async fn progress(&mut self) -> String {
        let fresh = self.drain().await;
        self.lines(&fresh)
    }

    /// Process one line of input
    pub async fn process_input(&mut self, input: &str) -> Result<BotReply> {
        let command = Command::parse(input)?;
        tracing::debug!("{}: {:?}", command.description(), command);
        self.execute_command(command).await
    }

    /// Execute a parsed command
    ///
    /// Backend work is started in the background and the reply carries
    /// only what is known right away.
    pub async fn execute_command(&mut self, command: Command) -> Result<BotReply> {
        let body = match command {
            Command::Exit => return Ok(BotReply::Exit),
            Command::Help => Command::help_text().trim().to_string(),
            Command::Chat { text } => {
                let controller = self.controller.clone();
                self.tasks.spawn(async move {
                    controller.submit_chat(&text).await;
                    Completion::Chat
                });
                String::new()
            }
            Command::Ticker { symbol } => {
                let symbol = normalize_search(&symbol)?;
                let controller = self.controller.clone();
                let body = format!("Loading {symbol}...");
                self.tasks.spawn(async move {
                    if let Err(e) = controller.submit_ticker(&symbol).await {
                        tracing::warn!("Ticker load for {} failed: {}", symbol, e);
                    }
                    Completion::Loaded
                });
                body
            }
            Command::Refresh => {
                let symbol = self
                    .controller
                    .symbol()
                    .await
                    .ok_or(DeskError::NoTickerSelected)?;
                let controller = self.controller.clone();
                self.tasks.spawn(async move {
                    if let Err(e) = controller.refresh().await {
                        tracing::warn!("Refresh failed: {}", e);
                    }
                    Completion::Loaded
                });
                format!("Reloading {symbol}...")
            }
            Command::Show { category } => self.start_tab(category, FetchMode::Normal).await,
            Command::Retry {
                category: Some(category),
            } => self.start_tab(category, FetchMode::Retry).await,
            Command::Retry { category: None } => {
                let failed = self.controller.read(|s| s.session.failed_categories()).await;
                if failed.is_empty() {
                    "Nothing to retry.".to_string()
                } else {
                    let controller = self.controller.clone();
                    self.tasks
                        .spawn(async move { Completion::Retried(controller.retry_failed().await) });
                    format!("Retrying {} failed analyses...", failed.len())
                }
            }
            Command::Data { rows } => {
                self.controller
                    .read(|s| {
                        let series = s.session.price_series();
                        if series.is_empty() {
                            "No price data loaded. Use /ticker <symbol> first.".to_string()
                        } else {
                            render::prices(series, rows)
                        }
                    })
                    .await
            }
            Command::Info => {
                self.controller
                    .read(|s| match s.session.snapshot() {
                        Some(snapshot) => render::snapshot(&snapshot),
                        None => "No stock data loaded. Use /ticker <symbol> first.".to_string(),
                    })
                    .await
            }
            Command::Export { path } => {
                let html = self.controller.report_html().await?;
                tokio::fs::write(&path, html).await?;
                format!("Report written to {}", path.display())
            }
            Command::Status => {
                let statuses = self.controller.status().await;
                match self.controller.symbol().await {
                    Some(symbol) => render::status(&symbol, &statuses),
                    None => "No ticker selected.".to_string(),
                }
            }
            Command::Health => match self.controller.health().await {
                Ok(health) => format!(
                    "Backend {}: {} (version {})",
                    health.status, health.message, health.version
                ),
                Err(e) => {
                    tracing::warn!("Health check failed: {}", e);
                    format!("Backend unreachable: {}", e.user_message())
                }
            },
            Command::History { count } => {
                let history = self.controller.read(|s| s.transcript.last(count)).await;
                // already shown, so don't repeat them below
                self.last_seen = self.controller.read(|s| s.transcript.last_id()).await;
                if history.is_empty() {
                    "Transcript is empty.".to_string()
                } else {
                    render::messages(&history)
                }
            }
            Command::Clear => {
                self.controller.clear_transcript().await;
                self.last_seen = self.controller.read(|s| s.transcript.last_id()).await;
                "Transcript cleared.".to_string()
            }
        };

        Ok(BotReply::Output(self.compose(body).await))
    }

    /// Wait for the next background command and render what it produced
    ///
    /// Returns `None` when nothing is running.
    pub async fn next_completion(&mut self) -> Option<String> {
        let body = match self.tasks.join_next().await? {
            Ok(completion) => self.render_completion(completion).await,
            Err(e) => {
                tracing::warn!("Background command failed: {}", e);
                format!("Error: background command failed: {e}")
            }
        };
        Some(self.compose(body).await)
    }

    /// Wait for every background command
    pub async fn settle(&mut self) -> String {
        let mut parts = Vec::new();
        while let Some(text) = self.next_completion().await {
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n\n")
    }

    /// Start a tab fetch in the background, or render the tab as it is
    async fn start_tab(&mut self, category: AnalysisCategory, mode: FetchMode) -> String {
        match self.controller.begin(category, mode).await {
            Ok(ticket) => {
                let controller = self.controller.clone();
                self.tasks.spawn(async move {
                    Completion::Tab(category, controller.finish(ticket).await)
                });
                self.controller.read(|s| render_tab(s, category)).await
            }
            Err(SkipReason::NoTicker) => {
                "No ticker selected. Use /ticker <symbol> first.".to_string()
            }
            Err(reason @ (SkipReason::Debounced | SkipReason::Fresh)) => {
                let tab = self.controller.read(|s| render_tab(s, category)).await;
                format!("{}: {}\n{tab}", category.title(), describe(RequestStatus::Skipped(reason)))
            }
            Err(_) => self.controller.read(|s| render_tab(s, category)).await,
        }
    }

    async fn render_completion(&self, completion: Completion) -> String {
        match completion {
            Completion::Loaded => self
                .controller
                .read(|s| s.session.snapshot().map(|snap| render::snapshot(&snap)))
                .await
                .unwrap_or_default(),
            Completion::Tab(_, RequestStatus::Discarded) | Completion::Chat => String::new(),
            Completion::Tab(category, _) => self.controller.read(|s| render_tab(s, category)).await,
            Completion::Retried(results) => results
                .iter()
                .map(|(category, status)| format!("{}: {}", category.title(), describe(*status)))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Unseen transcript lines followed by `body`
    async fn compose(&mut self, body: String) -> String {
        let mut parts = Vec::new();
        let lines = self.progress().await;
        if !lines.is_empty() {
            parts.push(lines);
        }
        if !body.is_empty() {
            parts.push(body);
        }
        parts.join("\n\n")
    }

    /// Transcript messages not shown yet
    async fn drain(&mut self) -> Vec<ChatMessage> {
        let fresh = self.controller.messages_since(self.last_seen).await;
        if let Some(last) = fresh.last() {
            self.last_seen = last.id;
        }
        fresh
    }

    /// Render transcript lines, leaving out the user's own input
    fn lines(&self, messages: &[ChatMessage]) -> String {
        let shown: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.sender != Sender::User)
            .cloned()
            .collect();
        if self.config.show_timestamps {
            render::messages(&shown)
        } else {
            shown
                .iter()
                .map(|m| m.text.clone())
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

fn describe(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Completed => "completed",
        RequestStatus::Failed => "failed again",
        RequestStatus::Discarded => "discarded, ticker changed",
        RequestStatus::Skipped(SkipReason::Debounced) => "too soon, try again in a moment",
        RequestStatus::Skipped(SkipReason::Fresh) => "already up to date",
        RequestStatus::Skipped(SkipReason::Busy | SkipReason::InFlight) => "already running",
        RequestStatus::Skipped(_) => "skipped",
    }
}

/// Render one tab, or all four for the composite
fn render_tab(state: &DeskState, category: AnalysisCategory) -> String {
    if category.is_composite() {
        return AnalysisCategory::INDIVIDUAL
            .into_iter()
            .map(|c| render_tab(state, c))
            .collect::<Vec<_>>()
            .join("\n\n");
    }

    let mut out = vec![format!("── {} ──", category.title())];

    if category == AnalysisCategory::Sentiment {
        if let Some(summary) = state.session.basic_summary() {
            let doc = ContentFormatter::format(summary, AnalysisCategory::All);
            out.push(render::document(&doc));
        }
    }

    let body = match (state.session.state(category), state.session.outcome(category)) {
        (RecordState::Fetching, _) => "Analysis in progress...".to_string(),
        (_, Some(AnalysisOutcome::Ready(text))) => {
            render::document(&ContentFormatter::format(text, category))
        }
        (_, Some(AnalysisOutcome::Failed(message))) => {
            format!("{message}\nUse /retry {} to try again.", category.label())
        }
        (_, None) => "No analysis yet.".to_string(),
    };
    out.push(body);
    out.join("\n")
}
