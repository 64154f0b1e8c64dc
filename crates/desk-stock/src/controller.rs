//! Desk controller
//!
//! Owns the [`TickerSession`] and the [`Transcript`] and drives the backend.
//! Every user action ends up here: ticker submissions, tab requests, retries
//! and chat messages. Backend failures never escape; they are recorded as
//! failed outcomes and transcript lines so the desk stays usable.
//!
//! The controller is cheap to clone. State lives behind one
//! `Arc<RwLock<DeskState>>`; the lock is released before every backend call
//! and re-taken to apply the result.

use crate::analysis::AnalysisCategory;
use crate::api::{AnalysisBackend, DeskClient, HealthStatus, QuestionRequest};
use crate::cache::PriceCache;
use crate::config::DeskConfig;
use crate::error::{DeskError, Result};
use crate::formatter::{self, ContentFormatter};
use crate::router::{ChatIntent, IntentRouter};
use crate::session::{
    AnalysisPayload, FetchDecision, FetchMode, FetchPolicy, FetchTicket, RecordState, SkipReason,
    TickerSession,
};
use crate::transcript::{ChatMessage, Transcript};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Longest symbol accepted from the search box
const MAX_SEARCH_LEN: usize = 10;

/// Shared mutable state of one desk
#[derive(Debug, Default)]
pub struct DeskState {
    pub session: TickerSession,
    pub transcript: Transcript,
}

/// What happened to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Nothing was sent
    Skipped(SkipReason),
    /// The backend answered and the result was stored
    Completed,
    /// The request failed; a failure was stored
    Failed,
    /// The ticker changed while the request ran; the result was dropped
    Discarded,
}

/// Lifecycle state of one category, for status displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStatus {
    pub category: AnalysisCategory,
    pub state: RecordState,
}

/// Orchestrates the desk session
#[derive(Clone)]
pub struct DeskController {
    backend: Arc<dyn AnalysisBackend>,
    config: Arc<DeskConfig>,
    policy: FetchPolicy,
    router: IntentRouter,
    prices: PriceCache,
    state: Arc<RwLock<DeskState>>,
}

impl std::fmt::Debug for DeskController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeskController")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DeskController {
    /// Create a controller over an arbitrary backend
    pub fn new(backend: Arc<dyn AnalysisBackend>, config: DeskConfig) -> Self {
        let mut transcript = Transcript::with_max_len(config.max_transcript);
        if !config.welcome_message.is_empty() {
            transcript.system(config.welcome_message.clone());
        }

        Self {
            backend,
            policy: FetchPolicy {
                freshness_window: config.freshness_window,
                debounce_window: config.debounce_window,
            },
            router: IntentRouter::new(),
            prices: PriceCache::new(config.stock_data_ttl),
            state: Arc::new(RwLock::new(DeskState {
                session: TickerSession::new(),
                transcript,
            })),
            config: Arc::new(config),
        }
    }

    /// Create a controller talking to the HTTP backend
    pub fn from_config(config: DeskConfig) -> Result<Self> {
        config.validate()?;
        let client = DeskClient::new(&config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// Run `f` against the current state under the read lock
    pub async fn read<R>(&self, f: impl FnOnce(&DeskState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    pub async fn symbol(&self) -> Option<String> {
        self.read(|s| s.session.symbol().map(str::to_string)).await
    }

    /// Per-category status of the current session
    pub async fn status(&self) -> Vec<CategoryStatus> {
        self.read(|s| {
            AnalysisCategory::INDIVIDUAL
                .into_iter()
                .map(|category| CategoryStatus {
                    category,
                    state: s.session.state(category),
                })
                .collect()
        })
        .await
    }

    /// Transcript messages newer than `id`
    pub async fn messages_since(&self, id: u64) -> Vec<ChatMessage> {
        self.read(|s| s.transcript.since(id)).await
    }

    pub async fn clear_transcript(&self) {
        self.state.write().await.transcript.clear();
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.backend.health().await
    }

    /// Handle a line typed into the chat box
    ///
    /// Blank input is ignored and returns `None`.
    pub async fn submit_chat(&self, text: &str) -> Option<ChatIntent> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.state.write().await.transcript.user(text);

        let intent = self.router.classify(text);
        match &intent {
            ChatIntent::TickerLookup { symbol } => {
                info!("Chat lookup for {}", symbol);
                self.load_ticker(symbol).await;
            }
            ChatIntent::Question { text } => {
                self.ask(text).await;
            }
        }
        Some(intent)
    }

    /// Handle a symbol typed into the search box
    pub async fn submit_ticker(&self, symbol: &str) -> Result<()> {
        let symbol = normalize_search(symbol)?;
        self.state
            .write()
            .await
            .transcript
            .user(format!("Searching for stock data: {symbol}"));
        self.load_ticker(&symbol).await;
        Ok(())
    }

    /// Drop the cached prices of the selected ticker and load it again
    pub async fn refresh(&self) -> Result<()> {
        let symbol = self.symbol().await.ok_or(DeskError::NoTickerSelected)?;
        self.prices.invalidate(&symbol).await;
        self.state
            .write()
            .await
            .transcript
            .user(format!("Searching for stock data: {symbol}"));
        self.load_ticker(&symbol).await;
        Ok(())
    }

    /// HTML page with the summary and every ready analysis of the ticker
    pub async fn report_html(&self) -> Result<String> {
        self.read(|s| -> Result<String> {
            let symbol = s.session.symbol().ok_or(DeskError::NoTickerSelected)?;
            let mut tabs = Vec::new();
            if let Some(summary) = s.session.basic_summary() {
                tabs.push((
                    "Overview",
                    ContentFormatter::format(summary, AnalysisCategory::All),
                ));
            }
            for category in AnalysisCategory::INDIVIDUAL {
                if let Some(text) = s.session.outcome(category).and_then(|o| o.ready_text()) {
                    tabs.push((category.title(), ContentFormatter::format(text, category)));
                }
            }
            Ok(formatter::report(symbol, &tabs))
        })
        .await
    }

    /// Reset the session to `symbol`, load its prices, then the full analysis
    async fn load_ticker(&self, symbol: &str) {
        let generation = self.state.write().await.session.reset(symbol);
        info!("Loading {} (generation {})", symbol, generation);

        let backend = Arc::clone(&self.backend);
        let loaded = self
            .prices
            .get_or_fetch(symbol, || async move { backend.stock_data(symbol).await })
            .await;

        {
            let mut state = self.state.write().await;
            if state.session.generation() != generation {
                warn!("Discarding price data for {}: ticker changed", symbol);
                return;
            }

            match loaded {
                Ok(response) => {
                    state
                        .session
                        .set_market_data(generation, response.data, response.info);
                    state
                        .transcript
                        .system(format!("Successfully loaded data for {symbol}"));
                }
                Err(e) => {
                    warn!("Stock data for {} failed: {}", symbol, e);
                    state
                        .transcript
                        .system(format!("Error: Could not retrieve data for {symbol}"));
                    return;
                }
            }
        }

        self.request_analysis(AnalysisCategory::All).await;
    }

    /// Show a category, fetching it only when nothing usable is cached
    pub async fn request_analysis(&self, category: AnalysisCategory) -> RequestStatus {
        self.run(category, FetchMode::Normal).await
    }

    /// Explicit retry: ignores cached content but still honours freshness
    pub async fn retry(&self, category: AnalysisCategory) -> RequestStatus {
        self.run(category, FetchMode::Retry).await
    }

    /// Retry every failed category concurrently
    pub async fn retry_failed(&self) -> Vec<(AnalysisCategory, RequestStatus)> {
        let failed = self.read(|s| s.session.failed_categories()).await;
        if failed.is_empty() {
            debug!("Nothing to retry");
            return Vec::new();
        }

        let statuses = join_all(failed.iter().map(|c| self.retry(*c))).await;
        failed.into_iter().zip(statuses).collect()
    }

    async fn run(&self, category: AnalysisCategory, mode: FetchMode) -> RequestStatus {
        match self.begin(category, mode).await {
            Ok(ticket) => self.finish(ticket).await,
            Err(reason) => RequestStatus::Skipped(reason),
        }
    }

    /// Decide whether `category` may be fetched now
    ///
    /// On success the category is marked in flight and the returned ticket
    /// must be handed to [`DeskController::finish`].
    pub async fn begin(
        &self,
        category: AnalysisCategory,
        mode: FetchMode,
    ) -> std::result::Result<FetchTicket, SkipReason> {
        let mut state = self.state.write().await;
        match state
            .session
            .begin_fetch(category, mode, Instant::now(), &self.policy)
        {
            FetchDecision::Skip(reason) => {
                debug!("Skipping {} analysis: {:?}", category, reason);
                Err(reason)
            }
            FetchDecision::Fetch(ticket) => {
                let line = if category.is_composite() {
                    format!("Loading comprehensive analysis for {}...", ticket.symbol)
                } else {
                    format!(
                        "Performing {} analysis for {}...",
                        category.label(),
                        ticket.symbol
                    )
                };
                state.transcript.system(line);
                Ok(ticket)
            }
        }
    }

    /// Run a started fetch and apply its result
    pub async fn finish(&self, ticket: FetchTicket) -> RequestStatus {
        let category = ticket.category;
        info!("Fetching {} analysis for {}", category, ticket.symbol);
        let result = self.fetch(&ticket).await;
        if let Err(e) = &result {
            warn!("{} analysis for {} failed: {}", category, ticket.symbol, e);
        }

        let mut state = self.state.write().await;
        let applied = state.session.complete_fetch(
            &ticket,
            result.map_err(|e| e.user_message()),
            Instant::now(),
        );
        if !applied {
            warn!(
                "Discarding {} analysis for {}: ticker changed",
                category, ticket.symbol
            );
            return RequestStatus::Discarded;
        }

        let failed = category
            .covered()
            .iter()
            .all(|c| state.session.outcome(*c).is_some_and(|o| o.is_failed()));
        let symbol = &ticket.symbol;
        if failed {
            let line = if category.is_composite() {
                format!("Error: Could not complete full analysis for {symbol}")
            } else {
                format!(
                    "Error: Failed to perform {} analysis for {symbol}.",
                    category.label()
                )
            };
            state.transcript.system(line);
            RequestStatus::Failed
        } else if category.is_composite() {
            state.transcript.system(format!(
                "Analysis complete. Ask me questions about {symbol} in the chat!"
            ));
            RequestStatus::Completed
        } else {
            state.transcript.system(format!(
                "{} analysis completed for {symbol}.",
                capitalize(category.label())
            ));
            RequestStatus::Completed
        }
    }

    async fn fetch(&self, ticket: &FetchTicket) -> Result<AnalysisPayload> {
        if ticket.category.is_composite() {
            let full = self.backend.full_analysis(&ticket.symbol).await?;
            Ok(AnalysisPayload::Full(full))
        } else {
            let text = self
                .backend
                .single_analysis(ticket.category, &ticket.symbol)
                .await?;
            Ok(AnalysisPayload::Single(text))
        }
    }

    /// Forward a question about the selected ticker
    pub async fn ask(&self, question: &str) -> RequestStatus {
        let (request, generation) = {
            let mut state = self.state.write().await;
            let Some(symbol) = state.session.symbol().map(str::to_string) else {
                state.transcript.system(
                    "Please enter a ticker symbol first before asking questions.",
                );
                return RequestStatus::Skipped(SkipReason::NoTicker);
            };

            state
                .transcript
                .system(format!("Analyzing {symbol} based on your question..."));
            let request = QuestionRequest {
                ticker: symbol,
                question: question.to_string(),
                preloaded_analysis: state.session.preloaded_analysis(),
            };
            (request, state.session.generation())
        };

        info!(
            "Question for {} (context: {})",
            request.ticker,
            request.preloaded_analysis.is_some()
        );
        let answer = self.backend.ask(&request).await;

        let mut state = self.state.write().await;
        if state.session.generation() != generation {
            warn!("Discarding answer about {}: ticker changed", request.ticker);
            return RequestStatus::Discarded;
        }

        match answer {
            Ok(answer) => {
                state.transcript.assistant(answer);
                RequestStatus::Completed
            }
            Err(e) => {
                warn!("Question about {} failed: {}", request.ticker, e);
                state
                    .transcript
                    .system(format!("Error during analysis: {}", e.user_message()));
                RequestStatus::Failed
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Search-box symbols are upper-cased; class shares like `BRK.B` are allowed
pub fn normalize_search(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SEARCH_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^'));

    if valid {
        Ok(symbol)
    } else {
        Err(DeskError::InvalidTicker(raw.trim().to_string()))
    }
}
