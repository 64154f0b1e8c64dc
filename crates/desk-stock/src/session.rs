//! Ticker session state
//!
//! A [`TickerSession`] holds everything known about the selected ticker: the
//! price series, company info and one [`AnalysisRecord`] per analysis
//! category. It decides whether a fetch may start ([`TickerSession::begin_fetch`])
//! and applies finished fetches ([`TickerSession::complete_fetch`]). It does
//! no I/O; the controller drives it.
//!
//! Selecting a new ticker replaces the session and bumps its generation.
//! Completions carrying an older generation are discarded.

use crate::analysis::{AnalysisCategory, AnalysisOutcome};
use crate::api::{FullAnalysis, PreloadedAnalysis};
use crate::market::{PriceBar, StockInfo, StockSnapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Timing rules for fetch decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// A ready result younger than this is not re-fetched on retry
    pub freshness_window: Duration,
    /// Attempts closer together than this are treated as double clicks
    pub debounce_window: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(600),
            debounce_window: Duration::from_secs(1),
        }
    }
}

/// Lifecycle state of one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    Absent,
    Fetching,
    Populated,
    Errored,
}

/// Bookkeeping for one analysis category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRecord {
    pub outcome: Option<AnalysisOutcome>,
    /// When the last fetch finished, successfully or not
    pub fetched_at: Option<Instant>,
    /// When the last fetch was started
    pub last_attempt_at: Option<Instant>,
    pub in_flight: bool,
}

impl AnalysisRecord {
    pub fn state(&self) -> RecordState {
        if self.in_flight {
            return RecordState::Fetching;
        }
        match &self.outcome {
            None => RecordState::Absent,
            Some(AnalysisOutcome::Ready(_)) => RecordState::Populated,
            Some(AnalysisOutcome::Failed(_)) => RecordState::Errored,
        }
    }

    pub fn has_content(&self) -> bool {
        self.outcome.is_some()
    }

    /// Ready and fetched less than `window` ago
    pub fn is_fresh(&self, now: Instant, window: Duration) -> bool {
        let ready = self.outcome.as_ref().is_some_and(AnalysisOutcome::is_ready);
        ready
            && self
                .fetched_at
                .is_some_and(|at| now.saturating_duration_since(at) < window)
    }

    fn is_debounced(&self, now: Instant, window: Duration) -> bool {
        self.last_attempt_at
            .is_some_and(|at| now.saturating_duration_since(at) < window)
    }
}

/// How a fetch was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Tab switch or automatic load: cached content is served as is
    Normal,
    /// Explicit user retry: cached content does not stop the fetch
    Retry,
}

/// Why no fetch was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No ticker selected
    NoTicker,
    /// A conflicting fetch (the composite, or a part of it) is running
    Busy,
    /// Content is already present
    Cached,
    /// Ready content was fetched recently
    Fresh,
    /// This category is already being fetched
    InFlight,
    /// Too soon after the previous attempt
    Debounced,
}

/// Permission to run one fetch
///
/// Must be handed back to [`TickerSession::complete_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub category: AnalysisCategory,
    pub symbol: String,
    pub generation: u64,
}

/// Result of [`TickerSession::begin_fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDecision {
    Fetch(FetchTicket),
    Skip(SkipReason),
}

/// Successful fetch result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisPayload {
    /// Raw `result` text of one category
    Single(String),
    /// Composite response
    Full(FullAnalysis),
}

/// State of the selected ticker
#[derive(Debug, Clone, Default)]
pub struct TickerSession {
    symbol: Option<String>,
    generation: u64,
    price_series: Vec<PriceBar>,
    info: Option<StockInfo>,
    basic_summary: Option<String>,
    records: HashMap<AnalysisCategory, AnalysisRecord>,
}

impl TickerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session with an empty one for `symbol`
    ///
    /// Returns the new generation.
    pub fn reset(&mut self, symbol: impl Into<String>) -> u64 {
        let generation = self.generation + 1;
        *self = Self {
            symbol: Some(symbol.into()),
            generation,
            ..Self::default()
        };
        generation
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Price series, newest first
    pub fn price_series(&self) -> &[PriceBar] {
        &self.price_series
    }

    pub fn info(&self) -> Option<&StockInfo> {
        self.info.as_ref()
    }

    pub fn basic_summary(&self) -> Option<&str> {
        self.basic_summary.as_deref()
    }

    /// Store a loaded price series if `generation` is still current
    pub fn set_market_data(
        &mut self,
        generation: u64,
        bars: Vec<PriceBar>,
        info: Option<StockInfo>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.price_series = crate::market::newest_first(bars);
        self.info = info;
        true
    }

    pub fn snapshot(&self) -> Option<StockSnapshot> {
        let symbol = self.symbol.as_deref()?;
        StockSnapshot::from_series(symbol, &self.price_series, self.info.as_ref())
    }

    pub fn record(&self, category: AnalysisCategory) -> Option<&AnalysisRecord> {
        self.records.get(&category)
    }

    pub fn outcome(&self, category: AnalysisCategory) -> Option<&AnalysisOutcome> {
        self.record(category).and_then(|r| r.outcome.as_ref())
    }

    /// Lifecycle state; individual categories read as fetching while the
    /// composite is in flight
    pub fn state(&self, category: AnalysisCategory) -> RecordState {
        if !category.is_composite() && self.is_in_flight(AnalysisCategory::All) {
            return RecordState::Fetching;
        }
        self.record(category)
            .map_or(RecordState::Absent, AnalysisRecord::state)
    }

    fn is_in_flight(&self, category: AnalysisCategory) -> bool {
        self.record(category).is_some_and(|r| r.in_flight)
    }

    fn has_content(&self, category: AnalysisCategory) -> bool {
        if category.is_composite() {
            AnalysisCategory::INDIVIDUAL
                .iter()
                .all(|c| self.record(*c).is_some_and(AnalysisRecord::has_content))
        } else {
            self.record(category).is_some_and(AnalysisRecord::has_content)
        }
    }

    fn is_fresh(&self, category: AnalysisCategory, now: Instant, window: Duration) -> bool {
        if category.is_composite() {
            AnalysisCategory::INDIVIDUAL
                .iter()
                .all(|c| self.record(*c).is_some_and(|r| r.is_fresh(now, window)))
        } else {
            self.record(category).is_some_and(|r| r.is_fresh(now, window))
        }
    }

    fn is_busy(&self, category: AnalysisCategory) -> bool {
        if category.is_composite() {
            AnalysisCategory::INDIVIDUAL
                .iter()
                .any(|c| self.is_in_flight(*c))
        } else {
            self.is_in_flight(AnalysisCategory::All)
        }
    }

    /// Decide whether a fetch of `category` may start now
    ///
    /// On `Fetch` the attempt time is recorded and the category is marked
    /// in flight.
    pub fn begin_fetch(
        &mut self,
        category: AnalysisCategory,
        mode: FetchMode,
        now: Instant,
        policy: &FetchPolicy,
    ) -> FetchDecision {
        let Some(symbol) = self.symbol.clone() else {
            return FetchDecision::Skip(SkipReason::NoTicker);
        };

        if self.is_busy(category) {
            return FetchDecision::Skip(SkipReason::Busy);
        }

        if mode == FetchMode::Normal && self.has_content(category) {
            return FetchDecision::Skip(SkipReason::Cached);
        }

        if self.is_fresh(category, now, policy.freshness_window) {
            return FetchDecision::Skip(SkipReason::Fresh);
        }

        let record = self.records.entry(category).or_default();
        if record.in_flight {
            return FetchDecision::Skip(SkipReason::InFlight);
        }
        if record.is_debounced(now, policy.debounce_window) {
            return FetchDecision::Skip(SkipReason::Debounced);
        }

        record.last_attempt_at = Some(now);
        record.in_flight = true;

        FetchDecision::Fetch(FetchTicket {
            category,
            symbol,
            generation: self.generation,
        })
    }

    /// Apply a finished fetch
    ///
    /// Returns `false` when the ticket belongs to a replaced session; the
    /// result is then dropped untouched.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<AnalysisPayload, String>,
        now: Instant,
    ) -> bool {
        if ticket.generation != self.generation {
            return false;
        }

        let category = ticket.category;
        {
            let record = self.records.entry(category).or_default();
            record.in_flight = false;
            record.fetched_at = Some(now);
        }

        match result {
            Ok(AnalysisPayload::Single(text)) => {
                self.store(category, AnalysisOutcome::from_backend_text(text), now);
            }
            Ok(AnalysisPayload::Full(full)) => self.store_full(full, now),
            Err(message) => {
                let outcome = AnalysisOutcome::failed(message);
                for covered in category.covered() {
                    self.store(*covered, outcome.clone(), now);
                }
            }
        }
        true
    }

    fn store_full(&mut self, full: FullAnalysis, now: Instant) {
        let FullAnalysis {
            basic_summary,
            sentiment_analysis,
            technical_analysis,
            quantitative_analysis,
            risk_assessment,
        } = full;

        self.basic_summary = basic_summary.filter(|s| !s.trim().is_empty());

        let parts = [
            (AnalysisCategory::Sentiment, sentiment_analysis),
            (AnalysisCategory::Technical, technical_analysis),
            (AnalysisCategory::Quantitative, quantitative_analysis),
            (AnalysisCategory::Risk, risk_assessment),
        ];
        for (category, text) in parts {
            let outcome = match text {
                Some(text) => AnalysisOutcome::from_backend_text(text),
                None => AnalysisOutcome::failed(format!(
                    "Failed to receive valid data for {} analysis",
                    category.label()
                )),
            };
            self.store(category, outcome, now);
        }
    }

    fn store(&mut self, category: AnalysisCategory, outcome: AnalysisOutcome, now: Instant) {
        let record = self.records.entry(category).or_default();
        record.outcome = Some(outcome);
        record.fetched_at = Some(now);
    }

    /// Individual categories currently holding a failure
    pub fn failed_categories(&self) -> Vec<AnalysisCategory> {
        AnalysisCategory::INDIVIDUAL
            .into_iter()
            .filter(|c| self.outcome(*c).is_some_and(AnalysisOutcome::is_failed))
            .collect()
    }

    /// Ready analysis text to send along with a question
    pub fn preloaded_analysis(&self) -> Option<PreloadedAnalysis> {
        let ready = |c| {
            self.outcome(c)
                .and_then(AnalysisOutcome::ready_text)
                .map(str::to_string)
        };
        let preloaded = PreloadedAnalysis {
            sentiment: ready(AnalysisCategory::Sentiment),
            technical: ready(AnalysisCategory::Technical),
            quantitative: ready(AnalysisCategory::Quantitative),
            risk: ready(AnalysisCategory::Risk),
        };
        (!preloaded.is_empty()).then_some(preloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(symbol: &str) -> TickerSession {
        let mut session = TickerSession::new();
        session.reset(symbol);
        session
    }

    fn ticket(decision: FetchDecision) -> FetchTicket {
        match decision {
            FetchDecision::Fetch(ticket) => ticket,
            FetchDecision::Skip(reason) => panic!("expected fetch, skipped: {reason:?}"),
        }
    }

    fn full() -> FullAnalysis {
        FullAnalysis {
            basic_summary: Some("# Apple Inc. (AAPL)".to_string()),
            sentiment_analysis: Some("Sentiment Score: 35".to_string()),
            technical_analysis: Some("## Key Metrics\n- **RSI:** 55".to_string()),
            quantitative_analysis: Some("- **Beta:** 1.2".to_string()),
            risk_assessment: Some("- **Risk Level:** Low Risk".to_string()),
        }
    }

    #[test]
    fn test_no_ticker_skips() {
        let mut session = TickerSession::new();
        let decision = session.begin_fetch(
            AnalysisCategory::Technical,
            FetchMode::Normal,
            Instant::now(),
            &FetchPolicy::default(),
        );
        assert_eq!(decision, FetchDecision::Skip(SkipReason::NoTicker));
    }

    #[test]
    fn test_begin_marks_in_flight_then_second_call_is_suppressed() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let first = ticket(session.begin_fetch(AnalysisCategory::Risk, FetchMode::Normal, now, &policy));
        assert_eq!(first.symbol, "AAPL");
        assert_eq!(session.state(AnalysisCategory::Risk), RecordState::Fetching);

        let second = session.begin_fetch(
            AnalysisCategory::Risk,
            FetchMode::Normal,
            now + Duration::from_millis(300),
            &policy,
        );
        assert_eq!(second, FetchDecision::Skip(SkipReason::InFlight));
    }

    #[test]
    fn test_cached_content_is_served() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let t = ticket(session.begin_fetch(AnalysisCategory::Technical, FetchMode::Normal, now, &policy));
        assert!(session.complete_fetch(&t, Ok(AnalysisPayload::Single("RSI 55".to_string())), now));
        assert_eq!(session.state(AnalysisCategory::Technical), RecordState::Populated);

        // far outside every window, content still wins
        let later = now + Duration::from_secs(3600);
        let decision = session.begin_fetch(AnalysisCategory::Technical, FetchMode::Normal, later, &policy);
        assert_eq!(decision, FetchDecision::Skip(SkipReason::Cached));
    }

    #[test]
    fn test_failure_populates_error_outcome_and_clears_flag() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let t = ticket(session.begin_fetch(AnalysisCategory::Sentiment, FetchMode::Normal, now, &policy));
        session.complete_fetch(&t, Err("connection refused".to_string()), now);

        let record = session.record(AnalysisCategory::Sentiment).unwrap();
        assert!(!record.in_flight);
        assert!(record.outcome.as_ref().unwrap().text().to_lowercase().contains("error"));
        assert_eq!(session.state(AnalysisCategory::Sentiment), RecordState::Errored);
        assert_eq!(session.failed_categories(), vec![AnalysisCategory::Sentiment]);
    }

    #[test]
    fn test_retry_is_debounced_then_allowed() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let start = Instant::now();

        let t = ticket(session.begin_fetch(AnalysisCategory::Risk, FetchMode::Normal, start, &policy));
        session.complete_fetch(&t, Err("boom".to_string()), start + Duration::from_millis(100));

        let early = session.begin_fetch(
            AnalysisCategory::Risk,
            FetchMode::Retry,
            start + Duration::from_millis(500),
            &policy,
        );
        assert_eq!(early, FetchDecision::Skip(SkipReason::Debounced));

        // a normal request still sees the error as cached content
        let normal = session.begin_fetch(
            AnalysisCategory::Risk,
            FetchMode::Normal,
            start + Duration::from_secs(2),
            &policy,
        );
        assert_eq!(normal, FetchDecision::Skip(SkipReason::Cached));

        let retry = session.begin_fetch(
            AnalysisCategory::Risk,
            FetchMode::Retry,
            start + Duration::from_secs(2),
            &policy,
        );
        assert!(matches!(retry, FetchDecision::Fetch(_)));
    }

    #[test]
    fn test_fresh_ready_content_is_not_refetched_on_retry() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let t = ticket(session.begin_fetch(AnalysisCategory::Quantitative, FetchMode::Normal, now, &policy));
        session.complete_fetch(&t, Ok(AnalysisPayload::Single("- **Beta:** 1.2".to_string())), now);

        let soon = now + Duration::from_secs(60);
        let decision = session.begin_fetch(AnalysisCategory::Quantitative, FetchMode::Retry, soon, &policy);
        assert_eq!(decision, FetchDecision::Skip(SkipReason::Fresh));

        let stale = now + Duration::from_secs(601);
        let decision = session.begin_fetch(AnalysisCategory::Quantitative, FetchMode::Retry, stale, &policy);
        assert!(matches!(decision, FetchDecision::Fetch(_)));
    }

    #[test]
    fn test_freshness_requires_content() {
        let now = Instant::now();
        let record = AnalysisRecord {
            outcome: None,
            fetched_at: Some(now),
            ..Default::default()
        };
        assert!(!record.is_fresh(now, Duration::from_secs(600)));

        let record = AnalysisRecord {
            outcome: Some(AnalysisOutcome::failed("boom")),
            fetched_at: Some(now),
            ..Default::default()
        };
        assert!(!record.is_fresh(now, Duration::from_secs(600)));
    }

    #[test]
    fn test_composite_fans_out() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let t = ticket(session.begin_fetch(AnalysisCategory::All, FetchMode::Normal, now, &policy));
        for category in AnalysisCategory::INDIVIDUAL {
            assert_eq!(session.state(category), RecordState::Fetching);
        }
        assert!(session.complete_fetch(&t, Ok(AnalysisPayload::Full(full())), now));

        for category in AnalysisCategory::INDIVIDUAL {
            assert_eq!(session.state(category), RecordState::Populated, "{category}");
        }
        assert_eq!(session.basic_summary(), Some("# Apple Inc. (AAPL)"));

        let decision = session.begin_fetch(AnalysisCategory::All, FetchMode::Normal, now, &policy);
        assert_eq!(decision, FetchDecision::Skip(SkipReason::Cached));
    }

    #[test]
    fn test_composite_missing_part_is_failed() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let t = ticket(session.begin_fetch(AnalysisCategory::All, FetchMode::Normal, now, &policy));
        let partial = FullAnalysis {
            risk_assessment: None,
            ..full()
        };
        session.complete_fetch(&t, Ok(AnalysisPayload::Full(partial)), now);

        assert_eq!(session.state(AnalysisCategory::Risk), RecordState::Errored);
        assert_eq!(session.state(AnalysisCategory::Technical), RecordState::Populated);
    }

    #[test]
    fn test_composite_and_individual_exclude_each_other() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let _all = ticket(session.begin_fetch(AnalysisCategory::All, FetchMode::Normal, now, &policy));
        let decision = session.begin_fetch(AnalysisCategory::Technical, FetchMode::Normal, now, &policy);
        assert_eq!(decision, FetchDecision::Skip(SkipReason::Busy));

        let mut session = self::session("MSFT");
        let _tech = ticket(session.begin_fetch(AnalysisCategory::Technical, FetchMode::Normal, now, &policy));
        let decision = session.begin_fetch(AnalysisCategory::All, FetchMode::Normal, now, &policy);
        assert_eq!(decision, FetchDecision::Skip(SkipReason::Busy));

        // independent categories may run together
        let risk = session.begin_fetch(AnalysisCategory::Risk, FetchMode::Normal, now, &policy);
        assert!(matches!(risk, FetchDecision::Fetch(_)));
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let t = ticket(session.begin_fetch(AnalysisCategory::Technical, FetchMode::Normal, now, &policy));
        session.reset("MSFT");

        let applied = session.complete_fetch(&t, Ok(AnalysisPayload::Single("AAPL RSI".to_string())), now);
        assert!(!applied);
        assert_eq!(session.symbol(), Some("MSFT"));
        assert_eq!(session.state(AnalysisCategory::Technical), RecordState::Absent);
    }

    #[test]
    fn test_reset_clears_everything_and_bumps_generation() {
        let mut session = session("AAPL");
        let g1 = session.generation();
        assert!(session.set_market_data(g1, Vec::new(), None));

        let g2 = session.reset("MSFT");
        assert_eq!(g2, g1 + 1);
        assert!(!session.set_market_data(g1, Vec::new(), None));
        assert!(session.preloaded_analysis().is_none());
    }

    #[test]
    fn test_preloaded_analysis_only_carries_ready_text() {
        let policy = FetchPolicy::default();
        let mut session = session("AAPL");
        let now = Instant::now();

        let t = ticket(session.begin_fetch(AnalysisCategory::All, FetchMode::Normal, now, &policy));
        let mixed = FullAnalysis {
            sentiment_analysis: Some("Error in sentiment analysis: rate limited".to_string()),
            ..full()
        };
        session.complete_fetch(&t, Ok(AnalysisPayload::Full(mixed)), now);

        let preloaded = session.preloaded_analysis().unwrap();
        assert!(preloaded.sentiment.is_none());
        assert_eq!(preloaded.quantitative.as_deref(), Some("- **Beta:** 1.2"));
    }
}
