//! Stock analysis desk
//!
//! Client-side logic of a terminal stock-analysis desk. All market data and
//! analysis text comes from an external HTTP backend; this crate decides
//! what to ask it for and how to show the answers:
//!
//! - Chat intent routing: is a message a ticker lookup or a question?
//! - Per-category analysis caching with in-flight suppression, debounce,
//!   freshness and a stale-response guard
//! - Formatting of narrative analyses into display blocks with extracted
//!   metrics and a sentiment indicator
//! - A REPL bot with slash commands and table rendering that keeps taking
//!   input while backend requests run in the background
//!
//! # Architecture
//!
//! `DeskController` owns a `TickerSession` (price series plus one record per
//! analysis category) and the chat `Transcript`. It asks the session whether
//! a fetch may start, calls the `AnalysisBackend` without holding any lock,
//! and hands the result back to the session, which drops it if the ticker
//! changed in the meantime.
//!
//! # Example
//!
//! ```rust,ignore
//! use desk_stock::{AnalysisCategory, DeskConfig, DeskController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let controller = DeskController::from_config(DeskConfig::default())?;
//!
//!     // Loads prices, then the full analysis
//!     controller.submit_chat("find ticker AAPL").await;
//!
//!     // Served from the session, no second request
//!     controller.request_analysis(AnalysisCategory::Technical).await;
//!
//!     controller.submit_chat("What's the outlook?").await;
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod bot;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod formatter;
pub mod market;
pub mod router;
pub mod session;
pub mod transcript;

// Re-export main types for convenience
pub use analysis::{AnalysisCategory, AnalysisOutcome};
pub use api::{AnalysisBackend, DeskClient};
pub use config::DeskConfig;
pub use controller::{CategoryStatus, DeskController, DeskState, RequestStatus};
pub use error::{DeskError, Result};
pub use formatter::{Block, ContentFormatter, FormattedDocument, Metric, Polarity};
pub use market::{PriceBar, StockInfo, StockSnapshot};
pub use router::{ChatIntent, IntentRouter};
pub use session::{FetchMode, RecordState, SkipReason, TickerSession};
pub use transcript::{ChatMessage, Sender, Transcript};
