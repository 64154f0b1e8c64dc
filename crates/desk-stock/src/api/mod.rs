//! Analysis backend client

pub mod backend;
pub mod client;
pub mod types;

pub use backend::AnalysisBackend;
#[cfg(test)]
pub use backend::MockAnalysisBackend;
pub use client::DeskClient;
pub use types::{
    AnalysisResponse, FullAnalysis, HealthStatus, PreloadedAnalysis, QuestionRequest,
    StockDataResponse, TickerRequest,
};
