//! Backend abstraction consumed by the desk controller

use super::types::{FullAnalysis, HealthStatus, QuestionRequest, StockDataResponse};
use crate::analysis::AnalysisCategory;
use crate::error::Result;
use async_trait::async_trait;

/// Remote analysis service
///
/// `DeskClient` talks to the real HTTP backend; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Price series and company info for a ticker
    async fn stock_data(&self, ticker: &str) -> Result<StockDataResponse>;

    /// Run one individual analysis and return its raw `result` text
    ///
    /// Must not be called with [`AnalysisCategory::All`]; use
    /// [`AnalysisBackend::full_analysis`] instead.
    async fn single_analysis(&self, category: AnalysisCategory, ticker: &str) -> Result<String>;

    /// Run all four analyses in one request
    async fn full_analysis(&self, ticker: &str) -> Result<FullAnalysis>;

    /// Ask a free-form question
    async fn ask(&self, request: &QuestionRequest) -> Result<String>;

    /// Backend liveness
    async fn health(&self) -> Result<HealthStatus>;
}
