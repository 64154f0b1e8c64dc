//! HTTP client for the analysis backend

use super::backend::AnalysisBackend;
use super::types::{
    AnalysisResponse, ErrorBody, FullAnalysis, HealthStatus, QuestionRequest,
    StockDataResponse, TickerRequest,
};
use crate::analysis::AnalysisCategory;
use crate::config::DeskConfig;
use crate::error::{DeskError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// reqwest-backed [`AnalysisBackend`]
#[derive(Debug, Clone)]
pub struct DeskClient {
    client: Client,
    base_url: Url,
}

impl DeskClient {
    /// Create a client from configuration
    pub fn new(config: &DeskConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url()?,
        })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Turn a non-success status into a backend error
    ///
    /// Uses the JSON `error` field when present, `fallback` otherwise.
    async fn check_status(response: Response, fallback: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeskError::Backend {
            status: status.as_u16(),
            message: error_message(&body, fallback),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| DeskError::MalformedResponse(format!("{what}: {e}")))
    }

    async fn post_for_result<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<String> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(body).send().await?;
        let response = Self::check_status(response, fallback).await?;
        let parsed: AnalysisResponse = Self::decode(response, path).await?;

        parsed.result.ok_or_else(|| {
            DeskError::MalformedResponse("Unexpected response format from server".to_string())
        })
    }
}

/// The JSON `error` field of a failed response, or `fallback`
fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn normalize(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

#[async_trait]
impl AnalysisBackend for DeskClient {
    async fn stock_data(&self, ticker: &str) -> Result<StockDataResponse> {
        let ticker = normalize(ticker);
        let url = self.endpoint("stock-data")?;
        debug!("GET {} ticker={}", url, ticker);

        let response = self
            .client
            .get(url)
            .query(&[("ticker", ticker.as_str())])
            .send()
            .await?;
        let response = Self::check_status(response, "Failed to fetch stock data").await?;
        Self::decode(response, "stock-data").await
    }

    async fn single_analysis(&self, category: AnalysisCategory, ticker: &str) -> Result<String> {
        if category.is_composite() {
            return Err(DeskError::Command(
                "the full analysis is not a single analysis".to_string(),
            ));
        }

        let fallback = match category {
            AnalysisCategory::Risk => "Failed to run risk assessment".to_string(),
            other => format!("Failed to run {} analysis", other.label()),
        };
        let body = TickerRequest {
            ticker: normalize(ticker),
        };
        self.post_for_result(category.endpoint(), &body, &fallback)
            .await
    }

    async fn full_analysis(&self, ticker: &str) -> Result<FullAnalysis> {
        let url = self.endpoint(AnalysisCategory::All.endpoint())?;
        debug!("POST {}", url);

        let body = TickerRequest {
            ticker: normalize(ticker),
        };
        let response = self.client.post(url).json(&body).send().await?;
        let response = Self::check_status(response, "Failed to run full analysis").await?;
        Self::decode(response, "full-analysis").await
    }

    async fn ask(&self, request: &QuestionRequest) -> Result<String> {
        let request = QuestionRequest {
            ticker: normalize(&request.ticker),
            ..request.clone()
        };
        self.post_for_result("analyze", &request, "Failed to analyze question")
            .await
    }

    async fn health(&self) -> Result<HealthStatus> {
        let url = self.base_url.join("/")?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response, "Backend is not running").await?;
        Self::decode(response, "health").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_endpoints_resolve_under_api_prefix() {
        let client = DeskClient::new(&DeskConfig::default()).unwrap();
        assert_eq!(
            client.endpoint("technical-analysis").unwrap().as_str(),
            "http://localhost:5000/api/technical-analysis"
        );
        assert_eq!(
            client.base_url().join("/").unwrap().as_str(),
            "http://localhost:5000/"
        );
    }

    #[test]
    fn test_client_accepts_timeout() {
        let config = DeskConfig::builder()
            .api_base_url("http://127.0.0.1:9/api/")
            .request_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let client = DeskClient::new(&config).unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9/api/");
    }

    #[test]
    fn test_error_message_prefers_json_error_field() {
        assert_eq!(
            error_message(r#"{"error": "No data found for ticker ZZZZ"}"#, "Failed to fetch stock data"),
            "No data found for ticker ZZZZ"
        );
    }

    #[test]
    fn test_error_message_falls_back() {
        let fallback = "Failed to run risk assessment";
        assert_eq!(error_message("<html>Internal Server Error</html>", fallback), fallback);
        assert_eq!(error_message("", fallback), fallback);
        assert_eq!(error_message(r#"{"error": "  "}"#, fallback), fallback);
        assert_eq!(error_message(r#"{"error": null}"#, fallback), fallback);
        assert_eq!(error_message(r#"{"detail": "boom"}"#, fallback), fallback);
    }

    /// Serve one canned HTTP response on a loopback port
    async fn serve_once(status_line: &'static str, body: &'static str) -> DeskClient {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0_u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        let config = DeskConfig::builder()
            .api_base_url(format!("http://{addr}/api/"))
            .build()
            .unwrap();
        DeskClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_status_error_uses_backend_message() {
        let client = serve_once(
            "404 Not Found",
            r#"{"error": "No data found for ticker ZZZZ"}"#,
        )
        .await;
        match client.stock_data("zzzz").await {
            Err(DeskError::Backend { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "No data found for ticker ZZZZ");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_error_without_json_uses_call_fallback() {
        let client = serve_once("500 Internal Server Error", "<html>oops</html>").await;
        match client.single_analysis(AnalysisCategory::Risk, "AAPL").await {
            Err(DeskError::Backend { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Failed to run risk assessment");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize(" aapl "), "AAPL");
    }

    #[tokio::test]
    async fn test_composite_rejected_as_single_analysis() {
        let client = DeskClient::new(&DeskConfig::default()).unwrap();
        let result = client.single_analysis(AnalysisCategory::All, "AAPL").await;
        assert!(matches!(result, Err(DeskError::Command(_))));
    }

    #[tokio::test]
    #[ignore] // Requires a running backend
    async fn test_health_against_local_backend() {
        let client = DeskClient::new(&DeskConfig::default()).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health.status, "healthy");
    }
}
