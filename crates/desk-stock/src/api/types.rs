//! Wire types of the analysis backend

use crate::market::{PriceBar, StockInfo};
use serde::{Deserialize, Serialize};

/// `GET /stock-data` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDataResponse {
    #[serde(default)]
    pub data: Vec<PriceBar>,
    pub info: Option<StockInfo>,
    pub ticker: String,
}

/// Body of every analysis POST
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerRequest {
    pub ticker: String,
}

/// `{ result }` response of the single analyses and `/analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub result: Option<String>,
}

/// `POST /full-analysis` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullAnalysis {
    #[serde(default)]
    pub basic_summary: Option<String>,
    #[serde(default)]
    pub sentiment_analysis: Option<String>,
    #[serde(default)]
    pub technical_analysis: Option<String>,
    #[serde(default)]
    pub quantitative_analysis: Option<String>,
    /// Older backends name this field `risk_analysis`
    #[serde(default, alias = "risk_analysis")]
    pub risk_assessment: Option<String>,
}

/// Cached analysis text sent along with a question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadedAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantitative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

impl PreloadedAnalysis {
    pub fn is_empty(&self) -> bool {
        self.sentiment.is_none()
            && self.technical.is_none()
            && self.quantitative.is_none()
            && self.risk.is_none()
    }
}

/// `POST /analyze` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub ticker: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preloaded_analysis: Option<PreloadedAnalysis>,
}

/// `GET /` response on the backend host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: String,
}

/// Error body returned with non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_analysis_accepts_both_risk_names() {
        let full: FullAnalysis = serde_json::from_value(serde_json::json!({
            "sentiment_analysis": "s",
            "technical_analysis": "t",
            "quantitative_analysis": "q",
            "risk_analysis": "r"
        }))
        .unwrap();
        assert_eq!(full.risk_assessment.as_deref(), Some("r"));
        assert!(full.basic_summary.is_none());

        let full: FullAnalysis = serde_json::from_value(serde_json::json!({
            "risk_assessment": "r2"
        }))
        .unwrap();
        assert_eq!(full.risk_assessment.as_deref(), Some("r2"));
    }

    #[test]
    fn test_stock_data_response_with_sparse_info() {
        let body = r#"{
            "data": [
                {"date": "2024-10-30", "open": 58.1, "high": 58.9, "low": 57.6,
                 "close": 58.4, "volume": 1200300, "change": 0.3, "percentChange": 0.516},
                {"date": "2024-10-31", "open": 58.4, "high": 58.5, "low": 57.1,
                 "close": 57.3, "volume": 1530000, "change": -1.1, "percentChange": -1.883}
            ],
            "info": {
                "name": null,
                "sector": "Unknown",
                "industry": null,
                "marketCap": 0,
                "beta": null,
                "peRatio": null,
                "dividendYield": null
            },
            "ticker": "VTI"
        }"#;
        let response: StockDataResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.ticker, "VTI");
        assert_eq!(response.data.len(), 2);

        let info = response.info.unwrap();
        assert_eq!(info.name, None);
        assert_eq!(info.sector.as_deref(), Some("Unknown"));
        assert_eq!(info.market_cap, Some(0.0));
        assert_eq!(info.pe_ratio, None);
    }

    #[test]
    fn test_question_request_wire_format() {
        let request = QuestionRequest {
            ticker: "AAPL".to_string(),
            question: "What's the outlook?".to_string(),
            preloaded_analysis: Some(PreloadedAnalysis {
                technical: Some("RSI 55".to_string()),
                ..Default::default()
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["preloadedAnalysis"]["technical"], "RSI 55");
        assert!(json["preloadedAnalysis"].get("sentiment").is_none());

        let bare = QuestionRequest {
            preloaded_analysis: None,
            ..request
        };
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("preloadedAnalysis").is_none());
    }
}
