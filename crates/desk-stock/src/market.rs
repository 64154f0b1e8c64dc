//! Price series and company information

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Close minus open
    #[serde(default)]
    pub change: f64,
    /// Change relative to open, in percent
    #[serde(default)]
    pub percent_change: f64,
}

impl PriceBar {
    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

/// Company information
///
/// Every field may arrive as `null` when the data provider has no value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
}

const UNKNOWN: &str = "Unknown";

fn text_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Order bars newest-first
pub fn newest_first(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.sort_by(|a, b| b.date.cmp(&a.date));
    bars
}

/// Headline figures for a loaded ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSnapshot {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub price: f64,
    pub change: f64,
    pub percent_change: f64,
    /// Highest high over the loaded series
    pub period_high: f64,
    /// Lowest low over the loaded series
    pub period_low: f64,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
}

impl StockSnapshot {
    /// Build a snapshot from a newest-first series
    ///
    /// Returns `None` for an empty series.
    pub fn from_series(symbol: &str, bars: &[PriceBar], info: Option<&StockInfo>) -> Option<Self> {
        let latest = bars.first()?;
        let period_high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let period_low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);

        Some(Self {
            symbol: symbol.to_string(),
            name: text_or(info.and_then(|i| i.name.as_deref()), symbol),
            sector: text_or(info.and_then(|i| i.sector.as_deref()), UNKNOWN),
            industry: text_or(info.and_then(|i| i.industry.as_deref()), UNKNOWN),
            price: latest.close,
            change: latest.change,
            percent_change: latest.percent_change,
            period_high,
            period_low,
            market_cap: info.and_then(|i| i.market_cap).filter(|cap| *cap > 0.0),
            beta: info.and_then(|i| i.beta),
            pe_ratio: info.and_then(|i| i.pe_ratio),
            dividend_yield: info.and_then(|i| i.dividend_yield),
        })
    }

    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

/// Compact number formatting: `2.87T`, `412.50B`, `54.2M`, `1.5K`
pub fn format_compact(num: f64) -> String {
    let abs = num.abs();
    if abs >= 1e12 {
        format!("{:.2}T", num / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", num / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", num / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", num / 1e3)
    } else {
        format!("{num}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, high: f64, low: f64, close: f64, change: f64) -> PriceBar {
        PriceBar {
            date: date.parse().unwrap(),
            open: close - change,
            high,
            low,
            close,
            volume: 50_000_000,
            change,
            percent_change: change / (close - change) * 100.0,
        }
    }

    #[test]
    fn test_bar_deserializes_wire_names() {
        let json = serde_json::json!({
            "date": "2024-10-31",
            "open": 177.2,
            "high": 179.1,
            "low": 176.8,
            "close": 178.45,
            "volume": 54200000,
            "change": 1.25,
            "percentChange": 0.705
        });
        let bar: PriceBar = serde_json::from_value(json).unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 10, 31).unwrap());
        assert!((bar.percent_change - 0.705).abs() < f64::EPSILON);
        assert!(bar.is_up());
    }

    #[test]
    fn test_info_tolerates_nulls() {
        let json = serde_json::json!({
            "name": "Apple Inc.",
            "sector": "Technology",
            "industry": "Consumer Electronics",
            "marketCap": 2870000000000.0_f64,
            "beta": null,
            "peRatio": 29.4,
            "dividendYield": null
        });
        let info: StockInfo = serde_json::from_value(json).unwrap();
        assert_eq!(info.beta, None);
        assert_eq!(info.pe_ratio, Some(29.4));
    }

    #[test]
    fn test_snapshot_falls_back_for_null_company_fields() {
        let json = serde_json::json!({
            "name": null,
            "sector": null,
            "industry": "",
            "marketCap": 0,
            "beta": null,
            "peRatio": null,
            "dividendYield": null
        });
        let info: StockInfo = serde_json::from_value(json).unwrap();
        assert_eq!(info.name, None);

        let bars = vec![bar("2024-10-31", 501.2, 495.0, 500.1, 2.3)];
        let snapshot = StockSnapshot::from_series("SPY", &bars, Some(&info)).unwrap();
        assert_eq!(snapshot.name, "SPY");
        assert_eq!(snapshot.sector, "Unknown");
        assert_eq!(snapshot.industry, "Unknown");
        assert_eq!(snapshot.market_cap, None);
        assert_eq!(snapshot.beta, None);
    }

    #[test]
    fn test_newest_first() {
        let bars = newest_first(vec![
            bar("2024-10-29", 177.8, 175.2, 176.8, -0.6),
            bar("2024-10-31", 179.1, 176.8, 178.45, 1.25),
            bar("2024-10-30", 178.2, 175.9, 177.2, 0.4),
        ]);
        let dates: Vec<String> = bars.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-10-31", "2024-10-30", "2024-10-29"]);
    }

    #[test]
    fn test_snapshot_uses_latest_bar_and_series_extremes() {
        let bars = vec![
            bar("2024-10-31", 179.1, 176.8, 178.45, 1.25),
            bar("2024-10-30", 178.2, 175.9, 177.2, 0.4),
            bar("2024-10-29", 177.8, 172.1, 176.8, -0.6),
        ];
        let snapshot = StockSnapshot::from_series("AAPL", &bars, None).unwrap();
        assert_eq!(snapshot.name, "AAPL");
        assert!((snapshot.price - 178.45).abs() < f64::EPSILON);
        assert!((snapshot.period_high - 179.1).abs() < f64::EPSILON);
        assert!((snapshot.period_low - 172.1).abs() < f64::EPSILON);
        assert!(snapshot.is_up());

        assert!(StockSnapshot::from_series("AAPL", &[], None).is_none());
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(2.87e12), "2.87T");
        assert_eq!(format_compact(412.5e9), "412.50B");
        assert_eq!(format_compact(54_200_000.0), "54.2M");
        assert_eq!(format_compact(1_500.0), "1.5K");
        assert_eq!(format_compact(999.0), "999");
    }
}
