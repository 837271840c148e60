//! Symbol insights consumed by the insight-driven synthesizer
//!
//! The statistics (Hurst exponent, turning points, swing metrics) are computed
//! by an external service; this module only defines their shape and the
//! provider seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Insights unavailable for {symbol} {timeframe}: {reason}")]
    Unavailable {
        symbol: String,
        timeframe: String,
        reason: String,
    },

    #[error("Malformed insights: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurningPointType {
    Peak,
    Trough,
}

/// A local price extreme detected by the insights service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurningPoint {
    #[serde(rename = "type")]
    pub point_type: TurningPointType,
    pub price: f64,
    /// Percent move since the previous turning point (negative for drops)
    #[serde(default)]
    pub price_change_from_previous: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Statistical summary of one symbol/timeframe.
///
/// Every numeric field may be zero or missing; consumers fall back to
/// documented defaults instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolInsights {
    pub symbol: String,
    pub timeframe: String,
    pub optimal_rsi_oversold: f64,
    pub optimal_rsi_overbought: f64,
    pub hurst_exponent: f64,
    /// Descriptive label from the insights service (e.g. "TRENDING_UP")
    pub current_regime: Option<String>,
    /// Average swing size, in percent
    pub avg_swing_magnitude: f64,
    /// Average swing length, in bars
    pub avg_swing_duration: f64,
    pub turning_points: Vec<TurningPoint>,
}

impl SymbolInsights {
    pub fn troughs(&self) -> impl Iterator<Item = &TurningPoint> {
        self.turning_points
            .iter()
            .filter(|tp| tp.point_type == TurningPointType::Trough)
    }

    pub fn peaks(&self) -> impl Iterator<Item = &TurningPoint> {
        self.turning_points
            .iter()
            .filter(|tp| tp.point_type == TurningPointType::Peak)
    }
}

/// Source of precomputed symbol insights
#[async_trait]
pub trait InsightsProvider: Send + Sync {
    async fn get_insights(
        &self,
        symbol: &str,
        timeframe: &str,
        lookback_days: u32,
    ) -> Result<SymbolInsights, InsightsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_json_uses_defaults() {
        let insights: SymbolInsights =
            serde_json::from_str(r#"{"symbol":"AAPL","hurst_exponent":0.62}"#).unwrap();
        assert_eq!(insights.symbol, "AAPL");
        assert_eq!(insights.optimal_rsi_oversold, 0.0);
        assert!(insights.current_regime.is_none());
        assert!(insights.turning_points.is_empty());
    }

    #[test]
    fn test_turning_point_filters() {
        let insights: SymbolInsights = serde_json::from_str(
            r#"{"symbol":"TSLA","turning_points":[
                {"type":"PEAK","price":250.0,"price_change_from_previous":18.0},
                {"type":"TROUGH","price":210.0,"price_change_from_previous":-16.0},
                {"type":"PEAK","price":240.0,"price_change_from_previous":14.3}
            ]}"#,
        )
        .unwrap();

        assert_eq!(insights.peaks().count(), 2);
        assert_eq!(insights.troughs().count(), 1);
        assert_eq!(insights.troughs().next().map(|tp| tp.price), Some(210.0));
    }
}
