//! Value types shared by the optimizer, the synthesizers and the gateways

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

use crate::advisor::DeploymentInsights;
use crate::params::{StrategyFamily, StrategyParams};
use crate::templates::BASELINE_MARKER;

/// Decision emitted by a strategy artifact for one market snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

/// Generated strategy source for the external execution sandbox
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategyArtifact {
    code: String,
}

impl StrategyArtifact {
    pub(crate) fn new(code: String) -> Self {
        Self { code }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Language tag understood by the execution service
    pub fn language(&self) -> &'static str {
        "python"
    }

    /// True when this is the buy-and-hold baseline artifact.
    pub fn is_baseline(&self) -> bool {
        self.code.starts_with(BASELINE_MARKER)
    }

    /// Hex SHA-256 of the code
    pub fn fingerprint(&self) -> String {
        format!("{:x}", Sha256::digest(self.code.as_bytes()))
    }
}

/// Metrics returned by one backtest execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceResult {
    /// Total return over the period, in percent
    pub total_return: f64,
    /// Fraction of winning trades (0.0 - 1.0)
    pub win_rate: f64,
    /// Peak-to-trough decline, in percent
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
    pub total_trades: u32,
    pub success: bool,
}

/// One candidate's outcome: what was tested and how it performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTestResult {
    pub family: StrategyFamily,
    pub params: StrategyParams,
    pub artifact: StrategyArtifact,
    pub performance: PerformanceResult,
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
    /// Position in the candidate enumeration, used as the final tie-break
    pub candidate_index: usize,
}

impl StrategyTestResult {
    pub fn succeeded(
        family: StrategyFamily,
        params: StrategyParams,
        artifact: StrategyArtifact,
        performance: PerformanceResult,
        candidate_index: usize,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            family,
            params,
            artifact,
            performance: PerformanceResult {
                success: true,
                ..performance
            },
            error_message: None,
            execution_time_ms,
            candidate_index,
        }
    }

    pub fn failed(
        family: StrategyFamily,
        params: StrategyParams,
        artifact: StrategyArtifact,
        error: impl Into<String>,
        candidate_index: usize,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            family,
            params,
            artifact,
            performance: PerformanceResult::default(),
            error_message: Some(error.into()),
            execution_time_ms,
            candidate_index,
        }
    }

    pub fn is_success(&self) -> bool {
        self.performance.success
    }

    pub fn total_return(&self) -> f64 {
        self.performance.total_return
    }

    /// Ranking order: higher total return first, then higher Sharpe ratio,
    /// then lower max drawdown, then enumeration order.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        let a = &self.performance;
        let b = &other.performance;
        b.total_return
            .total_cmp(&a.total_return)
            .then_with(|| b.sharpe_ratio.total_cmp(&a.sharpe_ratio))
            .then_with(|| a.max_drawdown.total_cmp(&b.max_drawdown))
            .then_with(|| self.candidate_index.cmp(&other.candidate_index))
    }
}

/// Coarse label for which family of strategies wins on a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    Trending,
    Sideways,
    Volatile,
    Mixed,
    /// No ranked strategy to classify from
    Unknown,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MarketRegime::Trending => "TRENDING",
            MarketRegime::Sideways => "SIDEWAYS",
            MarketRegime::Volatile => "VOLATILE",
            MarketRegime::Mixed => "MIXED",
            MarketRegime::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Outcome of one optimize call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub symbol: String,
    pub timeframe: String,
    pub period: String,
    pub days_analyzed: u32,
    /// Always equal to `top_strategies[0]` when present
    pub best_strategy: Option<StrategyTestResult>,
    /// Ranked best-first
    pub top_strategies: Vec<StrategyTestResult>,
    pub buy_and_hold_return: f64,
    /// `best.total_return - buy_and_hold_return`; absent without a best strategy
    pub outperformance: Option<f64>,
    pub market_regime: MarketRegime,
    pub total_combinations_tested: usize,
    /// Ranked (successful, non-baseline, enough trades) candidates
    pub successful_tests: usize,
    pub failed_tests: usize,
    pub deployment_insights: Option<DeploymentInsights>,
    pub total_execution_time_ms: u64,
    pub avg_execution_time_per_strategy_ms: f64,
    pub completed_at: DateTime<Utc>,
}

impl OptimizationResult {
    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        match &self.best_strategy {
            Some(best) => format!(
                "{} {}: best {} ({}) returned {:.2}% vs {:.2}% buy-and-hold ({:+.2}%), \
                 {} of {} combinations ranked, regime {}",
                self.symbol,
                self.timeframe,
                best.family,
                best.params,
                best.total_return(),
                self.buy_and_hold_return,
                self.outperformance.unwrap_or_default(),
                self.successful_tests,
                self.total_combinations_tested,
                self.market_regime
            ),
            None => format!(
                "{} {}: no eligible strategy among {} combinations ({} failed), regime {}",
                self.symbol,
                self.timeframe,
                self.total_combinations_tested,
                self.failed_tests,
                self.market_regime
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(total_return: f64, sharpe: f64, drawdown: f64, index: usize) -> StrategyTestResult {
        StrategyTestResult::succeeded(
            StrategyFamily::RsiMeanReversion,
            StrategyParams::BuyAndHold,
            StrategyArtifact::new(String::new()),
            PerformanceResult {
                total_return,
                sharpe_ratio: sharpe,
                max_drawdown: drawdown,
                total_trades: 10,
                ..Default::default()
            },
            index,
            0,
        )
    }

    #[test]
    fn test_higher_return_ranks_first() {
        let a = result(75.0, 1.0, 10.0, 0);
        let b = result(50.0, 3.0, 1.0, 1);
        assert_eq!(a.rank_cmp(&b), Ordering::Less);
        assert_eq!(b.rank_cmp(&a), Ordering::Greater);
    }

    #[test]
    fn test_ties_break_on_sharpe_then_drawdown_then_index() {
        let low_sharpe = result(40.0, 1.0, 5.0, 0);
        let high_sharpe = result(40.0, 2.0, 5.0, 1);
        assert_eq!(high_sharpe.rank_cmp(&low_sharpe), Ordering::Less);

        let deep = result(40.0, 2.0, 20.0, 0);
        let shallow = result(40.0, 2.0, 5.0, 1);
        assert_eq!(shallow.rank_cmp(&deep), Ordering::Less);

        let first = result(40.0, 2.0, 5.0, 3);
        let second = result(40.0, 2.0, 5.0, 7);
        assert_eq!(first.rank_cmp(&second), Ordering::Less);
    }

    #[test]
    fn test_succeeded_forces_success_flag() {
        let r = result(1.0, 0.0, 0.0, 0);
        assert!(r.is_success());
        assert!(r.error_message.is_none());
    }

    #[test]
    fn test_failed_result_is_zeroed() {
        let r = StrategyTestResult::failed(
            StrategyFamily::Stochastic,
            StrategyParams::BuyAndHold,
            StrategyArtifact::new("x".to_string()),
            "timeout",
            4,
            12,
        );
        assert!(!r.is_success());
        assert_eq!(r.total_return(), 0.0);
        assert_eq!(r.error_message.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = StrategyArtifact::new("print(1)".to_string());
        let b = StrategyArtifact::new("print(1)".to_string());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.fingerprint(), StrategyArtifact::new("print(2)".to_string()).fingerprint());
    }

    #[test]
    fn test_signal_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Signal::Hold).unwrap(), "\"HOLD\"");
        assert_eq!(Signal::Buy.as_str(), "BUY");
    }
}
