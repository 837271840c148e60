//! Deployment advice for a winning strategy
//!
//! Turns backtest metrics into position sizing (half-Kelly, drawdown and
//! Sharpe adjusted), a drawdown risk level, losing-streak expectations and an
//! alert-versus-bot recommendation.

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::types::StrategyTestResult;

const MIN_ALLOCATION: Decimal = dec!(2);
const MAX_ALLOCATION: Decimal = dec!(25);

/// Trades per year
const HIGH_FREQUENCY_THRESHOLD: u32 = 500;
const MEDIUM_FREQUENCY_THRESHOLD: u32 = 100;
const LOW_FREQUENCY_THRESHOLD: u32 = 50;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Deployment advisor unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentMode {
    /// Signals are sent to the trader for manual execution
    Alert,
    /// Signals are executed automatically
    Bot,
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Alert => f.write_str("ALERT"),
            DeploymentMode::Bot => f.write_str("BOT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawdownRiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl DrawdownRiskLevel {
    /// LOW < 10 <= MEDIUM < 20 <= HIGH < 35 <= EXTREME
    pub fn from_drawdown(max_drawdown: f64) -> Self {
        if max_drawdown < 10.0 {
            Self::Low
        } else if max_drawdown < 20.0 {
            Self::Medium
        } else if max_drawdown < 35.0 {
            Self::High
        } else {
            Self::Extreme
        }
    }
}

/// Sizing and deployment recommendation. Percent fields are in percent units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentInsights {
    pub recommended_allocation_pct: Decimal,
    pub kelly_pct: Decimal,
    pub conservative_kelly_pct: Decimal,
    pub allocation_rationale: String,

    pub max_drawdown_pct: Decimal,
    pub drawdown_risk_level: DrawdownRiskLevel,
    /// `None` when the worst drawdown wiped out the allocation
    pub recovery_required_pct: Option<Decimal>,
    pub drawdown_explanation: String,

    pub max_consecutive_losses: u32,
    pub probability_of_5_consecutive_losses_pct: Decimal,
    pub consecutive_loss_explanation: String,

    pub sharpe_interpretation: String,
    pub profit_factor_interpretation: String,
    pub win_rate_interpretation: String,

    pub estimated_trades_per_year: u32,
    pub trading_frequency: String,
    pub deployment_mode: DeploymentMode,
    pub deployment_mode_rationale: String,
}

impl DeploymentInsights {
    /// Conservative advice used when the metrics cannot support a calculation
    pub fn conservative_default() -> Self {
        Self {
            recommended_allocation_pct: dec!(5.0),
            kelly_pct: Decimal::ZERO,
            conservative_kelly_pct: Decimal::ZERO,
            allocation_rationale: "Default conservative allocation due to insufficient data."
                .to_string(),
            max_drawdown_pct: Decimal::ZERO,
            drawdown_risk_level: DrawdownRiskLevel::Medium,
            recovery_required_pct: None,
            drawdown_explanation: "Unable to calculate drawdown risk from available data."
                .to_string(),
            max_consecutive_losses: 0,
            probability_of_5_consecutive_losses_pct: Decimal::ZERO,
            consecutive_loss_explanation: String::new(),
            sharpe_interpretation: String::new(),
            profit_factor_interpretation: String::new(),
            win_rate_interpretation: String::new(),
            estimated_trades_per_year: 0,
            trading_frequency: String::new(),
            deployment_mode: DeploymentMode::Alert,
            deployment_mode_rationale: "Alert mode recommended until strategy is validated."
                .to_string(),
        }
    }
}

/// Recommends how to deploy the best strategy of an optimization run
#[async_trait]
pub trait DeploymentAdvisor: Send + Sync {
    async fn calculate(
        &self,
        best: &StrategyTestResult,
        days_analyzed: u32,
    ) -> Result<DeploymentInsights, AdvisorError>;
}

// ============================================================================
// Kelly-based advisor
// ============================================================================

/// Local advisor implementing half-Kelly sizing
#[derive(Debug, Clone, Copy, Default)]
pub struct KellyDeploymentAdvisor;

#[async_trait]
impl DeploymentAdvisor for KellyDeploymentAdvisor {
    async fn calculate(
        &self,
        best: &StrategyTestResult,
        days_analyzed: u32,
    ) -> Result<DeploymentInsights, AdvisorError> {
        Ok(self.compute(best, days_analyzed))
    }
}

impl KellyDeploymentAdvisor {
    pub fn compute(&self, best: &StrategyTestResult, days_analyzed: u32) -> DeploymentInsights {
        if !best.is_success() {
            return DeploymentInsights::conservative_default();
        }

        let perf = &best.performance;
        let win_rate = perf.win_rate;
        let loss_rate = 1.0 - win_rate;

        // Position sizing
        let kelly = kelly_percent(win_rate, perf.profit_factor);
        let half_kelly = kelly / 2.0;
        let mut allocation = half_kelly;
        if perf.max_drawdown > 0.0 {
            allocation *= 1.0 - perf.max_drawdown / 100.0;
        }
        if perf.sharpe_ratio < 1.0 {
            allocation *= 0.8;
        }
        let allocation = round(allocation, 1).clamp(MIN_ALLOCATION, MAX_ALLOCATION);

        // Drawdown
        let risk_level = DrawdownRiskLevel::from_drawdown(perf.max_drawdown);
        let recovery = (perf.max_drawdown < 100.0)
            .then(|| (1.0 / (1.0 - perf.max_drawdown / 100.0) - 1.0) * 100.0);

        // Losing streaks
        let max_consecutive_losses = estimate_losing_streak(perf.total_trades, loss_rate);
        let prob_5_losses = loss_rate.clamp(0.0, 1.0).powi(5) * 100.0;

        // Frequency
        let years = f64::from(days_analyzed) / 365.25;
        let trades_per_year = if years > 0.0 {
            (f64::from(perf.total_trades) / years) as u32
        } else {
            perf.total_trades
        };
        let (mode, mode_rationale) = deployment_mode(trades_per_year);

        let insights = DeploymentInsights {
            recommended_allocation_pct: allocation,
            kelly_pct: round(kelly, 2),
            conservative_kelly_pct: round(half_kelly, 2),
            allocation_rationale: allocation_rationale(
                allocation,
                perf.max_drawdown,
                perf.sharpe_ratio,
            ),
            max_drawdown_pct: round(perf.max_drawdown, 2),
            drawdown_risk_level: risk_level,
            recovery_required_pct: recovery.map(|r| round(r, 1)),
            drawdown_explanation: drawdown_explanation(perf.max_drawdown, risk_level, recovery),
            max_consecutive_losses,
            probability_of_5_consecutive_losses_pct: round(prob_5_losses, 2),
            consecutive_loss_explanation: losing_streak_explanation(
                max_consecutive_losses,
                prob_5_losses,
                win_rate,
            ),
            sharpe_interpretation: interpret_sharpe(perf.sharpe_ratio),
            profit_factor_interpretation: interpret_profit_factor(perf.profit_factor),
            win_rate_interpretation: interpret_win_rate(win_rate * 100.0),
            estimated_trades_per_year: trades_per_year,
            trading_frequency: frequency_class(trades_per_year).to_string(),
            deployment_mode: mode,
            deployment_mode_rationale: mode_rationale,
        };

        debug!(
            allocation = %insights.recommended_allocation_pct,
            risk = ?insights.drawdown_risk_level,
            mode = %insights.deployment_mode,
            "Calculated deployment insights"
        );
        insights
    }
}

/// Kelly fraction in percent, floored at 0 and capped at 100.
///
/// The win/loss ratio is recovered from the profit factor:
/// `pf = p * avg_win / ((1 - p) * avg_loss)`.
fn kelly_percent(win_rate: f64, profit_factor: f64) -> f64 {
    let ratio = if win_rate > 0.0 && win_rate < 1.0 && profit_factor > 0.0 {
        profit_factor * (1.0 - win_rate) / win_rate
    } else if profit_factor > 0.0 {
        profit_factor
    } else {
        1.5
    };

    let kelly = (win_rate * ratio - (1.0 - win_rate)) / ratio;
    (kelly * 100.0).clamp(0.0, 100.0)
}

fn estimate_losing_streak(total_trades: u32, loss_rate: f64) -> u32 {
    if total_trades == 0 || loss_rate <= 0.0 || loss_rate >= 1.0 {
        return 3;
    }
    let streak = (f64::from(total_trades).ln() / (1.0 / loss_rate).ln()).ceil() as u32;
    streak.clamp(1, total_trades)
}

fn round(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn frequency_class(trades_per_year: u32) -> &'static str {
    if trades_per_year >= HIGH_FREQUENCY_THRESHOLD {
        "High Frequency"
    } else if trades_per_year >= MEDIUM_FREQUENCY_THRESHOLD {
        "Active Trading"
    } else if trades_per_year >= LOW_FREQUENCY_THRESHOLD {
        "Swing Trading"
    } else {
        "Position Trading"
    }
}

fn deployment_mode(trades_per_year: u32) -> (DeploymentMode, String) {
    if trades_per_year >= HIGH_FREQUENCY_THRESHOLD {
        (
            DeploymentMode::Bot,
            format!(
                "With ~{trades_per_year} trades/year, manual execution is impractical. \
                 Bot mode ensures consistent execution and eliminates emotional decisions."
            ),
        )
    } else if trades_per_year >= MEDIUM_FREQUENCY_THRESHOLD {
        (
            DeploymentMode::Bot,
            format!(
                "At {trades_per_year} trades/year, bot mode is recommended for faster execution \
                 and 24/7 monitoring. Alert mode is viable if you prefer manual control."
            ),
        )
    } else if trades_per_year >= LOW_FREQUENCY_THRESHOLD {
        (
            DeploymentMode::Alert,
            format!(
                "With {trades_per_year} trades/year, alert mode allows you to review each signal \
                 before executing."
            ),
        )
    } else {
        (
            DeploymentMode::Alert,
            format!(
                "Position trading with ~{trades_per_year} trades/year is well-suited for alert mode. \
                 You have time to analyze each opportunity thoroughly."
            ),
        )
    }
}

fn allocation_rationale(allocation: Decimal, max_drawdown: f64, sharpe: f64) -> String {
    let mut parts = Vec::with_capacity(3);
    parts.push(if allocation <= dec!(5) {
        "Conservative allocation (1-5%) recommended for testing or low confidence strategies."
    } else if allocation <= dec!(10) {
        "Moderate allocation (5-10%) suitable for validated strategies with consistent performance."
    } else if allocation <= dec!(15) {
        "Aggressive allocation (10-15%) for well-tested strategies. Ensure adequate capital buffer."
    } else {
        "Very aggressive allocation (15-25%). Only for extensively backtested strategies."
    }
    .to_string());

    if max_drawdown > 20.0 {
        parts.push(format!(
            "Allocation reduced due to high drawdown ({max_drawdown:.1}%)."
        ));
    }
    if sharpe < 1.0 {
        parts.push("Allocation reduced due to lower risk-adjusted returns.".to_string());
    }
    parts.join(" ")
}

fn drawdown_explanation(
    max_drawdown: f64,
    level: DrawdownRiskLevel,
    recovery: Option<f64>,
) -> String {
    let Some(recovery) = recovery else {
        return format!(
            "Maximum drawdown of {max_drawdown:.1}% means the allocation was wiped out \
             and cannot be recovered. Do not deploy without reworking the strategy."
        );
    };
    let tail = match level {
        DrawdownRiskLevel::Low => format!(
            "the strategy maintained good capital preservation. \
             A {recovery:.1}% gain is needed to recover from the worst decline."
        ),
        DrawdownRiskLevel::Medium => format!(
            "you could temporarily lose 10-20% of allocated capital. \
             Recovery requires a {recovery:.1}% gain, which may take significant time."
        ),
        DrawdownRiskLevel::High => format!(
            "significant capital can be at risk during adverse market conditions. \
             A {recovery:.1}% gain is needed to recover."
        ),
        DrawdownRiskLevel::Extreme => format!(
            "more than a third of capital could be lost during the worst periods. \
             Recovery requires a {recovery:.1}% gain. Consider reducing allocation."
        ),
    };
    format!("Maximum drawdown of {max_drawdown:.1}% means {tail}")
}

fn losing_streak_explanation(max_losses: u32, prob_5: f64, win_rate: f64) -> String {
    let head = format!("The strategy can expect up to {max_losses} consecutive losing trades.");
    let tail = if prob_5 > 10.0 {
        format!(
            "With a {:.1}% win rate, there's a {prob_5:.1}% chance of 5 losses in a row.",
            win_rate * 100.0
        )
    } else if prob_5 > 1.0 {
        format!("There's a {prob_5:.1}% probability of experiencing 5 consecutive losses.")
    } else {
        "Extended losing streaks are relatively unlikely with this win rate.".to_string()
    };
    format!("{head} {tail}")
}

fn interpret_sharpe(sharpe: f64) -> String {
    if sharpe >= 3.0 {
        format!("Excellent ({sharpe:.2}) - Top-tier risk-adjusted returns")
    } else if sharpe >= 2.0 {
        format!("Very Good ({sharpe:.2}) - Strong risk-adjusted performance")
    } else if sharpe >= 1.0 {
        format!("Good ({sharpe:.2}) - Generates meaningful return per unit of risk")
    } else if sharpe >= 0.5 {
        format!("Moderate ({sharpe:.2}) - Consider improvements to reduce volatility")
    } else {
        format!("Poor ({sharpe:.2}) - Returns don't adequately compensate for risk")
    }
}

fn interpret_profit_factor(pf: f64) -> String {
    if pf >= 3.0 {
        format!("Excellent ({pf:.2}) - Makes ${pf:.2} for every $1 lost")
    } else if pf >= 2.0 {
        format!("Very Good ({pf:.2}) - Strong profit-to-loss ratio")
    } else if pf >= 1.5 {
        format!("Good ({pf:.2}) - Profitable with reasonable margin")
    } else if pf >= 1.0 {
        format!("Break-even ({pf:.2}) - Minimal profit margin, needs improvement")
    } else {
        format!("Losing ({pf:.2}) - Strategy loses money overall")
    }
}

fn interpret_win_rate(win_rate_pct: f64) -> String {
    if win_rate_pct >= 70.0 {
        format!("High ({win_rate_pct:.1}%) - Most trades are winners")
    } else if win_rate_pct >= 55.0 {
        format!("Good ({win_rate_pct:.1}%) - Consistent edge over random")
    } else if win_rate_pct >= 45.0 {
        format!("Moderate ({win_rate_pct:.1}%) - Relies on larger wins than losses")
    } else if win_rate_pct >= 35.0 {
        format!("Low ({win_rate_pct:.1}%) - Trend-following style, few big winners")
    } else {
        format!("Very Low ({win_rate_pct:.1}%) - High loss rate requires exceptional winners")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{StrategyFamily, StrategyParams};
    use crate::types::{PerformanceResult, StrategyArtifact};
    use rust_decimal_macros::dec;

    fn winner(win_rate: f64, pf: f64, dd: f64, sharpe: f64, trades: u32) -> StrategyTestResult {
        StrategyTestResult::succeeded(
            StrategyFamily::RsiMeanReversion,
            StrategyParams::BuyAndHold,
            StrategyArtifact::new(String::new()),
            PerformanceResult {
                total_return: 40.0,
                win_rate,
                max_drawdown: dd,
                sharpe_ratio: sharpe,
                profit_factor: pf,
                total_trades: trades,
                success: true,
            },
            0,
            0,
        )
    }

    #[test]
    fn test_half_kelly_sizing() {
        let insights = KellyDeploymentAdvisor.compute(&winner(0.55, 2.0, 12.0, 1.5, 30), 1095);

        assert_eq!(insights.kelly_pct, dec!(27.5));
        assert_eq!(insights.conservative_kelly_pct, dec!(13.75));
        // 13.75 * 0.88
        assert_eq!(insights.recommended_allocation_pct, dec!(12.1));
        assert_eq!(insights.drawdown_risk_level, DrawdownRiskLevel::Medium);
        assert_eq!(insights.recovery_required_pct, Some(dec!(13.6)));
        assert_eq!(insights.probability_of_5_consecutive_losses_pct, dec!(1.85));
        assert_eq!(insights.max_consecutive_losses, 5);
    }

    #[test]
    fn test_low_frequency_recommends_alert() {
        let insights = KellyDeploymentAdvisor.compute(&winner(0.55, 2.0, 12.0, 1.5, 30), 1095);
        assert_eq!(insights.estimated_trades_per_year, 10);
        assert_eq!(insights.trading_frequency, "Position Trading");
        assert_eq!(insights.deployment_mode, DeploymentMode::Alert);
    }

    #[test]
    fn test_high_frequency_recommends_bot() {
        let insights = KellyDeploymentAdvisor.compute(&winner(0.5, 1.5, 8.0, 1.2, 400), 365);
        assert_eq!(insights.deployment_mode, DeploymentMode::Bot);
        assert_eq!(insights.trading_frequency, "Active Trading");
    }

    #[test]
    fn test_allocation_is_clamped() {
        // Negative edge: Kelly floors at zero, allocation at the minimum
        let poor = KellyDeploymentAdvisor.compute(&winner(0.3, 0.5, 40.0, 0.2, 20), 1095);
        assert_eq!(poor.kelly_pct, Decimal::ZERO);
        assert_eq!(poor.recommended_allocation_pct, dec!(2));
        assert_eq!(poor.drawdown_risk_level, DrawdownRiskLevel::Extreme);

        let strong = KellyDeploymentAdvisor.compute(&winner(0.8, 6.0, 1.0, 3.5, 50), 1095);
        assert_eq!(strong.recommended_allocation_pct, dec!(25));
    }

    #[test]
    fn test_failed_result_gets_conservative_default() {
        let failed = StrategyTestResult::failed(
            StrategyFamily::Stochastic,
            StrategyParams::BuyAndHold,
            StrategyArtifact::new(String::new()),
            "boom",
            0,
            0,
        );
        let insights = KellyDeploymentAdvisor.compute(&failed, 1095);
        assert_eq!(insights, DeploymentInsights::conservative_default());
        assert_eq!(insights.recommended_allocation_pct, dec!(5.0));
    }

    #[test]
    fn test_total_drawdown_is_unrecoverable() {
        let insights = KellyDeploymentAdvisor.compute(&winner(0.55, 2.0, 100.0, 1.5, 30), 1095);
        assert_eq!(insights.recovery_required_pct, None);
        assert_eq!(insights.drawdown_risk_level, DrawdownRiskLevel::Extreme);
        assert_eq!(insights.recommended_allocation_pct, dec!(2));
        assert!(insights.drawdown_explanation.contains("cannot be recovered"));
        assert!(!insights.drawdown_explanation.contains("inf"));
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(DrawdownRiskLevel::from_drawdown(9.9), DrawdownRiskLevel::Low);
        assert_eq!(DrawdownRiskLevel::from_drawdown(10.0), DrawdownRiskLevel::Medium);
        assert_eq!(DrawdownRiskLevel::from_drawdown(20.0), DrawdownRiskLevel::High);
        assert_eq!(DrawdownRiskLevel::from_drawdown(35.0), DrawdownRiskLevel::Extreme);
    }

    #[tokio::test]
    async fn test_trait_delegates_to_compute() {
        let best = winner(0.6, 1.8, 15.0, 1.1, 60);
        let via_trait = KellyDeploymentAdvisor.calculate(&best, 730).await.unwrap();
        assert_eq!(via_trait, KellyDeploymentAdvisor.compute(&best, 730));
    }
}
