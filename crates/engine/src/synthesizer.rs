//! Insight-driven strategy synthesis
//!
//! Builds one regime-matched strategy straight from precomputed symbol
//! insights, without searching or backtesting. The Hurst exponent picks the
//! regime, the average swing size sizes the risk levels and the insights'
//! optimal RSI levels set the entry thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::error::EngineResult;
use crate::insights::{InsightsProvider, SymbolInsights};
use crate::optimizer::DEFAULT_DAYS;
use crate::params::{ParamValue, StrategyParams, DEFAULT_ATR_MULTIPLIER, SWING_LOOKBACK};
use crate::templates::{
    render, ArtifactWriter, BOLLINGER_HELPER, DECISION_ENTRY_POINT, EMA_HELPER, MACD_HELPER,
    RSI_HELPER,
};
use crate::types::{Signal, StrategyArtifact};

pub const DEFAULT_RSI_OVERSOLD: f64 = 30.0;
pub const DEFAULT_RSI_OVERBOUGHT: f64 = 70.0;
/// Percent; used when the insights carry no swing statistics
pub const DEFAULT_SWING_MAGNITUDE: f64 = 10.0;

pub const STOP_LOSS_BOUNDS: (f64, f64) = (3.0, 10.0);
pub const TAKE_PROFIT_BOUNDS: (f64, f64) = (8.0, 25.0);
const STOP_LOSS_FACTOR: f64 = 0.4;
const TAKE_PROFIT_FACTOR: f64 = 0.8;

const MEAN_REVERSION_HURST: f64 = 0.45;
const TRENDING_HURST: f64 = 0.55;

const SWING_BUY_BOUNDS: (f64, f64) = (3.0, 15.0);
const SWING_SELL_BOUNDS: (f64, f64) = (5.0, 25.0);
const SWING_DEFAULT_BUY: u32 = 8;
const SWING_DEFAULT_SELL: u32 = 12;
const SWING_CAPTURE: f64 = 0.7;

/// Regime the synthesized strategy is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SynthesisRegime {
    MeanReversion,
    TrendFollowing,
    Hybrid,
}

impl SynthesisRegime {
    /// `(0, 0.45)` mean reversion, above 0.55 trend following, hybrid otherwise
    pub fn from_hurst(hurst: f64) -> Self {
        if hurst > 0.0 && hurst < MEAN_REVERSION_HURST {
            Self::MeanReversion
        } else if hurst > TRENDING_HURST {
            Self::TrendFollowing
        } else {
            Self::Hybrid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeanReversion => "MEAN_REVERSION",
            Self::TrendFollowing => "TREND_FOLLOWING",
            Self::Hybrid => "HYBRID",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MeanReversion => "Mean Reversion",
            Self::TrendFollowing => "Trend Following",
            Self::Hybrid => "Hybrid",
        }
    }

    fn entry_condition(&self) -> &'static str {
        match self {
            Self::MeanReversion => {
                "current_rsi < RSI_OVERSOLD and bb_position < 0.15 and macd_bullish"
            }
            Self::TrendFollowing => {
                "current_rsi < RSI_OVERBOUGHT and current_rsi > 40 and (macd_bullish or macd_crossover)"
            }
            Self::Hybrid => {
                "(current_rsi < RSI_OVERSOLD and bb_position < 0.1 and macd_bullish) or \
                 (current_rsi < RSI_OVERSOLD + 10 and bb_position < 0.3 and macd_bullish)"
            }
        }
    }

    fn rationale(&self) -> &'static str {
        match self {
            Self::MeanReversion => {
                "Prices have tended to revert after extremes, so the strategy buys oversold dips \
                 near the lower Bollinger band once MACD momentum turns up."
            }
            Self::TrendFollowing => {
                "Moves have tended to persist, so the strategy joins upward momentum while RSI \
                 is bullish but not yet overbought."
            }
            Self::Hybrid => {
                "No persistent bias, so the strategy only buys deep oversold readings near the \
                 lower band with MACD momentum turning up."
            }
        }
    }
}

impl fmt::Display for SynthesisRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller context for one synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Overrides the symbol carried by the insights
    pub symbol: Option<String>,
    /// Overrides the timeframe carried by the insights
    pub timeframe: Option<String>,
    /// History requested from an insights provider
    pub lookback_days: u32,
}

impl Default for SynthesisRequest {
    fn default() -> Self {
        Self {
            symbol: None,
            timeframe: None,
            lookback_days: DEFAULT_DAYS,
        }
    }
}

/// A synthesized strategy with its resolved parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedStrategy {
    pub symbol: String,
    pub timeframe: String,
    pub artifact: StrategyArtifact,
    pub explanation: String,
    pub summary_card: String,
    pub regime: SynthesisRegime,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
}

/// Swing strategy derived from turning points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingFallback {
    pub params: StrategyParams,
    pub artifact: StrategyArtifact,
    pub explanation: String,
}

/// Deterministic single-shot synthesizer
#[derive(Debug, Clone, Copy, Default)]
pub struct InsightDrivenSynthesizer;

impl InsightDrivenSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Build the regime-matched strategy for `insights`.
    ///
    /// Missing or out-of-range statistics fall back to RSI 30/70 and a 10%
    /// swing instead of failing.
    pub fn synthesize(
        &self,
        insights: &SymbolInsights,
        request: &SynthesisRequest,
    ) -> SynthesizedStrategy {
        let symbol = resolve(request.symbol.as_deref(), &insights.symbol, "UNKNOWN");
        let timeframe = resolve(request.timeframe.as_deref(), &insights.timeframe, "1D");

        let (rsi_oversold, rsi_overbought) = rsi_levels(insights);
        let regime = SynthesisRegime::from_hurst(insights.hurst_exponent);
        let swing = swing_magnitude(insights);
        let stop_loss_percent = risk_level(swing, STOP_LOSS_FACTOR, STOP_LOSS_BOUNDS);
        let take_profit_percent = risk_level(swing, TAKE_PROFIT_FACTOR, TAKE_PROFIT_BOUNDS);

        let levels = Levels {
            rsi_oversold,
            rsi_overbought,
            stop_loss_percent,
            take_profit_percent,
        };
        let artifact = render_insight_artifact(&symbol, &timeframe, insights, regime, &levels);
        let explanation = explain(&symbol, &timeframe, insights, regime, swing, &levels);
        let summary_card = format!(
            "{symbol} {} Strategy: RSI<{rsi_oversold:.0} buy, RSI>{rsi_overbought:.0} sell, \
             {stop_loss_percent:.1}% stop, {take_profit_percent:.1}% target",
            regime.display_name()
        );

        info!(
            symbol = %symbol,
            regime = %regime,
            hurst = insights.hurst_exponent,
            stop_loss = stop_loss_percent,
            take_profit = take_profit_percent,
            "Synthesized strategy from insights"
        );

        SynthesizedStrategy {
            symbol,
            timeframe,
            artifact,
            explanation,
            summary_card,
            regime,
            rsi_oversold,
            rsi_overbought,
            stop_loss_percent,
            take_profit_percent,
        }
    }

    /// Fetch insights from `provider` and synthesize.
    pub async fn synthesize_from_provider(
        &self,
        provider: &dyn InsightsProvider,
        symbol: &str,
        timeframe: &str,
        request: &SynthesisRequest,
    ) -> EngineResult<SynthesizedStrategy> {
        let insights = provider
            .get_insights(symbol, timeframe, request.lookback_days)
            .await?;
        debug!(
            symbol = %symbol,
            turning_points = insights.turning_points.len(),
            "Fetched symbol insights"
        );
        Ok(self.synthesize(&insights, request))
    }

    /// Swing strategy sized from turning points, for when optimization finds
    /// nothing eligible.
    pub fn fallback_swing(&self, insights: &SymbolInsights) -> SwingFallback {
        let buy_threshold = swing_threshold(
            insights
                .troughs()
                .map(|tp| tp.price_change_from_previous.abs()),
            SWING_BUY_BOUNDS,
            SWING_DEFAULT_BUY,
        );
        let sell_threshold = swing_threshold(
            insights.peaks().map(|tp| tp.price_change_from_previous),
            SWING_SELL_BOUNDS,
            SWING_DEFAULT_SELL,
        );

        let params = StrategyParams::SwingTrading {
            buy_threshold,
            sell_threshold,
            lookback: SWING_LOOKBACK,
            atr_multiplier: DEFAULT_ATR_MULTIPLIER,
        };
        let explanation = format!(
            "Swing strategy for {}: buy after a {buy_threshold}% pullback from the {SWING_LOOKBACK}-bar \
             high and target a {sell_threshold}% rise, sized from {} historical turning points.",
            if insights.symbol.is_empty() { "UNKNOWN" } else { insights.symbol.as_str() },
            insights.turning_points.len()
        );

        SwingFallback {
            artifact: render(&params),
            params,
            explanation,
        }
    }
}

// ============================================================================
// Parameter resolution
// ============================================================================

struct Levels {
    rsi_oversold: f64,
    rsi_overbought: f64,
    stop_loss_percent: f64,
    take_profit_percent: f64,
}

fn resolve(overridden: Option<&str>, carried: &str, default: &str) -> String {
    overridden
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(carried.trim()).filter(|s| !s.is_empty()))
        .unwrap_or(default)
        .to_string()
}

fn valid_rsi(v: f64) -> bool {
    v.is_finite() && v > 0.0 && v < 100.0
}

fn rsi_levels(insights: &SymbolInsights) -> (f64, f64) {
    let oversold = if valid_rsi(insights.optimal_rsi_oversold) {
        round1(insights.optimal_rsi_oversold)
    } else {
        DEFAULT_RSI_OVERSOLD
    };
    let overbought = if valid_rsi(insights.optimal_rsi_overbought) {
        round1(insights.optimal_rsi_overbought)
    } else {
        DEFAULT_RSI_OVERBOUGHT
    };

    if oversold < overbought {
        (oversold, overbought)
    } else {
        (DEFAULT_RSI_OVERSOLD, DEFAULT_RSI_OVERBOUGHT)
    }
}

fn swing_magnitude(insights: &SymbolInsights) -> f64 {
    let m = insights.avg_swing_magnitude;
    if m.is_finite() && m > 0.0 {
        m
    } else {
        DEFAULT_SWING_MAGNITUDE
    }
}

fn risk_level(swing: f64, factor: f64, (lo, hi): (f64, f64)) -> f64 {
    round1((swing * factor).clamp(lo, hi))
}

fn swing_threshold(changes: impl Iterator<Item = f64>, (lo, hi): (f64, f64), default: u32) -> u32 {
    let changes: Vec<f64> = changes.filter(|c| c.is_finite() && *c > 0.0).collect();
    if changes.is_empty() {
        return default;
    }
    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    (mean * SWING_CAPTURE).clamp(lo, hi).round() as u32
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Keep identifiers safe to embed in a quoted literal
fn sanitize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '^' | '='))
        .collect()
}

// ============================================================================
// Rendering
// ============================================================================

const INSIGHT_POSITION_STATE: &str = "\
# Position state
entry_price = None
peak_price = None
";

fn render_insight_artifact(
    symbol: &str,
    timeframe: &str,
    insights: &SymbolInsights,
    regime: SynthesisRegime,
    levels: &Levels,
) -> StrategyArtifact {
    use ParamValue::{Float, Int};

    let regime_label = insights
        .current_regime
        .as_deref()
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "n/a".to_string());

    let mut w = ArtifactWriter::new();
    w.line(&format!(
        "# {} {} Strategy (regime {})",
        sanitize(symbol),
        regime.display_name(),
        regime
    ))
    .line(&format!(
        "# Hurst exponent: {:.2} | Market label: {regime_label}",
        insights.hurst_exponent
    ))
    .line(&format!(
        "# Derived from {} historical turning points",
        insights.turning_points.len()
    ))
    .blank()
    .imports()
    .line("# Strategy parameters")
    .line(&format!("SYMBOL = '{}'", sanitize(symbol)))
    .line(&format!("TIMEFRAME = '{}'", sanitize(timeframe)))
    .constants(&[
        ("RSI_PERIOD", Int(14)),
        ("RSI_OVERSOLD", Float(levels.rsi_oversold)),
        ("RSI_OVERBOUGHT", Float(levels.rsi_overbought)),
        ("BB_PERIOD", Int(20)),
        ("BB_STD", Float(2.0)),
        ("MACD_FAST", Int(12)),
        ("MACD_SLOW", Int(26)),
        ("MACD_SIGNAL", Int(9)),
        ("STOP_LOSS_PCT", Float(levels.stop_loss_percent)),
        ("TAKE_PROFIT_PCT", Float(levels.take_profit_percent)),
    ])
    .helpers(&[EMA_HELPER, RSI_HELPER, BOLLINGER_HELPER, MACD_HELPER])
    .line(INSIGHT_POSITION_STATE)
    .blank();

    w.line(DECISION_ENTRY_POINT)
        .body(1, "global entry_price, peak_price")
        .body(1, "if len(data) < MACD_SLOW + MACD_SIGNAL:")
        .returns(2, Signal::Hold)
        .blank()
        .body(1, "close = data['close']")
        .body(1, "price = close.iloc[-1]")
        .body(1, "current_rsi = calculate_rsi(close, RSI_PERIOD).iloc[-1]")
        .body(1, "middle, upper, lower = calculate_bollinger(close, BB_PERIOD, BB_STD)")
        .body(1, "band_width = upper.iloc[-1] - lower.iloc[-1]")
        .body(1, "bb_position = (price - lower.iloc[-1]) / band_width if band_width > 0 else 0.5")
        .body(1, "macd_line, signal_line, histogram = calculate_macd(close, MACD_FAST, MACD_SLOW, MACD_SIGNAL)")
        .body(1, "macd_bullish = histogram.iloc[-1] > histogram.iloc[-2]")
        .body(1, "macd_crossover = macd_line.iloc[-2] <= signal_line.iloc[-2] and macd_line.iloc[-1] > signal_line.iloc[-1]")
        .blank()
        .body(1, "if entry_price is None:")
        .body(2, &format!("if {}:", regime.entry_condition()))
        .body(3, "entry_price = price")
        .body(3, "peak_price = price")
        .returns(3, Signal::Buy)
        .returns(2, Signal::Hold)
        .blank()
        .body(1, "peak_price = max(peak_price, price)")
        .body(1, "gain = (price - entry_price) / entry_price * 100")
        .body(1, "drop_from_peak = (price - peak_price) / peak_price * 100")
        .blank();

    let exits = [
        "gain <= -STOP_LOSS_PCT",
        "gain >= TAKE_PROFIT_PCT and current_rsi > RSI_OVERBOUGHT",
    ];
    for exit in exits {
        write_exit(&mut w, exit);
    }
    w.body(1, "if gain > STOP_LOSS_PCT:")
        .body(2, "trailing_stop = min(STOP_LOSS_PCT, gain * 0.5)")
        .body(1, "else:")
        .body(2, "trailing_stop = STOP_LOSS_PCT * 0.7");
    write_exit(&mut w, "gain > STOP_LOSS_PCT and drop_from_peak <= -trailing_stop");
    write_exit(&mut w, "current_rsi > RSI_OVERBOUGHT + 10 and bb_position > 0.95");
    w.returns(1, Signal::Hold);

    w.finish()
}

fn write_exit(w: &mut ArtifactWriter, condition: &str) {
    w.body(1, &format!("if {condition}:"))
        .body(2, "entry_price = None")
        .body(2, "peak_price = None")
        .returns(2, Signal::Sell);
}

fn explain(
    symbol: &str,
    timeframe: &str,
    insights: &SymbolInsights,
    regime: SynthesisRegime,
    swing: f64,
    levels: &Levels,
) -> String {
    let mut lines = Vec::with_capacity(6);

    lines.push(format!(
        "Strategy for {symbol} ({timeframe}) derived from {} historical turning points.",
        insights.turning_points.len()
    ));

    let label = match insights.current_regime.as_deref() {
        Some(label) if !label.trim().is_empty() => format!(", currently labelled {}", label.trim()),
        _ => String::new(),
    };
    lines.push(format!(
        "Market regime: {regime} (Hurst exponent {:.2}{label}).",
        insights.hurst_exponent
    ));
    lines.push(regime.rationale().to_string());

    lines.push(format!(
        "Entry uses RSI thresholds {:.1}/{:.1} with Bollinger band position and MACD momentum.",
        levels.rsi_oversold, levels.rsi_overbought
    ));
    lines.push(format!(
        "Exit: {:.1}% stop loss, {:.1}% take profit once RSI is above {:.1}, and a trailing \
         stop after gains exceed {:.1}%.",
        levels.stop_loss_percent,
        levels.take_profit_percent,
        levels.rsi_overbought,
        levels.stop_loss_percent
    ));

    let duration = if insights.avg_swing_duration > 0.0 {
        insights.avg_swing_duration
    } else {
        20.0
    };
    lines.push(format!(
        "Risk levels are sized from an average swing of {swing:.1}% lasting about {duration:.0} bars."
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{InsightsError, TurningPoint, TurningPointType};
    use crate::templates::delimiters_balanced;
    use crate::error::EngineError;
    use async_trait::async_trait;

    fn insights(hurst: f64, swing: f64) -> SymbolInsights {
        SymbolInsights {
            symbol: "AAPL".to_string(),
            timeframe: "1D".to_string(),
            optimal_rsi_oversold: 28.0,
            optimal_rsi_overbought: 72.0,
            hurst_exponent: hurst,
            current_regime: Some("RANGING".to_string()),
            avg_swing_magnitude: swing,
            avg_swing_duration: 12.0,
            turning_points: Vec::new(),
        }
    }

    fn point(point_type: TurningPointType, change: f64) -> TurningPoint {
        TurningPoint {
            point_type,
            price: 100.0,
            price_change_from_previous: change,
            timestamp: None,
        }
    }

    fn synth(i: &SymbolInsights) -> SynthesizedStrategy {
        InsightDrivenSynthesizer::new().synthesize(i, &SynthesisRequest::default())
    }

    #[test]
    fn test_regime_from_hurst() {
        let mr = synth(&insights(0.38, 10.0));
        assert_eq!(mr.regime, SynthesisRegime::MeanReversion);
        assert!(mr.explanation.contains("MEAN_REVERSION"));
        assert!(mr.artifact.code().contains("bb_position < 0.15"));

        let tf = synth(&insights(0.62, 10.0));
        assert_eq!(tf.regime, SynthesisRegime::TrendFollowing);
        assert!(tf.explanation.contains("TREND_FOLLOWING"));
        assert!(tf.artifact.code().contains("macd_crossover)"));

        let hybrid = synth(&insights(0.51, 10.0));
        assert_eq!(hybrid.regime, SynthesisRegime::Hybrid);
        assert!(hybrid.explanation.contains("HYBRID"));
        assert!(hybrid.artifact.code().contains("bb_position < 0.1 and"));
    }

    #[test]
    fn test_regime_boundaries() {
        assert_eq!(SynthesisRegime::from_hurst(0.0), SynthesisRegime::Hybrid);
        assert_eq!(SynthesisRegime::from_hurst(0.45), SynthesisRegime::Hybrid);
        assert_eq!(SynthesisRegime::from_hurst(0.55), SynthesisRegime::Hybrid);
        assert_eq!(SynthesisRegime::from_hurst(0.551), SynthesisRegime::TrendFollowing);
        assert_eq!(SynthesisRegime::from_hurst(f64::NAN), SynthesisRegime::Hybrid);
    }

    #[test]
    fn test_stop_loss_clamping() {
        assert_eq!(synth(&insights(0.5, 15.0)).stop_loss_percent, 6.0);
        assert_eq!(synth(&insights(0.5, 2.0)).stop_loss_percent, 3.0);
        assert_eq!(synth(&insights(0.5, 30.0)).stop_loss_percent, 10.0);
    }

    #[test]
    fn test_take_profit_clamping() {
        assert_eq!(synth(&insights(0.5, 15.0)).take_profit_percent, 12.0);
        assert_eq!(synth(&insights(0.5, 2.0)).take_profit_percent, 8.0);
        assert_eq!(synth(&insights(0.5, 40.0)).take_profit_percent, 25.0);
    }

    #[test]
    fn test_missing_statistics_use_defaults() {
        let sparse = SymbolInsights {
            symbol: "TSLA".to_string(),
            ..SymbolInsights::default()
        };
        let s = synth(&sparse);

        assert_eq!(s.rsi_oversold, DEFAULT_RSI_OVERSOLD);
        assert_eq!(s.rsi_overbought, DEFAULT_RSI_OVERBOUGHT);
        // swing 10 -> 4.0 stop, 8.0 target
        assert_eq!(s.stop_loss_percent, 4.0);
        assert_eq!(s.take_profit_percent, 8.0);
        assert_eq!(s.regime, SynthesisRegime::Hybrid);
        assert_eq!(s.timeframe, "1D");
    }

    #[test]
    fn test_inverted_rsi_levels_fall_back() {
        let mut i = insights(0.4, 10.0);
        i.optimal_rsi_oversold = 75.0;
        i.optimal_rsi_overbought = 25.0;
        let s = synth(&i);
        assert_eq!((s.rsi_oversold, s.rsi_overbought), (30.0, 70.0));
    }

    #[test]
    fn test_artifact_declares_literals() {
        let s = synth(&insights(0.38, 15.0));
        let code = s.artifact.code();

        assert!(code.contains("RSI_OVERSOLD = 28.0\n"));
        assert!(code.contains("RSI_OVERBOUGHT = 72.0\n"));
        assert!(code.contains("STOP_LOSS_PCT = 6.0\n"));
        assert!(code.contains("TAKE_PROFIT_PCT = 12.0\n"));
        assert!(code.contains("SYMBOL = 'AAPL'"));
        assert_eq!(code.matches(DECISION_ENTRY_POINT).count(), 1);
        assert!(code.contains("return 'BUY'"));
        assert!(code.contains("return 'SELL'"));
        assert!(code.contains("return 'HOLD'"));
        assert!(delimiters_balanced(code));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let i = insights(0.62, 18.0);
        let a = synth(&i);
        let b = synth(&i);
        assert_eq!(a, b);
        assert_eq!(a.artifact.fingerprint(), b.artifact.fingerprint());
    }

    #[test]
    fn test_summary_card_and_overrides() {
        let request = SynthesisRequest {
            symbol: Some("MSFT".to_string()),
            timeframe: Some("4h".to_string()),
            ..SynthesisRequest::default()
        };
        let s = InsightDrivenSynthesizer::new().synthesize(&insights(0.62, 15.0), &request);

        assert_eq!(s.symbol, "MSFT");
        assert_eq!(s.timeframe, "4h");
        assert_eq!(
            s.summary_card,
            "MSFT Trend Following Strategy: RSI<28 buy, RSI>72 sell, 6.0% stop, 12.0% target"
        );
    }

    #[test]
    fn test_symbol_is_sanitized_in_artifact() {
        let mut i = insights(0.5, 10.0);
        i.symbol = "BRK'B".to_string();
        let s = synth(&i);
        assert!(s.artifact.code().contains("SYMBOL = 'BRKB'"));
        assert!(delimiters_balanced(s.artifact.code()));
    }

    #[test]
    fn test_fallback_swing_from_turning_points() {
        let mut i = insights(0.5, 10.0);
        i.turning_points = vec![
            point(TurningPointType::Trough, -10.0),
            point(TurningPointType::Peak, 20.0),
            point(TurningPointType::Trough, -14.0),
            point(TurningPointType::Peak, 40.0),
        ];

        let fallback = InsightDrivenSynthesizer::new().fallback_swing(&i);
        assert_eq!(
            fallback.params,
            StrategyParams::SwingTrading {
                buy_threshold: 8,
                sell_threshold: 21,
                lookback: 20,
                atr_multiplier: 2.0,
            }
        );
        assert!(fallback.artifact.code().contains("SELL_THRESHOLD = 21\n"));
        assert!(fallback.explanation.contains("4 historical turning points"));
    }

    #[test]
    fn test_fallback_swing_defaults_and_clamps() {
        let empty = InsightDrivenSynthesizer::new().fallback_swing(&SymbolInsights::default());
        assert!(matches!(
            empty.params,
            StrategyParams::SwingTrading {
                buy_threshold: 8,
                sell_threshold: 12,
                ..
            }
        ));

        let mut extreme = insights(0.5, 10.0);
        extreme.turning_points = vec![
            point(TurningPointType::Trough, -60.0),
            point(TurningPointType::Peak, 2.0),
        ];
        let clamped = InsightDrivenSynthesizer::new().fallback_swing(&extreme);
        assert!(matches!(
            clamped.params,
            StrategyParams::SwingTrading {
                buy_threshold: 15,
                sell_threshold: 5,
                ..
            }
        ));
    }

    struct StaticProvider(Option<SymbolInsights>);

    #[async_trait]
    impl InsightsProvider for StaticProvider {
        async fn get_insights(
            &self,
            symbol: &str,
            timeframe: &str,
            _lookback_days: u32,
        ) -> Result<SymbolInsights, InsightsError> {
            self.0.clone().ok_or_else(|| InsightsError::Unavailable {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                reason: "service down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_synthesize_from_provider() {
        let synthesizer = InsightDrivenSynthesizer::new();
        let provider = StaticProvider(Some(insights(0.38, 15.0)));

        let s = synthesizer
            .synthesize_from_provider(&provider, "AAPL", "1D", &SynthesisRequest::default())
            .await
            .unwrap();
        assert_eq!(s.regime, SynthesisRegime::MeanReversion);

        let err = synthesizer
            .synthesize_from_provider(&StaticProvider(None), "AAPL", "1D", &SynthesisRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Insights(_)));
    }
}
