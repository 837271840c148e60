//! Strategy code templates
//!
//! Renders a (family, parameters) pair into a self-contained Python artifact
//! for the execution sandbox. Every artifact declares its parameters as
//! literal constants, carries the indicator helpers it needs and exposes a
//! single `strategy(data)` entry point returning `'BUY'`, `'SELL'` or `'HOLD'`
//! for the latest bar. Rendering is pure: identical inputs give byte-identical
//! output.

use crate::params::{ParamValue, StrategyFamily, StrategyParams};
use crate::types::{Signal, StrategyArtifact};

/// First line of the buy-and-hold baseline artifact
pub const BASELINE_MARKER: &str = "# BASELINE: BUY_AND_HOLD";

/// Decision entry point every artifact exposes exactly once
pub const DECISION_ENTRY_POINT: &str = "def strategy(data):";

const INDENT: &str = "    ";

// ============================================================================
// Indicator helpers
// ============================================================================

pub(crate) const ATR_HELPER: &str = "\
def calculate_atr(data, period):
    high = data['high']
    low = data['low']
    prev_close = data['close'].shift(1)
    tr = pd.concat([high - low, (high - prev_close).abs(), (low - prev_close).abs()], axis=1).max(axis=1)
    return tr.rolling(window=period, min_periods=1).mean()
";

pub(crate) const RSI_HELPER: &str = "\
def calculate_rsi(close, period):
    delta = close.diff()
    gain = delta.where(delta > 0, 0.0).rolling(window=period, min_periods=1).mean()
    loss = (-delta).where(delta < 0, 0.0).rolling(window=period, min_periods=1).mean()
    rs = gain / loss.replace(0, np.inf)
    return 100 - (100 / (1 + rs))
";

pub(crate) const EMA_HELPER: &str = "\
def calculate_ema(series, period):
    return series.ewm(span=period, adjust=False).mean()
";

pub(crate) const SMA_HELPER: &str = "\
def calculate_sma(series, period):
    return series.rolling(window=period).mean()
";

pub(crate) const MACD_HELPER: &str = "\
def calculate_macd(close, fast, slow, signal_period):
    macd_line = calculate_ema(close, fast) - calculate_ema(close, slow)
    signal_line = calculate_ema(macd_line, signal_period)
    return macd_line, signal_line, macd_line - signal_line
";

pub(crate) const BOLLINGER_HELPER: &str = "\
def calculate_bollinger(close, period, std_mult):
    middle = close.rolling(window=period).mean()
    std = close.rolling(window=period).std()
    return middle, middle + (std * std_mult), middle - (std * std_mult)
";

const STOCHASTIC_HELPER: &str = "\
def calculate_stochastic(data, k_period, d_period):
    low_min = data['low'].rolling(window=k_period).min()
    high_max = data['high'].rolling(window=k_period).max()
    k_line = 100 * (data['close'] - low_min) / (high_max - low_min + 0.0001)
    return k_line, k_line.rolling(window=d_period).mean()
";

const ADX_HELPER: &str = "\
def calculate_adx(data, period):
    high = data['high']
    low = data['low']
    close = data['close']
    up_move = high.diff()
    down_move = -low.diff()
    plus_dm = up_move.where((up_move > down_move) & (up_move > 0), 0.0)
    minus_dm = down_move.where((down_move > up_move) & (down_move > 0), 0.0)
    tr = pd.concat([high - low, (high - close.shift(1)).abs(), (low - close.shift(1)).abs()], axis=1).max(axis=1)
    atr = tr.rolling(window=period).mean()
    plus_di = 100 * (plus_dm.rolling(window=period).mean() / atr)
    minus_di = 100 * (minus_dm.rolling(window=period).mean() / atr)
    dx = 100 * ((plus_di - minus_di).abs() / (plus_di + minus_di + 0.0001))
    return dx.rolling(window=period).mean()
";

const POSITION_STATE: &str = "\
# Position state
entry_price = None
stop_loss = None
take_profit = None


def open_position(price, stop, target):
    global entry_price, stop_loss, take_profit
    entry_price = price
    stop_loss = stop
    take_profit = target


def close_position():
    global entry_price, stop_loss, take_profit
    entry_price = None
    stop_loss = None
    take_profit = None
";

// ============================================================================
// Writer
// ============================================================================

/// Line-oriented builder for artifact source
pub(crate) struct ArtifactWriter {
    out: String,
}

impl ArtifactWriter {
    pub(crate) fn new() -> Self {
        Self {
            out: String::with_capacity(4096),
        }
    }

    pub(crate) fn line(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self.out.push('\n');
        self
    }

    /// Line inside a function body, `depth` levels deep
    pub(crate) fn body(&mut self, depth: usize, text: &str) -> &mut Self {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.line(text)
    }

    pub(crate) fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    pub(crate) fn imports(&mut self) -> &mut Self {
        self.line("import pandas as pd")
            .line("import numpy as np")
            .blank()
    }

    pub(crate) fn constants(&mut self, constants: &[(&str, ParamValue)]) -> &mut Self {
        for (name, value) in constants {
            self.line(&format!("{name} = {value}"));
        }
        self.blank()
    }

    /// Helper blocks separated by two blank lines
    pub(crate) fn helpers(&mut self, helpers: &[&str]) -> &mut Self {
        for helper in helpers {
            self.out.push_str(helper);
            self.blank().blank();
        }
        self
    }

    pub(crate) fn returns(&mut self, depth: usize, signal: Signal) -> &mut Self {
        self.body(depth, &format!("return '{}'", signal.as_str()))
    }

    pub(crate) fn finish(self) -> StrategyArtifact {
        StrategyArtifact::new(self.out)
    }
}

// ============================================================================
// Decision skeleton shared by the search families
// ============================================================================

/// Family-specific pieces plugged into the shared decision function
struct DecisionRule<'a> {
    /// Minimum number of bars before any decision
    warmup: &'a str,
    /// Indicator lines evaluated on every call (`close`, `price`, `atr` are in scope)
    indicators: &'a [&'a str],
    entry: &'a str,
    stop: &'a str,
    target: &'a str,
    /// Family exit signal checked before stop-loss and take-profit
    exit: Option<&'a str>,
}

fn write_decision(w: &mut ArtifactWriter, rule: &DecisionRule<'_>) {
    w.line(DECISION_ENTRY_POINT)
        .body(1, &format!("if len(data) < {}:", rule.warmup))
        .returns(2, Signal::Hold)
        .blank()
        .body(1, "close = data['close']")
        .body(1, "price = close.iloc[-1]")
        .body(1, "atr = calculate_atr(data, ATR_PERIOD).iloc[-1]");
    for line in rule.indicators {
        w.body(1, line);
    }

    w.blank()
        .body(1, "if entry_price is None:")
        .body(2, &format!("if {}:", rule.entry))
        .body(3, &format!("open_position(price, {}, {})", rule.stop, rule.target))
        .returns(3, Signal::Buy)
        .returns(2, Signal::Hold)
        .blank();

    if let Some(exit) = rule.exit {
        w.body(1, &format!("if {exit}:"))
            .body(2, "close_position()")
            .returns(2, Signal::Sell);
    }
    w.body(1, "if price <= stop_loss:")
        .body(2, "close_position()")
        .returns(2, Signal::Sell)
        .body(1, "if take_profit is not None and price >= take_profit:")
        .body(2, "close_position()")
        .returns(2, Signal::Sell)
        .returns(1, Signal::Hold);
}

fn search_artifact(
    family: StrategyFamily,
    params: &StrategyParams,
    constants: &[(&str, ParamValue)],
    helpers: &[&str],
    rule: &DecisionRule<'_>,
) -> StrategyArtifact {
    let mut w = ArtifactWriter::new();
    w.line(&format!("# {} Strategy", family.display_name()))
        .line(&format!("# Parameters: {params}"))
        .blank()
        .imports()
        .line("# Strategy parameters")
        .constants(constants)
        .helpers(helpers)
        .line(POSITION_STATE)
        .blank();
    write_decision(&mut w, rule);
    w.finish()
}

const ATR_PERIOD: (&str, ParamValue) = ("ATR_PERIOD", ParamValue::Int(14));
const TAKE_PROFIT_RATIO: (&str, ParamValue) = ("TAKE_PROFIT_RATIO", ParamValue::Float(2.0));
const ATR_STOP: &str = "price - atr * ATR_MULTIPLIER";
const ATR_TARGET: &str = "price + atr * ATR_MULTIPLIER * TAKE_PROFIT_RATIO";

// ============================================================================
// Rendering
// ============================================================================

/// Render a parameter combination into its strategy artifact.
pub fn render(params: &StrategyParams) -> StrategyArtifact {
    use ParamValue::{Float, Int};

    let family = match params.family() {
        Some(family) => family,
        None => return render_buy_and_hold(),
    };

    match *params {
        StrategyParams::RsiMeanReversion {
            period,
            oversold,
            overbought,
            atr_multiplier,
        } => search_artifact(
            family,
            params,
            &[
                ("RSI_PERIOD", Int(period)),
                ("OVERSOLD", Int(oversold)),
                ("OVERBOUGHT", Int(overbought)),
                ATR_PERIOD,
                ("ATR_MULTIPLIER", Float(atr_multiplier)),
                TAKE_PROFIT_RATIO,
            ],
            &[RSI_HELPER, ATR_HELPER],
            &DecisionRule {
                warmup: "RSI_PERIOD + 2",
                indicators: &["rsi = calculate_rsi(close, RSI_PERIOD).iloc[-1]"],
                entry: "rsi < OVERSOLD",
                stop: ATR_STOP,
                target: ATR_TARGET,
                exit: Some("rsi > OVERBOUGHT"),
            },
        ),
        StrategyParams::MacdTrendFollowing {
            fast,
            slow,
            signal_period,
            atr_multiplier,
        } => search_artifact(
            family,
            params,
            &[
                ("FAST_PERIOD", Int(fast)),
                ("SLOW_PERIOD", Int(slow)),
                ("SIGNAL_PERIOD", Int(signal_period)),
                ATR_PERIOD,
                ("ATR_MULTIPLIER", Float(atr_multiplier)),
                TAKE_PROFIT_RATIO,
            ],
            &[EMA_HELPER, MACD_HELPER, ATR_HELPER],
            &DecisionRule {
                warmup: "SLOW_PERIOD + SIGNAL_PERIOD",
                indicators: &[
                    "macd_line, signal_line, _ = calculate_macd(close, FAST_PERIOD, SLOW_PERIOD, SIGNAL_PERIOD)",
                    "macd = macd_line.iloc[-1]",
                    "macd_signal = signal_line.iloc[-1]",
                    "prev_macd = macd_line.iloc[-2]",
                    "prev_signal = signal_line.iloc[-2]",
                ],
                entry: "prev_macd <= prev_signal and macd > macd_signal",
                stop: ATR_STOP,
                target: ATR_TARGET,
                exit: Some("prev_macd >= prev_signal and macd < macd_signal"),
            },
        ),
        StrategyParams::BollingerMeanReversion {
            period,
            std_mult,
            atr_multiplier,
        } => search_artifact(
            family,
            params,
            &[
                ("BB_PERIOD", Int(period)),
                ("STD_MULT", Float(std_mult)),
                ATR_PERIOD,
                ("ATR_MULTIPLIER", Float(atr_multiplier)),
            ],
            &[BOLLINGER_HELPER, ATR_HELPER],
            &DecisionRule {
                warmup: "BB_PERIOD + 1",
                indicators: &[
                    "middle, upper, lower = calculate_bollinger(close, BB_PERIOD, STD_MULT)",
                    "bb_middle = middle.iloc[-1]",
                    "bb_upper = upper.iloc[-1]",
                    "bb_lower = lower.iloc[-1]",
                ],
                entry: "price <= bb_lower",
                stop: ATR_STOP,
                target: "bb_middle",
                exit: Some("price >= bb_upper"),
            },
        ),
        StrategyParams::BollingerBreakout {
            period,
            std_mult,
            atr_multiplier,
        } => search_artifact(
            family,
            params,
            &[
                ("BB_PERIOD", Int(period)),
                ("STD_MULT", Float(std_mult)),
                ("VOLUME_PERIOD", Int(20)),
                ("VOLUME_MULT", Float(1.5)),
                ATR_PERIOD,
                ("ATR_MULTIPLIER", Float(atr_multiplier)),
                TAKE_PROFIT_RATIO,
            ],
            &[BOLLINGER_HELPER, ATR_HELPER],
            &DecisionRule {
                warmup: "max(BB_PERIOD, VOLUME_PERIOD) + 1",
                indicators: &[
                    "middle, upper, lower = calculate_bollinger(close, BB_PERIOD, STD_MULT)",
                    "bb_middle = middle.iloc[-1]",
                    "bb_upper = upper.iloc[-1]",
                    "bb_lower = lower.iloc[-1]",
                    "prev_close = close.iloc[-2]",
                    "prev_upper = upper.iloc[-2]",
                    "volume = data['volume'].iloc[-1]",
                    "vol_avg = data['volume'].rolling(window=VOLUME_PERIOD).mean().iloc[-1]",
                ],
                entry: "price > bb_upper and prev_close <= prev_upper and volume > vol_avg * VOLUME_MULT",
                stop: "bb_lower",
                target: ATR_TARGET,
                exit: Some("price < bb_middle"),
            },
        ),
        StrategyParams::MaCrossoverEma {
            fast,
            slow,
            atr_multiplier,
        } => render_ma_crossover(family, params, fast, slow, atr_multiplier, MovingAverage::Ema),
        StrategyParams::MaCrossoverSma {
            fast,
            slow,
            atr_multiplier,
        } => render_ma_crossover(family, params, fast, slow, atr_multiplier, MovingAverage::Sma),
        StrategyParams::Stochastic {
            k_period,
            d_period,
            oversold,
            overbought,
            atr_multiplier,
        } => search_artifact(
            family,
            params,
            &[
                ("K_PERIOD", Int(k_period)),
                ("D_PERIOD", Int(d_period)),
                ("OVERSOLD", Int(oversold)),
                ("OVERBOUGHT", Int(overbought)),
                ATR_PERIOD,
                ("ATR_MULTIPLIER", Float(atr_multiplier)),
                TAKE_PROFIT_RATIO,
            ],
            &[STOCHASTIC_HELPER, ATR_HELPER],
            &DecisionRule {
                warmup: "K_PERIOD + D_PERIOD + 1",
                indicators: &[
                    "k_line, d_line = calculate_stochastic(data, K_PERIOD, D_PERIOD)",
                    "k = k_line.iloc[-1]",
                    "d = d_line.iloc[-1]",
                    "prev_k = k_line.iloc[-2]",
                    "prev_d = d_line.iloc[-2]",
                ],
                entry: "prev_k <= prev_d and k > d and k < OVERSOLD",
                stop: ATR_STOP,
                target: ATR_TARGET,
                exit: Some("prev_k >= prev_d and k < d and k > OVERBOUGHT"),
            },
        ),
        StrategyParams::SwingTrading {
            buy_threshold,
            sell_threshold,
            lookback,
            atr_multiplier,
        } => search_artifact(
            family,
            params,
            &[
                ("BUY_THRESHOLD", Int(buy_threshold)),
                ("SELL_THRESHOLD", Int(sell_threshold)),
                ("LOOKBACK", Int(lookback)),
                ATR_PERIOD,
                ("ATR_MULTIPLIER", Float(atr_multiplier)),
            ],
            &[ATR_HELPER],
            &DecisionRule {
                warmup: "LOOKBACK + 1",
                indicators: &[
                    "rolling_high = data['high'].rolling(window=LOOKBACK).max().iloc[-1]",
                    "pct_from_high = (rolling_high - price) / rolling_high * 100",
                ],
                entry: "pct_from_high >= BUY_THRESHOLD",
                stop: ATR_STOP,
                target: "price * (1 + SELL_THRESHOLD / 100)",
                exit: None,
            },
        ),
        StrategyParams::CombinedAdx {
            adx_threshold,
            rsi_period,
            rsi_oversold,
            rsi_overbought,
            atr_multiplier,
        } => search_artifact(
            family,
            params,
            &[
                ("ADX_THRESHOLD", Int(adx_threshold)),
                ("ADX_PERIOD", Int(14)),
                ("RSI_PERIOD", Int(rsi_period)),
                ("OVERSOLD", Int(rsi_oversold)),
                ("OVERBOUGHT", Int(rsi_overbought)),
                ATR_PERIOD,
                ("ATR_MULTIPLIER", Float(atr_multiplier)),
                TAKE_PROFIT_RATIO,
            ],
            &[RSI_HELPER, ADX_HELPER, ATR_HELPER],
            &DecisionRule {
                warmup: "max(RSI_PERIOD, ADX_PERIOD * 2) + 1",
                indicators: &[
                    "rsi = calculate_rsi(close, RSI_PERIOD).iloc[-1]",
                    "adx = calculate_adx(data, ADX_PERIOD).iloc[-1]",
                ],
                entry: "rsi < OVERSOLD and adx > ADX_THRESHOLD",
                stop: ATR_STOP,
                target: ATR_TARGET,
                exit: Some("rsi > OVERBOUGHT or adx < ADX_THRESHOLD * 0.7"),
            },
        ),
        StrategyParams::BuyAndHold => render_buy_and_hold(),
    }
}

#[derive(Clone, Copy)]
enum MovingAverage {
    Ema,
    Sma,
}

fn render_ma_crossover(
    family: StrategyFamily,
    params: &StrategyParams,
    fast: u32,
    slow: u32,
    atr_multiplier: f64,
    kind: MovingAverage,
) -> StrategyArtifact {
    let (helper, fast_line, slow_line) = match kind {
        MovingAverage::Ema => (
            EMA_HELPER,
            "fast_line = calculate_ema(close, FAST_PERIOD)",
            "slow_line = calculate_ema(close, SLOW_PERIOD)",
        ),
        MovingAverage::Sma => (
            SMA_HELPER,
            "fast_line = calculate_sma(close, FAST_PERIOD)",
            "slow_line = calculate_sma(close, SLOW_PERIOD)",
        ),
    };

    search_artifact(
        family,
        params,
        &[
            ("FAST_PERIOD", ParamValue::Int(fast)),
            ("SLOW_PERIOD", ParamValue::Int(slow)),
            ATR_PERIOD,
            ("ATR_MULTIPLIER", ParamValue::Float(atr_multiplier)),
            TAKE_PROFIT_RATIO,
        ],
        &[helper, ATR_HELPER],
        &DecisionRule {
            warmup: "SLOW_PERIOD + 1",
            indicators: &[
                fast_line,
                slow_line,
                "fast = fast_line.iloc[-1]",
                "slow = slow_line.iloc[-1]",
                "prev_fast = fast_line.iloc[-2]",
                "prev_slow = slow_line.iloc[-2]",
            ],
            entry: "prev_fast <= prev_slow and fast > slow",
            stop: ATR_STOP,
            target: ATR_TARGET,
            exit: Some("prev_fast >= prev_slow and fast < slow"),
        },
    )
}

fn render_buy_and_hold() -> StrategyArtifact {
    let mut w = ArtifactWriter::new();
    w.line(BASELINE_MARKER)
        .line("# Hold a long position for the entire backtest period")
        .blank()
        .line("position_open = False")
        .blank()
        .blank()
        .line(DECISION_ENTRY_POINT)
        .body(1, "global position_open")
        .body(1, "if not position_open:")
        .body(2, "position_open = True")
        .returns(2, Signal::Buy)
        .returns(1, Signal::Hold);
    w.finish()
}

/// True when every `()`, `[]` and `{}` in `code` is balanced, ignoring
/// delimiters inside quoted strings and comments.
pub fn delimiters_balanced(code: &str) -> bool {
    let mut stack: Vec<char> = Vec::new();
    for line in code.lines() {
        let mut quote: Option<char> = None;
        for c in line.chars() {
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '#' => break,
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => stack.push(c),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    if stack.pop() != Some(expected) {
                        return false;
                    }
                }
                _ => {}
            }
        }
        if quote.is_some() {
            return false;
        }
    }
    stack.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{generate, generate_all};

    fn first(family: StrategyFamily) -> StrategyParams {
        generate(family).remove(0)
    }

    #[test]
    fn test_render_is_deterministic_for_every_family() {
        for params in generate_all() {
            assert_eq!(render(&params), render(&params.clone()), "{params}");
        }
    }

    #[test]
    fn test_rsi_constants_render_literally() {
        let params = StrategyParams::RsiMeanReversion {
            period: 14,
            oversold: 30,
            overbought: 70,
            atr_multiplier: 2.0,
        };
        let code = render(&params).code().to_string();

        assert!(code.contains("RSI_PERIOD = 14\n"));
        assert!(code.contains("OVERSOLD = 30\n"));
        assert!(code.contains("OVERBOUGHT = 70\n"));
        assert!(code.contains("ATR_MULTIPLIER = 2.0\n"));
        assert!(code.contains("def calculate_rsi"));
        assert!(code.contains("import pandas as pd"));
    }

    #[test]
    fn test_family_specific_helpers() {
        let expectations: &[(StrategyFamily, &[&str])] = &[
            (StrategyFamily::RsiMeanReversion, &["def calculate_rsi"]),
            (StrategyFamily::MacdTrendFollowing, &["def calculate_macd", "def calculate_ema"]),
            (StrategyFamily::BollingerMeanReversion, &["def calculate_bollinger"]),
            (StrategyFamily::BollingerBreakout, &["def calculate_bollinger", "VOLUME_MULT = 1.5"]),
            (StrategyFamily::MaCrossoverEma, &["def calculate_ema"]),
            (StrategyFamily::MaCrossoverSma, &["def calculate_sma"]),
            (StrategyFamily::Stochastic, &["def calculate_stochastic"]),
            (StrategyFamily::SwingTrading, &["pct_from_high"]),
            (StrategyFamily::CombinedAdx, &["def calculate_adx", "def calculate_rsi"]),
        ];
        for (family, needles) in expectations {
            let artifact = render(&first(*family));
            for needle in *needles {
                assert!(artifact.code().contains(needle), "{family} missing {needle}");
            }
            assert!(artifact.code().contains("def calculate_atr"), "{family} missing ATR");
        }
    }

    #[test]
    fn test_single_entry_point_with_all_decisions() {
        for params in generate_all().iter().filter(|p| !p.is_baseline()) {
            let code = render(params).code().to_string();
            assert_eq!(code.matches(DECISION_ENTRY_POINT).count(), 1, "{params}");
            assert!(code.contains("return 'BUY'"));
            assert!(code.contains("return 'SELL'"));
            assert!(code.contains("return 'HOLD'"));
        }
    }

    #[test]
    fn test_artifacts_are_well_formed() {
        for params in generate_all() {
            let artifact = render(&params);
            assert!(delimiters_balanced(artifact.code()), "unbalanced artifact for {params}");
        }
    }

    #[test]
    fn test_baseline_is_recognizable() {
        let baseline = render(&StrategyParams::BuyAndHold);
        assert!(baseline.is_baseline());
        assert!(baseline.code().contains(DECISION_ENTRY_POINT));
        assert!(baseline.code().contains("return 'BUY'"));
        assert!(!baseline.code().contains("return 'SELL'"));

        for params in generate_all().iter().filter(|p| !p.is_baseline()) {
            assert!(!render(params).is_baseline(), "{params}");
        }
    }

    #[test]
    fn test_distinct_params_give_distinct_artifacts() {
        let grid = generate(StrategyFamily::MacdTrendFollowing);
        let a = render(&grid[0]);
        let b = render(&grid[1]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_swing_threshold_and_float_formatting() {
        let params = StrategyParams::SwingTrading {
            buy_threshold: 10,
            sell_threshold: 15,
            lookback: 20,
            atr_multiplier: 2.0,
        };
        let code = render(&params).code().to_string();
        assert!(code.contains("BUY_THRESHOLD = 10\n"));
        assert!(code.contains("SELL_THRESHOLD = 15\n"));
        assert!(code.contains("LOOKBACK = 20\n"));

        let bb = StrategyParams::BollingerMeanReversion {
            period: 20,
            std_mult: 2.5,
            atr_multiplier: 2.0,
        };
        assert!(render(&bb).code().contains("STD_MULT = 2.5\n"));
    }

    #[test]
    fn test_delimiter_checker() {
        assert!(delimiters_balanced("f(a[1], 'x)')  # )"));
        assert!(!delimiters_balanced("f(a[1)]"));
        assert!(!delimiters_balanced("f((a)"));
    }
}
