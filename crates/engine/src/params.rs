//! Strategy families and their parameter grids
//!
//! Each family owns a fixed parameter schema. The grids are bounded Cartesian
//! products (12 combinations per family) so one optimization run stays in the
//! low hundreds of backtests. Generation is pure and order-stable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ATR stop-loss multiplier carried by every search candidate
pub const DEFAULT_ATR_MULTIPLIER: f64 = 2.0;

/// Lookback window for swing high/low detection
pub const SWING_LOOKBACK: u32 = 20;

// ============================================================================
// Families
// ============================================================================

/// Closed set of strategy families explored by the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyFamily {
    RsiMeanReversion,
    MacdTrendFollowing,
    BollingerMeanReversion,
    BollingerBreakout,
    MaCrossoverEma,
    MaCrossoverSma,
    Stochastic,
    SwingTrading,
    CombinedAdx,
}

/// Market behaviour a family is designed to exploit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyStyle {
    TrendFollowing,
    MeanReversion,
    Breakout,
    /// Trend-filtered oscillator; counts toward no regime
    Filtered,
}

impl StrategyFamily {
    pub fn all() -> &'static [StrategyFamily] {
        &[
            Self::RsiMeanReversion,
            Self::MacdTrendFollowing,
            Self::BollingerMeanReversion,
            Self::BollingerBreakout,
            Self::MaCrossoverEma,
            Self::MaCrossoverSma,
            Self::Stochastic,
            Self::SwingTrading,
            Self::CombinedAdx,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RsiMeanReversion => "RSI Mean Reversion",
            Self::MacdTrendFollowing => "MACD Trend Following",
            Self::BollingerMeanReversion => "Bollinger Bands Mean Reversion",
            Self::BollingerBreakout => "Bollinger Bands Breakout",
            Self::MaCrossoverEma => "EMA Crossover",
            Self::MaCrossoverSma => "SMA Crossover",
            Self::Stochastic => "Stochastic Oscillator",
            Self::SwingTrading => "Swing Trading",
            Self::CombinedAdx => "RSI + ADX Filter",
        }
    }

    pub fn style(&self) -> FamilyStyle {
        match self {
            Self::MacdTrendFollowing | Self::MaCrossoverEma | Self::MaCrossoverSma => {
                FamilyStyle::TrendFollowing
            }
            Self::RsiMeanReversion | Self::BollingerMeanReversion | Self::Stochastic => {
                FamilyStyle::MeanReversion
            }
            Self::BollingerBreakout | Self::SwingTrading => FamilyStyle::Breakout,
            Self::CombinedAdx => FamilyStyle::Filtered,
        }
    }
}

impl fmt::Display for StrategyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Parameter combinations
// ============================================================================

/// A single numeric parameter value, rendered literally into artifacts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(u32),
    Float(f64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) if v.fract() == 0.0 => write!(f, "{v:.1}"),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One point of a family's parameter space, or the buy-and-hold baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum StrategyParams {
    RsiMeanReversion {
        period: u32,
        oversold: u32,
        overbought: u32,
        atr_multiplier: f64,
    },
    MacdTrendFollowing {
        fast: u32,
        slow: u32,
        signal_period: u32,
        atr_multiplier: f64,
    },
    BollingerMeanReversion {
        period: u32,
        std_mult: f64,
        atr_multiplier: f64,
    },
    BollingerBreakout {
        period: u32,
        std_mult: f64,
        atr_multiplier: f64,
    },
    MaCrossoverEma {
        fast: u32,
        slow: u32,
        atr_multiplier: f64,
    },
    MaCrossoverSma {
        fast: u32,
        slow: u32,
        atr_multiplier: f64,
    },
    Stochastic {
        k_period: u32,
        d_period: u32,
        oversold: u32,
        overbought: u32,
        atr_multiplier: f64,
    },
    SwingTrading {
        buy_threshold: u32,
        sell_threshold: u32,
        lookback: u32,
        atr_multiplier: f64,
    },
    CombinedAdx {
        adx_threshold: u32,
        rsi_period: u32,
        rsi_oversold: u32,
        rsi_overbought: u32,
        atr_multiplier: f64,
    },
    /// Reserved baseline: hold a long position for the whole period
    BuyAndHold,
}

impl StrategyParams {
    /// Family this combination belongs to; `None` for the baseline.
    pub fn family(&self) -> Option<StrategyFamily> {
        let family = match self {
            Self::RsiMeanReversion { .. } => StrategyFamily::RsiMeanReversion,
            Self::MacdTrendFollowing { .. } => StrategyFamily::MacdTrendFollowing,
            Self::BollingerMeanReversion { .. } => StrategyFamily::BollingerMeanReversion,
            Self::BollingerBreakout { .. } => StrategyFamily::BollingerBreakout,
            Self::MaCrossoverEma { .. } => StrategyFamily::MaCrossoverEma,
            Self::MaCrossoverSma { .. } => StrategyFamily::MaCrossoverSma,
            Self::Stochastic { .. } => StrategyFamily::Stochastic,
            Self::SwingTrading { .. } => StrategyFamily::SwingTrading,
            Self::CombinedAdx { .. } => StrategyFamily::CombinedAdx,
            Self::BuyAndHold => return None,
        };
        Some(family)
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, Self::BuyAndHold)
    }

    /// Risk parameter; every search candidate carries one.
    pub fn atr_multiplier(&self) -> Option<f64> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == "atr_multiplier")
            .and_then(|(_, value)| match value {
                ParamValue::Float(v) => Some(v),
                ParamValue::Int(v) => Some(f64::from(v)),
            })
    }

    /// Ordered `name -> value` view of the combination.
    pub fn entries(&self) -> Vec<(&'static str, ParamValue)> {
        use ParamValue::{Float, Int};

        match *self {
            Self::RsiMeanReversion {
                period,
                oversold,
                overbought,
                atr_multiplier,
            } => vec![
                ("period", Int(period)),
                ("oversold", Int(oversold)),
                ("overbought", Int(overbought)),
                ("atr_multiplier", Float(atr_multiplier)),
            ],
            Self::MacdTrendFollowing {
                fast,
                slow,
                signal_period,
                atr_multiplier,
            } => vec![
                ("fast", Int(fast)),
                ("slow", Int(slow)),
                ("signal_period", Int(signal_period)),
                ("atr_multiplier", Float(atr_multiplier)),
            ],
            Self::BollingerMeanReversion {
                period,
                std_mult,
                atr_multiplier,
            }
            | Self::BollingerBreakout {
                period,
                std_mult,
                atr_multiplier,
            } => vec![
                ("period", Int(period)),
                ("std_mult", Float(std_mult)),
                ("atr_multiplier", Float(atr_multiplier)),
            ],
            Self::MaCrossoverEma {
                fast,
                slow,
                atr_multiplier,
            }
            | Self::MaCrossoverSma {
                fast,
                slow,
                atr_multiplier,
            } => vec![
                ("fast", Int(fast)),
                ("slow", Int(slow)),
                ("atr_multiplier", Float(atr_multiplier)),
            ],
            Self::Stochastic {
                k_period,
                d_period,
                oversold,
                overbought,
                atr_multiplier,
            } => vec![
                ("k_period", Int(k_period)),
                ("d_period", Int(d_period)),
                ("oversold", Int(oversold)),
                ("overbought", Int(overbought)),
                ("atr_multiplier", Float(atr_multiplier)),
            ],
            Self::SwingTrading {
                buy_threshold,
                sell_threshold,
                lookback,
                atr_multiplier,
            } => vec![
                ("buy_threshold", Int(buy_threshold)),
                ("sell_threshold", Int(sell_threshold)),
                ("lookback", Int(lookback)),
                ("atr_multiplier", Float(atr_multiplier)),
            ],
            Self::CombinedAdx {
                adx_threshold,
                rsi_period,
                rsi_oversold,
                rsi_overbought,
                atr_multiplier,
            } => vec![
                ("adx_threshold", Int(adx_threshold)),
                ("rsi_period", Int(rsi_period)),
                ("rsi_oversold", Int(rsi_oversold)),
                ("rsi_overbought", Int(rsi_overbought)),
                ("atr_multiplier", Float(atr_multiplier)),
            ],
            Self::BuyAndHold => Vec::new(),
        }
    }
}

impl fmt::Display for StrategyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_baseline() {
            return f.write_str("buy_and_hold");
        }
        for (i, (name, value)) in self.entries().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Grid Generation
// ============================================================================

const RSI_PERIODS: &[u32] = &[7, 14, 21];
const RSI_LEVELS: &[(u32, u32)] = &[(20, 80), (25, 75), (30, 70), (35, 65)];
const MACD_FAST: &[u32] = &[8, 12];
const MACD_SLOW: &[u32] = &[21, 26];
const MACD_SIGNAL: &[u32] = &[7, 9, 12];
const BB_PERIODS: &[u32] = &[10, 15, 20, 25];
const BB_STD_MULT: &[f64] = &[1.5, 2.0, 2.5];
const MA_FAST: &[u32] = &[5, 10, 15, 20];
const MA_SLOW: &[u32] = &[50, 100, 200];
const STOCH_K: &[u32] = &[10, 14, 20];
const STOCH_D: &[u32] = &[3, 5];
const STOCH_LEVELS: &[(u32, u32)] = &[(20, 80), (30, 70)];
const SWING_BUY: &[u32] = &[5, 8, 10, 12];
const SWING_SELL: &[u32] = &[8, 12, 15, 20];
const ADX_THRESHOLDS: &[u32] = &[20, 25, 30];
const ADX_RSI_PERIODS: &[u32] = &[10, 14];
const ADX_RSI_OVERSOLD: &[u32] = &[25, 30];

/// Enumerate the parameter grid of one family.
pub fn generate(family: StrategyFamily) -> Vec<StrategyParams> {
    let atr_multiplier = DEFAULT_ATR_MULTIPLIER;
    let mut grid = Vec::with_capacity(12);

    match family {
        StrategyFamily::RsiMeanReversion => {
            for &period in RSI_PERIODS {
                for &(oversold, overbought) in RSI_LEVELS {
                    grid.push(StrategyParams::RsiMeanReversion {
                        period,
                        oversold,
                        overbought,
                        atr_multiplier,
                    });
                }
            }
        }
        StrategyFamily::MacdTrendFollowing => {
            for &fast in MACD_FAST {
                for &slow in MACD_SLOW {
                    for &signal_period in MACD_SIGNAL {
                        if slow > fast {
                            grid.push(StrategyParams::MacdTrendFollowing {
                                fast,
                                slow,
                                signal_period,
                                atr_multiplier,
                            });
                        }
                    }
                }
            }
        }
        StrategyFamily::BollingerMeanReversion => {
            for &period in BB_PERIODS {
                for &std_mult in BB_STD_MULT {
                    grid.push(StrategyParams::BollingerMeanReversion {
                        period,
                        std_mult,
                        atr_multiplier,
                    });
                }
            }
        }
        StrategyFamily::BollingerBreakout => {
            for &period in BB_PERIODS {
                for &std_mult in BB_STD_MULT {
                    grid.push(StrategyParams::BollingerBreakout {
                        period,
                        std_mult,
                        atr_multiplier,
                    });
                }
            }
        }
        StrategyFamily::MaCrossoverEma => {
            for &fast in MA_FAST {
                for &slow in MA_SLOW {
                    if slow > fast {
                        grid.push(StrategyParams::MaCrossoverEma {
                            fast,
                            slow,
                            atr_multiplier,
                        });
                    }
                }
            }
        }
        StrategyFamily::MaCrossoverSma => {
            for &fast in MA_FAST {
                for &slow in MA_SLOW {
                    if slow > fast {
                        grid.push(StrategyParams::MaCrossoverSma {
                            fast,
                            slow,
                            atr_multiplier,
                        });
                    }
                }
            }
        }
        StrategyFamily::Stochastic => {
            for &k_period in STOCH_K {
                for &d_period in STOCH_D {
                    for &(oversold, overbought) in STOCH_LEVELS {
                        grid.push(StrategyParams::Stochastic {
                            k_period,
                            d_period,
                            oversold,
                            overbought,
                            atr_multiplier,
                        });
                    }
                }
            }
        }
        StrategyFamily::SwingTrading => {
            for &buy_threshold in SWING_BUY {
                for &sell_threshold in SWING_SELL {
                    if sell_threshold > buy_threshold {
                        grid.push(StrategyParams::SwingTrading {
                            buy_threshold,
                            sell_threshold,
                            lookback: SWING_LOOKBACK,
                            atr_multiplier,
                        });
                    }
                }
            }
        }
        StrategyFamily::CombinedAdx => {
            for &adx_threshold in ADX_THRESHOLDS {
                for &rsi_period in ADX_RSI_PERIODS {
                    for &rsi_oversold in ADX_RSI_OVERSOLD {
                        grid.push(StrategyParams::CombinedAdx {
                            adx_threshold,
                            rsi_period,
                            rsi_oversold,
                            rsi_overbought: 100 - rsi_oversold,
                            atr_multiplier,
                        });
                    }
                }
            }
        }
    }

    grid
}

/// Full candidate set: every family's grid followed by the single baseline.
pub fn generate_all() -> Vec<StrategyParams> {
    let mut candidates: Vec<StrategyParams> = StrategyFamily::all()
        .iter()
        .flat_map(|&family| generate(family))
        .collect();
    candidates.push(StrategyParams::BuyAndHold);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_family_grid_has_twelve_combinations() {
        for &family in StrategyFamily::all() {
            let grid = generate(family);
            assert_eq!(grid.len(), 12, "unexpected grid size for {family}");
            assert!(grid.iter().all(|p| p.family() == Some(family)));
        }
    }

    #[test]
    fn test_full_candidate_set_size() {
        let all = generate_all();
        let per_family: usize = StrategyFamily::all().iter().map(|&f| generate(f).len()).sum();
        assert_eq!(all.len(), per_family + 1);
        assert_eq!(all.len(), 109);
    }

    #[test]
    fn test_exactly_one_baseline_in_last_position() {
        let all = generate_all();
        assert_eq!(all.iter().filter(|p| p.is_baseline()).count(), 1);
        assert!(all.last().map(|p| p.is_baseline()).unwrap_or(false));
    }

    #[test]
    fn test_generation_is_order_stable() {
        assert_eq!(generate_all(), generate_all());
    }

    #[test]
    fn test_every_candidate_carries_risk_parameter() {
        for params in generate_all().iter().filter(|p| !p.is_baseline()) {
            assert_eq!(params.atr_multiplier(), Some(DEFAULT_ATR_MULTIPLIER), "{params}");
        }
        assert_eq!(StrategyParams::BuyAndHold.atr_multiplier(), None);
    }

    #[test]
    fn test_grid_constraints_hold() {
        for params in generate_all() {
            match params {
                StrategyParams::RsiMeanReversion {
                    oversold,
                    overbought,
                    ..
                }
                | StrategyParams::Stochastic {
                    oversold,
                    overbought,
                    ..
                } => assert!(oversold < overbought),
                StrategyParams::MacdTrendFollowing { fast, slow, .. }
                | StrategyParams::MaCrossoverEma { fast, slow, .. }
                | StrategyParams::MaCrossoverSma { fast, slow, .. } => assert!(fast < slow),
                StrategyParams::SwingTrading {
                    buy_threshold,
                    sell_threshold,
                    ..
                } => assert!(buy_threshold < sell_threshold),
                StrategyParams::CombinedAdx {
                    rsi_oversold,
                    rsi_overbought,
                    ..
                } => assert_eq!(rsi_oversold + rsi_overbought, 100),
                _ => {}
            }
        }
    }

    #[test]
    fn test_params_display_is_ordered() {
        let params = StrategyParams::BollingerBreakout {
            period: 20,
            std_mult: 2.5,
            atr_multiplier: 2.0,
        };
        assert_eq!(params.to_string(), "period=20, std_mult=2.5, atr_multiplier=2.0");
    }

    #[test]
    fn test_family_styles() {
        assert_eq!(StrategyFamily::MaCrossoverEma.style(), FamilyStyle::TrendFollowing);
        assert_eq!(StrategyFamily::Stochastic.style(), FamilyStyle::MeanReversion);
        assert_eq!(StrategyFamily::SwingTrading.style(), FamilyStyle::Breakout);
        assert_eq!(StrategyFamily::CombinedAdx.style(), FamilyStyle::Filtered);
    }

    #[test]
    fn test_params_serialize_with_family_tag() {
        let params = StrategyParams::MaCrossoverSma {
            fast: 10,
            slow: 50,
            atr_multiplier: 2.0,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["family"], "ma_crossover_sma");
        assert_eq!(json["slow"], 50);
    }
}
