//! Engine configuration
//!
//! Defaults match the production deployment. Every knob can be overridden
//! through `STRATEGY_LAB_*` environment variables.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

const ENV_PREFIX: &str = "STRATEGY_LAB_";

/// Tuning knobs for the optimization engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of candidate executions in flight
    pub worker_pool_size: usize,
    /// Per-call timeout handed to the execution gateway
    pub execution_timeout_secs: u64,
    /// Backtest period used when the caller does not supply one
    pub default_period: String,
    /// Number of ranked strategies kept on the result
    pub top_n: usize,
    /// Successful candidates with fewer trades are not ranked
    pub min_trades: u32,
    /// Number of top strategies used to classify the market regime
    pub regime_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 8,
            execution_timeout_secs: 120,
            default_period: "3y".to_string(),
            top_n: 5,
            min_trades: 3,
            regime_window: 3,
        }
    }
}

impl EngineConfig {
    /// Build a config from defaults overlaid with environment variables.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(v) = read(&lookup, "WORKER_POOL_SIZE")? {
            config.worker_pool_size = v;
        }
        if let Some(v) = read(&lookup, "EXECUTION_TIMEOUT_SECS")? {
            config.execution_timeout_secs = v;
        }
        if let Some(v) = lookup(&format!("{ENV_PREFIX}DEFAULT_PERIOD")) {
            config.default_period = v.trim().to_string();
        }
        if let Some(v) = read(&lookup, "TOP_N")? {
            config.top_n = v;
        }
        if let Some(v) = read(&lookup, "MIN_TRADES")? {
            config.min_trades = v;
        }
        if let Some(v) = read(&lookup, "REGIME_WINDOW")? {
            config.regime_window = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        if self.worker_pool_size == 0 {
            return Err(EngineError::InvalidConfig(
                "worker_pool_size must be at least 1".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(EngineError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }
        if self.default_period.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "default_period must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn read<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> EngineResult<Option<T>> {
    let key = format!("{ENV_PREFIX}{name}");
    match lookup(&key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| EngineError::InvalidConfig(format!("{key}={raw:?} is not a valid value"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_pool_size, 8);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.default_period, "3y");
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("STRATEGY_LAB_WORKER_POOL_SIZE", "16"),
            ("STRATEGY_LAB_DEFAULT_PERIOD", " 5y "),
            ("STRATEGY_LAB_MIN_TRADES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.worker_pool_size, 16);
        assert_eq!(config.default_period, "5y");
        assert_eq!(config.min_trades, 0);
        assert_eq!(config.execution_timeout_secs, 120);
    }

    #[test]
    fn test_malformed_value_is_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[("STRATEGY_LAB_TOP_N", "five")]))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_pool_is_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[("STRATEGY_LAB_WORKER_POOL_SIZE", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("worker_pool_size"));
    }
}
