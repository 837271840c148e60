//! Execution gateway
//!
//! The backtest sandbox lives outside this crate. The optimizer only sees the
//! [`ExecutionGateway`] seam: submit an artifact, get metrics back or an error.
//! Two adapters ship here: an HTTP client for the execution service and a
//! deterministic simulator for offline dry runs.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::{PerformanceResult, StrategyArtifact};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Execution timed out after {0}s")]
    Timeout(u64),

    #[error("Execution service unavailable: {0}")]
    Unavailable(String),

    #[error("Strategy execution failed: {0}")]
    Execution(String),

    #[error("Execution returned no performance data")]
    NoPerformance,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// One backtest submission
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: String,
    pub symbol: String,
    pub timeframe: String,
    pub period: String,
    pub requester_id: String,
    pub timeout_secs: u64,
}

impl ExecutionRequest {
    pub fn new(
        artifact: &StrategyArtifact,
        symbol: &str,
        timeframe: &str,
        period: &str,
        requester_id: &str,
        timeout_secs: u64,
    ) -> Self {
        Self {
            code: artifact.code().to_string(),
            language: artifact.language().to_string(),
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            period: period.to_string(),
            requester_id: requester_id.to_string(),
            timeout_secs,
        }
    }
}

/// Runs an artifact against historical bars.
///
/// Implementations enforce `request.timeout_secs` themselves; any failure is
/// reported as an error and never panics.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<PerformanceResult, GatewayError>;
}

// ============================================================================
// HTTP adapter
// ============================================================================

/// Metrics as reported by the execution service (win rate in percent)
#[derive(Debug, Deserialize)]
struct WirePerformance {
    total_return: f64,
    win_rate: f64,
    max_drawdown: f64,
    sharpe_ratio: f64,
    profit_factor: f64,
    total_trades: u32,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    performance: Option<WirePerformance>,
    #[serde(default)]
    errors: Vec<String>,
}

/// Client for the execution service's `POST /execute` endpoint
#[derive(Clone)]
pub struct HttpExecutionGateway {
    client: Client,
    base_url: String,
}

impl HttpExecutionGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_transport(err: reqwest::Error, timeout_secs: u64) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(timeout_secs)
        } else if err.is_connect() {
            GatewayError::Unavailable(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ExecutionGateway for HttpExecutionGateway {
    async fn execute(&self, request: &ExecutionRequest) -> Result<PerformanceResult, GatewayError> {
        let url = format!("{}/execute", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(request.timeout_secs))
            .json(request)
            .send()
            .await
            .map_err(|e| Self::map_transport(e, request.timeout_secs))?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Execution(format!("{status}: {body}")));
        }

        let body: ExecuteResponse = response
            .json()
            .await
            .map_err(|e| Self::map_transport(e, request.timeout_secs))?;

        if !body.errors.is_empty() {
            return Err(GatewayError::Execution(body.errors.join("; ")));
        }

        let perf = body.performance.ok_or(GatewayError::NoPerformance)?;
        debug!(
            symbol = %request.symbol,
            total_return = perf.total_return,
            trades = perf.total_trades,
            "Execution finished"
        );

        Ok(PerformanceResult {
            total_return: perf.total_return,
            win_rate: perf.win_rate / 100.0,
            max_drawdown: perf.max_drawdown,
            sharpe_ratio: perf.sharpe_ratio,
            profit_factor: perf.profit_factor,
            total_trades: perf.total_trades,
            success: true,
        })
    }
}

// ============================================================================
// Simulated adapter
// ============================================================================

/// Offline gateway producing reproducible pseudo-metrics.
///
/// The RNG is seeded from the artifact code and the market context, so the
/// same submission always yields the same metrics (or the same failure).
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    failure_ratio: f64,
    latency: Duration,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of submissions (0.0 - 1.0) that fail with an execution error.
    pub fn with_failure_ratio(mut self, ratio: f64) -> Self {
        self.failure_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn seed(request: &ExecutionRequest) -> u64 {
        let digest = Sha256::new()
            .chain_update(request.code.as_bytes())
            .chain_update(request.symbol.as_bytes())
            .chain_update(request.timeframe.as_bytes())
            .chain_update(request.period.as_bytes())
            .finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

#[async_trait]
impl ExecutionGateway for SimulatedGateway {
    async fn execute(&self, request: &ExecutionRequest) -> Result<PerformanceResult, GatewayError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut rng = StdRng::seed_from_u64(Self::seed(request));
        if rng.gen::<f64>() < self.failure_ratio {
            return Err(GatewayError::Execution(
                "simulated sandbox error".to_string(),
            ));
        }

        let is_baseline = request.code.starts_with(crate::templates::BASELINE_MARKER);
        let total_trades = if is_baseline { 1 } else { rng.gen_range(0..80) };
        let win_rate = rng.gen_range(0.30..0.70);

        Ok(PerformanceResult {
            total_return: rng.gen_range(-30.0..120.0),
            win_rate,
            max_drawdown: rng.gen_range(5.0..40.0),
            sharpe_ratio: rng.gen_range(-0.5..2.5),
            profit_factor: rng.gen_range(0.6..2.5),
            total_trades,
            success: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{generate, StrategyFamily, StrategyParams};
    use crate::templates::render;

    fn request_for(params: &StrategyParams, symbol: &str) -> ExecutionRequest {
        ExecutionRequest::new(&render(params), symbol, "1D", "3y", "tester", 30)
    }

    #[tokio::test]
    async fn test_simulated_gateway_is_reproducible() {
        let gateway = SimulatedGateway::new();
        let params = generate(StrategyFamily::RsiMeanReversion).remove(0);
        let request = request_for(&params, "AAPL");

        let a = gateway.execute(&request).await.unwrap();
        let b = gateway.execute(&request).await.unwrap();
        assert_eq!(a, b);
        assert!(a.success);
        assert!((0.0..=1.0).contains(&a.win_rate));
    }

    #[tokio::test]
    async fn test_simulated_gateway_varies_with_symbol() {
        let gateway = SimulatedGateway::new();
        let params = generate(StrategyFamily::MacdTrendFollowing).remove(0);

        let aapl = gateway.execute(&request_for(&params, "AAPL")).await.unwrap();
        let msft = gateway.execute(&request_for(&params, "MSFT")).await.unwrap();
        assert_ne!(aapl, msft);
    }

    #[tokio::test]
    async fn test_latency_delays_without_changing_metrics() {
        let params = generate(StrategyFamily::Stochastic).remove(0);
        let request = request_for(&params, "AAPL");
        let instant = SimulatedGateway::new().execute(&request).await.unwrap();

        let started = std::time::Instant::now();
        let delayed = SimulatedGateway::new()
            .with_latency(Duration::from_millis(50))
            .execute(&request)
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(instant, delayed);
    }

    #[tokio::test]
    async fn test_full_failure_ratio_always_fails() {
        let gateway = SimulatedGateway::new().with_failure_ratio(1.0);
        let request = request_for(&StrategyParams::BuyAndHold, "AAPL");

        let err = gateway.execute(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Execution(_)));
    }

    #[tokio::test]
    async fn test_simulated_baseline_trades_once() {
        let gateway = SimulatedGateway::new();
        let perf = gateway
            .execute(&request_for(&StrategyParams::BuyAndHold, "SPY"))
            .await
            .unwrap();
        assert_eq!(perf.total_trades, 1);
    }

    #[test]
    fn test_request_carries_artifact_language() {
        let request = request_for(&StrategyParams::BuyAndHold, "AAPL");
        assert_eq!(request.language, "python");
        assert_eq!(request.timeout_secs, 30);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["requester_id"], "tester");
    }

    #[test]
    fn test_wire_response_parsing() {
        let body: ExecuteResponse = serde_json::from_str(
            r#"{"performance":{"total_return":12.5,"win_rate":55.0,"max_drawdown":8.0,
                "sharpe_ratio":1.2,"profit_factor":1.8,"total_trades":14}}"#,
        )
        .unwrap();
        assert!(body.errors.is_empty());
        assert_eq!(body.performance.unwrap().total_trades, 14);

        let failed: ExecuteResponse =
            serde_json::from_str(r#"{"errors":["NameError: x"]}"#).unwrap();
        assert!(failed.performance.is_none());
        assert_eq!(failed.errors.len(), 1);
    }

    #[test]
    fn test_base_url_is_normalised() {
        let gateway = HttpExecutionGateway::new("http://localhost:8090/");
        assert_eq!(gateway.base_url(), "http://localhost:8090");
    }
}
