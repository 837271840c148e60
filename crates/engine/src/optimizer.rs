//! Strategy optimization engine
//!
//! Enumerates every family's parameter grid plus the buy-and-hold baseline,
//! renders each combination, backtests them concurrently through the
//! execution gateway and ranks the survivors against the baseline.

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc, RwLock,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::advisor::DeploymentAdvisor;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gateway::{ExecutionGateway, ExecutionRequest, GatewayError};
use crate::params::{generate_all, FamilyStyle, StrategyParams};
use crate::templates::render;
use crate::types::{
    MarketRegime, OptimizationResult, PerformanceResult, StrategyArtifact, StrategyTestResult,
};

/// Days assumed when a period string cannot be parsed
pub const DEFAULT_DAYS: u32 = 1095;

/// Recorded when the gateway answers but flags the backtest as unsuccessful
const REPORTED_FAILURE: &str = "execution reported failure";

// ============================================================================
// Progress
// ============================================================================

/// Optimization run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeStatus {
    Idle,
    Running,
    Complete,
    Cancelled,
}

/// Progress tracker shared between the engine and its caller
pub struct OptimizeProgress {
    status: RwLock<OptimizeStatus>,
    pub total_combinations: AtomicU32,
    pub completed: AtomicU32,
    pub failed: AtomicU32,
    cancelled: AtomicBool,
}

impl OptimizeProgress {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(OptimizeStatus::Idle),
            total_combinations: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            failed: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Start a new run. A cancellation requested beforehand is kept.
    fn begin(&self, total: u32) {
        self.set_status(OptimizeStatus::Running);
        self.total_combinations.store(total, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }

    /// Stop submitting candidates. Finished results are kept.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> OptimizeStatus {
        match self.status.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_status(&self, status: OptimizeStatus) {
        match self.status.write() {
            Ok(mut guard) => *guard = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }

    /// Get progress as percentage
    pub fn progress_pct(&self) -> f32 {
        let total = self.total_combinations.load(Ordering::Relaxed);
        let done = self.completed.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            (done as f32 / total as f32) * 100.0
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == OptimizeStatus::Running
    }
}

impl Default for OptimizeProgress {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Candidates
// ============================================================================

struct Candidate {
    index: usize,
    params: StrategyParams,
    artifact: StrategyArtifact,
}

/// Market context shared by every submission of one run
struct RunContext {
    symbol: String,
    timeframe: String,
    period: String,
    requester_id: String,
    timeout_secs: u64,
}

enum Outcome {
    Baseline(Result<PerformanceResult, String>),
    Tested(StrategyTestResult),
}

impl Outcome {
    fn finished(candidate: Candidate, result: Result<PerformanceResult, String>, ms: u64) -> Self {
        let Candidate {
            index,
            params,
            artifact,
        } = candidate;

        match params.family() {
            None => Outcome::Baseline(result),
            Some(family) => Outcome::Tested(match result {
                Ok(perf) => StrategyTestResult::succeeded(family, params, artifact, perf, index, ms),
                Err(e) => StrategyTestResult::failed(family, params, artifact, e, index, ms),
            }),
        }
    }

    fn execution_time_ms(&self) -> u64 {
        match self {
            Outcome::Baseline(_) => 0,
            Outcome::Tested(r) => r.execution_time_ms,
        }
    }
}

fn build_candidates() -> EngineResult<Vec<Candidate>> {
    let candidates: Vec<Candidate> = generate_all()
        .into_iter()
        .enumerate()
        .map(|(index, params)| Candidate {
            index,
            artifact: render(&params),
            params,
        })
        .collect();

    if candidates.is_empty() {
        return Err(EngineError::EmptyCandidateSet);
    }
    if !candidates.iter().any(|c| c.artifact.is_baseline()) {
        return Err(EngineError::InvalidConfig(
            "candidate set has no buy-and-hold baseline".to_string(),
        ));
    }
    Ok(candidates)
}

async fn run_candidate(
    gateway: Arc<dyn ExecutionGateway>,
    context: Arc<RunContext>,
    candidate: Candidate,
    progress: Arc<OptimizeProgress>,
) -> Outcome {
    if progress.is_cancelled() {
        progress.failed.fetch_add(1, Ordering::Relaxed);
        progress.completed.fetch_add(1, Ordering::Relaxed);
        return Outcome::finished(candidate, Err("cancelled".to_string()), 0);
    }

    let request = ExecutionRequest::new(
        &candidate.artifact,
        &context.symbol,
        &context.timeframe,
        &context.period,
        &context.requester_id,
        context.timeout_secs,
    );

    let started = Instant::now();
    let result = match tokio::time::timeout(
        Duration::from_secs(context.timeout_secs),
        gateway.execute(&request),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(context.timeout_secs)),
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let result = result
        .map_err(|e| e.to_string())
        .and_then(|perf| {
            if perf.success {
                Ok(perf)
            } else {
                Err(REPORTED_FAILURE.to_string())
            }
        })
        .map_err(|e| {
            progress.failed.fetch_add(1, Ordering::Relaxed);
            debug!(
                candidate = candidate.index,
                params = %candidate.params,
                fingerprint = %candidate.artifact.fingerprint(),
                error = %e,
                "Candidate execution failed"
            );
            e
        });
    progress.completed.fetch_add(1, Ordering::Relaxed);

    Outcome::finished(candidate, result, elapsed_ms)
}

// ============================================================================
// Engine
// ============================================================================

/// Searches the strategy space for a symbol and ranks the results
pub struct OptimizationEngine {
    gateway: Arc<dyn ExecutionGateway>,
    advisor: Option<Arc<dyn DeploymentAdvisor>>,
    config: EngineConfig,
}

impl OptimizationEngine {
    pub fn new(gateway: Arc<dyn ExecutionGateway>, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            gateway,
            advisor: None,
            config,
        })
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn DeploymentAdvisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a full optimization. `period` falls back to the configured default.
    pub async fn optimize(
        &self,
        symbol: &str,
        timeframe: &str,
        period: Option<&str>,
        requester_id: &str,
    ) -> EngineResult<OptimizationResult> {
        self.optimize_with_progress(
            symbol,
            timeframe,
            period,
            requester_id,
            Arc::new(OptimizeProgress::new()),
        )
        .await
    }

    /// Same as [`OptimizationEngine::optimize`], reporting into `progress`.
    ///
    /// Cancelling `progress` stops unstarted candidates; they are recorded as
    /// failed tests and the run still returns a result.
    pub async fn optimize_with_progress(
        &self,
        symbol: &str,
        timeframe: &str,
        period: Option<&str>,
        requester_id: &str,
        progress: Arc<OptimizeProgress>,
    ) -> EngineResult<OptimizationResult> {
        let run_started = Instant::now();
        let period = period
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.config.default_period.as_str())
            .to_string();

        let candidates = build_candidates()?;
        let total = candidates.len();
        progress.begin(total as u32);

        info!(
            symbol = %symbol,
            timeframe = %timeframe,
            period = %period,
            combinations = total,
            workers = self.config.worker_pool_size,
            "Starting strategy optimization"
        );

        let context = Arc::new(RunContext {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            period: period.clone(),
            requester_id: requester_id.to_string(),
            timeout_secs: self.config.execution_timeout_secs,
        });

        let gateway = Arc::clone(&self.gateway);
        let shared_progress = Arc::clone(&progress);
        let outcomes: Vec<Outcome> = stream::iter(candidates)
            .map(move |candidate| {
                let gateway = Arc::clone(&gateway);
                let context = Arc::clone(&context);
                let progress = Arc::clone(&shared_progress);
                async move {
                    let fallback = Candidate {
                        index: candidate.index,
                        params: candidate.params.clone(),
                        artifact: candidate.artifact.clone(),
                    };
                    match tokio::spawn(run_candidate(gateway, context, candidate, progress)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(candidate = fallback.index, error = %e, "Candidate task aborted");
                            Outcome::finished(fallback, Err(format!("task aborted: {e}")), 0)
                        }
                    }
                }
            })
            .buffer_unordered(self.config.worker_pool_size)
            .collect()
            .await;

        let execution_ms: u64 = outcomes.iter().map(Outcome::execution_time_ms).sum();

        let mut baseline: Option<Result<PerformanceResult, String>> = None;
        let mut tested: Vec<StrategyTestResult> = Vec::with_capacity(total);
        for outcome in outcomes {
            match outcome {
                Outcome::Baseline(result) => baseline = Some(result),
                Outcome::Tested(result) => tested.push(result),
            }
        }

        let buy_and_hold_return = match baseline {
            Some(Ok(perf)) => perf.total_return,
            Some(Err(e)) => {
                warn!(symbol = %symbol, error = %e, "Buy-and-hold baseline failed, using 0% return");
                0.0
            }
            None => {
                warn!(symbol = %symbol, "Buy-and-hold baseline missing, using 0% return");
                0.0
            }
        };

        let failed_tests = tested.iter().filter(|r| !r.is_success()).count();
        let (top_strategies, successful_tests) =
            rank(tested, self.config.min_trades, self.config.top_n);
        let best_strategy = top_strategies.first().cloned();
        let outperformance = best_strategy
            .as_ref()
            .map(|best| best.total_return() - buy_and_hold_return);
        let market_regime = classify_regime(&top_strategies, self.config.regime_window);
        let days_analyzed = days_from_period(&period);

        let deployment_insights = match (&self.advisor, &best_strategy) {
            (Some(advisor), Some(best)) => match advisor.calculate(best, days_analyzed).await {
                Ok(insights) => Some(insights),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Deployment advisor failed");
                    None
                }
            },
            _ => None,
        };

        let cancelled = progress.is_cancelled();
        progress.set_status(if cancelled {
            OptimizeStatus::Cancelled
        } else {
            OptimizeStatus::Complete
        });

        let result = OptimizationResult {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            period,
            days_analyzed,
            best_strategy,
            top_strategies,
            buy_and_hold_return,
            outperformance,
            market_regime,
            total_combinations_tested: total,
            successful_tests,
            failed_tests,
            deployment_insights,
            total_execution_time_ms: run_started.elapsed().as_millis() as u64,
            avg_execution_time_per_strategy_ms: execution_ms as f64 / total as f64,
            completed_at: chrono::Utc::now(),
        };

        match &result.best_strategy {
            Some(best) => info!(
                symbol = %symbol,
                best = %best.family,
                total_return = best.total_return(),
                buy_and_hold = buy_and_hold_return,
                successful = result.successful_tests,
                failed = result.failed_tests,
                regime = %result.market_regime,
                cancelled,
                "Optimization complete"
            ),
            None => warn!(
                symbol = %symbol,
                failed = result.failed_tests,
                cancelled,
                "Optimization found no eligible strategy"
            ),
        }

        Ok(result)
    }
}

// ============================================================================
// Ranking & classification
// ============================================================================

/// Keep successful results with enough trades, best first.
///
/// Returns the top `top_n` and the number of eligible results.
pub fn rank(
    results: Vec<StrategyTestResult>,
    min_trades: u32,
    top_n: usize,
) -> (Vec<StrategyTestResult>, usize) {
    let mut ranked: Vec<StrategyTestResult> = results
        .into_iter()
        .filter(|r| r.is_success() && r.performance.total_trades >= min_trades)
        .collect();
    ranked.sort_by(StrategyTestResult::rank_cmp);

    let eligible = ranked.len();
    ranked.truncate(top_n);
    (ranked, eligible)
}

/// Label the market by which style dominates the top `window` strategies.
///
/// A style wins on strict majority of the strategies considered.
pub fn classify_regime(top: &[StrategyTestResult], window: usize) -> MarketRegime {
    let considered = &top[..top.len().min(window)];
    if considered.is_empty() {
        return MarketRegime::Unknown;
    }

    let count = |style: FamilyStyle| {
        considered
            .iter()
            .filter(|r| r.family.style() == style)
            .count()
    };
    let n = considered.len();

    if 2 * count(FamilyStyle::TrendFollowing) > n {
        MarketRegime::Trending
    } else if 2 * count(FamilyStyle::MeanReversion) > n {
        MarketRegime::Sideways
    } else if 2 * count(FamilyStyle::Breakout) > n {
        MarketRegime::Volatile
    } else {
        MarketRegime::Mixed
    }
}

/// Convert a period like "3y", "6mo" or "6m" into days.
pub fn days_from_period(period: &str) -> u32 {
    let period = period.trim().to_ascii_lowercase();
    let (digits, unit): (String, String) = period.chars().partition(|c| c.is_ascii_digit());

    let n: u32 = match digits.parse() {
        Ok(n) if n > 0 && period.starts_with(|c: char| c.is_ascii_digit()) => n,
        _ => return DEFAULT_DAYS,
    };

    match unit.as_str() {
        "y" => n.saturating_mul(365),
        "mo" | "m" => n.saturating_mul(30),
        _ => DEFAULT_DAYS,
    }
}
