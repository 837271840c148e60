//! Strategy Lab — command-line driver for the strategy engine
//!
//! Usage:
//!   strategy-lab optimize --symbol AAPL --simulate          — Search all families
//!   strategy-lab synthesize --insights aapl.json            — Build from insights

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use strategy_engine::{
    optimization_explanation, EngineConfig, ExecutionGateway, HttpExecutionGateway,
    InsightDrivenSynthesizer, InsightsError, InsightsProvider, KellyDeploymentAdvisor,
    OptimizationEngine, OptimizeProgress, SimulatedGateway, SymbolInsights, SynthesisRequest,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "strategy-lab")]
#[command(about = "Search and synthesize trading strategies that beat buy-and-hold", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest every strategy family and rank the results
    Optimize {
        /// Symbol to optimize for
        #[arg(long)]
        symbol: String,
        /// Bar timeframe
        #[arg(long, default_value = "1D")]
        timeframe: String,
        /// Backtest period, e.g. 3y or 6mo (defaults to the configured period)
        #[arg(long)]
        period: Option<String>,
        /// Execution service base URL (falls back to STRATEGY_LAB_GATEWAY_URL)
        #[arg(long, conflicts_with = "simulate")]
        gateway_url: Option<String>,
        /// Use the offline simulated gateway
        #[arg(long)]
        simulate: bool,
        /// Failure ratio for the simulated gateway (0.0 - 1.0)
        #[arg(long, default_value_t = 0.0)]
        failure_ratio: f64,
        /// Per-call latency for the simulated gateway, in milliseconds
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,
        /// Override the worker pool size
        #[arg(long)]
        workers: Option<usize>,
        /// Override the number of ranked strategies kept
        #[arg(long)]
        top_n: Option<usize>,
        /// Requester id forwarded to the execution service
        #[arg(long, default_value = "cli")]
        requester: String,
        /// Insights JSON used to build a swing fallback when nothing qualifies
        #[arg(long)]
        insights: Option<PathBuf>,
        /// Optional JSON export path
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Build one strategy directly from precomputed insights
    Synthesize {
        /// Insights JSON file
        #[arg(long)]
        insights: PathBuf,
        /// Override the symbol carried by the insights
        #[arg(long)]
        symbol: Option<String>,
        /// Override the timeframe carried by the insights
        #[arg(long)]
        timeframe: Option<String>,
        /// Write the generated strategy code to this file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Optional JSON export path
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,strategy_engine=debug,strategy_lab=debug")
    } else {
        EnvFilter::new("info,strategy_engine=info,strategy_lab=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Optimize {
            symbol,
            timeframe,
            period,
            gateway_url,
            simulate,
            failure_ratio,
            latency_ms,
            workers,
            top_n,
            requester,
            insights,
            export,
        } => {
            let mut config = EngineConfig::from_env()?;
            if let Some(workers) = workers {
                config.worker_pool_size = workers;
            }
            if let Some(top_n) = top_n {
                config.top_n = top_n;
            }

            let gateway: Arc<dyn ExecutionGateway> = if simulate {
                Arc::new(
                    SimulatedGateway::new()
                        .with_failure_ratio(failure_ratio)
                        .with_latency(Duration::from_millis(latency_ms)),
                )
            } else {
                let url = gateway_url
                    .or_else(|| std::env::var("STRATEGY_LAB_GATEWAY_URL").ok())
                    .context("no execution service: pass --gateway-url, set STRATEGY_LAB_GATEWAY_URL or use --simulate")?;
                Arc::new(HttpExecutionGateway::new(url))
            };

            cmd_optimize(
                config, gateway, symbol, timeframe, period, requester, insights, export,
            )
            .await?;
        }
        Commands::Synthesize {
            insights,
            symbol,
            timeframe,
            output,
            export,
        } => {
            cmd_synthesize(insights, symbol, timeframe, output, export).await?;
        }
    }

    Ok(())
}

// ============================================================================
// Optimize command
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn cmd_optimize(
    config: EngineConfig,
    gateway: Arc<dyn ExecutionGateway>,
    symbol: String,
    timeframe: String,
    period: Option<String>,
    requester: String,
    insights: Option<PathBuf>,
    export: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("\n=== Strategy Lab v{} ===", env!("CARGO_PKG_VERSION"));
    println!(
        "Symbol: {} | Timeframe: {} | Period: {} | Workers: {}",
        symbol,
        timeframe,
        period.as_deref().unwrap_or(config.default_period.as_str()),
        config.worker_pool_size
    );
    println!("Press Ctrl+C to stop\n");

    let engine = Arc::new(
        OptimizationEngine::new(gateway, config)?.with_advisor(Arc::new(KellyDeploymentAdvisor)),
    );
    let progress = Arc::new(OptimizeProgress::new());

    let progress_for_ctrlc = progress.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl+C received, requesting cancel...");
        progress_for_ctrlc.cancel();
    });

    let run = {
        let engine = engine.clone();
        let progress = progress.clone();
        let symbol = symbol.clone();
        tokio::spawn(async move {
            engine
                .optimize_with_progress(&symbol, &timeframe, period.as_deref(), &requester, progress)
                .await
        })
    };

    // Progress display loop
    while !run.is_finished() {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let completed = progress.completed.load(Ordering::Relaxed);
        let total = progress.total_combinations.load(Ordering::Relaxed);
        let failed = progress.failed.load(Ordering::Relaxed);
        let pct = progress.progress_pct();

        let bar_len = 30;
        let filled = (pct as usize * bar_len) / 100;
        let bar: String = "=".repeat(filled) + &" ".repeat(bar_len - filled);
        eprint!(
            "\r  [{}] {:.0}% ({}/{}, {} failed)   ",
            bar, pct, completed, total, failed
        );
    }
    eprintln!();

    let result = run.await.context("optimization task panicked")??;

    println!("\n{}\n", optimization_explanation(&result));
    if let Some(advice) = &result.deployment_insights {
        println!(
            "Deployment: {} | allocation {}% | drawdown risk {:?} | ~{} trades/year",
            advice.deployment_mode,
            advice.recommended_allocation_pct,
            advice.drawdown_risk_level,
            advice.estimated_trades_per_year
        );
        println!("  {}", advice.deployment_mode_rationale);
    }
    println!(
        "\n{} ({} ms total, {:.1} ms avg per strategy)",
        result.summary(),
        result.total_execution_time_ms,
        result.avg_execution_time_per_strategy_ms
    );

    if result.best_strategy.is_none() {
        if let Some(path) = insights {
            let insights = JsonFileInsights::new(path).load().await?;
            let fallback = InsightDrivenSynthesizer::new().fallback_swing(&insights);
            warn!(params = %fallback.params, "No eligible strategy, using swing fallback");
            println!("\n{}\n\n{}", fallback.explanation, fallback.artifact.code());
        }
    }

    if let Some(path) = export {
        let json = serde_json::to_string_pretty(&result)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Results exported to {}", path.display());
    }

    Ok(())
}

// ============================================================================
// Synthesize command
// ============================================================================

async fn cmd_synthesize(
    insights: PathBuf,
    symbol: Option<String>,
    timeframe: Option<String>,
    output: Option<PathBuf>,
    export: Option<PathBuf>,
) -> anyhow::Result<()> {
    let provider = JsonFileInsights::new(insights);
    let request = SynthesisRequest {
        symbol: symbol.clone(),
        timeframe: timeframe.clone(),
        ..SynthesisRequest::default()
    };

    let synthesized = InsightDrivenSynthesizer::new()
        .synthesize_from_provider(
            &provider,
            symbol.as_deref().unwrap_or_default(),
            timeframe.as_deref().unwrap_or_default(),
            &request,
        )
        .await?;

    println!("\n{}\n", synthesized.summary_card);
    println!("{}\n", synthesized.explanation);

    match output {
        Some(path) => {
            tokio::fs::write(&path, synthesized.artifact.code())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Strategy code written to {}", path.display());
        }
        None => println!("{}", synthesized.artifact.code()),
    }

    if let Some(path) = export {
        let json = serde_json::to_string_pretty(&synthesized)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Synthesis exported to {}", path.display());
    }

    Ok(())
}

// ============================================================================
// File-backed insights provider
// ============================================================================

/// Reads precomputed insights from a JSON file
struct JsonFileInsights {
    path: PathBuf,
}

impl JsonFileInsights {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> Result<SymbolInsights, InsightsError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| InsightsError::Malformed(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| InsightsError::Malformed(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl InsightsProvider for JsonFileInsights {
    async fn get_insights(
        &self,
        symbol: &str,
        timeframe: &str,
        _lookback_days: u32,
    ) -> Result<SymbolInsights, InsightsError> {
        let insights = self.load().await?;
        let mismatched = !symbol.is_empty()
            && !insights.symbol.is_empty()
            && !insights.symbol.eq_ignore_ascii_case(symbol);
        if mismatched {
            return Err(InsightsError::Unavailable {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                reason: format!("file holds insights for {}", insights.symbol),
            });
        }
        Ok(insights)
    }
}
