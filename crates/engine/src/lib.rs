//! Strategy Engine — parameter search and insight-driven strategy synthesis
//!
//! Provides:
//! - Parameter grids for nine strategy families plus a buy-and-hold baseline
//! - Deterministic Python code generation for each combination
//! - Concurrent optimizer ranking backtests against buy-and-hold
//! - Single-shot synthesis from precomputed market insights
//! - Kelly-based deployment advice for the winning strategy

pub mod advisor;
pub mod config;
pub mod error;
pub mod gateway;
pub mod insights;
pub mod optimizer;
pub mod params;
pub mod report;
pub mod synthesizer;
pub mod templates;
pub mod types;

// Re-exports for convenience
pub use advisor::{
    AdvisorError, DeploymentAdvisor, DeploymentInsights, DeploymentMode, DrawdownRiskLevel,
    KellyDeploymentAdvisor,
};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use gateway::{
    ExecutionGateway, ExecutionRequest, GatewayError, HttpExecutionGateway, SimulatedGateway,
};
pub use insights::{InsightsError, InsightsProvider, SymbolInsights, TurningPoint, TurningPointType};
pub use optimizer::{
    classify_regime, days_from_period, OptimizationEngine, OptimizeProgress, OptimizeStatus,
};
pub use params::{generate, generate_all, FamilyStyle, ParamValue, StrategyFamily, StrategyParams};
pub use report::optimization_explanation;
pub use synthesizer::{
    InsightDrivenSynthesizer, SwingFallback, SynthesisRegime, SynthesisRequest,
    SynthesizedStrategy,
};
pub use templates::render;
pub use types::*;
