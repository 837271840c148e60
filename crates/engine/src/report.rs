//! Human-readable optimization reports

use std::fmt::Write;

use crate::types::OptimizationResult;

/// Alternatives listed after the best strategy
const MAX_ALTERNATIVES: usize = 2;

/// Markdown explanation of an optimization run.
pub fn optimization_explanation(result: &OptimizationResult) -> String {
    let mut out = String::with_capacity(1024);

    let _ = writeln!(
        out,
        "Tested {} strategy combinations over {} days ({:.1} years) of {} {} data.\n",
        result.total_combinations_tested,
        result.days_analyzed,
        f64::from(result.days_analyzed) / 365.25,
        result.symbol,
        result.timeframe
    );

    let best = match &result.best_strategy {
        Some(best) => best,
        None => {
            let _ = write!(
                out,
                "No strategy qualified: {} of {} candidates failed to execute and none of the \
                 rest traded often enough to rank. Buy & hold returned {:.2}%.",
                result.failed_tests,
                result.total_combinations_tested,
                result.buy_and_hold_return
            );
            return out;
        }
    };

    let perf = &best.performance;
    let _ = writeln!(out, "**Best Strategy: {}**", best.family);
    let _ = writeln!(out, "- Parameters: {}", best.params);
    let _ = writeln!(out, "- Total Return: **{:.2}%**", perf.total_return);
    let _ = writeln!(out, "- Buy & Hold Return: {:.2}%", result.buy_and_hold_return);
    if let Some(outperformance) = result.outperformance {
        let _ = writeln!(out, "- **Outperformance: {outperformance:+.2}%**");
    }
    let _ = writeln!(out, "- Win Rate: {:.1}%", perf.win_rate * 100.0);
    let _ = writeln!(out, "- Sharpe Ratio: {:.2}", perf.sharpe_ratio);
    let _ = writeln!(out, "- Max Drawdown: {:.1}%", perf.max_drawdown);
    let _ = writeln!(out, "- Total Trades: {}\n", perf.total_trades);

    let _ = writeln!(out, "Market Regime: **{}**\n", result.market_regime);
    out.push_str(
        "Strategies are ranked by total return rather than win rate, so the winner is the \
         combination that made the most money over the period.",
    );

    let alternatives: Vec<_> = result
        .top_strategies
        .iter()
        .skip(1)
        .take(MAX_ALTERNATIVES)
        .collect();
    if !alternatives.is_empty() {
        out.push_str("\n\n**Alternative Strategies:**\n");
        for (i, alt) in alternatives.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} ({:.2}% return)",
                i + 2,
                alt.family,
                alt.total_return()
            );
        }
    }

    out
}
