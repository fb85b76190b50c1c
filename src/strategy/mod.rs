//! Signal strategy.
//!
//! Pure, I/O-free pieces driven by the engine:
//! trend analysis → ranking → signal state machine.

pub mod ranker;
pub mod signal;
pub mod trend;

use crate::engine::history::HistoryBuffer;
use crate::types::{PatternSet, RankedTrend, TrendTable};

/// Analyse a history and rank it in one step.
pub fn analyze_and_rank(
    history: &HistoryBuffer,
    pattern: &PatternSet,
    config: &trend::TrendConfig,
) -> (TrendTable, Vec<RankedTrend>) {
    let table = trend::analyze(history, pattern, config.lookback);
    let top = ranker::top_trends(&table, config.min_occurrences, config.top_n);
    (table, top)
}
