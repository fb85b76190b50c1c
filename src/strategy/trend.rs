//! Trend analyzer.
//!
//! Scores every outcome by how often it was preceded, within a short
//! lookback window, by a member of the pattern set. Recomputed from
//! scratch on each pass; the history is small and bounded.

use rust_decimal::Decimal;

use crate::engine::history::HistoryBuffer;
use crate::types::{PatternSet, TrendStat, TrendTable, OUTCOME_COUNT};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for analysis and ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendConfig {
    /// Preceding outcomes examined for each occurrence.
    pub lookback: usize,
    /// Minimum `total` for an outcome to be ranked.
    pub min_occurrences: u32,
    /// Length of the Top Trends list.
    pub top_n: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            lookback: 3,
            min_occurrences: 5,
            top_n: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Compute per-outcome statistics over a newest-first history.
///
/// The buffer is stored newest-first, so the chronological predecessors of
/// the entry at index `j` are the entries at `j + 1 ..= j + lookback`.
/// Entries too old to have a full window are skipped.
pub fn analyze(history: &HistoryBuffer, pattern: &PatternSet, lookback: usize) -> TrendTable {
    let mut hits = [0u32; OUTCOME_COUNT];
    let mut totals = [0u32; OUTCOME_COUNT];

    let len = history.size();
    if lookback > 0 {
        for j in 0..len.saturating_sub(lookback) {
            let Some(current) = history.peek(j) else {
                break;
            };
            let preceded = (j + 1..=j + lookback)
                .filter_map(|k| history.peek(k))
                .any(|prev| pattern.contains(prev));
            if preceded {
                hits[current.index()] += 1;
            }
            totals[current.index()] += 1;
        }
    }

    let mut stats = [TrendStat::default(); OUTCOME_COUNT];
    for (i, stat) in stats.iter_mut().enumerate() {
        *stat = TrendStat {
            hits: hits[i],
            total: totals[i],
            score: score(hits[i], totals[i]),
        };
    }
    TrendTable::new(stats)
}

/// `hits / total * 100`, rounded to two places (banker's rounding).
pub fn score(hits: u32, total: u32) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(hits) * Decimal::ONE_HUNDRED / Decimal::from(total)).round_dp(2)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
