//! Trend ranker.
//!
//! Picks the Top Trends shortlist out of a full statistics table.

use crate::types::{RankedTrend, TrendTable};

/// Select up to `top_n` outcomes with `total >= min_occurrences`, ordered by
/// score descending, then total descending, then outcome value ascending.
pub fn top_trends(table: &TrendTable, min_occurrences: u32, top_n: usize) -> Vec<RankedTrend> {
    let mut ranked: Vec<RankedTrend> = table
        .iter()
        .filter(|(_, stat)| stat.total >= min_occurrences)
        .map(|(outcome, stat)| RankedTrend {
            outcome,
            hits: stat.hits,
            total: stat.total,
            score: stat.score,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| a.outcome.cmp(&b.outcome))
    });
    ranked.truncate(top_n);
    ranked
}
