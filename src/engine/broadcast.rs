//! Periodic Top Trends broadcast policy.
//!
//! Optional and independent of the signal state machine. When enabled,
//! the first analysed cycle of the day broadcasts the ranked list, then
//! every `every` analysed cycles it is broadcast again only if a ranked
//! outcome or its score changed since the last broadcast.

use rust_decimal::Decimal;

use crate::types::{Outcome, RankedTrend};

#[derive(Debug, Clone, Default)]
pub struct TrendBroadcast {
    every: Option<u64>,
    initial_sent: bool,
    cycles: u64,
    last_scores: Vec<(Outcome, Decimal)>,
}

impl TrendBroadcast {
    /// `every = None` (or zero) disables broadcasting entirely.
    pub fn new(every: Option<u64>) -> Self {
        Self {
            every: every.filter(|n| *n > 0),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.every.is_some()
    }

    /// Record one analysed cycle; returns true when `top` should be sent.
    pub fn evaluate(&mut self, top: &[RankedTrend]) -> bool {
        let Some(every) = self.every else {
            return false;
        };
        self.cycles += 1;

        if top.is_empty() {
            return false;
        }

        let scores: Vec<(Outcome, Decimal)> = top.iter().map(|t| (t.outcome, t.score)).collect();

        if !self.initial_sent {
            self.initial_sent = true;
            self.last_scores = scores;
            return true;
        }

        if self.cycles % every == 0 && scores != self.last_scores {
            self.last_scores = scores;
            return true;
        }
        false
    }

    /// Start over, as on a new day.
    pub fn reset(&mut self) {
        *self = Self::new(self.every);
    }
}
