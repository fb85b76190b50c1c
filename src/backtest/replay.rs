//! Historical replay.
//!
//! Feeds a chronological sequence of outcomes, one spin at a time, through
//! the same history buffer, analyzer, ranker, and state machine the live
//! monitors use, and reports how the signals would have resolved.

use serde::Serialize;

use crate::engine::history::{HistoryBuffer, DEFAULT_CAPACITY};
use crate::engine::monitor::DEFAULT_MIN_HISTORY;
use crate::strategy::analyze_and_rank;
use crate::strategy::signal::{
    SignalContext, SignalMachine, SignalState, SignalTally, Transition, CONFIRMATION_WINDOW,
};
use crate::strategy::trend::TrendConfig;
use crate::types::{Outcome, PatternSet};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of a replay run.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub spins: usize,
    /// Spins that had enough history to be analysed.
    pub analysed: usize,
    pub tally: SignalTally,
    pub win_rate: f64,
    /// Every transition with the index of the spin that caused it.
    pub transitions: Vec<(usize, Transition)>,
    pub final_state: SignalState,
}

/// Compact summary for printing.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub spins: usize,
    pub analysed: usize,
    pub entries: u64,
    pub wins: u64,
    pub wins_by_retry: [u64; 3],
    pub losses: u64,
    pub win_rate_pct: f64,
    pub final_state: &'static str,
}

impl ReplayReport {
    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            spins: self.spins,
            analysed: self.analysed,
            entries: self.tally.entries,
            wins: self.tally.wins,
            wins_by_retry: self.tally.wins_by_retry,
            losses: self.tally.losses,
            win_rate_pct: self.win_rate,
            final_state: self.final_state.label(),
        }
    }
}

// ---------------------------------------------------------------------------
// Replayer
// ---------------------------------------------------------------------------

pub struct Replayer {
    pattern: PatternSet,
    config: TrendConfig,
    history_capacity: usize,
    min_history: usize,
}

impl Replayer {
    pub fn new(
        pattern: PatternSet,
        config: TrendConfig,
        history_capacity: usize,
        min_history: usize,
    ) -> Self {
        Self {
            pattern,
            config,
            history_capacity,
            min_history,
        }
    }

    /// Run over `spins`, oldest first.
    ///
    /// A spin equal to the previous one is skipped, as the live feed cannot
    /// tell a repeated number from an unchanged window.
    pub fn run(&self, spins: &[Outcome]) -> ReplayReport {
        let mut history = HistoryBuffer::new(self.history_capacity);
        let mut machine = SignalMachine::new();
        let mut transitions = Vec::new();
        let mut analysed = 0usize;

        for (i, &spin) in spins.iter().enumerate() {
            history.push_newest(spin);
            if history.size() < self.min_history {
                continue;
            }
            analysed += 1;

            let (_, top) = analyze_and_rank(&history, &self.pattern, &self.config);
            let recent = history.latest(CONFIRMATION_WINDOW);
            let ctx = SignalContext {
                pattern: &self.pattern,
                top_trends: &top,
                recent: &recent,
            };
            if let Some(t) = machine.observe(spin, ctx) {
                transitions.push((i, t));
            }
        }

        let tally = machine.tally().clone();
        ReplayReport {
            spins: spins.len(),
            analysed,
            win_rate: tally.win_rate(),
            tally,
            transitions,
            final_state: machine.state(),
        }
    }
}

impl Default for Replayer {
    fn default() -> Self {
        Self::new(
            PatternSet::black_snake(),
            TrendConfig::default(),
            DEFAULT_CAPACITY,
            DEFAULT_MIN_HISTORY,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
