//! Signal state machine.
//!
//! Per-table betting signal: an entry is declared when a Top Trends
//! outcome appears, then the next outcomes either hit the pattern (win)
//! or consume one of two retries ("gales") before resolving as a loss.
//!
//! The machine is a pure transition function plus counters; it never
//! performs I/O. Callers turn the returned [`Transition`] into
//! notifications.

use serde::Serialize;

use crate::types::{Outcome, PatternSet, RankedTrend, TrendStat};

/// Highest retry level before a miss resolves as a loss.
pub const MAX_RETRY: u8 = 2;

/// Number of recent outcomes quoted when a signal resolves.
pub const CONFIRMATION_WINDOW: usize = 3;

// ---------------------------------------------------------------------------
// States and transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SignalState {
    #[default]
    Idle,
    /// Entry signalled on `entry`; the next outcome is the first attempt.
    Armed { entry: Outcome },
    Retry1 { entry: Outcome },
    Retry2 { entry: Outcome },
}

impl SignalState {
    pub fn is_active(&self) -> bool {
        !matches!(self, SignalState::Idle)
    }

    /// Current retry level (0 while idle or armed).
    pub fn retry(&self) -> u8 {
        match self {
            SignalState::Idle | SignalState::Armed { .. } => 0,
            SignalState::Retry1 { .. } => 1,
            SignalState::Retry2 { .. } => 2,
        }
    }

    pub fn armed_outcome(&self) -> Option<Outcome> {
        match *self {
            SignalState::Idle => None,
            SignalState::Armed { entry }
            | SignalState::Retry1 { entry }
            | SignalState::Retry2 { entry } => Some(entry),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalState::Idle => "IDLE",
            SignalState::Armed { .. } => "ARMED",
            SignalState::Retry1 { .. } => "RETRY_1",
            SignalState::Retry2 { .. } => "RETRY_2",
        }
    }
}

/// The effect of processing one new outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// IDLE -> ARMED on a Top Trends outcome.
    Entry { outcome: Outcome, stat: TrendStat },
    /// A miss that moved to the next retry level (1 or 2).
    Retry { level: u8, outcome: Outcome, entry: Outcome },
    /// Pattern hit while active, at the retry level it happened on.
    Win {
        level: u8,
        outcome: Outcome,
        entry: Outcome,
        recent: Vec<Outcome>,
    },
    /// Miss at the last retry level.
    Loss {
        outcome: Outcome,
        entry: Outcome,
        recent: Vec<Outcome>,
    },
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Cumulative per-day counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalTally {
    pub entries: u64,
    pub wins: u64,
    /// Wins split by the retry level they landed on.
    pub wins_by_retry: [u64; 3],
    pub losses: u64,
    /// Resolved signals (wins + losses).
    pub resolved: u64,
    pub win_streak: u64,
    pub best_win_streak: u64,
}

impl SignalTally {
    /// Win rate over resolved signals, in percent.
    pub fn win_rate(&self) -> f64 {
        if self.resolved == 0 {
            0.0
        } else {
            self.wins as f64 / self.resolved as f64 * 100.0
        }
    }

    fn record_win(&mut self, level: u8) {
        self.wins += 1;
        self.wins_by_retry[level.min(MAX_RETRY) as usize] += 1;
        self.resolved += 1;
        self.win_streak += 1;
        self.best_win_streak = self.best_win_streak.max(self.win_streak);
    }

    fn record_loss(&mut self) {
        self.losses += 1;
        self.resolved += 1;
        self.win_streak = 0;
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Everything the machine needs to know about the table besides the outcome.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub pattern: &'a PatternSet,
    pub top_trends: &'a [RankedTrend],
    /// Most recent outcomes, newest first (the processed outcome included).
    pub recent: &'a [Outcome],
}

#[derive(Debug, Clone, Default)]
pub struct SignalMachine {
    state: SignalState,
    tally: SignalTally,
    last_processed: Option<Outcome>,
}

impl SignalMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    pub fn tally(&self) -> &SignalTally {
        &self.tally
    }

    pub fn last_processed(&self) -> Option<Outcome> {
        self.last_processed
    }

    /// Clear the daily counters. State and dedup marker are untouched.
    pub fn reset_tally(&mut self) -> SignalTally {
        std::mem::take(&mut self.tally)
    }

    /// Whether `outcome` is the same latest outcome seen last time.
    pub fn is_repeat(&self, outcome: Outcome) -> bool {
        self.last_processed == Some(outcome)
    }

    /// Process the newest outcome. Returns `None` for unchanged repeats and
    /// for idle outcomes outside the Top Trends list.
    pub fn observe(&mut self, outcome: Outcome, ctx: SignalContext<'_>) -> Option<Transition> {
        if self.is_repeat(outcome) {
            return None;
        }
        self.last_processed = Some(outcome);
        self.step(outcome, ctx)
    }

    fn step(&mut self, outcome: Outcome, ctx: SignalContext<'_>) -> Option<Transition> {
        let Some(entry) = self.state.armed_outcome() else {
            let trend = ctx.top_trends.iter().find(|t| t.outcome == outcome)?;
            self.state = SignalState::Armed { entry: outcome };
            self.tally.entries += 1;
            return Some(Transition::Entry {
                outcome,
                stat: trend.stat(),
            });
        };

        let level = self.state.retry();
        let recent = || -> Vec<Outcome> {
            ctx.recent.iter().take(CONFIRMATION_WINDOW).copied().collect()
        };

        if ctx.pattern.contains(outcome) {
            self.tally.record_win(level);
            self.state = SignalState::Idle;
            return Some(Transition::Win {
                level,
                outcome,
                entry,
                recent: recent(),
            });
        }

        match self.state {
            SignalState::Armed { .. } => {
                self.state = SignalState::Retry1 { entry };
                Some(Transition::Retry { level: 1, outcome, entry })
            }
            SignalState::Retry1 { .. } => {
                self.state = SignalState::Retry2 { entry };
                Some(Transition::Retry { level: 2, outcome, entry })
            }
            _ => {
                self.tally.record_loss();
                self.state = SignalState::Idle;
                Some(Transition::Loss {
                    outcome,
                    entry,
                    recent: recent(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
