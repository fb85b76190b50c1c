//! Per-table session state.
//!
//! One `TableSession` per monitored table, owned by that table's polling
//! loop. History and state machine position survive day rollovers; only
//! the daily counters and the broadcast policy are reset.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::engine::broadcast::TrendBroadcast;
use crate::engine::history::HistoryBuffer;
use crate::strategy::analyze_and_rank;
use crate::strategy::signal::{
    SignalContext, SignalMachine, SignalState, SignalTally, Transition, CONFIRMATION_WINDOW,
};
use crate::strategy::trend::TrendConfig;
use crate::types::{Outcome, PatternSet, RankedTrend, TrendTable};

/// Counters of a finished day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub tally: SignalTally,
}

/// Mutable state of one table.
#[derive(Debug, Clone)]
pub struct TableSession {
    table: String,
    history: HistoryBuffer,
    machine: SignalMachine,
    trends: TrendTable,
    top_trends: Vec<RankedTrend>,
    broadcast: TrendBroadcast,
    day: NaiveDate,
    analysed_cycles: u64,
}

impl TableSession {
    pub fn new(
        table: impl Into<String>,
        history_capacity: usize,
        today: NaiveDate,
        broadcast_every: Option<u64>,
    ) -> Self {
        Self {
            table: table.into(),
            history: HistoryBuffer::new(history_capacity),
            machine: SignalMachine::new(),
            trends: TrendTable::default(),
            top_trends: Vec::new(),
            broadcast: TrendBroadcast::new(broadcast_every),
            day: today,
            analysed_cycles: 0,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn machine(&self) -> &SignalMachine {
        &self.machine
    }

    pub fn trends(&self) -> &TrendTable {
        &self.trends
    }

    pub fn top_trends(&self) -> &[RankedTrend] {
        &self.top_trends
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// Reset the daily counters when the calendar day changed.
    pub fn roll_day(&mut self, today: NaiveDate) -> Option<DaySummary> {
        if today == self.day {
            return None;
        }
        let summary = DaySummary {
            date: self.day,
            tally: self.machine.reset_tally(),
        };
        self.broadcast.reset();
        self.analysed_cycles = 0;
        self.day = today;

        info!(
            table = %self.table,
            date = %summary.date,
            entries = summary.tally.entries,
            wins = summary.tally.wins,
            losses = summary.tally.losses,
            win_rate = format!("{:.1}%", summary.tally.win_rate()),
            "Day closed, counters reset"
        );
        Some(summary)
    }

    /// Replace history with the feed's latest window.
    pub fn record_window(&mut self, outcomes: &[Outcome]) {
        self.history.record(outcomes);
    }

    /// Recompute statistics and the Top Trends snapshot from history.
    pub fn refresh_trends(&mut self, pattern: &PatternSet, config: &TrendConfig) -> &[RankedTrend] {
        let (trends, top) = analyze_and_rank(&self.history, pattern, config);
        self.trends = trends;
        self.top_trends = top;
        self.analysed_cycles += 1;
        &self.top_trends
    }

    /// Ask the broadcast policy whether the current Top Trends should go out.
    pub fn should_broadcast(&mut self) -> bool {
        self.broadcast.evaluate(&self.top_trends)
    }

    /// The newest outcome if it has not been processed yet.
    pub fn pending_outcome(&self) -> Option<Outcome> {
        self.history
            .peek(0)
            .filter(|latest| !self.machine.is_repeat(*latest))
    }

    /// Drive the state machine with the newest outcome in history.
    pub fn process_latest(&mut self, pattern: &PatternSet) -> Option<Transition> {
        let latest = self.history.peek(0)?;
        let recent = self.history.latest(CONFIRMATION_WINDOW);
        self.machine.observe(
            latest,
            SignalContext {
                pattern,
                top_trends: &self.top_trends,
                recent: &recent,
            },
        )
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let state = self.machine.state();
        TableSnapshot {
            table: self.table.clone(),
            state: state.label(),
            armed_outcome: state.armed_outcome(),
            retry: state.retry(),
            tally: self.machine.tally().clone(),
            top_trends: self.top_trends.clone(),
            history_len: self.history.size(),
            last_outcome: self.machine.last_processed(),
            day: Some(self.day),
            analysed_cycles: self.analysed_cycles,
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only view of a table published for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    pub table: String,
    pub state: &'static str,
    pub armed_outcome: Option<Outcome>,
    pub retry: u8,
    pub tally: SignalTally,
    pub top_trends: Vec<RankedTrend>,
    pub history_len: usize,
    pub last_outcome: Option<Outcome>,
    pub day: Option<NaiveDate>,
    pub analysed_cycles: u64,
    pub updated_at: DateTime<Utc>,
}

impl TableSnapshot {
    /// Placeholder before the first poll.
    pub fn pending(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            state: SignalState::Idle.label(),
            armed_outcome: None,
            retry: 0,
            tally: SignalTally::default(),
            top_trends: Vec::new(),
            history_len: 0,
            last_outcome: None,
            day: None,
            analysed_cycles: 0,
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn o(v: u8) -> Outcome {
        Outcome::new(v).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    /// Newest-first window where 9 follows a pattern member many times.
    fn window_favouring_nine(latest: u8) -> Vec<Outcome> {
        let mut chrono_seq = Vec::new();
        for _ in 0..20 {
            chrono_seq.extend([2u8, 9, 1]);
        }
        chrono_seq.push(latest);
        chrono_seq.into_iter().rev().map(o).collect()
    }

    #[test]
    fn test_roll_day_resets_counters_only() {
        let pattern = PatternSet::black_snake();
        let mut session = TableSession::new("t", 500, day(1), None);
        session.record_window(&window_favouring_nine(9));
        session.refresh_trends(&pattern, &TrendConfig::default());
        assert!(matches!(
            session.process_latest(&pattern),
            Some(Transition::Entry { .. })
        ));
        assert_eq!(session.machine().tally().entries, 1);

        assert!(session.roll_day(day(1)).is_none());

        let summary = session.roll_day(day(2)).unwrap();
        assert_eq!(summary.date, day(1));
        assert_eq!(summary.tally.entries, 1);
        assert_eq!(session.machine().tally(), &SignalTally::default());
        // history and position survive
        assert_eq!(session.history().size(), 61);
        assert_eq!(session.machine().state(), SignalState::Armed { entry: o(9) });
        assert_eq!(session.day(), day(2));
    }

    #[test]
    fn test_refresh_trends_ranks_nine_first() {
        let pattern = PatternSet::black_snake();
        let mut session = TableSession::new("t", 500, day(1), None);
        session.record_window(&window_favouring_nine(9));
        let top: Vec<u8> = session
            .refresh_trends(&pattern, &TrendConfig::default())
            .iter()
            .map(|t| t.outcome.value())
            .collect();
        // all three score 100%; 9 has one more occurrence, then value order
        assert_eq!(top, vec![9, 1, 2]);
        assert_eq!(session.trends().get(o(9)).total, 20);
        assert_eq!(session.trends().get(o(1)).total, 19);
    }

    #[test]
    fn test_pending_outcome_dedup() {
        let pattern = PatternSet::black_snake();
        let mut session = TableSession::new("t", 500, day(1), None);
        assert!(session.pending_outcome().is_none());

        session.record_window(&window_favouring_nine(0));
        assert_eq!(session.pending_outcome(), Some(o(0)));
        session.refresh_trends(&pattern, &TrendConfig::default());
        session.process_latest(&pattern);
        assert!(session.pending_outcome().is_none());
        assert!(session.process_latest(&pattern).is_none());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let pattern = PatternSet::black_snake();
        let mut session = TableSession::new("Mega", 500, day(1), None);
        session.record_window(&window_favouring_nine(9));
        session.refresh_trends(&pattern, &TrendConfig::default());
        session.process_latest(&pattern);

        let snap = session.snapshot();
        assert_eq!(snap.table, "Mega");
        assert_eq!(snap.state, "ARMED");
        assert_eq!(snap.armed_outcome, Some(o(9)));
        assert_eq!(snap.history_len, 61);
        assert_eq!(snap.last_outcome, Some(o(9)));
        assert_eq!(snap.analysed_cycles, 1);

        let pending = TableSnapshot::pending("x");
        assert_eq!(pending.state, "IDLE");
        assert!(pending.day.is_none());
    }
}
