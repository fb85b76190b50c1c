//! Per-table polling loop.
//!
//! Each cycle: roll the day if needed, fetch the table's latest window,
//! replace history, and once enough history exists re-rank trends and
//! drive the signal state machine with the newest unseen outcome.
//! Notifications for a cycle are fully dispatched before it returns, so
//! no two state machine evaluations of the same table ever overlap.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::alerts::{Notification, Notifier};
use crate::engine::clock::Clock;
use crate::engine::history::DEFAULT_CAPACITY;
use crate::engine::session::{TableSession, TableSnapshot};
use crate::feed::{FeedClient, FeedError, FetchOutcome};
use crate::strategy::signal::Transition;
use crate::strategy::trend::TrendConfig;
use crate::types::{Outcome, PatternSet, RankedTrend};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Minimum history length before analysis runs.
pub const DEFAULT_MIN_HISTORY: usize = 50;

/// Cadence and thresholds of one polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Sleep after a normal cycle.
    pub poll_interval: Duration,
    /// Sleep after the feed returned nothing.
    pub empty_backoff: Duration,
    /// Sleep after a failed cycle.
    pub error_backoff: Duration,
    pub min_history: usize,
    pub history_capacity: usize,
    /// Analysed cycles between trend broadcasts; `None` disables them.
    pub trend_broadcast_cycles: Option<u64>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            empty_backoff: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
            min_history: DEFAULT_MIN_HISTORY,
            history_capacity: DEFAULT_CAPACITY,
            trend_broadcast_cycles: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle result
// ---------------------------------------------------------------------------

/// What a single polling cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Feed had no data for the table.
    Empty,
    /// Not enough history yet; analysis skipped.
    Warming { history_len: usize },
    /// Latest outcome already processed.
    Unchanged { outcome: Outcome },
    /// A new latest outcome went through the state machine.
    Processed {
        outcome: Outcome,
        transition: Option<Transition>,
    },
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// The polling loop of one table. Owns that table's session exclusively.
pub struct TableMonitor {
    table: String,
    feed: Arc<dyn FeedClient>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    pattern: PatternSet,
    trend_config: TrendConfig,
    settings: MonitorSettings,
    session: Option<TableSession>,
    snapshots: watch::Sender<TableSnapshot>,
}

impl TableMonitor {
    pub fn new(
        table: impl Into<String>,
        feed: Arc<dyn FeedClient>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        pattern: PatternSet,
        trend_config: TrendConfig,
        settings: MonitorSettings,
    ) -> Self {
        let table = table.into();
        let (snapshots, _) = watch::channel(TableSnapshot::pending(table.clone()));
        Self {
            table,
            feed,
            notifier,
            clock,
            pattern,
            trend_config,
            settings,
            session: None,
            snapshots,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Session state, once the table has been polled.
    pub fn session(&self) -> Option<&TableSession> {
        self.session.as_ref()
    }

    /// Receiver of the snapshot published after every cycle.
    pub fn subscribe(&self) -> watch::Receiver<TableSnapshot> {
        self.snapshots.subscribe()
    }

    /// Sleep to apply after a cycle with this result.
    pub fn backoff_for(&self, result: &Result<CycleOutcome, FeedError>) -> Duration {
        match result {
            Ok(CycleOutcome::Empty) => self.settings.empty_backoff,
            Ok(_) => self.settings.poll_interval,
            Err(_) => self.settings.error_backoff,
        }
    }

    /// Run one fetch → analyse → transition → notify cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, FeedError> {
        let today = self.clock.today();
        ensure_session(&mut self.session, &self.table, &self.settings, today).roll_day(today);

        let window = match self.feed.fetch(&self.table).await? {
            FetchOutcome::Outcomes(window) => window,
            FetchOutcome::Empty => {
                debug!(table = %self.table, "Feed empty, retrying shortly");
                return Ok(CycleOutcome::Empty);
            }
        };

        let session = ensure_session(&mut self.session, &self.table, &self.settings, today);
        session.record_window(&window);

        let mut outbox = Vec::new();
        let history_len = session.history().size();
        let result = match session.history().peek(0) {
            None => CycleOutcome::Empty,
            Some(_) if history_len < self.settings.min_history => {
                debug!(
                    table = %self.table,
                    history_len,
                    min_history = self.settings.min_history,
                    "Not enough history, skipping analysis"
                );
                CycleOutcome::Warming { history_len }
            }
            Some(latest) => {
                session.refresh_trends(&self.pattern, &self.trend_config);
                if session.should_broadcast() {
                    outbox.push(Notification::TrendUpdate {
                        pattern: self.pattern.name().to_string(),
                        trends: session.top_trends().to_vec(),
                        history_len,
                    });
                }

                if session.pending_outcome().is_none() {
                    CycleOutcome::Unchanged { outcome: latest }
                } else {
                    let transition = session.process_latest(&self.pattern);
                    if let Some(t) = &transition {
                        log_transition(&self.table, t, session);
                        outbox.push(Notification::from_transition(t, &self.pattern));
                    }
                    CycleOutcome::Processed {
                        outcome: latest,
                        transition,
                    }
                }
            }
        };

        self.snapshots.send_replace(session.snapshot());

        for notification in &outbox {
            self.notifier.notify(&self.table, notification).await;
        }

        Ok(result)
    }

    /// Poll forever. A failed or panicking cycle is logged and retried
    /// after the longer backoff; nothing here ends the loop.
    pub async fn run(mut self) {
        info!(
            table = %self.table,
            feed = self.feed.name(),
            pattern = self.pattern.name(),
            "Monitoring table"
        );

        loop {
            let backoff = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(result) => {
                    if let Err(e) = &result {
                        warn!(table = %self.table, error = %e, "Cycle failed, backing off");
                    }
                    self.backoff_for(&result)
                }
                Err(panic) => {
                    error!(
                        table = %self.table,
                        panic = panic_message(panic.as_ref()),
                        "Cycle panicked, backing off"
                    );
                    self.settings.error_backoff
                }
            };
            tokio::time::sleep(backoff).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Lookup-or-create of the table's session.
fn ensure_session<'a>(
    slot: &'a mut Option<TableSession>,
    table: &str,
    settings: &MonitorSettings,
    today: chrono::NaiveDate,
) -> &'a mut TableSession {
    slot.get_or_insert_with(|| {
        info!(table = %table, "Creating table session");
        TableSession::new(
            table,
            settings.history_capacity,
            today,
            settings.trend_broadcast_cycles,
        )
    })
}

fn log_transition(table: &str, transition: &Transition, session: &TableSession) {
    match transition {
        Transition::Entry { outcome, stat } => {
            info!(table = %table, outcome = %outcome, stat = %stat, "Entry signalled");
            log_trend_table(table, session.top_trends(), session.history().size());
        }
        Transition::Retry { level, outcome, entry } => {
            info!(table = %table, retry = level, outcome = %outcome, entry = %entry, "Retry");
        }
        Transition::Win { level, outcome, entry, .. } => {
            let tally = session.machine().tally();
            info!(
                table = %table,
                retry = level,
                outcome = %outcome,
                entry = %entry,
                wins = tally.wins,
                losses = tally.losses,
                "Win"
            );
        }
        Transition::Loss { outcome, entry, .. } => {
            let tally = session.machine().tally();
            info!(
                table = %table,
                outcome = %outcome,
                entry = %entry,
                wins = tally.wins,
                losses = tally.losses,
                "Loss"
            );
        }
    }
}

fn log_trend_table(table: &str, trends: &[RankedTrend], history_len: usize) {
    for (rank, t) in trends.iter().enumerate() {
        info!(
            table = %table,
            history_len,
            rank = rank + 1,
            outcome = %t.outcome,
            score = %t.score,
            hits = t.hits,
            total = t.total,
            "Trend"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
