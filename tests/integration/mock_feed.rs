//! Mock feed and notifier for integration testing.
//!
//! Provides a deterministic `FeedClient` that plays back a per-table
//! script of responses, and a `Notifier` that records everything it is
//! asked to send. All in-memory with no external dependencies.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serpent::alerts::{Notification, NotificationKind, Notifier};
use serpent::feed::{FeedClient, FeedError, FetchOutcome};
use serpent::types::Outcome;

/// One scripted feed response.
#[derive(Debug, Clone)]
pub enum Step {
    /// A newest-first window.
    Window(Vec<u8>),
    Empty,
    Error(String),
}

/// A scripted feed. Each table consumes its own queue; once the queue is
/// exhausted the table reads as empty.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Step>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append steps to `table`'s script.
    pub fn push(&self, table: &str, steps: impl IntoIterator<Item = Step>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(steps);
    }

    /// Tables fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedClient for ScriptedFeed {
    async fn fetch(&self, table: &str) -> Result<FetchOutcome, FeedError> {
        self.calls.lock().unwrap().push(table.to_string());
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(table)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Step::Empty);

        match step {
            Step::Window(values) => {
                let outcomes = values
                    .into_iter()
                    .map(|v| Outcome::new(v).map_err(|e| FeedError::Parse(e.to_string())))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FetchOutcome::from_window(outcomes))
            }
            Step::Empty => Ok(FetchOutcome::Empty),
            Step::Error(body) => Err(FeedError::Status { status: 503, body }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Records every notification, tagged with its table.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, Notification)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap().clone()
    }

    /// Kinds sent for one table, in order.
    pub fn kinds_for(&self, table: &str) -> Vec<NotificationKind> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == table)
            .map(|(_, n)| n.kind())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, table: &str, notification: &Notification) {
        self.sent
            .lock()
            .unwrap()
            .push((table.to_string(), notification.clone()));
    }
}

// ---------------------------------------------------------------------------
// Window builders
// ---------------------------------------------------------------------------

/// 60 chronological spins in which 9 always follows a 2.
pub fn warm_up() -> Vec<u8> {
    let mut spins = Vec::new();
    for _ in 0..20 {
        spins.extend([2u8, 9, 1]);
    }
    spins
}

/// The feed window (newest first) after `warm_up()` followed by `tail`.
pub fn window_after(tail: &[u8]) -> Step {
    let mut chronological = warm_up();
    chronological.extend_from_slice(tail);
    chronological.reverse();
    Step::Window(chronological)
}

/// Successive windows as each spin of `tail` lands.
pub fn windows_for(tail: &[u8]) -> Vec<Step> {
    (1..=tail.len()).map(|n| window_after(&tail[..n])).collect()
}
