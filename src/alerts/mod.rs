//! Outbound notifications.
//!
//! Defines the `Notifier` trait, the notification payloads produced by
//! the monitors, and the plain-text rendering shared by all channels:
//! - Telegram Bot API (`telegram`)
//! - log-only fallback (`LogNotifier`) when no bot token is configured
//!
//! Delivery is best-effort. Notifiers swallow and log their own failures
//! so nothing flows back into the signal state machine.

pub mod telegram;

use async_trait::async_trait;
use tracing::info;

use crate::strategy::signal::Transition;
use crate::types::{Outcome, PatternSet, RankedTrend, TrendStat};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Entry,
    Retry,
    Win,
    Loss,
    TrendUpdate,
}

/// A message-worthy event on one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Entry {
        pattern: String,
        outcome: Outcome,
        stat: TrendStat,
    },
    Retry {
        level: u8,
        outcome: Outcome,
    },
    Win {
        level: u8,
        /// Most recent outcomes, newest first.
        recent: Vec<Outcome>,
    },
    Loss {
        recent: Vec<Outcome>,
    },
    TrendUpdate {
        pattern: String,
        trends: Vec<RankedTrend>,
        history_len: usize,
    },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Entry { .. } => NotificationKind::Entry,
            Notification::Retry { .. } => NotificationKind::Retry,
            Notification::Win { .. } => NotificationKind::Win,
            Notification::Loss { .. } => NotificationKind::Loss,
            Notification::TrendUpdate { .. } => NotificationKind::TrendUpdate,
        }
    }

    /// The notification announcing a state machine transition.
    pub fn from_transition(transition: &Transition, pattern: &PatternSet) -> Self {
        match transition {
            Transition::Entry { outcome, stat } => Notification::Entry {
                pattern: pattern.name().to_string(),
                outcome: *outcome,
                stat: *stat,
            },
            Transition::Retry { level, outcome, .. } => Notification::Retry {
                level: *level,
                outcome: *outcome,
            },
            Transition::Win { level, recent, .. } => Notification::Win {
                level: *level,
                recent: recent.clone(),
            },
            Transition::Loss { recent, .. } => Notification::Loss {
                recent: recent.clone(),
            },
        }
    }

    /// Human-readable text. Trend updates use `*bold*` / `_italic_` markers
    /// that channels with markup keep and plain channels show verbatim.
    pub fn render(&self, table: &str) -> String {
        self.segments(table)
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.as_str(),
                Segment::Marker(marker) => *marker,
            })
            .collect()
    }

    /// The rendered message split into literal text and formatting markers,
    /// so markup channels can escape the text without touching the markers.
    pub fn segments(&self, table: &str) -> Vec<Segment> {
        let mut out = Segments::default();
        out.text(format!("🎰 {table}\n"));
        match self {
            Notification::Entry {
                pattern,
                outcome,
                stat,
            } => {
                out.text(format!(
                    "🔥 ENTRY {pattern} pattern - {outcome} ({}/{})",
                    stat.hits, stat.total
                ));
            }
            Notification::Retry { level, outcome } => {
                let label = if *level >= 2 {
                    "Second and last GALE"
                } else {
                    "First GALE"
                };
                out.text(format!("🔁 {label} ({outcome})"));
            }
            Notification::Win { recent, .. } => {
                out.text(format!("✅✅✅ GREEN!!! ✅✅✅\n\n({})", join_recent(recent)));
            }
            Notification::Loss { recent } => {
                out.text(format!("❌❌❌ LOSS!!! ❌❌❌\n\n({})", join_recent(recent)));
            }
            Notification::TrendUpdate {
                pattern,
                trends,
                history_len,
            } => {
                out.text("📊 ");
                out.bold("TRENDS UPDATED");
                out.text(" 📊\n\n⚠️ ");
                out.bold(pattern.as_str());
                out.text(format!(" ⚠️\n\nLast {history_len} spins\n\n"));
                for (i, t) in trends.iter().enumerate() {
                    out.text(format!("{}º - Number ", i + 1));
                    out.bold(t.outcome.to_string());
                    out.text(": ");
                    out.italic(format!("{}%", t.score));
                    out.text(format!(" ({}/{})\n\n", t.hits, t.total));
                }
                out.text("\n🔔 Entries confirmed when these numbers appear!");
            }
        }
        out.0
    }
}

/// A piece of a rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, including table and pattern names.
    Text(String),
    /// A `*` or `_` formatting marker.
    Marker(&'static str),
}

#[derive(Default)]
struct Segments(Vec<Segment>);

impl Segments {
    fn text(&mut self, text: impl Into<String>) {
        self.0.push(Segment::Text(text.into()));
    }

    fn wrapped(&mut self, marker: &'static str, text: impl Into<String>) {
        self.0.push(Segment::Marker(marker));
        self.text(text);
        self.0.push(Segment::Marker(marker));
    }

    fn bold(&mut self, text: impl Into<String>) {
        self.wrapped("*", text);
    }

    fn italic(&mut self, text: impl Into<String>) {
        self.wrapped("_", text);
    }
}

fn join_recent(recent: &[Outcome]) -> String {
    recent
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Delivery channel for notifications.
///
/// Implementations must not fail outward: errors are logged and dropped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, table: &str, notification: &Notification);
}

/// Writes notifications to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, table: &str, notification: &Notification) {
        info!(
            table = %table,
            kind = ?notification.kind(),
            message = %notification.render(table),
            "Notification"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
