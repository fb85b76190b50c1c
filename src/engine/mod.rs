//! Core engine: per-table polling loops and their state.

pub mod broadcast;
pub mod clock;
pub mod history;
pub mod monitor;
pub mod session;

use tokio::task::JoinHandle;
use tracing::info;

use monitor::TableMonitor;

/// Spawn one independent task per table monitor.
///
/// The tasks share nothing; each owns its monitor and session.
pub fn spawn_monitors(monitors: Vec<TableMonitor>) -> Vec<JoinHandle<()>> {
    info!(tables = monitors.len(), "Spawning table monitors");
    monitors
        .into_iter()
        .map(|m| tokio::spawn(m.run()))
        .collect()
}
