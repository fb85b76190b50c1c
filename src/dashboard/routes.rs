//! Dashboard API route handlers.
//!
//! All endpoints return JSON. Each table's monitor publishes snapshots on
//! its own watch channel; handlers only ever read the latest value.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::engine::session::TableSnapshot;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Read handles on every monitored table.
pub struct DashboardState {
    tables: BTreeMap<String, watch::Receiver<TableSnapshot>>,
    started: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(tables: impl IntoIterator<Item = (String, watch::Receiver<TableSnapshot>)>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
            started: Utc::now(),
        }
    }

    fn snapshot(&self, table: &str) -> Option<TableSnapshot> {
        self.tables.get(table).map(|rx| rx.borrow().clone())
    }

    fn snapshots(&self) -> Vec<TableSnapshot> {
        self.tables.values().map(|rx| rx.borrow().clone()).collect()
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub tables: usize,
    pub uptime_secs: i64,
}

/// Counters summed over all tables for the current day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryResponse {
    pub tables: usize,
    pub active_signals: usize,
    pub entries: u64,
    pub wins: u64,
    pub wins_by_retry: [u64; 3],
    pub losses: u64,
    pub resolved: u64,
    pub win_rate: f64,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        tables: state.tables.len(),
        uptime_secs: (Utc::now() - state.started).num_seconds(),
    })
}

/// GET /api/tables
pub async fn list_tables(State(state): State<AppState>) -> Json<Vec<TableSnapshot>> {
    Json(state.snapshots())
}

/// GET /api/tables/:table
pub async fn get_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<TableSnapshot>, StatusCode> {
    state.snapshot(&table).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// GET /api/summary
pub async fn get_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let snapshots = state.snapshots();
    let mut summary = SummaryResponse {
        tables: snapshots.len(),
        ..SummaryResponse::default()
    };
    for snap in &snapshots {
        if snap.armed_outcome.is_some() {
            summary.active_signals += 1;
        }
        summary.entries += snap.tally.entries;
        summary.wins += snap.tally.wins;
        summary.losses += snap.tally.losses;
        summary.resolved += snap.tally.resolved;
        for (total, level) in summary.wins_by_retry.iter_mut().zip(snap.tally.wins_by_retry) {
            *total += level;
        }
    }
    if summary.resolved > 0 {
        summary.win_rate = summary.wins as f64 / summary.resolved as f64 * 100.0;
    }
    Json(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
