//! Live outcome feeds.
//!
//! Defines the `FeedClient` trait and the three-way fetch classification
//! the monitors drive their backoff policy from:
//! - `Ok(FetchOutcome::Outcomes(..))`: a newest-first window
//! - `Ok(FetchOutcome::Empty)`: nothing this cycle, retry shortly
//! - `Err(FeedError)`: transport or parse failure, back off longer

pub mod playtech;

use async_trait::async_trait;

use crate::types::Outcome;

/// A successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Newest-first outcomes for the table.
    Outcomes(Vec<Outcome>),
    /// The feed had nothing for the table this time.
    Empty,
}

impl FetchOutcome {
    /// Classify a parsed window.
    pub fn from_window(outcomes: Vec<Outcome>) -> Self {
        if outcomes.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Outcomes(outcomes)
        }
    }
}

/// Recoverable feed failures.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed feed response: {0}")]
    Parse(String),
}

/// Source of per-table outcome windows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch the latest newest-first window for `table`.
    async fn fetch(&self, table: &str) -> Result<FetchOutcome, FeedError>;

    /// Feed name for logging.
    fn name(&self) -> &str;
}
