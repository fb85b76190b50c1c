//! Playtech live-casino results feed.
//!
//! A single JSON document lists recent results for every table:
//!
//! ```json
//! { "Roleta Brasileira": { "results": [ { "number": "17" }, { "number": "4" } ] } }
//! ```
//!
//! Results are newest-first. Entries whose `number` is not a plain decimal
//! string (or integer) are skipped, as are values outside the wheel.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{FeedClient, FeedError, FetchOutcome};
use crate::types::Outcome;

const FEED_NAME: &str = "playtech";

/// HTTP client for the shared results document.
pub struct PlaytechFeed {
    http: Client,
    url: String,
}

impl PlaytechFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("SERPENT/0.1.0 (roulette-monitor)")
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedClient for PlaytechFeed {
    async fn fetch(&self, table: &str) -> Result<FetchOutcome, FeedError> {
        debug!(url = %self.url, table = %table, "Fetching results");

        let resp = self.http.get(&self.url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Status { status, body });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| FeedError::Parse(e.to_string()))?;

        parse_window(&body, table).map(FetchOutcome::from_window)
    }

    fn name(&self) -> &str {
        FEED_NAME
    }
}

/// Extract one table's newest-first window from the results document.
///
/// A missing table or missing `results` list is an empty window, not an
/// error; a document that is not a JSON object is malformed. Entries that
/// are not digit strings or non-negative integers are skipped, while a
/// number outside the wheel fails the whole window.
pub fn parse_window(body: &Value, table: &str) -> Result<Vec<Outcome>, FeedError> {
    let tables = body
        .as_object()
        .ok_or_else(|| FeedError::Parse("expected a JSON object of tables".into()))?;

    let Some(results) = tables
        .get(table)
        .and_then(|t| t.get("results"))
        .and_then(Value::as_array)
    else {
        return Ok(Vec::new());
    };

    let mut window = Vec::with_capacity(results.len());
    for raw in results.iter().filter_map(|r| r.get("number")) {
        if let Some(outcome) = parse_number(raw)? {
            window.push(outcome);
        }
    }
    Ok(window)
}

fn parse_number(raw: &Value) -> Result<Option<Outcome>, FeedError> {
    let value = match raw {
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            match s.parse::<i64>() {
                Ok(v) => v,
                Err(_) => return Err(FeedError::Parse(format!("number out of range: {s}"))),
            }
        }
        Value::Number(n) => match n.as_u64() {
            Some(v) => i64::try_from(v).unwrap_or(i64::MAX),
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Outcome::try_from(value)
        .map(Some)
        .map_err(|e| FeedError::Parse(e.to_string()))
}
