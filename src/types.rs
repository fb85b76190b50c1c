//! Shared types for the SERPENT monitor.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that feed, strategy, alert,
//! and engine modules can depend on them without circular references.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Highest value a wheel can produce (single-zero wheel).
pub const MAX_OUTCOME: u8 = 36;

/// Number of distinct outcome values (0..=36).
pub const OUTCOME_COUNT: usize = MAX_OUTCOME as usize + 1;

/// A single recorded spin result, guaranteed to lie in `0..=36`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Outcome(u8);

impl Outcome {
    /// Build an outcome, rejecting values outside the wheel.
    pub fn new(value: u8) -> Result<Self, SerpentError> {
        if value > MAX_OUTCOME {
            return Err(SerpentError::InvalidOutcome(i64::from(value)));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Position of this outcome in per-value tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Every possible outcome, ascending.
    pub fn all() -> impl Iterator<Item = Outcome> {
        (0..=MAX_OUTCOME).map(Outcome)
    }
}

impl TryFrom<u8> for Outcome {
    type Error = SerpentError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Outcome::new(value)
    }
}

impl TryFrom<i64> for Outcome {
    type Error = SerpentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| SerpentError::InvalidOutcome(value))
            .and_then(Outcome::new)
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> u8 {
        outcome.0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Pattern set
// ---------------------------------------------------------------------------

/// Members of the default "BLACK SNAKE" pattern.
pub const BLACK_SNAKE: [u8; 10] = [2, 6, 10, 13, 17, 24, 26, 28, 31, 35];

/// A named set of distinguished outcomes whose recent appearance is the
/// predictive signal. Membership is a table lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    name: String,
    members: [bool; OUTCOME_COUNT],
}

impl PatternSet {
    /// Build a pattern from raw member values.
    pub fn new(name: impl Into<String>, values: &[u8]) -> Result<Self, SerpentError> {
        if values.is_empty() {
            return Err(SerpentError::InvalidPattern("pattern has no members".into()));
        }
        let mut members = [false; OUTCOME_COUNT];
        for &v in values {
            let outcome = Outcome::new(v)?;
            if members[outcome.index()] {
                return Err(SerpentError::InvalidPattern(format!(
                    "duplicate member {v}"
                )));
            }
            members[outcome.index()] = true;
        }
        Ok(Self {
            name: name.into(),
            members,
        })
    }

    /// The default BLACK SNAKE pattern.
    pub fn black_snake() -> Self {
        let mut members = [false; OUTCOME_COUNT];
        for v in BLACK_SNAKE {
            members[v as usize] = true;
        }
        Self {
            name: "BLACK SNAKE".to_string(),
            members,
        }
    }

    pub fn contains(&self, outcome: Outcome) -> bool {
        self.members[outcome.index()]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.members.iter().filter(|m| **m).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in ascending order.
    pub fn members(&self) -> Vec<Outcome> {
        Outcome::all().filter(|o| self.contains(*o)).collect()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::black_snake()
    }
}

// ---------------------------------------------------------------------------
// Trend statistics
// ---------------------------------------------------------------------------

/// How often one outcome was preceded by a pattern member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrendStat {
    /// Occurrences with at least one pattern member in the lookback window.
    pub hits: u32,
    /// Occurrences with a full lookback window available.
    pub total: u32,
    /// `hits / total` as a percentage, two decimal places (0 when total is 0).
    pub score: Decimal,
}

impl fmt::Display for TrendStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% ({}/{})", self.score, self.hits, self.total)
    }
}

/// Statistics for every possible outcome value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendTable {
    stats: [TrendStat; OUTCOME_COUNT],
}

impl TrendTable {
    pub fn new(stats: [TrendStat; OUTCOME_COUNT]) -> Self {
        Self { stats }
    }

    pub fn get(&self, outcome: Outcome) -> &TrendStat {
        &self.stats[outcome.index()]
    }

    /// `(outcome, stat)` pairs in ascending outcome order.
    pub fn iter(&self) -> impl Iterator<Item = (Outcome, &TrendStat)> {
        Outcome::all().zip(self.stats.iter())
    }
}

impl Default for TrendTable {
    fn default() -> Self {
        Self {
            stats: [TrendStat::default(); OUTCOME_COUNT],
        }
    }
}

/// One entry of the Top Trends list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankedTrend {
    pub outcome: Outcome,
    pub hits: u32,
    pub total: u32,
    pub score: Decimal,
}

impl RankedTrend {
    pub fn stat(&self) -> TrendStat {
        TrendStat {
            hits: self.hits,
            total: self.total,
            score: self.score,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for SERPENT.
#[derive(Debug, thiserror::Error)]
pub enum SerpentError {
    #[error("Outcome out of range 0..=36: {0}")]
    InvalidOutcome(i64),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
