//! SERPENT: live roulette feed monitor with pattern-trend signals.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod feed;
pub mod alerts;
pub mod strategy;
pub mod engine;
pub mod dashboard;
pub mod backtest;
