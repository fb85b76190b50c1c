//! Integration tests: full polling cycles against scripted feeds.

mod mock_feed;
mod simulation;
