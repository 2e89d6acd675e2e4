//! Data ingestion layer for the utility usage report.
//!
//! Responsible for discovering and reading utility CSV exports, normalizing
//! their varying layouts into one canonical table, and building the
//! year-over-year summary.

pub mod normalizer;
pub mod reader;
pub mod summary;

pub use usage_core as core;
