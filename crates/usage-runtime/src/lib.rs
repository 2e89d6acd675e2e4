//! Runtime layer for the usage report.
//!
//! Runs file loading on tokio's blocking pool and drives the
//! load → derive → filter → summarize pipeline.

pub mod loader;
pub mod pipeline;

pub use usage_core as core;
pub use usage_data as data;
