//! Presentation layer for the utility usage report.
//!
//! Provides fixed-width text tables and renders a [`usage_data::summary::Summary`]
//! as per-usage-type pivot blocks or as JSON.

pub mod report;
pub mod table_view;

pub use usage_core as core;
