//! Core types for the utility usage report.
//!
//! Holds the error taxonomy, the cell/record/table model with its pure
//! transformations, filter predicates, CLI settings and cell formatting.

pub mod error;
pub mod filter;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod table;

pub use error::{Result, UsageError};
pub use table::Table;
