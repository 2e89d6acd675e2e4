//! End-to-end report pipeline.
//!
//! Load exports, derive the calendar columns, apply the user's filters and
//! summarize. Every stage hands a new [`Table`] to the next.

use std::path::PathBuf;

use usage_core::error::Result;
use usage_core::filter::Filter;
use usage_core::settings::Settings;
use usage_core::table::Table;
use usage_data::reader::LoadReport;
use usage_data::summary::{derive_calendar_columns, summarize, Summary};

use crate::loader::load_directory_concurrent;

// ── Public types ──────────────────────────────────────────────────────────────

/// Everything a caller needs to present a run.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    /// Load statistics and the merged canonical table.
    pub load: LoadReport,
    /// Rows that survived the filters, with YEAR, MONTH and USAGE_TYPE.
    pub filtered: Table,
    pub summary: Summary,
}

impl ReportOutcome {
    /// True when no export yielded a usable record.
    pub fn no_data(&self) -> bool {
        self.load.table.is_empty()
    }

    /// True when records were loaded but none survived the filters or
    /// usage-type classification.
    pub fn no_matches(&self) -> bool {
        !self.no_data() && self.summary.is_empty()
    }
}

// ── ReportPipeline ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReportPipeline {
    data_path: PathBuf,
    recursive: bool,
    jobs: usize,
    filters: Vec<Filter>,
}

impl ReportPipeline {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            recursive: true,
            jobs: 1,
            filters: Vec::new(),
        }
    }

    /// Build a pipeline from parsed command-line settings.
    ///
    /// Fails when any `--filter` expression is malformed.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(settings.path.clone())
            .recursive(settings.recursive())
            .jobs(usize::from(settings.jobs))
            .filters(settings.parsed_filters()?))
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    pub async fn run(&self) -> Result<ReportOutcome> {
        tracing::info!(
            path = %self.data_path.display(),
            recursive = self.recursive,
            jobs = self.jobs,
            filters = self.filters.len(),
            "starting report"
        );

        let load = load_directory_concurrent(&self.data_path, self.recursive, self.jobs).await?;
        let filtered = apply_filters(&load.table, &self.filters)?;
        let summary = summarize(&filtered)?;

        tracing::debug!(
            loaded = load.table.len(),
            kept = filtered.len(),
            years = summary.years().count(),
            "report ready"
        );
        Ok(ReportOutcome {
            load,
            filtered,
            summary,
        })
    }
}

/// Derive the calendar columns, then apply every filter in order.
///
/// Filters run after derivation so they may reference YEAR, MONTH and
/// USAGE_TYPE as well as the canonical columns.
pub fn apply_filters(table: &Table, filters: &[Filter]) -> Result<Table> {
    let derived = derive_calendar_columns(table)?;
    Ok(filters.iter().fold(derived, |current, filter| {
        let next = current.filter(filter);
        tracing::debug!(filter = %filter, before = current.len(), after = next.len(), "filter applied");
        next
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
