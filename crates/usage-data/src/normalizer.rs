//! Schema normalization for utility exports.
//!
//! Each export vintage names its usage columns differently. The normalizer
//! detects which layout a file uses and maps every row onto the canonical
//! `DATE, TYPE, USAGE, UNITS, COST` columns.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace, warn};
use usage_core::error::{Result, UsageError};
use usage_core::models::{parse_date, CanonicalRecord, Record, Units, CANONICAL_COLUMNS};
use usage_core::table::Table;

use crate::reader::RawTable;

// ── Raw column names ──────────────────────────────────────────────────────────

pub const RAW_TYPE: &str = "TYPE";
pub const RAW_DATE: &str = "DATE";
pub const IMPORT_KWH: &str = "IMPORT (kWh)";
pub const EXPORT_KWH: &str = "EXPORT (kWh)";
pub const USAGE_KWH: &str = "USAGE (kWh)";
pub const USAGE_THERMS: &str = "USAGE (therms)";
pub const RAW_USAGE: &str = "USAGE";
pub const RAW_UNITS: &str = "UNITS";
pub const RAW_COST: &str = "COST";

// ── SchemaLayout ──────────────────────────────────────────────────────────────

/// The known export layouts, in detection precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaLayout {
    /// `IMPORT (kWh)` and `EXPORT (kWh)`: net-metered (solar) accounts.
    NetMetered,
    /// `USAGE (kWh)`.
    Electric,
    /// `USAGE (therms)`.
    Gas,
    /// Already-normalized `USAGE` and `UNITS`.
    Normalized,
}

impl SchemaLayout {
    /// Detect the layout from a header row. `None` when nothing matches.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Option<Self> {
        let has = |name: &str| headers.iter().any(|h| h.as_ref() == name);

        if has(IMPORT_KWH) && has(EXPORT_KWH) {
            Some(SchemaLayout::NetMetered)
        } else if has(USAGE_KWH) {
            Some(SchemaLayout::Electric)
        } else if has(USAGE_THERMS) {
            Some(SchemaLayout::Gas)
        } else if has(RAW_USAGE) && has(RAW_UNITS) {
            Some(SchemaLayout::Normalized)
        } else {
            None
        }
    }

    /// Unit implied by the layout; `None` for pass-through layouts.
    pub fn units(&self) -> Option<Units> {
        match self {
            SchemaLayout::NetMetered | SchemaLayout::Electric => Some(Units::Kwh),
            SchemaLayout::Gas => Some(Units::Therms),
            SchemaLayout::Normalized => None,
        }
    }

    fn usage(&self, raw: &RawTable, row: &csv::StringRecord) -> Option<f64> {
        match self {
            SchemaLayout::NetMetered => {
                let import = coerce_number(raw.cell(row, IMPORT_KWH))?;
                let export = coerce_number(raw.cell(row, EXPORT_KWH))?;
                Some(import - export)
            }
            SchemaLayout::Electric => coerce_number(raw.cell(row, USAGE_KWH)),
            SchemaLayout::Gas => coerce_number(raw.cell(row, USAGE_THERMS)),
            SchemaLayout::Normalized => coerce_number(raw.cell(row, RAW_USAGE)),
        }
    }

    fn row_units(&self, raw: &RawTable, row: &csv::StringRecord) -> Option<Units> {
        self.units().or_else(|| {
            let cell = raw.cell(row, RAW_UNITS)?;
            match cell.parse::<Units>() {
                Ok(units) => Some(units),
                Err(e) => {
                    trace!("{}: {}", raw.path.display(), e);
                    None
                }
            }
        })
    }
}

// ── Normalization ─────────────────────────────────────────────────────────────

/// Map a raw export onto the canonical columns.
///
/// Fails with [`UsageError::UnrecognizedSchema`] when the headers match no
/// known layout. Rows without a parseable `DATE` or a non-blank `TYPE` are
/// dropped; bad numeric cells become missing.
pub fn normalize(raw: &RawTable) -> Result<Table> {
    let layout = SchemaLayout::detect(&raw.headers).ok_or_else(|| {
        UsageError::UnrecognizedSchema {
            path: raw.path.clone(),
            columns: raw.headers.clone(),
        }
    })?;
    debug!("{}: detected {:?} layout", raw.path.display(), layout);

    let mut dropped = 0usize;
    let records: Vec<Record> = raw
        .rows
        .iter()
        .filter_map(|row| {
            let canonical = normalize_row(layout, raw, row);
            if canonical.is_none() {
                dropped += 1;
            }
            canonical
        })
        .map(Record::from)
        .collect();

    if dropped > 0 {
        warn!(
            "{}: dropped {} rows without a valid DATE or TYPE",
            raw.path.display(),
            dropped
        );
    }

    Ok(Table::new(CANONICAL_COLUMNS, records))
}

fn normalize_row(
    layout: SchemaLayout,
    raw: &RawTable,
    row: &csv::StringRecord,
) -> Option<CanonicalRecord> {
    let kind = raw.cell(row, RAW_TYPE).filter(|t| !t.is_empty())?;
    let date = raw.cell(row, RAW_DATE).and_then(parse_date)?;

    Some(CanonicalRecord {
        date,
        kind: kind.to_string(),
        usage: layout.usage(raw, row),
        units: layout.row_units(raw, row),
        cost: raw.cell(row, RAW_COST).and_then(parse_cost),
    })
}

// ── Numeric coercion ──────────────────────────────────────────────────────────

/// Strict number parse; fails with [`UsageError::NumericCoercion`].
///
/// Non-finite values (`NaN`, `inf`) are rejected.
pub fn parse_number(cell: &str) -> Result<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| UsageError::NumericCoercion(cell.to_string()))
}

/// Lenient number parse: failures become a missing value.
pub fn coerce_number(cell: Option<&str>) -> Option<f64> {
    let cell = cell?;
    match parse_number(cell) {
        Ok(n) => Some(n),
        Err(e) => {
            trace!("{}", e);
            None
        }
    }
}

/// Parse a currency cell such as `"$1,234.56"`.
///
/// Dollar signs, thousands separators and whitespace are stripped first;
/// anything left that is not a number yields `None`.
pub fn parse_cost(cell: &str) -> Option<f64> {
    static CURRENCY_NOISE: OnceLock<Regex> = OnceLock::new();
    let re = CURRENCY_NOISE.get_or_init(|| Regex::new(r"[$,\s]").expect("regex is valid"));
    let cleaned = re.replace_all(cell, "");
    coerce_number(Some(cleaned.as_ref()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
