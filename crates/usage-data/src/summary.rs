//! Year-over-year aggregation of normalized readings.
//!
//! Builds a [`Summary`] of `year → usage type → totals` with a fixed twelve
//! month breakdown, ready for the pivot report.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Serialize, Serializer};
use tracing::debug;
use usage_core::error::Result;
use usage_core::filter::Filter;
use usage_core::models::{
    Record, Units, UsageType, Value, COST, DATE, TYPE, UNITS, UNKNOWN_UNIT, USAGE,
};
use usage_core::table::{sum_present, Aggregations, Sum, Table};

// ── Derived column names ──────────────────────────────────────────────────────

pub const YEAR: &str = "YEAR";
pub const MONTH: &str = "MONTH";
pub const USAGE_TYPE: &str = "USAGE_TYPE";

/// Calendar months in report order.
pub const MONTHS: std::ops::RangeInclusive<u32> = 1..=12;

// ── Summary types ─────────────────────────────────────────────────────────────

/// Usage and cost for one calendar month. `None` means no data, not zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub month: u32,
    pub usage: Option<f64>,
    pub cost: Option<f64>,
}

/// Totals for one year and usage type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_usage: Option<f64>,
    pub total_cost: Option<f64>,
    /// First unit seen in the partition.
    #[serde(serialize_with = "serialize_unit")]
    pub unit: Option<Units>,
    /// Always twelve entries, January first.
    pub monthly: Vec<MonthlyTotal>,
}

impl UsageSummary {
    fn empty() -> Self {
        Self {
            total_usage: None,
            total_cost: None,
            unit: None,
            monthly: MONTHS
                .map(|month| MonthlyTotal {
                    month,
                    usage: None,
                    cost: None,
                })
                .collect(),
        }
    }

    /// Unit label, or `"unknown"` when the partition carried none.
    pub fn unit_label(&self) -> &'static str {
        self.unit.map(|u| u.as_str()).unwrap_or(UNKNOWN_UNIT)
    }

    pub fn month(&self, month: u32) -> Option<&MonthlyTotal> {
        self.monthly.iter().find(|m| m.month == month)
    }
}

fn serialize_unit<S: Serializer>(
    unit: &Option<Units>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(unit.map(|u| u.as_str()).unwrap_or(UNKNOWN_UNIT))
}

/// `year → usage type → totals`, years ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Summary {
    years: BTreeMap<i32, BTreeMap<UsageType, UsageSummary>>,
}

impl Summary {
    /// Years present in the data, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn get(&self, year: i32, usage_type: UsageType) -> Option<&UsageSummary> {
        self.years.get(&year)?.get(&usage_type)
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Add `YEAR`, `MONTH` and `USAGE_TYPE` derived from `DATE` and `TYPE`.
///
/// `USAGE_TYPE` is the usage-type label, or missing for readings that are
/// neither electric nor gas. Fails if any record lacks a date.
pub fn derive_calendar_columns(table: &Table) -> Result<Table> {
    table
        .with_column(YEAR, |r| record_date(r).map(|d| Value::from(d.year())))?
        .with_column(MONTH, |r| record_date(r).map(|d| Value::from(d.month())))?
        .with_column(USAGE_TYPE, |r| {
            let label = r
                .get(TYPE)
                .as_str()
                .and_then(UsageType::classify)
                .map(|t| Value::from(t.label()))
                .unwrap_or_default();
            Ok::<_, String>(label)
        })
}

/// Build the year-over-year summary for `table`.
///
/// Every year present among classified readings gets an entry for both
/// usage types, even when one of them has no readings that year.
pub fn summarize(table: &Table) -> Result<Summary> {
    let derived = derive_calendar_columns(table)?;
    let classified = derived.filter(&|r: &Record| !r.get(USAGE_TYPE).is_missing());
    debug!(
        "Summarizing {} of {} readings",
        classified.len(),
        table.len()
    );

    let mut years = BTreeMap::new();
    let distinct_years = classified.group_by(YEAR, &Aggregations::new());

    for year_value in distinct_years.column(YEAR) {
        let Some(year) = year_value.as_i64() else {
            continue;
        };
        let in_year = classified.filter(&Filter::equals(YEAR, year_value.clone()));

        let by_type = UsageType::ALL
            .into_iter()
            .map(|usage_type| {
                let partition = in_year.filter(&Filter::equals(USAGE_TYPE, usage_type.label()));
                (usage_type, summarize_partition(&partition))
            })
            .collect();

        years.insert(year as i32, by_type);
    }

    Ok(Summary { years })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn record_date(record: &Record) -> std::result::Result<chrono::NaiveDate, String> {
    record
        .get(DATE)
        .as_date()
        .ok_or_else(|| format!("{} is not a date: {:?}", DATE, record.get(DATE)))
}

fn summarize_partition(partition: &Table) -> UsageSummary {
    if partition.is_empty() {
        return UsageSummary::empty();
    }

    let unit = partition
        .column(UNITS)
        .filter_map(Value::as_str)
        .find_map(|s| s.parse::<Units>().ok());

    let monthly_sums = Aggregations::new().with(Sum::new(USAGE)).with(Sum::new(COST));
    let by_month = partition
        .group_by(MONTH, &monthly_sums)
        .reindex(MONTH, MONTHS.map(Value::from));

    let monthly = by_month
        .iter()
        .zip(MONTHS)
        .map(|(record, month)| MonthlyTotal {
            month,
            usage: record.get(USAGE).as_f64(),
            cost: record.get(COST).as_f64(),
        })
        .collect();

    UsageSummary {
        total_usage: sum_present(partition.column(USAGE)),
        total_cost: sum_present(partition.column(COST)),
        unit,
        monthly,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
