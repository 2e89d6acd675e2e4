//! Immutable record table.
//!
//! Every transformation borrows `self` and returns a fresh [`Table`], so a
//! pipeline can be replayed from any intermediate step. All records of a
//! table carry the same column set; cells a source did not provide are
//! [`Value::Null`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::{Result, UsageError};
use crate::filter::Predicate;
use crate::models::{Record, Value};

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Reduces one `group_by` partition to a list of named aggregate fields.
pub trait Aggregator {
    fn aggregate(&self, partition: &[&Record]) -> Vec<(String, Value)>;
}

impl<F> Aggregator for F
where
    F: Fn(&[&Record]) -> Vec<(String, Value)>,
{
    fn aggregate(&self, partition: &[&Record]) -> Vec<(String, Value)> {
        self(partition)
    }
}

/// Sum of the non-missing numeric cells of `column`.
///
/// Missing cells are skipped, never counted as zero. A partition with no
/// numeric cell at all sums to [`Value::Null`].
#[derive(Debug, Clone)]
pub struct Sum {
    column: String,
    output: String,
}

impl Sum {
    pub fn new(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            output: column.clone(),
            column,
        }
    }

    /// Name of the aggregate field (defaults to the source column).
    pub fn named(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

impl Aggregator for Sum {
    fn aggregate(&self, partition: &[&Record]) -> Vec<(String, Value)> {
        let total = sum_present(partition.iter().map(|r| r.get(&self.column)));
        vec![(self.output.clone(), total.into())]
    }
}

/// First non-missing cell of `column`, in insertion order.
#[derive(Debug, Clone)]
pub struct First {
    column: String,
    output: String,
}

impl First {
    pub fn new(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            output: column.clone(),
            column,
        }
    }

    pub fn named(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

impl Aggregator for First {
    fn aggregate(&self, partition: &[&Record]) -> Vec<(String, Value)> {
        let first = partition
            .iter()
            .map(|r| r.get(&self.column))
            .find(|v| !v.is_missing())
            .cloned()
            .unwrap_or_default();
        vec![(self.output.clone(), first)]
    }
}

/// Number of records in the partition.
#[derive(Debug, Clone)]
pub struct Count {
    output: String,
}

impl Count {
    pub fn named(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Aggregator for Count {
    fn aggregate(&self, partition: &[&Record]) -> Vec<(String, Value)> {
        vec![(self.output.clone(), Value::Integer(partition.len() as i64))]
    }
}

/// Runs several aggregators and concatenates their fields.
#[derive(Default)]
pub struct Aggregations {
    parts: Vec<Box<dyn Aggregator + Send + Sync>>,
}

impl Aggregations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, aggregator: impl Aggregator + Send + Sync + 'static) -> Self {
        self.parts.push(Box::new(aggregator));
        self
    }
}

impl Aggregator for Aggregations {
    fn aggregate(&self, partition: &[&Record]) -> Vec<(String, Value)> {
        self.parts
            .iter()
            .flat_map(|a| a.aggregate(partition))
            .collect()
    }
}

/// Sum the present numeric values, or `None` when there are none.
pub fn sum_present<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<f64> {
    values
        .into_iter()
        .filter_map(Value::as_f64)
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

// ── Group keys ────────────────────────────────────────────────────────────────

/// [`Value`] wrapper with a total order, for use as a map key.
#[derive(Debug, Clone)]
struct GroupKey(Value);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// An ordered, immutable sequence of records with a uniform column set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Build a table, padding every record with `Null` for any of `columns`
    /// it lacks. Cells outside `columns` are dropped.
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        records: impl IntoIterator<Item = Record>,
    ) -> Self {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let records = records
            .into_iter()
            .map(|r| conform(&columns, &r))
            .collect();
        Self { columns, records }
    }

    pub fn empty<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::new(columns, std::iter::empty())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order. Each call starts a new pass.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Cells of one column in insertion order.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.records.iter().map(move |r| r.get(name))
    }

    /// Keep only the records satisfying `predicate`.
    pub fn filter<P: Predicate + ?Sized>(&self, predicate: &P) -> Table {
        Table {
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .filter(|r| predicate.matches(r))
                .cloned()
                .collect(),
        }
    }

    /// Add (or replace) column `name` computed from each record.
    ///
    /// If `derive` fails for any record the whole call fails with
    /// [`UsageError::InvalidDerivation`]; no partially derived table exists.
    pub fn with_column<F, E>(&self, name: &str, derive: F) -> Result<Table>
    where
        F: Fn(&Record) -> std::result::Result<Value, E>,
        E: Display,
    {
        let records = self
            .records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let value = derive(record).map_err(|e| UsageError::InvalidDerivation {
                    column: name.to_string(),
                    row,
                    reason: e.to_string(),
                })?;
                Ok(record.clone().with(name, value))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut columns = self.columns.clone();
        if !self.has_column(name) {
            columns.push(name.to_string());
        }
        Ok(Table { columns, records })
    }

    /// Partition by `key` and reduce each partition with `aggregator`.
    ///
    /// One output record per distinct non-missing key, ascending. Output
    /// columns are `key` followed by the aggregate fields in the order the
    /// aggregator returns them.
    pub fn group_by<A: Aggregator + ?Sized>(&self, key: &str, aggregator: &A) -> Table {
        let mut partitions: BTreeMap<GroupKey, Vec<&Record>> = BTreeMap::new();
        for record in &self.records {
            let value = record.get(key);
            if value.is_missing() {
                continue;
            }
            partitions
                .entry(GroupKey(value.clone()))
                .or_default()
                .push(record);
        }

        let mut columns = vec![key.to_string()];
        let mut records = Vec::with_capacity(partitions.len());
        for (GroupKey(key_value), partition) in partitions {
            let mut record = Record::new().with(key, key_value);
            for (field, value) in aggregator.aggregate(&partition) {
                if !columns.contains(&field) {
                    columns.push(field.clone());
                }
                record.set(field, value);
            }
            records.push(record);
        }

        if records.is_empty() {
            columns.extend(
                aggregator
                    .aggregate(&[])
                    .into_iter()
                    .map(|(field, _)| field)
                    .filter(|f| f != key),
            );
        }

        Table::new(columns, records)
    }

    /// One record per entry of `keys`, in that order.
    ///
    /// The first record whose `key` equals the requested key is used; keys
    /// absent from the table get a synthesized record that is `Null` in every
    /// other column.
    pub fn reindex(&self, key: &str, keys: impl IntoIterator<Item = Value>) -> Table {
        let records = keys
            .into_iter()
            .map(|wanted| {
                self.records
                    .iter()
                    .find(|r| !r.get(key).is_missing() && r.get(key) == &wanted)
                    .cloned()
                    .unwrap_or_else(|| Record::new().with(key, wanted))
            })
            .collect::<Vec<_>>();

        let mut columns = self.columns.clone();
        if !self.has_column(key) {
            columns.insert(0, key.to_string());
        }
        Table::new(columns, records)
    }

    /// Concatenate tables in order.
    ///
    /// The column set is the union of the inputs in first-seen order.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Table {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
        let records = tables
            .iter()
            .flat_map(|t| t.records.iter().cloned())
            .collect::<Vec<_>>();
        Table::new(columns, records)
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn conform(columns: &[String], record: &Record) -> Record {
    columns
        .iter()
        .map(|c| (c.clone(), record.get(c).clone()))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
