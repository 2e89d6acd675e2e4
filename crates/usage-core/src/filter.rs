//! Declarative row predicates.
//!
//! A [`Filter`] is a `(column, operator, value)` triple built once and
//! applied to any number of records. Anything implementing [`Predicate`]
//! can be passed to [`crate::table::Table::filter`], including plain
//! closures.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UsageError};
use crate::models::{parse_date, Record, Value};

// ── Predicate ─────────────────────────────────────────────────────────────────

/// A test applied to one record.
pub trait Predicate {
    fn matches(&self, record: &Record) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Record) -> bool,
{
    fn matches(&self, record: &Record) -> bool {
        self(record)
    }
}

// ── Operator ──────────────────────────────────────────────────────────────────

/// The closed set of filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Case-insensitive substring test on the stringified cell.
    Contains,
    /// String equality after stringifying both sides; a missing cell never
    /// matches.
    Equals,
    GreaterThan,
    LessThan,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Contains => "contains",
            Operator::Equals => "equals",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
        }
    }
}

impl FromStr for Operator {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "contains" => Ok(Operator::Contains),
            "equals" => Ok(Operator::Equals),
            "greater_than" => Ok(Operator::GreaterThan),
            "less_than" => Ok(Operator::LessThan),
            other => Err(UsageError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Filter ────────────────────────────────────────────────────────────────────

/// A column/operator/value predicate.
///
/// ```
/// use usage_core::filter::{Filter, Predicate};
/// use usage_core::models::Record;
///
/// let year = Filter::new("YEAR", "equals", 2024).unwrap();
/// assert!(year.matches(&Record::new().with("YEAR", 2024)));
/// assert!(year.matches(&Record::new().with("YEAR", "2024")));
/// assert!(Filter::new("YEAR", "between", 2024).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    column: String,
    operator: Operator,
    value: Value,
}

impl Filter {
    /// Build a filter from an operator token.
    ///
    /// Fails with [`UsageError::UnsupportedOperator`] for unknown tokens.
    pub fn new(column: impl Into<String>, operator: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(Self::with_operator(column, operator.parse()?, value))
    }

    pub fn with_operator(
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn contains(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_operator(column, Operator::Contains, value)
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_operator(column, Operator::Equals, value)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Predicate for Filter {
    fn matches(&self, record: &Record) -> bool {
        let cell = record.get(&self.column);
        match self.operator {
            Operator::Contains => {
                if cell.is_missing() {
                    return false;
                }
                let needle = self.value.to_string().to_lowercase();
                cell.to_string().to_lowercase().contains(&needle)
            }
            Operator::Equals => !cell.is_missing() && cell.to_string() == self.value.to_string(),
            Operator::GreaterThan => cell.compare(&self.value) == Some(Ordering::Greater),
            Operator::LessThan => cell.compare(&self.value) == Some(Ordering::Less),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.column, self.operator, self.value)
    }
}

/// Parse a `COLUMN:OPERATOR:VALUE` expression.
///
/// The value is read as an integer, then a float, then a date, and falls back
/// to text. Everything after the second `:` belongs to the value.
impl FromStr for Filter {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let (Some(column), Some(operator), Some(raw)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(UsageError::InvalidFilter(s.to_string()));
        };
        if column.trim().is_empty() {
            return Err(UsageError::InvalidFilter(s.to_string()));
        }
        Filter::new(column.trim(), operator.trim(), parse_filter_value(raw))
    }
}

fn parse_filter_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return Value::Number(n);
    }
    if let Some(d) = parse_date(trimmed) {
        return Value::Date(d);
    }
    Value::Text(trimmed.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
