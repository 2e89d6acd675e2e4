use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ── Canonical column names ────────────────────────────────────────────────────

pub const DATE: &str = "DATE";
pub const TYPE: &str = "TYPE";
pub const USAGE: &str = "USAGE";
pub const UNITS: &str = "UNITS";
pub const COST: &str = "COST";

/// Column order of every freshly normalized table.
pub const CANONICAL_COLUMNS: [&str; 5] = [DATE, TYPE, USAGE, UNITS, COST];

/// Label used when a partition carries no unit at all.
pub const UNKNOWN_UNIT: &str = "unknown";

// ── Value ─────────────────────────────────────────────────────────────────────

/// A single table cell.
///
/// `Null` is the explicit missing value; it is never treated as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the cell. Text is not parsed here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Ordering used for comparisons and group keys.
    ///
    /// Numbers compare numerically across `Integer`/`Number`, dates
    /// chronologically, text lexicographically. Mixed kinds fall back to a
    /// fixed kind rank so the order stays total.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (a, b) if a.kind_rank() == 1 && b.kind_rank() == 1 => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                x.total_cmp(&y)
            }
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }

    /// Type-compatible comparison used by the `greater_than`/`less_than`
    /// operators. Returns `None` when either side is missing or the kinds
    /// cannot be compared.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_missing() || other.is_missing() {
            return None;
        }
        match (self, other) {
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Text(s)) => parse_date(s).map(|b| a.cmp(&b)),
            (Value::Text(s), Value::Date(b)) => parse_date(s).map(|a| a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Text(s), n) => s.trim().parse::<f64>().ok()?.partial_cmp(&n.as_f64()?),
            (n, Value::Text(s)) => n.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Number(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) if n.is_nan() => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_missing(), other.is_missing()) {
            (true, true) => true,
            (false, false) => self.total_cmp(other) == Ordering::Equal,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Parse a date from the formats found in utility exports.
///
/// Accepts `2023-01-05`, `01/05/2023`, `2023/01/05` and date-time strings
/// whose leading token is one of those (`2023-01-05 00:00`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

    let trimmed = s.trim();
    let token = trimmed
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(trimmed);

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

// ── Record ────────────────────────────────────────────────────────────────────

static MISSING: Value = Value::Null;

/// One row of a [`crate::table::Table`]: column name → cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell for `column`; absent columns read as [`Value::Null`].
    pub fn get(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&MISSING)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

// ── Units ─────────────────────────────────────────────────────────────────────

/// Unit of measure for a usage quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Units {
    #[serde(rename = "kWh")]
    Kwh,
    #[serde(rename = "therms")]
    Therms,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Kwh => "kWh",
            Units::Therms => "therms",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kwh" => Ok(Units::Kwh),
            "therms" | "therm" => Ok(Units::Therms),
            other => Err(format!("unknown unit: {}", other)),
        }
    }
}

// ── UsageType ─────────────────────────────────────────────────────────────────

/// Coarse usage classification derived from the free-text `TYPE` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UsageType {
    #[serde(rename = "Electric usage")]
    Electric,
    #[serde(rename = "Natural gas usage")]
    NaturalGas,
}

impl UsageType {
    /// Both usage types in report order.
    pub const ALL: [UsageType; 2] = [UsageType::Electric, UsageType::NaturalGas];

    pub fn label(&self) -> &'static str {
        match self {
            UsageType::Electric => "Electric usage",
            UsageType::NaturalGas => "Natural gas usage",
        }
    }

    /// Classify a `TYPE` cell. Electric wins when both labels appear.
    pub fn classify(type_text: &str) -> Option<UsageType> {
        Self::ALL
            .into_iter()
            .find(|usage_type| type_text.contains(usage_type.label()))
    }
}

impl fmt::Display for UsageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── CanonicalRecord ───────────────────────────────────────────────────────────

/// A normalized meter reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub date: NaiveDate,
    /// Free-text meter category, e.g. `"Electric usage"`.
    pub kind: String,
    pub usage: Option<f64>,
    pub units: Option<Units>,
    pub cost: Option<f64>,
}

impl CanonicalRecord {
    /// Read the canonical fields back out of a table record.
    ///
    /// Returns `None` when `DATE` or `TYPE` is missing.
    pub fn from_record(record: &Record) -> Option<Self> {
        let date = record.get(DATE).as_date()?;
        let kind = record.get(TYPE).as_str()?.to_string();
        let units = record
            .get(UNITS)
            .as_str()
            .and_then(|s| s.parse::<Units>().ok());
        Some(Self {
            date,
            kind,
            usage: record.get(USAGE).as_f64(),
            units,
            cost: record.get(COST).as_f64(),
        })
    }
}

impl From<CanonicalRecord> for Record {
    fn from(c: CanonicalRecord) -> Self {
        Record::new()
            .with(DATE, c.date)
            .with(TYPE, c.kind)
            .with(USAGE, c.usage)
            .with(
                UNITS,
                c.units
                    .map(|u| Value::from(u.as_str()))
                    .unwrap_or(Value::Null),
            )
            .with(COST, c.cost)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── Value ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Integer(2024).to_string(), "2024");
        assert_eq!(Value::Number(2024.0).to_string(), "2024");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Date(date(2023, 1, 5)).to_string(), "2023-01-05");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_value_nan_is_missing() {
        assert!(Value::Number(f64::NAN).is_missing());
        assert!(Value::Null.is_missing());
        assert!(!Value::Number(0.0).is_missing());
    }

    #[test]
    fn test_value_numeric_equality_across_kinds() {
        assert_eq!(Value::Integer(3), Value::Number(3.0));
        assert_ne!(Value::Integer(3), Value::Text("3".to_string()));
    }

    #[test]
    fn test_value_compare_dates_with_text() {
        let d = Value::Date(date(2023, 6, 1));
        assert_eq!(d.compare(&Value::from("2023-01-01")), Some(Ordering::Greater));
        assert_eq!(d.compare(&Value::Null), None);
    }

    #[test]
    fn test_value_compare_numeric_text() {
        assert_eq!(
            Value::Number(12.5).compare(&Value::from("10")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Number(12.5).compare(&Value::from("abc")), None);
    }

    #[test]
    fn test_value_total_cmp_orders_numbers() {
        let mut values = vec![Value::Integer(10), Value::Number(2.5), Value::Integer(1)];
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(
            values,
            vec![Value::Integer(1), Value::Number(2.5), Value::Integer(10)]
        );
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2023-01-05"), Some(date(2023, 1, 5)));
        assert_eq!(parse_date("01/05/2023"), Some(date(2023, 1, 5)));
        assert_eq!(parse_date("2023/01/05"), Some(date(2023, 1, 5)));
        assert_eq!(parse_date(" 2023-01-05 00:15 "), Some(date(2023, 1, 5)));
        assert_eq!(parse_date("2023-01-05T00:15:00"), Some(date(2023, 1, 5)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    // ── Record ────────────────────────────────────────────────────────────────

    #[test]
    fn test_record_missing_column_reads_null() {
        let record = Record::new().with(TYPE, "Electric usage");
        assert!(record.get(COST).is_missing());
        assert!(!record.contains(COST));
    }

    // ── Units / UsageType ─────────────────────────────────────────────────────

    #[test]
    fn test_units_parse() {
        assert_eq!("kWh".parse::<Units>(), Ok(Units::Kwh));
        assert_eq!(" Therms ".parse::<Units>(), Ok(Units::Therms));
        assert!("gallons".parse::<Units>().is_err());
    }

    #[test]
    fn test_usage_type_classify() {
        assert_eq!(
            UsageType::classify("Electric usage"),
            Some(UsageType::Electric)
        );
        assert_eq!(
            UsageType::classify("Natural gas usage"),
            Some(UsageType::NaturalGas)
        );
        assert_eq!(UsageType::classify("Water usage"), None);
    }

    #[test]
    fn test_usage_type_electric_has_priority() {
        assert_eq!(
            UsageType::classify("Electric usage / Natural gas usage"),
            Some(UsageType::Electric)
        );
    }

    // ── CanonicalRecord ───────────────────────────────────────────────────────

    #[test]
    fn test_canonical_record_round_trip_through_record() {
        let canonical = CanonicalRecord {
            date: date(2023, 2, 14),
            kind: "Natural gas usage".to_string(),
            usage: Some(1.25),
            units: Some(Units::Therms),
            cost: None,
        };
        let record: Record = canonical.clone().into();
        assert_eq!(record.get(UNITS).as_str(), Some("therms"));
        assert!(record.get(COST).is_missing());
        assert_eq!(CanonicalRecord::from_record(&record), Some(canonical));
    }

    #[test]
    fn test_canonical_record_requires_date_and_type() {
        let record = Record::new().with(TYPE, "Electric usage");
        assert!(CanonicalRecord::from_record(&record).is_none());
    }
}
