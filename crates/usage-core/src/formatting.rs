/// Text shown for a missing amount.
pub const NOT_AVAILABLE: &str = "N/A";

/// Format a usage quantity with two decimals followed by its unit.
///
/// # Examples
///
/// ```
/// use usage_core::formatting::format_usage;
///
/// assert_eq!(format_usage(Some(1234.5), "kWh"), "1234.50 kWh");
/// assert_eq!(format_usage(Some(-3.0), "kWh"), "-3.00 kWh");
/// assert_eq!(format_usage(None, "therms"), "N/A");
/// ```
pub fn format_usage(amount: Option<f64>, unit: &str) -> String {
    match amount {
        Some(value) => format!("{:.2} {}", value, unit),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Format a cost as dollars with two decimals.
///
/// # Examples
///
/// ```
/// use usage_core::formatting::format_cost;
///
/// assert_eq!(format_cost(Some(1234.5)), "$1234.50");
/// assert_eq!(format_cost(Some(-9.99)), "$-9.99");
/// assert_eq!(format_cost(None), "N/A");
/// ```
pub fn format_cost(amount: Option<f64>) -> String {
    match amount {
        Some(value) => format!("${:.2}", value),
        None => NOT_AVAILABLE.to_string(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
