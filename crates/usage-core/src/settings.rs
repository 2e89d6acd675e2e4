use clap::Parser;
use std::path::PathBuf;

use crate::error::Result;
use crate::filter::Filter;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Year-over-year monthly usage and cost report for utility exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pge-usage",
    about = "Year-over-year monthly usage and cost report for utility exports",
    version
)]
pub struct Settings {
    /// Directory containing the exported CSV files
    #[arg(default_value = "pge_data")]
    pub path: PathBuf,

    /// Only read CSV files directly inside PATH
    #[arg(long)]
    pub no_recursive: bool,

    /// Row filter as COLUMN:OPERATOR:VALUE (operators: contains, equals,
    /// greater_than, less_than); may be repeated
    #[arg(long = "filter", value_name = "COLUMN:OPERATOR:VALUE")]
    pub filters: Vec<String>,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Number of files loaded concurrently (1 loads sequentially)
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..=64))]
    pub jobs: u16,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn parse_from_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Settings::try_parse_from(args).map(Self::resolve)
    }

    pub fn recursive(&self) -> bool {
        !self.no_recursive
    }

    /// Parse every `--filter` expression.
    pub fn parsed_filters(&self) -> Result<Vec<Filter>> {
        self.filters.iter().map(|f| f.parse()).collect()
    }

    fn resolve(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UsageError;
    use crate::filter::Operator;

    fn parse(args: &[&str]) -> Settings {
        let mut full = vec!["pge-usage"];
        full.extend_from_slice(args);
        Settings::parse_from_args(full).expect("valid args")
    }

    #[test]
    fn test_defaults() {
        let s = parse(&[]);
        assert_eq!(s.path, PathBuf::from("pge_data"));
        assert!(s.recursive());
        assert!(s.filters.is_empty());
        assert_eq!(s.format, "table");
        assert_eq!(s.jobs, 4);
        assert_eq!(s.log_level, "INFO");
        assert!(s.log_file.is_none());
    }

    #[test]
    fn test_path_and_no_recursive() {
        let s = parse(&["/exports", "--no-recursive"]);
        assert_eq!(s.path, PathBuf::from("/exports"));
        assert!(!s.recursive());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let s = parse(&["--log-level", "ERROR", "--debug"]);
        assert_eq!(s.log_level, "DEBUG");
    }

    #[test]
    fn test_repeated_filters_parse() {
        let s = parse(&[
            "--filter",
            "TYPE:contains:Electric usage",
            "--filter",
            "YEAR:equals:2024",
        ]);
        let filters = s.parsed_filters().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].operator(), Operator::Contains);
        assert_eq!(filters[1].column(), "YEAR");
    }

    #[test]
    fn test_bad_filter_operator_surfaces() {
        let s = parse(&["--filter", "YEAR:around:2024"]);
        assert!(matches!(
            s.parsed_filters(),
            Err(UsageError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(Settings::parse_from_args(["pge-usage", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_jobs_range_enforced() {
        assert!(Settings::parse_from_args(["pge-usage", "--jobs", "0"]).is_err());
        assert_eq!(parse(&["--jobs", "1"]).jobs, 1);
    }
}
