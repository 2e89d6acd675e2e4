//! CSV export discovery and loading.
//!
//! Finds utility export files under a directory, skips the free-form
//! preamble each export starts with, parses the rest with the `csv` crate and
//! hands the raw rows to the [`crate::normalizer`].

use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info, warn};
use usage_core::error::{Result, UsageError};
use usage_core::models::CANONICAL_COLUMNS;
use usage_core::table::Table;

use crate::normalizer::normalize;

/// Token that starts the column-header line of every export.
pub const HEADER_MARKER: &str = "TYPE";

const BYTE_ORDER_MARK: char = '\u{feff}';

// ── Raw table ─────────────────────────────────────────────────────────────────

/// Rows of one export file exactly as parsed, before normalization.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell of `row` under `column`, `None` when the column is absent or the
    /// row is short.
    pub fn cell<'a>(&self, row: &'a StringRecord, column: &str) -> Option<&'a str> {
        row.get(self.column_index(column)?)
    }
}

/// Summary of one directory load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// All normalized records, concatenated in discovery order.
    pub table: Table,
    /// Number of `.csv` files discovered.
    pub files_found: usize,
    /// Number of files that contributed a table (possibly empty).
    pub files_loaded: usize,
    /// Files dropped with a warning.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was discovered but contributed no records.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find `.csv` files under `data_path`, sorted by path.
///
/// With `recursive == false` only files directly inside `data_path` are
/// returned.
pub fn find_csv_files(data_path: &Path, recursive: bool) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut walker = walkdir::WalkDir::new(data_path).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Number of leading lines before the header line of `text`.
///
/// The header is the first line starting with [`HEADER_MARKER`]. When no such
/// line exists the total line count is returned, so parsing from there yields
/// an empty table.
pub fn header_offset(text: &str) -> usize {
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
    let mut skipped = 0;
    for line in text.lines() {
        if line.starts_with(HEADER_MARKER) {
            return skipped;
        }
        skipped += 1;
    }
    skipped
}

/// [`header_offset`] for a file on disk.
pub fn find_header_offset(path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path).map_err(|e| UsageError::from_io(path, e))?;
    Ok(header_offset(&text))
}

/// Parse export `text` (preamble included) into a [`RawTable`].
pub fn parse_raw_table(path: &Path, text: &str) -> Result<RawTable> {
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
    let body = skip_lines(text, header_offset(text));

    let csv_err = |source| UsageError::CsvParse {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(csv_err)?;

    Ok(RawTable {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Read and parse one export file.
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).map_err(|e| UsageError::from_io(path, e))?;
    parse_raw_table(path, &text)
}

/// Read, parse and normalize one export file.
///
/// A file without a header line yields an empty table.
pub fn load_file(path: &Path) -> Result<Table> {
    let raw = read_raw_table(path)?;
    if raw.headers.is_empty() {
        debug!("No {} header line in {}", HEADER_MARKER, path.display());
        return Ok(Table::empty(CANONICAL_COLUMNS));
    }
    normalize(&raw)
}

/// Fold per-file results (in discovery order) into a [`LoadReport`].
///
/// Failed files are logged and recorded as skipped; they never abort the
/// load.
pub fn collect_loaded(results: Vec<(PathBuf, Result<Table>)>) -> LoadReport {
    let files_found = results.len();
    let mut tables = Vec::with_capacity(files_found);
    let mut skipped = Vec::new();

    for (path, result) in results {
        match result {
            Ok(table) => {
                debug!("File {}: {} records", path.display(), table.len());
                tables.push(table);
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let table = if tables.is_empty() {
        Table::empty(CANONICAL_COLUMNS)
    } else {
        Table::concat(&tables)
    };

    LoadReport {
        table,
        files_found,
        files_loaded: tables.len(),
        skipped,
    }
}

/// Load every export under `data_path` into one canonical table.
///
/// Fails only when `data_path` itself is missing; per-file problems are
/// recovered and listed in [`LoadReport::skipped`].
pub fn load_directory(data_path: &Path, recursive: bool) -> Result<LoadReport> {
    if !data_path.exists() {
        return Err(UsageError::DataPathNotFound(data_path.to_path_buf()));
    }

    let files = find_csv_files(data_path, recursive);
    if files.is_empty() {
        warn!("No CSV files found in {}", data_path.display());
    }

    let results = files
        .into_iter()
        .map(|path| {
            let result = load_file(&path);
            (path, result)
        })
        .collect();

    let report = collect_loaded(results);
    info!(
        "Loaded {} records from {} of {} files",
        report.table.len(),
        report.files_loaded,
        report.files_found
    );
    Ok(report)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// The suffix of `text` starting at line `n` (0-based).
fn skip_lines(text: &str, n: usize) -> &str {
    let mut start = 0;
    for line in text.split_inclusive('\n').take(n) {
        start += line.len();
    }
    &text[start..]
}

// ── Tests ─────────────────────────────────────────────────────────────────────
