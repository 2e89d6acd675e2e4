//! Concurrent export loading.
//!
//! Reads and normalizes files on tokio's blocking pool, at most `jobs` at a
//! time, then restores discovery order before concatenation so the merged
//! table is identical to a sequential load.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use usage_core::error::{Result, UsageError};
use usage_core::table::Table;
use usage_data::reader::{collect_loaded, find_csv_files, load_directory, load_file, LoadReport};

/// Load every export under `data_path` using up to `jobs` concurrent reads.
///
/// `jobs <= 1` runs the sequential loader on the calling task.
pub async fn load_directory_concurrent(
    data_path: &Path,
    recursive: bool,
    jobs: usize,
) -> Result<LoadReport> {
    if jobs <= 1 {
        return load_directory(data_path, recursive);
    }
    if !data_path.exists() {
        return Err(UsageError::DataPathNotFound(data_path.to_path_buf()));
    }

    let files = find_csv_files(data_path, recursive);
    if files.is_empty() {
        tracing::warn!("No CSV files found in {}", data_path.display());
    }

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks: JoinSet<(usize, PathBuf, Result<Table>)> = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // Held until the file is loaded.
            let _permit = semaphore.acquire_owned().await;
            let blocking_path = path.clone();
            let result = tokio::task::spawn_blocking(move || load_file(&blocking_path))
                .await
                .unwrap_or_else(|e| Err(UsageError::Io(std::io::Error::other(e.to_string()))));
            (index, path, result)
        });
    }

    let mut loaded = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => loaded.push(entry),
            Err(e) => tracing::warn!(error = %e, "load task failed"),
        }
    }
    loaded.sort_by_key(|(index, _, _)| *index);

    let report = collect_loaded(
        loaded
            .into_iter()
            .map(|(_, path, result)| (path, result))
            .collect(),
    );
    tracing::info!(
        records = report.table.len(),
        files_loaded = report.files_loaded,
        files_found = report.files_found,
        jobs,
        "concurrent load finished"
    );
    Ok(report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
