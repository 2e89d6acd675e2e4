mod bootstrap;

use anyhow::Result;
use usage_core::settings::Settings;
use usage_runtime::pipeline::ReportPipeline;
use usage_ui::report::{render_json, render_report};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("pge-usage v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Path: {}, recursive: {}, jobs: {}, format: {}",
        settings.path.display(),
        settings.recursive(),
        settings.jobs,
        settings.format
    );

    let pipeline = ReportPipeline::from_settings(&settings)?;
    let outcome = pipeline.run().await?;

    if outcome.no_data() {
        println!("No data loaded.");
        return Ok(());
    }
    if outcome.no_matches() {
        tracing::warn!(
            "{} records loaded but none are electric or gas readings matching the filters",
            outcome.load.table.len()
        );
        println!("No matching records.");
        return Ok(());
    }

    for skipped in &outcome.load.skipped {
        tracing::debug!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    tracing::info!(
        "Loaded {} records from {} of {} files; {} after filters",
        outcome.load.table.len(),
        outcome.load.files_loaded,
        outcome.load.files_found,
        outcome.filtered.len()
    );

    match settings.format.as_str() {
        "json" => println!("{}", render_json(&outcome.summary)?),
        _ => print!("{}", render_report(&outcome.summary)),
    }

    Ok(())
}
