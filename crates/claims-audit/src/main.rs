mod bootstrap;
mod render;

use anyhow::{Context, Result};
use claims_core::settings::Settings;
use claims_data::analysis::audit_directory;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Claims Audit v{} starting", env!("CARGO_PKG_VERSION"));

    let data_path = settings
        .data_path
        .clone()
        .or_else(bootstrap::discover_data_path)
        .context("No data directory given and none found; pass --data-path")?;

    let thresholds = settings
        .resolve_thresholds()
        .context("Invalid thresholds")?;
    tracing::info!(
        "Auditing {} (format: {}, top: {})",
        data_path.display(),
        settings.format,
        settings.top
    );
    tracing::debug!("Thresholds: {:?}", thresholds);

    let outcome = audit_directory(&data_path, &thresholds, settings.top)
        .with_context(|| format!("Audit of {} failed", data_path.display()))?;

    match settings.format.as_str() {
        "json" => println!("{}", render::render_json(&outcome)?),
        _ => println!("{}", render::render_text(&outcome)),
    }

    tracing::info!("Done in {:.3}s", outcome.metadata.elapsed_seconds);
    Ok(())
}
