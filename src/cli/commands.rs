//! CLI command implementations.

use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::intake::{sweep_aged, IntakeConfig, IntakePipeline, SweepMode};
use crate::storage::LocalBlobStore;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    println!(
        "{} Starting camintake server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Process one archive from the blob store and print a summary.
pub async fn cmd_process(settings: &Settings, archive_key: &str) -> anyhow::Result<()> {
    let store = Arc::new(LocalBlobStore::new(&settings.blob_root));
    let pipeline = IntakePipeline::new(store, IntakeConfig::from_settings(settings));

    println!("  {} Processing: {}", style("→").cyan(), archive_key);

    let outcome = pipeline.process(archive_key).await?;

    println!(
        "  {} Extracted {} files ({} skipped)",
        style("✓").green(),
        outcome.manifest.files.len(),
        outcome.manifest.skipped.len()
    );
    for skipped in &outcome.manifest.skipped {
        println!(
            "    {} {} ({})",
            style("-").dim(),
            skipped.name,
            skipped.reason
        );
    }
    for document in &outcome.documents {
        println!(
            "  {} {} [{}] {} chars of text",
            style("✓").green(),
            document.name,
            document.mime_type,
            document.ocr_text.len()
        );
    }
    println!(
        "  {} Request {} complete",
        style("✓").green(),
        outcome.request_id
    );

    Ok(())
}

/// Sweep aged artifacts from the uploads directory.
pub fn cmd_cleanup(settings: &Settings, age_threshold: f64, mode: &str) -> anyhow::Result<()> {
    let mode = SweepMode::parse(mode);
    let report = sweep_aged(&settings.uploads_dir, age_threshold, mode);

    if report.errors > 0 {
        println!(
            "  {} Deleted {} items, {} errors (see logs)",
            style("!").yellow(),
            report.deleted,
            report.errors
        );
    } else {
        println!("  {} Deleted {} items", style("✓").green(), report.deleted);
    }
    Ok(())
}

/// Parse a bind address that can be:
/// - Just a port: "3030" -> 127.0.0.1:3030
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3030
/// - Host and port: "0.0.0.0:3030" -> 0.0.0.0:3030
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    Ok((bind.to_string(), 3030))
}
