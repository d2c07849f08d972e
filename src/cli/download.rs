//! The `manifest` and `download` commands

use std::path::Path;

use anyhow::Result;
use console::style;

use super::args::sibling_path;
use super::prompts::confirm_download;
use crate::download::{
    collect_object_ids, download_all, read_manifest, write_manifest, CommandFetcher, FetchStatus,
};
use crate::pipeline::load_dataset;
use crate::utils::{create_progress_bar, finish_with_success, finish_with_warning};

/// Write a manifest of every object id in a table
pub fn run_manifest(
    input: &Path,
    output: Option<&Path>,
    object_id_column: &str,
    infer_schema_length: usize,
) -> Result<()> {
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_path(input, "_manifest.json"));

    let df = load_dataset(input, infer_schema_length)?.collect()?;
    let entries = collect_object_ids(&df, object_id_column)?;
    let written = write_manifest(&entries, &output_path)?;

    println!(
        " {} {} object id(s) written to {}",
        style("✓").green().bold(),
        style(written).yellow(),
        style(output_path.display()).dim()
    );
    Ok(())
}

/// Download every manifest entry, one at a time
pub fn run_download(
    manifest: &Path,
    destination: &Path,
    client: &Path,
    profile: &str,
    no_confirm: bool,
) -> Result<()> {
    let entries = read_manifest(manifest)?;
    if entries.is_empty() {
        println!(" {} Manifest is empty, nothing to download", style("ℹ").cyan());
        return Ok(());
    }

    if !no_confirm && !confirm_download(entries.len(), destination)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let fetcher = CommandFetcher::new(client, profile);
    let pb = create_progress_bar(entries.len() as u64, "Downloading");
    let report = download_all(&fetcher, &entries, destination, |object_id, status| {
        if let FetchStatus::Failed(detail) = status {
            pb.println(format!("    {} {}: {}", style("✗").red(), object_id, detail));
        }
        pb.inc(1);
    })?;

    let downloaded = report.count(|s| *s == FetchStatus::Downloaded);
    let skipped = report.count(|s| *s == FetchStatus::Skipped);
    let failed = report.failures().count();
    let unknown = report.count(|s| *s == FetchStatus::Unknown);
    let message = format!(
        "{} downloaded, {} skipped, {} failed, {} unconfirmed",
        downloaded, skipped, failed, unknown
    );

    if failed > 0 {
        finish_with_warning(&pb, &message);
        anyhow::bail!("{} of {} download(s) failed", failed, entries.len());
    }
    finish_with_success(&pb, &message);
    Ok(())
}
