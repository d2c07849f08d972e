//! Download manifests
//!
//! A manifest is a JSON array of `{"object_id": "<guid>"}` objects listing the
//! files referenced by a cohort, in the shape the bulk download client accepts.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One file handle in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub object_id: String,
}

/// Collect object ids from `column`, expanding list cells and skipping nulls.
/// Duplicates are dropped; first-seen order is kept.
pub fn collect_object_ids(df: &DataFrame, column: &str) -> Result<Vec<ManifestEntry>> {
    let series = df
        .column(column)
        .with_context(|| format!("Object id column '{}' not found", column))?
        .as_materialized_series();

    let mut ids: Vec<String> = Vec::new();
    if let DataType::List(_) = series.dtype() {
        for cell in series.list()?.into_iter().flatten() {
            let inner = cell.cast(&DataType::String)?;
            ids.extend(inner.str()?.into_iter().flatten().map(str::to_string));
        }
    } else {
        let cast = series.cast(&DataType::String)?;
        ids.extend(cast.str()?.into_iter().flatten().map(str::to_string));
    }

    let mut seen = HashSet::new();
    Ok(ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .map(|object_id| ManifestEntry { object_id })
        .collect())
}

/// Write a manifest file, returning the number of entries written
pub fn write_manifest(entries: &[ManifestEntry], path: &Path) -> Result<usize> {
    let json = serde_json::to_string_pretty(entries).context("Failed to serialize manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
    Ok(entries.len())
}

/// Read a manifest file
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Manifest is not a JSON array of {{\"object_id\": ...}}: {}", path.display()))
}
