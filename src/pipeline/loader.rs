//! Dataset loader and writer for CSV, Parquet and JSON cohort exports

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::utils::{create_spinner, finish_with_success};

/// Separator used when list cells are written to CSV
pub const LIST_SEPARATOR: &str = ";";

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset from a file (CSV, Parquet or JSON based on extension)
///
/// JSON files must hold an array of flat objects, as exported by the data
/// commons query client. Array-valued fields load as list columns.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    let extension = extension_of(path);

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        "json" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open JSON file: {}", path.display()))?;
            JsonReader::new(file)
                .infer_schema_len(schema_length.and_then(std::num::NonZeroUsize::new))
                .finish()
                .with_context(|| format!("Failed to load JSON file: {}", path.display()))?
                .lazy()
        }
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet, json",
            extension
        ),
    };

    Ok(lf)
}

/// Load one or more cohort files into a single table.
///
/// A file without `group_column` gets its file stem as the cohort label.
/// Files are concatenated diagonally: missing columns are filled with nulls and
/// differing column types are widened to a common supertype.
pub fn load_cohort_inputs(
    paths: &[impl AsRef<Path>],
    group_column: &str,
    infer_schema_length: usize,
) -> Result<DataFrame> {
    if paths.is_empty() {
        anyhow::bail!("At least one input file is required");
    }

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let mut lf = load_dataset(path, infer_schema_length)?;
        let schema = lf
            .collect_schema()
            .with_context(|| format!("Failed to read schema of {}", path.display()))?;

        if schema.get(group_column).is_none() {
            let label = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("cohort")
                .to_string();
            log::info!(
                "{} has no '{}' column; labelling its rows '{}'",
                path.display(),
                group_column,
                label
            );
            lf = lf.with_column(lit(label).alias(group_column));
        }
        frames.push(lf);
    }

    let combined = if frames.len() == 1 {
        frames.remove(0)
    } else {
        concat_lf_diagonal(
            frames,
            UnionArgs {
                to_supertypes: true,
                ..Default::default()
            },
        )
        .context("Failed to combine input files")?
    };

    combined.collect().context("Failed to collect cohort data")
}

/// Load cohort files behind a spinner, returning the table with its shape and
/// estimated memory footprint in MB.
pub fn load_dataset_with_progress(
    paths: &[impl AsRef<Path>],
    group_column: &str,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let spinner = create_spinner("Loading cohort data...");
    let df = load_cohort_inputs(paths, group_column, infer_schema_length)?;
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    finish_with_success(&spinner, &format!("Loaded {} rows", rows));
    Ok((df, rows, cols, memory_mb))
}

/// Column names of a dataset, without loading its rows
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let mut lf = load_dataset(path, 100)?;
    let schema = lf.collect_schema()?;
    Ok(schema.iter_names().map(|s| s.to_string()).collect())
}

/// Save dataset to file (CSV or Parquet based on extension)
///
/// CSV cannot hold nested values, so list columns are joined with
/// `LIST_SEPARATOR` before writing.
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = extension_of(path);

    match extension.as_str() {
        "csv" => {
            stringify_list_columns(df)?;
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}

/// Replace every list column with its elements joined by `LIST_SEPARATOR`
pub fn stringify_list_columns(df: &mut DataFrame) -> Result<()> {
    let list_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::List(_)))
        .map(|c| c.name().to_string())
        .collect();

    for name in list_columns {
        let series = df.column(&name)?.as_materialized_series().clone();
        let mut joined: Vec<Option<String>> = Vec::with_capacity(series.len());
        for cell in series.list()?.into_iter() {
            joined.push(match cell {
                Some(inner) => {
                    let inner = inner.cast(&DataType::String)?;
                    let parts: Vec<&str> = inner.str()?.into_iter().flatten().collect();
                    Some(parts.join(LIST_SEPARATOR))
                }
                None => None,
            });
        }
        df.with_column(Column::new(name.as_str().into(), joined))?;
    }

    Ok(())
}
