//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a two-cohort DataFrame with known strata
///
/// This DataFrame includes:
/// - `mild`: 4 records, the reference cohort
/// - `severe`: 8 records; 6 share a stratum with `mild`, 2 do not
///   (`M/Hispanic/white/80+` and `F/Not Hispanic/asian/60-69`)
/// - one "Not Reported" ethnicity and one missing age per cohort
pub fn create_cohort_dataframe() -> DataFrame {
    df! {
        "case_id" => ["m1", "m2", "m3", "m4",
                      "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8"],
        "cohort" => ["mild", "mild", "mild", "mild",
                     "severe", "severe", "severe", "severe", "severe", "severe", "severe", "severe"],
        "sex" => ["female", "male", "female", "male",
                  "female", "male", "female", "male", "female", "male", "female", "male"],
        "ethnicity" => ["not hispanic or latino", "not hispanic or latino", "hispanic or latino", "Not Reported",
                        "not hispanic or latino", "not hispanic or latino", "hispanic or latino", "not reported",
                        "not hispanic or latino", "hispanic or latino", "not hispanic or latino", "not hispanic or latino"],
        "race" => ["white", "white", "black", "asian",
                   "white", "white", "black", "asian", "white", "white", "asian", "white"],
        "age_at_index" => [Some(45.0f64), Some(52.0), Some(33.0), None,
                           Some(47.0), Some(55.0), Some(38.0), None, Some(41.0), Some(90.0), Some(65.0), Some(59.0)],
        "object_id" => ["dg.m1", "dg.m2", "dg.m3", "dg.m4",
                        "dg.s1", "dg.s2", "dg.s3", "dg.s4", "dg.s5", "dg.s6", "dg.s7", "dg.s8"],
    }
    .unwrap()
}

/// Create a larger random two-cohort DataFrame for property tests
pub fn create_random_cohort_dataframe(reference: usize, larger: usize, seed: u64) -> DataFrame {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let rows = reference + larger;
    let sexes = ["female", "male"];
    let races = ["white", "black", "asian"];

    let ids: Vec<String> = (0..rows).map(|i| format!("case-{}", i)).collect();
    let cohorts: Vec<&str> = (0..rows)
        .map(|i| if i < reference { "control" } else { "case" })
        .collect();
    let sex: Vec<&str> = (0..rows).map(|_| sexes[rng.gen_range(0..2)]).collect();
    let race: Vec<&str> = (0..rows).map(|_| races[rng.gen_range(0..3)]).collect();
    let ethnicity: Vec<&str> = (0..rows).map(|_| "not hispanic or latino").collect();
    let age: Vec<f64> = (0..rows).map(|_| rng.gen_range(18.0..90.0)).collect();

    DataFrame::new(vec![
        Column::new("case_id".into(), ids),
        Column::new("cohort".into(), cohorts),
        Column::new("sex".into(), sex),
        Column::new("ethnicity".into(), ethnicity),
        Column::new("race".into(), race),
        Column::new("age_at_index".into(), age),
    ])
    .unwrap()
}

/// Rows of `df` whose cohort column equals `label`, without the cohort column
pub fn cohort_subset(df: &DataFrame, label: &str) -> DataFrame {
    df.clone()
        .lazy()
        .filter(col("cohort").eq(lit(label)))
        .drop(["cohort"])
        .collect()
        .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("cohorts.csv");
    write_csv(df, &csv_path);
    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("cohorts.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Write `df` as CSV at `path`
pub fn write_csv(df: &mut DataFrame, path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
}

/// Write raw JSON text at `dir/name`
pub fn write_json(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// Read a CSV file eagerly
pub fn read_csv(path: &Path) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .unwrap()
        .finish()
        .unwrap()
}

/// Count rows per value of a string column
pub fn value_counts(df: &DataFrame, column: &str) -> std::collections::BTreeMap<String, usize> {
    let mut counts = std::collections::BTreeMap::new();
    let series = df.column(column).unwrap().cast(&DataType::String).unwrap();
    for value in series.str().unwrap().into_iter().flatten() {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}
