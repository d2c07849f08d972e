//! Benchmark of record extraction, weighting and sampling for growing cohorts
//!
//! Run with: cargo bench --bench balance_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use cohortbal::pipeline::{
    assign_weights, balance_cohorts, extract_records, weighted_sample, Attribute, BalanceConfig,
    ExtractionOptions, Record, StratumFrequencyTable,
};

const SEXES: [&str; 2] = ["female", "male"];
const ETHNICITIES: [&str; 3] = ["hispanic or latino", "not hispanic or latino", "not reported"];
const RACES: [&str; 4] = ["white", "black or african american", "asian", "not reported"];

/// Generate a two-cohort table where the larger cohort is `ratio` times the smaller
fn generate_cohort_dataframe(reference: usize, ratio: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let rows = reference * (ratio + 1);

    let ids: Vec<String> = (0..rows).map(|i| format!("case-{}", i)).collect();
    let cohort: Vec<&str> = (0..rows)
        .map(|i| if i < reference { "control" } else { "case" })
        .collect();
    let sex: Vec<&str> = (0..rows).map(|_| *SEXES.choose(&mut rng).unwrap_or(&"female")).collect();
    let ethnicity: Vec<&str> = (0..rows)
        .map(|_| *ETHNICITIES.choose(&mut rng).unwrap_or(&"not reported"))
        .collect();
    let race: Vec<&str> = (0..rows)
        .map(|_| *RACES.choose(&mut rng).unwrap_or(&"not reported"))
        .collect();
    // Skew the larger cohort older so the weights matter
    let age: Vec<Option<f64>> = (0..rows)
        .map(|i| {
            if rng.gen::<f64>() < 0.02 {
                None
            } else if i < reference {
                Some(rng.gen_range(18.0..75.0))
            } else {
                Some(rng.gen_range(40.0..95.0))
            }
        })
        .collect();

    DataFrame::new(vec![
        Column::new("case_id".into(), ids),
        Column::new("cohort".into(), cohort),
        Column::new("sex".into(), sex),
        Column::new("ethnicity".into(), ethnicity),
        Column::new("race".into(), race),
        Column::new("age_at_index".into(), age),
    ])
    .expect("Failed to create DataFrame")
}

fn split(records: &[Record]) -> (Vec<Record>, Vec<Record>) {
    records.iter().cloned().partition(|r| r.group == "control")
}

/// Benchmark turning table rows into stratified records
fn benchmark_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    let options = ExtractionOptions::default();

    for reference in [1_000, 10_000, 50_000] {
        let df = generate_cohort_dataframe(reference, 3, 42);
        group.throughput(Throughput::Elements(df.height() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(df.height()), &df, |b, df| {
            b.iter(|| extract_records(black_box(df), &options).expect("extraction failed"))
        });
    }

    group.finish();
}

/// Benchmark weight assignment and weighted sampling separately
fn benchmark_weighting_and_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighting_and_sampling");

    for reference in [1_000, 10_000, 50_000] {
        let df = generate_cohort_dataframe(reference, 3, 7);
        let records = extract_records(&df, &ExtractionOptions::default()).expect("extraction failed");
        let (reference_records, larger) = split(&records);
        let table = StratumFrequencyTable::from_records(&reference_records, &Attribute::ALL)
            .expect("table failed");
        group.throughput(Throughput::Elements(larger.len() as u64));

        group.bench_with_input(BenchmarkId::new("weights", reference), &larger, |b, larger| {
            b.iter(|| assign_weights(black_box(&table), black_box(larger)).expect("weights failed"))
        });

        let weighted = assign_weights(&table, &larger).expect("weights failed");
        let n = reference_records
            .len()
            .min(weighted.iter().filter(|w| w.weight > 0.0).count());
        group.bench_with_input(BenchmarkId::new("sample", reference), &weighted, |b, weighted| {
            b.iter(|| weighted_sample(black_box(weighted), n, Some(42)).expect("sampling failed"))
        });
    }

    group.finish();
}

/// Benchmark the full balancing run, larger-to-smaller ratio varied
fn benchmark_balance_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("balance_ratio");
    let config = BalanceConfig {
        selectors: vec![Attribute::Sex, Attribute::Race],
        seed: Some(42),
        labels: None,
    };
    let options = ExtractionOptions {
        selectors: config.selectors.clone(),
        ..Default::default()
    };

    for ratio in [2, 5, 10] {
        let df = generate_cohort_dataframe(5_000, ratio, 11);
        let records = extract_records(&df, &options).expect("extraction failed");
        group.throughput(Throughput::Elements(records.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(ratio), &records, |b, records| {
            b.iter(|| balance_cohorts(black_box(records.clone()), &config).expect("balancing failed"))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_extraction,
    benchmark_weighting_and_sampling,
    benchmark_balance_ratio
);
criterion_main!(benches);
