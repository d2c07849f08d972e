//! The default balance command

use std::time::Instant;

use anyhow::{Context, Result};
use console::style;

use super::args::Cli;
use super::prompts::confirm_write;
use crate::download::{collect_object_ids, write_manifest};
use crate::pipeline::{
    balance_cohorts, extract_records, load_dataset_with_progress, save_dataset, BalanceConfig,
    Stage, StageContext,
};
use crate::report::{
    display_attribute_counts, display_balance_summary, display_stratum_weights, BalanceReport,
    ReportParams, TimingInfo,
};
use crate::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config,
    print_count, print_info, print_step_header, print_step_time, print_success, print_warning,
    ConfigCard,
};

/// Run the full balancing pipeline described by the parsed arguments
pub fn run_balance(cli: &Cli) -> Result<()> {
    let run_start = Instant::now();

    if cli.input.is_empty() {
        anyhow::bail!("Input file is required. Use -i/--input to specify one or two files.");
    }
    let output_path = cli
        .output_path()
        .context("Could not derive an output path from the input")?;
    let manifest_path = cli.manifest_path();
    if manifest_path.is_some() && cli.object_id_column.is_none() {
        anyhow::bail!("--manifest requires --object-id-column");
    }
    let labels = cli.group_labels()?;

    // Fail on bad bins or attributes before touching any data
    let options = cli.columns.extraction_options(cli.object_id_column.clone())?;
    let config = BalanceConfig {
        selectors: options.selectors.clone(),
        seed: cli.seed,
        labels,
    };

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        inputs: &cli.input,
        group_column: &cli.columns.group_column,
        output: &output_path,
        attributes: &cli.columns.attributes_label(),
        age_edges: options.binner.edges(),
        seed: cli.seed,
    });

    // Step 1: Load
    print_step_header(1, "Load Cohorts");
    let step_start = Instant::now();
    let (df, rows, cols, memory_mb) =
        load_dataset_with_progress(&cli.input, &cli.columns.group_column, cli.infer_schema_length)?;
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    let load_elapsed = step_start.elapsed();
    print_step_time(load_elapsed);

    // Step 2: Records and strata
    print_step_header(2, "Extract Demographics");
    let step_start = Instant::now();
    let spinner = create_spinner("Binning ages and normalizing categories...");
    let records = extract_records(&df, &options).stage(Stage::Extraction)?;
    finish_with_success(&spinner, "Records extracted");
    let unknown_values = records
        .iter()
        .flat_map(|r| r.attributes.values())
        .filter(|v| v.is_unknown())
        .count();
    if unknown_values > 0 {
        print_count(
            "value(s) not reported",
            unknown_values,
            Some("(stratified as their own bucket)"),
        );
    }

    // Step 3: Balance
    print_step_header(3, "Balance Cohorts");
    let spinner = create_spinner("Weighting strata and sampling...");
    let outcome = balance_cohorts(records, &config)?;
    finish_with_success(&spinner, "Cohorts balanced");
    let balance_elapsed = step_start.elapsed();

    print_count(
        "strata in the reference cohort",
        outcome.table.observed().count(),
        Some(&format!("('{}', {} records)", outcome.reference_label, outcome.reference_size)),
    );
    if outcome.zero_weight_records > 0 {
        print_warning(&format!(
            "{} '{}' record(s) fall in strata absent from '{}' and were never eligible",
            outcome.zero_weight_records, outcome.larger_label, outcome.reference_label
        ));
    }
    if outcome.sampled {
        print_success(&format!(
            "Sampled {} of {} '{}' records",
            outcome.reference_size, outcome.larger_size, outcome.larger_label
        ));
    } else {
        print_info("Cohorts already have equal size; every record was kept");
    }
    print_step_time(balance_elapsed);

    // Step 4: Save
    print_step_header(4, "Save Results");
    if !cli.no_confirm && !confirm_write(outcome.cohort.len(), &output_path)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let step_start = Instant::now();
    let spinner = create_spinner("Writing output file...");
    let mut balanced = outcome.cohort.take_rows(&df)?;
    save_dataset(&mut balanced, &output_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));

    if let (Some(manifest_path), Some(column)) = (&manifest_path, cli.object_id_column.as_deref()) {
        let entries = collect_object_ids(&balanced, column)?;
        let written = write_manifest(&entries, manifest_path)?;
        print_success(&format!(
            "Manifest with {} object id(s) written to {}",
            written,
            manifest_path.display()
        ));
    }
    let save_elapsed = step_start.elapsed();

    if !cli.no_report {
        if let Some(report_path) = cli.report_path() {
            let timing = TimingInfo {
                load_ms: load_elapsed.as_millis() as u64,
                balance_ms: balance_elapsed.as_millis() as u64,
                save_ms: save_elapsed.as_millis() as u64,
                total_ms: run_start.elapsed().as_millis() as u64,
            };
            let params = ReportParams {
                input_files: &cli.input,
                output_file: &output_path,
                manifest_file: manifest_path.as_deref(),
                columns: &options.columns,
                attributes: &options.selectors,
                age_edges: options.binner.edges(),
                unknown_policy: options.unknown_policy,
                seed: cli.seed,
            };
            BalanceReport::new(&outcome, &params, timing).export(&report_path)?;
            print_success(&format!("Report written to {}", report_path.display()));
        }
    }
    print_step_time(save_elapsed);

    display_balance_summary(&outcome);
    display_stratum_weights(&outcome.stratum_weights, &outcome.larger_label);
    display_attribute_counts(&outcome);

    print_completion();
    Ok(())
}
