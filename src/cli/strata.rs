//! The `strata` command - frequency tables per cohort, no sampling

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use console::style;

use super::args::ColumnArgs;
use crate::pipeline::{
    extract_records, load_cohort_inputs, Attribute, Record, Stage, StageContext,
    StratumFrequencyTable,
};
use crate::report::display_frequency_table;
use crate::utils::create_spinner;

/// Print the stratum frequency table of every cohort found in the inputs
pub fn run_strata(input: &[PathBuf], columns: &ColumnArgs, infer_schema_length: usize) -> Result<()> {
    let options = columns.extraction_options(None)?;

    let spinner = create_spinner("Loading cohort data...");
    let df = load_cohort_inputs(input, &columns.group_column, infer_schema_length)?;
    let records = extract_records(&df, &options).stage(Stage::Extraction)?;
    spinner.finish_and_clear();

    let tables = frequency_tables_by_group(&records, &options.selectors)?;
    for (label, table) in &tables {
        println!();
        println!(
            " {} Cohort {} {}",
            style("◆").cyan().bold(),
            style(label).white().bold(),
            style(format!("({} records)", table.total())).dim()
        );
        display_frequency_table(table);
    }

    Ok(())
}

/// One frequency table per cohort label, in label order
pub fn frequency_tables_by_group(
    records: &[Record],
    selectors: &[Attribute],
) -> Result<BTreeMap<String, StratumFrequencyTable>> {
    let mut groups: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.group.clone())
            .or_default()
            .push(record.clone());
    }

    let mut tables = BTreeMap::new();
    for (label, members) in groups {
        tables.insert(label, StratumFrequencyTable::from_records(&members, selectors)?);
    }
    Ok(tables)
}
