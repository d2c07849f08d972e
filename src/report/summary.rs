//! Terminal summary of a balancing run

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{BalanceOutcome, StratumFrequencyTable, StratumWeight};

/// Print a table indented to line up with the step output
fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn section(title: &str, icon: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

/// Display the cohort sizes before and after balancing
pub fn display_balance_summary(outcome: &BalanceOutcome) {
    section("BALANCE SUMMARY", "📋");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Cohort").add_attribute(Attribute::Bold),
        Cell::new("Role").add_attribute(Attribute::Bold),
        Cell::new("Before").add_attribute(Attribute::Bold),
        Cell::new("After").add_attribute(Attribute::Bold),
    ]);

    let after = |label: &str| outcome.cohort.group_counts.get(label).copied().unwrap_or(0);

    table.add_row(vec![
        Cell::new(&outcome.reference_label),
        Cell::new("reference"),
        Cell::new(outcome.reference_size).set_alignment(CellAlignment::Right),
        Cell::new(after(&outcome.reference_label)).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new(&outcome.larger_label),
        Cell::new(if outcome.sampled { "undersampled" } else { "unchanged" }),
        Cell::new(outcome.larger_size).set_alignment(CellAlignment::Right),
        Cell::new(after(&outcome.larger_label))
            .set_alignment(CellAlignment::Right)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    let strata_without_reference = outcome
        .stratum_weights
        .iter()
        .filter(|w| w.reference_count == 0)
        .count();

    table.add_row(vec![
        Cell::new("Strata"),
        Cell::new("observed"),
        Cell::new(outcome.table.len()).set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Zero weight"),
        Cell::new("never sampled"),
        Cell::new(outcome.zero_weight_records)
            .set_alignment(CellAlignment::Right)
            .fg(if outcome.zero_weight_records == 0 {
                Color::White
            } else {
                Color::Red
            }),
        Cell::new(format!("{} strata", strata_without_reference)),
    ]);

    print_indented(&table);
}

/// Display per-stratum reference counts and weights
pub fn display_stratum_weights(weights: &[StratumWeight], larger_label: &str) {
    section("STRATUM WEIGHTS", "⚖️ ");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Stratum").add_attribute(Attribute::Bold),
        Cell::new("Reference").add_attribute(Attribute::Bold),
        Cell::new(larger_label).add_attribute(Attribute::Bold),
        Cell::new("Weight").add_attribute(Attribute::Bold),
    ]);

    for w in weights {
        table.add_row(vec![
            Cell::new(w.stratum.to_string()),
            Cell::new(w.reference_count).set_alignment(CellAlignment::Right),
            Cell::new(w.weighted_count).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", w.weight))
                .set_alignment(CellAlignment::Right)
                .fg(if w.weight == 0.0 { Color::Red } else { Color::White }),
        ]);
    }

    print_indented(&table);
}

/// Display attribute value counts per cohort in the balanced output
pub fn display_attribute_counts(outcome: &BalanceOutcome) {
    section("DEMOGRAPHICS AFTER BALANCING", "🧮");

    let labels = [&outcome.reference_label, &outcome.larger_label];
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Attribute").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
        Cell::new(labels[0]).add_attribute(Attribute::Bold),
        Cell::new(labels[1]).add_attribute(Attribute::Bold),
    ]);

    for count in &outcome.cohort.attribute_counts {
        let a = count.counts.get(labels[0]).copied().unwrap_or(0);
        let b = count.counts.get(labels[1]).copied().unwrap_or(0);
        table.add_row(vec![
            Cell::new(count.attribute.to_string()),
            Cell::new(count.value.to_string()),
            Cell::new(a).set_alignment(CellAlignment::Right),
            Cell::new(b)
                .set_alignment(CellAlignment::Right)
                .fg(if a == b { Color::Green } else { Color::Yellow }),
        ]);
    }

    print_indented(&table);
}

/// Display a bare frequency table (used by the `strata` command)
pub fn display_frequency_table(table_data: &StratumFrequencyTable) {
    section("STRATUM FREQUENCIES", "📊");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Stratum").add_attribute(Attribute::Bold),
        Cell::new("Count").add_attribute(Attribute::Bold),
        Cell::new("Share").add_attribute(Attribute::Bold),
    ]);

    for (stratum, count) in table_data.iter() {
        table.add_row(vec![
            Cell::new(stratum.to_string()),
            Cell::new(count).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", table_data.frequency(stratum) * 100.0))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(table_data.total())
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);

    print_indented(&table);
}
