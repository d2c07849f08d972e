//! Cohort balancing pipeline
//!
//! Splits records into the two cohorts, then runs
//! Frequency Table → Weight Assign → Sample → Assemble on them. Each stage is a
//! pure function of the previous one's output; a failure aborts the run with a
//! `StageError` naming the stage.

use std::collections::BTreeMap;

use super::assemble::{assemble, BalancedCohort};
use super::error::{BalanceError, Stage, StageContext, StageError};
use super::record::{Attribute, Record};
use super::sampler::weighted_sample;
use super::strata::StratumFrequencyTable;
use super::weights::{assign_weights, positive_weight_count, summarize_weights, StratumWeight, WeightedRecord};

/// Settings for one balancing run
#[derive(Debug, Clone)]
pub struct BalanceConfig {
    /// Ordered stratification attributes
    pub selectors: Vec<Attribute>,
    /// Seed for the weighted sampler
    pub seed: Option<u64>,
    /// Restrict the run to these two labels; otherwise exactly two must exist
    pub labels: Option<(String, String)>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            selectors: Attribute::ALL.to_vec(),
            seed: None,
            labels: None,
        }
    }
}

/// Records partitioned into the reference (smaller) and larger cohort
#[derive(Debug, Clone)]
pub struct GroupSplit {
    pub reference_label: String,
    pub reference: Vec<Record>,
    pub larger_label: String,
    pub larger: Vec<Record>,
    /// Records dropped because their label was not selected
    pub excluded: usize,
}

impl GroupSplit {
    pub fn labels(&self) -> Vec<String> {
        vec![self.reference_label.clone(), self.larger_label.clone()]
    }
}

/// Everything produced by a balancing run
#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    pub reference_label: String,
    pub larger_label: String,
    pub reference_size: usize,
    pub larger_size: usize,
    /// Frequency table of the reference group, with larger-group strata as explicit zeros
    pub table: StratumFrequencyTable,
    pub stratum_weights: Vec<StratumWeight>,
    /// Larger-group records that can never be sampled
    pub zero_weight_records: usize,
    /// True when the larger group was reduced; false when the groups were the
    /// same size and every larger-group record was drawn
    pub sampled: bool,
    pub cohort: BalancedCohort,
}

/// Partition records by cohort label.
///
/// The smaller group becomes the reference; on a tie the label that sorts first is.
///
/// # Errors
/// `GroupCount` unless exactly two labels take part.
pub fn split_groups(
    records: Vec<Record>,
    labels: Option<&(String, String)>,
) -> Result<GroupSplit, BalanceError> {
    let mut groups: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    if let Some((a, b)) = labels {
        if a == b {
            return Err(BalanceError::GroupCount {
                found: vec![a.clone()],
            });
        }
        groups.insert(a.clone(), Vec::new());
        groups.insert(b.clone(), Vec::new());
    }

    let mut excluded = 0usize;
    for record in records {
        match groups.get_mut(&record.group) {
            Some(group) => group.push(record),
            None if labels.is_none() => groups.entry(record.group.clone()).or_default().push(record),
            None => excluded += 1,
        }
    }

    let [first, second]: [(String, Vec<Record>); 2] = groups
        .into_iter()
        .collect::<Vec<_>>()
        .try_into()
        .map_err(|found: Vec<(String, Vec<Record>)>| BalanceError::GroupCount {
            found: found.into_iter().map(|(label, _)| label).collect(),
        })?;
    if excluded > 0 {
        log::info!("{} record(s) outside the selected cohorts were excluded", excluded);
    }

    let ((reference_label, reference), (larger_label, larger)) = if second.1.len() < first.1.len() {
        (second, first)
    } else {
        (first, second)
    };

    Ok(GroupSplit {
        reference_label,
        reference,
        larger_label,
        larger,
        excluded,
    })
}

/// Balance two cohorts by stratified, inverse-frequency undersampling.
///
/// # Errors
/// A `StageError` wrapping:
/// * `GroupCount` - not exactly two cohorts (split)
/// * `EmptyReferenceGroup` - the smaller cohort has no records (frequency table)
/// * `MissingAttribute` - a record lacks a stratification value
/// * `InsufficientPositiveWeightRecords` / `UndefinedWeight` (sampling)
pub fn balance_cohorts(records: Vec<Record>, config: &BalanceConfig) -> Result<BalanceOutcome, StageError> {
    let split = split_groups(records, config.labels.as_ref()).stage(Stage::Split)?;
    balance_split(split, config)
}

/// Run the balancing stages on an existing split
pub fn balance_split(split: GroupSplit, config: &BalanceConfig) -> Result<BalanceOutcome, StageError> {
    let labels = split.labels();
    let selectors = &config.selectors;

    if split.reference.is_empty() {
        return Err(StageError::new(
            Stage::FrequencyTable,
            BalanceError::EmptyReferenceGroup {
                label: split.reference_label,
            },
        ));
    }

    let mut table = StratumFrequencyTable::from_records(&split.reference, selectors)
        .stage(Stage::FrequencyTable)?;
    table.include_observed(&split.larger).stage(Stage::FrequencyTable)?;

    let weighted = assign_weights(&table, &split.larger).stage(Stage::Weighting)?;
    let stratum_weights = summarize_weights(&table, &weighted);
    let zero_weight_records = weighted.len() - positive_weight_count(&weighted);

    // Equal sizes still go through the sampler so zero-weight records are never kept
    let n = split.reference.len();
    let sampled = split.larger.len() > n;
    let chosen = weighted_sample(&weighted, n, config.seed).stage(Stage::Sampling)?;

    let cohort = assemble(&split.reference, &chosen, &labels, selectors);
    if !cohort.is_balanced() {
        return Err(StageError::new(
            Stage::Assembly,
            BalanceError::Unbalanced {
                counts: cohort.group_counts,
            },
        ));
    }

    Ok(BalanceOutcome {
        reference_label: split.reference_label,
        larger_label: split.larger_label,
        reference_size: split.reference.len(),
        larger_size: split.larger.len(),
        table,
        stratum_weights,
        zero_weight_records,
        sampled,
        cohort,
    })
}
