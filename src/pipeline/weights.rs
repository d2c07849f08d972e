//! Inverse-frequency weight assignment and validation

use std::collections::BTreeMap;

use serde::Serialize;

use super::error::BalanceError;
use super::record::{Record, Stratum};
use super::strata::StratumFrequencyTable;

/// A record of the group being downsampled, with its sampling weight
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedRecord {
    pub record: Record,
    pub stratum: Stratum,
    pub weight: f64,
}

/// Per-stratum weighting summary for reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratumWeight {
    pub stratum: Stratum,
    /// Records of this stratum in the reference group
    pub reference_count: usize,
    /// Records of this stratum in the group being weighted
    pub weighted_count: usize,
    pub weight: f64,
}

/// Weight for a stratum: `total / count` when the reference group contains it, else 0.
///
/// The divisor comes from `nonzero_count`, so a zero count can never reach it.
pub fn stratum_weight(reference: &StratumFrequencyTable, stratum: &Stratum) -> f64 {
    match reference.nonzero_count(stratum) {
        Some(count) => reference.total() as f64 / count.get() as f64,
        None => 0.0,
    }
}

/// Assign a sampling weight to every record in `records`.
///
/// # Arguments
/// * `reference` - Frequency table of the smaller (reference) group
/// * `records` - Records of the larger group
///
/// # Returns
/// * `Ok(Vec<WeightedRecord>)` - One entry per input record, in input order
/// * `Err` - If a record lacks one of the table's stratification attributes
///
/// # Behavior
/// - Records whose stratum is absent from the reference group get weight 0
/// - Every weight is finite and non-negative
pub fn assign_weights(
    reference: &StratumFrequencyTable,
    records: &[Record],
) -> Result<Vec<WeightedRecord>, BalanceError> {
    let mut weighted = Vec::with_capacity(records.len());
    let mut unseen = 0usize;

    for record in records {
        let stratum = record.stratum(reference.selectors())?;
        let weight = stratum_weight(reference, &stratum);
        if weight == 0.0 {
            unseen += 1;
        }
        weighted.push(WeightedRecord {
            record: record.clone(),
            stratum,
            weight,
        });
    }

    if unseen > 0 {
        log::warn!(
            "{} of {} record(s) fall in strata absent from the reference group and will never be sampled",
            unseen,
            records.len()
        );
    }

    Ok(weighted)
}

/// Summarize weights per stratum, covering every stratum of the reference
/// table and of the weighted records.
pub fn summarize_weights(
    reference: &StratumFrequencyTable,
    weighted: &[WeightedRecord],
) -> Vec<StratumWeight> {
    let mut weighted_counts: BTreeMap<&Stratum, usize> = BTreeMap::new();
    for w in weighted {
        *weighted_counts.entry(&w.stratum).or_insert(0) += 1;
    }
    for (stratum, _) in reference.iter() {
        weighted_counts.entry(stratum).or_insert(0);
    }

    weighted_counts
        .into_iter()
        .map(|(stratum, weighted_count)| StratumWeight {
            stratum: stratum.clone(),
            reference_count: reference.count(stratum).unwrap_or(0),
            weighted_count,
            weight: stratum_weight(reference, stratum),
        })
        .collect()
}

/// Check that every weight is a valid number.
///
/// # Errors
/// `UndefinedWeight` for the first NaN, infinite, or negative weight.
pub fn validate_weights(weighted: &[WeightedRecord]) -> Result<(), BalanceError> {
    match weighted
        .iter()
        .find(|w| !w.weight.is_finite() || w.weight < 0.0)
    {
        Some(bad) => Err(BalanceError::UndefinedWeight {
            id: bad.record.id.clone(),
            weight: bad.weight,
        }),
        None => Ok(()),
    }
}

/// Calculate the total weight (sum of all weights).
#[inline]
pub fn total_weight(weighted: &[WeightedRecord]) -> f64 {
    weighted.iter().map(|w| w.weight).sum()
}

/// Number of records that can be sampled at all
#[inline]
pub fn positive_weight_count(weighted: &[WeightedRecord]) -> usize {
    weighted.iter().filter(|w| w.weight > 0.0).count()
}
