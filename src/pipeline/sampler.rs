//! Weighted sampling without replacement
//!
//! Draws a fixed number of distinct records with inclusion probability
//! proportional to weight. The random generator is seeded from an explicit
//! argument, never from process-wide state, so a seeded draw is reproducible.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::error::BalanceError;
use super::weights::{positive_weight_count, validate_weights, WeightedRecord};

/// Build the generator used for sampling
pub fn sampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Draw `n` distinct records, weight-proportionally and without replacement.
///
/// # Arguments
/// * `weighted` - Candidate records with non-negative weights
/// * `n` - Number of records to draw
/// * `seed` - Optional seed; the same seed, input (including order) and `n`
///   always produce the same sample
///
/// # Returns
/// The sampled records ordered by source row.
///
/// # Errors
/// * `UndefinedWeight` - a weight is NaN, infinite or negative
/// * `InsufficientPositiveWeightRecords` - fewer than `n` records have a positive weight
pub fn weighted_sample(
    weighted: &[WeightedRecord],
    n: usize,
    seed: Option<u64>,
) -> Result<Vec<WeightedRecord>, BalanceError> {
    validate_weights(weighted)?;

    let available = positive_weight_count(weighted);
    if n > available {
        return Err(BalanceError::InsufficientPositiveWeightRecords {
            requested: n,
            available,
        });
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    // Zero-weight records must never be drawn, so they are not candidates at all
    let candidates: Vec<&WeightedRecord> = weighted.iter().filter(|w| w.weight > 0.0).collect();

    let mut rng = sampling_rng(seed);
    let mut sampled: Vec<WeightedRecord> = candidates
        .choose_multiple_weighted(&mut rng, n, |w| w.weight)
        .map_err(|e| BalanceError::Sampling(e.to_string()))?
        .map(|w| (*w).clone())
        .collect();

    sampled.sort_by_key(|w| w.record.row);
    Ok(sampled)
}
