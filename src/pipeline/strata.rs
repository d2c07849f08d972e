//! Stratum frequency tables
//!
//! Counts how often each combination of attribute values occurs in a group.
//! Strata are kept in a `BTreeMap`, so iteration order depends only on the
//! values themselves and results are identical across runs.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use super::error::BalanceError;
use super::record::{Attribute, Record, Stratum};

/// Occurrence counts per stratum for a reference group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StratumFrequencyTable {
    selectors: Vec<Attribute>,
    counts: BTreeMap<Stratum, usize>,
    total: usize,
}

impl StratumFrequencyTable {
    /// Count the strata of `records` over the ordered `selectors`.
    ///
    /// An empty slice produces an empty table with a total of zero.
    pub fn from_records(records: &[Record], selectors: &[Attribute]) -> Result<Self, BalanceError> {
        let mut counts: BTreeMap<Stratum, usize> = BTreeMap::new();
        for record in records {
            *counts.entry(record.stratum(selectors)?).or_insert(0) += 1;
        }

        Ok(Self {
            selectors: selectors.to_vec(),
            counts,
            total: records.len(),
        })
    }

    /// Register every stratum observed in `records` that the table has not seen,
    /// with an explicit count of zero. Existing counts and the total are unchanged.
    ///
    /// Returns the number of strata added.
    pub fn include_observed(&mut self, records: &[Record]) -> Result<usize, BalanceError> {
        let mut added = 0;
        for record in records {
            let stratum = record.stratum(&self.selectors)?;
            if !self.counts.contains_key(&stratum) {
                self.counts.insert(stratum, 0);
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn selectors(&self) -> &[Attribute] {
        &self.selectors
    }

    /// Number of reference records the table was built from
    pub fn total(&self) -> usize {
        self.total
    }

    /// Count for a stratum. `None` means the stratum is not in the table at all;
    /// `Some(0)` means it was registered from another group.
    pub fn count(&self, stratum: &Stratum) -> Option<usize> {
        self.counts.get(stratum).copied()
    }

    /// Count for a stratum that occurs at least once in the reference group
    pub fn nonzero_count(&self, stratum: &Stratum) -> Option<NonZeroUsize> {
        self.count(stratum).and_then(NonZeroUsize::new)
    }

    /// Relative frequency of a stratum in the reference group
    pub fn frequency(&self, stratum: &Stratum) -> f64 {
        match (self.count(stratum), self.total) {
            (Some(count), total) if total > 0 => count as f64 / total as f64,
            _ => 0.0,
        }
    }

    /// Iterate strata and counts in stratum order, zero-count entries included
    pub fn iter(&self) -> impl Iterator<Item = (&Stratum, usize)> {
        self.counts.iter().map(|(s, c)| (s, *c))
    }

    /// Strata with at least one reference record
    pub fn observed(&self) -> impl Iterator<Item = (&Stratum, NonZeroUsize)> {
        self.counts
            .iter()
            .filter_map(|(s, c)| NonZeroUsize::new(*c).map(|c| (s, c)))
    }

    /// Number of strata in the table, zero-count entries included
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECTORS: [Attribute; 2] = [Attribute::Sex, Attribute::Race];

    fn rec(id: &str, sex: &str, race: &str) -> Record {
        Record::new(0, id, "ref")
            .with(Attribute::Sex, sex)
            .with(Attribute::Race, race)
    }

    fn stratum(sex: &str, race: &str) -> Stratum {
        Stratum(vec![sex.into(), race.into()])
    }

    #[test]
    fn test_counts_sum_to_total() {
        let records = vec![rec("1", "M", "A"), rec("2", "M", "A"), rec("3", "F", "B")];
        let table = StratumFrequencyTable::from_records(&records, &SELECTORS).unwrap();

        assert_eq!(table.total(), 3);
        assert_eq!(table.iter().map(|(_, c)| c).sum::<usize>(), 3);
        assert_eq!(table.count(&stratum("M", "A")), Some(2));
        assert_eq!(table.count(&stratum("F", "B")), Some(1));
        assert!((table.frequency(&stratum("M", "A")) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_order_is_independent_of_input_order() {
        let a = vec![rec("1", "M", "A"), rec("2", "F", "B"), rec("3", "F", "A")];
        let b = vec![rec("3", "F", "A"), rec("1", "M", "A"), rec("2", "F", "B")];
        let ta = StratumFrequencyTable::from_records(&a, &SELECTORS).unwrap();
        let tb = StratumFrequencyTable::from_records(&b, &SELECTORS).unwrap();

        let keys_a: Vec<_> = ta.iter().map(|(s, _)| s.clone()).collect();
        let keys_b: Vec<_> = tb.iter().map(|(s, _)| s.clone()).collect();
        assert_eq!(keys_a, keys_b);
        assert_eq!(ta, tb);
    }

    #[test]
    fn test_empty_input() {
        let table = StratumFrequencyTable::from_records(&[], &SELECTORS).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.total(), 0);
        assert_eq!(table.frequency(&stratum("M", "A")), 0.0);
    }

    #[test]
    fn test_include_observed_adds_explicit_zeros() {
        let reference = vec![rec("1", "M", "A")];
        let other = vec![rec("2", "F", "C"), rec("3", "M", "A"), rec("4", "F", "C")];
        let mut table = StratumFrequencyTable::from_records(&reference, &SELECTORS).unwrap();

        assert_eq!(table.include_observed(&other).unwrap(), 1);
        assert_eq!(table.count(&stratum("F", "C")), Some(0));
        assert_eq!(table.nonzero_count(&stratum("F", "C")), None);
        assert_eq!(table.total(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.observed().count(), 1);
    }

    #[test]
    fn test_missing_attribute_is_an_error() {
        let records = vec![Record::new(0, "x", "ref").with(Attribute::Sex, "M")];
        let err = StratumFrequencyTable::from_records(&records, &SELECTORS).unwrap_err();
        assert!(matches!(err, BalanceError::MissingAttribute { attribute: Attribute::Race, .. }));
    }
}
