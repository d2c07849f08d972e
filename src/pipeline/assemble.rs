//! Balanced cohort assembly and verification aggregates

use std::collections::BTreeMap;

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::error::BalanceError;
use super::record::{Attribute, Record, StratumValue};
use super::weights::WeightedRecord;

/// Counts of one attribute value, broken out by cohort label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeCount {
    pub attribute: Attribute,
    pub value: StratumValue,
    pub counts: BTreeMap<String, usize>,
}

/// The final union of the reference group and the sampled larger group
#[derive(Debug, Clone, PartialEq)]
pub struct BalancedCohort {
    /// Reference records first, then the sampled records
    pub records: Vec<Record>,
    /// Row count per cohort label, labels with no rows included
    pub group_counts: BTreeMap<String, usize>,
    /// Attribute value counts per cohort label
    pub attribute_counts: Vec<AttributeCount>,
}

impl BalancedCohort {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when every cohort label has the same number of rows
    pub fn is_balanced(&self) -> bool {
        let mut counts = self.group_counts.values();
        match counts.next() {
            Some(first) => counts.all(|c| c == first),
            None => true,
        }
    }

    /// Source row indices in output order
    pub fn row_indices(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.row).collect()
    }

    /// Materialize the cohort from the combined source table, keeping its schema
    pub fn take_rows(&self, source: &DataFrame) -> Result<DataFrame, BalanceError> {
        let indices: Vec<IdxSize> = self.records.iter().map(|r| r.row as IdxSize).collect();
        let idx = IdxCa::from_vec("idx".into(), indices);
        Ok(source.take(&idx)?)
    }

    /// Counts for one attribute, in value order
    pub fn counts_for(&self, attribute: Attribute) -> impl Iterator<Item = &AttributeCount> {
        self.attribute_counts
            .iter()
            .filter(move |c| c.attribute == attribute)
    }
}

/// Union the untouched reference group with the sampled larger group.
///
/// # Arguments
/// * `reference` - Records of the smaller group, kept as-is
/// * `sampled` - Sampled records of the larger group; weights are dropped
/// * `labels` - Every cohort label that should appear in the counts
/// * `selectors` - Attributes to aggregate for verification
pub fn assemble(
    reference: &[Record],
    sampled: &[WeightedRecord],
    labels: &[String],
    selectors: &[Attribute],
) -> BalancedCohort {
    let records: Vec<Record> = reference
        .iter()
        .cloned()
        .chain(sampled.iter().map(|w| w.record.clone()))
        .collect();

    let mut group_counts: BTreeMap<String, usize> =
        labels.iter().map(|l| (l.clone(), 0)).collect();
    for record in &records {
        *group_counts.entry(record.group.clone()).or_insert(0) += 1;
    }

    let attribute_counts = selectors
        .par_iter()
        .map(|attribute| count_attribute(&records, *attribute, labels))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    BalancedCohort {
        records,
        group_counts,
        attribute_counts,
    }
}

/// Per-value counts for one attribute, by cohort label
pub fn count_attribute(
    records: &[Record],
    attribute: Attribute,
    labels: &[String],
) -> Vec<AttributeCount> {
    let mut by_value: BTreeMap<&StratumValue, BTreeMap<String, usize>> = BTreeMap::new();

    for record in records {
        let Some(value) = record.value(attribute) else {
            continue;
        };
        let counts = by_value
            .entry(value)
            .or_insert_with(|| labels.iter().map(|l| (l.clone(), 0)).collect());
        *counts.entry(record.group.clone()).or_insert(0) += 1;
    }

    by_value
        .into_iter()
        .map(|(value, counts)| AttributeCount {
            attribute,
            value: value.clone(),
            counts,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECTORS: [Attribute; 1] = [Attribute::Sex];

    fn rec(row: usize, group: &str, sex: &str) -> Record {
        Record::new(row, format!("id{}", row), group).with(Attribute::Sex, sex)
    }

    fn weighted(record: Record) -> WeightedRecord {
        WeightedRecord {
            stratum: record.stratum(&SELECTORS).unwrap(),
            record,
            weight: 1.0,
        }
    }

    fn labels() -> Vec<String> {
        vec!["mild".to_string(), "severe".to_string()]
    }

    #[test]
    fn test_union_keeps_reference_first() {
        let reference = vec![rec(4, "mild", "F"), rec(5, "mild", "M")];
        let sampled = vec![weighted(rec(0, "severe", "F")), weighted(rec(2, "severe", "M"))];
        let cohort = assemble(&reference, &sampled, &labels(), &SELECTORS);

        assert_eq!(cohort.len(), 4);
        assert_eq!(cohort.row_indices(), vec![4, 5, 0, 2]);
        assert!(cohort.is_balanced());
        assert_eq!(cohort.group_counts["mild"], 2);
        assert_eq!(cohort.group_counts["severe"], 2);
    }

    #[test]
    fn test_attribute_counts_by_group() {
        let reference = vec![rec(0, "mild", "F"), rec(1, "mild", "F")];
        let sampled = vec![weighted(rec(2, "severe", "F")), weighted(rec(3, "severe", "M"))];
        let cohort = assemble(&reference, &sampled, &labels(), &SELECTORS);

        let sex: Vec<_> = cohort.counts_for(Attribute::Sex).collect();
        assert_eq!(sex.len(), 2);
        assert_eq!(sex[0].value.to_string(), "F");
        assert_eq!(sex[0].counts["mild"], 2);
        assert_eq!(sex[0].counts["severe"], 1);
        assert_eq!(sex[1].value.to_string(), "M");
        assert_eq!(sex[1].counts["mild"], 0);
        assert_eq!(sex[1].counts["severe"], 1);
    }

    #[test]
    fn test_empty_sample_returns_reference_only() {
        let reference = vec![rec(0, "mild", "F"), rec(1, "mild", "M")];
        let cohort = assemble(&reference, &[], &labels(), &SELECTORS);

        assert_eq!(cohort.records, reference);
        assert_eq!(cohort.group_counts["mild"], 2);
        assert_eq!(cohort.group_counts["severe"], 0);
        assert!(!cohort.is_balanced());
    }

    #[test]
    fn test_take_rows_preserves_schema() {
        let source = df! {
            "case_id" => ["a", "b", "c"],
            "sex" => ["F", "M", "F"],
        }
        .unwrap();
        let reference = vec![rec(2, "mild", "F")];
        let sampled = vec![weighted(rec(0, "severe", "F"))];
        let cohort = assemble(&reference, &sampled, &labels(), &SELECTORS);

        let out = cohort.take_rows(&source).unwrap();
        assert_eq!(out.get_column_names(), source.get_column_names());
        let ids: Vec<Option<&str>> = out.column("case_id").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("c"), Some("a")]);
    }
}
