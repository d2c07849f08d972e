//! JSON balance report
//!
//! Records how a balanced cohort was produced: the run settings, group sizes,
//! the weight of every stratum, and the verification counts. The report is the
//! audit trail for records excluded by a zero weight.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{AttributeCount, Attribute, BalanceOutcome, ColumnMapping, StratumWeight, UnknownPolicy};

/// Metadata about the balancing run
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Timestamp of the run (RFC 3339)
    pub timestamp: String,
    pub cohortbal_version: String,
    pub input_files: Vec<String>,
    pub output_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_file: Option<String>,
    pub columns: ColumnMapping,
    pub attributes: Vec<Attribute>,
    pub age_edges: Vec<f64>,
    pub unknown_policy: UnknownPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Group sizes before and after balancing
#[derive(Debug, Clone, Serialize)]
pub struct GroupSizes {
    pub reference_label: String,
    pub larger_label: String,
    pub reference_size: usize,
    pub larger_size: usize,
    pub sampled: bool,
    pub zero_weight_records: usize,
    pub after: BTreeMap<String, usize>,
}

/// Timing information in milliseconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimingInfo {
    pub load_ms: u64,
    pub balance_ms: u64,
    pub save_ms: u64,
    pub total_ms: u64,
}

/// Complete balance report
#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub metadata: ReportMetadata,
    pub groups: GroupSizes,
    pub strata: Vec<StratumWeight>,
    pub attribute_counts: Vec<AttributeCount>,
    pub timing: TimingInfo,
}

/// Parameters describing the run, for the report metadata
pub struct ReportParams<'a> {
    pub input_files: &'a [std::path::PathBuf],
    pub output_file: &'a Path,
    pub manifest_file: Option<&'a Path>,
    pub columns: &'a ColumnMapping,
    pub attributes: &'a [Attribute],
    pub age_edges: &'a [f64],
    pub unknown_policy: UnknownPolicy,
    pub seed: Option<u64>,
}

impl BalanceReport {
    pub fn new(outcome: &BalanceOutcome, params: &ReportParams<'_>, timing: TimingInfo) -> Self {
        let metadata = ReportMetadata {
            timestamp: Utc::now().to_rfc3339(),
            cohortbal_version: env!("CARGO_PKG_VERSION").to_string(),
            input_files: params
                .input_files
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            output_file: params.output_file.display().to_string(),
            manifest_file: params.manifest_file.map(|p| p.display().to_string()),
            columns: params.columns.clone(),
            attributes: params.attributes.to_vec(),
            age_edges: params.age_edges.to_vec(),
            unknown_policy: params.unknown_policy,
            seed: params.seed,
        };

        let groups = GroupSizes {
            reference_label: outcome.reference_label.clone(),
            larger_label: outcome.larger_label.clone(),
            reference_size: outcome.reference_size,
            larger_size: outcome.larger_size,
            sampled: outcome.sampled,
            zero_weight_records: outcome.zero_weight_records,
            after: outcome.cohort.group_counts.clone(),
        };

        Self {
            metadata,
            groups,
            strata: outcome.stratum_weights.clone(),
            attribute_counts: outcome.cohort.attribute_counts.clone(),
            timing,
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn export(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize balance report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write balance report: {}", path.display()))?;
        Ok(())
    }
}
