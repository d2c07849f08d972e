//! Error types for the balancing core.
//!
//! `BalanceError` covers every failure a pure balancing stage can produce.
//! `StageError` tags one of those failures with the stage that raised it, so a
//! caller sees which step of Bin → Frequency → Weight → Sample → Assemble broke.

use std::collections::BTreeMap;
use std::fmt;

use polars::prelude::PolarsError;
use thiserror::Error;

use super::record::Attribute;

/// Errors raised by the balancing stages.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Bin edges are malformed (too few, non-finite, or not strictly increasing).
    #[error("Invalid bin edges {edges:?}: {reason}")]
    InvalidBinEdges { edges: Vec<f64>, reason: String },

    /// The smaller (reference) group has no records.
    #[error("Reference group '{label}' has no records; cannot derive stratum weights")]
    EmptyReferenceGroup { label: String },

    /// More records were requested than have a strictly positive weight.
    #[error(
        "Requested {requested} record(s) but only {available} have a positive weight; \
         some demographic strata are not covered by the reference group"
    )]
    InsufficientPositiveWeightRecords { requested: usize, available: usize },

    /// A weight reaching the sampler is NaN, infinite, or negative.
    #[error("Record '{id}' carries an undefined weight ({weight})")]
    UndefinedWeight { id: String, weight: f64 },

    /// A record has no usable value for a stratification attribute.
    #[error("Record '{id}' has no usable value for attribute '{attribute}'")]
    MissingAttribute { id: String, attribute: Attribute },

    /// A required column is absent from the input table.
    #[error("Column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// The input does not contain exactly two cohort labels.
    #[error("Expected exactly two cohort labels, found {found:?}")]
    GroupCount { found: Vec<String> },

    /// The assembled cohort does not hold the same number of rows per label.
    #[error("Assembled cohort is unbalanced: {counts:?}")]
    Unbalanced { counts: BTreeMap<String, usize> },

    /// The random sampler rejected its input.
    #[error("Weighted sampling failed: {0}")]
    Sampling(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// A step of the balancing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Split,
    FrequencyTable,
    Weighting,
    Sampling,
    Assembly,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extraction => write!(f, "record extraction"),
            Stage::Split => write!(f, "cohort split"),
            Stage::FrequencyTable => write!(f, "frequency table"),
            Stage::Weighting => write!(f, "weighting"),
            Stage::Sampling => write!(f, "sampling"),
            Stage::Assembly => write!(f, "assembly"),
        }
    }
}

/// A `BalanceError` tagged with the pipeline stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    pub source: BalanceError,
}

impl StageError {
    pub fn new(stage: Stage, source: BalanceError) -> Self {
        Self { stage, source }
    }
}

/// Extension for tagging core results with their stage.
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> StageContext<T> for Result<T, BalanceError> {
    fn stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError::new(stage, e))
    }
}
