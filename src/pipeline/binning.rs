//! Age binning for stratification
//!
//! Maps a continuous age onto ordered, half-open bins `[edge[i], edge[i+1])`.
//! Values below the first edge fall into an "under minimum" bucket and values at
//! or above the last edge into an open-ended "N+" bucket, so every finite age
//! has a bin. Missing or non-finite ages get an explicit `Unknown` bucket.

use std::fmt;

use serde::Serialize;

use super::error::BalanceError;

/// Default age edges in years
pub const DEFAULT_AGE_EDGES: [f64; 8] = [0.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];

/// Label used for ages that are missing or not finite
pub const UNKNOWN_AGE_LABEL: &str = "Unknown";

/// An age bin. Bins order by rank, with `Unknown` after every real bin.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum AgeBin {
    Binned { rank: usize, label: String },
    Unknown,
}

impl AgeBin {
    /// Rank of the bin, if it is a real bin
    pub fn rank(&self) -> Option<usize> {
        match self {
            AgeBin::Binned { rank, .. } => Some(*rank),
            AgeBin::Unknown => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AgeBin::Binned { label, .. } => label,
            AgeBin::Unknown => UNKNOWN_AGE_LABEL,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AgeBin::Unknown)
    }
}

impl fmt::Display for AgeBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bins ages against a validated, strictly increasing list of edges.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeBinner {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl AgeBinner {
    /// Create a binner, validating the edges.
    ///
    /// # Errors
    /// `InvalidBinEdges` when there are fewer than 2 edges, an edge is not
    /// finite, or the edges are not strictly increasing.
    pub fn new(edges: Vec<f64>) -> Result<Self, BalanceError> {
        if edges.len() < 2 {
            return Err(BalanceError::InvalidBinEdges {
                reason: format!("at least 2 edges are required, got {}", edges.len()),
                edges,
            });
        }
        if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
            return Err(BalanceError::InvalidBinEdges {
                reason: format!("edge {} is not finite", bad),
                edges,
            });
        }
        if let Some(pair) = edges.windows(2).find(|w| w[0] >= w[1]) {
            return Err(BalanceError::InvalidBinEdges {
                reason: format!(
                    "edges must be strictly increasing ({} is followed by {})",
                    pair[0], pair[1]
                ),
                edges,
            });
        }

        let labels = build_labels(&edges);
        Ok(Self { edges, labels })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// All bin labels in rank order, `Unknown` excluded
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Bin a single age. Non-finite input maps to `AgeBin::Unknown`.
    pub fn bin(&self, age: f64) -> AgeBin {
        if !age.is_finite() {
            return AgeBin::Unknown;
        }
        // Number of edges <= age: 0 means under the minimum, len means at/over the last edge
        let rank = self.edges.partition_point(|&edge| edge <= age);
        AgeBin::Binned {
            rank,
            label: self.labels[rank].clone(),
        }
    }

    /// Bin an optional age, treating `None` as unknown
    pub fn bin_opt(&self, age: Option<f64>) -> AgeBin {
        age.map_or(AgeBin::Unknown, |a| self.bin(a))
    }
}

impl Default for AgeBinner {
    fn default() -> Self {
        let edges = DEFAULT_AGE_EDGES.to_vec();
        let labels = build_labels(&edges);
        Self { edges, labels }
    }
}

fn build_labels(edges: &[f64]) -> Vec<String> {
    let whole = edges.iter().all(|e| e.fract() == 0.0);
    let mut labels = Vec::with_capacity(edges.len() + 1);

    labels.push(format!("<{}", fmt_edge(edges[0])));
    for pair in edges.windows(2) {
        let label = if whole {
            format!("{}-{}", fmt_edge(pair[0]), fmt_edge(pair[1] - 1.0))
        } else {
            format!("{}-{}", fmt_edge(pair[0]), fmt_edge(pair[1]))
        };
        labels.push(label);
    }
    labels.push(format!("{}+", fmt_edge(edges[edges.len() - 1])));

    labels
}

fn fmt_edge(edge: f64) -> String {
    if edge.fract() == 0.0 {
        format!("{}", edge as i64)
    } else {
        format!("{}", edge)
    }
}
