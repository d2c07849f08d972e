//! Command-line argument definitions using clap

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::{
    AgeBinner, Attribute, ColumnMapping, ExtractionOptions, UnknownPolicy, DEFAULT_UNKNOWN_TOKENS,
};

/// cohortbal - Balance two cohorts on their demographic mix by stratified undersampling
#[derive(Parser, Debug)]
#[command(name = "cohortbal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input file(s) (CSV, Parquet, or JSON). Give one file holding both cohorts,
    /// or one file per cohort. Files without the cohort column are labelled
    /// with their file stem.
    #[arg(short, long, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Output file path (CSV or Parquet, determined by extension).
    /// Defaults to the first input's directory with a '_balanced' suffix
    /// (e.g., cases.csv → cases_balanced.csv). JSON input defaults to CSV output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// The two cohort labels to balance (comma-separated).
    /// Rows with other labels are ignored. Default: the input must hold exactly two labels.
    #[arg(long, value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Seed for the weighted sampler. The same seed and input always give the same cohort.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Column holding file object ids (GUIDs). When set, a download manifest
    /// is written for the balanced cohort.
    #[arg(long)]
    pub object_id_column: Option<String>,

    /// Manifest output path. Defaults to '<input stem>_manifest.json' when
    /// --object-id-column is set.
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Skip writing the JSON balance report
    #[arg(long, default_value = "false")]
    pub no_report: bool,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV and JSON).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

/// Column names and stratification settings shared by the balancing commands
#[derive(Args, Debug, Clone)]
pub struct ColumnArgs {
    /// Column holding the cohort label
    #[arg(long, default_value = "cohort")]
    pub group_column: String,

    /// Column holding the record identifier
    #[arg(long, default_value = "case_id")]
    pub id_column: String,

    #[arg(long, default_value = "sex")]
    pub sex_column: String,

    #[arg(long, default_value = "ethnicity")]
    pub ethnicity_column: String,

    #[arg(long, default_value = "race")]
    pub race_column: String,

    /// Column holding the numeric age
    #[arg(long, default_value = "age_at_index")]
    pub age_column: String,

    /// Attributes to stratify on, in order (comma-separated).
    /// Options: sex, ethnicity, race, age
    #[arg(short, long, value_delimiter = ',', default_value = "sex,ethnicity,race,age")]
    pub attributes: Vec<Attribute>,

    /// Age bin edges (comma-separated, strictly increasing).
    /// Ages below the first edge and at/above the last get open-ended bins.
    #[arg(long, value_delimiter = ',', default_value = "0,20,30,40,50,60,70,80", allow_negative_numbers = true)]
    pub age_bins: Vec<f64>,

    /// Fail on missing or "Not Reported" values instead of stratifying them as their own bucket
    #[arg(long, default_value = "false")]
    pub strict_unknowns: bool,
}

impl ColumnArgs {
    pub fn mapping(&self, object_id: Option<String>) -> ColumnMapping {
        ColumnMapping {
            id: self.id_column.clone(),
            group: self.group_column.clone(),
            sex: self.sex_column.clone(),
            ethnicity: self.ethnicity_column.clone(),
            race: self.race_column.clone(),
            age: self.age_column.clone(),
            object_id,
        }
    }

    pub fn unknown_policy(&self) -> UnknownPolicy {
        if self.strict_unknowns {
            UnknownPolicy::Reject
        } else {
            UnknownPolicy::Bucket
        }
    }

    /// Validated stratification attributes, duplicates removed in order
    pub fn selectors(&self) -> Result<Vec<Attribute>> {
        let mut selectors: Vec<Attribute> = Vec::with_capacity(self.attributes.len());
        for attr in &self.attributes {
            if !selectors.contains(attr) {
                selectors.push(*attr);
            }
        }
        if selectors.is_empty() {
            bail!("At least one stratification attribute is required");
        }
        Ok(selectors)
    }

    /// Build record extraction options, validating the age bins
    pub fn extraction_options(&self, object_id: Option<String>) -> Result<ExtractionOptions> {
        Ok(ExtractionOptions {
            columns: self.mapping(object_id),
            selectors: self.selectors()?,
            binner: AgeBinner::new(self.age_bins.clone())?,
            unknown_policy: self.unknown_policy(),
            unknown_tokens: DEFAULT_UNKNOWN_TOKENS.iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn attributes_label(&self) -> String {
        self.attributes
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the stratum frequency table of each cohort without sampling
    Strata {
        /// Input file(s) (CSV, Parquet, or JSON)
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        #[command(flatten)]
        columns: ColumnArgs,

        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },

    /// Write a download manifest from a cohort table
    Manifest {
        /// Input file path (CSV, Parquet, or JSON)
        input: PathBuf,

        /// Output manifest path (optional, defaults to '<input stem>_manifest.json')
        output: Option<PathBuf>,

        /// Column holding file object ids
        #[arg(long, default_value = "object_id")]
        object_id_column: String,

        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },

    /// Download every file in a manifest with the external download client
    Download {
        /// Manifest path (JSON array of {"object_id": ...})
        manifest: PathBuf,

        /// Directory to download into
        #[arg(short, long, default_value = "downloads")]
        dest: PathBuf,

        /// Download client executable
        #[arg(long, default_value = "gen3-client")]
        client: PathBuf,

        /// Credential profile configured in the download client
        #[arg(short, long)]
        profile: String,

        /// Skip interactive confirmation prompts
        #[arg(long, default_value = "false")]
        no_confirm: bool,
    },
}

impl Cli {
    /// Get the first input path, if any was given
    pub fn primary_input(&self) -> Option<&PathBuf> {
        self.input.first()
    }

    /// Get the output path, deriving from the first input if not explicitly provided.
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.primary_input()?;
        Some(self.output.clone().unwrap_or_else(|| {
            let extension = match input.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("parquet") => "parquet",
                _ => "csv",
            };
            sibling_path(input, &format!("_balanced.{}", extension))
        }))
    }

    /// Get the balance report path, derived from the first input
    pub fn report_path(&self) -> Option<PathBuf> {
        let input = self.primary_input()?;
        Some(sibling_path(input, "_balance_report.json"))
    }

    /// Get the manifest path: explicit, or derived when an object id column is set
    pub fn manifest_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.manifest {
            return Some(path.clone());
        }
        self.object_id_column.as_ref()?;
        let input = self.primary_input()?;
        Some(sibling_path(input, "_manifest.json"))
    }

    /// The explicit cohort label pair, if any
    pub fn group_labels(&self) -> Result<Option<(String, String)>> {
        match self.groups.as_slice() {
            [] => Ok(None),
            [a, b] => Ok(Some((a.clone(), b.clone()))),
            other => bail!(
                "--groups takes exactly two labels, got {}: {:?}",
                other.len(),
                other
            ),
        }
    }
}

/// Path next to `input` named '<stem><suffix>'
pub fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    parent.join(format!("{}{}", stem, suffix))
}
