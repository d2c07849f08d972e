//! Cohort records and their extraction from tabular exports
//!
//! A `Record` is one case or imaging study with its cohort label and the
//! demographic values used for stratification. Missing categorical values are
//! never left as holes: they become `Category::Unknown`, or an error under the
//! strict policy.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Serialize, Serializer};

use super::binning::{AgeBin, AgeBinner};
use super::error::BalanceError;

/// Label shown for categorical values that were not reported
pub const NOT_REPORTED_LABEL: &str = "Not Reported";

/// Raw values treated as "not reported" (compared case-insensitively)
pub const DEFAULT_UNKNOWN_TOKENS: [&str; 7] =
    ["", "not reported", "unknown", "na", "n/a", "none", "null"];

/// A demographic attribute usable for stratification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Sex,
    Ethnicity,
    Race,
    Age,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Sex,
        Attribute::Ethnicity,
        Attribute::Race,
        Attribute::Age,
    ];
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Sex => write!(f, "sex"),
            Attribute::Ethnicity => write!(f, "ethnicity"),
            Attribute::Race => write!(f, "race"),
            Attribute::Age => write!(f, "age"),
        }
    }
}

impl FromStr for Attribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sex" | "gender" => Ok(Attribute::Sex),
            "ethnicity" => Ok(Attribute::Ethnicity),
            "race" => Ok(Attribute::Race),
            "age" | "age_bin" => Ok(Attribute::Age),
            _ => Err(format!(
                "Unknown attribute: '{}'. Use 'sex', 'ethnicity', 'race' or 'age'.",
                s
            )),
        }
    }
}

/// A categorical value, with an explicit variant for "not reported"
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Known(String),
    Unknown,
}

impl Category {
    /// Normalize a raw cell into a category using the given unknown tokens
    pub fn parse(raw: Option<&str>, unknown_tokens: &[String]) -> Self {
        match raw.map(str::trim) {
            Some(value) if !is_unknown_token(value, unknown_tokens) => {
                Category::Known(value.to_string())
            }
            _ => Category::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Category::Unknown)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Known(v) => f.write_str(v),
            Category::Unknown => f.write_str(NOT_REPORTED_LABEL),
        }
    }
}

fn is_unknown_token(value: &str, unknown_tokens: &[String]) -> bool {
    unknown_tokens
        .iter()
        .any(|token| token.eq_ignore_ascii_case(value))
}

/// The value of one attribute for one record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StratumValue {
    Category(Category),
    Age(AgeBin),
}

impl StratumValue {
    pub fn is_unknown(&self) -> bool {
        match self {
            StratumValue::Category(c) => c.is_unknown(),
            StratumValue::Age(a) => a.is_unknown(),
        }
    }
}

impl fmt::Display for StratumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StratumValue::Category(c) => c.fmt(f),
            StratumValue::Age(a) => a.fmt(f),
        }
    }
}

impl Serialize for StratumValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for StratumValue {
    fn from(value: &str) -> Self {
        StratumValue::Category(Category::Known(value.to_string()))
    }
}

/// A combination of attribute values, ordered like the selector list
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Stratum(pub Vec<StratumValue>);

impl Stratum {
    pub fn values(&self) -> &[StratumValue] {
        &self.0
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// One case or study taking part in balancing
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Row index in the combined source table
    pub row: usize,
    pub id: String,
    /// Cohort label, e.g. "severe" or "mild"
    pub group: String,
    pub attributes: BTreeMap<Attribute, StratumValue>,
}

impl Record {
    pub fn new(row: usize, id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            row,
            id: id.into(),
            group: group.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, attribute: Attribute, value: impl Into<StratumValue>) -> Self {
        self.attributes.insert(attribute, value.into());
        self
    }

    pub fn value(&self, attribute: Attribute) -> Option<&StratumValue> {
        self.attributes.get(&attribute)
    }

    /// The record's stratum over the given selectors.
    ///
    /// # Errors
    /// `MissingAttribute` if the record has no value for one of the selectors.
    pub fn stratum(&self, selectors: &[Attribute]) -> Result<Stratum, BalanceError> {
        selectors
            .iter()
            .map(|attr| {
                self.value(*attr)
                    .cloned()
                    .ok_or_else(|| BalanceError::MissingAttribute {
                        id: self.id.clone(),
                        attribute: *attr,
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Stratum)
    }
}

impl From<Category> for StratumValue {
    fn from(value: Category) -> Self {
        StratumValue::Category(value)
    }
}

impl From<AgeBin> for StratumValue {
    fn from(value: AgeBin) -> Self {
        StratumValue::Age(value)
    }
}

/// Names of the source columns backing each record field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMapping {
    pub id: String,
    pub group: String,
    pub sex: String,
    pub ethnicity: String,
    pub race: String,
    pub age: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: "case_id".to_string(),
            group: "cohort".to_string(),
            sex: "sex".to_string(),
            ethnicity: "ethnicity".to_string(),
            race: "race".to_string(),
            age: "age_at_index".to_string(),
            object_id: None,
        }
    }
}

impl ColumnMapping {
    pub fn column_for(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Sex => &self.sex,
            Attribute::Ethnicity => &self.ethnicity,
            Attribute::Race => &self.race,
            Attribute::Age => &self.age,
        }
    }
}

/// How missing attribute values are handled during extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPolicy {
    /// Map to an explicit "Not Reported" / "Unknown" bucket
    #[default]
    Bucket,
    /// Fail with `MissingAttribute`
    Reject,
}

/// Settings for turning table rows into records
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub columns: ColumnMapping,
    pub selectors: Vec<Attribute>,
    pub binner: AgeBinner,
    pub unknown_policy: UnknownPolicy,
    pub unknown_tokens: Vec<String>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            selectors: Attribute::ALL.to_vec(),
            binner: AgeBinner::default(),
            unknown_policy: UnknownPolicy::default(),
            unknown_tokens: DEFAULT_UNKNOWN_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Extract one record per row of `df`.
///
/// Only the attributes in `options.selectors` are read, so columns for unused
/// attributes may be absent. List-typed cells are flattened to their first
/// non-null element.
pub fn extract_records(
    df: &DataFrame,
    options: &ExtractionOptions,
) -> Result<Vec<Record>, BalanceError> {
    let cols = &options.columns;
    let ids = column_strings(df, &cols.id)?;
    let groups = column_strings(df, &cols.group)?;

    let mut values: Vec<(Attribute, Vec<StratumValue>)> = Vec::with_capacity(options.selectors.len());
    for &attribute in &options.selectors {
        let column = cols.column_for(attribute);
        let parsed: Vec<StratumValue> = match attribute {
            Attribute::Age => column_f64s(df, column)?
                .into_iter()
                .map(|age| StratumValue::Age(options.binner.bin_opt(age)))
                .collect(),
            _ => column_strings(df, column)?
                .into_iter()
                .map(|raw| {
                    StratumValue::Category(Category::parse(raw.as_deref(), &options.unknown_tokens))
                })
                .collect(),
        };
        values.push((attribute, parsed));
    }

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let id = ids[row].clone().unwrap_or_else(|| format!("row-{}", row));
        let group = group_label(groups[row].as_deref());
        let mut record = Record::new(row, id, group);

        for (attribute, column_values) in &values {
            let value = column_values[row].clone();
            if value.is_unknown() && options.unknown_policy == UnknownPolicy::Reject {
                return Err(BalanceError::MissingAttribute {
                    id: record.id,
                    attribute: *attribute,
                });
            }
            record.attributes.insert(*attribute, value);
        }
        records.push(record);
    }

    Ok(records)
}

/// Cohort labels are taken verbatim apart from surrounding whitespace; only a
/// null label falls back to `NOT_REPORTED_LABEL`.
fn group_label(raw: Option<&str>) -> String {
    raw.map_or_else(|| NOT_REPORTED_LABEL.to_string(), |label| label.trim().to_string())
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, BalanceError> {
    df.column(name).map_err(|_| BalanceError::MissingColumn {
        column: name.to_string(),
        available: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

/// Read a column as optional strings, flattening list cells
pub fn column_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, BalanceError> {
    let column = require_column(df, name)?;
    let series = column.as_materialized_series();

    if let DataType::List(_) = series.dtype() {
        let mut out = Vec::with_capacity(series.len());
        for cell in series.list()?.into_iter() {
            let value = match cell {
                Some(inner) => {
                    let inner = inner.cast(&DataType::String)?;
                    let first = inner.str()?.into_iter().flatten().next().map(str::to_string);
                    first
                }
                None => None,
            };
            out.push(value);
        }
        return Ok(out);
    }

    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Read a column as optional floats, flattening list cells.
/// Values that cannot be parsed as numbers become `None`.
pub fn column_f64s(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, BalanceError> {
    let column = require_column(df, name)?;
    let series = column.as_materialized_series();

    if let DataType::List(_) = series.dtype() {
        let mut out = Vec::with_capacity(series.len());
        for cell in series.list()?.into_iter() {
            let value = match cell {
                Some(inner) => {
                    let inner = inner.cast(&DataType::Float64)?;
                    let first = inner.f64()?.into_iter().flatten().next();
                    first
                }
                None => None,
            };
            out.push(value);
        }
        return Ok(out);
    }

    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}
