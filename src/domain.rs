use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const ALIGNMENT_HARMONIZED: &str = "harmonized";
pub const ALIGNMENT_UNALIGNED: &str = "unaligned";
pub const ALIGNMENT_MISSING: &str = "NA";

/// Column layout of the reads table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    #[default]
    Standard,
    Methylation,
}

impl fmt::Display for CatalogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogMode::Standard => write!(f, "standard"),
            CatalogMode::Methylation => write!(f, "methylation"),
        }
    }
}

/// GDC data model linking a case to its aliquots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DataModel {
    #[default]
    #[value(name = "CPTAC")]
    Cptac,
    #[value(name = "TCGA")]
    Tcga,
}

impl fmt::Display for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataModel::Cptac => write!(f, "CPTAC"),
            DataModel::Tcga => write!(f, "TCGA"),
        }
    }
}

/// One physical data file from the reads table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub case: String,
    pub aliquot_submitter_id: String,
    pub alignment: String,
    pub experimental_strategy: String,
    pub data_format: String,
    pub file_name: String,
    pub file_size: u64,
    pub uuid: String,
    pub md5sum: String,
    /// Methylation reads only.
    pub submitter_id: Option<String>,
    /// Methylation reads only; stands in for the filename heuristics.
    pub channel: Option<String>,
}

impl ReadRecord {
    pub fn is_harmonized(&self) -> bool {
        self.alignment == ALIGNMENT_HARMONIZED
    }

    pub fn is_unaligned(&self) -> bool {
        self.alignment == ALIGNMENT_UNALIGNED
    }
}

/// One aliquot row of the aliquot table, with its originating sample.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AliquotRecord {
    pub case: String,
    pub sample_submitter_id: String,
    pub sample_id: String,
    pub sample_type: String,
    pub aliquot_submitter_id: String,
    pub aliquot_id: String,
    pub analyte_type: String,
    pub aliquot_annotation: Option<String>,
    #[serde(default)]
    pub preservation_method: Option<String>,
}

/// Coerces the null spellings found in upstream tables to `None`.
pub fn normalize_null(value: Option<String>) -> Option<String> {
    value.filter(|value| !matches!(value.trim(), "" | "NA" | "None" | "null"))
}
