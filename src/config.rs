use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::aliquot::{AnnotationRule, AnnotationRules};
use crate::domain::CatalogMode;
use crate::error::CatalogError;
use crate::variety::FastqNaming;
use crate::vocabulary::{SampleCode, SampleTypeVocabulary};

pub const DEFAULT_DISEASE: &str = "DISEASE";
pub const DEFAULT_PROJECT: &str = "PROJECT";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub disease: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub mode: Option<CatalogMode>,
    #[serde(default)]
    pub fastq_naming: Option<FastqNaming>,
    #[serde(default)]
    pub unaligned_bam_tokens: Option<bool>,
    /// Added to, or overriding, the built-in sample type vocabulary.
    #[serde(default)]
    pub sample_types: BTreeMap<String, SampleTypeEntry>,
    /// Replaces the built-in annotation rules when present.
    #[serde(default)]
    pub annotation_rules: Option<Vec<AnnotationRuleEntry>>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SampleTypeEntry {
    Shorthand(String),
    Detailed(SampleCode),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AnnotationRuleEntry {
    pub pattern: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub disease: String,
    pub project: String,
    pub mode: CatalogMode,
    pub fastq_naming: FastqNaming,
    pub unaligned_bam_tokens: bool,
    pub vocabulary: SampleTypeVocabulary,
    pub annotation_rules: AnnotationRules,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            disease: DEFAULT_DISEASE.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            mode: CatalogMode::Standard,
            fastq_naming: FastqNaming::Tokens,
            unaligned_bam_tokens: false,
            vocabulary: SampleTypeVocabulary::default(),
            annotation_rules: AnnotationRules::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` if given; otherwise the built-in defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CatalogError> {
        let Some(path) = path else {
            return Ok(ResolvedConfig::default());
        };
        let config_path = PathBuf::from(path);
        let content = fs::read_to_string(&config_path)
            .map_err(|_| CatalogError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CatalogError::ConfigParse(err.to_string()))?;
        tracing::debug!("loaded config from {}", config_path.display());

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CatalogError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(CatalogError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let mut vocabulary = SampleTypeVocabulary::default();
        vocabulary.extend(
            config
                .sample_types
                .into_iter()
                .map(|(sample_type, entry)| {
                    let code = match entry {
                        SampleTypeEntry::Shorthand(code) => SampleCode {
                            short: short_label(&sample_type),
                            code,
                        },
                        SampleTypeEntry::Detailed(code) => code,
                    };
                    (sample_type, code)
                }),
        );

        let annotation_rules = config
            .annotation_rules
            .map(|rules| {
                AnnotationRules::new(
                    rules
                        .into_iter()
                        .map(|rule| AnnotationRule::new(rule.pattern, rule.code))
                        .collect(),
                )
            })
            .unwrap_or_default();

        Ok(ResolvedConfig {
            schema_version,
            disease: config.disease.unwrap_or_else(|| DEFAULT_DISEASE.to_string()),
            project: config.project.unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            mode: config.mode.unwrap_or_default(),
            fastq_naming: config.fastq_naming.unwrap_or_default(),
            unaligned_bam_tokens: config.unaligned_bam_tokens.unwrap_or(false),
            vocabulary,
            annotation_rules,
        })
    }
}

/// `"Buccal Cell Normal"` -> `"buccal_cell_normal"`
fn short_label(sample_type: &str) -> String {
    sample_type
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
