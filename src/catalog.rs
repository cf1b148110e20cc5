use std::collections::BTreeMap;

use serde::Serialize;

use crate::aliquot::{AnnotationRules, ResolvedAliquot, resolve_aliquots};
use crate::domain::{AliquotRecord, CatalogMode, ReadRecord};
use crate::error::CatalogError;
use crate::variety::{FastqNaming, Variety, VarietyOptions, classify};
use crate::vocabulary::SampleTypeVocabulary;

pub const OUTPUT_COLUMNS: [&str; 15] = [
    "dataset_name",
    "case",
    "disease",
    "experimental_strategy",
    "sample_type",
    "specimen_name",
    "filename",
    "filesize",
    "data_format",
    "data_variety",
    "alignment",
    "project",
    "uuid",
    "md5",
    "metadata",
];

/// One output row of the catalog. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRecord {
    pub dataset_name: String,
    pub case: String,
    pub disease: String,
    pub experimental_strategy: String,
    pub sample_type: String,
    pub specimen_name: String,
    pub filename: String,
    pub filesize: u64,
    pub data_format: String,
    pub data_variety: String,
    pub alignment: String,
    pub project: String,
    pub uuid: String,
    pub md5: String,
    pub metadata: String,
}

/// Side-channel JSON attached to every catalog row; absent keys are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliquot_tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliquot_annotation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gdc_sample_type: Option<&'a str>,
}

impl RecordMetadata<'_> {
    pub fn to_json(&self) -> Result<String, CatalogError> {
        serde_json::to_string(self).map_err(|err| CatalogError::TableWrite(err.to_string()))
    }
}

pub fn experimental_strategy_short(strategy: &str) -> &str {
    match strategy {
        "Targeted Sequencing" => "Targeted",
        "Methylation Array" => "MethArray",
        other => other,
    }
}

/// `case[.tag].strategy[.variety].code[.hg38]`
pub fn compose_dataset_name(
    read: &ReadRecord,
    aliquot: &ResolvedAliquot,
    variety: &Variety,
) -> String {
    let mut name = read.case.clone();
    if aliquot.is_annotated() {
        name.push('.');
        name.push_str(&aliquot.aliquot_tag);
    }
    name.push('.');
    name.push_str(experimental_strategy_short(&read.experimental_strategy));
    if let Some(data_variety) = variety.data_variety.as_deref().filter(|v| !v.is_empty()) {
        name.push('.');
        name.push_str(data_variety);
    }
    name.push('.');
    name.push_str(&aliquot.sample_code);
    if read.is_harmonized() {
        name.push_str(".hg38");
    }
    name
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    disease: String,
    project: String,
    vocabulary: SampleTypeVocabulary,
    annotation_rules: AnnotationRules,
    variety: VarietyOptions,
}

impl CatalogBuilder {
    pub fn new(mode: CatalogMode) -> Self {
        Self {
            disease: "DISEASE".to_string(),
            project: "PROJECT".to_string(),
            vocabulary: SampleTypeVocabulary::default(),
            annotation_rules: AnnotationRules::default(),
            variety: VarietyOptions {
                mode,
                ..VarietyOptions::default()
            },
        }
    }

    pub fn disease(mut self, disease: impl Into<String>) -> Self {
        self.disease = disease.into();
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn vocabulary(mut self, vocabulary: SampleTypeVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn annotation_rules(mut self, rules: AnnotationRules) -> Self {
        self.annotation_rules = rules;
        self
    }

    pub fn fastq_naming(mut self, naming: FastqNaming) -> Self {
        self.variety.fastq_naming = naming;
        self
    }

    pub fn unaligned_bam_tokens(mut self, enabled: bool) -> Self {
        self.variety.unaligned_bam_tokens = enabled;
        self
    }

    pub fn build(self) -> Catalog {
        Catalog {
            disease: self.disease,
            project: self.project,
            vocabulary: self.vocabulary,
            annotation_rules: self.annotation_rules,
            variety: self.variety,
        }
    }
}

/// Joins reads to aliquots and composes one catalog row per matched read.
#[derive(Debug, Clone)]
pub struct Catalog {
    disease: String,
    project: String,
    vocabulary: SampleTypeVocabulary,
    annotation_rules: AnnotationRules,
    variety: VarietyOptions,
}

impl Catalog {
    pub fn builder(mode: CatalogMode) -> CatalogBuilder {
        CatalogBuilder::new(mode)
    }

    /// Builds the whole catalog in memory. Either every row is produced or
    /// the first fatal classification error is returned.
    pub fn generate(
        &self,
        reads: &[ReadRecord],
        aliquots: &[AliquotRecord],
    ) -> Result<Vec<CatalogRecord>, CatalogError> {
        if reads.is_empty() {
            tracing::warn!("reads table is empty; catalog will be empty");
        }
        if aliquots.is_empty() {
            tracing::warn!("aliquot table is empty; no reads can be matched");
        }

        let resolved = resolve_aliquots(aliquots, &self.vocabulary, &self.annotation_rules)?;

        let mut records = Vec::with_capacity(reads.len());
        let mut dropped = 0usize;
        for read in reads {
            let key = (read.case.clone(), read.aliquot_submitter_id.clone());
            let Some(aliquot) = resolved.get(&key) else {
                tracing::debug!(
                    "no aliquot {} for case {}; dropping {}",
                    read.aliquot_submitter_id,
                    read.case,
                    read.file_name
                );
                dropped += 1;
                continue;
            };
            records.push(self.compose(read, aliquot)?);
        }

        if dropped > 0 {
            tracing::warn!("{dropped} read(s) had no matching aliquot and were dropped");
        }

        records.sort_by(|a, b| {
            a.dataset_name
                .cmp(&b.dataset_name)
                .then_with(|| a.uuid.cmp(&b.uuid))
        });
        report_duplicate_names(&records);
        tracing::info!("catalog contains {} record(s)", records.len());
        Ok(records)
    }

    fn compose(
        &self,
        read: &ReadRecord,
        aliquot: &ResolvedAliquot,
    ) -> Result<CatalogRecord, CatalogError> {
        let variety = classify(read, self.variety);
        let metadata = RecordMetadata {
            aliquot_tag: non_empty(Some(aliquot.aliquot_tag.as_str())),
            aliquot_annotation: non_empty(aliquot.record.aliquot_annotation.as_deref()),
            sample: non_empty(variety.sample.as_deref()),
            lane: non_empty(variety.lane.as_deref()),
            read: non_empty(variety.read.as_deref()),
            index: non_empty(variety.index.as_deref()),
            gdc_sample_type: non_empty(Some(aliquot.record.sample_type.as_str())),
        }
        .to_json()?;

        Ok(CatalogRecord {
            dataset_name: compose_dataset_name(read, aliquot, &variety),
            case: read.case.clone(),
            disease: self.disease.clone(),
            experimental_strategy: experimental_strategy_short(&read.experimental_strategy)
                .to_string(),
            sample_type: aliquot.sample_type_short.clone(),
            specimen_name: read.aliquot_submitter_id.clone(),
            filename: read.file_name.clone(),
            filesize: read.file_size,
            data_format: read.data_format.clone(),
            data_variety: variety.data_variety.unwrap_or_default(),
            alignment: read.alignment.clone(),
            project: self.project.clone(),
            uuid: read.uuid.clone(),
            md5: read.md5sum.clone(),
            metadata,
        })
    }
}

fn report_duplicate_names(records: &[CatalogRecord]) {
    let mut counts = BTreeMap::<&str, usize>::new();
    for record in records {
        *counts.entry(record.dataset_name.as_str()).or_default() += 1;
    }
    for (name, count) in counts.into_iter().filter(|(_, count)| *count > 1) {
        tracing::warn!("dataset name {name} is shared by {count} records");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_remaps() {
        assert_eq!(experimental_strategy_short("Targeted Sequencing"), "Targeted");
        assert_eq!(experimental_strategy_short("Methylation Array"), "MethArray");
        assert_eq!(experimental_strategy_short("WXS"), "WXS");
    }

    #[test]
    fn metadata_omits_absent_keys() {
        let metadata = RecordMetadata {
            aliquot_tag: Some("ALQ_f9ffb735"),
            gdc_sample_type: Some("Primary Tumor"),
            ..RecordMetadata::default()
        };
        assert_eq!(
            metadata.to_json().unwrap(),
            r#"{"aliquot_tag":"ALQ_f9ffb735","gdc_sample_type":"Primary Tumor"}"#
        );
    }
}
