use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::AliquotRecord;
use crate::error::CatalogError;

/// Short code and label for one GDC sample type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCode {
    pub code: String,
    pub short: String,
}

const DEFAULT_SAMPLE_TYPES: [(&str, &str, &str); 13] = [
    ("Primary Tumor", "T", "tumor"),
    ("Tumor", "T", "tumor"),
    ("Recurrent Tumor", "R", "recurrent_tumor"),
    ("Metastatic", "M", "metastatic"),
    ("Additional - New Primary", "Tn", "new_primary_tumor"),
    ("Additional Metastatic", "Ma", "additional_metastatic"),
    (
        "Primary Blood Derived Cancer - Bone Marrow",
        "Tbm",
        "tumor_bone_marrow",
    ),
    (
        "Primary Blood Derived Cancer - Peripheral Blood",
        "Tpb",
        "tumor_peripheral_blood",
    ),
    ("Blood Derived Normal", "N", "blood_normal"),
    ("Solid Tissue Normal", "A", "tissue_normal"),
    ("Buccal Cell Normal", "Nbc", "buccal_normal"),
    ("Bone Marrow Normal", "Nbm", "bone_marrow_normal"),
    ("Slides", "S", "slides"),
];

/// Controlled vocabulary mapping GDC `sample_type` strings to sample codes.
///
/// Lookups are exact and case-sensitive. There is no fallback entry: a sample
/// type missing from the table must be added by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTypeVocabulary {
    entries: BTreeMap<String, SampleCode>,
}

impl Default for SampleTypeVocabulary {
    fn default() -> Self {
        let entries = DEFAULT_SAMPLE_TYPES
            .into_iter()
            .map(|(sample_type, code, short)| {
                (
                    sample_type.to_string(),
                    SampleCode {
                        code: code.to_string(),
                        short: short.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl SampleTypeVocabulary {
    /// Adds an entry, replacing any existing mapping for `sample_type`.
    pub fn insert(&mut self, sample_type: impl Into<String>, code: SampleCode) {
        self.entries.insert(sample_type.into(), code);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, SampleCode)>) {
        self.entries.extend(entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, sample_type: &str) -> Option<&SampleCode> {
        self.entries.get(sample_type)
    }

    pub fn resolve(&self, sample_type: &str) -> Result<&SampleCode, CatalogError> {
        self.get(sample_type)
            .ok_or_else(|| CatalogError::UnknownSampleType(vec![sample_type.to_string()]))
    }

    /// Checks every aliquot and reports all unmapped sample types at once.
    pub fn validate(&self, aliquots: &[AliquotRecord]) -> Result<(), CatalogError> {
        let unknown = aliquots
            .iter()
            .map(|aliquot| aliquot.sample_type.as_str())
            .filter(|sample_type| !self.entries.contains_key(*sample_type))
            .collect::<BTreeSet<_>>();
        if unknown.is_empty() {
            return Ok(());
        }
        Err(CatalogError::UnknownSampleType(
            unknown.into_iter().map(str::to_string).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn aliquot(sample_type: &str) -> AliquotRecord {
        AliquotRecord {
            case: "C3L-00001".to_string(),
            sample_submitter_id: "s1".to_string(),
            sample_id: "id1".to_string(),
            sample_type: sample_type.to_string(),
            aliquot_submitter_id: "CPT0001580165".to_string(),
            aliquot_id: "a1".to_string(),
            analyte_type: "DNA".to_string(),
            aliquot_annotation: None,
            preservation_method: None,
        }
    }

    #[test]
    fn glossary_codes() {
        let vocabulary = SampleTypeVocabulary::default();
        assert_eq!(vocabulary.len(), 13);
        for (sample_type, code) in [
            ("Primary Tumor", "T"),
            ("Blood Derived Normal", "N"),
            ("Solid Tissue Normal", "A"),
            ("Recurrent Tumor", "R"),
            ("Metastatic", "M"),
        ] {
            assert_eq!(vocabulary.resolve(sample_type).unwrap().code, code);
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let vocabulary = SampleTypeVocabulary::default();
        let err = vocabulary.resolve("primary tumor").unwrap_err();
        assert_matches!(err, CatalogError::UnknownSampleType(values) => {
            assert_eq!(values, vec!["primary tumor".to_string()]);
        });
    }

    #[test]
    fn validate_batches_unknown_values() {
        let vocabulary = SampleTypeVocabulary::default();
        let aliquots = vec![
            aliquot("Xenograft"),
            aliquot("Primary Tumor"),
            aliquot("Cell Line"),
            aliquot("Xenograft"),
        ];
        let err = vocabulary.validate(&aliquots).unwrap_err();
        assert_matches!(err, CatalogError::UnknownSampleType(values) => {
            assert_eq!(values, vec!["Cell Line".to_string(), "Xenograft".to_string()]);
        });
    }

    #[test]
    fn insert_extends_table() {
        let mut vocabulary = SampleTypeVocabulary::default();
        vocabulary.insert(
            "Xenograft",
            SampleCode {
                code: "X".to_string(),
                short: "xenograft".to_string(),
            },
        );
        assert!(vocabulary.validate(&[aliquot("Xenograft")]).is_ok());
    }
}
