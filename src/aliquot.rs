use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{AliquotRecord, normalize_null};
use crate::error::CatalogError;
use crate::vocabulary::SampleTypeVocabulary;

pub const DEFAULT_CODE: &str = "ALQ";
pub const ANNOTATED_CODE: &str = "ANN";

/// Case-insensitive annotation substring mapped to a tag code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRule {
    /// Always lowercase.
    pattern: String,
    code: String,
}

impl AnnotationRule {
    pub fn new(pattern: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into().to_lowercase(),
            code: code.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Ordered annotation classifier. Every matching rule overrides the code set
/// by the rules before it, so the last match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRules(Vec<AnnotationRule>);

impl Default for AnnotationRules {
    fn default() -> Self {
        Self(vec![
            AnnotationRule::new("duplicate item", "DUP"),
            AnnotationRule::new("additional", "ADD"),
            AnnotationRule::new("replacement", "REP"),
        ])
    }
}

impl AnnotationRules {
    pub fn new(rules: Vec<AnnotationRule>) -> Self {
        Self(rules)
    }

    pub fn rules(&self) -> &[AnnotationRule] {
        &self.0
    }

    pub fn code<'a>(&'a self, annotation: Option<&str>) -> &'a str {
        let Some(annotation) = annotation else {
            return DEFAULT_CODE;
        };
        let lowered = annotation.to_lowercase();
        self.0
            .iter()
            .filter(|rule| lowered.contains(rule.pattern.as_str()))
            .last()
            .map(|rule| rule.code.as_str())
            .unwrap_or(ANNOTATED_CODE)
    }
}

/// Lowercase hex CRC-32 (IEEE) of the identifier, unpadded like zlib's `hex()`.
pub fn aliquot_hash(aliquot_submitter_id: &str) -> String {
    format!("{:x}", crc32fast::hash(aliquot_submitter_id.as_bytes()))
}

pub fn aliquot_tag(
    aliquot_submitter_id: &str,
    annotation: Option<&str>,
    rules: &AnnotationRules,
) -> String {
    format!(
        "{}_{}",
        rules.code(annotation),
        aliquot_hash(aliquot_submitter_id)
    )
}

/// An aliquot after tagging, sample-code resolution and multi-sample collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAliquot {
    pub record: AliquotRecord,
    pub aliquot_tag: String,
    pub sample_ids: String,
    pub sample_code: String,
    pub sample_type_short: String,
}

impl ResolvedAliquot {
    pub fn is_annotated(&self) -> bool {
        self.record
            .aliquot_annotation
            .as_deref()
            .is_some_and(|annotation| !annotation.trim().is_empty())
    }
}

pub type AliquotKey = (String, String);

/// Collapses aliquot rows sharing `(case, aliquot_submitter_id)` and resolves
/// their tags and sample codes.
///
/// Fails with every unmapped sample type if any row is outside the vocabulary.
/// The representative row of a group is the one with the smallest
/// `sample_submitter_id`, so the result does not depend on input order. The
/// annotation of a group is every distinct note of its rows, sorted and joined
/// with `;`.
pub fn resolve_aliquots(
    aliquots: &[AliquotRecord],
    vocabulary: &SampleTypeVocabulary,
    rules: &AnnotationRules,
) -> Result<BTreeMap<AliquotKey, ResolvedAliquot>, CatalogError> {
    vocabulary.validate(aliquots)?;

    let mut groups = BTreeMap::<AliquotKey, Vec<&AliquotRecord>>::new();
    for aliquot in aliquots {
        groups
            .entry((aliquot.case.clone(), aliquot.aliquot_submitter_id.clone()))
            .or_default()
            .push(aliquot);
    }

    let mut resolved = BTreeMap::new();
    for (key, mut rows) in groups {
        rows.sort_by(|a, b| {
            a.sample_submitter_id
                .cmp(&b.sample_submitter_id)
                .then_with(|| a.aliquot_id.cmp(&b.aliquot_id))
        });
        let sample_ids = rows
            .iter()
            .map(|row| row.sample_submitter_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
            .join(",");
        if rows.len() > 1 {
            tracing::debug!(
                "aliquot {} of case {} belongs to samples {sample_ids}",
                key.1,
                key.0
            );
        }
        let sample_types = rows
            .iter()
            .map(|row| row.sample_type.as_str())
            .collect::<BTreeSet<_>>();
        if sample_types.len() > 1 {
            tracing::warn!(
                "aliquot {} of case {} has conflicting sample types ({}); using {}",
                key.1,
                key.0,
                sample_types.into_iter().collect::<Vec<_>>().join(", "),
                rows[0].sample_type
            );
        }
        let mut record = rows[0].clone();
        record.aliquot_annotation = merged_annotation(&rows);
        let sample_code = vocabulary.resolve(&record.sample_type)?.clone();
        let aliquot_tag = aliquot_tag(
            &record.aliquot_submitter_id,
            record.aliquot_annotation.as_deref(),
            rules,
        );
        resolved.insert(
            key,
            ResolvedAliquot {
                record,
                aliquot_tag,
                sample_ids,
                sample_code: sample_code.code,
                sample_type_short: sample_code.short,
            },
        );
    }
    Ok(resolved)
}

fn merged_annotation(rows: &[&AliquotRecord]) -> Option<String> {
    let notes = rows
        .iter()
        .filter_map(|row| normalize_null(row.aliquot_annotation.clone()))
        .map(|note| note.trim().to_string())
        .collect::<BTreeSet<_>>();
    if notes.is_empty() {
        None
    } else {
        Some(notes.into_iter().collect::<Vec<_>>().join(";"))
    }
}
