use std::collections::BTreeMap;

use assert_matches::assert_matches;

use gdc_catalog::config::{AnnotationRuleEntry, Config, ConfigLoader, SampleTypeEntry};
use gdc_catalog::domain::CatalogMode;
use gdc_catalog::error::CatalogError;
use gdc_catalog::variety::FastqNaming;
use gdc_catalog::vocabulary::SampleCode;

#[test]
fn defaults_without_config() {
    let resolved = ConfigLoader::resolve(None).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.disease, "DISEASE");
    assert_eq!(resolved.project, "PROJECT");
    assert_eq!(resolved.mode, CatalogMode::Standard);
    assert_eq!(resolved.vocabulary.len(), 13);
    assert_eq!(resolved.annotation_rules.rules().len(), 3);
}

#[test]
fn sample_type_additions() {
    let mut sample_types = BTreeMap::new();
    sample_types.insert(
        "Xenograft Tissue".to_string(),
        SampleTypeEntry::Shorthand("X".to_string()),
    );
    sample_types.insert(
        "Buccal Cell Normal".to_string(),
        SampleTypeEntry::Detailed(SampleCode {
            code: "Nb".to_string(),
            short: "buccal".to_string(),
        }),
    );
    let config = Config {
        sample_types,
        ..Config::default()
    };

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    let xenograft = resolved.vocabulary.resolve("Xenograft Tissue").unwrap();
    assert_eq!(xenograft.code, "X");
    assert_eq!(xenograft.short, "xenograft_tissue");
    assert_eq!(resolved.vocabulary.resolve("Buccal Cell Normal").unwrap().code, "Nb");
    assert_eq!(resolved.vocabulary.len(), 14);
}

#[test]
fn annotation_rules_replace_defaults() {
    let config = Config {
        annotation_rules: Some(vec![AnnotationRuleEntry {
            pattern: "Pooled".to_string(),
            code: "POOL".to_string(),
        }]),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.annotation_rules.code(Some("pooled sample")), "POOL");
    assert_eq!(resolved.annotation_rules.code(Some("Duplicate item")), "ANN");
}

#[test]
fn uppercase_rule_patterns_match_any_case() {
    let config: Config = serde_json::from_str(
        r#"{"annotation_rules": [{"pattern": "POOLED Material", "code": "POOL"}]}"#,
    )
    .unwrap();
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.annotation_rules.rules()[0].pattern(), "pooled material");
    assert_eq!(
        resolved.annotation_rules.code(Some("Pooled material from two vials")),
        "POOL"
    );
}

#[test]
fn load_json_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("catalog.json");
    std::fs::write(
        &path,
        r#"{
            "disease": "LSCC",
            "project": "CPTAC3",
            "mode": "methylation",
            "fastq_naming": "legacy",
            "sample_types": { "Normal Adjacent": { "code": "A", "short": "adjacent" } }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.disease, "LSCC");
    assert_eq!(resolved.project, "CPTAC3");
    assert_eq!(resolved.mode, CatalogMode::Methylation);
    assert_eq!(resolved.fastq_naming, FastqNaming::Legacy);
    assert_eq!(resolved.vocabulary.resolve("Normal Adjacent").unwrap().short, "adjacent");
}

#[test]
fn config_errors() {
    let err = ConfigLoader::resolve(Some("/nonexistent/catalog.json")).unwrap_err();
    assert_matches!(err, CatalogError::ConfigRead(_));

    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, CatalogError::ConfigParse(_));

    let config = Config {
        schema_version: Some(2),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(CatalogError::ConfigParse(_))
    );
}
