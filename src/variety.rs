use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{CatalogMode, ReadRecord};

static SAMPLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(S\d+)").unwrap());
static LANE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(L\d{3})").unwrap());
static READ_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(R\d)").unwrap());
static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(I\d)").unwrap());

const RNA_BAM_VARIETIES: [&str; 3] = ["genomic", "transcriptome", "chimeric"];
const LEGACY_READS: [&str; 3] = ["R1", "R2", "R3"];
const LEGACY_LANES: [&str; 9] = [
    "L000", "L001", "L002", "L003", "L004", "L005", "L006", "L007", "L008",
];

/// How FASTQ-style filenames are split into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FastqNaming {
    /// Regex search for sample, lane, read and index tokens.
    #[default]
    Tokens,
    /// Literal `_R1_`..`_R3_` and `_L000_`..`_L008_` substrings.
    Legacy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VarietyOptions {
    pub mode: CatalogMode,
    pub fastq_naming: FastqNaming,
    /// Treat unaligned BAMs like FASTQs.
    pub unaligned_bam_tokens: bool,
}

/// Classification result for one read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variety {
    pub data_variety: Option<String>,
    pub sample: Option<String>,
    pub lane: Option<String>,
    pub read: Option<String>,
    pub index: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleSet {
    Channel,
    FastqTokens,
    RnaBam,
    Unclassified,
}

fn select_rules(record: &ReadRecord, options: VarietyOptions) -> RuleSet {
    if options.mode == CatalogMode::Methylation {
        return RuleSet::Channel;
    }
    match record.data_format.as_str() {
        "FASTQ" => RuleSet::FastqTokens,
        "BAM" if options.unaligned_bam_tokens && record.is_unaligned() => RuleSet::FastqTokens,
        "BAM" if record.experimental_strategy == "RNA-Seq" => RuleSet::RnaBam,
        _ => RuleSet::Unclassified,
    }
}

/// Derives the variety of one read. Only one rule set ever applies to a record.
pub fn classify(record: &ReadRecord, options: VarietyOptions) -> Variety {
    match select_rules(record, options) {
        RuleSet::Channel => Variety {
            data_variety: record.channel.clone().filter(|channel| !channel.is_empty()),
            ..Variety::default()
        },
        RuleSet::FastqTokens => match options.fastq_naming {
            FastqNaming::Tokens => fastq_tokens(&record.file_name),
            FastqNaming::Legacy => legacy_fastq_tokens(&record.file_name),
        },
        RuleSet::RnaBam => Variety {
            data_variety: rna_bam_variety(&record.file_name).map(str::to_string),
            ..Variety::default()
        },
        RuleSet::Unclassified => Variety::default(),
    }
}

pub fn rna_bam_variety(file_name: &str) -> Option<&'static str> {
    RNA_BAM_VARIETIES
        .into_iter()
        .find(|variety| file_name.contains(*variety))
}

pub fn fastq_tokens(file_name: &str) -> Variety {
    let capture = |re: &Regex| {
        re.captures(file_name)
            .and_then(|caps| caps.get(1))
            .map(|token| token.as_str().to_string())
    };
    let sample = capture(&SAMPLE_RE);
    let lane = capture(&LANE_RE);
    let read = capture(&READ_RE);
    let index = capture(&INDEX_RE);
    let data_variety = join_tokens(&[&sample, &lane, &read, &index]);
    Variety {
        data_variety,
        sample,
        lane,
        read,
        index,
    }
}

pub fn legacy_fastq_tokens(file_name: &str) -> Variety {
    let find = |candidates: &[&str]| {
        candidates
            .iter()
            .find(|token| file_name.contains(&format!("_{token}_")))
            .map(|token| token.to_string())
    };
    let read = find(&LEGACY_READS[..]);
    let lane = find(&LEGACY_LANES[..]);
    let data_variety = join_tokens(&[&read, &lane]);
    Variety {
        data_variety,
        lane,
        read,
        ..Variety::default()
    }
}

fn join_tokens(tokens: &[&Option<String>]) -> Option<String> {
    let present = tokens
        .iter()
        .filter_map(|token| token.as_deref())
        .collect::<Vec<_>>();
    if present.is_empty() {
        None
    } else {
        Some(present.join("_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(data_format: &str, strategy: &str, alignment: &str, file_name: &str) -> ReadRecord {
        ReadRecord {
            case: "C3L-00001".to_string(),
            aliquot_submitter_id: "CPT0001580165".to_string(),
            alignment: alignment.to_string(),
            experimental_strategy: strategy.to_string(),
            data_format: data_format.to_string(),
            file_name: file_name.to_string(),
            file_size: 1,
            uuid: "u1".to_string(),
            md5sum: "m1".to_string(),
            submitter_id: None,
            channel: None,
        }
    }

    #[test]
    fn fastq_all_tokens() {
        let record = read("FASTQ", "WGS", "unaligned", "SAMPLE_S1_L001_R1_I1.fastq.gz");
        let variety = classify(&record, VarietyOptions::default());
        assert_eq!(variety.data_variety.as_deref(), Some("S1_L001_R1_I1"));
        assert_eq!(variety.sample.as_deref(), Some("S1"));
        assert_eq!(variety.lane.as_deref(), Some("L001"));
        assert_eq!(variety.read.as_deref(), Some("R1"));
        assert_eq!(variety.index.as_deref(), Some("I1"));
    }

    #[test]
    fn fastq_partial_tokens_keep_order() {
        let variety = fastq_tokens("x_R2_L004.fastq.gz");
        assert_eq!(variety.data_variety.as_deref(), Some("L004_R2"));
        assert_eq!(variety.sample, None);
    }

    #[test]
    fn fastq_without_tokens_is_empty() {
        let record = read("FASTQ", "WGS", "unaligned", "reads.fastq.gz");
        assert_eq!(classify(&record, VarietyOptions::default()), Variety::default());
    }

    #[test]
    fn rna_bam_subtypes() {
        let record = read("BAM", "RNA-Seq", "harmonized", "x.rna_seq.transcriptome.gdc_realn.bam");
        let variety = classify(&record, VarietyOptions::default());
        assert_eq!(variety.data_variety.as_deref(), Some("transcriptome"));

        let record = read("BAM", "RNA-Seq", "harmonized", "x.rna_seq.Genomic.bam");
        assert_eq!(classify(&record, VarietyOptions::default()).data_variety, None);

        let record = read("BAM", "WGS", "harmonized", "x_genomic.bam");
        assert_eq!(classify(&record, VarietyOptions::default()).data_variety, None);
    }

    #[test]
    fn unaligned_bam_uses_tokens_only_when_enabled() {
        let record = read("BAM", "RNA-Seq", "unaligned", "x_genomic_L002_R1.bam");
        let default = classify(&record, VarietyOptions::default());
        assert_eq!(default.data_variety.as_deref(), Some("genomic"));

        let options = VarietyOptions {
            unaligned_bam_tokens: true,
            ..VarietyOptions::default()
        };
        let tokens = classify(&record, options);
        assert_eq!(tokens.data_variety.as_deref(), Some("L002_R1"));
    }

    #[test]
    fn legacy_naming() {
        let options = VarietyOptions {
            fastq_naming: FastqNaming::Legacy,
            ..VarietyOptions::default()
        };
        let record = read("FASTQ", "WXS", "unaligned", "abc_L003_R2_001.fastq.gz");
        let variety = classify(&record, options);
        assert_eq!(variety.data_variety.as_deref(), Some("R2_L003"));

        let record = read("FASTQ", "WXS", "unaligned", "abc_R1.fastq.gz");
        assert_eq!(classify(&record, options).data_variety, None);
    }

    #[test]
    fn methylation_channel() {
        let mut record = read("IDAT", "Methylation Array", "NA", "x_Grn.idat");
        record.channel = Some("Green".to_string());
        let options = VarietyOptions {
            mode: CatalogMode::Methylation,
            ..VarietyOptions::default()
        };
        let variety = classify(&record, options);
        assert_eq!(variety.data_variety.as_deref(), Some("Green"));

        record.channel = None;
        assert_eq!(classify(&record, options), Variety::default());
    }
}
