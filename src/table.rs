//! Tab-separated reads, aliquot and catalog tables.

use std::fs;
use std::io::{self, Read, Write};

use camino::Utf8Path;
use serde::Deserialize;

use crate::catalog::{CatalogRecord, OUTPUT_COLUMNS};
use crate::domain::{ALIGNMENT_MISSING, AliquotRecord, CatalogMode, ReadRecord, normalize_null};
use crate::error::CatalogError;

#[derive(Debug, Deserialize)]
struct StandardReadRow {
    case: String,
    aliquot_submitter_id: String,
    alignment: Option<String>,
    experimental_strategy: String,
    data_format: String,
    file_name: String,
    file_size: u64,
    uuid: String,
    md5sum: String,
}

#[derive(Debug, Deserialize)]
struct MethylationReadRow {
    case: String,
    aliquot_submitter_id: String,
    alignment: Option<String>,
    submitter_id: Option<String>,
    uuid: String,
    channel: Option<String>,
    file_name: String,
    file_size: u64,
    data_format: String,
    experimental_strategy: String,
    md5sum: String,
}

fn coerce_alignment(alignment: Option<String>) -> String {
    normalize_null(alignment).unwrap_or_else(|| ALIGNMENT_MISSING.to_string())
}

impl From<StandardReadRow> for ReadRecord {
    fn from(row: StandardReadRow) -> Self {
        ReadRecord {
            case: row.case,
            aliquot_submitter_id: row.aliquot_submitter_id,
            alignment: coerce_alignment(row.alignment),
            experimental_strategy: row.experimental_strategy,
            data_format: row.data_format,
            file_name: row.file_name,
            file_size: row.file_size,
            uuid: row.uuid,
            md5sum: row.md5sum,
            submitter_id: None,
            channel: None,
        }
    }
}

impl From<MethylationReadRow> for ReadRecord {
    fn from(row: MethylationReadRow) -> Self {
        ReadRecord {
            case: row.case,
            aliquot_submitter_id: row.aliquot_submitter_id,
            alignment: coerce_alignment(row.alignment),
            experimental_strategy: row.experimental_strategy,
            data_format: row.data_format,
            file_name: row.file_name,
            file_size: row.file_size,
            uuid: row.uuid,
            md5sum: row.md5sum,
            submitter_id: normalize_null(row.submitter_id),
            channel: normalize_null(row.channel),
        }
    }
}

fn tsv_reader<R: Read>(reader: R, has_headers: bool) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .has_headers(has_headers)
        .quoting(false)
        .from_reader(reader)
}

fn parse_error(source: &str, err: &csv::Error) -> CatalogError {
    let line = err.position().map(|pos| pos.line()).unwrap_or(0);
    CatalogError::TableParse {
        path: source.to_string(),
        line,
        message: err.to_string(),
    }
}

/// Parses a headerless reads table. A leading header row is tolerated.
pub fn parse_reads<R: Read>(
    reader: R,
    mode: CatalogMode,
    source: &str,
) -> Result<Vec<ReadRecord>, CatalogError> {
    let mut rdr = tsv_reader(reader, false);
    let mut reads = Vec::new();
    for (index, row) in rdr.records().enumerate() {
        let row = row.map_err(|err| parse_error(source, &err))?;
        if index == 0 && row.get(0) == Some("case") {
            continue;
        }
        let read = match mode {
            CatalogMode::Standard => row
                .deserialize::<StandardReadRow>(None)
                .map(ReadRecord::from),
            CatalogMode::Methylation => row
                .deserialize::<MethylationReadRow>(None)
                .map(ReadRecord::from),
        }
        .map_err(|err| parse_error(source, &err))?;
        reads.push(read);
    }
    tracing::debug!("read {} {mode} read record(s) from {source}", reads.len());
    Ok(reads)
}

/// Parses an aliquot table with a header row. Unknown columns are ignored.
pub fn parse_aliquots<R: Read>(
    reader: R,
    source: &str,
) -> Result<Vec<AliquotRecord>, CatalogError> {
    let mut rdr = tsv_reader(reader, true);
    let mut aliquots = Vec::new();
    for row in rdr.deserialize::<AliquotRecord>() {
        let mut aliquot = row.map_err(|err| parse_error(source, &err))?;
        aliquot.aliquot_annotation = normalize_null(aliquot.aliquot_annotation);
        aliquot.preservation_method = normalize_null(aliquot.preservation_method);
        aliquots.push(aliquot);
    }
    tracing::debug!("read {} aliquot record(s) from {source}", aliquots.len());
    Ok(aliquots)
}

fn open(path: &Utf8Path) -> Result<fs::File, CatalogError> {
    fs::File::open(path.as_std_path()).map_err(|err| CatalogError::TableRead {
        path: path.to_string(),
        message: err.to_string(),
    })
}

pub fn read_reads(path: &Utf8Path, mode: CatalogMode) -> Result<Vec<ReadRecord>, CatalogError> {
    parse_reads(open(path)?, mode, path.as_str())
}

pub fn read_aliquots(path: &Utf8Path) -> Result<Vec<AliquotRecord>, CatalogError> {
    parse_aliquots(open(path)?, path.as_str())
}

/// Serializes catalog rows in output column order.
pub fn write_catalog<W: Write>(
    writer: W,
    records: &[CatalogRecord],
    header: bool,
) -> Result<(), CatalogError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);
    if header {
        wtr.write_record(OUTPUT_COLUMNS)
            .map_err(|err| CatalogError::TableWrite(err.to_string()))?;
    }
    for record in records {
        wtr.serialize(record)
            .map_err(|err| CatalogError::TableWrite(err.to_string()))?;
    }
    wtr.flush()
        .map_err(|err| CatalogError::TableWrite(err.to_string()))?;
    Ok(())
}

/// Writes the catalog to `dest` through a temporary file so a failed run
/// never leaves a partial catalog behind.
pub fn write_catalog_atomic(
    dest: &Utf8Path,
    records: &[CatalogRecord],
    header: bool,
) -> Result<(), CatalogError> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("gdc-catalog")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    write_catalog(temp.as_file_mut(), records, header)?;
    temp.persist(dest.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    tracing::info!("written {} record(s) to {dest}", records.len());
    Ok(())
}

pub const ALIQUOT_COLUMNS: [&str; 9] = [
    "case",
    "sample_submitter_id",
    "sample_id",
    "sample_type",
    "preservation_method",
    "aliquot_submitter_id",
    "aliquot_id",
    "analyte_type",
    "aliquot_annotation",
];

/// Writes aliquot records in the layout `parse_aliquots` reads back.
pub fn write_aliquots<W: Write>(writer: W, aliquots: &[AliquotRecord]) -> Result<(), CatalogError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);
    wtr.write_record(ALIQUOT_COLUMNS)
        .map_err(|err| CatalogError::TableWrite(err.to_string()))?;
    for aliquot in aliquots {
        wtr.write_record([
            aliquot.case.as_str(),
            aliquot.sample_submitter_id.as_str(),
            aliquot.sample_id.as_str(),
            aliquot.sample_type.as_str(),
            aliquot.preservation_method.as_deref().unwrap_or(""),
            aliquot.aliquot_submitter_id.as_str(),
            aliquot.aliquot_id.as_str(),
            aliquot.analyte_type.as_str(),
            aliquot.aliquot_annotation.as_deref().unwrap_or(""),
        ])
        .map_err(|err| CatalogError::TableWrite(err.to_string()))?;
    }
    wtr.flush()
        .map_err(|err| CatalogError::TableWrite(err.to_string()))?;
    Ok(())
}

pub fn write_catalog_stdout(records: &[CatalogRecord], header: bool) -> Result<(), CatalogError> {
    let stdout = io::stdout();
    write_catalog(stdout.lock(), records, header)
}
