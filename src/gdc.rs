use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::json;

use crate::domain::{AliquotRecord, DataModel};
use crate::error::CatalogError;

pub const DEFAULT_ENDPOINT: &str = "https://api.gdc.cancer.gov/";

pub const FILE_FIELDS: [&str; 15] = [
    "file_id",
    "file_name",
    "cases.submitter_id",
    "cases.case_id",
    "data_category",
    "data_type",
    "cases.samples.tumor_descriptor",
    "cases.samples.tissue_type",
    "cases.samples.sample_type",
    "cases.samples.submitter_id",
    "cases.samples.sample_id",
    "analysis.workflow_type",
    "cases.project.project_id",
    "cases.samples.portions.analytes.aliquots.aliquot_id",
    "cases.samples.portions.analytes.aliquots.submitter_id",
];

/// Parameters of a `files` endpoint search for aligned reads of some cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesQuery {
    pub cases: Vec<String>,
    pub size: u32,
    pub format: String,
}

impl FilesQuery {
    pub fn new(cases: Vec<String>) -> Self {
        Self {
            cases,
            size: 2000,
            format: "TSV".to_string(),
        }
    }

    pub fn filters(&self) -> serde_json::Value {
        json!({
            "op": "and",
            "content": [
                {
                    "op": "in",
                    "content": { "field": "cases.submitter_id", "value": self.cases }
                },
                {
                    "op": "=",
                    "content": { "field": "files.data_type", "value": "Aligned Reads" }
                }
            ]
        })
    }

    /// POST body; filters are passed as an object rather than a URL parameter.
    pub fn params(&self) -> serde_json::Value {
        json!({
            "filters": self.filters(),
            "fields": FILE_FIELDS.join(","),
            "format": self.format,
            "size": self.size.to_string(),
        })
    }
}

pub fn samples_graphql(case: &str, model: DataModel) -> String {
    let aliquots = "aliquots { submitter_id id analyte_type annotations { notes } }";
    let body = match model {
        DataModel::Cptac => aliquots.to_string(),
        DataModel::Tcga => "portions { analytes { submitter_id id analyte_type \
                            aliquots { submitter_id id annotations { notes } } } }"
            .to_string(),
    };
    format!(
        "{{ sample(with_path_to: {{type: \"case\", submitter_id: \"{case}\"}}, first: 10000) \
         {{ submitter_id id sample_type preservation_method {body} }} }}"
    )
}

pub trait GdcClient: Send + Sync {
    /// Raw body of the `files` endpoint response.
    fn query_files(&self, query: &FilesQuery) -> Result<String, CatalogError>;
    /// Raw JSON of the sample/aliquot GraphQL response for one case.
    fn query_samples(&self, case: &str, model: DataModel) -> Result<String, CatalogError>;
}

#[derive(Clone)]
pub struct GdcHttpClient {
    client: Client,
    base_url: String,
}

impl GdcHttpClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gdc-catalog/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CatalogError::GdcHttp(err.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) {
            let mut value = HeaderValue::from_str(token)
                .map_err(|err| CatalogError::GdcHttp(err.to_string()))?;
            value.set_sensitive(true);
            headers.insert("X-Auth-Token", value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| CatalogError::GdcHttp(err.to_string()))?;

        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Ok(Self { client, base_url })
    }

    fn post(&self, endpoint: &str, body: &serde_json::Value) -> Result<String, CatalogError> {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|err| CatalogError::GdcHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GDC request failed".to_string());
            return Err(CatalogError::GdcStatus { status, message });
        }
        response
            .text()
            .map_err(|err| CatalogError::GdcHttp(err.to_string()))
    }
}

impl GdcClient for GdcHttpClient {
    fn query_files(&self, query: &FilesQuery) -> Result<String, CatalogError> {
        self.post("files", &query.params())
    }

    fn query_samples(&self, case: &str, model: DataModel) -> Result<String, CatalogError> {
        let body = json!({ "query": samples_graphql(case, model), "variables": {} });
        self.post("v0/graphql", &body)
    }
}

pub fn read_token(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path)
        .map(|token| token.trim().to_string())
        .map_err(|err| CatalogError::Filesystem(format!("read token {}: {err}", path.display())))
}

#[derive(Debug, Deserialize)]
struct SampleResponse {
    data: SampleData,
}

#[derive(Debug, Deserialize)]
struct SampleData {
    #[serde(default)]
    sample: Vec<GdcSample>,
}

#[derive(Debug, Deserialize)]
struct GdcSample {
    submitter_id: String,
    id: String,
    sample_type: Option<String>,
    #[serde(default)]
    preservation_method: Option<String>,
    #[serde(default)]
    aliquots: Vec<GdcAliquot>,
    #[serde(default)]
    portions: Vec<GdcPortion>,
}

#[derive(Debug, Deserialize)]
struct GdcPortion {
    #[serde(default)]
    analytes: Vec<GdcAnalyte>,
}

#[derive(Debug, Deserialize)]
struct GdcAnalyte {
    analyte_type: Option<String>,
    #[serde(default)]
    aliquots: Vec<GdcAliquot>,
}

#[derive(Debug, Deserialize)]
struct GdcAliquot {
    submitter_id: String,
    id: String,
    #[serde(default)]
    analyte_type: Option<String>,
    #[serde(default)]
    annotations: Vec<GdcAnnotation>,
}

#[derive(Debug, Deserialize)]
struct GdcAnnotation {
    notes: Option<String>,
}

fn or_na(value: Option<&str>) -> String {
    value.unwrap_or("NA").to_string()
}

fn aliquot_record(
    case: &str,
    sample: &GdcSample,
    analyte_type: Option<&str>,
    aliquot: &GdcAliquot,
) -> AliquotRecord {
    // Distinct notes, joined in sorted order.
    let notes = aliquot
        .annotations
        .iter()
        .filter_map(|annotation| annotation.notes.as_deref())
        .filter(|notes| !notes.is_empty())
        .collect::<BTreeSet<_>>();
    let aliquot_annotation = if notes.is_empty() {
        None
    } else {
        Some(notes.into_iter().collect::<Vec<_>>().join(";"))
    };
    AliquotRecord {
        case: case.to_string(),
        sample_submitter_id: sample.submitter_id.clone(),
        sample_id: sample.id.clone(),
        sample_type: or_na(sample.sample_type.as_deref()),
        aliquot_submitter_id: aliquot.submitter_id.clone(),
        aliquot_id: aliquot.id.clone(),
        analyte_type: or_na(analyte_type),
        aliquot_annotation,
        preservation_method: sample.preservation_method.clone(),
    }
}

/// Flattens a sample GraphQL response into one record per aliquot.
///
/// CPTAC nests aliquots directly under samples; TCGA nests them under
/// portions and analytes.
pub fn flatten_samples(
    response: &str,
    case: &str,
    model: DataModel,
) -> Result<Vec<AliquotRecord>, CatalogError> {
    let response: SampleResponse = serde_json::from_str(response)
        .map_err(|err| CatalogError::GdcResponse(err.to_string()))?;

    let mut records = Vec::new();
    for sample in &response.data.sample {
        match model {
            DataModel::Cptac => {
                for aliquot in &sample.aliquots {
                    records.push(aliquot_record(
                        case,
                        sample,
                        aliquot.analyte_type.as_deref(),
                        aliquot,
                    ));
                }
            }
            DataModel::Tcga => {
                for analyte in sample.portions.iter().flat_map(|p| &p.analytes) {
                    for aliquot in &analyte.aliquots {
                        records.push(aliquot_record(
                            case,
                            sample,
                            analyte.analyte_type.as_deref(),
                            aliquot,
                        ));
                    }
                }
            }
        }
    }
    if records.is_empty() {
        tracing::warn!("no aliquots found for case {case} ({model} data model)");
    }
    Ok(records)
}

pub fn fetch_aliquots<C: GdcClient>(
    client: &C,
    case: &str,
    model: DataModel,
) -> Result<Vec<AliquotRecord>, CatalogError> {
    let response = client.query_samples(case, model)?;
    flatten_samples(&response, case, model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_params() {
        let query = FilesQuery::new(vec!["C3L-00026".to_string(), "11LU013".to_string()]);
        let params = query.params();
        assert_eq!(params["format"], "TSV");
        assert_eq!(params["size"], "2000");
        assert_eq!(
            params["filters"]["content"][0]["content"]["value"][1],
            "11LU013"
        );
        assert_eq!(
            params["filters"]["content"][1]["content"]["value"],
            "Aligned Reads"
        );
        assert!(params["fields"].as_str().unwrap().starts_with("file_id,file_name,"));
    }

    #[test]
    fn graphql_nesting_follows_model() {
        let cptac = samples_graphql("C3L-00001", DataModel::Cptac);
        assert!(cptac.contains("submitter_id: \"C3L-00001\""));
        assert!(!cptac.contains("portions"));
        let tcga = samples_graphql("TCGA-44-6146", DataModel::Tcga);
        assert!(tcga.contains("portions { analytes {"));
    }
}
