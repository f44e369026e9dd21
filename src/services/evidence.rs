use serde_json::{json, Value};
use tracing::warn;

use crate::services::client::{JsonClient, ServiceConfig};
use crate::types::{IcdCode, Service, UpstreamError};

/// MedlinePlus Connect: consumer-health topic for a resolved ICD-10 code.
pub struct MedlineClient {
    client: JsonClient,
}

impl MedlineClient {
    pub fn new(config: ServiceConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: JsonClient::new(config, Service::Medline)?,
        })
    }

    pub async fn topic(&self, code: &IcdCode) -> Result<Value, UpstreamError> {
        self.client
            .get(&format!("/connect?code={}", code.as_str()))
            .await
    }
}

/// ClinicalTrials.gov registry search.
pub struct TrialsClient {
    client: JsonClient,
}

impl TrialsClient {
    pub fn new(config: ServiceConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: JsonClient::new(config, Service::Trials)?,
        })
    }

    pub async fn search(&self, condition: &str, max_results: usize) -> Result<Value, UpstreamError> {
        self.client
            .get(&format!(
                "/studies?condition={}&page_size={max_results}",
                urlencode(condition)
            ))
            .await
    }
}

/// PubMed eutils search.
pub struct PubMedClient {
    client: JsonClient,
}

impl PubMedClient {
    pub fn new(config: ServiceConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: JsonClient::new(config, Service::PubMed)?,
        })
    }

    pub async fn search(&self, term: &str, max_results: usize) -> Result<Value, UpstreamError> {
        self.client
            .get(&format!(
                "/esearch?term={}&retmax={max_results}",
                urlencode(term)
            ))
            .await
    }
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Search trials and PubMed for one condition. A failed source is reported
/// inside `sources`, not as a failure of the whole search.
pub async fn search_literature(
    trials: &TrialsClient,
    pubmed: &PubMedClient,
    condition: &str,
    max_results: usize,
) -> Value {
    let mut sources = serde_json::Map::new();
    let mut successful = 0;

    match trials.search(condition, max_results).await {
        Ok(value) => {
            successful += 1;
            sources.insert("clinical_trials".to_string(), value);
        }
        Err(e) => {
            warn!("trials source failed: {e}");
            sources.insert(
                "clinical_trials".to_string(),
                json!({ "error": e.to_string() }),
            );
        }
    }

    match pubmed.search(condition, max_results).await {
        Ok(value) => {
            successful += 1;
            sources.insert("pubmed".to_string(), value);
        }
        Err(e) => {
            warn!("pubmed source failed: {e}");
            sources.insert("pubmed".to_string(), json!({ "error": e.to_string() }));
        }
    }

    json!({
        "condition": condition,
        "sources": sources,
        "summary": { "total_sources": successful },
    })
}

/// Medline topic plus literature for a code/condition pair, with a summary
/// of which sources produced data.
pub async fn gather_evidence(
    medline: &MedlineClient,
    trials: &TrialsClient,
    pubmed: &PubMedClient,
    code: &IcdCode,
    condition: &str,
    max_results: usize,
) -> Value {
    let medline_info = match medline.topic(code).await {
        Ok(value) => value,
        Err(e) => {
            warn!("medline source failed: {e}");
            json!({ "error": e.to_string() })
        }
    };
    let has_medline = medline_info.get("error").is_none();

    let literature = search_literature(trials, pubmed, condition, max_results).await;
    let has_literature = literature["summary"]["total_sources"]
        .as_u64()
        .unwrap_or(0)
        > 0;

    json!({
        "icd10_code": code.as_str(),
        "condition": condition,
        "medline_info": medline_info,
        "literature": literature,
        "summary": {
            "has_medline_info": has_medline,
            "has_literature": has_literature,
        },
    })
}
