use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::pipeline::{CodeDirectory, CodeMapper, ConceptNormalizer, EntityRecognizer};
use crate::services::client::{JsonClient, ServiceConfig};
use crate::types::{
    CodeDetails, CodeHit, Concept, ConceptHit, ConceptId, EntitySpan, IcdCode, Service, SpanLabel,
    UpstreamError,
};

/// HTTP implementation of the coding pipeline's collaborator seams:
/// `POST /ner`, `POST /normalize`, `POST /map`, `GET /codes/{code}`.
pub struct HttpCodingService {
    recognition: JsonClient,
    terminology: JsonClient,
    mapping: JsonClient,
    directory: JsonClient,
}

impl HttpCodingService {
    /// All four endpoint families on one base URL.
    pub fn new(config: ServiceConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            recognition: JsonClient::new(config.clone(), Service::Recognition)?,
            terminology: JsonClient::new(config.clone(), Service::Terminology)?,
            mapping: JsonClient::new(config.clone(), Service::CodeMapping)?,
            directory: JsonClient::new(config, Service::Directory)?,
        })
    }
}

#[derive(Serialize)]
struct NerRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct NerResponse {
    entities: Vec<NerEntity>,
}

#[derive(Deserialize)]
struct NerEntity {
    text: String,
    label: String,
    start_char: usize,
    end_char: usize,
}

#[derive(Serialize)]
struct NormalizeRequest<'a> {
    terms: Vec<NormalizeTerm<'a>>,
}

#[derive(Serialize)]
struct NormalizeTerm<'a> {
    text: &'a str,
    label: &'a str,
}

#[derive(Deserialize)]
struct NormalizeResponse {
    concepts: Vec<Option<NormalizedConcept>>,
}

#[derive(Deserialize)]
struct NormalizedConcept {
    cui: String,
    name: String,
}

#[derive(Serialize)]
struct MapRequest<'a> {
    concept_ids: Vec<&'a str>,
}

#[derive(Deserialize)]
struct MapResponse {
    candidates: Vec<Vec<MappedCode>>,
}

#[derive(Deserialize)]
struct MappedCode {
    code: String,
    name: String,
    score: f32,
}

fn decode<T: serde::de::DeserializeOwned>(
    service: Service,
    value: serde_json::Value,
) -> Result<T, UpstreamError> {
    serde_json::from_value(value)
        .map_err(|e| UpstreamError::new(service, format!("malformed response body: {e}")))
}

#[async_trait]
impl EntityRecognizer for HttpCodingService {
    async fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>, UpstreamError> {
        let value = self.recognition.post("/ner", &NerRequest { text }).await?;
        let response: NerResponse = decode(Service::Recognition, value)?;

        Ok(response
            .entities
            .into_iter()
            .map(|e| EntitySpan {
                text: e.text,
                label: SpanLabel::from(e.label),
                start: e.start_char,
                end: e.end_char,
            })
            .collect())
    }
}

#[async_trait]
impl ConceptNormalizer for HttpCodingService {
    async fn normalize(
        &self,
        spans: &[EntitySpan],
    ) -> Result<Vec<Option<ConceptHit>>, UpstreamError> {
        let request = NormalizeRequest {
            terms: spans
                .iter()
                .map(|s| NormalizeTerm {
                    text: &s.text,
                    label: s.label.as_label(),
                })
                .collect(),
        };

        let value = self.terminology.post("/normalize", &request).await?;
        let response: NormalizeResponse = decode(Service::Terminology, value)?;

        Ok(response
            .concepts
            .into_iter()
            .map(|c| {
                c.map(|c| ConceptHit {
                    concept_id: ConceptId::new(c.cui),
                    canonical_name: c.name,
                })
            })
            .collect())
    }
}

#[async_trait]
impl CodeMapper for HttpCodingService {
    async fn map_concepts(
        &self,
        concepts: &[Concept],
    ) -> Result<Vec<Vec<CodeHit>>, UpstreamError> {
        let request = MapRequest {
            concept_ids: concepts.iter().map(|c| c.concept_id.as_str()).collect(),
        };

        let value = self.mapping.post("/map", &request).await?;
        let response: MapResponse = decode(Service::CodeMapping, value)?;

        Ok(response
            .candidates
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .map(|c| CodeHit {
                        code: IcdCode::new(c.code),
                        display_name: c.name,
                        confidence: c.score,
                    })
                    .collect()
            })
            .collect())
    }
}

#[async_trait]
impl CodeDirectory for HttpCodingService {
    async fn code_details(&self, code: &IcdCode) -> Result<Option<CodeDetails>, UpstreamError> {
        let path = format!("/codes/{}", code.as_str());
        match self.directory.get_opt(&path).await? {
            None => Ok(None),
            Some(value) => decode(Service::Directory, value).map(Some),
        }
    }
}
