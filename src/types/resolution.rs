use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::identifiers::{ConceptId, IcdCode};

/// Clinical NER label attached to an extracted span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum SpanLabel {
    Disease,
    Symptom,
    Medication,
    Procedure,
    Anatomy,
    Other(String),
}

impl SpanLabel {
    pub fn as_label(&self) -> &str {
        match self {
            SpanLabel::Disease => "DISEASE",
            SpanLabel::Symptom => "SYMPTOM",
            SpanLabel::Medication => "MEDICATION",
            SpanLabel::Procedure => "PROCEDURE",
            SpanLabel::Anatomy => "ANATOMY",
            SpanLabel::Other(s) => s,
        }
    }
}

impl From<String> for SpanLabel {
    fn from(s: String) -> Self {
        match s.as_str() {
            "DISEASE" => SpanLabel::Disease,
            "SYMPTOM" => SpanLabel::Symptom,
            "MEDICATION" => SpanLabel::Medication,
            "PROCEDURE" => SpanLabel::Procedure,
            "ANATOMY" => SpanLabel::Anatomy,
            _ => SpanLabel::Other(s),
        }
    }
}

impl From<SpanLabel> for String {
    fn from(label: SpanLabel) -> String {
        label.as_label().to_string()
    }
}

/// A contiguous substring of the input identified as a clinical entity.
/// Byte offsets into the original note text; `start < end <= text.len()`.
/// Spans within one extraction may overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub label: SpanLabel,
    pub start: usize,
    pub end: usize,
}

/// A normalization hit for one span: the canonical concept it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptHit {
    pub concept_id: ConceptId,
    pub canonical_name: String,
}

/// The normalized identity of an EntitySpan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: ConceptId,
    pub canonical_name: String,
    pub source_span: EntitySpan,
}

/// One code emitted by the mapping backend for a concept, before merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeHit {
    pub code: IcdCode,
    pub display_name: String,
    pub confidence: f32,
}

/// A ranked diagnostic code with provenance back to the note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeCandidate {
    pub code: IcdCode,
    pub display_name: String,
    pub source_concept_id: ConceptId,
    pub confidence: f32,
    pub source_span: EntitySpan,
}

impl CodeCandidate {
    /// Confidence is clamped to `[0.0, 1.0]` at construction so backend
    /// scores outside the contract range can never reach callers. NaN
    /// would survive `clamp`, so it is pinned to `0.0` first.
    pub fn new(hit: CodeHit, concept: &Concept) -> Self {
        let confidence = if hit.confidence.is_nan() {
            0.0
        } else {
            hit.confidence.clamp(0.0, 1.0)
        };
        CodeCandidate {
            code: hit.code,
            display_name: hit.display_name,
            source_concept_id: concept.concept_id.clone(),
            confidence,
            source_span: concept.source_span.clone(),
        }
    }
}

/// Per-span normalization outcome, reported alongside the ranked codes.
/// `concept_id: None` marks a span no concept could be found for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedSpan {
    pub text: String,
    pub label: SpanLabel,
    pub start: usize,
    pub end: usize,
    pub concept_id: Option<ConceptId>,
    pub canonical_name: Option<String>,
}

impl AnnotatedSpan {
    pub fn from_span(span: &EntitySpan, hit: Option<&ConceptHit>) -> Self {
        AnnotatedSpan {
            text: span.text.clone(),
            label: span.label.clone(),
            start: span.start,
            end: span.end,
            concept_id: hit.map(|h| h.concept_id.clone()),
            canonical_name: hit.map(|h| h.canonical_name.clone()),
        }
    }
}

/// Counters describing what the pipeline saw and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub spans_extracted: usize,
    pub spans_unmapped: usize,
    pub degraded: bool,
}

/// The final result of one resolution call.
///
/// `codes` is sorted by confidence descending with a stable tie-break on the
/// source span's start offset, truncated to the note's `top_k`, and never
/// contains two entries with the same code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub codes: Vec<CodeCandidate>,
    pub entities: Vec<AnnotatedSpan>,
    pub diagnostics: Diagnostics,
}

impl Resolution {
    pub fn empty(diagnostics: Diagnostics) -> Self {
        Resolution {
            codes: Vec::new(),
            entities: Vec::new(),
            diagnostics,
        }
    }
}

/// Directory metadata for one ICD-10 code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDetails {
    pub code: IcdCode,
    pub name: String,
    pub category: String,
    pub block: String,
    pub chapter: String,
}

/// Answer to a code validation query. Never an error: an unknown code is a
/// valid answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeValidation {
    pub code: IcdCode,
    pub is_valid_format: bool,
    pub is_known_code: bool,
}

/// The external collaborators this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    Recognition,
    Terminology,
    CodeMapping,
    Directory,
    Inference,
    Solver,
    Vision,
    Medline,
    Trials,
    PubMed,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::Recognition => "entity recognition",
            Service::Terminology => "terminology normalization",
            Service::CodeMapping => "code mapping",
            Service::Directory => "code directory",
            Service::Inference => "bayesian inference",
            Service::Solver => "optimization solver",
            Service::Vision => "medical vision",
            Service::Medline => "medline plus",
            Service::Trials => "clinical trials",
            Service::PubMed => "pubmed",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A collaborator service was unreachable, errored, or returned a response
/// that violates its contract. Never silently converted into an empty
/// result; the orchestrator decides whether to retry, degrade, or fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{service} service failure: {reason}")]
pub struct UpstreamError {
    pub service: Service,
    pub reason: String,
}

impl UpstreamError {
    pub fn new(service: Service, reason: impl Into<String>) -> Self {
        UpstreamError {
            service,
            reason: reason.into(),
        }
    }
}
