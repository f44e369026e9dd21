//! In-process coding backend.
//!
//! `StaticCoder` implements all four pipeline seams against a small
//! built-in term table. It is the offline fallback when no recognition or
//! terminology service is configured, and the deterministic backend the
//! test suite drives.

use async_trait::async_trait;

use crate::pipeline::{CodeDirectory, CodeMapper, ConceptNormalizer, EntityRecognizer};
use crate::types::{
    CodeDetails, CodeHit, Concept, ConceptHit, ConceptId, EntitySpan, IcdCode, SpanLabel,
    UpstreamError,
};

struct LexiconEntry {
    term: &'static str,
    label: SpanLabel,
    concept_id: &'static str,
    canonical_name: &'static str,
    codes: &'static [(&'static str, &'static str, f32)],
}

/// Term table. Ordered longest-term-first so multi-word terms win over
/// their substrings during recognition.
fn lexicon() -> &'static [LexiconEntry] {
    &[
        LexiconEntry {
            term: "type 2 diabetes mellitus",
            label: SpanLabel::Disease,
            concept_id: "C0011860",
            canonical_name: "Diabetes Mellitus, Non-Insulin-Dependent",
            codes: &[("E11.9", "Type 2 diabetes mellitus without complications", 0.9)],
        },
        LexiconEntry {
            term: "essential hypertension",
            label: SpanLabel::Disease,
            concept_id: "C0085580",
            canonical_name: "Essential Hypertension",
            codes: &[("I10", "Essential (primary) hypertension", 0.9)],
        },
        LexiconEntry {
            term: "atrial fibrillation",
            label: SpanLabel::Disease,
            concept_id: "C0004238",
            canonical_name: "Atrial Fibrillation",
            codes: &[("I48.91", "Unspecified atrial fibrillation", 0.88)],
        },
        LexiconEntry {
            term: "hypertension",
            label: SpanLabel::Disease,
            concept_id: "C0020538",
            canonical_name: "Hypertensive disease",
            codes: &[("I10", "Essential (primary) hypertension", 0.8)],
        },
        LexiconEntry {
            term: "chest pain",
            label: SpanLabel::Symptom,
            concept_id: "C0008031",
            canonical_name: "Chest Pain",
            codes: &[("R07.9", "Chest pain, unspecified", 0.85)],
        },
        LexiconEntry {
            term: "diabetes",
            label: SpanLabel::Disease,
            concept_id: "C0011849",
            canonical_name: "Diabetes Mellitus",
            codes: &[("E11.9", "Type 2 diabetes mellitus without complications", 0.7)],
        },
        LexiconEntry {
            term: "fatigue",
            label: SpanLabel::Symptom,
            concept_id: "C0015672",
            canonical_name: "Fatigue",
            codes: &[("R53.83", "Other fatigue", 0.85)],
        },
        LexiconEntry {
            term: "metformin",
            label: SpanLabel::Medication,
            concept_id: "C0025598",
            canonical_name: "Metformin",
            codes: &[],
        },
    ]
}

fn code_directory() -> &'static [(&'static str, &'static str, &'static str, &'static str, &'static str)] {
    &[
        (
            "E11.9",
            "Type 2 diabetes mellitus without complications",
            "Endocrine, nutritional and metabolic diseases",
            "Diabetes mellitus",
            "Endocrine, nutritional and metabolic diseases",
        ),
        (
            "I10",
            "Essential (primary) hypertension",
            "Diseases of the circulatory system",
            "Hypertensive diseases",
            "Diseases of the circulatory system",
        ),
        (
            "I48.91",
            "Unspecified atrial fibrillation",
            "Diseases of the circulatory system",
            "Other forms of heart disease",
            "Diseases of the circulatory system",
        ),
        (
            "R07.9",
            "Chest pain, unspecified",
            "Symptoms, signs and abnormal clinical and laboratory findings",
            "Symptoms and signs involving the circulatory and respiratory systems",
            "Symptoms, signs and abnormal clinical and laboratory findings",
        ),
        (
            "R53.83",
            "Other fatigue",
            "Symptoms, signs and abnormal clinical and laboratory findings",
            "General symptoms and signs",
            "Symptoms, signs and abnormal clinical and laboratory findings",
        ),
    ]
}

/// Deterministic lexeme matcher over the built-in table.
#[derive(Debug, Default, Clone)]
pub struct StaticCoder;

impl StaticCoder {
    pub fn new() -> Self {
        StaticCoder
    }
}

#[async_trait]
impl EntityRecognizer for StaticCoder {
    /// Case-insensitive longest-match scan. ASCII lowercasing keeps byte
    /// offsets aligned with the original text.
    async fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>, UpstreamError> {
        let haystack = text.to_ascii_lowercase();
        let mut spans: Vec<EntitySpan> = Vec::new();

        for entry in lexicon() {
            let mut from = 0;
            while let Some(pos) = haystack[from..].find(entry.term) {
                let start = from + pos;
                let end = start + entry.term.len();
                from = end;

                let claimed = spans.iter().any(|s| s.start < end && start < s.end);
                if claimed {
                    continue;
                }

                spans.push(EntitySpan {
                    text: text[start..end].to_string(),
                    label: entry.label.clone(),
                    start,
                    end,
                });
            }
        }

        spans.sort_by_key(|s| (s.start, s.end));
        Ok(spans)
    }
}

#[async_trait]
impl ConceptNormalizer for StaticCoder {
    async fn normalize(
        &self,
        spans: &[EntitySpan],
    ) -> Result<Vec<Option<ConceptHit>>, UpstreamError> {
        let hits = spans
            .iter()
            .map(|span| {
                let term = span.text.to_ascii_lowercase();
                lexicon().iter().find(|e| e.term == term).map(|e| ConceptHit {
                    concept_id: ConceptId::new(e.concept_id),
                    canonical_name: e.canonical_name.to_string(),
                })
            })
            .collect();
        Ok(hits)
    }
}

#[async_trait]
impl CodeMapper for StaticCoder {
    async fn map_concepts(
        &self,
        concepts: &[Concept],
    ) -> Result<Vec<Vec<CodeHit>>, UpstreamError> {
        let groups = concepts
            .iter()
            .map(|concept| {
                lexicon()
                    .iter()
                    .find(|e| e.concept_id == concept.concept_id.as_str())
                    .map(|e| {
                        e.codes
                            .iter()
                            .map(|(code, name, confidence)| CodeHit {
                                code: IcdCode::new(*code),
                                display_name: name.to_string(),
                                confidence: *confidence,
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();
        Ok(groups)
    }
}

#[async_trait]
impl CodeDirectory for StaticCoder {
    async fn code_details(&self, code: &IcdCode) -> Result<Option<CodeDetails>, UpstreamError> {
        let details = code_directory()
            .iter()
            .find(|(c, ..)| *c == code.as_str())
            .map(|(code, name, category, block, chapter)| CodeDetails {
                code: IcdCode::new(*code),
                name: name.to_string(),
                category: category.to_string(),
                block: block.to_string(),
                chapter: chapter.to_string(),
            });
        Ok(details)
    }
}
