use std::collections::HashMap;

use async_trait::async_trait;

use crate::types::{CodeCandidate, CodeDetails, CodeHit, Concept, IcdCode, UpstreamError};

/// External concept-to-code mapping capability.
///
/// Output is one group of zero-or-more hits per input concept, aligned by
/// index.
#[async_trait]
pub trait CodeMapper: Send + Sync {
    async fn map_concepts(
        &self,
        concepts: &[Concept],
    ) -> Result<Vec<Vec<CodeHit>>, UpstreamError>;
}

/// Pure lookup against the code terminology, independent of the pipeline.
/// `Ok(None)` means the code is unknown.
#[async_trait]
pub trait CodeDirectory: Send + Sync {
    async fn code_details(&self, code: &IcdCode) -> Result<Option<CodeDetails>, UpstreamError>;
}

/// Collapse duplicate codes across all concepts into one candidate each.
///
/// Applied exactly once per call. A duplicate keeps the maximum-confidence
/// contributor; on a confidence tie, the contributor whose source span
/// starts earliest in the note; remaining ties keep the first seen. The
/// output therefore never holds two candidates with the same code.
pub fn merge_candidates(concepts: &[Concept], groups: Vec<Vec<CodeHit>>) -> Vec<CodeCandidate> {
    debug_assert_eq!(concepts.len(), groups.len());

    let mut merged: Vec<CodeCandidate> = Vec::new();
    let mut by_code: HashMap<IcdCode, usize> = HashMap::new();

    for (concept, hits) in concepts.iter().zip(groups) {
        for hit in hits {
            let candidate = CodeCandidate::new(hit, concept);
            match by_code.get(&candidate.code) {
                None => {
                    by_code.insert(candidate.code.clone(), merged.len());
                    merged.push(candidate);
                }
                Some(&idx) => {
                    let kept = &merged[idx];
                    let wins = candidate.confidence > kept.confidence
                        || (candidate.confidence == kept.confidence
                            && candidate.source_span.start < kept.source_span.start);
                    if wins {
                        merged[idx] = candidate;
                    }
                }
            }
        }
    }

    merged
}

/// Order candidates by confidence descending, stable tie-break by the
/// contributing span's start offset, and truncate to `top_k`.
pub fn rank(mut candidates: Vec<CodeCandidate>, top_k: usize) -> Vec<CodeCandidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source_span.start.cmp(&b.source_span.start))
    });
    candidates.truncate(top_k);
    candidates
}
