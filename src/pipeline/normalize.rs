use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::types::{ConceptHit, EntitySpan, Service, UpstreamError};

/// External terminology-normalization capability.
///
/// Output is aligned index-for-index with the input batch: `None` at
/// position `i` means span `i` has no canonical concept (an answer, not an
/// error). A batch whose output length differs from its input is a
/// contract violation.
#[async_trait]
pub trait ConceptNormalizer: Send + Sync {
    async fn normalize(
        &self,
        spans: &[EntitySpan],
    ) -> Result<Vec<Option<ConceptHit>>, UpstreamError>;
}

/// Batched normalization driver.
///
/// Splits the spans into `batch_size` chunks and issues them with at most
/// `concurrency` outbound calls in flight. Results are recombined by chunk
/// position, never by response arrival order, so per-span independence
/// holds under any batching strategy.
pub async fn run_normalization(
    backend: &Arc<dyn ConceptNormalizer>,
    spans: &[EntitySpan],
    batch_size: usize,
    concurrency: usize,
) -> Result<Vec<Option<ConceptHit>>, UpstreamError> {
    if spans.is_empty() {
        return Ok(Vec::new());
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let batches: Vec<_> = spans
        .chunks(batch_size.max(1))
        .map(|chunk| {
            let sem = Arc::clone(&semaphore);
            async move {
                let _permit = sem.acquire().await.map_err(|e| {
                    UpstreamError::new(Service::Terminology, format!("batch scheduling failed: {e}"))
                })?;
                let hits = backend.normalize(chunk).await?;
                if hits.len() != chunk.len() {
                    return Err(UpstreamError::new(
                        Service::Terminology,
                        format!(
                            "batch of {} spans answered with {} results",
                            chunk.len(),
                            hits.len()
                        ),
                    ));
                }
                Ok(hits)
            }
        })
        .collect();

    let results = futures::future::join_all(batches).await;

    let mut merged = Vec::with_capacity(spans.len());
    for result in results {
        merged.extend(result?);
    }
    Ok(merged)
}
