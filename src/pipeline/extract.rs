use async_trait::async_trait;

use crate::types::{EntitySpan, Service, UpstreamError};

/// External named-entity-recognition capability.
///
/// Implementations return raw labeled spans over the given text, in any
/// order. Transport or service failure is an `UpstreamError`, never an
/// empty result — an empty result means the service ran and found nothing.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    async fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>, UpstreamError>;
}

/// Run one extraction: call the backend, reject offset-invalid spans as a
/// contract violation, and re-sort by start offset so the ordering
/// guarantee never depends on the backend.
pub async fn run_extraction(
    backend: &dyn EntityRecognizer,
    text: &str,
) -> Result<Vec<EntitySpan>, UpstreamError> {
    let mut spans = backend.recognize(text).await?;

    for span in &spans {
        if span.start >= span.end || span.end > text.len() {
            return Err(UpstreamError::new(
                Service::Recognition,
                format!(
                    "span offsets {}..{} invalid for {}-byte text",
                    span.start,
                    span.end,
                    text.len()
                ),
            ));
        }
    }

    spans.sort_by_key(|s| (s.start, s.end));
    Ok(spans)
}
