pub mod extract;
pub mod matching;
pub mod normalize;
pub mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheKey, ResolutionCache, Stage};
use crate::types::{
    AnnotatedSpan, ClinicalNote, CodeCandidate, CodeDetails, CodeValidation, Concept, ConceptHit,
    Diagnostics, EntitySpan, IcdCode, NoteError, Resolution, UpstreamError,
};

pub use extract::{run_extraction, EntityRecognizer};
pub use matching::{merge_candidates, rank, CodeDirectory, CodeMapper};
pub use normalize::{run_normalization, ConceptNormalizer};
pub use state::{ResolveState, StateError, StateTracker};

/// Bounded backoff for upstream failures. `attempts` counts total tries,
/// not retries; the backoff doubles between tries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Whole-call deadline; in-flight upstream calls are abandoned on expiry.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Spans per outbound normalization batch.
    pub batch_size: usize,
    /// Normalization batches in flight at once.
    pub batch_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            batch_size: 16,
            batch_concurrency: 4,
        }
    }
}

/// Public error surface of the resolution pipeline.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidInput(#[from] NoteError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("Resolution timed out after {0:?}")]
    Timeout(Duration),
}

/// Orchestrates text -> entities -> concepts -> ranked codes.
///
/// Backends are injected behind the stage traits; the cache is an
/// explicitly constructed component shared across resolvers, consulted
/// before and populated after each stage and for the whole pipeline.
pub struct CodeResolver {
    recognizer: Arc<dyn EntityRecognizer>,
    normalizer: Arc<dyn ConceptNormalizer>,
    mapper: Arc<dyn CodeMapper>,
    directory: Arc<dyn CodeDirectory>,
    cache: Arc<ResolutionCache>,
    config: ResolverConfig,
}

impl CodeResolver {
    pub fn new(
        recognizer: Arc<dyn EntityRecognizer>,
        normalizer: Arc<dyn ConceptNormalizer>,
        mapper: Arc<dyn CodeMapper>,
        directory: Arc<dyn CodeDirectory>,
        cache: Arc<ResolutionCache>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            recognizer,
            normalizer,
            mapper,
            directory,
            cache,
            config,
        }
    }

    /// Resolve one clinical note to ranked code candidates.
    ///
    /// Extraction failure (after retries) fails the call; normalization or
    /// matching failure degrades to a partial result carrying whatever the
    /// earlier stages produced, marked `degraded`. Degraded results are
    /// never cached.
    pub async fn resolve(&self, note: &ClinicalNote) -> Result<Resolution, ResolveError> {
        tokio::time::timeout(self.config.timeout, self.resolve_inner(note))
            .await
            .map_err(|_| ResolveError::Timeout(self.config.timeout))?
    }

    async fn resolve_inner(&self, note: &ClinicalNote) -> Result<Resolution, ResolveError> {
        let mut tracker = StateTracker::new();
        let text = note.text();
        let top_k = note.top_k().to_string();
        let key = CacheKey::derive(Stage::Resolve, text, &[&top_k]);

        if let Some(cached) = self.cache.get::<Resolution>(&key) {
            debug!(key = key.as_str(), "resolution cache hit");
            step(&mut tracker, ResolveState::Done);
            return Ok(cached);
        }

        // Stage 1: extraction. Nothing to degrade to if this fails.
        step(&mut tracker, ResolveState::Extracting);
        let spans = match self.extract_cached(text).await {
            Ok(spans) => spans,
            Err(e) => {
                step(&mut tracker, ResolveState::Failed);
                return Err(e.into());
            }
        };

        let mut diagnostics = Diagnostics {
            spans_extracted: spans.len(),
            ..Diagnostics::default()
        };

        // No recognizable entities is a valid outcome, not an error.
        if spans.is_empty() {
            step(&mut tracker, ResolveState::Ranked);
            let resolution = Resolution::empty(diagnostics);
            self.cache.insert(key, &resolution);
            step(&mut tracker, ResolveState::Done);
            return Ok(resolution);
        }

        // Stage 2: normalization. Failure degrades to bare entities.
        step(&mut tracker, ResolveState::Normalizing);
        let hits = match self.normalize_cached(text, &spans).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("degrading to unnormalized entities: {e}");
                diagnostics.degraded = true;
                diagnostics.spans_unmapped = spans.len();
                step(&mut tracker, ResolveState::Ranked);
                step(&mut tracker, ResolveState::Done);
                return Ok(Resolution {
                    codes: Vec::new(),
                    entities: annotate_spans(&spans, None),
                    diagnostics,
                });
            }
        };

        let entities = annotate_spans(&spans, Some(&hits));
        let concepts = to_concepts(&spans, &hits);
        diagnostics.spans_unmapped = spans.len() - concepts.len();

        // Every span unmapped is likewise a valid empty outcome.
        if concepts.is_empty() {
            step(&mut tracker, ResolveState::Ranked);
            let resolution = Resolution {
                codes: Vec::new(),
                entities,
                diagnostics,
            };
            self.cache.insert(key, &resolution);
            step(&mut tracker, ResolveState::Done);
            return Ok(resolution);
        }

        // Stage 3: matching. Failure degrades to annotated entities.
        step(&mut tracker, ResolveState::Matching);
        let merged = match self.match_cached(text, &concepts).await {
            Ok(merged) => merged,
            Err(e) => {
                warn!("degrading to uncoded entities: {e}");
                diagnostics.degraded = true;
                step(&mut tracker, ResolveState::Ranked);
                step(&mut tracker, ResolveState::Done);
                return Ok(Resolution {
                    codes: Vec::new(),
                    entities,
                    diagnostics,
                });
            }
        };

        step(&mut tracker, ResolveState::Ranked);
        let resolution = Resolution {
            codes: rank(merged, note.top_k()),
            entities,
            diagnostics,
        };
        self.cache.insert(key, &resolution);
        step(&mut tracker, ResolveState::Done);
        Ok(resolution)
    }

    /// Extraction plus normalization only: the annotated entity view of a
    /// note, for callers that want entities rather than codes. Shares the
    /// per-stage caches with `resolve`.
    pub async fn annotate(&self, text: &str) -> Result<Vec<AnnotatedSpan>, ResolveError> {
        if text.trim().is_empty() {
            return Err(NoteError::EmptyText.into());
        }

        tokio::time::timeout(self.config.timeout, async {
            let spans = self.extract_cached(text).await?;
            if spans.is_empty() {
                return Ok(Vec::new());
            }
            match self.normalize_cached(text, &spans).await {
                Ok(hits) => Ok(annotate_spans(&spans, Some(&hits))),
                Err(e) => {
                    warn!("annotating without concepts: {e}");
                    Ok(annotate_spans(&spans, None))
                }
            }
        })
        .await
        .map_err(|_| ResolveError::Timeout(self.config.timeout))?
    }

    /// Pure directory lookup, independent of the pipeline state machine,
    /// with its own cache stage.
    pub async fn code_details(&self, code: &IcdCode) -> Result<Option<CodeDetails>, ResolveError> {
        let key = CacheKey::derive(Stage::Details, code.as_str(), &[]);
        if let Some(details) = self.cache.get::<CodeDetails>(&key) {
            return Ok(Some(details));
        }

        let details = self
            .with_retry(|| self.directory.code_details(code))
            .await?;
        if let Some(details) = &details {
            self.cache.insert(key, details);
        }
        Ok(details)
    }

    /// Never fails: a directory outage degrades to "not known", and an
    /// unknown or malformed code is an answer rather than an error.
    pub async fn validate_code(&self, code: &IcdCode) -> CodeValidation {
        let is_valid_format = code.is_well_formed();

        let is_known_code = if is_valid_format {
            match self.code_details(code).await {
                Ok(details) => details.is_some(),
                Err(e) => {
                    warn!(code = code.as_str(), "validation lookup failed: {e}");
                    false
                }
            }
        } else {
            false
        };

        CodeValidation {
            code: code.clone(),
            is_valid_format,
            is_known_code,
        }
    }

    async fn extract_cached(&self, text: &str) -> Result<Vec<EntitySpan>, UpstreamError> {
        let key = CacheKey::derive(Stage::Extract, text, &[]);
        if let Some(spans) = self.cache.get::<Vec<EntitySpan>>(&key) {
            debug!(key = key.as_str(), "extraction cache hit");
            return Ok(spans);
        }

        let spans = self
            .with_retry(|| run_extraction(self.recognizer.as_ref(), text))
            .await?;
        self.cache.insert(key, &spans);
        Ok(spans)
    }

    async fn normalize_cached(
        &self,
        text: &str,
        spans: &[EntitySpan],
    ) -> Result<Vec<Option<ConceptHit>>, UpstreamError> {
        let key = CacheKey::derive(Stage::Normalize, text, &[]);
        if let Some(hits) = self.cache.get::<Vec<Option<ConceptHit>>>(&key) {
            debug!(key = key.as_str(), "normalization cache hit");
            return Ok(hits);
        }

        let hits = self
            .with_retry(|| {
                run_normalization(
                    &self.normalizer,
                    spans,
                    self.config.batch_size,
                    self.config.batch_concurrency,
                )
            })
            .await?;
        self.cache.insert(key, &hits);
        Ok(hits)
    }

    async fn match_cached(
        &self,
        text: &str,
        concepts: &[Concept],
    ) -> Result<Vec<CodeCandidate>, UpstreamError> {
        let key = CacheKey::derive(Stage::Match, text, &[]);
        if let Some(merged) = self.cache.get::<Vec<CodeCandidate>>(&key) {
            debug!(key = key.as_str(), "matching cache hit");
            return Ok(merged);
        }

        let groups = self
            .with_retry(|| async {
                let groups = self.mapper.map_concepts(concepts).await?;
                if groups.len() != concepts.len() {
                    return Err(UpstreamError::new(
                        crate::types::Service::CodeMapping,
                        format!(
                            "{} concepts answered with {} groups",
                            concepts.len(),
                            groups.len()
                        ),
                    ));
                }
                Ok(groups)
            })
            .await?;

        let merged = merge_candidates(concepts, groups);
        self.cache.insert(key, &merged);
        Ok(merged)
    }

    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, UpstreamError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let attempts = self.config.retry.attempts.max(1);
        let mut backoff = self.config.retry.initial_backoff;
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!(attempt, "retrying after {e}");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Transitions issued here follow the legal table by construction.
fn step(tracker: &mut StateTracker, next: ResolveState) {
    if let Err(err) = tracker.advance(next) {
        debug_assert!(false, "{err}");
        tracing::error!("{err}");
    }
}

fn annotate_spans(spans: &[EntitySpan], hits: Option<&[Option<ConceptHit>]>) -> Vec<AnnotatedSpan> {
    spans
        .iter()
        .enumerate()
        .map(|(i, span)| {
            let hit = hits.and_then(|hits| hits.get(i).and_then(|h| h.as_ref()));
            AnnotatedSpan::from_span(span, hit)
        })
        .collect()
}

fn to_concepts(spans: &[EntitySpan], hits: &[Option<ConceptHit>]) -> Vec<Concept> {
    spans
        .iter()
        .zip(hits)
        .filter_map(|(span, hit)| {
            hit.as_ref().map(|h| Concept {
                concept_id: h.concept_id.clone(),
                canonical_name: h.canonical_name.clone(),
                source_span: span.clone(),
            })
        })
        .collect()
}
