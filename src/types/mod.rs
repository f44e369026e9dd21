pub mod identifiers;
pub mod note;
pub mod resolution;

pub use identifiers::{ConceptId, IcdCode};
pub use note::{ClinicalNote, NoteError, DEFAULT_TOP_K, MAX_TOP_K};
pub use resolution::{
    AnnotatedSpan, CodeCandidate, CodeDetails, CodeHit, CodeValidation, Concept, ConceptHit,
    Diagnostics, EntitySpan, Resolution, Service, SpanLabel, UpstreamError,
};
