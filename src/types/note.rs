use thiserror::Error;

pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("Note text is empty or whitespace-only")]
    EmptyText,
    #[error("top_k must be between 1 and {MAX_TOP_K}, got {0}")]
    TopKOutOfRange(usize),
}

/// Validated resolution input: clinical note text plus a bounded candidate
/// count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalNote {
    text: String,
    top_k: usize,
}

impl ClinicalNote {
    /// This is the ONLY way to construct a ClinicalNote.
    /// It enforces the input invariants: non-empty text, `1 <= top_k <= 10`.
    pub fn new(text: impl Into<String>, top_k: Option<usize>) -> Result<Self, NoteError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(NoteError::EmptyText);
        }

        let top_k = top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k == 0 || top_k > MAX_TOP_K {
            return Err(NoteError::TopKOutOfRange(top_k));
        }

        Ok(ClinicalNote { text, top_k })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
