use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical clinical concept key (CUI-like), independent of surface text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    pub fn new(id: impl Into<String>) -> Self {
        ConceptId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// ICD-10 format: one uppercase letter, two digits, optional one- or
/// two-digit decimal extension (e.g. `E11.9`, `I10`, `R53.83`).
static ICD_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][0-9]{2}(\.[0-9]{1,2})?$").unwrap()
});

/// An ICD-10 diagnostic code string.
///
/// Holds the string as given; malformed codes are representable so that
/// validation can report on them. `is_well_formed` checks the format rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IcdCode(String);

impl IcdCode {
    pub fn new(code: impl Into<String>) -> Self {
        IcdCode(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        ICD_FORMAT.is_match(&self.0)
    }
}

impl std::fmt::Display for IcdCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
