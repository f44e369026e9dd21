use sha2::{Digest, Sha256};

/// Which pipeline product a cache entry holds. Keys for different stages of
/// the same text must never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Extract,
    Normalize,
    Match,
    Details,
}

impl Stage {
    fn tag(&self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::Extract => "extract",
            Stage::Normalize => "normalize",
            Stage::Match => "match",
            Stage::Details => "details",
        }
    }
}

/// Deterministic cache key: sha256 over the stage tag, the normalized input
/// text, and any stage-distinguishing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(stage: Stage, text: &str, params: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(stage.tag().as_bytes());
        hasher.update(b"\n");
        hasher.update(normalize(text).as_bytes());
        for param in params {
            hasher.update(b"\n");
            hasher.update(param.as_bytes());
        }

        let hex = hex::encode(hasher.finalize());
        CacheKey(format!("sha256:{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalization rules for keying:
/// - Lowercase
/// - Whitespace runs collapsed to a single space
/// Two notes differing only in case or spacing share one cache entry.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
