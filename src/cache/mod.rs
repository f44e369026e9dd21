pub mod key;
pub mod store;

pub use key::{CacheKey, Stage};
pub use store::{CacheConfig, CacheEntry, ResolutionCache};
