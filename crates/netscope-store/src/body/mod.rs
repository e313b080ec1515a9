//! Compressed body cache.
//!
//! Request and response bodies are kept apart from call metadata so that
//! large payloads are bounded by their own byte budget:
//! - bodies over the size limit are truncated and marked
//! - bodies are gzipped when that makes them smaller
//! - the least recently used bodies are evicted when the budget is exceeded
//!
//! # Module Structure
//!
//! - `types` - body roles, stored blobs and statistics
//! - `codec` - truncation and gzip encoding
//! - `store` - the LRU `BodyStore`

mod codec;
mod store;
mod types;

pub use codec::TRUNCATION_MARKER;
pub use store::BodyStore;
pub use types::{BodyCacheStats, BodyRole, CompressedBody};
