//! Call metadata store.
//!
//! # Module Structure
//!
//! - `stored` - body-stripped records and their insertion-ordered index
//! - `network_store` - the session-aware `NetworkCallStore`

mod network_store;
mod stored;

pub use network_store::NetworkCallStore;
