// Library exports for the replay binary, benchmarks and integration tests

// ===== Core store =====
pub mod body;
pub mod call;
pub mod store;

// ===== Ambient =====
pub mod config;
pub mod metrics;
pub mod replay;

pub use body::{BodyCacheStats, BodyRole, BodyStore};
pub use call::{CallRequest, CallResponse, CallState, NetworkCall, RequestType};
pub use config::{SettingsProvider, SharedSettings, StaticSettings, StoreSettings};
pub use store::NetworkCallStore;
