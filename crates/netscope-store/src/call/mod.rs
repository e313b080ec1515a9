//! Captured call records and session identity.
//!
//! # Module Structure
//!
//! - `types` - `NetworkCall` and its request/response variants
//! - `session` - last seen app instance per (device, package)

mod session;
mod types;

pub use session::{SessionChange, SessionKey, SessionTracker};
pub use types::{
    CallRequest, CallResponse, CallState, GraphQlOperationType, Headers, NetworkCall, RequestType,
};
