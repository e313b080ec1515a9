//! Types for captured network calls - requests, responses and their kinds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header map for requests and responses
pub type Headers = BTreeMap<String, String>;

/// A single captured call: one request, optionally paired with its response.
///
/// Calls are immutable values. An update replaces the whole record under the
/// same `call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCall {
    pub call_id: String,
    pub device_id: String,
    pub package_name: String,
    /// Changes every time the monitored process restarts
    pub app_instance: String,
    /// Unix timestamp in milliseconds
    pub start_time: i64,
    pub name: String,
    pub request: CallRequest,
    /// `None` while the call is still pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<CallResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub request_type: RequestType,
}

/// Protocol flavour of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RequestType {
    #[default]
    Http,
    #[serde(rename = "graphql", rename_all = "camelCase")]
    GraphQl {
        #[serde(default)]
        persisted: bool,
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation_name: Option<String>,
        operation_type: GraphQlOperationType,
    },
    Grpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphQlOperationType {
    Query,
    Mutation,
    Subscription,
}

/// Outcome of a call once it has completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CallResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        duration_ms: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(default)]
        headers: Headers,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
    #[serde(rename_all = "camelCase")]
    Failure { duration_ms: f64, issue: String },
}

/// Lifecycle position of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Request seen, no response yet
    Pending,
    Completed,
    Failed,
}

impl NetworkCall {
    pub fn state(&self) -> CallState {
        match self.response {
            None => CallState::Pending,
            Some(CallResponse::Success { .. }) => CallState::Completed,
            Some(CallResponse::Failure { .. }) => CallState::Failed,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.response.is_none()
    }

    /// HTTP status code of a successful response
    pub fn status_code(&self) -> Option<u16> {
        match self.response {
            Some(CallResponse::Success { status_code, .. }) => status_code,
            _ => None,
        }
    }

    pub fn duration_ms(&self) -> Option<f64> {
        self.response.as_ref().map(CallResponse::duration_ms)
    }

    /// Whether this call belongs to the given device and package
    pub fn belongs_to(&self, device_id: &str, package_name: &str) -> bool {
        self.device_id == device_id && self.package_name == package_name
    }
}

impl CallResponse {
    pub fn duration_ms(&self) -> f64 {
        match self {
            CallResponse::Success { duration_ms, .. } | CallResponse::Failure { duration_ms, .. } => {
                *duration_ms
            }
        }
    }

    /// Response body, only ever present on a success
    pub fn body(&self) -> Option<&str> {
        match self {
            CallResponse::Success { body, .. } => body.as_deref(),
            CallResponse::Failure { .. } => None,
        }
    }
}
