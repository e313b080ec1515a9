//! Types for the body cache - roles, stored blobs and statistics.

use serde::Serialize;
use std::fmt;

/// Which half of a call a body belongs to
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum BodyRole {
    Request,
    Response,
}

impl BodyRole {
    pub const ALL: [BodyRole; 2] = [BodyRole::Request, BodyRole::Response];

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyRole::Request => "REQUEST",
            BodyRole::Response => "RESPONSE",
        }
    }

    /// Cache key of this role's body for `call_id`
    pub fn key_for(&self, call_id: &str) -> String {
        format!("{call_id}:{}", self.as_str())
    }
}

impl fmt::Display for BodyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A body as held by the cache
#[derive(Debug, Clone)]
pub struct CompressedBody {
    /// Gzip stream when `is_compressed`, otherwise the raw UTF-8 bytes
    pub data: Vec<u8>,
    /// Length of the UTF-8 text `data` decodes to
    pub original_size: usize,
    pub is_compressed: bool,
}

impl CompressedBody {
    /// Bytes this entry counts against the cache budget
    pub fn stored_size(&self) -> usize {
        self.data.len()
    }
}

/// Snapshot of body cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyCacheStats {
    pub entry_count: usize,
    pub total_size_bytes: usize,
    pub max_size_bytes: usize,
    pub usage_percent: f64,
}

impl BodyCacheStats {
    pub fn new(entry_count: usize, total_size_bytes: usize, max_size_bytes: usize) -> Self {
        let usage_percent = if max_size_bytes > 0 {
            total_size_bytes as f64 * 100.0 / max_size_bytes as f64
        } else {
            0.0
        };
        Self {
            entry_count,
            total_size_bytes,
            max_size_bytes,
            usage_percent,
        }
    }
}
