//! Offline ingestion of newline-delimited JSON call events.
//!
//! Each non-empty line is one event, for example:
//!
//! ```text
//! {"event":"insert","call":{"callId":"1","deviceId":"d","packageName":"p", ...}}
//! {"event":"update","call":{...}}
//! {"event":"deleteCall","callId":"1"}
//! {"event":"deleteApp","deviceId":"d","packageName":"p"}
//! {"event":"clear"}
//! ```
//!
//! Lines that fail to decode never reach the store. They are skipped with a
//! warning, or abort the replay in strict mode.

use crate::call::NetworkCall;
use crate::store::NetworkCallStore;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read events: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One ingestion or maintenance event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum IngestEvent {
    /// Request seen
    Insert { call: NetworkCall },
    /// Response seen
    Update { call: NetworkCall },
    #[serde(rename_all = "camelCase")]
    DeleteCall { call_id: String },
    #[serde(rename_all = "camelCase")]
    DeleteApp {
        device_id: String,
        package_name: String,
    },
    Clear,
}

impl IngestEvent {
    pub fn apply(self, store: &NetworkCallStore) {
        match self {
            IngestEvent::Insert { call } => store.insert(call),
            IngestEvent::Update { call } => store.update(call),
            IngestEvent::DeleteCall { call_id } => store.delete_by_call_id(&call_id),
            IngestEvent::DeleteApp {
                device_id,
                package_name,
            } => store.delete_by_device_and_package(&device_id, &package_name),
            IngestEvent::Clear => store.delete_all(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Abort on the first line that fails to decode
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
}

/// Decode one line. Blank lines and `#` comments yield `None`.
pub fn parse_event(line: &str) -> Result<Option<IngestEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Apply every event read from `reader` to `store`
pub fn replay<R: BufRead>(
    store: &NetworkCallStore,
    reader: R,
    options: ReplayOptions,
) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;

        match parse_event(&line) {
            Ok(Some(event)) => {
                debug!("Line {}: {}", line_number, event_name(&event));
                event.apply(store);
                summary.applied += 1;
            }
            Ok(None) => {}
            Err(source) if options.strict => {
                return Err(ReplayError::Parse {
                    line: line_number,
                    source,
                });
            }
            Err(e) => {
                warn!("Skipping line {}: {}", line_number, e);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn event_name(event: &IngestEvent) -> &'static str {
    match event {
        IngestEvent::Insert { .. } => "insert",
        IngestEvent::Update { .. } => "update",
        IngestEvent::DeleteCall { .. } => "deleteCall",
        IngestEvent::DeleteApp { .. } => "deleteApp",
        IngestEvent::Clear => "clear",
    }
}
