//! Body-stripped call records and the insertion-ordered index holding them.

use crate::body::{BodyRole, BodyStore};
use crate::call::{CallResponse, NetworkCall};
use std::collections::{BTreeMap, HashMap};

/// A call as held by the metadata store
///
/// The embedded request and response bodies are always `None`; the bytes
/// live in the body store under the attached keys.
#[derive(Debug, Clone)]
pub(crate) struct StoredCall {
    pub call: NetworkCall,
    pub request_body_key: Option<String>,
    pub response_body_key: Option<String>,
}

impl StoredCall {
    /// Move the bodies of `call` into `bodies` and keep only their keys.
    ///
    /// A role that has no body this time drops whatever an earlier version of
    /// the call stored for it.
    pub fn strip(mut call: NetworkCall, bodies: &BodyStore) -> Self {
        let call_id = call.call_id.clone();

        let request_body = call.request.body.take();
        let request_body_key = bodies.store(&call_id, BodyRole::Request, request_body.as_deref());

        let response_body = match &mut call.response {
            Some(CallResponse::Success { body, .. }) => body.take(),
            Some(CallResponse::Failure { .. }) | None => None,
        };
        let response_body_key =
            bodies.store(&call_id, BodyRole::Response, response_body.as_deref());

        for (role, key) in [
            (BodyRole::Request, &request_body_key),
            (BodyRole::Response, &response_body_key),
        ] {
            if key.is_none() {
                bodies.remove(&call_id, role);
            }
        }

        Self {
            call,
            request_body_key,
            response_body_key,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call.call_id
    }

    /// Rebuild the full call with its bodies.
    ///
    /// Bodies the cache has evicted in the meantime come back as `None`.
    pub fn hydrate(&self, bodies: &BodyStore) -> NetworkCall {
        let mut call = self.call.clone();
        call.request.body = bodies.retrieve(self.request_body_key.as_deref());
        if let Some(CallResponse::Success { body, .. }) = &mut call.response {
            *body = bodies.retrieve(self.response_body_key.as_deref());
        }
        call
    }
}

struct IndexedCall {
    seq: u64,
    stored: StoredCall,
}

/// Call records in insertion order
///
/// Each record carries the sequence number of its insertion; `order` maps
/// sequence numbers back to call ids, so the oldest record is always the
/// first entry of `order`.
#[derive(Default)]
pub(crate) struct CallIndex {
    entries: HashMap<String, IndexedCall>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl CallIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record as the newest entry, replacing any record with the same id.
    pub fn push(&mut self, stored: StoredCall) -> Option<StoredCall> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let call_id = stored.call_id().to_string();
        self.order.insert(seq, call_id.clone());
        let previous = self.entries.insert(call_id, IndexedCall { seq, stored })?;
        self.order.remove(&previous.seq);
        Some(previous.stored)
    }

    /// Swap in a new version of an existing record, keeping its position.
    pub fn replace(&mut self, stored: StoredCall) -> bool {
        match self.entries.get_mut(stored.call_id()) {
            Some(entry) => {
                entry.stored = stored;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, call_id: &str) -> Option<StoredCall> {
        let entry = self.entries.remove(call_id)?;
        self.order.remove(&entry.seq);
        Some(entry.stored)
    }

    pub fn pop_oldest(&mut self) -> Option<StoredCall> {
        let (_, call_id) = self.order.pop_first()?;
        self.entries.remove(&call_id).map(|entry| entry.stored)
    }

    /// Remove every record matching `predicate`, oldest first
    pub fn remove_where(&mut self, predicate: impl Fn(&StoredCall) -> bool) -> Vec<StoredCall> {
        let call_ids: Vec<String> = self
            .iter()
            .filter(|stored| predicate(stored))
            .map(|stored| stored.call_id().to_string())
            .collect();

        call_ids
            .iter()
            .filter_map(|call_id| self.remove(call_id))
            .collect()
    }

    pub fn get(&self, call_id: &str) -> Option<&StoredCall> {
        self.entries.get(call_id).map(|entry| &entry.stored)
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.entries.contains_key(call_id)
    }

    /// Records from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &StoredCall> + '_ {
        self.order
            .values()
            .filter_map(|call_id| self.entries.get(call_id))
            .map(|entry| &entry.stored)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every record, oldest first
    pub fn drain(&mut self) -> Vec<StoredCall> {
        let order = std::mem::take(&mut self.order);
        let mut entries = std::mem::take(&mut self.entries);
        order
            .into_values()
            .filter_map(|call_id| entries.remove(&call_id))
            .map(|entry| entry.stored)
            .collect()
    }
}
