//! Prometheus metrics for netscope-store.
//!
//! Tracks ingestion, evictions on both budgets and body cache occupancy.
//!
//! Metrics are registered once per process. Counters add up across store
//! instances, but the occupancy gauges are overwritten by every write, so
//! they describe a single store per process. Embedders running several
//! stores should read `NetworkCallStore::len` and `BodyStore::stats` instead.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, Encoder,
    IntCounter, IntGauge, TextEncoder,
};

lazy_static! {
    /// Calls ingested by operation
    pub static ref CALLS_INGESTED_TOTAL: CounterVec = register_counter_vec!(
        "netscope_calls_ingested_total",
        "Total number of call records ingested",
        &["operation"]  // operation: insert|update|update_missing
    )
    .unwrap();

    /// Calls removed without an explicit delete
    pub static ref CALLS_EVICTED_TOTAL: CounterVec = register_counter_vec!(
        "netscope_calls_evicted_total",
        "Total number of call records removed by capacity or session limits",
        &["reason"]  // reason: capacity|session
    )
    .unwrap();

    /// Session changes that purged a previous app instance
    pub static ref SESSION_PURGES_TOTAL: IntCounter = register_int_counter!(
        "netscope_session_purges_total",
        "Total number of app restarts that purged the previous session"
    )
    .unwrap();

    /// Bodies dropped by the LRU byte budget
    pub static ref BODIES_EVICTED_TOTAL: IntCounter = register_int_counter!(
        "netscope_bodies_evicted_total",
        "Total number of bodies evicted from the body cache"
    )
    .unwrap();

    /// Bodies cut at the size limit
    pub static ref BODIES_TRUNCATED_TOTAL: IntCounter = register_int_counter!(
        "netscope_bodies_truncated_total",
        "Total number of bodies truncated at the maximum body size"
    )
    .unwrap();

    /// Bytes currently held by the body cache last written to
    pub static ref BODY_CACHE_BYTES: IntGauge = register_int_gauge!(
        "netscope_body_cache_bytes",
        "Bytes held by the most recently updated body cache"
    )
    .unwrap();

    /// Entries currently held by the body cache last written to
    pub static ref BODY_CACHE_ENTRIES: IntGauge = register_int_gauge!(
        "netscope_body_cache_entries",
        "Entries held by the most recently updated body cache"
    )
    .unwrap();

    /// Call records held by the store last written to
    pub static ref STORED_CALLS: IntGauge = register_int_gauge!(
        "netscope_stored_calls",
        "Call records held by the most recently updated store"
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record an ingested call
pub fn record_ingest(operation: &str) {
    CALLS_INGESTED_TOTAL.with_label_values(&[operation]).inc();
}

/// Helper to record calls evicted for `reason`
pub fn record_call_evictions(reason: &str, count: usize) {
    if count > 0 {
        CALLS_EVICTED_TOTAL
            .with_label_values(&[reason])
            .inc_by(count as f64);
    }
}

pub fn record_session_purge() {
    SESSION_PURGES_TOTAL.inc();
}

pub fn record_body_evictions(count: usize) {
    BODIES_EVICTED_TOTAL.inc_by(count as u64);
}

pub fn record_body_truncated() {
    BODIES_TRUNCATED_TOTAL.inc();
}

/// Helper to set body cache occupancy gauges; the last writer wins
pub fn set_body_cache_usage(entries: usize, bytes: usize) {
    BODY_CACHE_ENTRIES.set(entries as i64);
    BODY_CACHE_BYTES.set(bytes as i64);
}

/// Last writer wins, like `set_body_cache_usage`
pub fn set_stored_calls(count: usize) {
    STORED_CALLS.set(count as i64);
}
