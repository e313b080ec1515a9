//! Netscope replay tool
//!
//! Feeds a file of newline-delimited JSON call events through the
//! network-call store and reports what the store retained.
//!
//! Usage:
//!   netscope-replay --input calls.ndjson [--config store.yaml] [--dump] [--metrics]

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;
use netscope_store::replay::{replay, ReplayOptions};
use netscope_store::{
    metrics, CallResponse, NetworkCall, NetworkCallStore, StaticSettings, StoreSettings,
};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Replay captured network calls through the bounded store
#[derive(Parser, Debug)]
#[command(name = "netscope-replay")]
#[command(author, version, about)]
struct Args {
    /// Event file to replay, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Store settings (YAML)
    #[arg(short, long, env = "NETSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Abort on the first malformed event
    #[arg(long)]
    strict: bool,

    /// Print retained calls as JSON
    #[arg(long)]
    dump: bool,

    /// Print Prometheus metrics after the replay
    #[arg(long)]
    metrics: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => StoreSettings::from_file(path)?,
        None => StoreSettings::default(),
    };
    info!(
        "Store limits: {} calls, {} body bytes, {} bytes per body, compression {}",
        settings.max_stored_calls,
        settings.max_body_cache_size_bytes,
        settings.max_body_size_bytes,
        if settings.compression_enabled { "on" } else { "off" }
    );

    let store = NetworkCallStore::new(Arc::new(StaticSettings(settings)));
    let options = ReplayOptions {
        strict: args.strict,
    };

    let summary = if args.input.as_os_str() == "-" {
        replay(&store, io::stdin().lock(), options)?
    } else {
        let file = File::open(&args.input)
            .with_context(|| format!("Failed to open {:?}", args.input))?;
        replay(&store, BufReader::new(file), options)?
    };

    info!(
        "Applied {} events, skipped {} malformed lines",
        summary.applied, summary.skipped
    );

    let calls = store.all_calls();
    for call in &calls {
        println!("{}", describe(call));
    }

    let stats = store.body_stats();
    println!(
        "{} calls retained, {} bodies ({} bytes, {:.1}% of {} byte budget)",
        calls.len(),
        stats.entry_count,
        stats.total_size_bytes,
        stats.usage_percent,
        stats.max_size_bytes
    );

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&calls)?);
    }

    if args.metrics {
        print!("{}", metrics::collect_metrics());
    }

    Ok(())
}

/// One summary line per call
fn describe(call: &NetworkCall) -> String {
    let started = Utc
        .timestamp_millis_opt(call.start_time)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| call.start_time.to_string());

    let outcome = match &call.response {
        None => "pending".to_string(),
        Some(CallResponse::Success {
            status_code,
            duration_ms,
            ..
        }) => {
            let status = status_code.map_or_else(|| "-".to_string(), |s| s.to_string());
            format!("{status} in {duration_ms:.1}ms")
        }
        Some(CallResponse::Failure { duration_ms, issue }) => {
            format!("failed after {duration_ms:.1}ms: {issue}")
        }
    };

    format!(
        "{started} {} {} {} [{}] {outcome}",
        call.device_id, call.request.method, call.request.url, call.app_instance
    )
}
