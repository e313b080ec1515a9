use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use netscope_store::call::Headers;
use netscope_store::{
    BodyRole, BodyStore, CallRequest, CallResponse, NetworkCall, NetworkCallStore, RequestType,
    StaticSettings, StoreSettings,
};
use std::sync::Arc;

fn create_call(id: usize, body: &str) -> NetworkCall {
    NetworkCall {
        call_id: format!("call-{id}"),
        device_id: "emulator-5554".to_string(),
        package_name: "com.example.app".to_string(),
        app_instance: "run-1".to_string(),
        start_time: 1_700_000_000_000 + id as i64,
        name: format!("GET /api/v1/items/{id}"),
        request: CallRequest {
            url: format!("https://api.example.com/api/v1/items/{id}"),
            method: "GET".to_string(),
            headers: Headers::new(),
            body: None,
            size: None,
            request_type: RequestType::Http,
        },
        response: Some(CallResponse::Success {
            duration_ms: 35.0,
            body: Some(body.to_string()),
            headers: Headers::new(),
            size: Some(body.len() as u64),
            content_type: Some("application/json".to_string()),
            status_code: Some(200),
        }),
    }
}

fn json_body(size: usize) -> String {
    let item = "{\"id\":1234,\"name\":\"widget\",\"tags\":[\"a\",\"b\"]},";
    item.repeat(size / item.len() + 1)[..size].to_string()
}

fn bench_body_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("body_store");

    for size in [256usize, 4 * 1024, 64 * 1024] {
        let body = json_body(size);
        group.throughput(Throughput::Bytes(size as u64));

        for compression_enabled in [false, true] {
            let store = BodyStore::new(Arc::new(StaticSettings(StoreSettings {
                compression_enabled,
                ..StoreSettings::default()
            })));
            let label = if compression_enabled { "gzip" } else { "raw" };

            group.bench_with_input(
                BenchmarkId::new(format!("store_retrieve_{label}"), size),
                &body,
                |b, body| {
                    b.iter(|| {
                        let key = store.store("bench", BodyRole::Response, Some(body));
                        black_box(store.retrieve(key.as_deref()))
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_insert_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("network_store");
    let body = json_body(2048);

    for max_stored_calls in [100usize, 1000] {
        let store = NetworkCallStore::new(Arc::new(StaticSettings(StoreSettings {
            max_stored_calls,
            ..StoreSettings::default()
        })));
        let mut next_id = 0usize;

        group.bench_function(BenchmarkId::new("insert", max_stored_calls), |b| {
            b.iter(|| {
                store.insert(create_call(next_id, &body));
                next_id += 1;
            })
        });
    }

    let store = NetworkCallStore::new(Arc::new(StaticSettings(StoreSettings::default())));
    for id in 0..1000 {
        store.insert(create_call(id, &body));
    }
    group.bench_function("get_by_device_and_package_1000", |b| {
        b.iter(|| black_box(store.get_by_device_and_package("emulator-5554", "com.example.app")))
    });

    group.finish();
}

criterion_group!(benches, bench_body_store, bench_insert_with_eviction);
criterion_main!(benches);
