use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreExt, InMemoryEventStore, Snapshot,
    StreamAppend, Version,
};

fn make_event(aggregate_id: AggregateId, aggregate_type: &str, version: i64) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type(aggregate_type)
        .event_type("StockAdjusted")
        .version(Version::new(version))
        .payload_raw(serde_json::json!({
            "type": "StockAdjusted",
            "data": { "delta": -1, "reason": "order_placed" }
        }))
        .build()
        .unwrap()
}

fn bench_append_single_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_single_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let id = AggregateId::new();
                store
                    .append(vec![make_event(id, "Product", 1)], AppendOptions::expect_new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_checkout_shaped_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    // One order stream, one cart stream and five product streams.
    c.bench_function("event_store/commit_7_streams", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let mut batch = vec![
                    StreamAppend::new(
                        vec![make_event(AggregateId::new(), "Order", 1)],
                        AppendOptions::expect_new(),
                    ),
                    StreamAppend::new(
                        vec![make_event(AggregateId::new(), "Cart", 1)],
                        AppendOptions::new(),
                    ),
                ];
                for _ in 0..5 {
                    batch.push(StreamAppend::new(
                        vec![make_event(AggregateId::new(), "Product", 1)],
                        AppendOptions::expect_new(),
                    ));
                }
                store.commit(batch).await.unwrap();
            });
        });
    });
}

fn bench_get_events_for_aggregate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let id = AggregateId::new();

    rt.block_on(async {
        let events: Vec<EventEnvelope> = (1..=100).map(|v| make_event(id, "Product", v)).collect();
        store.append(events, AppendOptions::new()).await.unwrap();
    });

    c.bench_function("event_store/get_events_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get_events_for_aggregate(id).await.unwrap();
            });
        });
    });
}

fn bench_load_with_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let id = AggregateId::new();

    rt.block_on(async {
        let events: Vec<EventEnvelope> = (1..=100).map(|v| make_event(id, "Product", v)).collect();
        store.append(events, AppendOptions::new()).await.unwrap();
        store
            .save_snapshot(Snapshot::new(
                id,
                "Product",
                Version::new(90),
                serde_json::json!({"stock": 10}),
            ))
            .await
            .unwrap();
    });

    c.bench_function("event_store/load_aggregate_snapshot_90_of_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.load_aggregate(id).await.unwrap();
            });
        });
    });
}

fn bench_stream_all_events(c: &mut Criterion) {
    use futures_util::StreamExt;

    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();

    rt.block_on(async {
        for _ in 0..10 {
            let id = AggregateId::new();
            let events: Vec<EventEnvelope> =
                (1..=100).map(|v| make_event(id, "Product", v)).collect();
            store.append(events, AppendOptions::new()).await.unwrap();
        }
    });

    c.bench_function("event_store/stream_1000_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut stream = store.stream_all_events().await.unwrap();
                let mut count = 0;
                while let Some(result) = stream.next().await {
                    result.unwrap();
                    count += 1;
                }
                assert_eq!(count, 1000);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_single_event,
    bench_checkout_shaped_commit,
    bench_get_events_for_aggregate,
    bench_load_with_snapshot,
    bench_stream_all_events,
);
criterion_main!(benches);
