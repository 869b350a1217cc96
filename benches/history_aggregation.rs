use bigdecimal::BigDecimal;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use price_tracker::{
    database::{MemoryPriceStore, PriceStore},
    models::{HistoryQuery, Interval, PricePoint},
};

fn seeded_store(rt: &tokio::runtime::Runtime, points_per_symbol: i64) -> MemoryPriceStore {
    let store = MemoryPriceStore::new();
    let points: Vec<PricePoint> = ["btc", "eth", "sol"]
        .iter()
        .flat_map(|symbol| {
            (0..points_per_symbol).map(move |i| {
                PricePoint::new(symbol, BigDecimal::from(10_000 + (i % 997)), i * 60)
            })
        })
        .collect();

    rt.block_on(store.batch_insert(&points))
        .expect("seeding the store should succeed");
    store
}

fn benchmark_history_aggregation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("history_aggregation");

    for points in [1_440i64, 10_080, 43_200] {
        let store = seeded_store(&rt, points);
        let query = HistoryQuery {
            symbol: "btc".to_string(),
            interval: Interval::ONE_HOUR,
            from: 0,
            to: points * 60,
        };

        group.bench_with_input(BenchmarkId::from_parameter(points), &query, |b, query| {
            b.to_async(&rt).iter(|| async {
                black_box(store.get_history(black_box(query)).await.unwrap())
            })
        });
    }

    group.finish();
}

fn benchmark_latest_lookup(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let store = seeded_store(&rt, 10_080);

    c.bench_function("latest_lookup", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(store.get_latest(black_box("eth")).await.unwrap())
        })
    });
}

criterion_group!(benches, benchmark_history_aggregation, benchmark_latest_lookup);
criterion_main!(benches);
