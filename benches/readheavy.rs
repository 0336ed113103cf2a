use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::RwLock;

const NUM_KEYS: usize = 1 << 12;

fn get_snapmap(c: &mut Criterion) {
    let map = snapmap::HashMap::new();
    {
        let guard = map.guard();
        for i in 0..NUM_KEYS {
            map.insert(i, i, &guard);
        }
        // settle the map so reads are served from the snapshot
        for i in 0..NUM_KEYS {
            black_box(map.get(&i, &guard));
        }
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(NUM_KEYS as u64));
    group.bench_function(BenchmarkId::new("snapmap", NUM_KEYS), |b| {
        b.iter(|| {
            let guard = map.guard();
            for i in 0..NUM_KEYS {
                black_box(map.get(&i, &guard));
            }
        });
    });
    group.finish();
}

fn get_rwlock(c: &mut Criterion) {
    let map = RwLock::new(std::collections::HashMap::new());
    for i in 0..NUM_KEYS {
        map.write().unwrap().insert(i, i);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(NUM_KEYS as u64));
    group.bench_function(BenchmarkId::new("rwlock_std", NUM_KEYS), |b| {
        b.iter(|| {
            for i in 0..NUM_KEYS {
                black_box(map.read().unwrap().get(&i));
            }
        });
    });
    group.finish();
}

fn insert_snapmap(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(NUM_KEYS as u64));
    group.bench_function(BenchmarkId::new("snapmap", NUM_KEYS), |b| {
        b.iter(|| {
            let map = snapmap::HashMap::new();
            let guard = map.guard();
            for i in 0..NUM_KEYS {
                map.insert(i, i, &guard);
            }
            black_box(&map);
        });
    });
    group.finish();
}

fn insert_rwlock(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(NUM_KEYS as u64));
    group.bench_function(BenchmarkId::new("rwlock_std", NUM_KEYS), |b| {
        b.iter(|| {
            let map = RwLock::new(std::collections::HashMap::new());
            for i in 0..NUM_KEYS {
                map.write().unwrap().insert(i, i);
            }
            black_box(&map);
        });
    });
    group.finish();
}

fn overwrite_snapmap(c: &mut Criterion) {
    let map = snapmap::HashMap::new();
    {
        let guard = map.guard();
        for i in 0..NUM_KEYS {
            map.insert(i, i, &guard);
        }
        for i in 0..NUM_KEYS {
            black_box(map.get(&i, &guard));
        }
    }

    let mut group = c.benchmark_group("overwrite");
    group.throughput(Throughput::Elements(NUM_KEYS as u64));
    group.bench_function(BenchmarkId::new("snapmap", NUM_KEYS), |b| {
        b.iter(|| {
            let guard = map.guard();
            for i in 0..NUM_KEYS {
                map.insert(i, i + 1, &guard);
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    get_snapmap,
    get_rwlock,
    insert_snapmap,
    insert_rwlock,
    overwrite_snapmap
);
criterion_main!(benches);
