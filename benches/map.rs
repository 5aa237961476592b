use std::collections::HashMap as StdHashMap;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Bencher, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use binmap::BinMap;

fn data(size: usize) -> Vec<(i64, i64)> {
    let mut gen = SmallRng::seed_from_u64(1);
    let mut out = Vec::with_capacity(size);
    while out.len() < size {
        out.push((gen.random::<i64>(), gen.random::<i64>()));
    }
    out
}

fn insert_binmap(b: &mut Bencher<'_>, size: usize) {
    let pairs = data(size);
    b.iter(|| {
        let mut map = BinMap::new();
        for (k, v) in &pairs {
            map.insert(*k, *v);
        }
        black_box(map)
    })
}

fn insert_std(b: &mut Bencher<'_>, size: usize) {
    let pairs = data(size);
    b.iter(|| {
        let mut map = StdHashMap::new();
        for (k, v) in &pairs {
            map.insert(*k, *v);
        }
        black_box(map)
    })
}

fn get_binmap(b: &mut Bencher<'_>, size: usize) {
    let pairs = data(size);
    let map: BinMap<i64, i64> = pairs.iter().cloned().collect();
    b.iter(|| {
        for (k, _) in &pairs {
            black_box(map.get(k));
        }
    })
}

fn get_std(b: &mut Bencher<'_>, size: usize) {
    let pairs = data(size);
    let map: StdHashMap<i64, i64> = pairs.iter().cloned().collect();
    b.iter(|| {
        for (k, _) in &pairs {
            black_box(map.get(k));
        }
    })
}

fn remove_binmap(b: &mut Bencher<'_>, size: usize) {
    let pairs = data(size);
    let map: BinMap<i64, i64> = pairs.iter().cloned().collect();
    b.iter(|| {
        let mut map = map.clone();
        for (k, _) in &pairs {
            black_box(map.remove(k));
        }
    })
}

fn iterate_binmap(b: &mut Bencher<'_>, size: usize) {
    let map: BinMap<i64, i64> = data(size).into_iter().collect();
    b.iter(|| {
        for entry in map.iter() {
            black_box(entry);
        }
    })
}

fn bench(c: &mut Criterion) {
    for size in [100, 10_000] {
        c.bench_function(&format!("insert/binmap/{}", size), |b| insert_binmap(b, size));
        c.bench_function(&format!("insert/std/{}", size), |b| insert_std(b, size));
        c.bench_function(&format!("get/binmap/{}", size), |b| get_binmap(b, size));
        c.bench_function(&format!("get/std/{}", size), |b| get_std(b, size));
        c.bench_function(&format!("remove/binmap/{}", size), |b| remove_binmap(b, size));
        c.bench_function(&format!("iterate/binmap/{}", size), |b| iterate_binmap(b, size));
    }
}

criterion_group!(benches, bench);
criterion_main!(benches);
