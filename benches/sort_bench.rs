use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use rayforce::sort::{sort_indices, Direction};
use rayforce::types::symbol::SymbolTable;
use rayforce::types::table::vector_i64;

fn random_i64(n: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|_| rng.random_range(-1_000_000..1_000_000)).collect()
}

fn bench_sort_i64(c: &mut Criterion) {
    let symbols = SymbolTable::new();
    let mut group = c.benchmark_group("sort_i64");
    for &n in &[1_000usize, 100_000, 1_000_000] {
        let values = vector_i64(random_i64(n));
        group.bench_function(format!("n={n}"), |b| {
            b.iter(|| {
                let idx = sort_indices(black_box(&values), Direction::Ascending, &symbols, None).unwrap();
                black_box(idx);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sort_i64);
criterion_main!(benches);
