use criterion::{black_box, criterion_group, criterion_main, Criterion};
use linfuse::{dot, DynamicVector};

fn bench_assignment_paths(c: &mut Criterion) {
    let n = 4096;
    let a = DynamicVector::from_fn(n, |i| i as f64 * 0.5);
    let b = DynamicVector::from_fn(n, |i| (n - i) as f64);
    let mut dst = DynamicVector::<f64>::zeros(n);

    c.bench_function("assign_add_4096", |bch| {
        bch.iter(|| dst.assign(black_box(&(&a + &b))).unwrap())
    });

    // Nested chain falls back to the fused scalar loop.
    c.bench_function("assign_chain_4096", |bch| {
        bch.iter(|| dst.assign(black_box(&((&a + &b) * 0.5 - &a))).unwrap())
    });

    c.bench_function("add_assign_4096", |bch| {
        bch.iter(|| dst.add_assign_expr(black_box(&&a)).unwrap())
    });

    c.bench_function("dot_4096", |bch| {
        bch.iter(|| dot(black_box(&&a), black_box(&&b)).unwrap())
    });

    // Integer elements exercise the scalar engine on identical shapes.
    let ai = DynamicVector::from_fn(n, |i| i as i64);
    let bi = DynamicVector::from_fn(n, |i| (n - i) as i64);
    let mut dsti = DynamicVector::<i64>::zeros(n);
    c.bench_function("assign_add_scalar_4096", |bch| {
        bch.iter(|| dsti.assign(black_box(&(&ai + &bi))).unwrap())
    });
}

fn bench_streaming(c: &mut Criterion) {
    // Past the cache threshold the copy uses non-temporal stores.
    let n = 600_000;
    let a = DynamicVector::from_fn(n, |i| i as f64);
    let mut dst = DynamicVector::<f64>::zeros(n);
    c.bench_function("copy_600k", |bch| {
        bch.iter(|| dst.assign(black_box(&&a)).unwrap())
    });
}

criterion_group!(benches, bench_assignment_paths, bench_streaming);
criterion_main!(benches);
