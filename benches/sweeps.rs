use std::sync::Arc;

use adtape::{Evaluator, SparsityEncoding};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

#[path = "common/mod.rs"]
mod common;
use common::*;

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");
    for n in [10, 100, 1000] {
        let x = make_input(n);
        let tape = Arc::new(rosenbrock_tape(n));

        group.bench_with_input(BenchmarkId::new("f64_eval", n), &x, |b, x| {
            b.iter(|| black_box(rosenbrock_f64(black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("order_0", n), &x, |b, x| {
            let mut ev = Evaluator::new(tape.clone());
            b.iter(|| black_box(ev.forward_zero(black_box(x)).unwrap()))
        });

        let dir = vec![1.0; n];
        group.bench_with_input(BenchmarkId::new("order_1", n), &x, |b, x| {
            let mut ev = Evaluator::new(tape.clone());
            ev.forward_zero(x).unwrap();
            b.iter(|| black_box(ev.forward(1, black_box(&dir)).unwrap()))
        });
    }
    group.finish();
}

fn bench_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse");
    for n in [10, 100, 1000] {
        let x = make_input(n);
        let tape = Arc::new(rosenbrock_tape(n));

        group.bench_with_input(BenchmarkId::new("gradient", n), &x, |b, x| {
            let mut ev = Evaluator::new(tape.clone());
            b.iter(|| black_box(ev.gradient(black_box(x)).unwrap()))
        });

        let rastrigin = Arc::new(rastrigin_tape(n));
        group.bench_with_input(BenchmarkId::new("rastrigin_gradient", n), &x, |b, x| {
            let mut ev = Evaluator::new(rastrigin.clone());
            b.iter(|| black_box(ev.gradient(black_box(x)).unwrap()))
        });
    }
    group.finish();
}

fn bench_hessian(c: &mut Criterion) {
    let mut group = c.benchmark_group("hessian");
    for n in [10, 50] {
        let x = make_input(n);
        let tape = rosenbrock_tape(n);
        let pattern = tape.hessian_pattern(&[true], SparsityEncoding::Auto).unwrap();
        let tape = Arc::new(tape);

        group.bench_with_input(BenchmarkId::new("dense", n), &x, |b, x| {
            let mut ev = Evaluator::new(tape.clone());
            b.iter(|| black_box(ev.hessian(black_box(x), &[1.0]).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("sparse", n), &x, |b, x| {
            let mut ev = Evaluator::new(tape.clone());
            b.iter(|| black_box(ev.sparse_hessian(black_box(x), &[1.0], &pattern).unwrap()))
        });
    }
    group.finish();
}

fn bench_sparse_jacobian(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_jacobian");
    for n in [10, 100, 500] {
        let x = make_input(n);
        let tape = banded_tape(n);

        group.bench_with_input(BenchmarkId::new("pattern_pack", n), &tape, |b, tape| {
            b.iter(|| black_box(tape.jacobian_pattern(SparsityEncoding::Pack).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("pattern_list", n), &tape, |b, tape| {
            b.iter(|| black_box(tape.jacobian_pattern(SparsityEncoding::List).unwrap()))
        });

        let pattern = tape.jacobian_pattern(SparsityEncoding::Auto).unwrap();
        let tape = Arc::new(tape);
        group.bench_with_input(BenchmarkId::new("dense", n), &x, |b, x| {
            let mut ev = Evaluator::new(tape.clone());
            b.iter(|| black_box(ev.jacobian(black_box(x)).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("forward_colored", n), &x, |b, x| {
            let mut ev = Evaluator::new(tape.clone());
            b.iter(|| black_box(ev.sparse_jacobian_forward(black_box(x), &pattern).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_forward,
    bench_reverse,
    bench_hessian,
    bench_sparse_jacobian
);
criterion_main!(benches);
