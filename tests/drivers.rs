//! Tests for the derivative drivers: dense gradient, Jacobian and Hessian,
//! and the colored sparse variants checked against them.

mod common;

use adtape::{
    color_columns, color_hessian, color_rows, AdError, BinaryOp, Evaluator, HessianPattern, JacobianPattern,
    OpCode, Recorder, SparsityEncoding, Tape,
};
use approx::assert_relative_eq;
use common::*;

/// y_i = x_i sin(x_{i+1}), i = 0..n-1.
fn banded(n: usize) -> Tape<f64> {
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(n);
    let y: Vec<_> = (0..n - 1)
        .map(|i| {
            let s = rec.unary(OpCode::Sin, x[i + 1]);
            rec.binary(BinaryOp::Mul, x[i].into(), s.into())
        })
        .collect();
    rec.finalize(&y)
}

fn banded_jacobian(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut jac = vec![0.0; (n - 1) * n];
    for i in 0..n - 1 {
        jac[i * n + i] = x[i + 1].sin();
        jac[i * n + i + 1] = x[i] * x[i + 1].cos();
    }
    jac
}

// ── Dense ──

#[test]
fn gradient_matches_finite_differences() {
    let n = 5;
    let x = make_input(n);
    let mut ev = Evaluator::from_tape(rosenbrock_tape(n));
    let g = ev.gradient(&x).unwrap();
    let fd = finite_diff_gradient(rosenbrock_f64, &x, 1e-6);
    for (a, b) in g.iter().zip(&fd) {
        assert_relative_eq!(a, b, max_relative = 1e-5);
    }
}

#[test]
fn jacobian_in_both_shapes() {
    // more outputs than inputs runs forward, fewer runs reverse
    let x = [0.3, -1.2, 2.0, 0.7];
    let mut ev = Evaluator::from_tape(banded(4));
    let j = ev.jacobian(&x).unwrap();
    for (a, b) in j.iter().zip(&banded_jacobian(&x)) {
        assert_relative_eq!(a, b, epsilon = 1e-14);
    }

    let mut rec = Recorder::<f64>::new();
    let u = rec.independent(2);
    let p = rec.binary(BinaryOp::Mul, u[0].into(), u[1].into());
    let d = rec.binary(BinaryOp::Div, u[0].into(), u[1].into());
    let e = rec.unary(OpCode::Exp, u[1]);
    let mut ev = Evaluator::from_tape(rec.finalize(&[p, d, e]));
    let j = ev.jacobian(&[3.0, 2.0]).unwrap();
    let expected = [2.0, 3.0, 0.5, -0.75, 0.0, 2.0_f64.exp()];
    for (a, b) in j.iter().zip(&expected) {
        assert_relative_eq!(a, b, epsilon = 1e-14);
    }
}

#[test]
fn weighted_hessian_of_several_outputs() {
    // y0 = x0 x1 x2, y1 = x0²; w = (2, 3)
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(3);
    let a = rec.binary(BinaryOp::Mul, x[0].into(), x[1].into());
    let y0 = rec.binary(BinaryOp::Mul, a.into(), x[2].into());
    let y1 = rec.binary(BinaryOp::Mul, x[0].into(), x[0].into());
    let mut ev = Evaluator::from_tape(rec.finalize(&[y0, y1]));
    let v = [1.5, -2.0, 0.5];
    let h = ev.hessian(&v, &[2.0, 3.0]).unwrap();
    let expected = [
        6.0,
        2.0 * v[2],
        2.0 * v[1],
        2.0 * v[2],
        0.0,
        2.0 * v[0],
        2.0 * v[1],
        2.0 * v[0],
        0.0,
    ];
    for (a, b) in h.iter().zip(&expected) {
        assert_relative_eq!(a, b, epsilon = 1e-14);
    }
}

#[test]
fn plug_in_hessian() {
    let mut ev = Evaluator::from_tape(add_mul_tape());
    let h = ev.hessian(&[1.0, 2.0, 3.0, 4.0], &[1.0, 1.0]).unwrap();
    for j in 0..4 {
        for l in 0..4 {
            let expected = if (j, l) == (2, 3) || (j, l) == (3, 2) { 1.0 } else { 0.0 };
            assert_relative_eq!(h[j * 4 + l], expected);
        }
    }
}

#[test]
fn dense_driver_errors() {
    let mut ev = Evaluator::from_tape(banded(3));
    assert_eq!(ev.gradient(&[0.0; 3]), Err(AdError::NotScalar(2)));
    assert!(matches!(ev.hessian(&[0.0; 3], &[1.0]), Err(AdError::Length { .. })));
    assert!(matches!(ev.jacobian(&[0.0; 2]), Err(AdError::Length { .. })));
}

// ── Sparse ──

#[test]
fn banded_jacobian_needs_two_colors() {
    let tape = banded(6);
    let pattern = tape.jacobian_pattern(SparsityEncoding::Pack).unwrap();
    assert_eq!(pattern.nnz(), 10);
    assert_eq!(color_columns(&pattern).num_colors, 2);
    assert_eq!(color_rows(&pattern).num_colors, 2);
}

#[test]
fn sparse_jacobian_matches_dense() {
    let n = 6;
    let tape = banded(n);
    let pattern = tape.jacobian_pattern(SparsityEncoding::List).unwrap();
    let x: Vec<f64> = (0..n).map(|i| 0.2 * i as f64 - 0.4).collect();
    let mut ev = Evaluator::from_tape(tape);
    let dense = ev.jacobian(&x).unwrap();

    let fwd = ev.sparse_jacobian_forward(&x, &pattern).unwrap();
    let rev = ev.sparse_jacobian_reverse(&x, &pattern).unwrap();
    assert_eq!(fwd.len(), pattern.nnz());
    for (k, (i, j)) in pattern.iter().enumerate() {
        assert_relative_eq!(fwd[k], dense[i * n + j], epsilon = 1e-14);
        assert_relative_eq!(rev[k], dense[i * n + j], epsilon = 1e-14);
    }
}

#[test]
fn sparse_jacobian_on_a_sub_pattern() {
    // asking for fewer entries than the structure has is allowed
    let x = [0.5, 1.0, 1.5];
    let pattern = JacobianPattern::new(2, 3, [(1, 2), (0, 0)]);
    let mut ev = Evaluator::from_tape(banded(3));
    let rev = ev.sparse_jacobian_reverse(&x, &pattern).unwrap();
    let dense = banded_jacobian(&x);
    let entries: Vec<_> = pattern.iter().collect();
    for (k, (i, j)) in entries.into_iter().enumerate() {
        assert_relative_eq!(rev[k], dense[i * 3 + j], epsilon = 1e-14);
    }
}

#[test]
fn subgraph_jacobian_matches_dense() {
    let n = 7;
    let tape = banded(n);
    let pattern = tape.jacobian_pattern(SparsityEncoding::Pack).unwrap();
    let x: Vec<f64> = (0..n).map(|i| 0.3 * i as f64 - 1.0).collect();
    let mut ev = Evaluator::from_tape(tape);
    let dense = ev.jacobian(&x).unwrap();
    let values = ev.subgraph_jacobian(&x, &pattern).unwrap();
    assert_eq!(values.len(), pattern.nnz());
    for (k, (i, j)) in pattern.iter().enumerate() {
        assert_relative_eq!(values[k], dense[i * n + j], epsilon = 1e-14);
    }

    // rows of a plug-in call share the bracket but not each other's partials
    let pattern = JacobianPattern::new(2, 4, [(0, 0), (0, 1), (1, 2), (1, 3), (0, 3)]);
    let mut ev = Evaluator::from_tape(add_mul_tape());
    let values = ev.subgraph_jacobian(&[2.0, 3.0, 4.0, 5.0], &pattern).unwrap();
    assert_eq!(values, vec![1.0, 1.0, 0.0, 5.0, 4.0]);
}

#[test]
fn subgraph_rows_ignore_unrelated_outputs() {
    // y0 = x0², y1 = exp(x1); row 1 never visits the square
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(2);
    let sq = rec.binary(BinaryOp::Mul, x[0].into(), x[0].into());
    let e = rec.unary(OpCode::Exp, x[1]);
    let tape = rec.finalize(&[sq, e]);
    assert_eq!(tape.subgraph(1).unwrap().len(), 1);

    let mut ev = Evaluator::from_tape(tape);
    ev.forward_zero(&[3.0, 0.5]).unwrap();
    assert_eq!(ev.subgraph_reverse(1, 0, &[true, true]).unwrap(), vec![6.0, 0.0]);
    let row = ev.subgraph_reverse(1, 1, &[true, true]).unwrap();
    assert_relative_eq!(row[1], 0.5_f64.exp());
    assert_eq!(row[0], 0.0);
    assert!(matches!(
        ev.subgraph_reverse(1, 2, &[true, true]),
        Err(AdError::DependentIndex { index: 2, count: 2 })
    ));
}

#[test]
fn sparse_hessian_matches_dense() {
    let n = 8;
    let tape = rosenbrock_tape(n);
    let pattern = tape.hessian_pattern(&[true], SparsityEncoding::Auto).unwrap();
    assert_eq!(color_hessian(&pattern).num_colors, 3);

    let x = make_input(n);
    let mut ev = Evaluator::from_tape(tape);
    let dense = ev.hessian(&x, &[1.0]).unwrap();
    let sparse = ev.sparse_hessian(&x, &[1.0], &pattern).unwrap();
    assert_eq!(sparse.len(), pattern.nnz());
    for (k, (i, j)) in pattern.iter().enumerate() {
        assert_relative_eq!(sparse[k], dense[i * n + j], max_relative = 1e-12);
    }
}

#[test]
fn sparse_hessian_of_a_cross_term() {
    // H of x0 x1 has no diagonal, so both columns share one color
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(2);
    let y = rec.binary(BinaryOp::Mul, x[0].into(), x[1].into());
    let tape = rec.finalize(&[y]);
    let pattern = tape.hessian_pattern(&[true], SparsityEncoding::Pack).unwrap();
    assert_eq!(pattern, HessianPattern::new(2, [(0, 1)]));
    assert_eq!(color_hessian(&pattern).num_colors, 1);
    let mut ev = Evaluator::from_tape(tape);
    assert_eq!(ev.sparse_hessian(&[4.0, 5.0], &[3.0], &pattern).unwrap(), vec![3.0]);
}

#[test]
fn sparse_patterns_must_fit_the_tape() {
    let mut ev = Evaluator::from_tape(banded(4));
    let wrong = JacobianPattern::new(4, 4, [(0, 0)]);
    assert!(matches!(
        ev.sparse_jacobian_forward(&[0.0; 4], &wrong),
        Err(AdError::PatternShape { .. })
    ));
    let mut ev = Evaluator::from_tape(rosenbrock_tape(3));
    let wrong = HessianPattern::new(2, [(0, 0)]);
    assert!(matches!(
        ev.sparse_hessian(&[0.0; 3], &[1.0], &wrong),
        Err(AdError::PatternShape { .. })
    ));
}
