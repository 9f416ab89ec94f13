#![allow(dead_code)]

use adtape::{BinaryOp, OpCode, Recorder, Tape, VarIndex};

// ─── Rosenbrock ────────────────────────────────────────────────────────────

pub fn rosenbrock_f64(x: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum += t1 * t1 + 100.0 * t2 * t2;
    }
    sum
}

pub fn rosenbrock_tape(n: usize) -> Tape<f64> {
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(n);
    let one = rec.append_constant(1.0);
    let hundred = rec.append_constant(100.0);
    let mut sum: Option<VarIndex> = None;
    for i in 0..n - 1 {
        let t1 = rec.binary(BinaryOp::Sub, one.into(), x[i].into());
        let sq = rec.binary(BinaryOp::Mul, x[i].into(), x[i].into());
        let t2 = rec.binary(BinaryOp::Sub, x[i + 1].into(), sq.into());
        let a = rec.binary(BinaryOp::Mul, t1.into(), t1.into());
        let b = rec.binary(BinaryOp::Mul, t2.into(), t2.into());
        let b = rec.binary(BinaryOp::Mul, hundred.into(), b.into());
        let term = rec.binary(BinaryOp::Add, a.into(), b.into());
        sum = Some(match sum {
            Some(s) => rec.binary(BinaryOp::Add, s.into(), term.into()),
            None => term,
        });
    }
    rec.finalize(&[sum.unwrap_or(x[0])])
}

// ─── Rastrigin ─────────────────────────────────────────────────────────────
// f(x) = 10n + Σ[x_i² - 10·cos(2π·x_i)]
// Diagonal Hessian, exercises the paired cos/sin result.

pub fn rastrigin_tape(n: usize) -> Tape<f64> {
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(n);
    let ten = rec.append_constant(10.0);
    let two_pi = rec.append_constant(2.0 * std::f64::consts::PI);
    let base = rec.append_constant(10.0 * n as f64);
    let mut sum = rec.par(base);
    for &xi in &x {
        let sq = rec.binary(BinaryOp::Mul, xi.into(), xi.into());
        let arg = rec.binary(BinaryOp::Mul, two_pi.into(), xi.into());
        let c = rec.unary(OpCode::Cos, arg);
        let c = rec.binary(BinaryOp::Mul, ten.into(), c.into());
        let t = rec.binary(BinaryOp::Sub, sq.into(), c.into());
        sum = rec.binary(BinaryOp::Add, sum.into(), t.into());
    }
    rec.finalize(&[sum])
}

// ─── Chained products ──────────────────────────────────────────────────────
// y_i = x_i · sin(x_{i+1}): banded Jacobian with two colors.

pub fn banded_tape(n: usize) -> Tape<f64> {
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(n);
    let y: Vec<VarIndex> = (0..n - 1)
        .map(|i| {
            let s = rec.unary(OpCode::Sin, x[i + 1]);
            rec.binary(BinaryOp::Mul, x[i].into(), s.into())
        })
        .collect();
    rec.finalize(&y)
}

// ─── Helpers ───────────────────────────────────────────────────────────────

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.5 + 0.01 * i as f64).collect()
}
