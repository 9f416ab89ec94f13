#![allow(dead_code)]

use adtape::{AtomicFunction, BinaryOp, CallInfo, Operand, Recorder, Tape, VarIndex};

// ─── Plug-in: y0 = x0 + x1, y1 = x2 * x3 ──────────────────────────────────

pub struct AddMul;

impl AtomicFunction<f64> for AddMul {
    fn name(&self) -> &str {
        "add_mul"
    }

    fn forward(&self, call: &CallInfo<'_>, p: usize, q: usize, tx: &[f64], ty: &mut [f64]) -> Result<(), String> {
        if call.n != 4 || call.m != 2 {
            return Err(format!("expected 4 -> 2, got {} -> {}", call.n, call.m));
        }
        let w = q + 1;
        for k in p..=q {
            ty[k] = tx[k] + tx[w + k];
            ty[w + k] = (0..=k).map(|i| tx[2 * w + i] * tx[3 * w + k - i]).sum();
        }
        Ok(())
    }

    fn reverse(
        &self,
        _call: &CallInfo<'_>,
        q: usize,
        tx: &[f64],
        _ty: &[f64],
        py: &[f64],
        px: &mut [f64],
    ) -> Result<(), String> {
        let w = q + 1;
        for k in 0..w {
            px[k] += py[k];
            px[w + k] += py[k];
            for i in 0..=k {
                px[2 * w + i] += py[w + k] * tx[3 * w + k - i];
                px[3 * w + k - i] += py[w + k] * tx[2 * w + i];
            }
        }
        Ok(())
    }

    fn num_results(&self, _call_id: u32, _n: usize) -> Option<usize> {
        Some(2)
    }

    fn for_jac_sparsity(&self, _call: &CallInfo<'_>) -> Vec<(usize, usize)> {
        vec![(0, 0), (0, 1), (1, 2), (1, 3)]
    }

    fn for_hes_sparsity(&self, _call: &CallInfo<'_>, select_y: &[bool]) -> Vec<(usize, usize)> {
        if select_y[1] {
            vec![(2, 3), (3, 2)]
        } else {
            Vec::new()
        }
    }
}

/// Four independents through one `AddMul` call; dependents are its results.
pub fn add_mul_tape() -> Tape<f64> {
    let mut rec = Recorder::<f64>::new();
    let id = rec.register_atomic(std::sync::Arc::new(AddMul));
    let x = rec.independent(4);
    let args: Vec<Operand> = x.iter().map(|&v| v.into()).collect();
    let y = rec.call_atomic(id, 0, &args, 2).unwrap();
    rec.finalize(&y)
}

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
    let mut terms: Vec<VarIndex> = Vec::new();
    for i in 0..n - 1 {
        let t1 = rec.binary(BinaryOp::Sub, one.into(), x[i].into());
        let sq = rec.binary(BinaryOp::Mul, x[i].into(), x[i].into());
        let t2 = rec.binary(BinaryOp::Sub, x[i + 1].into(), sq.into());
        let a = rec.binary(BinaryOp::Mul, t1.into(), t1.into());
        let b = rec.binary(BinaryOp::Mul, t2.into(), t2.into());
        let b = rec.binary(BinaryOp::Mul, hundred.into(), b.into());
        terms.push(rec.binary(BinaryOp::Add, a.into(), b.into()));
    }
    let mut sum = terms[0];
    for &t in &terms[1..] {
        sum = rec.binary(BinaryOp::Add, sum.into(), t.into());
    }
    rec.finalize(&[sum])
}

// ─── Helpers ───────────────────────────────────────────────────────────────

pub fn finite_diff_gradient(f: impl Fn(&[f64]) -> f64, x: &[f64], h: f64) -> Vec<f64> {
    let mut xp = x.to_vec();
    let mut g = Vec::with_capacity(x.len());
    for i in 0..x.len() {
        xp[i] = x[i] + h;
        let fp = f(&xp);
        xp[i] = x[i] - h;
        let fm = f(&xp);
        xp[i] = x[i];
        g.push((fp - fm) / (2.0 * h));
    }
    g
}

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.5 + 0.01 * i as f64).collect()
}
