//! Reverse sweep.
//!
//! Walks the tape backwards accumulating partials of a weighted sum of
//! dependent coefficients. Every op reads its own accumulated partials
//! (complete, since all consumers come later on the tape) and adds into its
//! arguments. Ops whose results carry no partial are passed over.

use std::sync::Arc;

use crate::error::{ensure_internal, AdError, Result};
use crate::eval::Evaluator;
use crate::float::Float;
use crate::index::AtomicId;
use crate::op::atomic::CallResult;
use crate::op::transcendental::{self, Inverse};
use crate::op::{arith, cond, csum, pow, vec_ad, Arg};
use crate::opcode::{self, OpCode};
use crate::sweep::Partials;
use crate::tape::{CSumLayout, OpView, Tape};

impl<F: Float> Evaluator<F> {
    /// Reverse sweep of order `q >= 1`.
    ///
    /// With `w.len() == m`, the target is `Σ_i w[i] * y_i^(q-1)`; with
    /// `w.len() == m * q` it is `Σ_i Σ_k w[i * q + k] * y_i^(k)`. Requires
    /// forward orders `0..q` in a single direction. Returns the partials
    /// with respect to every independent coefficient, laid out
    /// `[j * q + k]`.
    pub fn reverse(&mut self, q: usize, w: &[F]) -> Result<Vec<F>> {
        self.check_reverse_ready(q)?;
        let m = self.tape.num_dependent();
        let all_orders = if w.len() == m * q {
            true
        } else if w.len() == m {
            false
        } else {
            return Err(AdError::Length {
                what: "reverse weights",
                expected: m,
                got: w.len(),
            });
        };

        let mut pd = Partials::new(self.tape.num_var(), q);
        for (i, dep) in self.tape.dependents.iter().enumerate() {
            if all_orders {
                for k in 0..q {
                    pd.add(dep.get(), k, w[i * q + k]);
                }
            } else {
                pd.add(dep.get(), q - 1, w[i]);
            }
        }

        self.reverse_sweep(&mut pd, q - 1)?;

        let n = self.tape.num_independent();
        let mut out = Vec::with_capacity(n * q);
        for j in 0..n {
            out.extend_from_slice(pd.row(j + 1));
        }
        Ok(out)
    }

    /// Orders `0..q` are computed in a single direction.
    pub(crate) fn check_reverse_ready(&self, q: usize) -> Result<()> {
        let available = self.taylor.num_order();
        if q == 0 || q > available {
            return Err(AdError::ReverseNotReady {
                requested: q,
                available,
            });
        }
        if self.taylor.num_dir() != 1 {
            return Err(AdError::ReverseMultiDirection {
                directions: self.taylor.num_dir(),
            });
        }
        Ok(())
    }

    pub(crate) fn reverse_sweep(&mut self, pd: &mut Partials<F>, d: usize) -> Result<()> {
        log::trace!("reverse sweep d = {d}");
        let tape = Arc::clone(&self.tape);
        self.reverse_ops(&tape, tape.iter().rev(), pd, d)
    }

    /// Reverse through `ops`, which must run backwards in tape order and
    /// hold whole call brackets.
    pub(crate) fn reverse_ops<'t>(
        &mut self,
        tape: &'t Tape<F>,
        ops: impl Iterator<Item = OpView<'t>>,
        pd: &mut Partials<F>,
        d: usize,
    ) -> Result<()> {
        self.frame.close();
        for op in ops {
            if self.skip[op.index.get()] {
                continue;
            }
            if op.num_res() > 0 && !opcode::is_call_bracket(op.code) {
                let first = op.res_start.get();
                if (first..first + op.num_res()).all(|v| pd.is_zero(v)) {
                    continue;
                }
            }
            if let Err(e) = self.reverse_op(tape, &op, pd, d) {
                self.frame.close();
                return Err(e);
            }
        }
        ensure_internal!(!self.frame.is_open(), OpCode::Begin, 0, "call bracket not closed");
        Ok(())
    }

    fn reverse_op(&mut self, tape: &Tape<F>, op: &OpView<'_>, pd: &mut Partials<F>, d: usize) -> Result<()> {
        use OpCode::*;

        let code = op.code;
        let aux = op.aux().get();
        let z = if op.num_res() > 0 { op.result().get() } else { 0 };
        let t = &self.taylor;
        let par = &self.par;
        let x = || op.idx(0);
        let y = || op.idx(1);
        let p0 = || par[op.idx(0)];
        let p1 = || par[op.idx(1)];

        match code {
            Begin | End | Inv | Par | Sign | Dis => {}
            EqPV | EqVV | NePV | NeVV | LtPV | LtVP | LtVV | LePV | LeVP | LeVV => {}
            CSkip | Pri | Stpp | Stpv | Stvp | Stvv => {}

            Abs => arith::rev_abs(t, pd, d, z, x()),
            Neg => arith::rev_linear(pd, d, z, x(), -F::one()),
            Exp => transcendental::rev_exp(t, pd, d, z, x(), false),
            Expm1 => transcendental::rev_exp(t, pd, d, z, x(), true),
            Log => transcendental::rev_log(t, pd, d, z, x(), false),
            Log1p => transcendental::rev_log(t, pd, d, z, x(), true),
            Sqrt => transcendental::rev_sqrt(t, pd, d, z, x()),

            Sin => transcendental::rev_sin_cos(t, pd, d, z, aux, x(), false),
            Cos => transcendental::rev_sin_cos(t, pd, d, aux, z, x(), false),
            Sinh => transcendental::rev_sin_cos(t, pd, d, z, aux, x(), true),
            Cosh => transcendental::rev_sin_cos(t, pd, d, aux, z, x(), true),
            Tan => transcendental::rev_tan(t, pd, d, z, aux, x(), false),
            Tanh => transcendental::rev_tan(t, pd, d, z, aux, x(), true),
            Asin => transcendental::rev_inverse(t, pd, d, Inverse::Asin, z, aux, x()),
            Acos => transcendental::rev_inverse(t, pd, d, Inverse::Acos, z, aux, x()),
            Asinh => transcendental::rev_inverse(t, pd, d, Inverse::Asinh, z, aux, x()),
            Acosh => transcendental::rev_inverse(t, pd, d, Inverse::Acosh, z, aux, x()),
            Atan => transcendental::rev_inverse(t, pd, d, Inverse::Atan, z, aux, x()),
            Atanh => transcendental::rev_inverse(t, pd, d, Inverse::Atanh, z, aux, x()),

            AddPV => arith::rev_linear(pd, d, z, y(), F::one()),
            AddVV => {
                arith::rev_linear(pd, d, z, x(), F::one());
                arith::rev_linear(pd, d, z, y(), F::one());
            }
            SubPV => arith::rev_linear(pd, d, z, y(), -F::one()),
            SubVP => arith::rev_linear(pd, d, z, x(), F::one()),
            SubVV => {
                arith::rev_linear(pd, d, z, x(), F::one());
                arith::rev_linear(pd, d, z, y(), -F::one());
            }
            MulPV => arith::rev_mul_pv(pd, d, z, p0(), y(), false),
            MulVV => arith::rev_mul_vv(t, pd, d, z, x(), y(), false),
            DivPV => arith::rev_div(t, pd, d, z, None, y()),
            DivVP => arith::rev_linear(pd, d, z, x(), F::one() / p1()),
            DivVV => arith::rev_div(t, pd, d, z, Some(x()), y()),
            ZmulPV => arith::rev_mul_pv(pd, d, z, p0(), y(), true),
            ZmulVP => arith::rev_zmul_vp(pd, d, z, x(), p1()),
            ZmulVV => arith::rev_mul_vv(t, pd, d, z, x(), y(), true),
            PowPV => pow::rev_pow_pv(t, pd, d, aux, p0(), y()),
            PowVP => pow::rev_pow_vp(t, pd, d, z, x(), p1()),
            PowVV => pow::rev_pow_vv(t, pd, d, aux, x(), y()),

            CExp => {
                let (cop, left, right) = self.condition(op);
                let (if_true, if_false) = self.branches(op);
                let holds = cond::holds(&self.taylor, cop, left, right);
                cond::reverse(pd, d, z, holds, if_true, if_false);
            }
            CSum => {
                let layout = CSumLayout::of(op.args);
                csum::reverse(
                    pd,
                    d,
                    z,
                    &op.args[layout.add.0..layout.add.1],
                    &op.args[layout.sub.0..layout.sub.1],
                );
            }
            Ldp | Ldv => {
                let binding = self.load_binding[op.idx(2)] as usize;
                vec_ad::rev_load(pd, d, z, (binding != 0).then_some(binding));
            }

            AFun => {
                if !self.frame.is_open() {
                    self.frame.open(op.args);
                } else {
                    self.frame.reverse_collected();
                    let id = AtomicId(op.arg(0));
                    let called = match tape.registry.atomic(id) {
                        Some(plugin) => self.frame.reverse(plugin.as_ref(), &self.taylor, pd, d),
                        None => Err(AdError::UnknownAtomic(id.0)),
                    };
                    self.frame.close();
                    called?;
                }
            }
            FunAP => self.frame.push_arg(Arg::Par(p0())),
            FunAV => self.frame.push_arg(Arg::Var(x())),
            FunRP => self.frame.push_result(CallResult::Par(p0())),
            FunRV => self.frame.push_result(CallResult::Var(z)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tape::{BinaryOp, Recorder};
    use crate::{AdError, Evaluator, OpCode, Operand};
    use approx::assert_relative_eq;

    #[test]
    fn gradient_of_product_and_exp() {
        // f = exp(x0) * x1
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let e = rec.unary(OpCode::Exp, x[0]);
        let f = rec.binary(BinaryOp::Mul, e.into(), x[1].into());
        let mut ev = Evaluator::from_tape(rec.finalize(&[f]));
        ev.forward_zero(&[0.5, 3.0]).unwrap();
        let g = ev.reverse(1, &[1.0]).unwrap();
        assert_relative_eq!(g[0], 3.0 * 0.5_f64.exp(), epsilon = 1e-14);
        assert_relative_eq!(g[1], 0.5_f64.exp(), epsilon = 1e-14);
    }

    #[test]
    fn second_order_reverse_gives_hessian_vector_product() {
        // f = x0^2 x1; H = [[2 x1, 2 x0], [2 x0, 0]]
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let sq = rec.binary(BinaryOp::Mul, x[0].into(), x[0].into());
        let f = rec.binary(BinaryOp::Mul, sq.into(), Operand::Var(x[1]));
        let mut ev = Evaluator::from_tape(rec.finalize(&[f]));
        ev.forward_zero(&[2.0, 5.0]).unwrap();
        ev.forward(1, &[1.0, 0.0]).unwrap();
        let r = ev.reverse(2, &[1.0]).unwrap();
        // [j * 2] holds (H v)_j
        assert_relative_eq!(r[0], 10.0, epsilon = 1e-12);
        assert_relative_eq!(r[2], 4.0, epsilon = 1e-12);
        // [j * 2 + 1] holds the gradient
        assert_relative_eq!(r[1], 20.0, epsilon = 1e-12);
        assert_relative_eq!(r[3], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn reverse_needs_forward_orders() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(1);
        let y = rec.unary(OpCode::Sin, x[0]);
        let mut ev = Evaluator::from_tape(rec.finalize(&[y]));
        assert!(matches!(ev.reverse(1, &[1.0]), Err(AdError::ReverseNotReady { .. })));
        ev.forward_zero(&[0.0]).unwrap();
        assert!(matches!(ev.reverse(2, &[1.0]), Err(AdError::ReverseNotReady { .. })));
        assert!(matches!(ev.reverse(1, &[1.0, 2.0]), Err(AdError::Length { .. })));
    }
}
