//! Forward Taylor sweep.
//!
//! One pass in tape order. Each op dispatches to the recurrence of its
//! family in [`crate::op`]; order-0 passes additionally reset and rebuild the
//! per-sweep state (skip marks, array contents, load bindings, comparison
//! counts, printed lines).

use std::sync::Arc;

use crate::error::{check_len, ensure_internal, AdError, Result};
use crate::eval::Evaluator;
use crate::float::Float;
use crate::index::{AtomicId, DiscreteId, VecAdId};
use crate::op::atomic::{self, CallResult};
use crate::op::transcendental::{self, Inverse};
use crate::op::vec_ad::{self, Slot};
use crate::op::{arith, cond, csum, pow, Arg, Orders};
use crate::opcode::{self, OpCode, PRI_POS_VAR, PRI_VALUE_VAR};
use crate::tape::{CSkipLayout, CSumLayout, OpView};

impl<F: Float> Evaluator<F> {
    /// Zero-order forward sweep: plain function values at `x`.
    ///
    /// Returns the dependent values. Resets every higher order and the
    /// direction count.
    pub fn forward_zero(&mut self, x: &[F]) -> Result<Vec<F>> {
        check_len("independent values", self.tape.num_independent(), x.len())?;
        self.taylor.reserve(1, 1);
        for (j, &xj) in x.iter().enumerate() {
            self.taylor.set(j + 1, 0, 0, xj);
        }
        self.sweep(Orders { p: 0, q: 0, r: 1 })?;
        self.taylor.set_num_order(1);
        Ok(self.dependent_order(0, 0))
    }

    /// Forward sweep for order `q` in a single direction.
    ///
    /// `xq` holds either order `q` of every independent (`n` values, orders
    /// below `q` must already be computed) or orders `0..=q` laid out
    /// `xq[j * (q + 1) + k]`. Returns the dependent coefficients of the
    /// orders computed, laid out the same way.
    pub fn forward(&mut self, q: usize, xq: &[F]) -> Result<Vec<F>> {
        let n = self.tape.num_independent();
        let p = if xq.len() == n * (q + 1) {
            0
        } else if xq.len() == n {
            q
        } else {
            return Err(AdError::Length {
                what: "independent coefficients",
                expected: n * (q + 1),
                got: xq.len(),
            });
        };
        let available = if self.taylor.num_dir() == 1 {
            self.taylor.num_order()
        } else {
            self.taylor.num_order().min(1)
        };
        if p > available {
            return Err(AdError::OrderNotReady {
                requested: q,
                available,
            });
        }

        self.taylor.reserve(q + 1, 1);
        let width = q + 1 - p;
        for j in 0..n {
            for k in p..=q {
                self.taylor.set(j + 1, k, 0, xq[j * width + (k - p)]);
            }
        }
        self.sweep(Orders { p, q, r: 1 })?;
        self.taylor.set_num_order(q + 1);

        let deps = &self.tape.dependents;
        let mut out = Vec::with_capacity(deps.len() * width);
        for d in deps {
            for k in p..=q {
                out.push(self.taylor.get(d.get(), k, 0));
            }
        }
        Ok(out)
    }

    /// Forward sweep for order `q >= 1` in `r` directions at once.
    ///
    /// `xq[j * r + ell]` is order `q` of independent `j` in direction `ell`.
    /// Orders `1..q` must have been computed with the same `r`. Returns
    /// `m * r` values laid out `[i * r + ell]`.
    pub fn forward_dir(&mut self, q: usize, r: usize, xq: &[F]) -> Result<Vec<F>> {
        if q == 0 {
            return Err(AdError::MultiDirectionOrderZero { directions: r });
        }
        let n = self.tape.num_independent();
        check_len("independent directions", n * r, xq.len())?;
        let num_order = self.taylor.num_order();
        if self.taylor.num_dir() != r && q > 1 && num_order > 1 {
            return Err(AdError::DirectionMismatch {
                previous: self.taylor.num_dir(),
                requested: r,
                order: q,
            });
        }
        let available = if self.taylor.num_dir() == r {
            num_order
        } else {
            num_order.min(1)
        };
        if q > available {
            return Err(AdError::OrderNotReady {
                requested: q,
                available,
            });
        }

        self.taylor.reserve(q + 1, r);
        for j in 0..n {
            for ell in 0..r {
                self.taylor.set(j + 1, q, ell, xq[j * r + ell]);
            }
        }
        self.sweep(Orders { p: q, q, r })?;
        self.taylor.set_num_order(q + 1);

        let mut out = Vec::with_capacity(self.tape.num_dependent() * r);
        for d in &self.tape.dependents {
            for ell in 0..r {
                out.push(self.taylor.get(d.get(), q, ell));
            }
        }
        Ok(out)
    }

    fn reset_order_zero(&mut self) {
        self.skip.iter_mut().for_each(|s| *s = false);
        self.load_binding.iter_mut().for_each(|b| *b = 0);
        self.arrays.reset(&self.tape.vec_ad_init);
        self.compare_change_count = 0;
        self.compare_change_op_index = None;
        self.printed.clear();
        self.frame.close();
    }

    /// Walk the tape computing orders `o.p..=o.q`. Independents are already
    /// in place.
    ///
    /// On failure orders `o.p` and up are partly written, so the valid
    /// order count drops to at most `o.p` and any open call bracket is
    /// discarded.
    pub(crate) fn sweep(&mut self, o: Orders) -> Result<()> {
        log::trace!("forward sweep p = {} q = {} r = {}", o.p, o.q, o.r);
        if o.has_zero() {
            self.reset_order_zero();
        } else {
            self.frame.close();
        }
        let swept = self.walk(o);
        if let Err(e) = &swept {
            log::debug!("forward sweep p = {} q = {} failed: {e}", o.p, o.q);
            self.frame.close();
            let kept = self.taylor.num_order().min(o.p);
            self.taylor.set_num_order(kept);
        }
        swept
    }

    fn walk(&mut self, o: Orders) -> Result<()> {
        let tape = Arc::clone(&self.tape);
        for op in tape.iter() {
            if self.skip[op.index.get()] {
                continue;
            }
            self.forward_op(&tape, &op, o)?;
        }
        ensure_internal!(
            !self.frame.is_open(),
            OpCode::End,
            tape.num_op(),
            "call bracket not closed"
        );
        Ok(())
    }

    fn forward_op(&mut self, tape: &crate::tape::Tape<F>, op: &OpView<'_>, o: Orders) -> Result<()> {
        use OpCode::*;

        let code = op.code;
        let pos = op.index.get();
        let aux = op.aux().get();
        let z = if op.num_res() > 0 { op.result().get() } else { 0 };
        let t = &mut self.taylor;
        let par = &self.par;
        let x = || op.idx(0);
        let y = || op.idx(1);
        let p0 = || par[op.idx(0)];
        let p1 = || par[op.idx(1)];

        match code {
            Begin => arith::constant(t, o, 0, par[0]),
            End | Inv => {}
            Par => arith::constant(t, o, z, p0()),

            Abs => arith::abs(t, o, z, x()),
            Neg => arith::neg(t, o, z, x()),
            Sign => arith::sign(t, o, z, x()),
            Exp => transcendental::exp(t, o, z, x(), false),
            Expm1 => transcendental::exp(t, o, z, x(), true),
            Log => transcendental::log(t, o, z, x(), false),
            Log1p => transcendental::log(t, o, z, x(), true),
            Sqrt => transcendental::sqrt(t, o, z, x()),

            Sin => transcendental::sin_cos(t, o, z, aux, x(), false),
            Cos => transcendental::sin_cos(t, o, aux, z, x(), false),
            Sinh => transcendental::sin_cos(t, o, z, aux, x(), true),
            Cosh => transcendental::sin_cos(t, o, aux, z, x(), true),
            Tan => transcendental::tan(t, o, z, aux, x(), false),
            Tanh => transcendental::tan(t, o, z, aux, x(), true),
            Asin => transcendental::inverse(t, o, Inverse::Asin, z, aux, x()),
            Acos => transcendental::inverse(t, o, Inverse::Acos, z, aux, x()),
            Asinh => transcendental::inverse(t, o, Inverse::Asinh, z, aux, x()),
            Acosh => transcendental::inverse(t, o, Inverse::Acosh, z, aux, x()),
            Atan => transcendental::inverse(t, o, Inverse::Atan, z, aux, x()),
            Atanh => transcendental::inverse(t, o, Inverse::Atanh, z, aux, x()),

            AddPV => arith::add_pv(t, o, z, p0(), y()),
            AddVV => arith::add_vv(t, o, z, x(), y()),
            SubPV => arith::sub_pv(t, o, z, p0(), y()),
            SubVP => arith::sub_vp(t, o, z, x(), p1()),
            SubVV => arith::sub_vv(t, o, z, x(), y()),
            MulPV => arith::mul_pv(t, o, z, p0(), y(), false),
            MulVV => arith::mul_vv(t, o, z, x(), y(), false),
            DivPV => arith::div_pv(t, o, z, p0(), y()),
            DivVP => arith::div_vp(t, o, z, x(), p1()),
            DivVV => arith::div_vv(t, o, z, x(), y()),
            ZmulPV => arith::mul_pv(t, o, z, p0(), y(), true),
            ZmulVP => arith::zmul_vp(t, o, z, x(), p1()),
            ZmulVV => arith::mul_vv(t, o, z, x(), y(), true),
            PowPV => pow::pow_pv(t, o, aux, p0(), y()),
            PowVP => pow::pow_vp(t, o, z, x(), p1()),
            PowVV => pow::pow_vv(t, o, aux, x(), y()),

            EqPV | EqVV | NePV | NeVV | LtPV | LtVP | LtVV | LePV | LeVP | LeVV => {
                if o.has_zero() {
                    let (lv, rv) = opcode::binary_operands(code).unwrap_or((true, true));
                    let left = self.operand(lv, op.arg(0)).value(&self.taylor);
                    let right = self.operand(rv, op.arg(1)).value(&self.taylor);
                    if !opcode::compare_holds(code, left, right) {
                        self.compare_change_count += 1;
                        if self.compare_change_op_index.is_none() {
                            self.compare_change_op_index = Some(op.index);
                        }
                    }
                }
            }

            CExp => {
                let (cop, left, right) = self.condition(op);
                let (if_true, if_false) = self.branches(op);
                let holds = cond::holds(&self.taylor, cop, left, right);
                cond::forward(&mut self.taylor, o, z, holds, if_true, if_false);
            }
            CSkip => {
                if o.has_zero() {
                    let (cop, left, right) = self.condition(op);
                    let layout = CSkipLayout::of(op.args);
                    let (lo, hi) = if cond::holds(&self.taylor, cop, left, right) {
                        layout.if_true
                    } else {
                        layout.if_false
                    };
                    for &target in &op.args[lo..hi] {
                        self.skip[target as usize] = true;
                    }
                }
            }
            CSum => {
                let layout = CSumLayout::of(op.args);
                let mut c = par[op.idx(0)];
                for &p in &op.args[layout.dyn_add.0..layout.dyn_add.1] {
                    c = c + par[p as usize];
                }
                for &p in &op.args[layout.dyn_sub.0..layout.dyn_sub.1] {
                    c = c - par[p as usize];
                }
                csum::forward(
                    t,
                    o,
                    z,
                    c,
                    &op.args[layout.add.0..layout.add.1],
                    &op.args[layout.sub.0..layout.sub.1],
                );
            }

            Dis => {
                let value = if o.has_zero() {
                    let id = DiscreteId(op.arg(0));
                    let f = tape
                        .registry
                        .discrete(id)
                        .ok_or(AdError::UnknownDiscrete(id.0))?;
                    f(t.get(op.idx(1), 0, 0))
                } else {
                    t.get(z, 0, 0)
                };
                arith::constant(t, o, z, value);
            }

            Ldp | Ldv => {
                let load_id = op.idx(2);
                if o.has_zero() {
                    let array = op.arg(0);
                    let index = self.operand(code == Ldv, op.arg(1)).value(&self.taylor);
                    let e = vec_ad::element(index, array, tape.vec_ad(VecAdId(array)), pos)?;
                    let (binding, value) = match self.arrays.get(e) {
                        Slot::Var(v) => (v, self.taylor.get(v as usize, 0, 0)),
                        Slot::Par(p) => (0, self.par[p as usize]),
                    };
                    self.load_binding[load_id] = binding;
                    vec_ad::load(&mut self.taylor, o, z, (binding != 0).then_some(binding as usize), value);
                } else {
                    let binding = self.load_binding[load_id] as usize;
                    let value = self.taylor.get(z, 0, 0);
                    vec_ad::load(&mut self.taylor, o, z, (binding != 0).then_some(binding), value);
                }
            }
            Stpp | Stpv | Stvp | Stvv => {
                if o.has_zero() {
                    let array = op.arg(0);
                    let index_var = matches!(code, Stvp | Stvv);
                    let value_var = matches!(code, Stpv | Stvv);
                    let index = self.operand(index_var, op.arg(1)).value(&self.taylor);
                    let e = vec_ad::element(index, array, tape.vec_ad(VecAdId(array)), pos)?;
                    let slot = if value_var {
                        Slot::Var(op.arg(2))
                    } else {
                        Slot::Par(op.arg(2))
                    };
                    self.arrays.set(e, slot);
                }
            }

            AFun => {
                let id = AtomicId(op.arg(0));
                let plugin = tape
                    .registry
                    .atomic(id)
                    .ok_or(AdError::UnknownAtomic(id.0))?;
                if !self.frame.is_open() {
                    if o.has_zero() {
                        atomic::check_result_count(plugin.as_ref(), op.arg(1), op.idx(2), op.idx(3))?;
                    }
                    self.frame.open(op.args);
                } else {
                    ensure_internal!(
                        self.frame.args().len() == self.frame.n && self.frame.results().len() == self.frame.m,
                        code,
                        pos,
                        "call bracket has {} arguments and {} results, header says {} and {}",
                        self.frame.args().len(),
                        self.frame.results().len(),
                        self.frame.n,
                        self.frame.m
                    );
                    let called = self.frame.forward(plugin.as_ref(), &mut self.taylor, o);
                    self.frame.close();
                    called?;
                }
            }
            FunAP => self.frame.push_arg(Arg::Par(p0())),
            FunAV => self.frame.push_arg(Arg::Var(x())),
            FunRP => self.frame.push_result(CallResult::Par(p0())),
            FunRV => self.frame.push_result(CallResult::Var(z)),

            Pri => {
                if o.has_zero() {
                    let flags = op.arg(0);
                    let position = self.operand(flags & PRI_POS_VAR != 0, op.arg(1)).value(&self.taylor);
                    if position <= F::zero() {
                        let value = self.operand(flags & PRI_VALUE_VAR != 0, op.arg(3)).value(&self.taylor);
                        let line = format!("{}{}{}", tape.text(op.arg(2)), value, tape.text(op.arg(4)));
                        log::debug!("print op {pos}: {line}");
                        self.printed.push(line);
                    }
                }
            }
        }
        Ok(())
    }
}
