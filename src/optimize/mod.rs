//! Tape optimizer.
//!
//! [`Tape::optimize`] rewrites a finalized tape into a new one that computes
//! the same dependents, bit for bit, from the same independents and dynamic
//! parameters. The passes run in this order:
//!
//! 1. **Value numbering** ([`value`]): a forward pass that maps every
//!    variable to the first variable computed by an identical op on
//!    identical (already substituted) operands. `AddVV`/`MulVV` sort their
//!    operands first.
//! 2. **Liveness** ([`needed`]): a reverse pass from the dependents. An op
//!    survives if one of its results is read; stores survive if their array
//!    is loaded; a plug-in call survives as a whole bracket. The same pass
//!    records, per variable, whether it is only read through one branch of
//!    a conditional expression.
//! 3. **Cumulative-sum fusion** ([`csum`], opt-in).
//! 4. **Conditional skips** ([`skip`]): ops needed only by one branch of a
//!    `CExp` are listed in a `CSkip` placed right after the comparison
//!    operands are known.
//! 5. **Emission** ([`emit`]): surviving ops are re-recorded into a fresh
//!    [`Recorder`](crate::tape::Recorder), remapping variables through the
//!    substitution table and rebuilding the parameter pool.
//!
//! The optimized tape never has more ops than the input: skip ops are only
//! inserted while the earlier passes freed room for them.

use std::str::FromStr;

use crate::error::AdError;
use crate::float::Float;
use crate::tape::Tape;

mod csum;
mod emit;
mod needed;
mod skip;
mod value;

/// Optimizer switches.
///
/// The defaults keep comparison and print ops, insert conditional skips and
/// leave additions alone. Also parsed from space-separated keywords, see
/// [`OptimizeOptions::from_str`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Keep comparison ops, so that
    /// [`compare_change_count`](crate::Evaluator::compare_change_count) still
    /// works on the optimized tape.
    pub compare_ops: bool,
    /// Keep forward-print ops.
    pub print_ops: bool,
    /// Insert conditional skips.
    pub conditional_skip: bool,
    /// Fuse chains of additions and subtractions into `CSum` ops. This
    /// changes the order of floating-point additions.
    pub cumulative_sum: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        OptimizeOptions {
            compare_ops: true,
            print_ops: true,
            conditional_skip: true,
            cumulative_sum: false,
        }
    }
}

impl FromStr for OptimizeOptions {
    type Err = AdError;

    /// Parse `no_compare_op`, `no_print_for_op`, `no_conditional_skip` and
    /// `cumulative_sum`, separated by whitespace, on top of the defaults.
    fn from_str(s: &str) -> Result<Self, AdError> {
        let mut options = OptimizeOptions::default();
        for word in s.split_whitespace() {
            match word {
                "no_compare_op" => options.compare_ops = false,
                "no_print_for_op" => options.print_ops = false,
                "no_conditional_skip" => options.conditional_skip = false,
                "cumulative_sum" => options.cumulative_sum = true,
                other => return Err(AdError::UnknownOption(other.to_owned())),
            }
        }
        Ok(options)
    }
}

/// Tape sizes before and after one optimizer run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub ops_before: usize,
    pub ops_after: usize,
    pub vars_before: usize,
    pub vars_after: usize,
    pub args_before: usize,
    pub args_after: usize,
    pub pars_before: usize,
    pub pars_after: usize,
    /// Variables redirected to an earlier identical computation.
    pub merged: usize,
    /// `CSkip` ops inserted.
    pub skips: usize,
}

impl<F: Float> Tape<F> {
    /// Optimized copy of this tape.
    ///
    /// Sweep results computed on `self` do not carry over: variable and op
    /// numbering change.
    pub fn optimize(&self, options: OptimizeOptions) -> Tape<F> {
        self.optimize_with_stats(options).0
    }

    /// As [`Tape::optimize`], also returning the size statistics.
    pub fn optimize_with_stats(&self, options: OptimizeOptions) -> (Tape<F>, OptimizeStats) {
        let (rep, merged) = value::value_numbers(self);
        let live = needed::liveness(self, &rep, &options);
        let fusion = if options.cumulative_sum {
            csum::fuse(self, &rep, &live)
        } else {
            csum::Fusion::none(self.num_op())
        };

        let mut skips = if options.conditional_skip {
            skip::candidates(self, &rep, &live, &fusion.absorbed)
        } else {
            Vec::new()
        };
        let emitted = (0..self.num_op())
            .filter(|&i| live.keep[i] && !fusion.absorbed[i])
            .count();
        let room = self.num_op().saturating_sub(emitted);
        if skips.len() > room {
            skips.sort_by_key(|s| std::cmp::Reverse(s.len()));
            skips.truncate(room);
            skips.sort_by_key(|s| s.cexp);
        }

        let tape = emit::rebuild(self, &rep, &live, &fusion, &skips);
        let stats = OptimizeStats {
            ops_before: self.num_op(),
            ops_after: tape.num_op(),
            vars_before: self.num_var(),
            vars_after: tape.num_var(),
            args_before: self.num_arg(),
            args_after: tape.num_arg(),
            pars_before: self.num_par(),
            pars_after: tape.num_par(),
            merged,
            skips: skips.len(),
        };
        log::debug!(
            "optimize: ops {} -> {}, vars {} -> {}, args {} -> {}, pars {} -> {} ({} merged, {} skips)",
            stats.ops_before,
            stats.ops_after,
            stats.vars_before,
            stats.vars_after,
            stats.args_before,
            stats.args_after,
            stats.pars_before,
            stats.pars_after,
            stats.merged,
            stats.skips
        );
        (tape, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::CompareOp;
    use crate::tape::{BinaryOp, Recorder};
    use crate::{Evaluator, OpCode, Operand};
    use approx::assert_relative_eq;

    #[test]
    fn options_parse_keywords() {
        let o: OptimizeOptions = "no_compare_op  cumulative_sum".parse().unwrap();
        assert!(!o.compare_ops);
        assert!(o.print_ops);
        assert!(o.conditional_skip);
        assert!(o.cumulative_sum);
        assert_eq!("".parse::<OptimizeOptions>().unwrap(), OptimizeOptions::default());
        assert_eq!(
            "no_skip".parse::<OptimizeOptions>(),
            Err(AdError::UnknownOption("no_skip".into()))
        );
    }

    #[test]
    fn removes_dead_and_duplicate_ops() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let four = rec.append_constant(4.0);
        let sum = rec.binary(BinaryOp::Add, x[0].into(), x[1].into());
        let z = rec.binary(BinaryOp::Sub, sum.into(), four.into());
        let again = rec.binary(BinaryOp::Add, x[1].into(), x[0].into());
        let four_again = rec.append_constant(4.0);
        let z2 = rec.binary(BinaryOp::Sub, z.into(), four_again.into());
        let _unused = rec.binary(BinaryOp::Mul, again.into(), again.into());
        rec.append_constant(5.0);
        let tape = rec.finalize(&[z2]);

        let (opt, stats) = tape.optimize_with_stats(OptimizeOptions::default());
        assert!(stats.ops_after < stats.ops_before);
        assert!(stats.pars_after < stats.pars_before);
        assert_eq!(stats.merged, 1);
        // Begin, 2 × Inv, AddVV, 2 × SubVP, End
        assert_eq!(opt.num_op(), 7);
        // phantom and one 4.0
        assert_eq!(opt.num_par(), 2);

        let mut ev = Evaluator::from_tape(opt);
        assert_eq!(ev.forward_zero(&[5.0, 6.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn conditional_skip_is_inserted_when_there_is_room() {
        // z = x0 < x1 ? exp(x0) : sin(x1), plus a dead op that makes room
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let e = rec.unary(OpCode::Exp, x[0]);
        let s = rec.unary(OpCode::Sin, x[1]);
        let _dead = rec.unary(OpCode::Cos, x[0]);
        let z = rec.cond_exp(CompareOp::Lt, x[0].into(), x[1].into(), e.into(), s.into());
        let tape = rec.finalize(&[z]);

        let (opt, stats) = tape.optimize_with_stats(OptimizeOptions::default());
        assert_eq!(stats.skips, 1);
        assert!(opt.op_codes().contains(&OpCode::CSkip));
        assert!(opt.num_op() <= tape.num_op());

        let mut ev = Evaluator::from_tape(opt);
        let y = ev.forward_zero(&[0.5, 2.0]).unwrap();
        assert_relative_eq!(y[0], 0.5_f64.exp());
        let sin_op = ev
            .tape()
            .iter()
            .find(|op| op.code == OpCode::Sin)
            .map(|op| op.index)
            .unwrap();
        assert!(ev.is_skipped(sin_op));
        let g = ev.reverse(1, &[1.0]).unwrap();
        assert_relative_eq!(g[0], 0.5_f64.exp());
        assert_eq!(g[1], 0.0);

        let y = ev.forward_zero(&[3.0, 2.0]).unwrap();
        assert_relative_eq!(y[0], 2.0_f64.sin());
        assert!(!ev.is_skipped(sin_op));
    }

    #[test]
    fn no_room_means_no_skip() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let e = rec.unary(OpCode::Exp, x[0]);
        let z = rec.cond_exp(CompareOp::Lt, x[0].into(), x[1].into(), e.into(), x[1].into());
        let tape = rec.finalize(&[z]);
        let (opt, stats) = tape.optimize_with_stats(OptimizeOptions::default());
        assert_eq!(stats.skips, 0);
        assert_eq!(opt.num_op(), tape.num_op());
    }

    #[test]
    fn cumulative_sum_fuses_single_use_chains() {
        // y = ((x0 + x1) - x2) + 3 - (-x3)
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(4);
        let three = rec.append_constant(3.0);
        let a = rec.binary(BinaryOp::Add, x[0].into(), x[1].into());
        let b = rec.binary(BinaryOp::Sub, a.into(), x[2].into());
        let c = rec.binary(BinaryOp::Add, b.into(), three.into());
        let n = rec.unary(OpCode::Neg, x[3]);
        let y = rec.binary(BinaryOp::Sub, c.into(), n.into());
        let tape = rec.finalize(&[y]);

        let opt = tape.optimize("cumulative_sum".parse().unwrap());
        let sums = opt.op_codes().iter().filter(|&&c| c == OpCode::CSum).count();
        assert_eq!(sums, 1);
        assert!(!opt.op_codes().contains(&OpCode::AddVV));

        let x0 = [1.0, 2.0, 4.0, 8.0];
        let mut ev = Evaluator::from_tape(opt);
        assert_relative_eq!(ev.forward_zero(&x0).unwrap()[0], 10.0);
        let g = ev.reverse(1, &[1.0]).unwrap();
        assert_eq!(g, vec![1.0, 1.0, -1.0, 1.0]);
    }

    #[test]
    fn dynamic_parameters_survive() {
        let mut rec = Recorder::<f64>::new();
        let p = rec.new_dynamic(2.0);
        let x = rec.independent(1);
        let unused = rec.append_constant(7.0);
        let p2 = rec.binary(BinaryOp::Mul, Operand::Par(p), Operand::Par(unused));
        let y = rec.binary(BinaryOp::Mul, Operand::Par(p), x[0].into());
        let _dead = rec.binary(BinaryOp::Add, p2.into(), x[0].into());
        let tape = rec.finalize(&[y]);

        let opt = tape.optimize(OptimizeOptions::default());
        assert_eq!(opt.num_dynamic(), 1);
        let mut ev = Evaluator::from_tape(opt);
        ev.new_dynamic(&[5.0]).unwrap();
        assert_eq!(ev.forward_zero(&[3.0]).unwrap(), vec![15.0]);
    }

    #[test]
    fn comparison_and_print_options() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(1);
        let zero = rec.append_constant(0.0);
        rec.compare(CompareOp::Lt, zero.into(), x[0].into());
        rec.print(x[0].into(), "x = ", x[0].into(), "\n");
        let tape = rec.finalize(&[x[0]]);

        let kept = tape.optimize(OptimizeOptions::default());
        assert!(kept.op_codes().contains(&OpCode::LtPV));
        assert!(kept.op_codes().contains(&OpCode::Pri));

        let dropped = tape.optimize("no_compare_op no_print_for_op".parse().unwrap());
        assert_eq!(dropped.num_op(), 3);
    }

    #[test]
    fn stores_survive_only_when_loaded() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let zero = rec.append_constant(0.0);
        let live = rec.new_vec_ad(&[zero, zero]);
        let dead = rec.new_vec_ad(&[zero]);
        rec.store(live, Operand::Par(zero), x[0].into());
        rec.store(dead, Operand::Par(zero), x[1].into());
        let y = rec.load(live, Operand::Var(x[1]));
        let tape = rec.finalize(&[y]);

        let opt = tape.optimize(OptimizeOptions::default());
        let stores = opt.op_codes().iter().filter(|&&c| c == OpCode::Stpv).count();
        assert_eq!(stores, 1);
        let mut ev = Evaluator::from_tape(opt);
        assert_eq!(ev.forward_zero(&[4.0, 0.0]).unwrap(), vec![4.0]);
    }
}
