use std::fmt;

use crate::float::Float;

use super::args::{for_each_arg, ArgKind};
use super::Tape;

impl<F: Float> fmt::Display for Tape<F> {
    /// One line per op: `index name args -> results`, where variables print
    /// as `v<i>`, parameters as `p<i>=<value>` and immediates as numbers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in self.iter() {
            write!(f, "{:>5} {:<7}", op.index.0, op.code.name())?;
            let mut err = Ok(());
            for_each_arg(op.code, op.args, |j, kind| {
                let a = op.args[j];
                let r = match kind {
                    ArgKind::Var => write!(f, " v{a}"),
                    ArgKind::Par => write!(f, " p{a}={}", self.params[a as usize]),
                    ArgKind::Imm => write!(f, " {a}"),
                };
                if err.is_ok() {
                    err = r;
                }
            });
            err?;
            match op.num_res() {
                0 => writeln!(f)?,
                1 => writeln!(f, " -> {}", op.res_start)?,
                n => writeln!(f, " -> {}..=v{}", op.res_start, op.res_start.0 as usize + n - 1)?,
            }
        }
        Ok(())
    }
}
