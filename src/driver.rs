//! Derivative drivers built from forward and reverse sweeps.
//!
//! Dense drivers return row-major matrices. Sparse drivers return values in
//! the entry order of the pattern they are given and use a coloring so the
//! number of sweeps is the number of colors, not the dimension; the subgraph
//! driver instead sweeps once per row over only the ops that row reads.

use std::sync::Arc;

use crate::error::{check_len, AdError, Result};
use crate::eval::Evaluator;
use crate::float::Float;
use crate::sparse::{color_columns, color_hessian, color_rows, HessianPattern, JacobianPattern};
use crate::sweep::subgraph::clear_subgraph;
use crate::sweep::Partials;

impl<F: Float> Evaluator<F> {
    /// Gradient of a scalar function.
    pub fn gradient(&mut self, x: &[F]) -> Result<Vec<F>> {
        let m = self.tape.num_dependent();
        if m != 1 {
            return Err(AdError::NotScalar(m));
        }
        self.forward_zero(x)?;
        self.reverse(1, &[F::one()])
    }

    /// Dense `m × n` Jacobian, `[i * n + j]`.
    ///
    /// Uses `n` forward sweeps or `m` reverse sweeps, whichever is fewer.
    pub fn jacobian(&mut self, x: &[F]) -> Result<Vec<F>> {
        let (n, m) = (self.tape.num_independent(), self.tape.num_dependent());
        self.forward_zero(x)?;
        let mut jac = vec![F::zero(); m * n];
        if n <= m {
            let mut dir = vec![F::zero(); n];
            for j in 0..n {
                dir[j] = F::one();
                let col = self.forward(1, &dir)?;
                dir[j] = F::zero();
                for i in 0..m {
                    jac[i * n + j] = col[i];
                }
            }
        } else {
            let mut w = vec![F::zero(); m];
            for i in 0..m {
                w[i] = F::one();
                let row = self.reverse(1, &w)?;
                w[i] = F::zero();
                jac[i * n..(i + 1) * n].copy_from_slice(&row);
            }
        }
        Ok(jac)
    }

    /// Dense `n × n` Hessian of `Σ_i w[i] y_i`, `[j * n + l]`.
    pub fn hessian(&mut self, x: &[F], w: &[F]) -> Result<Vec<F>> {
        let n = self.tape.num_independent();
        check_len("range weights", self.tape.num_dependent(), w.len())?;
        self.forward_zero(x)?;
        let mut hes = vec![F::zero(); n * n];
        let mut dir = vec![F::zero(); n];
        for l in 0..n {
            dir[l] = F::one();
            self.forward(1, &dir)?;
            dir[l] = F::zero();
            let r = self.reverse(2, w)?;
            for j in 0..n {
                hes[j * n + l] = r[j * 2];
            }
        }
        Ok(hes)
    }

    fn check_jacobian_pattern(&self, p: &JacobianPattern) -> Result<()> {
        let (n, m) = (self.tape.num_independent(), self.tape.num_dependent());
        if p.nrows() != m || p.ncols() != n {
            return Err(AdError::PatternShape {
                expected_sets: m,
                expected_end: n,
                got_sets: p.nrows(),
                got_end: p.ncols(),
            });
        }
        Ok(())
    }

    /// Jacobian entries of `pattern` by forward column compression: one
    /// direction per column color, all in a single multi-direction sweep.
    pub fn sparse_jacobian_forward(&mut self, x: &[F], pattern: &JacobianPattern) -> Result<Vec<F>> {
        self.check_jacobian_pattern(pattern)?;
        self.forward_zero(x)?;
        let coloring = color_columns(pattern);
        let r = coloring.num_colors;
        if r == 0 || pattern.nnz() == 0 {
            return Ok(Vec::new());
        }
        let n = self.tape.num_independent();
        let mut dirs = vec![F::zero(); n * r];
        for (j, &c) in coloring.colors.iter().enumerate() {
            dirs[j * r + c] = F::one();
        }
        let y = self.forward_dir(1, r, &dirs)?;
        Ok(pattern
            .iter()
            .map(|(i, j)| y[i * r + coloring.colors[j]])
            .collect())
    }

    /// Jacobian entries of `pattern` by reverse row compression: one
    /// reverse sweep per row color.
    pub fn sparse_jacobian_reverse(&mut self, x: &[F], pattern: &JacobianPattern) -> Result<Vec<F>> {
        self.check_jacobian_pattern(pattern)?;
        self.forward_zero(x)?;
        let coloring = color_rows(pattern);
        let m = self.tape.num_dependent();
        let mut by_color = Vec::with_capacity(coloring.num_colors);
        for c in 0..coloring.num_colors {
            let w: Vec<F> = (0..m)
                .map(|i| if coloring.colors[i] == c { F::one() } else { F::zero() })
                .collect();
            by_color.push(self.reverse(1, &w)?);
        }
        Ok(pattern
            .iter()
            .map(|(i, j)| by_color[coloring.colors[i]][j])
            .collect())
    }

    /// Jacobian entries listed by `pattern`, one reverse sweep per row with
    /// entries, each visiting only the subgraph of that row's dependent.
    pub fn subgraph_jacobian(&mut self, x: &[F], pattern: &JacobianPattern) -> Result<Vec<F>> {
        self.check_jacobian_pattern(pattern)?;
        self.forward_zero(x)?;
        let tape = Arc::clone(&self.tape);
        let subgraphs = tape.subgraphs()?;
        let table = tape.random_access();
        let mut pd = Partials::new(tape.num_var(), 1);

        let entries: Vec<(usize, usize)> = pattern.iter().collect();
        let mut out = Vec::with_capacity(entries.len());
        let mut start = 0;
        while start < entries.len() {
            let i = entries[start].0;
            let len = entries[start..].iter().take_while(|e| e.0 == i).count();
            let ops = &subgraphs[i];
            self.subgraph_sweep(&tape, &table, ops, i, &mut pd)?;
            out.extend(entries[start..start + len].iter().map(|&(_, j)| pd.get(j + 1, 0)));
            clear_subgraph(&tape, &table, ops, i, &mut pd);
            start += len;
        }
        Ok(out)
    }

    /// Lower-triangle Hessian entries of `Σ_i w[i] y_i` listed by `pattern`,
    /// one forward/reverse pair per color of a distance-2 coloring.
    pub fn sparse_hessian(&mut self, x: &[F], w: &[F], pattern: &HessianPattern) -> Result<Vec<F>> {
        let n = self.tape.num_independent();
        check_len("range weights", self.tape.num_dependent(), w.len())?;
        if pattern.dim() != n {
            return Err(AdError::PatternShape {
                expected_sets: n,
                expected_end: n,
                got_sets: pattern.dim(),
                got_end: pattern.dim(),
            });
        }
        self.forward_zero(x)?;
        let coloring = color_hessian(pattern);
        let mut by_color = Vec::with_capacity(coloring.num_colors);
        for group in coloring.groups() {
            let mut dir = vec![F::zero(); n];
            for &j in &group {
                dir[j] = F::one();
            }
            self.forward(1, &dir)?;
            let r = self.reverse(2, w)?;
            by_color.push((0..n).map(|j| r[j * 2]).collect::<Vec<_>>());
        }
        Ok(pattern
            .iter()
            .map(|(i, j)| by_color[coloring.colors[j]][i])
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::tape::{BinaryOp, Recorder};
    use crate::{Evaluator, OpCode};
    use approx::assert_relative_eq;

    fn rosenbrock() -> Evaluator<f64> {
        // f = (1 - x0)^2 + 100 (x1 - x0^2)^2
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let one = rec.append_constant(1.0);
        let hundred = rec.append_constant(100.0);
        let a = rec.binary(BinaryOp::Sub, one.into(), x[0].into());
        let a2 = rec.binary(BinaryOp::Mul, a.into(), a.into());
        let sq = rec.binary(BinaryOp::Mul, x[0].into(), x[0].into());
        let b = rec.binary(BinaryOp::Sub, x[1].into(), sq.into());
        let b2 = rec.binary(BinaryOp::Mul, b.into(), b.into());
        let c = rec.binary(BinaryOp::Mul, hundred.into(), b2.into());
        let f = rec.binary(BinaryOp::Add, a2.into(), c.into());
        Evaluator::from_tape(rec.finalize(&[f]))
    }

    #[test]
    fn rosenbrock_gradient_and_hessian() {
        let mut ev = rosenbrock();
        let g = ev.gradient(&[1.0, 1.0]).unwrap();
        assert_relative_eq!(g[0], 0.0);
        assert_relative_eq!(g[1], 0.0);
        let h = ev.hessian(&[1.0, 1.0], &[1.0]).unwrap();
        assert_relative_eq!(h[0], 802.0, epsilon = 1e-10);
        assert_relative_eq!(h[1], -400.0, epsilon = 1e-10);
        assert_relative_eq!(h[2], -400.0, epsilon = 1e-10);
        assert_relative_eq!(h[3], 200.0, epsilon = 1e-10);
    }

    #[test]
    fn jacobian_uses_either_mode() {
        // y = (x0 x1, sin x0, x1)
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let p = rec.binary(BinaryOp::Mul, x[0].into(), x[1].into());
        let s = rec.unary(OpCode::Sin, x[0]);
        let mut ev = Evaluator::from_tape(rec.finalize(&[p, s, x[1]]));
        let j = ev.jacobian(&[0.5, 2.0]).unwrap();
        assert_relative_eq!(j[0], 2.0);
        assert_relative_eq!(j[1], 0.5);
        assert_relative_eq!(j[2], 0.5_f64.cos());
        assert_relative_eq!(j[3], 0.0);
        assert_relative_eq!(j[5], 1.0);
    }

    #[test]
    fn gradient_requires_scalar_function() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let mut ev = Evaluator::from_tape(rec.finalize(&[x[0], x[1]]));
        assert!(ev.gradient(&[0.0, 0.0]).is_err());
    }
}
