use std::sync::Arc;

use rayon::prelude::*;

use crate::error::Result;
use crate::eval::Evaluator;
use crate::float::Float;
use crate::tape::Tape;

impl<F: Float> Tape<F> {
    /// Gradient at every point of `points`, in parallel.
    ///
    /// The tape is shared; each rayon worker builds one [`Evaluator`] and
    /// reuses it for every point it handles.
    pub fn gradient_batch_par(self: &Arc<Self>, points: &[Vec<F>]) -> Result<Vec<Vec<F>>> {
        points
            .par_iter()
            .map_init(|| Evaluator::new(Arc::clone(self)), |ev, x| ev.gradient(x))
            .collect()
    }

    /// Dense Jacobian (`[i * n + j]`) at every point of `points`, in parallel.
    pub fn jacobian_batch_par(self: &Arc<Self>, points: &[Vec<F>]) -> Result<Vec<Vec<F>>> {
        points
            .par_iter()
            .map_init(|| Evaluator::new(Arc::clone(self)), |ev, x| ev.jacobian(x))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::tape::{BinaryOp, Recorder};
    use approx::assert_relative_eq;

    #[test]
    fn batch_matches_serial() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let y = rec.binary(BinaryOp::Mul, x[0].into(), x[1].into());
        let tape = rec.finalize(&[y]).into_shared();

        let points: Vec<Vec<f64>> = (0..64).map(|k| vec![k as f64, 1.0 + k as f64]).collect();
        let grads = tape.gradient_batch_par(&points).unwrap();
        for (x, g) in points.iter().zip(&grads) {
            assert_relative_eq!(g[0], x[1]);
            assert_relative_eq!(g[1], x[0]);
        }
        let jacs = tape.jacobian_batch_par(&points).unwrap();
        assert_eq!(jacs, grads);
    }

    #[test]
    fn errors_are_reported() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.independent(2);
        let tape = rec.finalize(&[x[0]]).into_shared();
        assert!(tape.gradient_batch_par(&[vec![1.0]]).is_err());
    }
}
