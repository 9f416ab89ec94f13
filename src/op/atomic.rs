//! Plug-in call brackets.
//!
//! The sweeps visit the ops of a bracket one at a time; [`CallFrame`]
//! collects the arguments and results as they go by and invokes the
//! plug-in once the bracket is complete (the closing `AFun` going forward,
//! the opening one going backward). Its coefficient buffers are reused
//! across calls, so an evaluator allocates them once.

use crate::error::{AdError, Result};
use crate::extension::{AtomicFunction, CallInfo};
use crate::float::Float;
use crate::sweep::{Partials, TaylorStore};

use super::{Arg, Orders};

/// A result of a call: a variable, or a parameter with its value.
#[derive(Clone, Copy, Debug)]
pub(crate) enum CallResult<F> {
    Var(usize),
    Par(F),
}

#[derive(Clone, Debug)]
pub(crate) struct CallFrame<F> {
    pub call_id: u32,
    pub n: usize,
    pub m: usize,
    open: bool,
    args: Vec<Arg<F>>,
    is_var: Vec<bool>,
    results: Vec<CallResult<F>>,
    tx: Vec<F>,
    ty: Vec<F>,
    px: Vec<F>,
    py: Vec<F>,
}

impl<F: Float> CallFrame<F> {
    pub fn new() -> Self {
        CallFrame {
            call_id: 0,
            n: 0,
            m: 0,
            open: false,
            args: Vec::new(),
            is_var: Vec::new(),
            results: Vec::new(),
            tx: Vec::new(),
            ty: Vec::new(),
            px: Vec::new(),
            py: Vec::new(),
        }
    }

    /// True between the two `AFun` markers of a bracket.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Start collecting a bracket with header `[atomic_id, call_id, n, m]`.
    /// The plug-in is looked up again at the closing marker.
    pub fn open(&mut self, header: &[u32]) {
        self.call_id = header[1];
        self.n = header[2] as usize;
        self.m = header[3] as usize;
        self.open = true;
        self.args.clear();
        self.is_var.clear();
        self.results.clear();
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    #[inline]
    pub fn push_arg(&mut self, arg: Arg<F>) {
        self.is_var.push(arg.var().is_some());
        self.args.push(arg);
    }

    #[inline]
    pub fn push_result(&mut self, result: CallResult<F>) {
        self.results.push(result);
    }

    /// Restore tape order after collecting backwards.
    pub fn reverse_collected(&mut self) {
        self.args.reverse();
        self.is_var.reverse();
        self.results.reverse();
    }

    #[inline]
    pub fn args(&self) -> &[Arg<F>] {
        &self.args
    }

    #[inline]
    pub fn results(&self) -> &[CallResult<F>] {
        &self.results
    }

    /// Run the plug-in's forward for orders `o.p..=o.q` in every direction
    /// and store the variable results.
    pub fn forward(&mut self, plugin: &dyn AtomicFunction<F>, t: &mut TaylorStore<F>, o: Orders) -> Result<()> {
        let w = o.q + 1;
        let (n, m) = (self.n, self.m);
        for ell in 0..o.r {
            self.tx.clear();
            self.tx.resize(n * w, F::zero());
            for (j, arg) in self.args.iter().enumerate() {
                match *arg {
                    Arg::Var(v) => {
                        for k in 0..w {
                            self.tx[j * w + k] = t.get(v, k, ell);
                        }
                    }
                    Arg::Par(p) => self.tx[j * w] = p,
                }
            }
            self.ty.clear();
            self.ty.resize(m * w, F::zero());
            for (i, res) in self.results.iter().enumerate() {
                match *res {
                    CallResult::Var(v) => {
                        for k in 0..o.p {
                            self.ty[i * w + k] = t.get(v, k, ell);
                        }
                    }
                    CallResult::Par(p) => self.ty[i * w] = p,
                }
            }

            let call = CallInfo {
                call_id: self.call_id,
                n,
                m,
                x_is_var: &self.is_var,
            };
            plugin
                .forward(&call, o.p, o.q, &self.tx, &mut self.ty)
                .map_err(|message| AdError::AtomicFailed {
                    name: plugin.name().to_owned(),
                    phase: "forward",
                    message,
                })?;

            for (i, res) in self.results.iter().enumerate() {
                if let CallResult::Var(v) = *res {
                    for k in o.p..w {
                        t.set(v, k, ell, self.ty[i * w + k]);
                    }
                }
            }
        }
        Ok(())
    }

    /// Run the plug-in's reverse for orders `0..=d` and add the argument
    /// partials. Does nothing when every result partial is zero.
    pub fn reverse(
        &mut self,
        plugin: &dyn AtomicFunction<F>,
        t: &TaylorStore<F>,
        pd: &mut Partials<F>,
        d: usize,
    ) -> Result<()> {
        let w = d + 1;
        let (n, m) = (self.n, self.m);

        self.py.clear();
        self.py.resize(m * w, F::zero());
        let mut any = false;
        for (i, res) in self.results.iter().enumerate() {
            if let CallResult::Var(v) = *res {
                for k in 0..w {
                    let p = pd.get(v, k);
                    any |= p != F::zero();
                    self.py[i * w + k] = p;
                }
            }
        }
        if !any {
            return Ok(());
        }

        self.tx.clear();
        self.tx.resize(n * w, F::zero());
        for (j, arg) in self.args.iter().enumerate() {
            match *arg {
                Arg::Var(v) => self.tx[j * w..(j + 1) * w].copy_from_slice(&t.row(v)[..w]),
                Arg::Par(p) => self.tx[j * w] = p,
            }
        }
        self.ty.clear();
        self.ty.resize(m * w, F::zero());
        for (i, res) in self.results.iter().enumerate() {
            match *res {
                CallResult::Var(v) => self.ty[i * w..(i + 1) * w].copy_from_slice(&t.row(v)[..w]),
                CallResult::Par(p) => self.ty[i * w] = p,
            }
        }
        self.px.clear();
        self.px.resize(n * w, F::zero());

        let call = CallInfo {
            call_id: self.call_id,
            n,
            m,
            x_is_var: &self.is_var,
        };
        plugin
            .reverse(&call, d, &self.tx, &self.ty, &self.py, &mut self.px)
            .map_err(|message| AdError::AtomicFailed {
                name: plugin.name().to_owned(),
                phase: "reverse",
                message,
            })?;

        for (j, arg) in self.args.iter().enumerate() {
            if let Arg::Var(v) = *arg {
                for k in 0..w {
                    pd.add(v, k, self.px[j * w + k]);
                }
            }
        }
        Ok(())
    }
}

/// Check a plug-in's declared result count against a recorded call.
pub(crate) fn check_result_count<F: Float>(plugin: &dyn AtomicFunction<F>, call_id: u32, n: usize, m: usize) -> Result<()> {
    match plugin.num_results(call_id, n) {
        Some(expected) if expected != m => Err(AdError::AtomicResult {
            name: plugin.name().to_owned(),
            phase: "forward",
            expected,
            got: m,
        }),
        _ => Ok(()),
    }
}
