//! Forward and backward traversal of a tape.
//!
//! The iterator tracks the argument and variable cursors itself, so engines
//! never compute positions. Walking backwards over a variable-arity op reads
//! its trailing argument count, which keeps each step O(1) in both
//! directions.

use std::iter::FusedIterator;

use crate::float::Float;
use crate::index::{ArgIndex, OpIndex, VarIndex};
use crate::opcode::{self, OpCode};

use super::args::arg_count_forward;
use super::Tape;

/// One operation as seen by an engine.
#[derive(Clone, Copy, Debug)]
pub struct OpView<'a> {
    pub index: OpIndex,
    pub code: OpCode,
    pub args: &'a [u32],
    pub arg_start: ArgIndex,
    /// First result variable. For ops without results this is the index the
    /// next result would get.
    pub res_start: VarIndex,
}

impl OpView<'_> {
    #[inline]
    pub fn num_res(&self) -> usize {
        opcode::num_res(self.code)
    }

    /// Primary result (the last one for multi-result ops).
    #[inline]
    pub fn result(&self) -> VarIndex {
        debug_assert!(self.num_res() > 0, "{} has no result", self.code);
        VarIndex(self.res_start.0 + self.num_res() as u32 - 1)
    }

    /// First auxiliary result of a multi-result op.
    #[inline]
    pub fn aux(&self) -> VarIndex {
        self.res_start
    }

    /// Raw argument `j`.
    #[inline]
    pub fn arg(&self, j: usize) -> u32 {
        self.args[j]
    }

    /// Argument `j` interpreted as a slice index.
    #[inline]
    pub fn idx(&self, j: usize) -> usize {
        self.args[j] as usize
    }
}

#[derive(Clone, Copy, Debug)]
struct Cursor {
    op: usize,
    arg: usize,
    var: usize,
}

/// Double-ended iterator over the ops of a tape.
pub struct Iter<'a, F: Float> {
    tape: &'a Tape<F>,
    front: Cursor,
    back: Cursor,
}

impl<'a, F: Float> Iter<'a, F> {
    pub(crate) fn new(tape: &'a Tape<F>) -> Self {
        Iter {
            tape,
            front: Cursor {
                op: 0,
                arg: 0,
                var: 0,
            },
            back: Cursor {
                op: tape.ops.len(),
                arg: tape.args.len(),
                var: tape.num_var,
            },
        }
    }
}

impl<'a, F: Float> Iterator for Iter<'a, F> {
    type Item = OpView<'a>;

    #[inline]
    fn next(&mut self) -> Option<OpView<'a>> {
        if self.front.op == self.back.op {
            return None;
        }
        let code = self.tape.ops[self.front.op];
        let n_arg = arg_count_forward(code, &self.tape.args[self.front.arg..]);
        let view = OpView {
            index: OpIndex::from_usize(self.front.op),
            code,
            args: &self.tape.args[self.front.arg..self.front.arg + n_arg],
            arg_start: ArgIndex::from_usize(self.front.arg),
            res_start: VarIndex::from_usize(self.front.var),
        };
        self.front.op += 1;
        self.front.arg += n_arg;
        self.front.var += opcode::num_res(code);
        Some(view)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back.op - self.front.op;
        (n, Some(n))
    }
}

impl<'a, F: Float> DoubleEndedIterator for Iter<'a, F> {
    #[inline]
    fn next_back(&mut self) -> Option<OpView<'a>> {
        if self.front.op == self.back.op {
            return None;
        }
        self.back.op -= 1;
        let code = self.tape.ops[self.back.op];
        // Variable-arity ops store their total count in the trailing slot.
        let n_arg = match opcode::num_arg(code) {
            Some(n) => n,
            None => self.tape.args[self.back.arg - 1] as usize,
        };
        self.back.arg -= n_arg;
        self.back.var -= opcode::num_res(code);
        Some(OpView {
            index: OpIndex::from_usize(self.back.op),
            code,
            args: &self.tape.args[self.back.arg..self.back.arg + n_arg],
            arg_start: ArgIndex::from_usize(self.back.arg),
            res_start: VarIndex::from_usize(self.back.var),
        })
    }
}

impl<F: Float> ExactSizeIterator for Iter<'_, F> {}
impl<F: Float> FusedIterator for Iter<'_, F> {}

/// Per-op argument and result positions, plus the producing op of every
/// variable.
#[derive(Clone, Debug, Default)]
pub struct RandomAccess {
    arg_start: Vec<ArgIndex>,
    res_start: Vec<VarIndex>,
    var_op: Vec<OpIndex>,
}

impl RandomAccess {
    pub(crate) fn build<F: Float>(tape: &Tape<F>) -> Self {
        let mut arg_start = Vec::with_capacity(tape.num_op() + 1);
        let mut res_start = Vec::with_capacity(tape.num_op() + 1);
        let mut var_op = Vec::with_capacity(tape.num_var());
        for op in tape.iter() {
            arg_start.push(op.arg_start);
            res_start.push(op.res_start);
            for _ in 0..op.num_res() {
                var_op.push(op.index);
            }
        }
        arg_start.push(ArgIndex::from_usize(tape.num_arg()));
        res_start.push(VarIndex::from_usize(tape.num_var()));
        RandomAccess {
            arg_start,
            res_start,
            var_op,
        }
    }

    /// Op that produces variable `v`.
    #[inline]
    pub fn var_op(&self, v: VarIndex) -> OpIndex {
        self.var_op[v.get()]
    }

    #[inline]
    pub fn arg_start(&self, op: OpIndex) -> ArgIndex {
        self.arg_start[op.get()]
    }

    #[inline]
    pub fn res_start(&self, op: OpIndex) -> VarIndex {
        self.res_start[op.get()]
    }

    pub(crate) fn view<'a, F: Float>(&self, tape: &'a Tape<F>, op: OpIndex) -> OpView<'a> {
        let i = op.get();
        let a0 = self.arg_start[i].get();
        let a1 = self.arg_start[i + 1].get();
        OpView {
            index: op,
            code: tape.ops[i],
            args: &tape.args[a0..a1],
            arg_start: self.arg_start[i],
            res_start: self.res_start[i],
        }
    }
}
