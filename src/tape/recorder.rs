//! Append-only tape builder.

use std::sync::Arc;

use crate::error::{ensure_internal, internal_error, AdError, Result};
use crate::extension::{AtomicFunction, Registry};
use crate::float::Float;
use crate::index::{AtomicId, DiscreteId, OpIndex, Operand, ParIndex, VarIndex, VecAdId};
use crate::opcode::{self, CompareOp, OpCode, FLAG_FALSE, FLAG_LEFT, FLAG_RIGHT, FLAG_TRUE};

use super::args::{for_each_arg, ArgKind, CSkipLayout, CSumLayout};
use super::dynamic::{DynOp, DynStep};
use super::{Tape, VecAdInfo};

/// Binary operator selector for [`Recorder::binary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Absolute-zero multiply: `0 * y == 0` for every `y`.
    Zmul,
    Pow,
}

impl BinaryOp {
    fn dyn_op(self) -> DynOp {
        match self {
            BinaryOp::Add => DynOp::Add,
            BinaryOp::Sub => DynOp::Sub,
            BinaryOp::Mul => DynOp::Mul,
            BinaryOp::Div => DynOp::Div,
            BinaryOp::Zmul => DynOp::Zmul,
            BinaryOp::Pow => DynOp::Pow,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenCall {
    header: [u32; 4],
    args_left: usize,
    res_left: usize,
}

/// Builds a tape one operation at a time.
///
/// The recorder checks every appended op against the invariants of the
/// tape (arity, argument ranges, acyclicity, call bracket structure) and
/// aborts through [`internal_error`] when one is broken: those are bugs in
/// the front end, not conditions a caller can recover from.
pub struct Recorder<F: Float> {
    ops: Vec<OpCode>,
    args: Vec<u32>,
    params: Vec<F>,
    is_dynamic: Vec<bool>,
    dynamic: Vec<DynStep>,
    num_var: usize,
    num_ind: Option<usize>,
    vec_ad: Vec<VecAdInfo>,
    vec_ad_init: Vec<ParIndex>,
    num_load: usize,
    texts: Vec<String>,
    registry: Registry<F>,
    open_call: Option<OpenCall>,
}

impl<F: Float> Recorder<F> {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Start a recording that may call the plug-ins and discrete functions
    /// in `registry`.
    pub fn with_registry(registry: Registry<F>) -> Self {
        Recorder {
            ops: vec![OpCode::Begin],
            args: vec![ParIndex::PHANTOM.0],
            params: vec![F::nan()],
            is_dynamic: vec![false],
            dynamic: Vec::new(),
            num_var: 1,
            num_ind: None,
            vec_ad: Vec::new(),
            vec_ad_init: Vec::new(),
            num_load: 0,
            texts: Vec::new(),
            registry,
            open_call: None,
        }
    }

    pub fn registry(&self) -> &Registry<F> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry<F> {
        &mut self.registry
    }

    /// Register a plug-in with this recording's registry.
    pub fn register_atomic(&mut self, f: Arc<dyn AtomicFunction<F>>) -> AtomicId {
        self.registry.register_atomic(f)
    }

    /// Number of ops recorded so far; the next op gets this index.
    #[inline]
    pub fn num_op(&self) -> usize {
        self.ops.len()
    }

    /// Number of variables allocated so far.
    #[inline]
    pub fn num_var(&self) -> usize {
        self.num_var
    }

    /// Recorded value of a parameter.
    #[inline]
    pub fn parameter(&self, p: ParIndex) -> F {
        self.params[p.get()]
    }

    /// Declare the `n` independent variables. They become variables
    /// `1..=n`. Must precede every other variable-producing op.
    pub fn independent(&mut self, n: usize) -> Vec<VarIndex> {
        let position = self.ops.len();
        ensure_internal!(
            self.num_ind.is_none() && position == 1,
            OpCode::Inv,
            position,
            "independent variables must be declared once, before any other op"
        );
        self.num_ind = Some(n);
        (0..n)
            .map(|_| {
                self.ops.push(OpCode::Inv);
                let v = VarIndex::from_usize(self.num_var);
                self.num_var += 1;
                v
            })
            .collect()
    }

    /// Add a constant to the parameter pool.
    pub fn append_constant(&mut self, value: F) -> ParIndex {
        let p = ParIndex::from_usize(self.params.len());
        self.params.push(value);
        self.is_dynamic.push(false);
        p
    }

    /// Declare an independent dynamic parameter with its recording value.
    pub fn new_dynamic(&mut self, value: F) -> ParIndex {
        let p = self.append_constant(value);
        self.is_dynamic[p.get()] = true;
        self.dynamic.push(DynStep {
            result: p,
            op: DynOp::Independent,
            args: [ParIndex::PHANTOM; 2],
        });
        p
    }

    /// Record a dynamic parameter computed from other parameters.
    pub fn dynamic_op(&mut self, op: DynOp, operands: &[ParIndex]) -> ParIndex {
        let position = self.ops.len();
        if op == DynOp::Independent || op.arity() != operands.len() {
            internal_error(
                format_args!("{op:?}"),
                position,
                &format!("dynamic op takes {} operands, got {}", op.arity(), operands.len()),
            );
        }
        for p in operands {
            ensure_internal!(
                p.get() < self.params.len(),
                format_args!("{op:?}"),
                position,
                "parameter {p} out of range"
            );
        }
        let a = operands.first().copied().unwrap_or(ParIndex::PHANTOM);
        let b = operands.get(1).copied().unwrap_or(ParIndex::PHANTOM);
        let value = op.eval(self.params[a.get()], self.params[b.get()]);
        let p = self.append_constant(value);
        self.is_dynamic[p.get()] = true;
        self.dynamic.push(DynStep {
            result: p,
            op,
            args: [a, b],
        });
        p
    }

    /// Declare a dynamically indexed array with initial element values.
    pub fn new_vec_ad(&mut self, init: &[ParIndex]) -> VecAdId {
        let position = self.ops.len();
        for p in init {
            ensure_internal!(
                p.get() < self.params.len(),
                OpCode::Ldp,
                position,
                "array initial value {p} out of range"
            );
        }
        let id = VecAdId::from_usize(self.vec_ad.len());
        self.vec_ad.push(VecAdInfo {
            offset: self.vec_ad_init.len() as u32,
            len: init.len() as u32,
        });
        self.vec_ad_init.extend_from_slice(init);
        id
    }

    /// Append one operation. Returns its primary result, or the sentinel
    /// for ops without results.
    pub fn append(&mut self, op: OpCode, args: &[u32]) -> VarIndex {
        let position = self.ops.len();
        ensure_internal!(
            !matches!(op, OpCode::Begin | OpCode::End | OpCode::Inv),
            op,
            position,
            "structural op cannot be appended"
        );
        ensure_internal!(
            self.num_ind.is_some(),
            op,
            position,
            "independent() must be called before recording operations"
        );
        self.check_arity(op, position, args);
        self.check_args(op, position, args);
        self.check_bracket(op, position, args);

        self.ops.push(op);
        self.args.extend_from_slice(args);
        if matches!(op, OpCode::Ldp | OpCode::Ldv) {
            self.num_load += 1;
        }
        let n_res = opcode::num_res(op);
        let first = self.num_var;
        self.num_var += n_res;
        if n_res == 0 {
            VarIndex::SENTINEL
        } else {
            VarIndex::from_usize(first + n_res - 1)
        }
    }

    fn check_arity(&self, op: OpCode, position: usize, args: &[u32]) {
        match opcode::num_arg(op) {
            Some(n) => ensure_internal!(
                args.len() == n,
                op,
                position,
                "expected {n} arguments, got {}",
                args.len()
            ),
            None => {
                let total = args.last().copied().unwrap_or(0) as usize;
                ensure_internal!(
                    total == args.len(),
                    op,
                    position,
                    "trailing count {total} does not match {} arguments",
                    args.len()
                );
                let consistent = match op {
                    OpCode::CSkip => {
                        args.len() > CSkipLayout::FIRST
                            && CSkipLayout::FIRST + args[4] as usize + args[5] as usize + 1
                                == args.len()
                    }
                    _ => {
                        args.len() > CSumLayout::FIRST
                            && CSumLayout::FIRST <= args[1] as usize
                            && args[1] <= args[2]
                            && args[2] <= args[3]
                            && args[3] <= args[4]
                            && args[4] as usize + 1 == args.len()
                    }
                };
                ensure_internal!(consistent, op, position, "inconsistent argument layout");
            }
        }
    }

    fn check_args(&self, op: OpCode, position: usize, args: &[u32]) {
        let num_var = self.num_var;
        let num_par = self.params.len();
        for_each_arg(op, args, |j, kind| match kind {
            ArgKind::Var => ensure_internal!(
                args[j] > 0 && (args[j] as usize) < num_var,
                op,
                position,
                "argument {j} refers to variable {} but only {num_var} exist",
                args[j]
            ),
            ArgKind::Par => ensure_internal!(
                (args[j] as usize) < num_par,
                op,
                position,
                "argument {j} refers to parameter {} but only {num_par} exist",
                args[j]
            ),
            ArgKind::Imm => {}
        });

        match op {
            OpCode::CExp | OpCode::CSkip => {
                ensure_internal!(
                    CompareOp::decode(args[0]).is_some(),
                    op,
                    position,
                    "invalid comparison code {}",
                    args[0]
                );
                let allowed = if op == OpCode::CExp {
                    FLAG_LEFT | FLAG_RIGHT | FLAG_TRUE | FLAG_FALSE
                } else {
                    FLAG_LEFT | FLAG_RIGHT
                };
                ensure_internal!(args[1] & !allowed == 0, op, position, "invalid flags {}", args[1]);
                if op == OpCode::CSkip {
                    let layout = CSkipLayout::of(args);
                    for &target in &args[layout.if_true.0..layout.if_false.1] {
                        ensure_internal!(
                            target as usize > position,
                            op,
                            position,
                            "skip target {target} is not after the skip"
                        );
                    }
                }
            }
            OpCode::Dis => ensure_internal!(
                (args[0] as usize) < self.registry.num_discrete(),
                op,
                position,
                "unknown discrete function {}",
                args[0]
            ),
            OpCode::Ldp | OpCode::Ldv | OpCode::Stpp | OpCode::Stpv | OpCode::Stvp | OpCode::Stvv => {
                ensure_internal!(
                    (args[0] as usize) < self.vec_ad.len(),
                    op,
                    position,
                    "unknown array {}",
                    args[0]
                );
                if matches!(op, OpCode::Ldp | OpCode::Ldv) {
                    ensure_internal!(
                        args[2] as usize == self.num_load,
                        op,
                        position,
                        "load id {} out of sequence",
                        args[2]
                    );
                }
            }
            OpCode::AFun => {
                ensure_internal!(
                    (args[0] as usize) < self.registry.num_atomic(),
                    op,
                    position,
                    "unknown plug-in {}",
                    args[0]
                );
                ensure_internal!(
                    args[2] > 0 && args[3] > 0,
                    op,
                    position,
                    "call bracket with {} arguments and {} results",
                    args[2],
                    args[3]
                );
            }
            OpCode::Pri => ensure_internal!(
                (args[2] as usize) < self.texts.len() && (args[4] as usize) < self.texts.len(),
                op,
                position,
                "unknown text"
            ),
            _ => {}
        }
    }

    fn check_bracket(&mut self, op: OpCode, position: usize, args: &[u32]) {
        match (op, self.open_call.as_mut()) {
            (OpCode::AFun, None) => {
                self.open_call = Some(OpenCall {
                    header: [args[0], args[1], args[2], args[3]],
                    args_left: args[2] as usize,
                    res_left: args[3] as usize,
                });
            }
            (OpCode::AFun, Some(call)) => {
                ensure_internal!(
                    call.args_left == 0 && call.res_left == 0 && call.header == args[..4],
                    op,
                    position,
                    "call bracket closed early or with a different header"
                );
                self.open_call = None;
            }
            (OpCode::FunAP | OpCode::FunAV, Some(call)) if call.args_left > 0 => {
                call.args_left -= 1;
            }
            (OpCode::FunRP | OpCode::FunRV, Some(call))
                if call.args_left == 0 && call.res_left > 0 =>
            {
                call.res_left -= 1;
            }
            (_, call) => ensure_internal!(
                call.is_none() && !opcode::is_call_bracket(op),
                op,
                position,
                "op out of place with respect to a call bracket"
            ),
        }
    }

    // ── Typed helpers ──

    /// Variable equal to a parameter.
    pub fn par(&mut self, p: ParIndex) -> VarIndex {
        self.append(OpCode::Par, &[p.0])
    }

    /// Unary operator applied to a variable.
    pub fn unary(&mut self, op: OpCode, x: VarIndex) -> VarIndex {
        ensure_internal!(opcode::is_unary(op), op, self.ops.len(), "not a unary op");
        self.append(op, &[x.0])
    }

    /// Binary operator; picks the `PV`/`VP`/`VV` code from the operand kinds.
    ///
    /// Two parameters fold into a new parameter (dynamic when either operand
    /// is dynamic) and a `Par` op.
    pub fn binary(&mut self, op: BinaryOp, left: Operand, right: Operand) -> VarIndex {
        use OpCode::*;
        use Operand::{Par as P, Var as V};

        let (code, args) = match (op, left, right) {
            (_, P(a), P(b)) => {
                let p = self.fold_binary(op, a, b);
                return self.par(p);
            }
            (BinaryOp::Add, V(x), V(y)) => (AddVV, [x.0, y.0]),
            (BinaryOp::Add, P(p), V(y)) | (BinaryOp::Add, V(y), P(p)) => (AddPV, [p.0, y.0]),
            (BinaryOp::Sub, V(x), V(y)) => (SubVV, [x.0, y.0]),
            (BinaryOp::Sub, P(p), V(y)) => (SubPV, [p.0, y.0]),
            (BinaryOp::Sub, V(x), P(p)) => (SubVP, [x.0, p.0]),
            (BinaryOp::Mul, V(x), V(y)) => (MulVV, [x.0, y.0]),
            (BinaryOp::Mul, P(p), V(y)) | (BinaryOp::Mul, V(y), P(p)) => (MulPV, [p.0, y.0]),
            (BinaryOp::Div, V(x), V(y)) => (DivVV, [x.0, y.0]),
            (BinaryOp::Div, P(p), V(y)) => (DivPV, [p.0, y.0]),
            (BinaryOp::Div, V(x), P(p)) => (DivVP, [x.0, p.0]),
            (BinaryOp::Zmul, V(x), V(y)) => (ZmulVV, [x.0, y.0]),
            (BinaryOp::Zmul, P(p), V(y)) => (ZmulPV, [p.0, y.0]),
            (BinaryOp::Zmul, V(x), P(p)) => (ZmulVP, [x.0, p.0]),
            (BinaryOp::Pow, V(x), V(y)) => (PowVV, [x.0, y.0]),
            (BinaryOp::Pow, P(p), V(y)) => (PowPV, [p.0, y.0]),
            (BinaryOp::Pow, V(x), P(p)) => (PowVP, [x.0, p.0]),
        };
        self.append(code, &args)
    }

    fn fold_binary(&mut self, op: BinaryOp, a: ParIndex, b: ParIndex) -> ParIndex {
        if self.is_dynamic[a.get()] || self.is_dynamic[b.get()] {
            self.dynamic_op(op.dyn_op(), &[a, b])
        } else {
            let value = op.dyn_op().eval(self.params[a.get()], self.params[b.get()]);
            self.append_constant(value)
        }
    }

    /// Record that `left rel right` held when the function was recorded.
    ///
    /// `Gt`/`Ge` are stored as `Lt`/`Le` with swapped operands; a relation
    /// between two parameters records nothing.
    pub fn compare(&mut self, rel: CompareOp, left: Operand, right: Operand) {
        use OpCode::*;
        use Operand::{Par as P, Var as V};

        let (rel, left, right) = match rel {
            CompareOp::Gt => (CompareOp::Lt, right, left),
            CompareOp::Ge => (CompareOp::Le, right, left),
            _ => (rel, left, right),
        };
        let (code, args) = match (rel, left, right) {
            (_, P(_), P(_)) => return,
            (CompareOp::Eq, V(x), V(y)) => (EqVV, [x.0, y.0]),
            (CompareOp::Eq, P(p), V(y)) | (CompareOp::Eq, V(y), P(p)) => (EqPV, [p.0, y.0]),
            (CompareOp::Ne, V(x), V(y)) => (NeVV, [x.0, y.0]),
            (CompareOp::Ne, P(p), V(y)) | (CompareOp::Ne, V(y), P(p)) => (NePV, [p.0, y.0]),
            (CompareOp::Lt, V(x), V(y)) => (LtVV, [x.0, y.0]),
            (CompareOp::Lt, P(p), V(y)) => (LtPV, [p.0, y.0]),
            (CompareOp::Lt, V(x), P(p)) => (LtVP, [x.0, p.0]),
            (CompareOp::Le, V(x), V(y)) => (LeVV, [x.0, y.0]),
            (CompareOp::Le, P(p), V(y)) => (LePV, [p.0, y.0]),
            (CompareOp::Le, V(x), P(p)) => (LeVP, [x.0, p.0]),
            (CompareOp::Gt | CompareOp::Ge, _, _) => unreachable!("rewritten above"),
        };
        self.append(code, &args);
    }

    /// `if left cop right { if_true } else { if_false }`, decided afresh at
    /// every order-0 sweep.
    pub fn cond_exp(
        &mut self,
        cop: CompareOp,
        left: Operand,
        right: Operand,
        if_true: Operand,
        if_false: Operand,
    ) -> VarIndex {
        let mut flags = 0;
        for (operand, bit) in [
            (left, FLAG_LEFT),
            (right, FLAG_RIGHT),
            (if_true, FLAG_TRUE),
            (if_false, FLAG_FALSE),
        ] {
            if operand.is_var() {
                flags |= bit;
            }
        }
        self.append(
            OpCode::CExp,
            &[
                cop.encode(),
                flags,
                left.raw(),
                right.raw(),
                if_true.raw(),
                if_false.raw(),
            ],
        )
    }

    /// Skip `skip_if_true` when `left cop right` holds at order 0, and
    /// `skip_if_false` otherwise. Targets must come after this op.
    pub fn cond_skip(
        &mut self,
        cop: CompareOp,
        left: Operand,
        right: Operand,
        skip_if_true: &[OpIndex],
        skip_if_false: &[OpIndex],
    ) {
        let mut flags = 0;
        if left.is_var() {
            flags |= FLAG_LEFT;
        }
        if right.is_var() {
            flags |= FLAG_RIGHT;
        }
        let mut args = Vec::with_capacity(CSkipLayout::FIRST + skip_if_true.len() + skip_if_false.len() + 1);
        args.extend_from_slice(&[
            cop.encode(),
            flags,
            left.raw(),
            right.raw(),
            skip_if_true.len() as u32,
            skip_if_false.len() as u32,
        ]);
        args.extend(skip_if_true.iter().map(|op| op.0));
        args.extend(skip_if_false.iter().map(|op| op.0));
        args.push(args.len() as u32 + 1);
        self.append(OpCode::CSkip, &args);
    }

    /// `init + Σ add - Σ sub + Σ dyn_add - Σ dyn_sub` as a single op.
    pub fn cum_sum(
        &mut self,
        init: ParIndex,
        add: &[VarIndex],
        sub: &[VarIndex],
        dyn_add: &[ParIndex],
        dyn_sub: &[ParIndex],
    ) -> VarIndex {
        let e0 = CSumLayout::FIRST + add.len();
        let e1 = e0 + sub.len();
        let e2 = e1 + dyn_add.len();
        let e3 = e2 + dyn_sub.len();
        let mut args = Vec::with_capacity(e3 + 1);
        args.extend_from_slice(&[init.0, e0 as u32, e1 as u32, e2 as u32, e3 as u32]);
        args.extend(add.iter().map(|v| v.0));
        args.extend(sub.iter().map(|v| v.0));
        args.extend(dyn_add.iter().map(|p| p.0));
        args.extend(dyn_sub.iter().map(|p| p.0));
        args.push(e3 as u32 + 1);
        self.append(OpCode::CSum, &args)
    }

    /// Discrete function applied to a variable.
    pub fn discrete(&mut self, id: DiscreteId, x: VarIndex) -> VarIndex {
        self.append(OpCode::Dis, &[id.0, x.0])
    }

    /// Print `before value after` during order-0 sweeps in which `pos <= 0`.
    pub fn print(&mut self, pos: Operand, before: &str, value: Operand, after: &str) {
        let mut flags = 0;
        if pos.is_var() {
            flags |= opcode::PRI_POS_VAR;
        }
        if value.is_var() {
            flags |= opcode::PRI_VALUE_VAR;
        }
        let t0 = self.add_text(before);
        let t1 = self.add_text(after);
        self.append(OpCode::Pri, &[flags, pos.raw(), t0, value.raw(), t1]);
    }

    fn add_text(&mut self, text: &str) -> u32 {
        self.texts.push(text.to_owned());
        (self.texts.len() - 1) as u32
    }

    /// Load `array[index]`.
    pub fn load(&mut self, array: VecAdId, index: Operand) -> VarIndex {
        let code = if index.is_var() { OpCode::Ldv } else { OpCode::Ldp };
        let load_id = self.num_load as u32;
        self.append(code, &[array.0, index.raw(), load_id])
    }

    /// Store `value` into `array[index]`.
    pub fn store(&mut self, array: VecAdId, index: Operand, value: Operand) {
        let code = match (index.is_var(), value.is_var()) {
            (false, false) => OpCode::Stpp,
            (false, true) => OpCode::Stpv,
            (true, false) => OpCode::Stvp,
            (true, true) => OpCode::Stvv,
        };
        self.append(code, &[array.0, index.raw(), value.raw()]);
    }

    /// Record a plug-in call with `m` variable results.
    pub fn call_atomic(
        &mut self,
        id: AtomicId,
        call_id: u32,
        args: &[Operand],
        m: usize,
    ) -> Result<Vec<VarIndex>> {
        let n = args.len();
        if n == 0 || m == 0 {
            return Err(AdError::EmptyAtomicCall { n, m });
        }
        let plugin = self
            .registry
            .atomic(id)
            .ok_or(AdError::UnknownAtomic(id.0))?;
        if let Some(expected) = plugin.num_results(call_id, n) {
            if expected != m {
                return Err(AdError::AtomicResult {
                    name: plugin.name().to_owned(),
                    phase: "num_results",
                    expected,
                    got: m,
                });
            }
        }

        let header = [id.0, call_id, n as u32, m as u32];
        self.append(OpCode::AFun, &header);
        for &x in args {
            match x {
                Operand::Var(v) => self.append(OpCode::FunAV, &[v.0]),
                Operand::Par(p) => self.append(OpCode::FunAP, &[p.0]),
            };
        }
        let results = (0..m).map(|_| self.append(OpCode::FunRV, &[])).collect();
        self.append(OpCode::AFun, &header);
        Ok(results)
    }

    /// Freeze the recording. `dependents` become the function's outputs.
    pub fn finalize(mut self, dependents: &[VarIndex]) -> Tape<F> {
        let position = self.ops.len();
        ensure_internal!(
            self.open_call.is_none(),
            OpCode::End,
            position,
            "call bracket left open"
        );
        for (i, d) in dependents.iter().enumerate() {
            ensure_internal!(
                d.get() > 0 && d.get() < self.num_var,
                OpCode::End,
                position,
                "dependent {i} is {d}, outside 1..{}",
                self.num_var
            );
        }
        self.ops.push(OpCode::End);
        let num_op = self.ops.len();

        // Skip targets were only known to be later ops; now they must exist.
        let tape = Tape {
            ops: self.ops,
            args: self.args,
            params: self.params,
            is_dynamic: self.is_dynamic,
            dynamic: self.dynamic,
            num_var: self.num_var,
            num_ind: self.num_ind.unwrap_or(0),
            dependents: dependents.to_vec(),
            vec_ad: self.vec_ad,
            vec_ad_init: self.vec_ad_init,
            num_load: self.num_load,
            texts: self.texts,
            registry: self.registry,
        };
        for op in tape.iter().filter(|op| op.code == OpCode::CSkip) {
            let layout = CSkipLayout::of(op.args);
            for &target in &op.args[layout.if_true.0..layout.if_false.1] {
                ensure_internal!(
                    (target as usize) < num_op,
                    op.code,
                    op.index.get(),
                    "skip target {target} beyond end of tape"
                );
            }
        }
        log::debug!(
            "finalized tape: {} ops, {} variables, {} parameters",
            tape.num_op(),
            tape.num_var(),
            tape.num_par()
        );
        tape
    }
}

impl<F: Float> Default for Recorder<F> {
    fn default() -> Self {
        Self::new()
    }
}
