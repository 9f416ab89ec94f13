//! Serialization of tapes.
//!
//! Plug-ins and discrete functions are code, so a tape whose registry holds
//! any of them cannot be serialized. Everything else round-trips: op codes,
//! arguments, the parameter pool with its dynamic recipe, arrays and print
//! texts. Constants are written as plain numbers, so formats without NaN
//! or infinity (JSON) only round-trip finite constants.
//!
//! Deserialization re-checks the structural invariants the recorder would
//! have enforced, so a corrupted document becomes an error instead of a
//! panic inside a sweep.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AdError;
use crate::extension::Registry;
use crate::float::Float;
use crate::index::{ParIndex, VarIndex};
use crate::opcode::{self, CompareOp, OpCode};
use crate::tape::{for_each_arg, ArgKind, CSkipLayout, CSumLayout, DynOp, DynStep, Tape, VecAdInfo};

impl<F: Float + Serialize> Serialize for Tape<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.registry.num_atomic() > 0 || self.registry.num_discrete() > 0 {
            return Err(serde::ser::Error::custom(
                "cannot serialize a tape whose registry holds plug-ins or discrete functions; \
                 they must be re-registered and the tape re-recorded",
            ));
        }
        let mut s = serializer.serialize_struct("Tape", 12)?;
        s.serialize_field("ops", &self.ops)?;
        s.serialize_field("args", &self.args)?;
        // the NaN placeholder is implied
        s.serialize_field("params", &self.params[1..])?;
        s.serialize_field("is_dynamic", &self.is_dynamic)?;
        s.serialize_field("dynamic", &self.dynamic)?;
        s.serialize_field("num_var", &self.num_var)?;
        s.serialize_field("num_ind", &self.num_ind)?;
        s.serialize_field("dependents", &self.dependents)?;
        s.serialize_field("vec_ad", &self.vec_ad)?;
        s.serialize_field("vec_ad_init", &self.vec_ad_init)?;
        s.serialize_field("num_load", &self.num_load)?;
        s.serialize_field("texts", &self.texts)?;
        s.end()
    }
}

impl<'de, F: Float + Deserialize<'de>> Deserialize<'de> for Tape<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct TapeData<F> {
            ops: Vec<OpCode>,
            args: Vec<u32>,
            params: Vec<F>,
            is_dynamic: Vec<bool>,
            #[serde(default)]
            dynamic: Vec<DynStep>,
            num_var: usize,
            num_ind: usize,
            dependents: Vec<VarIndex>,
            #[serde(default)]
            vec_ad: Vec<VecAdInfo>,
            #[serde(default)]
            vec_ad_init: Vec<ParIndex>,
            #[serde(default)]
            num_load: usize,
            #[serde(default)]
            texts: Vec<String>,
        }

        let data = TapeData::<F>::deserialize(deserializer)?;
        let mut params = Vec::with_capacity(data.params.len() + 1);
        params.push(F::nan());
        params.extend(data.params);
        let tape = Tape {
            ops: data.ops,
            args: data.args,
            params,
            is_dynamic: data.is_dynamic,
            dynamic: data.dynamic,
            num_var: data.num_var,
            num_ind: data.num_ind,
            dependents: data.dependents,
            vec_ad: data.vec_ad,
            vec_ad_init: data.vec_ad_init,
            num_load: data.num_load,
            texts: data.texts,
            registry: Registry::new(),
        };
        tape.check_structure().map_err(serde::de::Error::custom)?;
        Ok(tape)
    }
}

fn malformed<T>(message: String) -> Result<T, AdError> {
    Err(AdError::Malformed(message))
}

impl<F: Float> Tape<F> {
    /// Structural invariants of a tape that did not come from a recorder.
    fn check_structure(&self) -> Result<(), AdError> {
        let num_op = self.ops.len();
        let num_par = self.params.len();
        if num_op < self.num_ind + 2
            || self.ops[0] != OpCode::Begin
            || self.ops[num_op - 1] != OpCode::End
            || self.ops[1..=self.num_ind].iter().any(|&c| c != OpCode::Inv)
        {
            return malformed(format!(
                "expected Begin, {} independents, ..., End",
                self.num_ind
            ));
        }
        if num_par == 0 || self.is_dynamic.len() != num_par {
            return malformed(format!(
                "{} parameters but {} dynamic flags",
                num_par,
                self.is_dynamic.len()
            ));
        }

        let mut arg = 0;
        let mut var = 0;
        let mut loads = 0;
        for (i, &code) in self.ops.iter().enumerate() {
            let structural = match code {
                OpCode::Begin => i == 0,
                OpCode::Inv => (1..=self.num_ind).contains(&i),
                OpCode::End => i == num_op - 1,
                _ => i > self.num_ind && i < num_op - 1,
            };
            if !structural {
                return malformed(format!("{code} out of place at op {i}"));
            }
            if code == OpCode::Dis || opcode::is_call_bracket(code) {
                return malformed(format!(
                    "op {i} ({code}) needs a registry entry, which is never serialized"
                ));
            }

            let rest = &self.args[arg.min(self.args.len())..];
            let n = match opcode::num_arg(code) {
                Some(n) => n,
                None => {
                    let header = if code == OpCode::CSkip {
                        CSkipLayout::FIRST
                    } else {
                        CSumLayout::FIRST
                    };
                    if rest.len() < header {
                        return malformed(format!("op {i} ({code}) has a truncated header"));
                    }
                    if code == OpCode::CSkip {
                        CSkipLayout::FIRST + rest[4] as usize + rest[5] as usize + 1
                    } else {
                        rest[4] as usize + 1
                    }
                }
            };
            if rest.len() < n {
                return malformed(format!("op {i} ({code}) runs past the argument array"));
            }
            let a = &rest[..n];
            if opcode::is_variable_arity(code) {
                let consistent = a[n - 1] as usize == n
                    && (code == OpCode::CSkip
                        || (CSumLayout::FIRST <= a[1] as usize && a[1] <= a[2] && a[2] <= a[3] && a[3] <= a[4]));
                if !consistent {
                    return malformed(format!("op {i} ({code}) has an inconsistent layout"));
                }
            }

            let mut bad = None;
            for_each_arg(code, a, |j, kind| {
                let ok = match kind {
                    ArgKind::Var => a[j] > 0 && (a[j] as usize) < var,
                    ArgKind::Par => (a[j] as usize) < num_par,
                    ArgKind::Imm => true,
                };
                if !ok && bad.is_none() {
                    bad = Some(j);
                }
            });
            if let Some(j) = bad {
                return malformed(format!("op {i} ({code}) argument {j} is out of range"));
            }

            let ok = match code {
                OpCode::CExp | OpCode::CSkip => {
                    CompareOp::decode(a[0]).is_some()
                        && (code == OpCode::CExp || {
                            let layout = CSkipLayout::of(a);
                            a[layout.if_true.0..layout.if_false.1]
                                .iter()
                                .all(|&t| (t as usize) > i && (t as usize) < num_op)
                        })
                }
                OpCode::Ldp | OpCode::Ldv => {
                    loads += 1;
                    (a[0] as usize) < self.vec_ad.len() && a[2] as usize == loads - 1
                }
                OpCode::Stpp | OpCode::Stpv | OpCode::Stvp | OpCode::Stvv => (a[0] as usize) < self.vec_ad.len(),
                OpCode::Pri => (a[2] as usize) < self.texts.len() && (a[4] as usize) < self.texts.len(),
                _ => true,
            };
            if !ok {
                return malformed(format!("op {i} ({code}) has invalid immediates"));
            }
            arg += n;
            var += opcode::num_res(code);
        }

        if arg != self.args.len() || var != self.num_var || loads != self.num_load {
            return malformed(format!(
                "counts disagree: {arg} args, {var} vars, {loads} loads walked; \
                 header says {}, {}, {}",
                self.args.len(),
                self.num_var,
                self.num_load
            ));
        }
        if let Some(d) = self.dependents.iter().find(|d| d.get() == 0 || d.get() >= var) {
            return malformed(format!("dependent {d} out of range"));
        }
        for info in &self.vec_ad {
            if (info.offset as usize + info.len as usize) > self.vec_ad_init.len() {
                return malformed(format!("array at {} overruns the element space", info.offset));
            }
        }
        if let Some(p) = self.vec_ad_init.iter().find(|p| p.get() >= num_par) {
            return malformed(format!("array initial value {p} out of range"));
        }
        for step in &self.dynamic {
            let args_ok = step.args[..step.op.arity()].iter().all(|p| p.get() < num_par);
            let result_ok = step.result.get() < num_par && self.is_dynamic[step.result.get()];
            if !args_ok || !result_ok || (step.op != DynOp::Independent && step.op.arity() == 0) {
                return malformed(format!("dynamic recipe step for {} is invalid", step.result));
            }
        }
        Ok(())
    }
}
