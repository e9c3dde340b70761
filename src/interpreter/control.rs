//! Control-flow handlers: jumps, comparisons, tests, and the numeric `for`
//! loop pair.

use crate::error::{ErrorKind, VmError, VmResult};
use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::state::State;
use crate::value::Value;

use super::dispatch::read_rk_value;
use super::Control;

pub(super) fn jmp(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, sbx) = ins.asbx();
    if a != 0 {
        // Closing open upvalues at a given register is part of the
        // closure/upvalue surface this core does not implement.
        return Err(VmError::from(ErrorKind::UnimplementedOpcode { opcode: Opcode::Jmp }));
    }
    state.add_pc(sbx);
    Ok(Control::Continue)
}

/// Shared shape for `EQ`/`LT`/`LE`: if the comparison disagrees with the
/// sense carried in `A`, skip the instruction that is assumed to follow
/// (always an unconditional `JMP`).
fn skip_unless(state: &mut State, a: u32, matched: bool) -> VmResult<Control> {
    if matched != (a != 0) {
        state.add_pc(1);
    }
    Ok(Control::Continue)
}

pub(super) fn eq(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let lhs = read_rk_value(state, b)?;
    let rhs = read_rk_value(state, c)?;
    skip_unless(state, a, lhs.equal(&rhs))
}

pub(super) fn lt(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let lhs = read_rk_value(state, b)?;
    let rhs = read_rk_value(state, c)?;
    let matched = lhs.less(&rhs)?;
    skip_unless(state, a, matched)
}

pub(super) fn le(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let lhs = read_rk_value(state, b)?;
    let rhs = read_rk_value(state, c)?;
    let matched = lhs.less_equal(&rhs)?;
    skip_unless(state, a, matched)
}

pub(super) fn test(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, _b, c) = ins.abc();
    let v = state.get_register(a)?;
    if v.to_boolean() != (c != 0) {
        state.add_pc(1);
    }
    Ok(Control::Continue)
}

pub(super) fn test_set(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let v = state.get_register(b)?;
    if v.to_boolean() == (c != 0) {
        state.set_register(a, v)?;
    } else {
        state.add_pc(1);
    }
    Ok(Control::Continue)
}

fn for_numbers(state: &State, a: u32) -> VmResult<(Value, Value, Value)> {
    let init = state.get_register(a)?;
    let limit = state.get_register(a + 1)?;
    let step = state.get_register(a + 2)?;
    Ok((init, limit, step))
}

fn coerce_for_number(v: Value) -> VmResult<Value> {
    if v.is_number() {
        return Ok(v);
    }
    match v.to_number() {
        Some(f) => Ok(Value::Float(f)),
        None => Err(VmError::from(ErrorKind::ArithmeticKindError { op: "for" })),
    }
}

pub(super) fn for_prep(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, sbx) = ins.asbx();
    let (init, limit, step) = for_numbers(state, a)?;
    let init = coerce_for_number(init)?;
    let limit = coerce_for_number(limit)?;
    let step = coerce_for_number(step)?;

    let initial = crate::arith::binary(crate::arith::BinOp::Sub, &init, &step)?;
    state.set_register(a, initial)?;
    state.set_register(a + 1, limit)?;
    state.set_register(a + 2, step)?;
    state.add_pc(sbx);
    Ok(Control::Continue)
}

pub(super) fn for_loop(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, sbx) = ins.asbx();
    let (index, limit, step) = for_numbers(state, a)?;
    let next = crate::arith::binary(crate::arith::BinOp::Add, &index, &step)?;

    let forward = match &step {
        Value::Integer(i) => *i >= 0,
        Value::Float(f) => *f >= 0.0,
        _ => unreachable!("for-loop operands are always numbers after FORPREP"),
    };
    let continues = if forward {
        next.less_equal(&limit)?
    } else {
        limit.less_equal(&next)?
    };

    if continues {
        state.set_register(a, next.clone())?;
        state.set_register(a + 3, next)?;
        state.add_pc(sbx);
    }
    Ok(Control::Continue)
}
