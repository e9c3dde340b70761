//! Arithmetic, logical, and aggregate handlers: `ADD`..`SHR`, `UNM`/`BNOT`,
//! `NOT`, `LEN`, `CONCAT`.

use crate::arith::{BinOp, UnOp};
use crate::error::VmResult;
use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::state::State;
use crate::value::Value;

use super::dispatch::read_rk_value;
use super::Control;

fn bin_op_for(opcode: Opcode) -> BinOp {
    match opcode {
        Opcode::Add => BinOp::Add,
        Opcode::Sub => BinOp::Sub,
        Opcode::Mul => BinOp::Mul,
        Opcode::Mod => BinOp::Mod,
        Opcode::Pow => BinOp::Pow,
        Opcode::Div => BinOp::Div,
        Opcode::IDiv => BinOp::IDiv,
        Opcode::BAnd => BinOp::BAnd,
        Opcode::BOr => BinOp::BOr,
        Opcode::BXor => BinOp::BXor,
        Opcode::Shl => BinOp::Shl,
        Opcode::Shr => BinOp::Shr,
        other => unreachable!("{other:?} is not a binary arithmetic opcode"),
    }
}

pub(super) fn binary_arith(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let lhs = read_rk_value(state, b)?;
    let rhs = read_rk_value(state, c)?;
    let result = crate::arith::binary(bin_op_for(ins.opcode()), &lhs, &rhs)?;
    state.set_register(a, result)?;
    Ok(Control::Continue)
}

pub(super) fn unary_arith(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, _c) = ins.abc();
    let v = state.get_register(b)?;
    let op = if ins.opcode() == Opcode::Unm { UnOp::Unm } else { UnOp::BNot };
    let result = crate::arith::unary(op, &v)?;
    state.set_register(a, result)?;
    Ok(Control::Continue)
}

pub(super) fn not(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, _c) = ins.abc();
    let v = state.get_register(b)?;
    state.set_register(a, Value::Boolean(!v.to_boolean()))?;
    Ok(Control::Continue)
}

pub(super) fn len(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, _c) = ins.abc();
    let v = state.get_register(b)?;
    let length = match &v {
        Value::String(s) => s.len() as i64,
        Value::Table(t) => t.borrow().len(),
        _ => return Err(crate::error::ErrorKind::LengthOperatorKindError.into()),
    };
    state.set_register(a, Value::Integer(length))?;
    Ok(Control::Continue)
}

/// `CONCAT`: fold `R(B)..=R(C)` into a single string written to `R(A)`.
/// Each source register is coerced to its string form in place, same as
/// `luaV_concat` — `R(B)..=R(C)` hold strings afterward, not just `R(A)`.
pub(super) fn concat(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let mut parts = Vec::with_capacity((c - b + 1) as usize);
    for r in b..=c {
        let bytes = state
            .to_string_x(r as i64 + 1)?
            .ok_or(crate::error::ErrorKind::ConcatKindError)?;
        parts.push(bytes);
    }
    let joined: Vec<u8> = parts.concat();
    state.set_register(a, Value::string(joined))?;
    Ok(Control::Continue)
}
