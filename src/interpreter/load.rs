//! `MOVE`/`LOAD*` handlers: register-to-register and constant-to-register
//! data movement.

use crate::error::{ErrorKind, VmError, VmResult};
use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::state::State;
use crate::value::Value;

use super::Control;

pub(super) fn move_(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, _c) = ins.abc();
    let v = state.get_register(b)?;
    state.set_register(a, v)?;
    Ok(Control::Continue)
}

pub(super) fn loadk(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, bx) = ins.abx();
    let k = state
        .proto()
        .constants
        .get(bx as usize)
        .cloned()
        .ok_or_else(|| VmError::from(ErrorKind::InvalidIndex { index: bx as i64 }))?;
    state.set_register(a, k)?;
    Ok(Control::Continue)
}

/// `LOADKX` reads its actual constant index from the `Ax` field of the
/// following `EXTRAARG` instruction.
pub(super) fn loadkx(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, _bx) = ins.abx();
    let extra = state.fetch()?;
    if extra.opcode() != Opcode::ExtraArg {
        return Err(VmError::at(
            ErrorKind::ChunkCorrupted {
                reason: "LOADKX not followed by EXTRAARG".into(),
            },
            state.pc(),
        ));
    }
    let idx = extra.ax() as usize;
    let k = state
        .proto()
        .constants
        .get(idx)
        .cloned()
        .ok_or_else(|| VmError::from(ErrorKind::InvalidIndex { index: idx as i64 }))?;
    state.set_register(a, k)?;
    Ok(Control::Continue)
}

pub(super) fn loadbool(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    state.set_register(a, Value::Boolean(b != 0))?;
    if c != 0 {
        state.add_pc(1);
    }
    Ok(Control::Continue)
}

pub(super) fn loadnil(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, _c) = ins.abc();
    for r in a..=(a + b) {
        state.set_register(r, Value::Nil)?;
    }
    Ok(Control::Continue)
}
