//! Fetch-decode-execute core: the big match over [`Opcode`] that the VM
//! loop drives once per instruction.

use crate::error::{ErrorKind, VmError, VmResult};
use crate::instruction::{Instruction, Rk};
use crate::opcode::Opcode;
use crate::state::State;
use crate::value::Value;

use super::{control, load, misc, table_ops, Control};

fn rk(field: u32) -> Rk {
    Rk::decode(field)
}

/// Execute one instruction against `state`. Returns `Control::Halt` only for
/// opcodes this core treats as terminal outside of `RETURN` itself (none,
/// currently — `RETURN` is handled by the caller before reaching here).
pub(super) fn step(state: &mut State, ins: Instruction) -> VmResult<Control> {
    match ins.opcode() {
        Opcode::Move => load::move_(state, ins),
        Opcode::LoadK => load::loadk(state, ins),
        Opcode::LoadKx => load::loadkx(state, ins),
        Opcode::LoadBool => load::loadbool(state, ins),
        Opcode::LoadNil => load::loadnil(state, ins),

        Opcode::GetTable => table_ops::get_table(state, ins),
        Opcode::SetTable => table_ops::set_table(state, ins),
        Opcode::NewTable => table_ops::new_table(state, ins),
        Opcode::SetList => table_ops::set_list(state, ins),

        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Mod
        | Opcode::Pow
        | Opcode::Div
        | Opcode::IDiv
        | Opcode::BAnd
        | Opcode::BOr
        | Opcode::BXor
        | Opcode::Shl
        | Opcode::Shr => misc::binary_arith(state, ins),

        Opcode::Unm | Opcode::BNot => misc::unary_arith(state, ins),
        Opcode::Not => misc::not(state, ins),
        Opcode::Len => misc::len(state, ins),
        Opcode::Concat => misc::concat(state, ins),

        Opcode::Jmp => control::jmp(state, ins),
        Opcode::Eq => control::eq(state, ins),
        Opcode::Lt => control::lt(state, ins),
        Opcode::Le => control::le(state, ins),
        Opcode::Test => control::test(state, ins),
        Opcode::TestSet => control::test_set(state, ins),
        Opcode::ForPrep => control::for_prep(state, ins),
        Opcode::ForLoop => control::for_loop(state, ins),

        Opcode::ExtraArg => Ok(Control::Continue),

        other => Err(VmError::from(ErrorKind::UnimplementedOpcode { opcode: other })),
    }
}

pub(super) fn read_rk_value(state: &State, field: u32) -> VmResult<Value> {
    state.read_rk(rk(field))
}
