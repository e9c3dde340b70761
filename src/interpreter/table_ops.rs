//! Table instruction handlers: `NEWTABLE`, `GETTABLE`, `SETTABLE`, `SETLIST`.

use crate::consts::FIELDS_PER_FLUSH;
use crate::error::VmResult;
use crate::instruction::Instruction;
use crate::state::State;
use crate::table::Table;
use crate::value::Value;

use super::dispatch::read_rk_value;
use super::Control;

/// Decode a `NEWTABLE` size hint: a 9-bit "floating byte" where values below
/// 8 are exact and larger values encode `mantissa * 2^exponent`.
fn fb2int(x: u32) -> usize {
    if x < 8 {
        x as usize
    } else {
        (((x & 7) + 8) << ((x >> 3) - 1)) as usize
    }
}

pub(super) fn new_table(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let table = Table::new(fb2int(b), fb2int(c));
    state.set_register(a, Value::table(table))?;
    Ok(Control::Continue)
}

pub(super) fn get_table(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let t = state.get_register(b)?;
    let key = read_rk_value(state, c)?;
    let value = match &t {
        Value::Table(t) => t.borrow().get(&key),
        _ => return Err(crate::error::ErrorKind::NotATable.into()),
    };
    state.set_register(a, value)?;
    Ok(Control::Continue)
}

pub(super) fn set_table(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let t = state.get_register(a)?;
    let key = read_rk_value(state, b)?;
    let value = read_rk_value(state, c)?;
    match &t {
        Value::Table(t) => t.borrow_mut().put(key, value)?,
        _ => return Err(crate::error::ErrorKind::NotATable.into()),
    }
    Ok(Control::Continue)
}

/// `SETLIST`: assign `R(A+1)..R(A+B)` into `R(A)` at indices starting from
/// `(C-1)*FIELDS_PER_FLUSH + 1`; `C == 0` means the real batch number is
/// carried by a following `EXTRAARG`.
pub(super) fn set_list(state: &mut State, ins: Instruction) -> VmResult<Control> {
    let (a, b, c) = ins.abc();
    let c = if c == 0 {
        let extra = state.fetch()?;
        extra.ax()
    } else {
        c
    };
    let base = (c - 1) * FIELDS_PER_FLUSH;
    let t = state.get_register(a)?;
    for j in 1..=b {
        let v = state.get_register(a + j)?;
        match &t {
            Value::Table(t) => t.borrow_mut().put(Value::Integer((base + j) as i64), v)?,
            _ => return Err(crate::error::ErrorKind::NotATable.into()),
        }
    }
    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fb2int_is_exact_below_eight() {
        for x in 0..8 {
            assert_eq!(fb2int(x), x as usize);
        }
    }

    #[test]
    fn fb2int_scales_above_eight() {
        // x=8 => (0+8)<<0 = 8; x=9 => (1+8)<<0 = 9; x=16 => (0+8)<<1 = 16
        assert_eq!(fb2int(8), 8);
        assert_eq!(fb2int(9), 9);
        assert_eq!(fb2int(16), 16);
    }
}
