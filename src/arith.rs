//! Arithmetic dispatch: two small tables (integer implementation, float
//! implementation), keyed by operator, deciding which applies per operand
//! kind.

use crate::error::{ErrorKind, VmError, VmResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Mod,
    Pow,
    Div,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Unm,
    BNot,
}

impl BinOp {
    fn name(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Mod => "mod",
            BinOp::Pow => "pow",
            BinOp::Div => "div",
            BinOp::IDiv => "idiv",
            BinOp::BAnd => "band",
            BinOp::BOr => "bor",
            BinOp::BXor => "bxor",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
        }
    }
}

type IntFn = fn(i64, i64) -> VmResult<i64>;
type FloatFn = fn(f64, f64) -> VmResult<f64>;

struct OpImpl {
    int_impl: Option<IntFn>,
    float_impl: Option<FloatFn>,
}

fn op_impl(op: BinOp) -> OpImpl {
    match op {
        BinOp::Add => OpImpl {
            int_impl: Some(|a, b| Ok(a.wrapping_add(b))),
            float_impl: Some(|a, b| Ok(a + b)),
        },
        BinOp::Sub => OpImpl {
            int_impl: Some(|a, b| Ok(a.wrapping_sub(b))),
            float_impl: Some(|a, b| Ok(a - b)),
        },
        BinOp::Mul => OpImpl {
            int_impl: Some(|a, b| Ok(a.wrapping_mul(b))),
            float_impl: Some(|a, b| Ok(a * b)),
        },
        BinOp::Mod => OpImpl {
            int_impl: Some(imod),
            float_impl: Some(fmod),
        },
        BinOp::Pow => OpImpl {
            int_impl: None,
            float_impl: Some(|a, b| Ok(a.powf(b))),
        },
        BinOp::Div => OpImpl {
            int_impl: None,
            float_impl: Some(|a, b| Ok(a / b)),
        },
        BinOp::IDiv => OpImpl {
            int_impl: Some(ifloor_div),
            float_impl: Some(|a, b| Ok((a / b).floor())),
        },
        BinOp::BAnd => OpImpl {
            int_impl: Some(|a, b| Ok(a & b)),
            float_impl: None,
        },
        BinOp::BOr => OpImpl {
            int_impl: Some(|a, b| Ok(a | b)),
            float_impl: None,
        },
        BinOp::BXor => OpImpl {
            int_impl: Some(|a, b| Ok(a ^ b)),
            float_impl: None,
        },
        BinOp::Shl => OpImpl {
            int_impl: Some(|a, b| Ok(shl(a, b))),
            float_impl: None,
        },
        BinOp::Shr => OpImpl {
            int_impl: Some(|a, b| Ok(shl(a, b.wrapping_neg()))),
            float_impl: None,
        },
    }
}

fn ifloor_div(a: i64, b: i64) -> VmResult<i64> {
    if b == 0 {
        return Err(VmError::from(ErrorKind::DivideByZero));
    }
    let q = a.wrapping_div(b);
    let r = a.wrapping_rem(b);
    Ok(if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q })
}

fn imod(a: i64, b: i64) -> VmResult<i64> {
    if b == 0 {
        return Err(VmError::from(ErrorKind::DivideByZero));
    }
    let r = a.wrapping_rem(b);
    Ok(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
}

fn fmod(a: f64, b: f64) -> VmResult<f64> {
    if b.is_infinite() {
        return Ok(if a.is_sign_positive() == b.is_sign_positive() { a } else { b });
    }
    Ok(a - (a / b).floor() * b)
}

/// Shift `a` left by `b` bits; a negative `b` shifts right instead. Shifts
/// of 64 or more bits in either direction yield zero.
fn shl(a: i64, b: i64) -> i64 {
    if b <= -64 || b >= 64 {
        0
    } else if b >= 0 {
        ((a as u64) << b) as i64
    } else {
        ((a as u64) >> (-b)) as i64
    }
}

fn coerce_floats(op: BinOp, a: &Value, b: &Value) -> VmResult<(f64, f64)> {
    let kind = || VmError::from(ErrorKind::ArithmeticKindError { op: op.name() });
    Ok((a.to_number().ok_or_else(kind)?, b.to_number().ok_or_else(kind)?))
}

pub fn binary(op: BinOp, a: &Value, b: &Value) -> VmResult<Value> {
    let imp = op_impl(op);
    match (imp.int_impl, imp.float_impl) {
        (Some(ifn), Some(ffn)) => {
            if let (Value::Integer(x), Value::Integer(y)) = (a, b) {
                return ifn(*x, *y).map(Value::Integer);
            }
            let (x, y) = coerce_floats(op, a, b)?;
            ffn(x, y).map(Value::Float)
        }
        (Some(ifn), None) => {
            let kind = || VmError::from(ErrorKind::ArithmeticKindError { op: op.name() });
            let x = a.to_integer().ok_or_else(kind)?;
            let y = b.to_integer().ok_or_else(kind)?;
            ifn(x, y).map(Value::Integer)
        }
        (None, Some(ffn)) => {
            let (x, y) = coerce_floats(op, a, b)?;
            ffn(x, y).map(Value::Float)
        }
        (None, None) => unreachable!("every operator has at least one implementation"),
    }
}

pub fn unary(op: UnOp, a: &Value) -> VmResult<Value> {
    match (op, a) {
        (UnOp::Unm, Value::Integer(i)) => Ok(Value::Integer(i.wrapping_neg())),
        (UnOp::Unm, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOp::Unm, _) => a
            .to_number()
            .map(|f| Value::Float(-f))
            .ok_or_else(|| VmError::from(ErrorKind::ArithmeticKindError { op: "unm" })),
        (UnOp::BNot, _) => a
            .to_integer()
            .map(|i| Value::Integer(!i))
            .ok_or_else(|| VmError::from(ErrorKind::ArithmeticKindError { op: "bnot" })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_add_stays_integer() {
        let r = binary(BinOp::Add, &Value::Integer(1), &Value::Integer(2)).unwrap();
        assert!(matches!(r, Value::Integer(3)));
    }

    #[test]
    fn mixed_add_promotes_to_float() {
        let r = binary(BinOp::Add, &Value::Integer(1), &Value::Float(2.5)).unwrap();
        assert!(matches!(r, Value::Float(f) if f == 3.5));
    }

    #[test]
    fn integer_floor_division_rounds_toward_negative_infinity() {
        let r = binary(BinOp::IDiv, &Value::Integer(-7), &Value::Integer(2)).unwrap();
        assert!(matches!(r, Value::Integer(-4)));
    }

    #[test]
    fn integer_mod_matches_floor_semantics() {
        let r = binary(BinOp::Mod, &Value::Integer(-7), &Value::Integer(2)).unwrap();
        assert!(matches!(r, Value::Integer(1)));
    }

    #[test]
    fn division_by_zero_is_fatal_for_integers() {
        assert!(binary(BinOp::IDiv, &Value::Integer(1), &Value::Integer(0)).is_err());
    }

    #[test]
    fn div_and_pow_always_yield_float() {
        let r = binary(BinOp::Div, &Value::Integer(4), &Value::Integer(2)).unwrap();
        assert!(matches!(r, Value::Float(f) if f == 2.0));
    }

    #[test]
    fn bitwise_requires_integer_coercible_operands() {
        assert!(binary(BinOp::BAnd, &Value::Float(1.5), &Value::Integer(1)).is_err());
        let r = binary(BinOp::BAnd, &Value::Integer(0b110), &Value::Integer(0b011)).unwrap();
        assert!(matches!(r, Value::Integer(0b010)));
    }

    #[test]
    fn shift_by_64_or_more_yields_zero() {
        let r = binary(BinOp::Shl, &Value::Integer(1), &Value::Integer(64)).unwrap();
        assert!(matches!(r, Value::Integer(0)));
    }
}
