//! Tagged value model: nil, boolean, integer, float, string, table.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::{ErrorKind, VmError, VmResult};
use crate::table::Table;

/// Type-class reported by `type_of`. `Function`, `Thread`, and `UserData`
/// are reserved for the out-of-scope closure/coroutine/host-data surfaces
/// and are never produced by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Nil,
    Boolean,
    Number,
    String,
    Table,
    Function,
    Thread,
    UserData,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Nil => "nil",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Table => "table",
            TypeTag::Function => "function",
            TypeTag::Thread => "thread",
            TypeTag::UserData => "userdata",
        }
    }
}

/// A shared, immutable byte string. Compared and hashed by content.
pub type LuaStr = Rc<[u8]>;

/// A shared, mutably-aliased table. Interior mutability since multiple
/// Values may reference the same table.
pub type TableRef = Rc<RefCell<Table>>;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(LuaStr),
    Table(TableRef),
}

impl Value {
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Value::String(Rc::from(bytes.into().into_boxed_slice()))
    }

    pub fn table(table: Table) -> Self {
        Value::Table(Rc::new(RefCell::new(table)))
    }

    pub fn type_of(&self) -> TypeTag {
        match self {
            Value::Nil => TypeTag::Nil,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Integer(_) | Value::Float(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Table(_) => TypeTag::Table,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    /// `false` and `nil` are falsey; everything else (including `0` and the
    /// empty string) is truthy.
    pub fn to_boolean(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Coerce to a float: numbers widen or narrow trivially, strings parse,
    /// everything else fails.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => parse_number_str(s).map(|v| v.as_float()),
            _ => None,
        }
    }

    /// Coerce to an integer: an integer is itself; a float succeeds only if
    /// it is exactly representable; a string is parsed (integer literal
    /// first, then float-with-exact-integer-value); anything else fails.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => float_to_integer_exact(*f),
            Value::String(s) => match parse_number_str(s)? {
                NumLit::Int(i) => Some(i),
                NumLit::Float(f) => float_to_integer_exact(f),
            },
            _ => None,
        }
    }

    /// Render as a string; numbers get their canonical decimal form,
    /// strings are themselves, everything else fails.
    pub fn to_display_string(&self) -> Option<Vec<u8>> {
        match self {
            Value::String(s) => Some(s.to_vec()),
            Value::Integer(i) => Some(i.to_string().into_bytes()),
            Value::Float(f) => Some(format_float(*f).into_bytes()),
            _ => None,
        }
    }

    /// Content/mathematical equality, matching the scripting language's `==`.
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => (*a as f64) == *b,
            (Value::String(a), Value::String(b)) => a.as_ref() == b.as_ref(),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `NaN` makes a float comparison unordered rather than invalid: any
    /// relational operator against it simply reports `false`, the way `x <
    /// y` does in C for a `NaN` operand, rather than halting the VM.
    pub fn less(&self, other: &Value) -> VmResult<bool> {
        self.order(other, "lt").map(|o| o == Some(Ordering::Less))
    }

    pub fn less_equal(&self, other: &Value) -> VmResult<bool> {
        self.order(other, "le").map(|o| matches!(o, Some(Ordering::Less | Ordering::Equal)))
    }

    fn order(&self, other: &Value, op: &'static str) -> VmResult<Option<Ordering>> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
            (Value::Float(a), Value::Float(b)) => Ok(a.partial_cmp(b)),
            (Value::Integer(a), Value::Float(b)) => Ok((*a as f64).partial_cmp(b)),
            (Value::Float(a), Value::Integer(b)) => Ok(a.partial_cmp(&(*b as f64))),
            (Value::String(a), Value::String(b)) => Ok(Some(a.as_ref().cmp(b.as_ref()))),
            _ => Err(VmError::from(ErrorKind::ArithmeticKindError { op })),
        }
    }

    /// Hash under the same rule as table-key equality: integer and
    /// float values that represent the same number hash identically.
    /// Returns `None` for NaN, which cannot be hashed or used as a key.
    pub fn try_hash(&self) -> Option<u64> {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        match self {
            Value::Nil => 0u8.hash(&mut hasher),
            Value::Boolean(b) => {
                1u8.hash(&mut hasher);
                b.hash(&mut hasher);
            }
            Value::Integer(i) => {
                2u8.hash(&mut hasher);
                i.hash(&mut hasher);
            }
            Value::Float(f) => {
                if f.is_nan() {
                    return None;
                }
                if let Some(i) = float_to_integer_exact(*f) {
                    2u8.hash(&mut hasher);
                    i.hash(&mut hasher);
                } else {
                    3u8.hash(&mut hasher);
                    f.to_bits().hash(&mut hasher);
                }
            }
            Value::String(s) => {
                4u8.hash(&mut hasher);
                s.as_ref().hash(&mut hasher);
            }
            Value::Table(t) => {
                5u8.hash(&mut hasher);
                (Rc::as_ptr(t) as usize).hash(&mut hasher);
            }
        }
        Some(hasher.finish())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::String(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            Value::Table(t) => write!(f, "table: {:p}", Rc::as_ptr(t)),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_infinite() {
        return if f > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if f.is_nan() {
        return "nan".into();
    }
    if f == f.trunc() && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// An integer value is only exactly representable as `i64` if it is
/// integral and within range; this mirrors the reference loss-free
/// float-to-integer coercion used throughout arithmetic and table keys.
pub fn float_to_integer_exact(f: f64) -> Option<i64> {
    if !f.is_finite() || f.trunc() != f {
        return None;
    }
    if f < -(2f64.powi(63)) || f >= 2f64.powi(63) {
        return None;
    }
    Some(f as i64)
}

enum NumLit {
    Int(i64),
    Float(f64),
}

impl NumLit {
    fn as_float(&self) -> f64 {
        match self {
            NumLit::Int(i) => *i as f64,
            NumLit::Float(f) => *f,
        }
    }
}

/// Parse a byte string the way numeric coercion does: optional whitespace,
/// an optional sign, then a hexadecimal (`0x`/`0X`) or decimal integer, or a
/// decimal float; trailing whitespace tolerated, anything else rejected.
fn parse_number_str(bytes: &[u8]) -> Option<NumLit> {
    let s = std::str::from_utf8(bytes).ok()?.trim();
    if s.is_empty() {
        return None;
    }
    let (sign, rest) = match s.strip_prefix('-') {
        Some(r) => (-1i64, r),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };
    if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(|v| NumLit::Int(sign * v));
    }
    if let Ok(i) = rest.parse::<i64>() {
        return Some(NumLit::Int(sign * i));
    }
    rest.parse::<f64>().ok().map(|f| NumLit::Float(sign as f64 * f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsiness_matches_only_nil_and_false() {
        assert!(!Value::Nil.to_boolean());
        assert!(!Value::Boolean(false).to_boolean());
        assert!(Value::Boolean(true).to_boolean());
        assert!(Value::Integer(0).to_boolean());
        assert!(Value::string("").to_boolean());
    }

    #[test]
    fn integer_float_cross_shape_equality() {
        assert!(Value::Integer(3).equal(&Value::Float(3.0)));
        assert!(!Value::Integer(3).equal(&Value::Float(3.5)));
    }

    #[test]
    fn to_integer_round_trips_via_string() {
        let v = Value::string("42");
        assert_eq!(v.to_integer(), Some(42));
        let v = Value::string("-7");
        assert_eq!(v.to_integer(), Some(-7));
    }

    #[test]
    fn float_exactly_integral_converts() {
        assert_eq!(Value::Float(3.0).to_integer(), Some(3));
        assert_eq!(Value::Float(3.5).to_integer(), None);
    }

    #[test]
    fn tables_compare_by_identity() {
        let t1 = Value::table(Table::new(0, 0));
        let t2 = Value::table(Table::new(0, 0));
        assert!(!t1.equal(&t2));
        assert!(t1.equal(&t1.clone()));
    }

    #[test]
    fn nan_makes_relational_operators_false_not_fatal() {
        let nan = Value::Float(f64::NAN);
        let one = Value::Integer(1);
        assert!(!nan.less(&one).unwrap());
        assert!(!one.less(&nan).unwrap());
        assert!(!nan.less_equal(&one).unwrap());
        assert!(!nan.less_equal(&nan).unwrap());
    }
}
