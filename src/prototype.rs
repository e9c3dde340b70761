//! Immutable function descriptor produced by the chunk reader.

use std::rc::Rc;

use crate::value::{LuaStr, Value};

/// Upvalue descriptor: whether it captures an enclosing stack slot or an
/// enclosing upvalue, and which index.
#[derive(Debug, Clone, Copy)]
pub struct UpvalDesc {
    pub in_stack: bool,
    pub index: u8,
}

/// A local-variable debug entry: name plus the PC range it is live over.
#[derive(Debug, Clone)]
pub struct LocVar {
    pub name: LuaStr,
    pub start_pc: u32,
    pub end_pc: u32,
}

/// An immutable function descriptor: code, constants, nested prototypes,
/// and debug info. Shared by reference; never mutated after the chunk
/// reader constructs it.
#[derive(Debug, Clone)]
pub struct Prototype {
    pub source: LuaStr,
    pub line_defined: u32,
    pub last_line_defined: u32,
    pub num_params: u8,
    pub is_vararg: bool,
    pub max_stack_size: u8,
    pub code: Vec<u32>,
    pub constants: Vec<Value>,
    pub upvalues: Vec<UpvalDesc>,
    pub protos: Vec<Rc<Prototype>>,
    pub line_info: Vec<u32>,
    pub loc_vars: Vec<LocVar>,
    pub upvalue_names: Vec<LuaStr>,
}
