//! `State`: a Stack plus the currently-executing Prototype and program
//! counter, exposing the full public VM operation surface.

use std::rc::Rc;

use crate::arith::{self, BinOp, UnOp};
use crate::config::VmLimits;
use crate::consts::DEFAULT_STACK_MARGIN;
use crate::error::{ErrorKind, VmError, VmResult};
use crate::instruction::{Instruction, Rk};
use crate::prototype::Prototype;
use crate::stack::Stack;
use crate::table::Table;
use crate::value::{TypeTag, Value};

pub struct State {
    stack: Stack,
    proto: Rc<Prototype>,
    pc: usize,
}

impl State {
    pub fn new(proto: Rc<Prototype>) -> Self {
        Self::with_margin(proto, DEFAULT_STACK_MARGIN)
    }

    /// Construct a `State` sized per `limits.stack_margin`.
    pub fn with_limits(proto: Rc<Prototype>, limits: &VmLimits) -> Self {
        Self::with_margin(proto, limits.stack_margin)
    }

    pub fn with_margin(proto: Rc<Prototype>, margin: usize) -> Self {
        let capacity = proto.max_stack_size as usize + margin;
        let mut stack = Stack::new(capacity);
        stack.set_top(proto.max_stack_size as i64).expect("fresh stack has room");
        Self { stack, proto, pc: 0 }
    }

    pub fn proto(&self) -> &Rc<Prototype> {
        &self.proto
    }

    /* navigation */

    pub fn get_top(&self) -> i64 {
        self.stack.top() as i64
    }

    pub fn abs_index(&self, index: i64) -> VmResult<i64> {
        self.stack.abs_index(index)
    }

    pub fn check_stack(&self, n: usize) -> VmResult<()> {
        self.stack.check(n)
    }

    pub fn pop(&mut self, n: usize) -> VmResult<()> {
        for _ in 0..n {
            self.stack.pop()?;
        }
        Ok(())
    }

    pub fn copy(&mut self, from: i64, to: i64) -> VmResult<()> {
        let v = self.stack.get(from)?;
        self.stack.set(to, v)
    }

    pub fn push_value(&mut self, index: i64) -> VmResult<()> {
        let v = self.stack.get(index)?;
        self.stack.push(v)
    }

    /// Pop the top value and write it into slot `index`.
    pub fn replace(&mut self, index: i64) -> VmResult<()> {
        let v = self.stack.pop()?;
        self.stack.set(index, v)
    }

    /// Move the top value into position `index`, shifting the elements
    /// originally at `[index, top)` up by one.
    pub fn insert(&mut self, index: i64) -> VmResult<()> {
        self.rotate(index, 1)
    }

    /// Remove the value at `index`, shifting everything above it down.
    pub fn remove(&mut self, index: i64) -> VmResult<()> {
        self.rotate(index, -1)?;
        self.stack.pop()?;
        Ok(())
    }

    /// Rotate the slice `[index, top]` by `n` (positive moves toward the
    /// top), via three reversals.
    pub fn rotate(&mut self, index: i64, n: i64) -> VmResult<()> {
        let abs = self.stack.abs_index(index)?;
        let p = (abs - 1) as usize;
        let t = self.stack.top() - 1;
        if p > t {
            return Err(VmError::from(ErrorKind::InvalidIndex { index }));
        }
        let span = (t - p + 1) as i64;
        let n = ((n % span) + span) % span;
        if n == 0 {
            return Ok(());
        }
        let m = t - n as usize;
        self.stack.reverse(p, m);
        self.stack.reverse(m + 1, t);
        self.stack.reverse(p, t);
        Ok(())
    }

    pub fn set_top(&mut self, index: i64) -> VmResult<()> {
        let abs = self.stack.abs_index(index)?;
        self.stack.set_top(abs)
    }

    /* pushers */

    pub fn push_nil(&mut self) -> VmResult<()> {
        self.stack.push(Value::Nil)
    }

    pub fn push_boolean(&mut self, b: bool) -> VmResult<()> {
        self.stack.push(Value::Boolean(b))
    }

    pub fn push_integer(&mut self, i: i64) -> VmResult<()> {
        self.stack.push(Value::Integer(i))
    }

    pub fn push_number(&mut self, f: f64) -> VmResult<()> {
        self.stack.push(Value::Float(f))
    }

    pub fn push_string(&mut self, s: impl Into<Vec<u8>>) -> VmResult<()> {
        self.stack.push(Value::string(s))
    }

    /* type queries */

    pub fn type_of(&self, index: i64) -> VmResult<TypeTag> {
        Ok(self.stack.get(index)?.type_of())
    }

    pub fn type_name(tag: TypeTag) -> &'static str {
        tag.name()
    }

    pub fn is_nil(&self, index: i64) -> VmResult<bool> {
        Ok(self.stack.get(index)?.is_nil())
    }

    pub fn is_boolean(&self, index: i64) -> VmResult<bool> {
        Ok(self.stack.get(index)?.is_boolean())
    }

    pub fn is_number(&self, index: i64) -> VmResult<bool> {
        Ok(self.stack.get(index)?.is_number())
    }

    pub fn is_string(&self, index: i64) -> VmResult<bool> {
        Ok(self.stack.get(index)?.is_string())
    }

    pub fn is_table(&self, index: i64) -> VmResult<bool> {
        Ok(self.stack.get(index)?.is_table())
    }

    /* converters */

    pub fn to_boolean(&self, index: i64) -> VmResult<bool> {
        Ok(self.stack.get(index)?.to_boolean())
    }

    pub fn to_number_x(&self, index: i64) -> VmResult<Option<f64>> {
        Ok(self.stack.get(index)?.to_number())
    }

    pub fn to_number(&self, index: i64) -> VmResult<f64> {
        self.to_number_x(index)?
            .ok_or_else(|| VmError::from(ErrorKind::ArithmeticKindError { op: "to_number" }))
    }

    pub fn to_integer_x(&self, index: i64) -> VmResult<Option<i64>> {
        Ok(self.stack.get(index)?.to_integer())
    }

    pub fn to_integer(&self, index: i64) -> VmResult<i64> {
        self.to_integer_x(index)?
            .ok_or_else(|| VmError::from(ErrorKind::ArithmeticKindError { op: "to_integer" }))
    }

    /// Convert slot `index` to its canonical string form, mutating the slot
    /// in place on success (mirrors the loader's in-place numeric coercion).
    pub fn to_string_x(&mut self, index: i64) -> VmResult<Option<Vec<u8>>> {
        let v = self.stack.get(index)?;
        match v.to_display_string() {
            Some(bytes) => {
                if !v.is_string() {
                    self.stack.set(index, Value::string(bytes.clone()))?;
                }
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    pub fn to_string(&mut self, index: i64) -> VmResult<Vec<u8>> {
        self.to_string_x(index)?
            .ok_or_else(|| VmError::from(ErrorKind::ArithmeticKindError { op: "to_string" }))
    }

    /* arithmetic */

    pub fn arith_binary(&mut self, op: BinOp) -> VmResult<()> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let r = arith::binary(op, &a, &b)?;
        self.stack.push(r)
    }

    pub fn arith_unary(&mut self, op: UnOp) -> VmResult<()> {
        let a = self.stack.pop()?;
        let r = arith::unary(op, &a)?;
        self.stack.push(r)
    }

    /* comparison */

    pub fn compare_eq(&self, i: i64, j: i64) -> VmResult<bool> {
        Ok(self.stack.get(i)?.equal(&self.stack.get(j)?))
    }

    pub fn compare_lt(&self, i: i64, j: i64) -> VmResult<bool> {
        self.stack.get(i)?.less(&self.stack.get(j)?)
    }

    pub fn compare_le(&self, i: i64, j: i64) -> VmResult<bool> {
        self.stack.get(i)?.less_equal(&self.stack.get(j)?)
    }

    /* aggregates */

    pub fn len(&mut self, index: i64) -> VmResult<()> {
        let v = self.stack.get(index)?;
        let len = match &v {
            Value::String(s) => s.len() as i64,
            Value::Table(t) => t.borrow().len(),
            _ => return Err(VmError::from(ErrorKind::LengthOperatorKindError)),
        };
        self.stack.push(Value::Integer(len))
    }

    /// Fold the top `n` values (left-to-right as pushed) into a single
    /// string, right-associatively, replacing them on the stack.
    pub fn concat(&mut self, n: usize) -> VmResult<()> {
        if n == 0 {
            return self.stack.push(Value::string(Vec::new()));
        }
        let mut parts = Vec::with_capacity(n);
        for _ in 0..n {
            let v = self.stack.pop()?;
            let bytes = v
                .to_display_string()
                .ok_or_else(|| VmError::from(ErrorKind::ConcatKindError))?;
            parts.push(bytes);
        }
        parts.reverse();
        let joined: Vec<u8> = parts.concat();
        self.stack.push(Value::string(joined))
    }

    /* tables */

    pub fn create_table(&mut self, narr: usize, nhash: usize) -> VmResult<()> {
        self.stack.push(Value::table(Table::new(narr, nhash)))
    }

    pub fn new_table(&mut self) -> VmResult<()> {
        self.create_table(0, 0)
    }

    fn table_at(&self, index: i64) -> VmResult<Value> {
        let v = self.stack.get(index)?;
        if v.is_table() {
            Ok(v)
        } else {
            Err(VmError::from(ErrorKind::NotATable))
        }
    }

    pub fn get_field(&mut self, index: i64, key: Value) -> VmResult<()> {
        let t = self.table_at(index)?;
        let value = match &t {
            Value::Table(t) => t.borrow().get(&key),
            _ => unreachable!(),
        };
        self.stack.push(value)
    }

    pub fn get_i(&mut self, index: i64, n: i64) -> VmResult<()> {
        self.get_field(index, Value::Integer(n))
    }

    /// Pop a key off the top and push `t[key]`.
    pub fn get_table(&mut self, index: i64) -> VmResult<()> {
        let key = self.stack.pop()?;
        self.get_field(index, key)
    }

    pub fn set_field(&mut self, index: i64, key: Value) -> VmResult<()> {
        let t = self.table_at(index)?;
        let value = self.stack.pop()?;
        match &t {
            Value::Table(t) => t.borrow_mut().put(key, value),
            _ => unreachable!(),
        }
    }

    pub fn set_i(&mut self, index: i64, n: i64) -> VmResult<()> {
        self.set_field(index, Value::Integer(n))
    }

    /// Pop a key and a value off the top (value first) and write `t[key] = value`.
    pub fn set_table(&mut self, index: i64) -> VmResult<()> {
        let value = self.stack.pop()?;
        let key = self.stack.pop()?;
        let t = self.table_at(index)?;
        match &t {
            Value::Table(t) => t.borrow_mut().put(key, value),
            _ => unreachable!(),
        }
    }

    /* constants / RK */

    pub fn get_const(&mut self, idx: usize) -> VmResult<()> {
        let v = self
            .proto
            .constants
            .get(idx)
            .cloned()
            .ok_or_else(|| VmError::from(ErrorKind::InvalidIndex { index: idx as i64 }))?;
        self.stack.push(v)
    }

    /// Push the value an RK operand names: a register read (1-based) or a
    /// constant-pool read.
    pub fn push_rk(&mut self, rk: Rk) -> VmResult<()> {
        match rk {
            Rk::Register(r) => self.push_value(r as i64 + 1),
            Rk::Constant(k) => self.get_const(k as usize),
        }
    }

    pub fn read_rk(&self, rk: Rk) -> VmResult<Value> {
        match rk {
            Rk::Register(r) => self.stack.get(r as i64 + 1),
            Rk::Constant(k) => self
                .proto
                .constants
                .get(k as usize)
                .cloned()
                .ok_or_else(|| VmError::from(ErrorKind::InvalidIndex { index: k as i64 })),
        }
    }

    pub fn get_register(&self, reg: u32) -> VmResult<Value> {
        self.stack.get(reg as i64 + 1)
    }

    pub fn set_register(&mut self, reg: u32, v: Value) -> VmResult<()> {
        self.stack.set(reg as i64 + 1, v)
    }

    /* execution control */

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn add_pc(&mut self, delta: i32) {
        self.pc = (self.pc as i64 + delta as i64) as usize;
    }

    /// Fetch the instruction at the current PC and advance.
    pub fn fetch(&mut self) -> VmResult<Instruction> {
        let word = self
            .proto
            .code
            .get(self.pc)
            .copied()
            .ok_or_else(|| VmError::at(ErrorKind::InvalidIndex { index: self.pc as i64 }, self.pc))?;
        self.pc += 1;
        Instruction::decode(word).map_err(|e| VmError::at(e.kind, self.pc - 1))
    }
}
