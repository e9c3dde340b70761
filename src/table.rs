//! Hybrid array-part + hash-part table, the sole aggregate type.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::{ErrorKind, VmError, VmResult};
use crate::value::{float_to_integer_exact, Value};

/// A `Value` used as a hash-part key. `PartialEq`/`Hash` follow the same
/// cross-shape-numeric rule as `Value::equal`/`Value::try_hash`; the
/// invariant that no NaN key is ever inserted (enforced by `Table::put`)
/// is what makes `Eq` sound here despite wrapping a `Value`.
#[derive(Debug, Clone)]
struct TableKey(Value);

impl PartialEq for TableKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.equal(&other.0)
    }
}

impl Eq for TableKey {}

impl Hash for TableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let h = self.0.try_hash().expect("NaN keys are rejected by Table::put");
        h.hash(state);
    }
}

/// Hybrid array-part / hash-part container.
#[derive(Debug, Default)]
pub struct Table {
    /// Logical keys `1..=array.len()`.
    array: Vec<Value>,
    hash: HashMap<TableKey, Value>,
}

/// If `v` is an integer, or a float with no fractional part, return it as an
/// `i64`; used to decide whether a key belongs in the array part.
fn as_integer_key(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => Some(*i),
        Value::Float(f) => float_to_integer_exact(*f),
        _ => None,
    }
}

impl Table {
    pub fn new(narr: usize, nhash: usize) -> Self {
        Self {
            array: Vec::with_capacity(narr),
            hash: HashMap::with_capacity(nhash),
        }
    }

    /// Current array-part length; this is what the `#` operator reports.
    pub fn len(&self) -> i64 {
        self.array.len() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.hash.is_empty()
    }

    pub fn get(&self, key: &Value) -> Value {
        if let Some(i) = as_integer_key(key) {
            if i >= 1 && (i as usize) <= self.array.len() {
                return self.array[(i - 1) as usize].clone();
            }
        }
        match key.try_hash() {
            Some(_) => self.hash.get(&TableKey(key.clone())).cloned().unwrap_or(Value::Nil),
            None => Value::Nil,
        }
    }

    pub fn put(&mut self, key: Value, value: Value) -> VmResult<()> {
        if key.is_nil() {
            return Err(VmError::from(ErrorKind::TableKeyInvalid));
        }
        if matches!(&key, Value::Float(f) if f.is_nan()) {
            return Err(VmError::from(ErrorKind::TableKeyInvalid));
        }

        let arr_len = self.array.len() as i64;
        if let Some(i) = as_integer_key(&key) {
            if i >= 1 && i <= arr_len {
                let slot = (i - 1) as usize;
                self.array[slot] = value;
                if i == arr_len && self.array[slot].is_nil() {
                    self.trim();
                }
                return Ok(());
            }
            if i == arr_len + 1 {
                self.hash.remove(&TableKey(Value::Integer(i)));
                if !value.is_nil() {
                    self.array.push(value);
                    self.expand();
                }
                return Ok(());
            }
        }

        if value.is_nil() {
            self.hash.remove(&TableKey(key));
        } else {
            self.hash.insert(TableKey(key), value);
        }
        Ok(())
    }

    /// Drop trailing `nil`s from the array part after a delete-at-tail.
    fn trim(&mut self) {
        while matches!(self.array.last(), Some(Value::Nil)) {
            self.array.pop();
        }
    }

    /// After an append grows the array part, migrate any now-contiguous
    /// keys out of the hash part.
    fn expand(&mut self) {
        loop {
            let next = self.array.len() as i64 + 1;
            match self.hash.remove(&TableKey(Value::Integer(next))) {
                Some(v) if !v.is_nil() => self.array.push(v),
                Some(_) => break,
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let mut t = Table::new(0, 0);
        t.put(Value::string("k"), Value::Integer(7)).unwrap();
        assert!(matches!(t.get(&Value::string("k")), Value::Integer(7)));
    }

    #[test]
    fn delete_nulls_out_a_key() {
        let mut t = Table::new(0, 0);
        t.put(Value::string("k"), Value::Integer(7)).unwrap();
        t.put(Value::string("k"), Value::Nil).unwrap();
        assert!(t.get(&Value::string("k")).is_nil());
    }

    #[test]
    fn sequence_length_matches_array_part() {
        let mut t = Table::new(0, 0);
        for i in 1..=3 {
            t.put(Value::Integer(i), Value::Integer(i * 10)).unwrap();
        }
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn trim_law_on_delete_at_tail() {
        let mut t = Table::new(0, 0);
        for i in 1..=5 {
            t.put(Value::Integer(i), Value::Integer(i)).unwrap();
        }
        t.put(Value::Integer(4), Value::Nil).unwrap();
        t.put(Value::Integer(5), Value::Nil).unwrap();
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn expand_law_migrates_contiguous_hash_entries() {
        let mut t = Table::new(0, 0);
        t.put(Value::Integer(1), Value::Integer(100)).unwrap();
        // Keys 2 and 3 land in the hash part first (appended out of order).
        t.put(Value::Integer(3), Value::Integer(300)).unwrap();
        t.put(Value::Integer(2), Value::Integer(200)).unwrap();
        assert_eq!(t.len(), 3);
        assert!(matches!(t.get(&Value::Integer(3)), Value::Integer(300)));
    }

    #[test]
    fn nil_key_is_rejected() {
        let mut t = Table::new(0, 0);
        assert!(t.put(Value::Nil, Value::Integer(1)).is_err());
    }

    #[test]
    fn nan_key_is_rejected() {
        let mut t = Table::new(0, 0);
        assert!(t.put(Value::Float(f64::NAN), Value::Integer(1)).is_err());
    }

    #[test]
    fn integer_and_float_keys_are_the_same_slot() {
        let mut t = Table::new(0, 0);
        t.put(Value::Integer(1), Value::Integer(9)).unwrap();
        assert!(matches!(t.get(&Value::Float(1.0)), Value::Integer(9)));
    }
}
