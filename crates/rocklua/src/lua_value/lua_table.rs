// Minimal table object.
//
// Only the value-type contract matters to this layer: tables hold LuaValue
// keys and values, carry an optional metatable, and are the one container
// shared by reference between threads. The growth/hashing strategy is a
// collaborator concern and is kept deliberately simple here.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult};

/// Shared handle to a table; identity comparison via `Arc::ptr_eq`.
pub type TableRef = Arc<RwLock<LuaTable>>;

pub struct LuaTable {
    /// 1-based dense prefix.
    array: Vec<LuaValue>,
    hash: AHashMap<LuaValue, LuaValue>,
    metatable: LuaValue,
}

impl LuaTable {
    pub fn new(array_size: usize, hash_size: usize) -> Self {
        LuaTable {
            array: Vec::with_capacity(array_size),
            hash: AHashMap::with_capacity(hash_size),
            metatable: LuaValue::Nil,
        }
    }

    pub fn into_ref(self) -> TableRef {
        Arc::new(RwLock::new(self))
    }

    /// Index of `key` in the dense part, if it is an integral key there.
    fn array_index(&self, key: &LuaValue) -> Option<usize> {
        let n = key.as_number()?;
        if crate::lua_value::lua_convert::is_integer(n) {
            let i = n as i64;
            if i >= 1 && (i as usize) <= self.array.len() + 1 {
                return Some(i as usize - 1);
            }
        }
        None
    }

    pub fn get(&self, key: &LuaValue) -> LuaValue {
        if let Some(i) = self.array_index(key) {
            return self.array.get(i).cloned().unwrap_or(LuaValue::Nil);
        }
        self.hash.get(key).cloned().unwrap_or(LuaValue::Nil)
    }

    /// Raw set. Nil and NaN keys are script-author errors.
    pub fn set(&mut self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        match &key {
            LuaValue::Nil => return Err(LuaError::runtime("table index is nil")),
            LuaValue::Number(n) if n.is_nan() => {
                return Err(LuaError::runtime("table index is NaN"));
            }
            _ => {}
        }

        if let Some(i) = self.array_index(&key) {
            if i == self.array.len() {
                if !value.is_nil() {
                    self.array.push(value);
                }
            } else if value.is_nil() && i + 1 == self.array.len() {
                self.array.pop();
            } else {
                self.array[i] = value;
            }
            return Ok(());
        }

        if value.is_nil() {
            self.hash.remove(&key);
        } else {
            self.hash.insert(key, value);
        }
        Ok(())
    }

    /// Border of the dense part (the `#` length).
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.hash.is_empty()
    }

    pub fn metatable(&self) -> &LuaValue {
        &self.metatable
    }

    pub fn set_metatable(&mut self, mt: LuaValue) {
        self.metatable = mt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_and_hash_parts() {
        let mut t = LuaTable::new(0, 0);
        t.set(LuaValue::integer(1), LuaValue::string("a")).unwrap();
        t.set(LuaValue::integer(2), LuaValue::string("b")).unwrap();
        t.set(LuaValue::string("k"), LuaValue::integer(9)).unwrap();

        assert_eq!(t.len(), 2);
        assert_eq!(t.get(&LuaValue::integer(1)), LuaValue::string("a"));
        assert_eq!(t.get(&LuaValue::string("k")), LuaValue::integer(9));
        assert_eq!(t.get(&LuaValue::integer(5)), LuaValue::Nil);
    }

    #[test]
    fn test_float_key_normalizes_into_array() {
        let mut t = LuaTable::new(0, 0);
        t.set(LuaValue::number(1.0), LuaValue::boolean(true)).unwrap();
        assert_eq!(t.get(&LuaValue::integer(1)), LuaValue::boolean(true));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_nil_assignment_deletes() {
        let mut t = LuaTable::new(0, 0);
        t.set(LuaValue::string("k"), LuaValue::integer(1)).unwrap();
        t.set(LuaValue::string("k"), LuaValue::Nil).unwrap();
        assert_eq!(t.get(&LuaValue::string("k")), LuaValue::Nil);
        assert!(t.is_empty());
    }

    #[test]
    fn test_bad_keys_rejected() {
        let mut t = LuaTable::new(0, 0);
        assert!(t.set(LuaValue::Nil, LuaValue::integer(1)).is_err());
        assert!(t.set(LuaValue::number(f64::NAN), LuaValue::integer(1)).is_err());
    }

    #[test]
    fn test_metatable_slot() {
        let mut t = LuaTable::new(0, 0);
        assert!(t.metatable().is_nil());
        let mt = LuaValue::new_table();
        t.set_metatable(mt.clone());
        assert_eq!(*t.metatable(), mt);
    }
}
