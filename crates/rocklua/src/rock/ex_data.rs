// Small inline key/value store: a growable array with linear search and
// tombstone reuse, sized for the common case of a handful of keys.
// Deliberately not a hash map.

use std::any::Any;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::lua_value::LuaValue;

/// Host value attached to a handle or thread.
pub type ExValue = Arc<dyn Any + Send + Sync>;

struct ExDataKV<V> {
    /// Empty key marks a tombstone; reserved, never caller-supplied.
    key: SmolStr,
    value: Option<V>,
}

/// Ordered (key, value) sequence with unique live keys.
///
/// Insertion order is observable but carries no meaning. `reset` keeps the
/// backing capacity so stores can be pooled.
pub struct ExData<V> {
    entries: Vec<ExDataKV<V>>,
}

impl<V> ExData<V> {
    pub const fn new() -> Self {
        ExData { entries: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ExData {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Length including tombstones (matches the backing sequence).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Insert or overwrite. An existing entry wins over a tombstone;
    /// a tombstone wins over appending. The empty key is rejected.
    pub fn set(&mut self, key: &str, value: V) {
        if key.is_empty() {
            return;
        }

        let mut tombstone = None;
        for (i, kv) in self.entries.iter_mut().enumerate() {
            if kv.key == key {
                kv.value = Some(value);
                return;
            }
            if kv.key.is_empty() && tombstone.is_none() {
                tombstone = Some(i);
            }
        }

        if let Some(i) = tombstone {
            let kv = &mut self.entries[i];
            kv.key = SmolStr::new(key);
            kv.value = Some(value);
            return;
        }

        self.entries.push(ExDataKV {
            key: SmolStr::new(key),
            value: Some(value),
        });
    }

    /// Linear lookup. Absence is `None`, distinct from any stored value.
    pub fn get(&self, key: &str) -> Option<&V> {
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_ref())
    }

    /// Tombstone the entry: key cleared, value dropped, length unchanged.
    pub fn del(&mut self, key: &str) {
        if key.is_empty() {
            return;
        }
        if let Some(kv) = self.entries.iter_mut().find(|kv| kv.key == key) {
            kv.key = SmolStr::default();
            kv.value = None;
        }
    }

    /// Truncate to empty, retaining capacity.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

impl<V> Default for ExData<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Attribute store for rock implementations: same linear/tombstone shape,
/// specialized to script values. Missing keys read as Nil.
#[derive(Default)]
pub struct UserKV {
    inner: ExData<LuaValue>,
}

impl UserKV {
    pub const fn new() -> Self {
        UserKV { inner: ExData::new() }
    }

    pub fn set(&mut self, key: &str, value: LuaValue) {
        self.inner.set(key, value);
    }

    pub fn get(&self, key: &str) -> LuaValue {
        self.inner.get(key).cloned().unwrap_or(LuaValue::Nil)
    }

    pub fn del(&mut self, key: &str) {
        self.inner.del(key);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn test_set_get() {
        let mut ed = ExData::new();
        ed.set("a", 1u32);
        ed.set("b", 2u32);
        assert_eq!(ed.get("a"), Some(&1));
        assert_eq!(ed.get("b"), Some(&2));
        assert_eq!(ed.get("c"), None);
        ed.set("a", 9);
        assert_eq!(ed.get("a"), Some(&9));
        assert_eq!(ed.len(), 2);
    }

    #[test]
    fn test_del_leaves_tombstone() {
        let mut ed = ExData::new();
        ed.set("a", 1u32);
        ed.set("b", 2u32);
        ed.del("a");
        assert_eq!(ed.get("a"), None);
        // tombstone keeps the slot
        assert_eq!(ed.len(), 2);
    }

    #[test]
    fn test_tombstone_reuse_does_not_grow() {
        let mut ed = ExData::with_capacity(2);
        ed.set("a", 1u32);
        ed.set("b", 2u32);
        let cap = ed.capacity();
        ed.del("a");
        ed.set("c", 3u32);
        assert_eq!(ed.len(), 2);
        assert_eq!(ed.capacity(), cap);
        assert_eq!(ed.get("c"), Some(&3));
        assert_eq!(ed.get("b"), Some(&2));
    }

    #[test]
    fn test_reset_retains_capacity() {
        let mut ed = ExData::new();
        ed.set("a", 1u32);
        let cap = ed.capacity();
        assert!(cap >= 1);
        ed.reset();
        assert_eq!(ed.len(), 0);
        ed.set("b", 2u32);
        assert_eq!(ed.capacity(), cap);
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut ed = ExData::new();
        ed.set("", 1u32);
        assert_eq!(ed.len(), 0);
        assert_eq!(ed.get(""), None);
    }

    #[test]
    fn test_userkv_missing_reads_nil() {
        let mut kv = UserKV::new();
        kv.set("name", LuaValue::string("tcp"));
        assert_eq!(kv.get("name"), LuaValue::string("tcp"));
        assert_eq!(kv.get("other"), LuaValue::Nil);
        kv.del("name");
        assert_eq!(kv.get("name"), LuaValue::Nil);
    }

    proptest! {
        /// The store behaves like a map for any interleaving of
        /// set/del, modulo the reserved empty key.
        #[test]
        fn prop_matches_model(ops in prop::collection::vec(
            ("[a-d]", 0u32..100, prop::bool::ANY), 0..64)
        ) {
            let mut ed = ExData::new();
            let mut model: HashMap<String, u32> = HashMap::new();
            for (key, value, delete) in ops {
                if delete {
                    ed.del(&key);
                    model.remove(&key);
                } else {
                    ed.set(&key, value);
                    model.insert(key.clone(), value);
                }
                prop_assert_eq!(ed.get(&key), model.get(&key));
            }
            for key in ["a", "b", "c", "d"] {
                prop_assert_eq!(ed.get(key), model.get(key));
            }
        }
    }
}
