// Capability protocol: the minimal interface ("rock") a native object
// implements to become a script value, the optional IO capability, and
// the supporting stores and JSON emission.

mod ex_data;
mod json;
mod light_userdata;

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

pub use ex_data::{ExData, ExValue, UserKV};
pub use json::{JsonWriter, escape_into};
pub use light_userdata::LightUserdata;

use crate::lua_value::LuaValue;
use crate::lua_vm::LuaState;

/// Canonical empty/absent JSON body.
pub static ROCK_JSON_NULL: &[u8] = b"null";

/// Fallible-return channel for capability methods. Returned, not raised;
/// native callers decide whether to surface it to script code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RockError {
    #[error("not found")]
    NotFound,
    #[error("closed")]
    Closed,
}

impl RockError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RockError::NotFound)
    }
}

/// Lifecycle of a native resource bridged into the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Init,
    Running,
    Close,
    Panic,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Init => "INIT",
            Status::Running => "RUNNING",
            Status::Close => "CLOSE",
            Status::Panic => "PANIC",
        }
    }

    /// Close and Panic admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Close | Status::Panic)
    }
}

/// Atomic lifecycle holder shared between host threads.
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub const fn new(status: Status) -> Self {
        StatusCell(AtomicU8::new(status as u8))
    }

    pub fn load(&self) -> Status {
        match self.0.load(Ordering::SeqCst) {
            0 => Status::Init,
            1 => Status::Running,
            2 => Status::Close,
            _ => Status::Panic,
        }
    }

    /// Move to `to` unless already terminal. Returns whether the
    /// transition happened.
    pub fn transition(&self, to: Status) -> bool {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            if current == Status::Close as u8 || current == Status::Panic as u8 {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                to as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Base capability every native object implements to be embedded as a
/// script value.
///
/// Default method bodies supply inert behavior (no-op setters, Nil
/// getters, a literal `null` JSON body) so concrete types override only
/// what they need.
pub trait Rock: Send + Sync {
    /// Display name of this object.
    fn name(&self) -> &str;

    /// Type tag string shown in capability errors.
    fn type_name(&self) -> &str;

    /// JSON serialization of the object's state.
    fn json(&self) -> Vec<u8> {
        ROCK_JSON_NULL.to_vec()
    }

    /// Value-keyed field write.
    fn set_field(&self, _state: &LuaState, _key: LuaValue, _value: LuaValue) {}

    /// Value-keyed field read.
    fn get_field(&self, _state: &LuaState, _key: &LuaValue) -> LuaValue {
        LuaValue::Nil
    }

    /// String-keyed attribute read (distinct from field access).
    fn index(&self, _state: &LuaState, _key: &str) -> LuaValue {
        LuaValue::Nil
    }

    /// String-keyed attribute write.
    fn new_index(&self, _state: &LuaState, _key: &str, _value: LuaValue) {}

    /// Runtime shape probe: if `candidate` matches what this rock
    /// expects, invoke `on_match` with it and report true.
    fn l_check(&self, _candidate: &dyn Any, _on_match: &mut dyn FnMut(&dyn Any)) -> bool {
        false
    }

    /// Capability narrowing to IO. Types that implement [`Io`] override
    /// this with `Some(self)`.
    fn into_io(self: Arc<Self>) -> Option<Arc<dyn Io>> {
        None
    }

    /// Wrap this object as a light userdata handle.
    fn to_light_userdata(self: Arc<Self>) -> LightUserdata
    where
        Self: Sized + 'static,
    {
        LightUserdata::new(self)
    }
}

/// Extended capability for I/O-capable resources.
///
/// A resource in a terminal lifecycle state rejects `start`/`write`/
/// `read` through the fallible return, never by panicking. The inert
/// defaults answer "not found" so concrete types override only what
/// they support.
pub trait Io: Rock {
    fn close(&self) {}

    fn start(&self) -> Result<(), RockError> {
        Err(RockError::NotFound)
    }

    fn write(&self, _value: LuaValue) -> Result<(), RockError> {
        Err(RockError::NotFound)
    }

    fn read(&self) -> Result<Vec<u8>, RockError> {
        Err(RockError::NotFound)
    }
}

/// Inert placeholder rock. Useful as a stand-in value; it carries no
/// IO capability.
pub struct Super;

impl Rock for Super {
    fn name(&self) -> &str {
        "super"
    }

    fn type_name(&self) -> &str {
        "super"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lua_vm::LuaOptions;

    #[test]
    fn test_status_strings() {
        assert_eq!(Status::Init.as_str(), "INIT");
        assert_eq!(Status::Running.as_str(), "RUNNING");
        assert_eq!(Status::Close.as_str(), "CLOSE");
        assert_eq!(Status::Panic.as_str(), "PANIC");
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let cell = StatusCell::new(Status::Init);
        assert!(cell.transition(Status::Running));
        assert!(cell.transition(Status::Panic));
        assert!(!cell.transition(Status::Running));
        assert_eq!(cell.load(), Status::Panic);

        let cell = StatusCell::new(Status::Init);
        assert!(cell.transition(Status::Close));
        assert!(!cell.transition(Status::Panic));
        assert_eq!(cell.load(), Status::Close);
    }

    #[test]
    fn test_super_is_inert() {
        let state = LuaState::new(LuaOptions::default());
        let s = Super;
        assert_eq!(s.name(), "super");
        assert_eq!(s.json(), b"null");
        assert_eq!(s.get_field(&state, &LuaValue::string("k")), LuaValue::Nil);
        assert_eq!(s.index(&state, "k"), LuaValue::Nil);
        assert!(!s.l_check(&0u32, &mut |_: &dyn Any| {}));
        assert!(Arc::new(Super).into_io().is_none());
    }

    #[test]
    fn test_not_found() {
        assert!(RockError::NotFound.is_not_found());
        assert!(!RockError::Closed.is_not_found());
        assert_eq!(RockError::NotFound.to_string(), "not found");
    }
}
