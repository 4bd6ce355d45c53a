// Runtime value representation: the tagged LuaValue variant and the
// function/userdata objects it carries.

mod lua_channel;
mod lua_convert;
mod lua_table;
mod lua_value;

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

pub use lua_channel::LuaChannel;
pub use lua_convert::{
    is_integer, lv_as_bool, lv_as_number, lv_as_string, lv_can_conv_to_string, lv_is_false,
    number_to_string, parse_number,
};
pub use lua_table::{LuaTable, TableRef};
pub use lua_value::{LuaValue, LuaValueKind};

/// Compiled function prototype, produced by the (external) compiler and
/// consumed by script closures. Interface-level only at this layer.
#[derive(Debug, Clone)]
pub struct FunctionProto {
    pub code: Vec<u32>,
    pub constants: Vec<LuaValue>,
    pub param_count: usize,
    pub is_vararg: bool,
    pub max_stack_size: usize,
    pub source_name: Option<String>,
}

impl FunctionProto {
    pub fn new() -> Self {
        FunctionProto {
            code: Vec::new(),
            constants: Vec::new(),
            param_count: 0,
            is_vararg: false,
            max_stack_size: 0,
            source_name: None,
        }
    }
}

impl Default for FunctionProto {
    fn default() -> Self {
        Self::new()
    }
}

/// A function object: either a script-defined closure (prototype +
/// captured upvalues + defining environment) or a native-function marker.
pub enum LuaFunction {
    Lua(LuaClosure),
    Native(crate::ffi::GFunction),
}

pub struct LuaClosure {
    pub proto: Arc<FunctionProto>,
    pub upvalues: Vec<LuaValue>,
    /// Defining environment table.
    pub env: LuaValue,
}

impl LuaFunction {
    pub fn from_proto(proto: Arc<FunctionProto>, env: LuaValue) -> Self {
        LuaFunction::Lua(LuaClosure {
            proto,
            upvalues: Vec::new(),
            env,
        })
    }

    #[inline(always)]
    pub fn is_native(&self) -> bool {
        matches!(self, LuaFunction::Native(_))
    }

    pub fn env(&self) -> &LuaValue {
        static NIL: LuaValue = LuaValue::Nil;
        match self {
            LuaFunction::Lua(c) => &c.env,
            LuaFunction::Native(_) => &NIL,
        }
    }
}

/// Full userdata: an opaque native payload plus an associated environment
/// table and optional metatable.
pub struct LuaUserdata {
    data: Mutex<Box<dyn Any + Send + Sync>>,
    env: LuaValue,
    metatable: Mutex<LuaValue>,
}

impl LuaUserdata {
    pub fn new<T: Any + Send + Sync>(data: T, env: LuaValue) -> Self {
        LuaUserdata {
            data: Mutex::new(Box::new(data)),
            env,
            metatable: Mutex::new(LuaValue::Nil),
        }
    }

    pub fn env(&self) -> &LuaValue {
        &self.env
    }

    pub fn metatable(&self) -> LuaValue {
        self.metatable.lock().clone()
    }

    pub fn set_metatable(&self, mt: LuaValue) {
        *self.metatable.lock() = mt;
    }

    /// Typed access to the payload; `None` if the payload is not a `T`.
    pub fn with_data<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.data.lock();
        guard.downcast_mut::<T>().map(f)
    }
}

/// Host-pluggable logging seam. The runtime itself never configures
/// logging; embedders install an implementation on the [`Global`]
/// (`crate::lua_vm::Global`).
pub trait Logger: Send + Sync {
    fn error(&self, msg: &str);
    fn info(&self, msg: &str);
    fn debug(&self, msg: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_userdata_payload_access() {
        let ud = LuaUserdata::new(vec![1u8, 2, 3], LuaValue::new_table());
        let len = ud.with_data::<Vec<u8>, _>(|v| {
            v.push(4);
            v.len()
        });
        assert_eq!(len, Some(4));
        // wrong payload type probes as not-found
        assert!(ud.with_data::<String, _>(|_| ()).is_none());
    }

    #[test]
    fn test_userdata_metatable() {
        let ud = LuaUserdata::new(0u32, LuaValue::Nil);
        assert!(ud.metatable().is_nil());
        let mt = LuaValue::new_table();
        ud.set_metatable(mt.clone());
        assert_eq!(ud.metatable(), mt);
    }

    #[test]
    fn test_closure_env() {
        let proto = Arc::new(FunctionProto::new());
        let env = LuaValue::new_table();
        let f = LuaFunction::from_proto(proto, env.clone());
        assert!(!f.is_native());
        assert_eq!(*f.env(), env);
    }
}
