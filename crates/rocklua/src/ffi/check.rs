//! Checked extraction over a bare value, for native code that already
//! holds a `LuaValue` outside any argument list. Same taxonomy as the
//! `Args` family, minus the argument position.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::lua_value::{LuaFunction, LuaUserdata, LuaValue, LuaValueKind, TableRef};
use crate::lua_value::{lv_as_string, lv_can_conv_to_string};
use crate::lua_vm::{LuaError, LuaResult, LuaState};
use crate::rock::{Io, LightUserdata};

fn mismatch(expected: &'static str, found: &LuaValue) -> LuaError {
    LuaError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

pub fn check_int(v: &LuaValue) -> LuaResult<i64> {
    v.as_number()
        .map(|n| n as i64)
        .ok_or_else(|| mismatch("number", v))
}

pub fn check_int_or_default(v: &LuaValue, default: i64) -> i64 {
    v.as_number().map(|n| n as i64).unwrap_or(default)
}

pub fn check_number(v: &LuaValue) -> LuaResult<f64> {
    v.as_number().ok_or_else(|| mismatch("number", v))
}

pub fn check_string(v: &LuaValue) -> LuaResult<SmolStr> {
    if lv_can_conv_to_string(v) {
        Ok(lv_as_string(v))
    } else {
        Err(mismatch("string", v))
    }
}

pub fn check_bool(v: &LuaValue) -> LuaResult<bool> {
    v.as_boolean().ok_or_else(|| mismatch("boolean", v))
}

pub fn check_table(v: &LuaValue) -> LuaResult<TableRef> {
    v.as_table().cloned().ok_or_else(|| mismatch("table", v))
}

pub fn check_function(v: &LuaValue) -> LuaResult<Arc<LuaFunction>> {
    v.as_function()
        .cloned()
        .ok_or_else(|| mismatch("function", v))
}

pub fn check_userdata(v: &LuaValue) -> LuaResult<Arc<LuaUserdata>> {
    v.as_userdata()
        .cloned()
        .ok_or_else(|| mismatch("userdata", v))
}

pub fn check_light_userdata(v: &LuaValue) -> LuaResult<Arc<LightUserdata>> {
    v.as_light_userdata()
        .cloned()
        .ok_or_else(|| mismatch("lightuserdata", v))
}

pub fn check_thread(v: &LuaValue) -> LuaResult<Arc<LuaState>> {
    v.as_thread().cloned().ok_or_else(|| mismatch("thread", v))
}

pub fn check_io(v: &LuaValue) -> LuaResult<Arc<dyn Io>> {
    check_light_userdata(v)?.check_io()
}

pub fn check_type(v: &LuaValue, kind: LuaValueKind) -> LuaResult<()> {
    if v.kind() == kind {
        Ok(())
    } else {
        Err(mismatch(kind.name(), v))
    }
}
