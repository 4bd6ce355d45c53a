// Pooled argument marshalling.
//
// An Args buffer is borrowed from the process-wide pool at native-call
// entry, filled from the caller's register range, handed to the host
// closure, and returned to the pool when the call ends. The borrow is
// scoped by PooledArgs' Drop, so a buffer can never outlive the call
// that produced it.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;
use smol_str::SmolStr;

use crate::lua_value::{LuaFunction, LuaUserdata, LuaValue, LuaValueKind, TableRef};
use crate::lua_value::{lv_as_string, lv_can_conv_to_string};
use crate::lua_vm::{LuaError, LuaResult, LuaState};
use crate::rock::{Io, LightUserdata};

/// The live arguments of one native call, 1-based externally.
pub struct Args {
    values: Vec<LuaValue>,
}

impl Args {
    pub fn new() -> Self {
        Args { values: Vec::new() }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append the next argument (marshalling side).
    #[inline(always)]
    pub fn push(&mut self, value: LuaValue) {
        self.values.push(value);
    }

    /// Optional-argument access: out of range is Nil, never an error.
    pub fn get(&self, index: usize) -> LuaValue {
        if index < 1 || index > self.values.len() {
            return LuaValue::Nil;
        }
        self.values[index - 1].clone()
    }

    pub(crate) fn reset(&mut self) {
        self.values.clear();
    }

    /// Checked access: below 1 and past the end are distinct error kinds.
    fn slot(&self, index: usize) -> LuaResult<&LuaValue> {
        if index < 1 {
            return Err(LuaError::ArgNotFound { index });
        }
        if index > self.values.len() {
            return Err(LuaError::ArgOutOfRange { index });
        }
        Ok(&self.values[index - 1])
    }

    fn mismatch(&self, index: usize, expected: &'static str, found: &LuaValue) -> LuaError {
        LuaError::ArgTypeMismatch {
            index,
            expected,
            found: found.type_name(),
        }
    }

    // ============ Checked extraction family ============

    pub fn check_any(&self, index: usize) -> LuaResult<LuaValue> {
        self.slot(index).cloned()
    }

    pub fn check_int(&self, index: usize) -> LuaResult<i64> {
        let v = self.slot(index)?;
        match v.as_number() {
            Some(n) => Ok(n as i64),
            None => Err(self.mismatch(index, "number", v)),
        }
    }

    /// Never fails: absence or a wrong variant yields the default.
    pub fn check_int_or_default(&self, index: usize, default: i64) -> i64 {
        match self.slot(index) {
            Ok(v) => v.as_number().map(|n| n as i64).unwrap_or(default),
            Err(_) => default,
        }
    }

    pub fn check_number(&self, index: usize) -> LuaResult<f64> {
        let v = self.slot(index)?;
        v.as_number().ok_or_else(|| self.mismatch(index, "number", v))
    }

    /// Accepts any value convertible to string (strings and numbers).
    pub fn check_string(&self, index: usize) -> LuaResult<SmolStr> {
        let v = self.slot(index)?;
        if lv_can_conv_to_string(v) {
            Ok(lv_as_string(v))
        } else {
            Err(self.mismatch(index, "string", v))
        }
    }

    pub fn check_bool(&self, index: usize) -> LuaResult<bool> {
        let v = self.slot(index)?;
        v.as_boolean().ok_or_else(|| self.mismatch(index, "boolean", v))
    }

    pub fn check_table(&self, index: usize) -> LuaResult<TableRef> {
        let v = self.slot(index)?;
        v.as_table()
            .cloned()
            .ok_or_else(|| self.mismatch(index, "table", v))
    }

    pub fn check_function(&self, index: usize) -> LuaResult<Arc<LuaFunction>> {
        let v = self.slot(index)?;
        v.as_function()
            .cloned()
            .ok_or_else(|| self.mismatch(index, "function", v))
    }

    pub fn check_userdata(&self, index: usize) -> LuaResult<Arc<LuaUserdata>> {
        let v = self.slot(index)?;
        v.as_userdata()
            .cloned()
            .ok_or_else(|| self.mismatch(index, "userdata", v))
    }

    pub fn check_light_userdata(&self, index: usize) -> LuaResult<Arc<LightUserdata>> {
        let v = self.slot(index)?;
        v.as_light_userdata()
            .cloned()
            .ok_or_else(|| self.mismatch(index, "lightuserdata", v))
    }

    pub fn check_thread(&self, index: usize) -> LuaResult<Arc<LuaState>> {
        let v = self.slot(index)?;
        v.as_thread()
            .cloned()
            .ok_or_else(|| self.mismatch(index, "thread", v))
    }

    /// Light userdata plus the IO capability probe.
    pub fn check_io(&self, index: usize) -> LuaResult<Arc<dyn Io>> {
        let ud = self.check_light_userdata(index)?;
        ud.check_io()
    }

    /// Generic tag check.
    pub fn check_type(&self, index: usize, kind: LuaValueKind) -> LuaResult<()> {
        let v = self.slot(index)?;
        if v.kind() == kind {
            Ok(())
        } else {
            Err(self.mismatch(index, kind.name(), v))
        }
    }
}

impl Default for Args {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Pool ============

/// Concurrent free list of Args buffers, shared by every VM thread.
pub struct ArgsPool {
    free: Mutex<Vec<Args>>,
}

impl ArgsPool {
    pub const fn new() -> Self {
        ArgsPool {
            free: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide pool used by the native-call adapter.
    pub fn global() -> &'static ArgsPool {
        static POOL: ArgsPool = ArgsPool::new();
        &POOL
    }

    /// Borrow a buffer for the dynamic extent of one native call.
    pub fn borrow(&'static self) -> PooledArgs {
        let args = self.free.lock().pop().unwrap_or_default();
        PooledArgs {
            args: Some(args),
            pool: self,
        }
    }

    fn release(&self, mut args: Args) {
        args.reset();
        self.free.lock().push(args);
    }
}

/// Borrowed Args buffer; resets itself and returns to the pool on drop,
/// so release happens on every path out of the call, errors included.
pub struct PooledArgs {
    args: Option<Args>,
    pool: &'static ArgsPool,
}

impl Deref for PooledArgs {
    type Target = Args;

    #[inline(always)]
    fn deref(&self) -> &Args {
        self.args.as_ref().expect("pooled args taken")
    }
}

impl DerefMut for PooledArgs {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Args {
        self.args.as_mut().expect("pooled args taken")
    }
}

impl Drop for PooledArgs {
    fn drop(&mut self) {
        if let Some(args) = self.args.take() {
            self.pool.release(args);
        }
    }
}
