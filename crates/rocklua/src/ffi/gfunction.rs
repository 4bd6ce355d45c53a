// GFunction - the single integration point between the register-based
// calling convention and ordinary host closures.

use std::sync::Arc;

use crate::ffi::args::{Args, ArgsPool};
use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult, LuaState, MULTRET, Registry};

/// Host closure shape: `(thread, arguments) -> value`.
pub type NativeFn = Arc<dyn Fn(&LuaState, &Args) -> LuaResult<LuaValue> + Send + Sync>;

/// Native function adapter.
///
/// Re-entrant: no lock is held across the host-closure call, so a native
/// function may trigger further native calls.
#[derive(Clone)]
pub struct GFunction {
    func: Option<NativeFn>,
}

impl GFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&LuaState, &Args) -> LuaResult<LuaValue> + Send + Sync + 'static,
    {
        GFunction {
            func: Some(Arc::new(f)),
        }
    }

    /// An adapter without an implementation. Calling it is a programming
    /// defect, reported as a non-recoverable error.
    pub fn unset() -> Self {
        GFunction { func: None }
    }

    pub fn is_set(&self) -> bool {
        self.func.is_some()
    }

    pub(crate) fn addr(&self) -> usize {
        match &self.func {
            Some(f) => Arc::as_ptr(f) as *const u8 as usize,
            None => 0,
        }
    }

    /// Run the host closure under the register-frame calling convention.
    ///
    /// Registers `ra+1 ..= ra+nargs` are copied, in order, into a pooled
    /// argument buffer; the buffer is reset and released on every exit
    /// path. Unless `nret` is [`MULTRET`], the produced value is written
    /// at `ra` and the live top set to `ra + 1`.
    pub fn pcall(
        &self,
        state: &LuaState,
        reg: &mut Registry,
        ra: usize,
        nargs: usize,
        nret: i32,
    ) -> LuaResult<()> {
        let Some(func) = &self.func else {
            return Err(LuaError::Construction("got nil"));
        };

        state.check_cancelled()?;

        // the zero-argument path still goes through the pool
        let mut args = ArgsPool::global().borrow();
        for i in 1..=nargs {
            args.push(reg.get(ra + i));
        }

        let ret = func(state, &args);
        drop(args);
        let ret = ret?;

        // MULTRET callers arrange their own results; everything else
        // always receives the produced value, nil included
        if nret != MULTRET {
            reg.set(ra, ret)?;
            reg.set_top(ra + 1);
        }
        Ok(())
    }
}

impl PartialEq for GFunction {
    fn eq(&self, other: &Self) -> bool {
        match (&self.func, &other.func) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl std::fmt::Debug for GFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_set() {
            write!(f, "GFunction(0x{:x})", self.addr())
        } else {
            write!(f, "GFunction(unset)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lua_vm::LuaOptions;
    use parking_lot::Mutex;

    fn state_and_registry() -> (Arc<LuaState>, Registry) {
        let state = LuaState::new(LuaOptions::default());
        let reg = Registry::new(32, 1024);
        (state, reg)
    }

    #[test]
    fn test_zero_args_sees_empty_view() {
        let (state, mut reg) = state_and_registry();
        let seen = Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        let g = GFunction::new(move |_, args| {
            *seen2.lock() = Some(args.len());
            Ok(LuaValue::integer(1))
        });
        g.pcall(&state, &mut reg, 0, 0, 1).unwrap();
        assert_eq!(*seen.lock(), Some(0));
    }

    #[test]
    fn test_arguments_copied_in_order() {
        let (state, mut reg) = state_and_registry();
        let ra = 2;
        reg.set(ra + 1, LuaValue::integer(11)).unwrap();
        reg.set(ra + 2, LuaValue::string("mid")).unwrap();
        reg.set(ra + 3, LuaValue::boolean(false)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let g = GFunction::new(move |_, args| {
            let mut v = Vec::new();
            for i in 1..=args.len() {
                v.push(args.get(i));
            }
            *seen2.lock() = v;
            Ok(LuaValue::Nil)
        });
        g.pcall(&state, &mut reg, ra, 3, 1).unwrap();
        assert_eq!(
            *seen.lock(),
            vec![
                LuaValue::integer(11),
                LuaValue::string("mid"),
                LuaValue::boolean(false),
            ]
        );
    }

    #[test]
    fn test_result_written_at_ra() {
        let (state, mut reg) = state_and_registry();
        let g = GFunction::new(|_, _| Ok(LuaValue::integer(99)));
        g.pcall(&state, &mut reg, 5, 0, 1).unwrap();
        assert_eq!(reg.get(5), LuaValue::integer(99));
        assert_eq!(reg.top(), 6);
    }

    #[test]
    fn test_multret_suppresses_write() {
        let (state, mut reg) = state_and_registry();
        reg.set(4, LuaValue::string("keep")).unwrap();
        let g = GFunction::new(|_, _| Ok(LuaValue::integer(1)));
        g.pcall(&state, &mut reg, 4, 0, MULTRET).unwrap();
        assert_eq!(reg.get(4), LuaValue::string("keep"));
    }

    #[test]
    fn test_unset_is_construction_error() {
        let (state, mut reg) = state_and_registry();
        let g = GFunction::unset();
        let err = g.pcall(&state, &mut reg, 0, 0, 1).unwrap_err();
        assert_eq!(err, LuaError::Construction("got nil"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_host_error_propagates_and_releases_buffer() {
        let (state, mut reg) = state_and_registry();
        let g = GFunction::new(|_, _| Err(LuaError::runtime("boom")));
        assert_eq!(
            g.pcall(&state, &mut reg, 0, 0, 1),
            Err(LuaError::runtime("boom"))
        );
        // the pooled buffer came back: a fresh borrow is empty
        assert_eq!(ArgsPool::global().borrow().len(), 0);
    }

    #[test]
    fn test_reentrant_native_calls() {
        let (state, mut reg) = state_and_registry();
        let inner = GFunction::new(|_, args| Ok(LuaValue::integer(args.check_int(1)? * 2)));
        let outer = GFunction::new(move |state, args| {
            let mut scratch = Registry::new(8, 64);
            scratch.set(1, args.check_any(1)?)?;
            inner.pcall(state, &mut scratch, 0, 1, 1)?;
            Ok(scratch.get(0))
        });
        reg.set(1, LuaValue::integer(21)).unwrap();
        outer.pcall(&state, &mut reg, 0, 1, 1).unwrap();
        assert_eq!(reg.get(0), LuaValue::integer(42));
    }

    #[test]
    fn test_cancelled_state_rejects_call() {
        let (state, mut reg) = state_and_registry();
        state.cancel_token().cancel();
        let g = GFunction::new(|_, _| Ok(LuaValue::Nil));
        assert_eq!(
            g.pcall(&state, &mut reg, 0, 0, 1),
            Err(LuaError::Cancelled)
        );
    }
}
