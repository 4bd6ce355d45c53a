// VM thread (LuaState) and the per-instance Global it shares.
//
// One Global is created with the root state and shared, by reference, with
// every coroutine transitively spawned from it. The Global's own pieces
// are individually synchronized; script-level table data is not, by design
// (races there are a script-author responsibility).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::lua_value::{Logger, LuaValue, LuaValueKind};
use crate::lua_vm::{CallFrameStack, LuaError, LuaOptions, LuaResult, Registry};
use crate::rock::{ExData, ExValue};

/// Cooperative cancellation flag carried by every VM thread.
///
/// Native functions should observe it at the start of long operations;
/// nothing in this layer preempts.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn check(&self) -> LuaResult<()> {
        if self.is_cancelled() {
            Err(LuaError::Cancelled)
        } else {
            Ok(())
        }
    }
}

type PanicFn = Box<dyn Fn(&LuaState) + Send + Sync>;

/// Shared per-VM-instance state.
pub struct Global {
    main: Mutex<Weak<LuaState>>,
    current: Mutex<Weak<LuaState>>,
    /// Host-internal bookkeeping table, never exposed to scripts.
    registry: LuaValue,
    /// Global variables table.
    globals: LuaValue,
    builtin_mts: Mutex<AHashMap<LuaValueKind, LuaValue>>,
    temp_files: Mutex<Vec<PathBuf>>,
    gc_count: AtomicI32,
    logger: Mutex<Option<Arc<dyn Logger>>>,
}

impl Global {
    fn new() -> Arc<Self> {
        Arc::new(Global {
            main: Mutex::new(Weak::new()),
            current: Mutex::new(Weak::new()),
            registry: LuaValue::new_table(),
            globals: LuaValue::new_table(),
            builtin_mts: Mutex::new(AHashMap::new()),
            temp_files: Mutex::new(Vec::new()),
            gc_count: AtomicI32::new(0),
            logger: Mutex::new(None),
        })
    }

    pub fn registry(&self) -> &LuaValue {
        &self.registry
    }

    pub fn globals(&self) -> &LuaValue {
        &self.globals
    }

    pub fn main_thread(&self) -> Option<Arc<LuaState>> {
        self.main.lock().upgrade()
    }

    pub fn current_thread(&self) -> Option<Arc<LuaState>> {
        self.current.lock().upgrade()
    }

    pub fn set_current_thread(&self, thread: &Arc<LuaState>) {
        *self.current.lock() = Arc::downgrade(thread);
    }

    /// Default metatable for a built-in type tag.
    pub fn builtin_metatable(&self, kind: LuaValueKind) -> LuaValue {
        self.builtin_mts
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or(LuaValue::Nil)
    }

    pub fn set_builtin_metatable(&self, kind: LuaValueKind, mt: LuaValue) {
        self.builtin_mts.lock().insert(kind, mt);
    }

    /// Record a temp file owned by this VM instance.
    pub fn add_temp_file(&self, path: PathBuf) {
        self.temp_files.lock().push(path);
    }

    pub fn temp_file_count(&self) -> usize {
        self.temp_files.lock().len()
    }

    /// Delete every owned temp file. Called on instance teardown.
    pub fn remove_temp_files(&self) {
        let files = std::mem::take(&mut *self.temp_files.lock());
        for path in files {
            if let Err(err) = std::fs::remove_file(&path) {
                self.log_error(&format!("remove temp file {}: {}", path.display(), err));
            }
        }
    }

    /// GC-assist counter shared across threads.
    pub fn gc_step(&self, n: i32) -> i32 {
        self.gc_count.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn gc_count(&self) -> i32 {
        self.gc_count.load(Ordering::Relaxed)
    }

    pub fn set_logger(&self, logger: Arc<dyn Logger>) {
        *self.logger.lock() = Some(logger);
    }

    pub(crate) fn log_error(&self, msg: &str) {
        if let Some(logger) = &*self.logger.lock() {
            logger.error(msg);
        }
    }
}

/// One coroutine's execution context. Several share one [`Global`].
pub struct LuaState {
    global: Arc<Global>,
    parent: Mutex<Weak<LuaState>>,
    /// Defining environment table for code run on this thread.
    env: LuaValue,
    panic: Mutex<Option<PanicFn>>,
    dead: AtomicBool,
    registers: Mutex<Registry>,
    frames: Mutex<CallFrameStack>,
    cancel: CancelToken,
    ex_data: Mutex<ExData<ExValue>>,
    options: LuaOptions,
    is_main: bool,
}

impl LuaState {
    /// Create a root VM thread with a fresh Global.
    pub fn new(options: LuaOptions) -> Arc<LuaState> {
        let global = Global::new();
        let env = global.globals().clone();
        let state = Arc::new(LuaState {
            global: global.clone(),
            parent: Mutex::new(Weak::new()),
            env,
            panic: Mutex::new(None),
            dead: AtomicBool::new(false),
            registers: Mutex::new(Registry::new(options.registry_size, options.max_registry_size)),
            frames: Mutex::new(CallFrameStack::new(options.max_call_depth)),
            cancel: CancelToken::new(),
            ex_data: Mutex::new(ExData::new()),
            options,
            is_main: true,
        });
        *global.main.lock() = Arc::downgrade(&state);
        *global.current.lock() = Arc::downgrade(&state);
        state
    }

    /// Spawn a coroutine: shared Global, parent link for error
    /// propagation, fresh register and frame stacks, inherited
    /// cancellation token.
    pub fn new_thread(self: &Arc<Self>) -> LuaResult<Arc<LuaState>> {
        if self.is_dead() {
            return Err(LuaError::runtime("cannot spawn a thread from a dead thread"));
        }
        let options = self.options.clone();
        Ok(Arc::new(LuaState {
            global: self.global.clone(),
            parent: Mutex::new(Arc::downgrade(self)),
            env: self.env.clone(),
            panic: Mutex::new(None),
            dead: AtomicBool::new(false),
            registers: Mutex::new(Registry::new(options.registry_size, options.max_registry_size)),
            frames: Mutex::new(CallFrameStack::new(options.max_call_depth)),
            cancel: self.cancel.clone(),
            ex_data: Mutex::new(ExData::new()),
            options,
            is_main: false,
        }))
    }

    #[inline(always)]
    pub fn global(&self) -> &Arc<Global> {
        &self.global
    }

    pub fn parent(&self) -> Option<Arc<LuaState>> {
        self.parent.lock().upgrade()
    }

    pub fn env(&self) -> &LuaValue {
        &self.env
    }

    pub fn options(&self) -> &LuaOptions {
        &self.options
    }

    #[inline(always)]
    pub fn is_main(&self) -> bool {
        self.is_main
    }

    #[inline(always)]
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    /// Mark this thread dead. Closing the main thread also tears down
    /// instance-owned temp files.
    pub fn close(&self) {
        self.dead.store(true, Ordering::SeqCst);
        if self.is_main {
            self.global.remove_temp_files();
        }
    }

    pub fn registers(&self) -> &Mutex<Registry> {
        &self.registers
    }

    pub fn frames(&self) -> &Mutex<CallFrameStack> {
        &self.frames
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[inline]
    pub fn check_cancelled(&self) -> LuaResult<()> {
        self.cancel.check()
    }

    pub fn set_panic(&self, f: PanicFn) {
        *self.panic.lock() = Some(f);
    }

    /// Invoke the panic handler, if any, for an unprotected error.
    pub fn handle_panic(&self) {
        if let Some(f) = &*self.panic.lock() {
            f(self);
        }
    }

    /// Wrap a capability-protocol object as a light userdata value owned
    /// by this VM instance.
    pub fn new_light_userdata(&self, rock: Arc<dyn crate::rock::Rock>) -> LuaValue {
        LuaValue::light_userdata(rock)
    }

    // ============ Error construction helpers ============

    pub fn raise_error(&self, msg: impl Into<String>) -> LuaError {
        LuaError::Runtime(msg.into())
    }

    pub fn type_error(
        &self,
        index: usize,
        expected: &'static str,
        found: &'static str,
    ) -> LuaError {
        LuaError::ArgTypeMismatch {
            index,
            expected,
            found,
        }
    }

    // ============ Thread-local extension data ============

    pub fn ex_get(&self, key: &str) -> Option<ExValue> {
        self.ex_data.lock().get(key).cloned()
    }

    pub fn ex_set(&self, key: &str, value: ExValue) {
        self.ex_data.lock().set(key, value);
    }

    pub fn ex_del(&self, key: &str) {
        self.ex_data.lock().del(key);
    }

    pub fn ex_reset(&self) {
        self.ex_data.lock().reset();
    }
}
