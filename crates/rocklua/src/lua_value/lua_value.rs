// LuaValue - the closed set of runtime values a script can hold.
//
// Every variant implements the same narrow contract: a stable type tag,
// a display string, and the fast probes (as_number / as_str / as_function)
// that the interpreter uses on hot dispatch paths instead of generic
// type tests.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;

use crate::ffi::GFunction;
use crate::lua_value::lua_channel::LuaChannel;
use crate::lua_value::lua_convert;
use crate::lua_value::lua_table::{LuaTable, TableRef};
use crate::lua_value::{LuaFunction, LuaUserdata};
use crate::lua_vm::LuaState;
use crate::rock::{LightUserdata, Rock};

/// A Lua runtime value.
///
/// Primitive variants (`Nil`, `Boolean`, `Number`, `String`) are structurally
/// immutable and freely shared by clone. Reference variants share their
/// payload through `Arc` and compare by identity.
#[derive(Clone)]
pub enum LuaValue {
    Nil,
    Boolean(bool),
    /// Single numeric kind covering integer and floating forms; see
    /// [`lua_convert::is_integer`] for the canonical integral predicate.
    Number(f64),
    String(SmolStr),
    Table(TableRef),
    Function(Arc<LuaFunction>),
    UserData(Arc<LuaUserdata>),
    Thread(Arc<LuaState>),
    Channel(LuaChannel),
    LightUserData(Arc<LightUserdata>),
    /// Host closure with the register-frame calling convention.
    Native(GFunction),
}

/// Variant discriminant for pattern-matching dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaValueKind {
    Nil,
    Boolean,
    Number,
    String,
    Table,
    Function,
    UserData,
    Thread,
    Channel,
    LightUserData,
    Native,
}

impl LuaValueKind {
    /// The `type()`-visible tag for this kind.
    ///
    /// `Native` values are callable and report `"function"`.
    pub fn name(self) -> &'static str {
        match self {
            LuaValueKind::Nil => "nil",
            LuaValueKind::Boolean => "boolean",
            LuaValueKind::Number => "number",
            LuaValueKind::String => "string",
            LuaValueKind::Table => "table",
            LuaValueKind::Function => "function",
            LuaValueKind::UserData => "userdata",
            LuaValueKind::Thread => "thread",
            LuaValueKind::Channel => "channel",
            LuaValueKind::LightUserData => "lightuserdata",
            LuaValueKind::Native => "function",
        }
    }
}

impl LuaValue {
    // ============ Constructors ============

    #[inline(always)]
    pub const fn nil() -> Self {
        LuaValue::Nil
    }

    #[inline(always)]
    pub const fn boolean(b: bool) -> Self {
        LuaValue::Boolean(b)
    }

    #[inline(always)]
    pub const fn number(n: f64) -> Self {
        LuaValue::Number(n)
    }

    #[inline(always)]
    pub fn integer(i: i64) -> Self {
        LuaValue::Number(i as f64)
    }

    #[inline]
    pub fn string(s: impl Into<SmolStr>) -> Self {
        LuaValue::String(s.into())
    }

    /// Create a fresh empty table value.
    pub fn new_table() -> Self {
        LuaValue::Table(LuaTable::new(0, 0).into_ref())
    }

    pub fn function(f: LuaFunction) -> Self {
        LuaValue::Function(Arc::new(f))
    }

    pub fn userdata(ud: LuaUserdata) -> Self {
        LuaValue::UserData(Arc::new(ud))
    }

    /// Wrap a capability-protocol object as a light userdata value.
    pub fn light_userdata(rock: Arc<dyn Rock>) -> Self {
        LuaValue::LightUserData(Arc::new(LightUserdata::new(rock)))
    }

    /// Create a channel value with the given buffer capacity
    /// (0 = unbuffered rendezvous).
    pub fn channel(capacity: usize) -> Self {
        LuaValue::Channel(LuaChannel::new(capacity))
    }

    pub fn native(g: GFunction) -> Self {
        LuaValue::Native(g)
    }

    // ============ Type tags ============

    #[inline(always)]
    pub fn kind(&self) -> LuaValueKind {
        match self {
            LuaValue::Nil => LuaValueKind::Nil,
            LuaValue::Boolean(_) => LuaValueKind::Boolean,
            LuaValue::Number(_) => LuaValueKind::Number,
            LuaValue::String(_) => LuaValueKind::String,
            LuaValue::Table(_) => LuaValueKind::Table,
            LuaValue::Function(_) => LuaValueKind::Function,
            LuaValue::UserData(_) => LuaValueKind::UserData,
            LuaValue::Thread(_) => LuaValueKind::Thread,
            LuaValue::Channel(_) => LuaValueKind::Channel,
            LuaValue::LightUserData(_) => LuaValueKind::LightUserData,
            LuaValue::Native(_) => LuaValueKind::Native,
        }
    }

    #[inline(always)]
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    // ============ Fast probes ============
    // Used instead of a generic kind() dispatch wherever the interpreter
    // would otherwise pay for a dynamic type test on a hot path.

    #[inline(always)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LuaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Probe for a script function object.
    ///
    /// A `Native` value is callable but is NOT a function object; it
    /// reports not-found here, as the adapter dispatches it separately.
    #[inline(always)]
    pub fn as_function(&self) -> Option<&Arc<LuaFunction>> {
        match self {
            LuaValue::Function(f) => Some(f),
            _ => None,
        }
    }

    // ============ Checked accessors ============

    #[inline(always)]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            LuaValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_userdata(&self) -> Option<&Arc<LuaUserdata>> {
        match self {
            LuaValue::UserData(u) => Some(u),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_thread(&self) -> Option<&Arc<LuaState>> {
        match self {
            LuaValue::Thread(t) => Some(t),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_channel(&self) -> Option<&LuaChannel> {
        match self {
            LuaValue::Channel(c) => Some(c),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_light_userdata(&self) -> Option<&Arc<LightUserdata>> {
        match self {
            LuaValue::LightUserData(u) => Some(u),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_native(&self) -> Option<&GFunction> {
        match self {
            LuaValue::Native(g) => Some(g),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    // ============ Truthiness ============

    /// Lua truthiness: only nil and false are falsy.
    #[inline(always)]
    pub fn is_falsy(&self) -> bool {
        matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    fn ref_addr(&self) -> usize {
        match self {
            LuaValue::Table(t) => Arc::as_ptr(t) as *const u8 as usize,
            LuaValue::Function(f) => Arc::as_ptr(f) as usize,
            LuaValue::UserData(u) => Arc::as_ptr(u) as usize,
            LuaValue::Thread(t) => Arc::as_ptr(t) as usize,
            LuaValue::Channel(c) => c.as_ptr() as usize,
            LuaValue::LightUserData(u) => Arc::as_ptr(u) as usize,
            LuaValue::Native(g) => g.addr(),
            _ => 0,
        }
    }
}

impl Default for LuaValue {
    #[inline(always)]
    fn default() -> Self {
        LuaValue::Nil
    }
}

impl PartialEq for LuaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            // f64 compare so that NaN != NaN (IEEE 754)
            (LuaValue::Number(a), LuaValue::Number(b)) => a == b,
            (LuaValue::String(a), LuaValue::String(b)) => a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => Arc::ptr_eq(a, b),
            (LuaValue::Function(a), LuaValue::Function(b)) => Arc::ptr_eq(a, b),
            (LuaValue::UserData(a), LuaValue::UserData(b)) => Arc::ptr_eq(a, b),
            (LuaValue::Thread(a), LuaValue::Thread(b)) => Arc::ptr_eq(a, b),
            (LuaValue::Channel(a), LuaValue::Channel(b)) => a.same_channel(b),
            (LuaValue::LightUserData(a), LuaValue::LightUserData(b)) => Arc::ptr_eq(a, b),
            (LuaValue::Native(a), LuaValue::Native(b)) => a == b,
            _ => false,
        }
    }
}

// Tables can use float keys; NaN keys are rejected at the table layer,
// so the reflexivity hole never reaches a hash map.
impl Eq for LuaValue {}

impl Hash for LuaValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            LuaValue::Nil => {}
            LuaValue::Boolean(b) => b.hash(state),
            LuaValue::Number(n) => {
                // normalize -0.0 so it lands with 0.0, as required by eq
                let n = if *n == 0.0 { 0.0 } else { *n };
                n.to_bits().hash(state);
            }
            LuaValue::String(s) => s.as_bytes().hash(state),
            _ => self.ref_addr().hash(state),
        }
    }
}

impl std::fmt::Display for LuaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Number(n) => f.write_str(&lua_convert::number_to_string(*n)),
            LuaValue::String(s) => f.write_str(s),
            LuaValue::Table(_) => write!(f, "table: 0x{:x}", self.ref_addr()),
            LuaValue::Function(_) => write!(f, "function: 0x{:x}", self.ref_addr()),
            LuaValue::UserData(_) => write!(f, "userdata: 0x{:x}", self.ref_addr()),
            LuaValue::Thread(_) => write!(f, "thread: 0x{:x}", self.ref_addr()),
            LuaValue::Channel(_) => write!(f, "channel: 0x{:x}", self.ref_addr()),
            // a light userdata displays as plain userdata
            LuaValue::LightUserData(_) => write!(f, "userdata: 0x{:x}", self.ref_addr()),
            LuaValue::Native(_) => write!(f, "function: 0x{:x}", self.ref_addr()),
        }
    }
}

impl std::fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LuaValue::String(s) => write!(f, "\"{}\"", s),
            other => std::fmt::Display::fmt(other, f),
        }
    }
}

impl From<bool> for LuaValue {
    fn from(b: bool) -> Self {
        LuaValue::Boolean(b)
    }
}

impl From<f64> for LuaValue {
    fn from(n: f64) -> Self {
        LuaValue::Number(n)
    }
}

impl From<i64> for LuaValue {
    fn from(i: i64) -> Self {
        LuaValue::integer(i)
    }
}

impl From<&str> for LuaValue {
    fn from(s: &str) -> Self {
        LuaValue::String(SmolStr::new(s))
    }
}

impl From<String> for LuaValue {
    fn from(s: String) -> Self {
        LuaValue::String(SmolStr::new(s))
    }
}
