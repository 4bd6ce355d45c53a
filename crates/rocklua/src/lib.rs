// rocklua
// Value model and native-interop layer for an embeddable Lua-family
// runtime: the tagged LuaValue variant set, the pooled argument
// marshalling / native-call convention, and the rock/IO capability
// protocol for exposing host resources as script values.

pub mod ffi;
pub mod lua_value;
pub mod lua_vm;
pub mod rock;

pub use ffi::{Args, ArgsPool, GFunction, NativeFn, PooledArgs};
pub use lua_value::{
    FunctionProto, Logger, LuaChannel, LuaClosure, LuaFunction, LuaTable, LuaUserdata, LuaValue,
    LuaValueKind, TableRef,
};
pub use lua_vm::{
    CallFrameStack, CancelToken, Global, LuaCallFrame, LuaError, LuaOptions, LuaResult, LuaState,
    MULTRET, Registry,
};
pub use rock::{
    ExData, ExValue, Io, JsonWriter, LightUserdata, Rock, RockError, Status, StatusCell, Super,
    UserKV,
};
