// Thread/global scaffolding: error taxonomy, register file, call frames,
// and the LuaState/Global pair the native-call convention runs against.

mod lua_call_frame;
mod lua_error;
mod lua_options;
mod lua_state;
mod registry;

pub use lua_call_frame::{CallFrameStack, LuaCallFrame, MULTRET};
pub use lua_error::{LuaError, LuaResult};
pub use lua_options::LuaOptions;
pub use lua_state::{CancelToken, Global, LuaState};
pub use registry::Registry;
