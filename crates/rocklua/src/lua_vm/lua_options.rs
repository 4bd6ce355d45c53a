#[derive(Debug, Clone)]
pub struct LuaOptions {
    /// Initial register file size per thread.
    pub registry_size: usize,
    /// Hard cap on the register file.
    pub max_registry_size: usize,
    /// Maximum call-frame nesting.
    pub max_call_depth: usize,
}

impl Default for LuaOptions {
    fn default() -> Self {
        Self {
            registry_size: 256,
            max_registry_size: 1_000_000,
            max_call_depth: 256,
        }
    }
}
