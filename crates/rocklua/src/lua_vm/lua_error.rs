use thiserror::Error;

pub type LuaResult<T> = Result<T, LuaError>;

/// Structured script-error taxonomy.
///
/// Every variant except `Construction` is an ordinary script error: it is
/// raised through the same channel the interpreter uses for runtime errors
/// and a `pcall`-style boundary may catch it. `Construction` marks a
/// defective embedding (a native function built without an implementation)
/// and must be rethrown by protected-call boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LuaError {
    /// Wrong-variant argument at a 1-based position.
    #[error("bad argument #{index} ({expected} expected, got {found})")]
    ArgTypeMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// Checked access below argument 1.
    #[error("argument #{index} not found")]
    ArgNotFound { index: usize },

    /// Checked access past the supplied arguments.
    #[error("argument #{index} out of range")]
    ArgOutOfRange { index: usize },

    /// Bare-value check failure (no argument position).
    #[error("{expected} expected, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A light userdata's wrapped object lacks a requested capability.
    #[error("{name} is not IO, got type {type_name}")]
    CapabilityMismatch { name: String, type_name: String },

    /// RaiseError surface: an arbitrary script-visible message.
    #[error("{0}")]
    Runtime(String),

    /// Cooperative cancellation observed.
    #[error("operation cancelled")]
    Cancelled,

    /// Register file or call-frame depth limit hit.
    #[error("stack overflow")]
    StackOverflow,

    /// Send or receive on a closed channel.
    #[error("channel is closed")]
    ChannelClosed,

    /// Native function adapter without an implementation.
    #[error("invalid GFunction: {0}")]
    Construction(&'static str),
}

impl LuaError {
    pub fn runtime(msg: impl Into<String>) -> Self {
        LuaError::Runtime(msg.into())
    }

    /// False only for programming-defect errors that protected-call
    /// boundaries must not swallow.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, LuaError::Construction(_))
    }
}
