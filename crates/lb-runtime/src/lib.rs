//! Embeds a Lua interpreter and lets scripts call host functions grouped
//! into namespaces with `ns:func(args...)`.
//!
//! Every [`LuaEngine`] owns an independent interpreter. Engines are `!Send`:
//! use one engine per thread.

mod dispatch;
mod engine;
mod helpers;
mod logging;
mod options;
mod registry;
mod status;

pub use engine::{EngineState, LuaEngine, NO_SCRIPT_MESSAGE};
pub use options::{EngineOptions, LOG_LEVEL_ENV, MEMORY_LIMIT_ENV};
pub use registry::{CallbackRegistry, HostFunction};

pub use lb_core::{
    ArgValue, CallFailure, CallbackKey, ExecutionError, LogLevel, LuaBridgeError, MarshalError,
    ReturnCode, DEFAULT_NAMESPACE,
};
