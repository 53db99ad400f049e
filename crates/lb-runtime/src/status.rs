use lb_core::{translate, CallFailure, ExecutionError};
use mlua::{Error as LuaError, Value};

pub(crate) const LUA_OK: i32 = 0;
pub(crate) const LUA_ERRRUN: i32 = 2;
pub(crate) const LUA_ERRSYNTAX: i32 = 3;
pub(crate) const LUA_ERRMEM: i32 = 4;
pub(crate) const LUA_ERRERR: i32 = 5;

/// Error object Lua leaves behind when a message handler itself fails.
const ERROR_IN_ERROR_HANDLING: &str = "error in error handling";

/// Dispatcher failure carried by an error raised from a host callback.
pub(crate) fn find_call_failure(error: &LuaError) -> Option<&CallFailure> {
    match error {
        LuaError::CallbackError { cause, .. } => find_call_failure(cause),
        LuaError::ExternalError(inner) => inner.downcast_ref::<CallFailure>(),
        _ => None,
    }
}

pub(crate) fn translate_lua_error(error: &LuaError) -> ExecutionError {
    if let Some(failure) = find_call_failure(error) {
        return ExecutionError::from_failure(failure.clone());
    }
    match error {
        LuaError::SyntaxError { message, .. } => translate(LUA_ERRSYNTAX, message.as_str()),
        LuaError::RuntimeError(message) => translate(LUA_ERRRUN, message.as_str()),
        LuaError::MemoryError(message) => translate(LUA_ERRMEM, message.as_str()),
        LuaError::CallbackError { cause, .. } => translate_lua_error(cause),
        other => translate(LUA_ERRRUN, other.to_string()),
    }
}

/// Maps the `(ok, handled, err)` triple produced by the prelude runner.
///
/// `handled` is set only when the message handler ran, which Lua skips for
/// allocation failures and for failures of the handler itself.
pub(crate) fn run_outcome(ok: bool, handled: bool, err: Value) -> ExecutionError {
    if ok {
        return translate(LUA_OK, "");
    }
    if let Value::Error(error) = &err {
        return translate_lua_error(error);
    }

    let message = guest_error_message(&err);
    let code = if handled {
        LUA_ERRRUN
    } else if message == ERROR_IN_ERROR_HANDLING {
        LUA_ERRERR
    } else {
        LUA_ERRMEM
    };
    translate(code, message)
}

pub(crate) fn guest_error_message(value: &Value) -> String {
    match value {
        Value::String(text) => text.to_string_lossy().to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Number(value) => value.to_string(),
        other => format!("(error object is a {} value)", other.type_name()),
    }
}
