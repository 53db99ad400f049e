use std::cell::RefCell;
use std::rc::Rc;

use lb_core::{arg_value_to_text, CallFailure, LogLevel};
use mlua::{Error as LuaError, Function, Lua, MultiValue, Result as LuaResult, Value};
use tracing::Level;

use crate::helpers::lua_bridge::{dump_values, result_to_value, values_to_args};
use crate::logging::{should_log, LOG_TARGET};
use crate::registry::CallbackRegistry;

/// Engine state the dispatcher needs while a script runs.
#[derive(Debug, Default)]
pub(crate) struct BridgeState {
    pub(crate) registry: CallbackRegistry,
    pub(crate) last_error: Option<String>,
    pub(crate) log_level: LogLevel,
}

impl BridgeState {
    pub(crate) fn new(log_level: LogLevel) -> Self {
        Self {
            log_level,
            ..Self::default()
        }
    }
}

pub(crate) type SharedState = Rc<RefCell<BridgeState>>;

/// Creates the single native entry point for `ns:func(...)` calls.
///
/// The call frame is `(namespace, name, args...)`.
pub(crate) fn create_dispatcher(lua: &Lua, state: SharedState) -> LuaResult<Function> {
    lua.create_function(move |_, frame: MultiValue| dispatch(&state, frame))
}

fn dispatch(state: &SharedState, frame: MultiValue) -> LuaResult<Value> {
    let log_level = state.borrow().log_level;
    let mut values = frame.into_iter();
    let namespace = frame_string(values.next(), "namespace")?;
    let name = frame_string(values.next(), "function name")?;
    let trailing = values.collect::<Vec<_>>();

    if should_log(log_level, Level::TRACE) {
        tracing::trace!(
            target: LOG_TARGET,
            "call frame: function={}:{}\n{}",
            namespace,
            name,
            dump_values(&trailing)
        );
    }

    let args = values_to_args(&trailing)
        .map_err(|error| fail(state, log_level, CallFailure::Marshal(error)))?;

    if should_log(log_level, Level::DEBUG) {
        for (index, arg) in args.iter().enumerate() {
            tracing::debug!(
                target: LOG_TARGET,
                "{} argument {}: value={}",
                arg.type_name(),
                index + 1,
                arg_value_to_text(arg)
            );
        }
    }

    let handle = state.borrow().registry.resolve(&namespace, &name);
    let Some(handle) = handle else {
        return Err(fail(
            state,
            log_level,
            CallFailure::FunctionNotFound { namespace, name },
        ));
    };

    match handle.call(&args) {
        Ok(result) => {
            if should_log(log_level, Level::INFO) {
                tracing::info!(
                    target: LOG_TARGET,
                    "host function {}:{} called: result={}",
                    namespace,
                    name,
                    result
                );
            }
            Ok(result_to_value(result))
        }
        Err(error) => Err(fail(
            state,
            log_level,
            CallFailure::HostFunction {
                namespace,
                name,
                error,
            },
        )),
    }
}

fn frame_string(value: Option<Value>, what: &str) -> LuaResult<String> {
    match value {
        Some(Value::String(text)) => text
            .to_str()
            .map(|text| text.to_string())
            .map_err(|_| LuaError::RuntimeError(format!("{} must be a valid UTF-8 string", what))),
        Some(other) => Err(LuaError::RuntimeError(format!(
            "{} must be a string, got {}",
            what,
            other.type_name()
        ))),
        None => Err(LuaError::RuntimeError(format!(
            "{} must be a string, got no value",
            what
        ))),
    }
}

fn fail(state: &SharedState, log_level: LogLevel, failure: CallFailure) -> LuaError {
    let message = failure.to_string();
    if should_log(log_level, Level::ERROR) {
        tracing::error!(target: LOG_TARGET, "dispatch failed: {}", message);
    }
    state.borrow_mut().last_error = Some(message);
    LuaError::external(failure)
}
