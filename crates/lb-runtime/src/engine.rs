use std::cell::RefCell;
use std::rc::Rc;

use lb_core::{
    ArgValue, CallFailure, CallbackKey, ExecutionError, LogLevel, LuaBridgeError, ReturnCode,
    DEFAULT_NAMESPACE,
};
use mlua::{Function, Lua, MultiValue, Result as LuaResult, Value};
use tracing::Level;

use crate::dispatch::{create_dispatcher, BridgeState, SharedState};
use crate::helpers::lua_bridge::{arg_to_value, value_to_result};
use crate::logging::{should_log, LOG_TARGET};
use crate::options::EngineOptions;
use crate::registry::HostFunction;
use crate::status::{run_outcome, translate_lua_error};

pub const NO_SCRIPT_MESSAGE: &str = "no script to execute";

const PRELUDE: &str = include_str!("prelude.lua");
const PRELUDE_CHUNK_NAME: &str = "=lb-prelude";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Loaded,
    Executed(ReturnCode),
}

/// One embedded Lua interpreter plus the functions scripts may call.
///
/// `close` consumes the engine, so no method can run after it; dropping the
/// engine releases the interpreter the same way.
pub struct LuaEngine {
    state: SharedState,
    install_namespace: Function,
    run_chunk: Function,
    dispatcher: Function,
    loaded: Vec<String>,
    compiled: Option<Function>,
    status: EngineState,
    lua: Lua,
}

impl LuaEngine {
    pub fn new() -> Result<Self, LuaBridgeError> {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Result<Self, LuaBridgeError> {
        let lua = Lua::new();
        let state: SharedState = Rc::new(RefCell::new(BridgeState::new(options.log_level)));

        let dispatcher = create_dispatcher(&lua, Rc::clone(&state)).map_err(prelude_error)?;
        let (install_namespace, run_chunk): (Function, Function) = lua
            .load(PRELUDE)
            .set_name(PRELUDE_CHUNK_NAME)
            .call(dispatcher.clone())
            .map_err(prelude_error)?;
        let installed: LuaResult<bool> = install_namespace.call(DEFAULT_NAMESPACE);
        installed.map_err(prelude_error)?;

        if let Some(limit) = options.memory_limit {
            lua.set_memory_limit(limit).map_err(|error| {
                LuaBridgeError::new("ENGINE_MEMORY_LIMIT_FAILED", error.to_string())
            })?;
        }

        if should_log(options.log_level, Level::INFO) {
            tracing::info!(target: LOG_TARGET, "created");
        }

        Ok(Self {
            state,
            install_namespace,
            run_chunk,
            dispatcher,
            loaded: Vec::new(),
            compiled: None,
            status: EngineState::Created,
            lua,
        })
    }

    /// Accepts `trace|all|debug|info|warn|error|fatal|off` in any case.
    /// Other values leave the level unchanged.
    pub fn set_log_level(&mut self, level: &str) {
        match LogLevel::parse(level) {
            Some(parsed) => self.state.borrow_mut().log_level = parsed,
            None => {
                if self.should_log(Level::DEBUG) {
                    tracing::debug!(target: LOG_TARGET, "ignoring log level \"{}\"", level);
                }
            }
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.state.borrow().log_level
    }

    /// Registers `name` in the default namespace.
    pub fn register_function<F>(&mut self, name: &str, function: F) -> Result<(), LuaBridgeError>
    where
        F: Fn(&[ArgValue]) -> Result<i32, LuaBridgeError> + 'static,
    {
        self.register_shared(DEFAULT_NAMESPACE, name, Rc::new(function))
    }

    /// Registers `name` under `namespace`.
    ///
    /// The namespace becomes a guest global. A namespace named like an
    /// existing global such as `string` replaces it for every later script;
    /// this is logged at warn.
    pub fn register_namespaced_function<F>(
        &mut self,
        namespace: &str,
        name: &str,
        function: F,
    ) -> Result<(), LuaBridgeError>
    where
        F: Fn(&[ArgValue]) -> Result<i32, LuaBridgeError> + 'static,
    {
        self.register_shared(namespace, name, Rc::new(function))
    }

    /// Registers a handle the host keeps a reference to.
    ///
    /// Also publishes the namespace as a guest global so `namespace:name()`
    /// resolves inside scripts.
    pub fn register_shared(
        &mut self,
        namespace: &str,
        name: &str,
        function: Rc<dyn HostFunction>,
    ) -> Result<(), LuaBridgeError> {
        let key = CallbackKey::new(namespace, name);
        let replaced = self.state.borrow_mut().registry.register(key.clone(), function);
        if self.should_log(Level::DEBUG) {
            tracing::debug!(
                target: LOG_TARGET,
                "registered function: {} (replaced={})",
                key,
                replaced
            );
        }

        let shadowed = self.publish_namespace(namespace)?;
        if shadowed && self.should_log(Level::WARN) {
            tracing::warn!(
                target: LOG_TARGET,
                "namespace \"{}\" replaces an existing global",
                namespace
            );
        }
        Ok(())
    }

    /// Compiles `script` on its own, named by its source, and makes it the
    /// chunk `execute` runs next.
    ///
    /// On failure the history and the previously compiled chunk are kept.
    pub fn load(&mut self, script: &str) -> Result<(), ExecutionError> {
        if self.should_log(Level::TRACE) {
            tracing::trace!(target: LOG_TARGET, "load script:\n'''\n{}\n'''", script);
        }

        let compiled = self.lua.load(script).set_name(script).into_function();
        match compiled {
            Ok(function) => {
                self.loaded.push(script.to_string());
                self.compiled = Some(function);
                self.status = EngineState::Loaded;
                Ok(())
            }
            Err(error) => Err(self.fail("load()", translate_lua_error(&error))),
        }
    }

    pub fn execute_script(&mut self, script: &str) -> Result<(), ExecutionError> {
        self.load(script)?;
        self.execute()
    }

    /// Runs the most recently loaded chunk to completion on the calling thread.
    pub fn execute(&mut self) -> Result<(), ExecutionError> {
        let Some(chunk) = self.compiled.clone() else {
            return Err(self.fail(
                "execute()",
                ExecutionError::new(ReturnCode::RuntimeError, NO_SCRIPT_MESSAGE),
            ));
        };

        if self.should_log(Level::TRACE) {
            tracing::trace!(
                target: LOG_TARGET,
                "execute script: size={}",
                self.source().map_or(0, str::len)
            );
        }

        let outcome: LuaResult<(bool, bool, Value)> = self.run_chunk.call(chunk);
        let record = match outcome {
            Ok((ok, handled, err)) => run_outcome(ok, handled, err),
            Err(error) => translate_lua_error(&error),
        };
        self.status = EngineState::Executed(record.code);
        record
            .into_result()
            .map_err(|error| self.fail("pcall()", error))
    }

    /// Calls a registered function from the host through the dispatcher.
    pub fn invoke(
        &mut self,
        namespace: &str,
        name: &str,
        args: &[ArgValue],
    ) -> Result<i32, ExecutionError> {
        let frame = match self.build_frame(namespace, name, args) {
            Ok(frame) => frame,
            Err(error) => return Err(self.fail("invoke()", translate_lua_error(&error))),
        };

        let result: LuaResult<Value> = self.dispatcher.call(frame);
        match result {
            Ok(value) => value_to_result(&value).map_err(|error| {
                self.fail(
                    "invoke()",
                    ExecutionError::from_failure(CallFailure::Marshal(error)),
                )
            }),
            Err(error) => Err(self.fail("invoke()", translate_lua_error(&error))),
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    pub fn state(&self) -> EngineState {
        self.status
    }

    /// Source of the chunk `execute` runs.
    pub fn source(&self) -> Option<&str> {
        self.loaded.last().map(String::as_str)
    }

    /// Every successfully loaded script, oldest first.
    pub fn history(&self) -> &[String] {
        &self.loaded
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.state.borrow().registry.namespaces()
    }

    pub fn close(self) {}

    /// Publishes the namespace proxy; `true` when a foreign global was replaced.
    fn publish_namespace(&self, namespace: &str) -> Result<bool, LuaBridgeError> {
        let installed: LuaResult<bool> = self.install_namespace.call(namespace);
        installed.map_err(|error| {
            LuaBridgeError::new(
                "ENGINE_NAMESPACE_INSTALL_FAILED",
                format!("Namespace \"{}\" could not be installed: {}", namespace, error),
            )
        })
    }

    fn build_frame(
        &self,
        namespace: &str,
        name: &str,
        args: &[ArgValue],
    ) -> LuaResult<MultiValue> {
        let mut frame = Vec::with_capacity(args.len() + 2);
        frame.push(Value::String(self.lua.create_string(namespace)?));
        frame.push(Value::String(self.lua.create_string(name)?));
        for arg in args {
            frame.push(arg_to_value(&self.lua, arg)?);
        }
        Ok(frame.into_iter().collect())
    }

    fn fail(&mut self, operation: &str, error: ExecutionError) -> ExecutionError {
        if self.should_log(Level::ERROR) {
            tracing::error!(
                target: LOG_TARGET,
                "{}: code={}, message={}",
                operation,
                error.code.raw(),
                error.message
            );
        }
        self.state.borrow_mut().last_error = Some(error.message.clone());
        error
    }

    fn should_log(&self, level: Level) -> bool {
        should_log(self.log_level(), level)
    }
}

impl Drop for LuaEngine {
    fn drop(&mut self) {
        if self.should_log(Level::INFO) {
            tracing::info!(target: LOG_TARGET, "destroyed");
        }
    }
}

fn prelude_error(error: mlua::Error) -> LuaBridgeError {
    LuaBridgeError::new("ENGINE_PRELUDE_FAILED", error.to_string())
}

#[cfg(test)]
mod tests;
