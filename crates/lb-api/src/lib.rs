use std::rc::Rc;

use thiserror::Error;

pub use lb_core::{
    ArgValue, CallFailure, CallbackKey, DiagnosticLocation, ExecutionError, LogLevel,
    LuaBridgeError, MarshalError, ReturnCode, DEFAULT_NAMESPACE,
};
pub use lb_runtime::{
    CallbackRegistry, EngineOptions, EngineState, HostFunction, LuaEngine, LOG_LEVEL_ENV,
    MEMORY_LIMIT_ENV, NO_SCRIPT_MESSAGE,
};

#[derive(Clone, Default)]
pub struct CreateEngineOptions {
    pub options: EngineOptions,
    pub functions: Vec<(CallbackKey, Rc<dyn HostFunction>)>,
    pub preload: Option<String>,
}

impl CreateEngineOptions {
    pub fn with_function<F>(mut self, namespace: &str, name: &str, function: F) -> Self
    where
        F: Fn(&[ArgValue]) -> Result<i32, LuaBridgeError> + 'static,
    {
        let function: Rc<dyn HostFunction> = Rc::new(function);
        self.functions
            .push((CallbackKey::new(namespace, name), function));
        self
    }
}

#[derive(Debug, Error)]
pub enum CreateEngineError {
    #[error(transparent)]
    Engine(#[from] LuaBridgeError),
    #[error("preload failed: {0}")]
    Preload(#[source] ExecutionError),
}

/// Builds an engine, registers `functions` in order and loads `preload`.
pub fn create_engine(options: CreateEngineOptions) -> Result<LuaEngine, CreateEngineError> {
    let mut engine = LuaEngine::with_options(options.options)?;

    for (key, function) in options.functions {
        engine.register_shared(&key.namespace, &key.name, function)?;
    }

    if let Some(script) = options.preload {
        engine.load(&script).map_err(CreateEngineError::Preload)?;
    }

    Ok(engine)
}
