use regex::Regex;
use thiserror::Error;

use crate::code::ReturnCode;

/// Host-side failure with a stable code, also returned by host functions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct LuaBridgeError {
    pub code: String,
    pub message: String,
}

impl LuaBridgeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error("unsupported argument type: '{type_name}' (argument {position})")]
    UnsupportedType { position: usize, type_name: String },
    #[error("argument {position} is not a valid UTF-8 string")]
    InvalidUtf8 { position: usize },
    #[error("unsupported result type: '{type_name}'")]
    UnsupportedResult { type_name: String },
}

/// Why the dispatcher unwound a guest call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallFailure {
    #[error("function not found: {namespace}:{name}")]
    FunctionNotFound { namespace: String, name: String },
    #[error("function {namespace}:{name} failed: {error}")]
    HostFunction {
        namespace: String,
        name: String,
        error: LuaBridgeError,
    },
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLocation {
    pub chunk: String,
    pub line: u32,
}

/// Typed failure of a load, execute or invoke call.
///
/// `message` carries the interpreter diagnostic unmodified. `failure` is set
/// when the run was unwound by the dispatcher rather than by guest code.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct ExecutionError {
    pub code: ReturnCode,
    pub message: String,
    #[source]
    pub failure: Option<CallFailure>,
}

impl ExecutionError {
    pub fn new(code: ReturnCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            failure: None,
        }
    }

    pub fn from_failure(failure: CallFailure) -> Self {
        Self {
            code: ReturnCode::RuntimeError,
            message: failure.to_string(),
            failure: Some(failure),
        }
    }

    pub fn into_result(self) -> Result<(), ExecutionError> {
        if self.code.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn is_function_not_found(&self) -> bool {
        matches!(self.failure, Some(CallFailure::FunctionNotFound { .. }))
    }

    pub fn host_error(&self) -> Option<&LuaBridgeError> {
        match &self.failure {
            Some(CallFailure::HostFunction { error, .. }) => Some(error),
            _ => None,
        }
    }

    /// Source position from a `[string "..."]:<line>:` prefix, if present.
    ///
    /// Compiles its pattern on every call; hoist the result out of hot loops.
    pub fn location(&self) -> Option<DiagnosticLocation> {
        let regex = Regex::new(r#"^\[string "(.*)"\]:(\d+):"#)
            .expect("diagnostic location regex must compile");
        let captures = regex.captures(&self.message)?;
        let line = captures.get(2)?.as_str().parse().ok()?;
        Some(DiagnosticLocation {
            chunk: captures.get(1)?.as_str().to_string(),
            line,
        })
    }
}
