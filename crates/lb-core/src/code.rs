use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

/// Outcome of a compile or run operation, as reported by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnCode {
    #[serde(rename = "LUA_OK")]
    Ok,
    #[serde(rename = "LUA_YIELD")]
    Yield,
    #[serde(rename = "LUA_ERRRUN")]
    RuntimeError,
    #[serde(rename = "LUA_ERRSYNTAX")]
    SyntaxError,
    #[serde(rename = "LUA_ERRMEM")]
    MemoryError,
    #[serde(rename = "LUA_ERRERR")]
    InternalError,
}

impl ReturnCode {
    pub const ALL: [ReturnCode; 6] = [
        Self::Ok,
        Self::Yield,
        Self::RuntimeError,
        Self::SyntaxError,
        Self::MemoryError,
        Self::InternalError,
    ];

    pub const fn raw(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Yield => 1,
            Self::RuntimeError => 2,
            Self::SyntaxError => 3,
            Self::MemoryError => 4,
            Self::InternalError => 5,
        }
    }

    pub fn from_raw(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.raw() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "LUA_OK",
            Self::Yield => "LUA_YIELD",
            Self::RuntimeError => "LUA_ERRRUN",
            Self::SyntaxError => "LUA_ERRSYNTAX",
            Self::MemoryError => "LUA_ERRMEM",
            Self::InternalError => "LUA_ERRERR",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the error record for a raw interpreter return code.
///
/// The diagnostic is kept byte-for-byte. A code outside the interpreter's
/// table never falls back to a default kind: it yields an `InternalError`
/// naming the offending value instead.
pub fn translate(code: i32, diagnostic: impl Into<String>) -> ExecutionError {
    match ReturnCode::from_raw(code) {
        Some(code) => ExecutionError::new(code, diagnostic),
        None => ExecutionError::new(
            ReturnCode::InternalError,
            format!("unknown interpreter return code: {}", code),
        ),
    }
}
