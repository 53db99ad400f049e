pub mod code;
pub mod error;
pub mod types;
pub mod value;

pub use code::{translate, ReturnCode};
pub use error::{
    CallFailure, DiagnosticLocation, ExecutionError, LuaBridgeError, MarshalError,
};
pub use types::*;
pub use value::*;
