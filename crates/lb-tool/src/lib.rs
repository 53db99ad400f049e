mod case;
mod runner;
mod source;

pub use case::{
    ExpectedCall, ExpectedOutcome, HostErrorSpec, HostFunctionSpec, TestCase, TESTCASE_SCHEMA_V1,
};
pub use runner::{assert_case, run_case, RunReport};
pub use source::{read_lua_sources, read_test_case, MAIN_SCRIPT};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LbToolError {
    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse testcase {path}: {source}")]
    ParseCase {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid testcase schema version \"{found}\", expected \"{expected}\".")]
    InvalidSchemaVersion { expected: String, found: String },
    #[error("No main.lua under {path}.")]
    MainMissing { path: PathBuf },
    #[error("Engine error: {0}")]
    Engine(#[from] lb_api::CreateEngineError),
    #[error("Invalid log level \"{value}\" in testcase.")]
    InvalidLogLevel { value: String },
    #[error("Expected call count {expected}, actual {actual}. observed={observed}")]
    CallCountMismatch {
        expected: usize,
        actual: usize,
        observed: String,
    },
    #[error("Call mismatch at index {index}. expected={expected} actual={actual}")]
    CallMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
    #[error("Outcome mismatch. expected={expected} actual={actual}")]
    OutcomeMismatch { expected: String, actual: String },
    #[error("Failed to serialize for diff: {0}")]
    Serialize(serde_json::Error),
}
