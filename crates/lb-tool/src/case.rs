use lb_core::{ArgValue, LuaBridgeError, ReturnCode, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "lb-tool-case.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default = "default_executions")]
    pub executions: usize,
    #[serde(default)]
    pub functions: Vec<HostFunctionSpec>,
    #[serde(default)]
    pub expected_calls: Vec<ExpectedCall>,
    #[serde(default)]
    pub expected_outcome: ExpectedOutcome,
}

fn default_executions() -> usize {
    1
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// A recording host function; returns `result` or fails with `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostFunctionSpec {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub result: i32,
    #[serde(default)]
    pub error: Option<HostErrorSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostErrorSpec {
    pub code: String,
    pub message: String,
}

impl From<&HostErrorSpec> for LuaBridgeError {
    fn from(spec: &HostErrorSpec) -> Self {
        LuaBridgeError::new(spec.code.clone(), spec.message.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedCall {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub args: Vec<ArgValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedOutcome {
    pub code: ReturnCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_contains: Option<String>,
}

impl Default for ExpectedOutcome {
    fn default() -> Self {
        Self {
            code: ReturnCode::Ok,
            message: None,
            message_contains: None,
        }
    }
}

impl ExpectedOutcome {
    pub fn matches(&self, code: ReturnCode, message: &str) -> bool {
        self.code == code
            && self.message.as_deref().map_or(true, |text| text == message)
            && self
                .message_contains
                .as_deref()
                .map_or(true, |text| message.contains(text))
    }
}
