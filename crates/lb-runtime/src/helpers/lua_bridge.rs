use lb_core::{ArgValue, MarshalError};
use mlua::{Integer, Lua, Result as LuaResult, Value};

/// Guest value to host value; `position` is 1-based among the call arguments.
pub(crate) fn value_to_arg(value: &Value, position: usize) -> Result<ArgValue, MarshalError> {
    match value {
        Value::Nil => Ok(ArgValue::Nil),
        Value::Boolean(value) => Ok(ArgValue::Bool(*value)),
        Value::Integer(value) => Ok(ArgValue::Number(*value as f64)),
        Value::Number(value) => Ok(ArgValue::Number(*value)),
        Value::String(value) => value
            .to_str()
            .map(|text| ArgValue::String(text.to_string()))
            .map_err(|_| MarshalError::InvalidUtf8 { position }),
        other => Err(MarshalError::UnsupportedType {
            position,
            type_name: other.type_name().to_string(),
        }),
    }
}

pub(crate) fn values_to_args(values: &[Value]) -> Result<Vec<ArgValue>, MarshalError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| value_to_arg(value, index + 1))
        .collect()
}

pub(crate) fn arg_to_value(lua: &Lua, value: &ArgValue) -> LuaResult<Value> {
    match value {
        ArgValue::Nil => Ok(Value::Nil),
        ArgValue::Bool(value) => Ok(Value::Boolean(*value)),
        ArgValue::Number(value) => Ok(Value::Number(*value)),
        ArgValue::String(value) => lua.create_string(value).map(Value::String),
    }
}

pub(crate) fn result_to_value(result: i32) -> Value {
    Value::Integer(Integer::from(result))
}

pub(crate) fn value_to_result(value: &Value) -> Result<i32, MarshalError> {
    let unsupported = || MarshalError::UnsupportedResult {
        type_name: value.type_name().to_string(),
    };
    match value {
        Value::Integer(value) => i32::try_from(*value).map_err(|_| unsupported()),
        Value::Number(value)
            if value.fract() == 0.0
                && *value >= f64::from(i32::MIN)
                && *value <= f64::from(i32::MAX) =>
        {
            Ok(*value as i32)
        }
        _ => Err(unsupported()),
    }
}

/// One line per value: `index<TAB>type<TAB>value`.
pub(crate) fn dump_values(values: &[Value]) -> String {
    let mut out = String::new();
    for (index, value) in values.iter().enumerate() {
        let rendered = match value {
            Value::Nil => "nil".to_string(),
            Value::Boolean(value) => value.to_string(),
            Value::Integer(value) => value.to_string(),
            Value::Number(value) => value.to_string(),
            Value::String(value) => value.to_string_lossy().to_string(),
            other => format!("{:p}", other.to_pointer()),
        };
        out.push_str(&format!(
            "{}\t{}\t{}\n",
            index + 1,
            value.type_name(),
            rendered
        ));
    }
    out
}
