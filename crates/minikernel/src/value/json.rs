//! JSON forms of runtime values
//!
//! The generic form follows Flask's `jsonify`; DataFrames use the column
//! oriented form pandas' `to_json()` emits.

use polars::prelude::DataFrame;
use serde_json::{Map, Number, Value as JsonValue};

use super::{Value, format_float};
use crate::eval::EvalError;
use crate::frame;

impl Value {
    /// Generic JSON form. DataFrames are only accepted at the top level via
    /// [`frame_to_json`].
    pub fn to_json(&self) -> Result<JsonValue, EvalError> {
        Ok(match self {
            Value::None => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::Float(f) => float_json(*f),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::List(items) => json_array(&items.snapshot())?,
            Value::Tuple(items) => json_array(items)?,
            Value::Range(range) => {
                JsonValue::Array(range.to_values().into_iter().map(JsonValue::from).collect())
            }
            Value::Dict(dict) => {
                let mut map = Map::new();
                for (key, value) in dict.snapshot().iter() {
                    map.insert(json_key(key)?, value.to_json()?);
                }
                JsonValue::Object(map)
            }
            other => {
                return Err(EvalError::TypeError(format!(
                    "Object of type {} is not JSON serializable",
                    other.type_name()
                )));
            }
        })
    }
}

fn json_array(items: &[Value]) -> Result<JsonValue, EvalError> {
    Ok(JsonValue::Array(
        items
            .iter()
            .map(Value::to_json)
            .collect::<Result<_, _>>()?,
    ))
}

/// `{column: {"0": v0, "1": v1, ...}}`
pub fn frame_to_json(df: &DataFrame) -> Result<JsonValue, EvalError> {
    let mut columns = Map::new();
    for column in df.get_columns() {
        let mut rows = Map::new();
        for index in 0..df.height() {
            let value = frame::any_to_value(column.get(index)?);
            rows.insert(index.to_string(), value.to_json()?);
        }
        columns.insert(column.name().to_string(), JsonValue::Object(rows));
    }
    Ok(JsonValue::Object(columns))
}

/// Non-finite floats have no JSON spelling.
pub(crate) fn float_json(value: f64) -> JsonValue {
    Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}

fn json_key(key: &Value) -> Result<String, EvalError> {
    match key {
        Value::Str(s) => Ok(s.clone()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Float(f) => Ok(format_float(*f)),
        Value::Bool(b) => Ok(b.to_string()),
        Value::None => Ok("null".to_string()),
        other => Err(EvalError::TypeError(format!(
            "keys must be str, int, float, bool or None, not {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dict;
    use polars::df;
    use serde_json::json;

    #[test]
    fn generic_form() {
        let mut dict = Dict::new();
        dict.insert(Value::Str("a".into()), Value::Tuple(vec![Value::Int(1), Value::None]))
            .unwrap();
        dict.insert(Value::Int(2), Value::Float(f64::NAN)).unwrap();
        assert_eq!(
            Value::dict(dict).to_json().unwrap(),
            json!({"a": [1, null], "2": null})
        );
    }

    #[test]
    fn bytes_are_not_serializable() {
        let err = Value::Bytes(vec![1]).to_json().unwrap_err();
        assert!(err.to_string().contains("bytes"));
    }

    #[test]
    fn tabular_form_is_column_oriented() {
        let df = df! {
            "name" => &["alice", "bob"],
            "age" => &[30i64, 40],
        }
        .unwrap();
        assert_eq!(
            frame_to_json(&df).unwrap(),
            json!({
                "name": {"0": "alice", "1": "bob"},
                "age": {"0": 30, "1": 40},
            })
        );
    }
}
