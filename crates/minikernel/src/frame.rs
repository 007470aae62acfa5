//! DataFrame helpers: construction from workspace values, cell conversion,
//! and file loading

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use polars::prelude::*;

use crate::eval::EvalError;
use crate::value::{Dict, Value};

/// Build a DataFrame from `{"column": [values...]}`.
pub fn from_dict(dict: &Dict) -> Result<DataFrame, EvalError> {
    let mut columns = Vec::with_capacity(dict.len());
    for (key, values) in dict.iter() {
        let Value::Str(name) = key else {
            return Err(EvalError::TypeError(format!(
                "DataFrame column names must be str, not {}",
                key.type_name()
            )));
        };
        let items = match values {
            Value::List(_) | Value::Tuple(_) => values.sequence_items().unwrap_or_default(),
            Value::Range(range) => range.to_values().into_iter().map(Value::Int).collect(),
            other => {
                return Err(EvalError::TypeError(format!(
                    "column '{name}' must be a list, not {}",
                    other.type_name()
                )));
            }
        };
        columns.push(column_from_values(name, &items)?);
    }
    Ok(DataFrame::new(columns)?)
}

/// Infer one column's dtype from its values (None becomes null).
fn column_from_values(name: &str, items: &[Value]) -> Result<Column, EvalError> {
    let present = || items.iter().filter(|v| !matches!(v, Value::None));
    let name = PlSmallStr::from(name);

    if present().all(|v| matches!(v, Value::Bool(_))) {
        let values: Vec<Option<bool>> = items
            .iter()
            .map(|v| match v {
                Value::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Ok(Column::new(name, values));
    }
    if present().all(|v| matches!(v, Value::Int(_) | Value::Bool(_))) {
        let values: Vec<Option<i64>> = items.iter().map(Value::as_int).collect();
        return Ok(Column::new(name, values));
    }
    if present().all(|v| v.as_float().is_some()) {
        let values: Vec<Option<f64>> = items.iter().map(Value::as_float).collect();
        return Ok(Column::new(name, values));
    }
    if present().all(|v| matches!(v, Value::Str(_))) {
        let values: Vec<Option<String>> = items
            .iter()
            .map(|v| match v {
                Value::Str(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        return Ok(Column::new(name, values));
    }
    Err(EvalError::TypeError(format!(
        "column '{name}' mixes value types that a DataFrame column cannot hold"
    )))
}

/// Convert one cell to a workspace value.
pub fn any_to_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::None,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::Str(s.to_string()),
        AnyValue::StringOwned(s) => Value::Str(s.to_string()),
        AnyValue::Int8(n) => Value::Int(n.into()),
        AnyValue::Int16(n) => Value::Int(n.into()),
        AnyValue::Int32(n) => Value::Int(n.into()),
        AnyValue::Int64(n) => Value::Int(n),
        AnyValue::UInt8(n) => Value::Int(n.into()),
        AnyValue::UInt16(n) => Value::Int(n.into()),
        AnyValue::UInt32(n) => Value::Int(n.into()),
        AnyValue::UInt64(n) => i64::try_from(n).map_or(Value::Float(n as f64), Value::Int),
        AnyValue::Float32(f) => Value::Float(f.into()),
        AnyValue::Float64(f) => Value::Float(f),
        other => Value::Str(other.to_string()),
    }
}

/// All values of one column, in row order.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Value>, EvalError> {
    let column = df
        .column(name)
        .map_err(|_| EvalError::KeyError(format!("'{name}'")))?;
    (0..column.len())
        .map(|index| Ok(any_to_value(column.get(index)?)))
        .collect()
}

/// Column name to the type name of that column's value in the first row.
///
/// A missing value in a numeric column is a float NaN, as it is in pandas.
/// `None` when the frame has no rows.
pub fn first_row_types(df: &DataFrame) -> Result<Option<IndexMap<String, String>>, EvalError> {
    if df.height() == 0 {
        return Ok(None);
    }
    let mut types = IndexMap::with_capacity(df.width());
    for column in df.get_columns() {
        let type_name = match column.get(0)? {
            AnyValue::Null if column.dtype().is_primitive_numeric() => "float",
            value => any_to_value(value).type_name(),
        };
        types.insert(column.name().to_string(), type_name.to_string());
    }
    Ok(Some(types))
}

/// Load a DataFrame from a parquet, csv or ipc file (sync, collects immediately)
pub fn load_file_sync(path: &Path) -> Result<DataFrame, PolarsError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => read_parquet(path),
        Some("csv") => read_csv(path),
        Some("ipc" | "arrow") => {
            LazyFrame::scan_ipc(local(path), Default::default(), Default::default())?.collect()
        }
        Some(ext) => Err(PolarsError::ComputeError(
            format!("unsupported file extension: {ext}").into(),
        )),
        None => Err(PolarsError::ComputeError(
            "file has no extension".to_string().into(),
        )),
    }
}

pub fn read_csv(path: &Path) -> Result<DataFrame, PolarsError> {
    LazyCsvReader::new(local(path)).finish()?.collect()
}

pub fn read_parquet(path: &Path) -> Result<DataFrame, PolarsError> {
    LazyFrame::scan_parquet(local(path), Default::default())?.collect()
}

fn local(path: &Path) -> PlPath {
    PlPath::Local(Arc::from(path))
}

/// `df[["a", "b"]]`; an unknown name is a KeyError.
pub fn select(df: &DataFrame, names: &[&str]) -> Result<DataFrame, EvalError> {
    if let Some(missing) = names.iter().find(|name| df.get_column_index(name).is_none()) {
        return Err(EvalError::KeyError(format!("['{missing}'] not in index")));
    }
    Ok(df.select(names.iter().copied())?)
}

/// `df["name"] = value`: a list fills the column row by row, anything else
/// is broadcast to every row.
pub fn set_column(df: &mut DataFrame, name: &str, value: &Value) -> Result<(), EvalError> {
    let items = match value {
        Value::List(_) | Value::Tuple(_) => value.sequence_items().unwrap_or_default(),
        Value::Range(range) => range.to_values().into_iter().map(Value::Int).collect(),
        Value::DataFrame(_) | Value::Dict(_) => {
            return Err(EvalError::TypeError(format!(
                "cannot assign a {} to a DataFrame column",
                value.type_name()
            )));
        }
        scalar => vec![scalar.clone(); df.height()],
    };
    if df.width() > 0 && items.len() != df.height() {
        return Err(EvalError::ValueError(format!(
            "Length of values ({}) does not match length of index ({})",
            items.len(),
            df.height()
        )));
    }
    let column = column_from_values(name, &items)?;
    df.with_column(column)?;
    Ok(())
}

/// Workspace name for a loaded file (its stem)
pub fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
