use anyhow::{anyhow, Result};
use rusqlite::types::ValueRef;
use serde_json::{Number, Value};

/// Quotes a table or column name so names with spaces ("Main data") and
/// embedded quotes are safe to splice into SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

/// Maps one SQLite cell onto the JSON value space used by raw records.
pub fn cell_to_json(cell: ValueRef<'_>, column: &str) -> Result<Value, String> {
    match cell {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(v) => Ok(Value::Number(v.into())),
        ValueRef::Real(v) => Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| format!("column '{column}' holds non-finite real {v}")),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::String(text.to_string()))
            .map_err(|_| format!("column '{column}' holds non-UTF-8 text")),
        ValueRef::Blob(_) => Err(format!("column '{column}' holds a blob")),
    }
}
