//! Converts a decoded `Value` into a boxed `ToSql` parameter so the query
//! compiler's intermediate representation stays storage-agnostic while the
//! driver layer still gets native typed binding instead of all-text params.

use pgcat_core::types::Value;
use tokio_postgres::types::{ToSql, Type};

pub type BoxedParam = Box<dyn ToSql + Sync + Send>;

pub fn to_sql_param(value: &Value) -> BoxedParam {
    match value {
        Value::Null => Box::new(Option::<bool>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Int(i) => Box::new(*i),
        Value::Float(f) => Box::new(*f),
        Value::Numeric(s) => Box::new(s.clone()),
        Value::Text(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Uuid(u) => Box::new(*u),
        Value::Timestamp(t) => Box::new(*t),
        Value::Date(d) => Box::new(*d),
        Value::Time(t) => Box::new(*t),
        Value::Json(j) => Box::new(j.clone()),
        Value::Array(items) => Box::new(items.iter().map(Value::to_json).collect::<Vec<_>>()),
        Value::Composite(_) => Box::new(value.to_json()),
    }
}

/// Best-effort wire type hint for a parameter, used only to help
/// `tokio_postgres` pick the right cast when the server can't infer one
/// (e.g. a bare `NULL` parameter).
pub fn sql_type_hint(value: &Value) -> Type {
    match value {
        Value::Null => Type::UNKNOWN,
        Value::Bool(_) => Type::BOOL,
        Value::Int(_) => Type::INT8,
        Value::Float(_) => Type::FLOAT8,
        Value::Numeric(_) => Type::NUMERIC,
        Value::Text(_) => Type::TEXT,
        Value::Bytes(_) => Type::BYTEA,
        Value::Uuid(_) => Type::UUID,
        Value::Timestamp(_) => Type::TIMESTAMPTZ,
        Value::Date(_) => Type::DATE,
        Value::Time(_) => Type::TIME,
        Value::Json(_) => Type::JSONB,
        Value::Array(_) => Type::JSONB,
        Value::Composite(_) => Type::JSONB,
    }
}
