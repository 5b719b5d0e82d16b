//! Type Registry (spec.md §4.A): maps PostgreSQL type OIDs to semantic
//! `TypeDescriptor`s and decodes/encodes wire values against them. Rebuilt
//! from each `SchemaModel` so user-defined enums/composites/domains stay
//! current across a hot-swap.

use crate::error::{Error, Result};
use crate::schema::{SchemaModel, TypeCategoryHint, TypeCatalogEntry};
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Semantic classification of a PostgreSQL type, independent of its OID.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Boolean,
    Integer { width: u8 },
    Floating { width: u8 },
    Numeric { precision: Option<u32>, scale: Option<u32> },
    Text,
    Bytea,
    Timestamp { tz: bool },
    Date,
    Time,
    Interval,
    Uuid,
    Json,
    Jsonb,
    Array(Box<TypeDescriptor>),
    Enum { labels: Vec<String> },
    Composite { fields: Vec<(String, TypeDescriptor)> },
    Domain { base: Box<TypeDescriptor> },
    Range { of: Box<TypeDescriptor> },
    Unknown { raw_name: String },
}

impl TypeDescriptor {
    /// Whether `like`/`ilike` may be applied to values of this type,
    /// per the operator-typing rule in spec.md §4.C.2.
    pub fn is_text_like(&self) -> bool {
        match self {
            TypeDescriptor::Text | TypeDescriptor::Uuid => true,
            TypeDescriptor::Domain { base } => base.is_text_like(),
            _ => false,
        }
    }

    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Integer { .. }
                | TypeDescriptor::Floating { .. }
                | TypeDescriptor::Numeric { .. }
                | TypeDescriptor::Text
                | TypeDescriptor::Timestamp { .. }
                | TypeDescriptor::Date
                | TypeDescriptor::Time
                | TypeDescriptor::Uuid
        )
    }

    pub fn accepts_null_check(&self) -> bool {
        true // every attribute supports is_null / is_not_null
    }
}

/// A single decoded value flowing through resolvers. Replaces the source's
/// ad-hoc per-row objects (spec.md §9 Design Notes) with one flat sum type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(String),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Json(serde_json::Value),
    Array(Vec<Value>),
    Composite(Vec<(String, Value)>),
}

impl Value {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Numeric(s) => serde_json::Value::String(s.clone()),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            Value::Uuid(u) => serde_json::Value::String(u.to_string()),
            Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            Value::Date(d) => serde_json::Value::String(d.to_string()),
            Value::Time(t) => serde_json::Value::String(t.to_string()),
            Value::Json(j) => j.clone(),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Composite(fields) => {
                let mut map = serde_json::Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeRegistry {
    by_oid: HashMap<u32, TypeDescriptor>,
}

impl TypeRegistry {
    /// Rebuilds the registry from a fresh `SchemaModel`. Total function:
    /// every OID the model names resolves to a concrete descriptor, with
    /// builtin OIDs falling back to `tokio_postgres`'s static type table.
    pub fn from_schema_model(model: &SchemaModel) -> Self {
        let mut by_oid = HashMap::new();
        let entries: HashMap<u32, &TypeCatalogEntry> =
            model.types.iter().map(|t| (t.oid, t)).collect();

        for entry in model.types.iter() {
            let descriptor = Self::resolve(entry.oid, &entries, 0);
            by_oid.insert(entry.oid, descriptor);
        }

        Self { by_oid }
    }

    fn resolve(
        oid: u32,
        entries: &HashMap<u32, &TypeCatalogEntry>,
        depth: u8,
    ) -> TypeDescriptor {
        if depth > 16 {
            // Cycle guard: a composite/domain/array chain should never
            // nest this deep in a real catalog.
            return TypeDescriptor::Unknown {
                raw_name: "recursion_limit".to_string(),
            };
        }

        if let Some(builtin) = builtin_descriptor(oid) {
            return builtin;
        }

        let Some(entry) = entries.get(&oid) else {
            return TypeDescriptor::Unknown {
                raw_name: format!("oid:{oid}"),
            };
        };

        match entry.category {
            TypeCategoryHint::Enum => TypeDescriptor::Enum {
                labels: entry.enum_labels.clone(),
            },
            TypeCategoryHint::Composite => TypeDescriptor::Composite {
                fields: entry
                    .composite_fields
                    .iter()
                    .map(|(name, field_oid)| {
                        (name.clone(), Self::resolve(*field_oid, entries, depth + 1))
                    })
                    .collect(),
            },
            TypeCategoryHint::Domain => TypeDescriptor::Domain {
                base: Box::new(Self::resolve(
                    entry.base_oid.unwrap_or(oid),
                    entries,
                    depth + 1,
                )),
            },
            TypeCategoryHint::Range | TypeCategoryHint::Multirange => TypeDescriptor::Range {
                of: Box::new(Self::resolve(
                    entry.element_oid.unwrap_or(oid),
                    entries,
                    depth + 1,
                )),
            },
            TypeCategoryHint::Base | TypeCategoryHint::Pseudo => {
                if let Some(elem) = entry.element_oid {
                    TypeDescriptor::Array(Box::new(Self::resolve(elem, entries, depth + 1)))
                } else {
                    TypeDescriptor::Unknown {
                        raw_name: entry.name.clone(),
                    }
                }
            }
        }
    }

    /// Total function: unknown OIDs decay to `Unknown` rather than erroring.
    pub fn describe(&self, oid: u32) -> TypeDescriptor {
        if let Some(builtin) = builtin_descriptor(oid) {
            return builtin;
        }
        self.by_oid
            .get(&oid)
            .cloned()
            .unwrap_or(TypeDescriptor::Unknown {
                raw_name: format!("oid:{oid}"),
            })
    }

    pub fn decode_text(&self, oid: u32, text: &str) -> Result<Value> {
        let descriptor = self.describe(oid);
        decode_text_value(&descriptor, oid, text)
    }

    pub fn encode(&self, value: &Value, oid: u32) -> Result<String> {
        let descriptor = self.describe(oid);
        encode_value(&descriptor, oid, value)
    }

    /// Converts an inbound JSON scalar (from a filter value, a create body,
    /// or a callable argument) into a `Value` typed against `oid`. This is
    /// the counterpart to `decode_text` for values that arrive as JSON
    /// rather than as PostgreSQL wire text.
    pub fn from_json(&self, oid: u32, json: &serde_json::Value) -> Result<Value> {
        let descriptor = self.describe(oid);
        value_from_json(&descriptor, oid, json)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self {
            by_oid: HashMap::new(),
        }
    }
}

fn builtin_descriptor(oid: u32) -> Option<TypeDescriptor> {
    use tokio_postgres::types::Type;
    let ty = Type::from_oid(oid)?;
    Some(match ty {
        _ if ty == Type::BOOL => TypeDescriptor::Boolean,
        _ if ty == Type::INT2 => TypeDescriptor::Integer { width: 2 },
        _ if ty == Type::INT4 => TypeDescriptor::Integer { width: 4 },
        _ if ty == Type::INT8 => TypeDescriptor::Integer { width: 8 },
        _ if ty == Type::FLOAT4 => TypeDescriptor::Floating { width: 4 },
        _ if ty == Type::FLOAT8 => TypeDescriptor::Floating { width: 8 },
        _ if ty == Type::NUMERIC => TypeDescriptor::Numeric {
            precision: None,
            scale: None,
        },
        _ if ty == Type::TEXT || ty == Type::VARCHAR || ty == Type::BPCHAR || ty == Type::NAME => {
            TypeDescriptor::Text
        }
        _ if ty == Type::BYTEA => TypeDescriptor::Bytea,
        _ if ty == Type::TIMESTAMP => TypeDescriptor::Timestamp { tz: false },
        _ if ty == Type::TIMESTAMPTZ => TypeDescriptor::Timestamp { tz: true },
        _ if ty == Type::DATE => TypeDescriptor::Date,
        _ if ty == Type::TIME || ty == Type::TIMETZ => TypeDescriptor::Time,
        _ if ty == Type::INTERVAL => TypeDescriptor::Interval,
        _ if ty == Type::UUID => TypeDescriptor::Uuid,
        _ if ty == Type::JSON => TypeDescriptor::Json,
        _ if ty == Type::JSONB => TypeDescriptor::Jsonb,
        _ if ty == Type::INT4_ARRAY => TypeDescriptor::Array(Box::new(TypeDescriptor::Integer { width: 4 })),
        _ if ty == Type::INT8_ARRAY => TypeDescriptor::Array(Box::new(TypeDescriptor::Integer { width: 8 })),
        _ if ty == Type::TEXT_ARRAY || ty == Type::VARCHAR_ARRAY => {
            TypeDescriptor::Array(Box::new(TypeDescriptor::Text))
        }
        _ if ty == Type::BOOL_ARRAY => TypeDescriptor::Array(Box::new(TypeDescriptor::Boolean)),
        _ if ty == Type::UUID_ARRAY => TypeDescriptor::Array(Box::new(TypeDescriptor::Uuid)),
        _ => return None,
    })
}

fn decode_text_value(descriptor: &TypeDescriptor, oid: u32, text: &str) -> Result<Value> {
    let decode_err = |reason: &str| Error::Decode {
        oid,
        reason: reason.to_string(),
    };

    match descriptor {
        TypeDescriptor::Boolean => match text {
            "t" | "true" => Ok(Value::Bool(true)),
            "f" | "false" => Ok(Value::Bool(false)),
            _ => Err(decode_err("invalid boolean literal")),
        },
        TypeDescriptor::Integer { .. } => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| decode_err("invalid integer literal")),
        TypeDescriptor::Floating { .. } => text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| decode_err("invalid float literal")),
        TypeDescriptor::Numeric { .. } => Ok(Value::Numeric(text.to_string())),
        TypeDescriptor::Text => Ok(Value::Text(text.to_string())),
        TypeDescriptor::Bytea => {
            let stripped = text.strip_prefix("\\x").unwrap_or(text);
            let bytes = hex_decode(stripped).map_err(|_| decode_err("invalid bytea literal"))?;
            Ok(Value::Bytes(bytes))
        }
        TypeDescriptor::Timestamp { tz } => {
            if *tz {
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|_| decode_err("invalid timestamptz literal"))
            } else {
                chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                    .map(|dt| Value::Timestamp(dt.and_utc()))
                    .map_err(|_| decode_err("invalid timestamp literal"))
            }
        }
        TypeDescriptor::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| decode_err("invalid date literal")),
        TypeDescriptor::Time => NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
            .map(Value::Time)
            .map_err(|_| decode_err("invalid time literal")),
        TypeDescriptor::Interval => Ok(Value::Text(text.to_string())),
        TypeDescriptor::Uuid => Uuid::parse_str(text)
            .map(Value::Uuid)
            .map_err(|_| decode_err("invalid uuid literal")),
        TypeDescriptor::Json | TypeDescriptor::Jsonb => serde_json::from_str(text)
            .map(Value::Json)
            .map_err(|_| decode_err("invalid json literal")),
        TypeDescriptor::Array(element) => decode_array_literal(element, oid, text),
        TypeDescriptor::Enum { labels } => {
            if labels.iter().any(|l| l == text) {
                Ok(Value::Text(text.to_string()))
            } else {
                Err(decode_err("value is not a member of the enum"))
            }
        }
        TypeDescriptor::Composite { fields: _ } => Ok(Value::Text(text.to_string())),
        TypeDescriptor::Domain { base } => decode_text_value(base, oid, text),
        TypeDescriptor::Range { .. } => Ok(Value::Text(text.to_string())),
        TypeDescriptor::Unknown { .. } => Ok(Value::Text(text.to_string())),
    }
}

fn value_from_json(descriptor: &TypeDescriptor, oid: u32, json: &serde_json::Value) -> Result<Value> {
    let decode_err = |reason: &str| Error::Decode {
        oid,
        reason: reason.to_string(),
    };

    if json.is_null() {
        return Ok(Value::Null);
    }

    // A query-string filter always arrives as a JSON string regardless of
    // the target column's type, so scalar descriptors accept a string by
    // falling back to the wire-text decoder before giving up.
    match descriptor {
        TypeDescriptor::Boolean => json
            .as_bool()
            .map(Value::Bool)
            .or_else(|| json.as_str().and_then(|s| decode_text_value(descriptor, oid, s).ok()))
            .ok_or_else(|| decode_err("expected a boolean")),
        TypeDescriptor::Integer { .. } => json
            .as_i64()
            .map(Value::Int)
            .or_else(|| json.as_str().and_then(|s| s.parse::<i64>().ok()).map(Value::Int))
            .ok_or_else(|| decode_err("expected an integer")),
        TypeDescriptor::Floating { .. } => json
            .as_f64()
            .map(Value::Float)
            .or_else(|| json.as_str().and_then(|s| s.parse::<f64>().ok()).map(Value::Float))
            .ok_or_else(|| decode_err("expected a number")),
        TypeDescriptor::Numeric { .. } => match json {
            serde_json::Value::Number(n) => Ok(Value::Numeric(n.to_string())),
            serde_json::Value::String(s) => Ok(Value::Numeric(s.clone())),
            _ => Err(decode_err("expected a numeric literal")),
        },
        TypeDescriptor::Text => json
            .as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(|| decode_err("expected a string")),
        TypeDescriptor::Bytea => json
            .as_str()
            .and_then(|s| base64::engine::general_purpose::STANDARD.decode(s).ok())
            .map(Value::Bytes)
            .ok_or_else(|| decode_err("expected base64-encoded bytes")),
        TypeDescriptor::Timestamp { .. } | TypeDescriptor::Date | TypeDescriptor::Time => json
            .as_str()
            .ok_or_else(|| decode_err("expected a date/time string"))
            .and_then(|s| decode_text_value(descriptor, oid, s)),
        TypeDescriptor::Interval => json
            .as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(|| decode_err("expected an interval string")),
        TypeDescriptor::Uuid => json
            .as_str()
            .ok_or_else(|| decode_err("expected a uuid string"))
            .and_then(|s| decode_text_value(descriptor, oid, s)),
        TypeDescriptor::Json | TypeDescriptor::Jsonb => Ok(Value::Json(json.clone())),
        TypeDescriptor::Array(element) => {
            let items = json
                .as_array()
                .ok_or_else(|| decode_err("expected an array"))?;
            let mut decoded = Vec::with_capacity(items.len());
            for item in items {
                decoded.push(value_from_json(element, oid, item)?);
            }
            Ok(Value::Array(decoded))
        }
        TypeDescriptor::Enum { labels } => {
            let s = json.as_str().ok_or_else(|| decode_err("expected a string"))?;
            if labels.iter().any(|l| l == s) {
                Ok(Value::Text(s.to_string()))
            } else {
                Err(decode_err("value is not a member of the enum"))
            }
        }
        TypeDescriptor::Composite { fields } => {
            let obj = json.as_object().ok_or_else(|| decode_err("expected an object"))?;
            let mut out = Vec::with_capacity(fields.len());
            for (name, field_descriptor) in fields {
                if let Some(value) = obj.get(name) {
                    out.push((name.clone(), value_from_json(field_descriptor, oid, value)?));
                }
            }
            Ok(Value::Composite(out))
        }
        TypeDescriptor::Domain { base } => value_from_json(base, oid, json),
        TypeDescriptor::Range { .. } => Ok(Value::Json(json.clone())),
        TypeDescriptor::Unknown { .. } => Ok(Value::Json(json.clone())),
    }
}

fn decode_array_literal(element: &TypeDescriptor, oid: u32, text: &str) -> Result<Value> {
    let inner = text
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| Error::Decode {
            oid,
            reason: "malformed array literal".to_string(),
        })?;
    if inner.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    let mut items = Vec::new();
    for part in split_array_literal(inner) {
        if part.eq_ignore_ascii_case("null") {
            items.push(Value::Null);
        } else {
            let unquoted = part.trim_matches('"');
            items.push(decode_text_value(element, oid, unquoted)?);
        }
    }
    Ok(Value::Array(items))
}

fn split_array_literal(inner: &str) -> Vec<&str> {
    // PostgreSQL array literals are comma-separated at depth zero; nested
    // braces/quotes are not unwound further since element decoding always
    // operates on scalar elements in this gateway (§4.A: arrays decoded
    // elementwise).
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => depth += 1,
            '}' if !in_quotes => depth -= 1,
            ',' if !in_quotes && depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

fn hex_decode(s: &str) -> std::result::Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for chunk in bytes.chunks(2) {
        let hi = (chunk[0] as char).to_digit(16).ok_or(())?;
        let lo = (chunk[1] as char).to_digit(16).ok_or(())?;
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}

fn encode_value(descriptor: &TypeDescriptor, oid: u32, value: &Value) -> Result<String> {
    let encode_err = |reason: &str| Error::Encode {
        oid,
        reason: reason.to_string(),
    };

    match (descriptor, value) {
        (_, Value::Null) => Err(encode_err("cannot encode null as a literal")),
        (TypeDescriptor::Boolean, Value::Bool(b)) => Ok(b.to_string()),
        (TypeDescriptor::Integer { .. }, Value::Int(i)) => Ok(i.to_string()),
        (TypeDescriptor::Floating { .. }, Value::Float(f)) => Ok(f.to_string()),
        (TypeDescriptor::Numeric { .. }, Value::Numeric(s)) => Ok(s.clone()),
        (TypeDescriptor::Numeric { .. }, Value::Int(i)) => Ok(i.to_string()),
        (TypeDescriptor::Text, Value::Text(s)) => Ok(s.clone()),
        (TypeDescriptor::Bytea, Value::Bytes(b)) => {
            Ok(format!("\\x{}", b.iter().map(|x| format!("{x:02x}")).collect::<String>()))
        }
        (TypeDescriptor::Timestamp { .. }, Value::Timestamp(t)) => Ok(t.to_rfc3339()),
        (TypeDescriptor::Date, Value::Date(d)) => Ok(d.to_string()),
        (TypeDescriptor::Time, Value::Time(t)) => Ok(t.to_string()),
        (TypeDescriptor::Uuid, Value::Uuid(u)) => Ok(u.to_string()),
        (TypeDescriptor::Json, Value::Json(j)) | (TypeDescriptor::Jsonb, Value::Json(j)) => {
            Ok(j.to_string())
        }
        (TypeDescriptor::Enum { labels }, Value::Text(s)) => {
            if labels.iter().any(|l| l == s) {
                Ok(s.clone())
            } else {
                Err(encode_err("value is not a member of the enum"))
            }
        }
        (TypeDescriptor::Domain { base }, v) => encode_value(base, oid, v),
        (TypeDescriptor::Array(element), Value::Array(items)) => {
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                if matches!(item, Value::Null) {
                    encoded.push("NULL".to_string());
                } else {
                    encoded.push(format!("\"{}\"", encode_value(element, oid, item)?));
                }
            }
            Ok(format!("{{{}}}", encoded.join(",")))
        }
        (TypeDescriptor::Unknown { .. }, Value::Text(s)) => Ok(s.clone()),
        _ => Err(encode_err("value is out of domain for the target type")),
    }
}

pub type SharedTypeRegistry = Arc<TypeRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeCatalogEntry;

    fn model_with_enum() -> SchemaModel {
        SchemaModel {
            types: vec![TypeCatalogEntry {
                oid: 50000,
                name: "mood".into(),
                namespace: Some("public".into()),
                category: TypeCategoryHint::Enum,
                element_oid: None,
                base_oid: None,
                composite_fields: vec![],
                enum_labels: vec!["sad".into(), "ok".into(), "happy".into()],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn builtin_oids_decode_without_a_schema_model() {
        let registry = TypeRegistry::default();
        assert_eq!(registry.describe(23), TypeDescriptor::Integer { width: 4 });
        assert_eq!(registry.decode_text(23, "42").unwrap(), Value::Int(42));
    }

    #[test]
    fn unknown_oid_is_total_not_an_error() {
        let registry = TypeRegistry::default();
        assert_eq!(
            registry.describe(999_999),
            TypeDescriptor::Unknown {
                raw_name: "oid:999999".into()
            }
        );
    }

    #[test]
    fn enum_round_trips_through_registry() {
        let model = model_with_enum();
        let registry = TypeRegistry::from_schema_model(&model);
        let decoded = registry.decode_text(50000, "happy").unwrap();
        assert_eq!(decoded, Value::Text("happy".into()));
        assert_eq!(registry.encode(&decoded, 50000).unwrap(), "happy");
        assert!(registry.decode_text(50000, "furious").is_err());
    }

    #[test]
    fn array_literal_decodes_elementwise() {
        let registry = TypeRegistry::default();
        let decoded = registry.decode_text(1007, "{1,2,3}").unwrap(); // int4[]
        assert_eq!(
            decoded,
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }
}
