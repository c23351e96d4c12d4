//! Encodings for the scalar kinds.
//!
//! | kind       | config value       | command line            |
//! |------------|--------------------|-------------------------|
//! | int        | JSON number        | decimal                 |
//! | float      | JSON number        | shortest decimal        |
//! | bool       | JSON bool          | `true` / `false`        |
//! | str        | JSON string        | as-is                   |
//! | bytes      | base64 string      | base64                  |
//! | timestamp  | RFC 3339 string    | RFC 3339                |
//! | enum       | member name        | member name             |
//!
//! Callers must only pass scalar kinds (`FieldType::is_primitive`).

use crate::schema::kind::{EnumDef, FieldType};
use crate::schema::value::Value;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value as Json;

/// Naive timestamps (no offset) are read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn unexpected(ty: &FieldType, value: &Value) -> String {
    format!("cannot encode {} as {}", value.kind_name(), ty)
}

fn not_primitive(ty: &FieldType) -> String {
    format!("`{}` has no scalar encoding", ty)
}

pub fn encode_cli(ty: &FieldType, value: &Value) -> Result<String, String> {
    match (ty, value) {
        (FieldType::Int, Value::Int(v)) => Ok(v.to_string()),
        (FieldType::Float, Value::Float(v)) => Ok(v.to_string()),
        (FieldType::Float, Value::Int(v)) => Ok((*v as f64).to_string()),
        (FieldType::Bool, Value::Bool(v)) => Ok(if *v { "true" } else { "false" }.to_string()),
        (FieldType::Text, Value::Text(s)) => Ok(s.clone()),
        (FieldType::Bytes, Value::Bytes(b)) => Ok(STANDARD.encode(b)),
        (FieldType::Timestamp, Value::Timestamp(t)) => Ok(t.to_rfc3339()),
        (FieldType::Enum(def), Value::Enum(name)) => encode_member(def, name),
        (ty, value) if ty.is_primitive() => Err(unexpected(ty, value)),
        (ty, _) => Err(not_primitive(ty)),
    }
}

pub fn decode_cli(ty: &FieldType, raw: &str) -> Result<Value, String> {
    match ty {
        FieldType::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| format!("`{}` is not an integer: {}", raw, e)),
        FieldType::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("`{}` is not a number: {}", raw, e)),
        FieldType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("`{}` is not a boolean, expected true or false", raw)),
        },
        FieldType::Text => Ok(Value::Text(raw.to_string())),
        FieldType::Bytes => STANDARD
            .decode(raw)
            .map(Value::Bytes)
            .map_err(|e| format!("invalid base64: {}", e)),
        FieldType::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
        FieldType::Enum(def) => decode_member(def, raw),
        other => Err(not_primitive(other)),
    }
}

pub fn encode_config(ty: &FieldType, value: &Value) -> Result<Json, String> {
    match (ty, value) {
        (FieldType::Int, Value::Int(v)) => Ok(Json::from(*v)),
        (FieldType::Float, Value::Float(v)) => float_to_json(*v),
        (FieldType::Float, Value::Int(v)) => float_to_json(*v as f64),
        (FieldType::Bool, Value::Bool(v)) => Ok(Json::Bool(*v)),
        (FieldType::Text | FieldType::Bytes | FieldType::Timestamp | FieldType::Enum(_), _) => {
            encode_cli(ty, value).map(Json::String)
        }
        (ty, value) if ty.is_primitive() => Err(unexpected(ty, value)),
        (ty, _) => Err(not_primitive(ty)),
    }
}

pub fn decode_config(ty: &FieldType, raw: &Json) -> Result<Value, String> {
    match (ty, raw) {
        (FieldType::Int, Json::Number(n)) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| format!("{} is not a 64-bit integer", n)),
        (FieldType::Float, Json::Number(n)) => n
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| format!("{} is not a number", n)),
        (FieldType::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
        (FieldType::Text | FieldType::Bytes | FieldType::Timestamp | FieldType::Enum(_), Json::String(s)) => {
            decode_cli(ty, s)
        }
        (ty, raw) if ty.is_primitive() => Err(format!("expected {}, found `{}`", ty, raw)),
        (ty, _) => Err(not_primitive(ty)),
    }
}

fn float_to_json(v: f64) -> Result<Json, String> {
    serde_json::Number::from_f64(v)
        .map(Json::Number)
        .ok_or_else(|| format!("{} has no JSON representation", v))
}

fn encode_member(def: &EnumDef, name: &str) -> Result<String, String> {
    if def.contains(name) {
        Ok(name.to_string())
    } else {
        Err(format!("`{}` is not a member of enum `{}`", name, def.name))
    }
}

fn decode_member(def: &EnumDef, raw: &str) -> Result<Value, String> {
    encode_member(def, raw).map(Value::Enum)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t);
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| format!("`{}` is not an ISO-8601 timestamp", raw))
}
