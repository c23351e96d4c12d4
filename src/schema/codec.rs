//! Per-field codecs.
//!
//! Two-layer design, mirroring the rest of the crate:
//! - **`Codec` enum** - one variant per scalar kind plus `Structured` for the
//!   JSON fallback. Match arms stay inlineable on the decode path.
//! - **`FieldCodec`** - wraps a `Codec` with the nullable wrapper and the
//!   numeric bounds of one field.

use crate::schema::bounds::{BoundViolation, Bounds};
use crate::schema::json;
use crate::schema::kind::{EnumDef, FieldType};
use crate::schema::primitive;
use crate::schema::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Type tag used when a node's signature is exported to a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalType {
    Integer,
    Number,
    Boolean,
    String,
}

impl ExternalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalType::Integer => "integer",
            ExternalType::Number => "number",
            ExternalType::Boolean => "boolean",
            ExternalType::String => "string",
        }
    }
}

/// Enum dispatch over the supported encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum Codec {
    Integer,
    Float,
    Boolean,
    Text,
    Binary,
    Timestamp,
    Enumeration(EnumDef),
    /// Anything composite, carried as canonical JSON text
    Structured(FieldType),
}

impl Codec {
    /// Pick the codec for a (non-optional) type.
    pub fn for_type(ty: &FieldType) -> Self {
        match ty {
            FieldType::Int => Codec::Integer,
            FieldType::Float => Codec::Float,
            FieldType::Bool => Codec::Boolean,
            FieldType::Text => Codec::Text,
            FieldType::Bytes => Codec::Binary,
            FieldType::Timestamp => Codec::Timestamp,
            FieldType::Enum(def) => Codec::Enumeration(def.clone()),
            other => Codec::Structured(other.clone()),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Codec::Integer => FieldType::Int,
            Codec::Float => FieldType::Float,
            Codec::Boolean => FieldType::Bool,
            Codec::Text => FieldType::Text,
            Codec::Binary => FieldType::Bytes,
            Codec::Timestamp => FieldType::Timestamp,
            Codec::Enumeration(def) => FieldType::Enum(def.clone()),
            Codec::Structured(ty) => ty.clone(),
        }
    }

    pub fn external_type(&self) -> ExternalType {
        match self {
            Codec::Integer => ExternalType::Integer,
            Codec::Float => ExternalType::Number,
            Codec::Boolean => ExternalType::Boolean,
            _ => ExternalType::String,
        }
    }

    pub fn decode_native(&self, value: Value) -> Result<Value, String> {
        match self {
            Codec::Structured(ty) => ty.coerce(value),
            scalar => scalar.field_type().coerce(value),
        }
    }

    pub fn decode_config(&self, raw: &Json) -> Result<Value, String> {
        match self {
            // The text form is canonical; a structured value is accepted too
            // so that hand-written config files stay readable.
            Codec::Structured(ty) => match raw {
                Json::String(text) => json::from_text(ty, text),
                other => json::from_json(ty, other),
            },
            scalar => primitive::decode_config(&scalar.field_type(), raw),
        }
    }

    pub fn decode_cli(&self, raw: &str) -> Result<Value, String> {
        match self {
            Codec::Structured(ty) => json::from_text(ty, raw),
            scalar => primitive::decode_cli(&scalar.field_type(), raw),
        }
    }

    pub fn encode_config(&self, value: &Value) -> Result<Json, String> {
        match self {
            Codec::Structured(ty) => json::to_text(ty, value).map(Json::String),
            scalar => primitive::encode_config(&scalar.field_type(), value),
        }
    }

    pub fn encode_cli(&self, value: &Value) -> Result<String, String> {
        match self {
            Codec::Structured(ty) => json::to_text(ty, value),
            scalar => primitive::encode_cli(&scalar.field_type(), value),
        }
    }
}

/// Encode/decode/validate for one declared field across all three surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCodec {
    codec: Codec,
    nullable: bool,
    bounds: Bounds,
}

impl FieldCodec {
    /// Derive the codec for a declared type.
    ///
    /// Collects every problem rather than stopping at the first one. The
    /// returned messages do not include the field name.
    pub fn derive(ty: &FieldType, bounds: Bounds, has_default: bool) -> Result<Self, Vec<String>> {
        let mut problems = Vec::new();
        let mut path = vec!["root".to_string()];
        ty.check_encodable(&mut path, &mut problems);

        let (inner, nullable) = match ty {
            FieldType::Optional(inner) => {
                // An empty string is how schedulers spell "no value" for text,
                // so a nullable text field could never be told apart from "".
                if **inner == FieldType::Text {
                    problems.push("text cannot be nullable (null and \"\" would be ambiguous)".to_string());
                }
                // Empty bytes are "" in base64, the same collision.
                if **inner == FieldType::Bytes {
                    problems.push("bytes cannot be nullable (null and empty bytes would be ambiguous)".to_string());
                }
                if !has_default {
                    problems.push("a nullable field must have a default".to_string());
                }
                (inner.as_ref(), true)
            }
            other => (other, false),
        };

        if !bounds.is_empty() && !inner.is_numeric() {
            problems.push(format!("bounds only apply to int or float fields, not {}", inner));
        }
        for (label, bound) in [("min", bounds.min), ("max", bounds.max)] {
            if let Some(bound) = bound.filter(|b| !b.as_f64().is_finite()) {
                problems.push(format!("{} {} is not a finite number", label, bound));
            }
        }
        if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
            if min.as_f64() > max.as_f64() {
                problems.push(format!("min {} is greater than max {}", min, max));
            }
        }

        if !problems.is_empty() {
            return Err(problems);
        }
        Ok(Self {
            codec: Codec::for_type(inner),
            nullable,
            bounds,
        })
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn external_type(&self) -> ExternalType {
        self.codec.external_type()
    }

    pub fn decode_native(&self, value: Value) -> Result<Value, String> {
        if self.nullable && value.is_null() {
            return Ok(Value::Null);
        }
        self.codec.decode_native(value)
    }

    pub fn decode_config(&self, raw: &Json) -> Result<Value, String> {
        if self.nullable && raw.is_null() {
            return Ok(Value::Null);
        }
        self.codec.decode_config(raw)
    }

    pub fn decode_cli(&self, raw: &str) -> Result<Value, String> {
        if self.nullable && raw.is_empty() {
            return Ok(Value::Null);
        }
        self.codec.decode_cli(raw)
    }

    pub fn encode_config(&self, value: &Value) -> Result<Json, String> {
        if self.nullable && value.is_null() {
            return Ok(Json::Null);
        }
        self.codec.encode_config(value)
    }

    pub fn encode_cli(&self, value: &Value) -> Result<String, String> {
        if self.nullable && value.is_null() {
            return Ok(String::new());
        }
        self.codec.encode_cli(value)
    }

    pub fn validate(&self, value: &Value) -> Result<(), BoundViolation> {
        self.bounds.check(value)
    }
}
