//! Declared parameters.
//!
//! A [`Field`] is the builder a node author writes; [`Field::derive`] turns it
//! into an immutable [`FieldDescriptor`] carrying the derived codec.

use crate::error::{ArgumentError, FieldSchemaError};
use crate::schema::bounds::{Bounds, Number};
use crate::schema::codec::{ExternalType, FieldCodec};
use crate::schema::kind::FieldType;
use crate::schema::value::Value;
use serde_json::Value as Json;

/// Builder for one declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    doc: Option<String>,
    bounds: Bounds,
}

impl Field {
    /// A required parameter.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            doc: None,
            bounds: Bounds::default(),
        }
    }

    /// Give the parameter a default, making it optional to callers.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Inclusive lower bound.
    pub fn min(mut self, min: impl Into<Number>) -> Self {
        self.bounds.min = Some(min.into());
        self
    }

    /// Inclusive upper bound.
    pub fn max(mut self, max: impl Into<Number>) -> Self {
        self.bounds.max = Some(max.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derive the codec and check the default against it.
    pub fn derive(self) -> Result<FieldDescriptor, FieldSchemaError> {
        let mut problems = Vec::new();
        if !is_valid_name(&self.name) {
            problems.push(format!("`{}` cannot be used as an option name", self.name));
        }

        let codec = match FieldCodec::derive(&self.ty, self.bounds, self.default.is_some()) {
            Ok(codec) => Some(codec),
            Err(mut errs) => {
                problems.append(&mut errs);
                None
            }
        };

        let mut default = None;
        let mut config_default = None;
        if let (Some(codec), Some(raw)) = (&codec, self.default) {
            match codec.decode_native(raw) {
                Ok(value) => {
                    if let Err(violation) = codec.validate(&value) {
                        problems.push(format!("default {}", violation));
                    }
                    match codec.encode_config(&value) {
                        Ok(encoded) => config_default = Some(encoded),
                        Err(e) => problems.push(format!("default cannot be encoded: {}", e)),
                    }
                    default = Some(value);
                }
                Err(e) => problems.push(format!("default does not match `{}`: {}", self.ty, e)),
            }
        }

        match codec {
            Some(codec) if problems.is_empty() => Ok(FieldDescriptor {
                name: self.name,
                ty: self.ty,
                default,
                doc: self.doc,
                codec,
                config_default,
            }),
            _ => Err(FieldSchemaError::new(self.name, problems)),
        }
    }
}

/// Names end up as `--name` on the command line and as config keys.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A fully derived parameter. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    doc: Option<String>,
    codec: FieldCodec,
    config_default: Option<Json>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// The default, already coerced to the declared type.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn bounds(&self) -> Bounds {
        self.codec.bounds()
    }

    pub fn codec(&self) -> &FieldCodec {
        &self.codec
    }

    /// The default in its text-config encoding.
    pub fn config_default(&self) -> Option<&Json> {
        self.config_default.as_ref()
    }

    pub fn external_type(&self) -> ExternalType {
        self.codec.external_type()
    }

    pub fn decode_native(&self, value: Value) -> Result<Value, ArgumentError> {
        let value = self
            .codec
            .decode_native(value)
            .map_err(|e| ArgumentError::invalid(&self.name, e))?;
        self.validate(value)
    }

    pub fn decode_config(&self, raw: &Json) -> Result<Value, ArgumentError> {
        let value = self
            .codec
            .decode_config(raw)
            .map_err(|e| ArgumentError::invalid(&self.name, e))?;
        self.validate(value)
    }

    pub fn decode_cli(&self, raw: &str) -> Result<Value, ArgumentError> {
        let value = self
            .codec
            .decode_cli(raw)
            .map_err(|e| ArgumentError::invalid(&self.name, e))?;
        self.validate(value)
    }

    pub fn encode_config(&self, value: &Value) -> Result<Json, ArgumentError> {
        self.codec
            .encode_config(value)
            .map_err(|e| ArgumentError::invalid(&self.name, e))
    }

    pub fn encode_cli(&self, value: &Value) -> Result<String, ArgumentError> {
        self.codec
            .encode_cli(value)
            .map_err(|e| ArgumentError::invalid(&self.name, e))
    }

    fn validate(&self, value: Value) -> Result<Value, ArgumentError> {
        self.codec
            .validate(&value)
            .map_err(|violation| ArgumentError::OutOfBounds {
                field: self.name.clone(),
                violation,
            })?;
        Ok(value)
    }
}
