//! Parsed function descriptors.
//!
//! A [`Signature`] lists the parameters of a node body in declaration order.
//! [`parse`] derives every field once, at registration, and the resulting
//! [`ParsedFunction`] resolves arguments from each invocation surface:
//!
//! - native positional/keyword values ([`CallArgs`])
//! - command-line tokens (`--name value` pairs)
//! - a text-config map ([`ConfigMap`])
//!
//! Every surface goes through the same per-field codecs and bound checks and
//! yields the same ordered [`Kwargs`].

use crate::error::{ArgumentError, FieldSchemaError, SchemaError};
use crate::node::args::{CallArgs, Kwargs};
use crate::schema::field::{Field, FieldDescriptor};
use crate::schema::kind::FieldType;
use crate::schema::value::Value;
use crate::schema::ConfigMap;
use std::collections::HashSet;
use tracing::trace;

/// Declared parameters and return type of a node body.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    name: String,
    params: Vec<Field>,
    returns: Option<FieldType>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
        }
    }

    pub fn param(mut self, field: Field) -> Self {
        self.params.push(field);
        self
    }

    /// Declare a return type. Node bodies return nothing, so any declared
    /// type makes [`parse`] fail.
    pub fn returns(mut self, ty: FieldType) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Derive every field of `signature`.
///
/// Problems are accumulated over all fields and reported as one
/// [`SchemaError::InvalidFields`].
pub fn parse(signature: Signature) -> Result<ParsedFunction, SchemaError> {
    let Signature {
        name,
        params,
        returns,
    } = signature;

    if let Some(returns) = returns {
        return Err(SchemaError::NonNullReturn {
            function: name,
            returns: returns.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(params.len());
    let mut errors = Vec::new();
    for param in params {
        let duplicate = !seen.insert(param.name().to_string());
        let field_name = param.name().to_string();
        match param.derive() {
            Ok(field) if !duplicate => fields.push(field),
            Ok(_) => errors.push(FieldSchemaError::new(
                field_name,
                vec!["parameter declared more than once".to_string()],
            )),
            Err(mut err) => {
                if duplicate {
                    err.problems.push("parameter declared more than once".to_string());
                }
                errors.push(err);
            }
        }
    }

    if !errors.is_empty() {
        return Err(SchemaError::InvalidFields {
            function: name,
            fields: errors,
        });
    }
    Ok(ParsedFunction { name, fields })
}

/// The ordered field list of one callable.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFunction {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl ParsedFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Bind native arguments, applying defaults for omitted fields.
    pub fn kwargs_from_native(&self, args: CallArgs) -> Result<Kwargs, ArgumentError> {
        let CallArgs {
            positional,
            keyword,
        } = args;
        if positional.len() > self.fields.len() {
            return Err(ArgumentError::TooManyPositional {
                function: self.name.clone(),
                expected: self.fields.len(),
                given: positional.len(),
            });
        }

        let mut slots: Vec<Option<Value>> = vec![None; self.fields.len()];
        for (slot, value) in slots.iter_mut().zip(positional) {
            *slot = Some(value);
        }
        for (name, value) in keyword {
            let index = self
                .position(&name)
                .ok_or_else(|| ArgumentError::UnknownField {
                    function: self.name.clone(),
                    field: name.clone(),
                })?;
            if slots[index].is_some() {
                return Err(ArgumentError::DuplicateArgument {
                    function: self.name.clone(),
                    field: name,
                });
            }
            slots[index] = Some(value);
        }

        self.resolve(slots, |field, value| field.decode_native(value))
    }

    /// Bind `--name value` token pairs.
    pub fn kwargs_from_cli<S: AsRef<str>>(&self, argv: &[S]) -> Result<Kwargs, ArgumentError> {
        let mut slots: Vec<Option<String>> = vec![None; self.fields.len()];
        for pair in argv.chunks(2) {
            let token = pair[0].as_ref();
            let name = token
                .strip_prefix("--")
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ArgumentError::InvalidOption {
                    token: token.to_string(),
                })?;
            let value = pair.get(1).ok_or_else(|| ArgumentError::MissingValue {
                token: token.to_string(),
            })?;
            let index = self
                .position(name)
                .ok_or_else(|| ArgumentError::UnknownOption {
                    token: token.to_string(),
                })?;
            if slots[index].is_some() {
                return Err(ArgumentError::RepeatedOption {
                    token: token.to_string(),
                });
            }
            slots[index] = Some(value.as_ref().to_string());
        }

        self.resolve(slots, |field, raw| field.decode_cli(&raw))
    }

    /// Bind a text-config map.
    pub fn kwargs_from_config(&self, config: &ConfigMap) -> Result<Kwargs, ArgumentError> {
        if let Some(unknown) = config.keys().find(|key| self.field(key).is_none()) {
            return Err(ArgumentError::UnknownField {
                function: self.name.clone(),
                field: unknown.clone(),
            });
        }
        let slots: Vec<Option<&serde_json::Value>> =
            self.fields.iter().map(|f| config.get(f.name())).collect();
        self.resolve(slots, |field, raw| field.decode_config(raw))
    }

    /// Encode resolved kwargs for the text-config surface.
    pub fn kwargs_to_config(&self, kwargs: &Kwargs) -> Result<ConfigMap, ArgumentError> {
        let mut config = ConfigMap::new();
        for (field, value) in self.aligned(kwargs)? {
            config.insert(field.name().to_string(), field.encode_config(value)?);
        }
        Ok(config)
    }

    /// Encode resolved kwargs as command-line tokens.
    pub fn kwargs_to_cli(&self, kwargs: &Kwargs) -> Result<Vec<String>, ArgumentError> {
        let mut argv = Vec::with_capacity(self.fields.len() * 2);
        for (field, value) in self.aligned(kwargs)? {
            argv.push(format!("--{}", field.name()));
            argv.push(field.encode_cli(value)?);
        }
        Ok(argv)
    }

    fn resolve<R>(
        &self,
        slots: Vec<Option<R>>,
        decode: impl Fn(&FieldDescriptor, R) -> Result<Value, ArgumentError>,
    ) -> Result<Kwargs, ArgumentError> {
        let mut values = Vec::with_capacity(self.fields.len());
        for (field, slot) in self.fields.iter().zip(slots) {
            let value = match (slot, field.default()) {
                (Some(raw), _) => decode(field, raw)?,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(ArgumentError::MissingRequired {
                        function: self.name.clone(),
                        field: field.name().to_string(),
                    })
                }
            };
            trace!(function = %self.name, field = field.name(), value = %value, "resolved argument");
            values.push((field.name().to_string(), value));
        }
        Ok(Kwargs::new(self.name.clone(), values))
    }

    fn aligned<'a>(
        &'a self,
        kwargs: &'a Kwargs,
    ) -> Result<Vec<(&'a FieldDescriptor, &'a Value)>, ArgumentError> {
        self.fields
            .iter()
            .map(|field| {
                kwargs
                    .value(field.name())
                    .map(|value| (field, value))
                    .ok_or_else(|| ArgumentError::MissingRequired {
                        function: self.name.clone(),
                        field: field.name().to_string(),
                    })
            })
            .collect()
    }
}
