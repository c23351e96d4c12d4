//! Error handling for capflow
//!
//! Three families of errors surface from the core, each with its own type:
//!
//! - [`SchemaError`] - raised once, when a node's signature is parsed. All
//!   offending fields of one function are reported together.
//! - [`ArgumentError`] - raised per invocation when an argument is missing,
//!   unknown, malformed or out of bounds. Always names the field or token.
//! - [`ContextError`] - a captured node was committed outside of a build, or
//!   an async body was driven synchronously. These point at a host
//!   integration bug rather than bad input.
//!
//! [`CapflowError`] wraps all of them together with failures raised by user
//! bodies, configuration and IO.

use crate::schema::BoundViolation;
use thiserror::Error;

/// Problems found while deriving the codec for a single field.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("field `{field}`: {}", .problems.join("; "))]
pub struct FieldSchemaError {
    pub field: String,
    pub problems: Vec<String>,
}

impl FieldSchemaError {
    pub fn new(field: impl Into<String>, problems: Vec<String>) -> Self {
        Self {
            field: field.into(),
            problems,
        }
    }
}

/// Registration-time errors for a node signature.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("function `{function}` should not return a value, found `{returns}`")]
    NonNullReturn { function: String, returns: String },

    #[error("{}", render_invalid_fields(.function, .fields))]
    InvalidFields {
        function: String,
        fields: Vec<FieldSchemaError>,
    },
}

impl SchemaError {
    /// Names of every field reported by this error.
    pub fn offending_fields(&self) -> Vec<&str> {
        match self {
            SchemaError::NonNullReturn { .. } => Vec::new(),
            SchemaError::InvalidFields { fields, .. } => {
                fields.iter().map(|f| f.field.as_str()).collect()
            }
        }
    }
}

fn render_invalid_fields(function: &str, fields: &[FieldSchemaError]) -> String {
    let mut log = format!("function `{}` has invalid fields:", function);
    for field in fields {
        log.push_str(&format!("\n  {}", field));
    }
    log
}

/// Per-invocation input errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("{function}() missing required argument '{field}'")]
    MissingRequired { function: String, field: String },

    #[error("{function}() got an unexpected argument '{field}'")]
    UnknownField { function: String, field: String },

    #[error("{function}() declares no field '{field}' to read")]
    UndeclaredField { function: String, field: String },

    #[error("{function}() got multiple values for argument '{field}'")]
    DuplicateArgument { function: String, field: String },

    #[error("{function}() takes {expected} positional arguments but {given} were given")]
    TooManyPositional {
        function: String,
        expected: usize,
        given: usize,
    },

    #[error("invalid option '{token}'")]
    InvalidOption { token: String },

    #[error("missing value for '{token}'")]
    MissingValue { token: String },

    #[error("unknown option '{token}'")]
    UnknownOption { token: String },

    #[error("option '{token}' given more than once")]
    RepeatedOption { token: String },

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("invalid value for '{field}': {violation}")]
    OutOfBounds {
        field: String,
        violation: BoundViolation,
    },
}

impl ArgumentError {
    /// The field name or command-line token this error refers to.
    pub fn subject(&self) -> &str {
        match self {
            ArgumentError::MissingRequired { field, .. }
            | ArgumentError::UnknownField { field, .. }
            | ArgumentError::UndeclaredField { field, .. }
            | ArgumentError::DuplicateArgument { field, .. }
            | ArgumentError::InvalidValue { field, .. }
            | ArgumentError::OutOfBounds { field, .. } => field,
            ArgumentError::TooManyPositional { function, .. } => function,
            ArgumentError::InvalidOption { token }
            | ArgumentError::MissingValue { token }
            | ArgumentError::UnknownOption { token }
            | ArgumentError::RepeatedOption { token } => token,
        }
    }

    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ArgumentError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Misuse of the build context by the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("cannot commit captured node `{node}`: not in build mode")]
    NotBuilding { node: String },

    #[error("cannot commit captured node `{node}`: no active sink")]
    NoActiveSink { node: String },

    #[error("node `{node}` has an async body; invoke it with `call_async`")]
    AsyncBody { node: String },

    #[error("building `{node}` captured {captured} root configs, expected exactly one")]
    UnexpectedRoots { node: String, captured: usize },
}

/// Main error type for capflow operations
#[derive(Error, Debug)]
pub enum CapflowError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Argument error: {0}")]
    Argument(#[from] ArgumentError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// A node body returned an error of its own
    #[error("Node `{node}` failed: {source}")]
    Body {
        node: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CapflowError>,
    },
}

impl CapflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CapflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap an error returned by the body of `node`.
    ///
    /// Errors that already belong to capflow (typically raised by a nested
    /// node call or by `Kwargs::get`) pass through untouched.
    pub fn from_body(node: &str, err: anyhow::Error) -> Self {
        let err = match err.downcast::<CapflowError>() {
            Ok(inner) => return inner,
            Err(err) => err,
        };
        let err = match err.downcast::<ArgumentError>() {
            Ok(inner) => return inner.into(),
            Err(err) => err,
        };
        match err.downcast::<ContextError>() {
            Ok(inner) => inner.into(),
            Err(source) => CapflowError::Body {
                node: node.to_string(),
                source,
            },
        }
    }

    /// The argument error at the root of this error, if any.
    pub fn as_argument(&self) -> Option<&ArgumentError> {
        match self {
            CapflowError::Argument(err) => Some(err),
            CapflowError::WithContext { source, .. } => source.as_argument(),
            _ => None,
        }
    }
}

/// Result type alias for capflow operations
pub type Result<T> = std::result::Result<T, CapflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CapflowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
