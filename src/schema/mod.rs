//! Field schemas and their codecs.
//!
//! A node declares its parameters as [`Field`]s. Parsing the declaration
//! derives, per field, a [`FieldCodec`] that moves values between three
//! external representations:
//!
//! ```text
//!                 ┌──────────────► native   (Value, checked + coerced)
//! FieldType ──► FieldCodec ──────► config   (serde_json::Value)
//!                 └──────────────► cli      (String)
//! ```
//!
//! Scalar kinds have dedicated encodings (see [`primitive`]). Everything else
//! (lists, tuples, mappings, sets, unions, literals, records) goes through a
//! canonical JSON text encoding (see [`json`]).
//!
//! Derivation happens once, in [`parse`], and reports every broken field of a
//! function at once.

pub mod bounds;
pub mod codec;
pub mod field;
pub mod function;
pub mod json;
pub mod kind;
pub mod primitive;
pub mod value;

pub use bounds::{BoundViolation, Bounds, Number};
pub use codec::{Codec, ExternalType, FieldCodec};
pub use field::{Field, FieldDescriptor};
pub use function::{parse, ParsedFunction, Signature};
pub use kind::{EnumDef, FieldType, RecordDef};
pub use value::{FromValue, Value};

/// Declarative-text configuration: field name → text-encoded value, in
/// declaration order.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;
