//! Declared field types.
//!
//! [`FieldType`] is the explicit stand-in for a parameter's type annotation.
//! Scalars map onto dedicated codecs; the container kinds combine recursively
//! and are carried through the canonical JSON encoding.

use crate::schema::value::Value;
use std::collections::HashSet;
use std::fmt;

/// An enumeration, encoded by member name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<String>,
}

impl EnumDef {
    pub fn contains(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }
}

/// A flat record of named, typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<(String, FieldType)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Text,
    Bytes,
    Timestamp,
    Enum(EnumDef),
    Optional(Box<FieldType>),
    List(Box<FieldType>),
    Tuple(Vec<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
    Set(Box<FieldType>),
    Union(Vec<FieldType>),
    Literal(Vec<Value>),
    Record(RecordDef),
    /// A type with no external representation at all
    Opaque(String),
}

impl FieldType {
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn list(item: FieldType) -> Self {
        FieldType::List(Box::new(item))
    }

    pub fn set(item: FieldType) -> Self {
        FieldType::Set(Box::new(item))
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map(Box::new(key), Box::new(value))
    }

    pub fn tuple(items: impl IntoIterator<Item = FieldType>) -> Self {
        FieldType::Tuple(items.into_iter().collect())
    }

    pub fn union(variants: impl IntoIterator<Item = FieldType>) -> Self {
        FieldType::Union(variants.into_iter().collect())
    }

    pub fn literal(values: impl IntoIterator<Item = Value>) -> Self {
        FieldType::Literal(values.into_iter().collect())
    }

    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        FieldType::Enum(EnumDef {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        })
    }

    pub fn record<S: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (S, FieldType)>,
    ) -> Self {
        FieldType::Record(RecordDef {
            name: name.into(),
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        })
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        FieldType::Opaque(name.into())
    }

    /// Kinds that have a dedicated codec of their own.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            FieldType::Int
                | FieldType::Float
                | FieldType::Bool
                | FieldType::Text
                | FieldType::Bytes
                | FieldType::Timestamp
                | FieldType::Enum(_)
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }

    /// Kinds usable as mapping keys (encoded as their command-line string).
    pub fn is_scalar_key(&self) -> bool {
        matches!(
            self,
            FieldType::Int | FieldType::Bool | FieldType::Text | FieldType::Enum(_)
        )
    }

    /// Walk the type tree and report everything that cannot be encoded.
    ///
    /// Problems are reported with their path from `root`, e.g.
    /// `invalid type \`Socket\` at: root.value.i`.
    pub fn check_encodable(&self, path: &mut Vec<String>, errs: &mut Vec<String>) {
        match self {
            FieldType::Int
            | FieldType::Float
            | FieldType::Bool
            | FieldType::Text
            | FieldType::Bytes
            | FieldType::Timestamp => {}
            FieldType::Enum(def) => {
                if def.members.is_empty() {
                    errs.push(format!("enum `{}` has no members at: {}", def.name, render_path(path)));
                }
                let mut seen = HashSet::new();
                for member in &def.members {
                    if member.is_empty() {
                        errs.push(format!("enum `{}` has an unnamed member at: {}", def.name, render_path(path)));
                    } else if !seen.insert(member.as_str()) {
                        errs.push(format!(
                            "enum `{}` repeats member `{}` at: {}",
                            def.name,
                            member,
                            render_path(path)
                        ));
                    }
                }
            }
            FieldType::Optional(inner) => {
                if matches!(**inner, FieldType::Optional(_)) {
                    errs.push(format!("nested optional at: {}", render_path(path)));
                }
                with_segment(path, "t", |path| inner.check_encodable(path, errs));
            }
            FieldType::List(item) | FieldType::Set(item) => {
                with_segment(path, "i", |path| item.check_encodable(path, errs));
            }
            FieldType::Tuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    with_segment(path, &i.to_string(), |path| item.check_encodable(path, errs));
                }
            }
            FieldType::Map(key, value) => {
                if !key.is_scalar_key() {
                    errs.push(format!(
                        "mapping key must be int, bool, str or enum, found `{}` at: {}",
                        key,
                        render_path(path)
                    ));
                }
                with_segment(path, "key", |path| key.check_encodable(path, errs));
                with_segment(path, "value", |path| value.check_encodable(path, errs));
            }
            FieldType::Union(variants) => {
                if variants.is_empty() {
                    errs.push(format!("union without variants at: {}", render_path(path)));
                }
                for (i, variant) in variants.iter().enumerate() {
                    with_segment(path, &i.to_string(), |path| {
                        variant.check_encodable(path, errs)
                    });
                }
            }
            FieldType::Literal(values) => {
                if values.is_empty() {
                    errs.push(format!("literal without values at: {}", render_path(path)));
                }
                for value in values {
                    let scalar = matches!(
                        value,
                        Value::Null | Value::Int(_) | Value::Bool(_) | Value::Text(_)
                    );
                    if !scalar {
                        errs.push(format!(
                            "literal value {} is not a scalar at: {}",
                            value,
                            render_path(path)
                        ));
                    }
                }
            }
            FieldType::Record(def) => {
                let mut seen = HashSet::new();
                for (name, ty) in &def.fields {
                    if !seen.insert(name.as_str()) {
                        errs.push(format!(
                            "record `{}` repeats field `{}` at: {}",
                            def.name,
                            name,
                            render_path(path)
                        ));
                    }
                    with_segment(path, name, |path| ty.check_encodable(path, errs));
                }
            }
            FieldType::Opaque(name) => {
                errs.push(format!("invalid type `{}` at: {}", name, render_path(path)));
            }
        }
    }

    /// Check a native value against this type, coercing where the conversion
    /// is lossless (ints into floats, text into enum members, lists into sets).
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        let mismatch = |value: &Value| format!("expected {}, found {}", self, value.kind_name());
        match (self, value) {
            (FieldType::Int, v @ Value::Int(_)) => Ok(v),
            (FieldType::Float, v @ Value::Float(_)) => Ok(v),
            (FieldType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (FieldType::Bool, v @ Value::Bool(_)) => Ok(v),
            (FieldType::Text, v @ Value::Text(_)) => Ok(v),
            (FieldType::Bytes, v @ Value::Bytes(_)) => Ok(v),
            (FieldType::Timestamp, v @ Value::Timestamp(_)) => Ok(v),
            (FieldType::Enum(def), Value::Enum(name) | Value::Text(name)) => {
                if def.contains(&name) {
                    Ok(Value::Enum(name))
                } else {
                    Err(format!("`{}` is not a member of enum `{}`", name, def.name))
                }
            }
            (FieldType::Optional(_), Value::Null) => Ok(Value::Null),
            (FieldType::Optional(inner), v) => inner.coerce(v),
            (FieldType::List(item), Value::List(items)) => items
                .into_iter()
                .map(|v| item.coerce(v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (FieldType::Set(item), Value::Set(items) | Value::List(items)) => {
                let mut out: Vec<Value> = Vec::with_capacity(items.len());
                for v in items {
                    let v = item.coerce(v)?;
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
                Ok(Value::Set(out))
            }
            (FieldType::Tuple(types), Value::Tuple(items) | Value::List(items)) => {
                if types.len() != items.len() {
                    return Err(format!(
                        "expected a tuple of {} items, found {}",
                        types.len(),
                        items.len()
                    ));
                }
                types
                    .iter()
                    .zip(items)
                    .map(|(ty, v)| ty.coerce(v))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Tuple)
            }
            (FieldType::Map(key_ty, value_ty), Value::Map(entries)) => {
                let mut out: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    let k = key_ty.coerce(k)?;
                    let v = value_ty.coerce(v)?;
                    match out.iter_mut().find(|(existing, _)| *existing == k) {
                        Some(slot) => slot.1 = v,
                        None => out.push((k, v)),
                    }
                }
                Ok(Value::Map(out))
            }
            (FieldType::Union(variants), v) => variants
                .iter()
                .find_map(|variant| variant.coerce(v.clone()).ok())
                .ok_or_else(|| format!("{} matches no variant of {}", v, self)),
            (FieldType::Literal(allowed), v) => {
                if allowed.contains(&v) {
                    Ok(v)
                } else {
                    Err(format!("{} is not one of {}", v, self))
                }
            }
            (FieldType::Record(def), Value::Record(mut fields)) => {
                if let Some((unknown, _)) = fields
                    .iter()
                    .find(|(k, _)| !def.fields.iter().any(|(name, _)| name == k))
                {
                    return Err(format!("record `{}` has no field `{}`", def.name, unknown));
                }
                let mut out = Vec::with_capacity(def.fields.len());
                for (name, ty) in &def.fields {
                    let given = fields
                        .iter()
                        .position(|(k, _)| k == name)
                        .map(|i| fields.swap_remove(i).1);
                    let v = match given {
                        Some(v) => ty.coerce(v),
                        None if matches!(ty, FieldType::Optional(_)) => Ok(Value::Null),
                        None => Err(format!("record `{}` is missing field `{}`", def.name, name)),
                    }
                    .map_err(|e| format!("{}.{}: {}", def.name, name, e))?;
                    out.push((name.clone(), v));
                }
                Ok(Value::Record(out))
            }
            (_, v) => Err(mismatch(&v)),
        }
    }
}

fn render_path(path: &[String]) -> String {
    path.join(".")
}

fn with_segment(path: &mut Vec<String>, segment: &str, f: impl FnOnce(&mut Vec<String>)) {
    path.push(segment.to_string());
    f(path);
    path.pop();
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Text => write!(f, "str"),
            FieldType::Bytes => write!(f, "bytes"),
            FieldType::Timestamp => write!(f, "timestamp"),
            FieldType::Enum(def) => write!(f, "{}", def.name),
            FieldType::Optional(inner) => write!(f, "Optional[{}]", inner),
            FieldType::List(item) => write!(f, "List[{}]", item),
            FieldType::Set(item) => write!(f, "Set[{}]", item),
            FieldType::Map(k, v) => write!(f, "Map[{}, {}]", k, v),
            FieldType::Tuple(items) => {
                write!(f, "Tuple[")?;
                list(f, items)?;
                write!(f, "]")
            }
            FieldType::Union(variants) => {
                write!(f, "Union[")?;
                list(f, variants)?;
                write!(f, "]")
            }
            FieldType::Literal(values) => {
                write!(f, "Literal[")?;
                list(f, values)?;
                write!(f, "]")
            }
            FieldType::Record(def) => write!(f, "{}", def.name),
            FieldType::Opaque(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems(ty: &FieldType) -> Vec<String> {
        let mut errs = Vec::new();
        ty.check_encodable(&mut vec!["root".to_string()], &mut errs);
        errs
    }

    #[test]
    fn test_nested_containers_are_encodable() {
        let item = FieldType::record(
            "Item",
            [
                ("name", FieldType::Text),
                ("value", FieldType::enumeration("Option", ["A", "B"])),
            ],
        );
        let ty = FieldType::map(FieldType::Text, FieldType::list(FieldType::tuple([item, FieldType::Float])));
        assert!(problems(&ty).is_empty());
    }

    #[test]
    fn test_opaque_reports_its_path() {
        let ty = FieldType::list(FieldType::map(FieldType::Text, FieldType::opaque("Socket")));
        assert_eq!(problems(&ty), vec!["invalid type `Socket` at: root.i.value"]);
    }

    #[test]
    fn test_non_scalar_map_key() {
        let ty = FieldType::map(FieldType::list(FieldType::Int), FieldType::Int);
        let errs = problems(&ty);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("mapping key"));
    }

    #[test]
    fn test_enum_problems() {
        let ty = FieldType::enumeration("Color", ["Red", "Red", ""]);
        let errs = problems(&ty);
        assert_eq!(errs.len(), 2);
        assert!(errs.iter().any(|e| e.contains("repeats member `Red`")));
        assert!(errs.iter().any(|e| e.contains("unnamed member")));
    }

    #[test]
    fn test_coerce_widens_and_normalizes() {
        assert_eq!(FieldType::Float.coerce(Value::Int(3)), Ok(Value::Float(3.0)));
        assert_eq!(
            FieldType::set(FieldType::Int).coerce(Value::List(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(1)
            ])),
            Ok(Value::Set(vec![Value::Int(1), Value::Int(2)]))
        );
        let color = FieldType::enumeration("Color", ["Red", "Blue"]);
        assert_eq!(color.coerce(Value::from("Red")), Ok(Value::Enum("Red".into())));
        assert!(color.coerce(Value::from("Green")).is_err());
    }

    #[test]
    fn test_coerce_rejects_mismatches() {
        let err = FieldType::Int.coerce(Value::from("3")).unwrap_err();
        assert_eq!(err, "expected int, found str");
        assert!(FieldType::Int.coerce(Value::Null).is_err());
        assert!(FieldType::tuple([FieldType::Int, FieldType::Int])
            .coerce(Value::Tuple(vec![Value::Int(1)]))
            .is_err());
    }

    #[test]
    fn test_coerce_union_picks_first_match() {
        let ty = FieldType::union([FieldType::Int, FieldType::Text]);
        assert_eq!(ty.coerce(Value::from("x")), Ok(Value::from("x")));
        assert_eq!(ty.coerce(Value::Int(1)), Ok(Value::Int(1)));
        assert!(ty.coerce(Value::Bool(true)).is_err());
    }

    #[test]
    fn test_coerce_record_orders_fields_and_fills_optionals() {
        let ty = FieldType::record(
            "Point",
            [
                ("x", FieldType::Int),
                ("label", FieldType::optional(FieldType::Int)),
                ("y", FieldType::Int),
            ],
        );
        let value = Value::record([("y", Value::Int(2)), ("x", Value::Int(1))]);
        assert_eq!(
            ty.coerce(value),
            Ok(Value::record([
                ("x", Value::Int(1)),
                ("label", Value::Null),
                ("y", Value::Int(2)),
            ]))
        );
        let missing = ty.coerce(Value::record([("x", Value::Int(1))])).unwrap_err();
        assert!(missing.contains("missing field `y`"));
        let unknown = ty
            .coerce(Value::record([("x", Value::Int(1)), ("z", Value::Int(0))]))
            .unwrap_err();
        assert!(unknown.contains("no field `z`"));
    }
}
