//! Canonical JSON encoding for composite field types.
//!
//! Scalars inside a composite use their config encoding (see
//! [`primitive`](super::primitive)); mapping keys use their command-line
//! encoding since JSON object keys are strings. The text form is compact,
//! ASCII-only JSON, with records and mappings kept in order.

use crate::schema::kind::FieldType;
use crate::schema::primitive;
use crate::schema::value::Value;
use serde_json::{Map, Value as Json};

/// Encode `value` (already checked against `ty`) as a JSON value.
pub fn to_json(ty: &FieldType, value: &Value) -> Result<Json, String> {
    match (ty, value) {
        (FieldType::Optional(_), Value::Null) => Ok(Json::Null),
        (FieldType::Optional(inner), v) => to_json(inner, v),
        (FieldType::List(item), Value::List(items)) | (FieldType::Set(item), Value::Set(items)) => {
            items
                .iter()
                .map(|v| to_json(item, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array)
        }
        (FieldType::Tuple(types), Value::Tuple(items)) if types.len() == items.len() => types
            .iter()
            .zip(items)
            .map(|(ty, v)| to_json(ty, v))
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array),
        (FieldType::Map(key_ty, value_ty), Value::Map(entries)) => {
            let mut object = Map::with_capacity(entries.len());
            for (k, v) in entries {
                object.insert(primitive::encode_cli(key_ty, k)?, to_json(value_ty, v)?);
            }
            Ok(Json::Object(object))
        }
        (FieldType::Union(variants), v) => variants
            .iter()
            .filter(|variant| variant.coerce(v.clone()).is_ok())
            .find_map(|variant| to_json(variant, v).ok())
            .ok_or_else(|| format!("{} matches no variant of {}", v, ty)),
        (FieldType::Literal(_), v) => literal_to_json(v),
        (FieldType::Record(def), Value::Record(fields)) => {
            let mut object = Map::with_capacity(def.fields.len());
            for (name, field_ty) in &def.fields {
                let v = fields
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| format!("record `{}` is missing field `{}`", def.name, name))?;
                object.insert(name.clone(), to_json(field_ty, v)?);
            }
            Ok(Json::Object(object))
        }
        (ty, v) if ty.is_primitive() => primitive::encode_config(ty, v),
        (ty, v) => Err(format!("cannot encode {} as {}", v.kind_name(), ty)),
    }
}

/// Decode a JSON value into a native value of type `ty`.
pub fn from_json(ty: &FieldType, raw: &Json) -> Result<Value, String> {
    match (ty, raw) {
        (FieldType::Optional(_), Json::Null) => Ok(Value::Null),
        (FieldType::Optional(inner), raw) => from_json(inner, raw),
        (FieldType::List(item), Json::Array(items)) => items
            .iter()
            .map(|v| from_json(item, v))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (FieldType::Set(item), Json::Array(items)) => {
            let mut out: Vec<Value> = Vec::with_capacity(items.len());
            for raw in items {
                let v = from_json(item, raw)?;
                if !out.contains(&v) {
                    out.push(v);
                }
            }
            Ok(Value::Set(out))
        }
        (FieldType::Tuple(types), Json::Array(items)) => {
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
                .map(|(ty, v)| from_json(ty, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple)
        }
        (FieldType::Map(key_ty, value_ty), Json::Object(object)) => object
            .iter()
            .map(|(k, v)| Ok((primitive::decode_cli(key_ty, k)?, from_json(value_ty, v)?)))
            .collect::<Result<Vec<_>, String>>()
            .map(Value::Map),
        (FieldType::Union(variants), raw) => variants
            .iter()
            .find_map(|variant| from_json(variant, raw).ok())
            .ok_or_else(|| format!("`{}` matches no variant of {}", raw, ty)),
        (FieldType::Literal(allowed), raw) => {
            let v = literal_from_json(raw)?;
            if allowed.contains(&v) {
                Ok(v)
            } else {
                Err(format!("{} is not one of {}", v, ty))
            }
        }
        (FieldType::Record(def), Json::Object(object)) => {
            if let Some(unknown) = object
                .keys()
                .find(|k| !def.fields.iter().any(|(name, _)| name == *k))
            {
                return Err(format!("record `{}` has no field `{}`", def.name, unknown));
            }
            let mut fields = Vec::with_capacity(def.fields.len());
            for (name, field_ty) in &def.fields {
                let v = match object.get(name) {
                    Some(raw) => from_json(field_ty, raw)
                        .map_err(|e| format!("{}.{}: {}", def.name, name, e))?,
                    None if matches!(field_ty, FieldType::Optional(_)) => Value::Null,
                    None => {
                        return Err(format!(
                            "record `{}` is missing field `{}`",
                            def.name, name
                        ))
                    }
                };
                fields.push((name.clone(), v));
            }
            Ok(Value::Record(fields))
        }
        (ty, raw) if ty.is_primitive() => primitive::decode_config(ty, raw),
        (ty, raw) => Err(format!("expected {}, found `{}`", ty, raw)),
    }
}

/// Compact, ASCII-only JSON text.
pub fn to_text(ty: &FieldType, value: &Value) -> Result<String, String> {
    let json = to_json(ty, value)?;
    let text = serde_json::to_string(&json).map_err(|e| e.to_string())?;
    Ok(escape_non_ascii(&text))
}

pub fn from_text(ty: &FieldType, text: &str) -> Result<Value, String> {
    let json: Json = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;
    from_json(ty, &json)
}

fn literal_to_json(value: &Value) -> Result<Json, String> {
    match value {
        Value::Null => Ok(Json::Null),
        Value::Int(v) => Ok(Json::from(*v)),
        Value::Bool(v) => Ok(Json::Bool(*v)),
        Value::Text(s) => Ok(Json::String(s.clone())),
        other => Err(format!("literal {} has no JSON form", other)),
    }
}

fn literal_from_json(raw: &Json) -> Result<Value, String> {
    match raw {
        Json::Null => Ok(Value::Null),
        Json::Bool(v) => Ok(Value::Bool(*v)),
        Json::String(s) => Ok(Value::Text(s.clone())),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| format!("literal {} is not an integer", n)),
        other => Err(format!("`{}` cannot be a literal", other)),
    }
}

/// Replace every non-ASCII character with its `\uXXXX` escape(s). Only valid
/// on serialized JSON, where such characters can only occur inside strings.
fn escape_non_ascii(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_type() -> FieldType {
        FieldType::record(
            "Item",
            [
                ("name", FieldType::Text),
                ("value", FieldType::enumeration("Option", ["A", "B"])),
            ],
        )
    }

    fn item(name: &str, value: &str) -> Value {
        Value::record([("name", Value::from(name)), ("value", Value::enumeration(value))])
    }

    #[test]
    fn test_list_of_records() {
        let ty = FieldType::list(item_type());
        let value = Value::List(vec![item("a", "A"), item("b", "B")]);
        let text = to_text(&ty, &value).unwrap();
        assert_eq!(
            text,
            r#"[{"name":"a","value":"A"},{"name":"b","value":"B"}]"#
        );
        assert_eq!(from_text(&ty, &text).unwrap(), value);
        assert_eq!(from_text(&ty, "[]").unwrap(), Value::List(Vec::new()));
    }

    #[test]
    fn test_map_keys_use_command_line_encoding() {
        let ty = FieldType::map(FieldType::Int, FieldType::list(FieldType::Bytes));
        let value = Value::Map(vec![
            (Value::Int(2), Value::List(vec![Value::bytes(b"x".to_vec())])),
            (Value::Int(-1), Value::List(Vec::new())),
        ]);
        let text = to_text(&ty, &value).unwrap();
        assert_eq!(text, r#"{"2":["eA=="],"-1":[]}"#);
        assert_eq!(from_text(&ty, &text).unwrap(), value);
    }

    #[test]
    fn test_tuple_and_set() {
        let ty = FieldType::tuple([FieldType::Int, FieldType::set(FieldType::Text)]);
        let value = Value::Tuple(vec![
            Value::Int(7),
            Value::Set(vec![Value::from("x"), Value::from("y")]),
        ]);
        let text = to_text(&ty, &value).unwrap();
        assert_eq!(from_text(&ty, &text).unwrap(), value);

        let deduped = from_text(&ty, r#"[1, ["a", "a", "b"]]"#).unwrap();
        assert_eq!(
            deduped,
            Value::Tuple(vec![
                Value::Int(1),
                Value::Set(vec![Value::from("a"), Value::from("b")])
            ])
        );
        assert!(from_text(&ty, "[1]").is_err());
    }

    #[test]
    fn test_union_and_literal() {
        let ty = FieldType::list(FieldType::union([
            FieldType::Int,
            FieldType::literal([Value::from("auto"), Value::Null]),
        ]));
        let value = Value::List(vec![Value::Int(3), Value::from("auto"), Value::Null]);
        let text = to_text(&ty, &value).unwrap();
        assert_eq!(text, r#"[3,"auto",null]"#);
        assert_eq!(from_text(&ty, &text).unwrap(), value);
        assert!(from_text(&ty, r#"["manual"]"#).is_err());
    }

    #[test]
    fn test_optional_record_fields_may_be_omitted() {
        let ty = FieldType::record(
            "Span",
            [
                ("start", FieldType::Int),
                ("end", FieldType::optional(FieldType::Int)),
            ],
        );
        assert_eq!(
            from_text(&ty, r#"{"start": 1}"#).unwrap(),
            Value::record([("start", Value::Int(1)), ("end", Value::Null)])
        );
        assert!(from_text(&ty, r#"{"end": 1}"#)
            .unwrap_err()
            .contains("missing field `start`"));
        assert!(from_text(&ty, r#"{"start": 1, "extra": 0}"#)
            .unwrap_err()
            .contains("no field `extra`"));
    }

    #[test]
    fn test_text_is_ascii() {
        let ty = FieldType::list(FieldType::Text);
        let value = Value::List(vec![Value::from("héllo 🦀")]);
        let text = to_text(&ty, &value).unwrap();
        assert!(text.is_ascii());
        assert_eq!(text, r#"["h\u00e9llo \ud83e\udd80"]"#);
        assert_eq!(from_text(&ty, &text).unwrap(), value);
    }
}
