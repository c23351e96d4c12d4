//! Property tests: every surface decodes what it encodes

use capflow::schema::FieldDescriptor;
use capflow::{ArgumentError, Field, FieldType, Value};
use chrono::{FixedOffset, TimeZone};
use proptest::prelude::*;

fn descriptor(ty: FieldType) -> FieldDescriptor {
    Field::new("x", ty).derive().unwrap()
}

fn nullable(ty: FieldType) -> FieldDescriptor {
    Field::new("x", FieldType::optional(ty))
        .with_default(Value::Null)
        .derive()
        .unwrap()
}

/// Native value -> config and command line -> back, all three must agree
fn assert_surfaces(field: &FieldDescriptor, value: Value) -> Result<(), TestCaseError> {
    let native = field.decode_native(value).unwrap();

    let config = field.encode_config(&native).unwrap();
    prop_assert_eq!(&field.decode_config(&config).unwrap(), &native);

    let cli = field.encode_cli(&native).unwrap();
    prop_assert_eq!(&field.decode_cli(&cli).unwrap(), &native);
    Ok(())
}

fn timestamp() -> impl Strategy<Value = Value> {
    (0i64..4_000_000_000, -12i32..=14).prop_map(|(secs, hours)| {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap();
        Value::Timestamp(offset.timestamp_opt(secs, 0).unwrap())
    })
}

proptest! {
    #[test]
    fn test_int_surfaces(v in any::<i64>()) {
        assert_surfaces(&descriptor(FieldType::Int), Value::Int(v))?;
    }

    #[test]
    fn test_float_surfaces(v in -1e15f64..1e15) {
        assert_surfaces(&descriptor(FieldType::Float), Value::Float(v))?;
    }

    #[test]
    fn test_bool_surfaces(v in any::<bool>()) {
        assert_surfaces(&descriptor(FieldType::Bool), Value::Bool(v))?;
    }

    #[test]
    fn test_text_surfaces(v in "\\PC*") {
        assert_surfaces(&descriptor(FieldType::Text), Value::Text(v))?;
    }

    #[test]
    fn test_bytes_surfaces(v in prop::collection::vec(any::<u8>(), 0..64)) {
        assert_surfaces(&descriptor(FieldType::Bytes), Value::Bytes(v))?;
    }

    #[test]
    fn test_timestamp_surfaces(v in timestamp()) {
        assert_surfaces(&descriptor(FieldType::Timestamp), v)?;
    }

    #[test]
    fn test_optional_surfaces(v in prop::option::of(any::<i64>())) {
        assert_surfaces(&nullable(FieldType::Int), Value::from(v))?;
    }

    #[test]
    fn test_structured_surfaces(
        items in prop::collection::vec(any::<i64>(), 0..16),
        labels in prop::collection::vec("[a-z]{1,8}", 0..4),
    ) {
        let ty = FieldType::tuple([
            FieldType::list(FieldType::Int),
            FieldType::list(FieldType::Text),
        ]);
        let value = Value::Tuple(vec![Value::from(items), Value::from(labels)]);
        assert_surfaces(&descriptor(ty), value)?;
    }

    #[test]
    fn test_structured_text_is_ascii(labels in prop::collection::vec("\\PC{0,8}", 0..4)) {
        let field = descriptor(FieldType::list(FieldType::Text));
        let text = field.encode_cli(&Value::from(labels)).unwrap();
        prop_assert!(text.is_ascii(), "{:?}", text);
    }

    #[test]
    fn test_int_bounds_are_inclusive(v in any::<i64>()) {
        let field = Field::new("x", FieldType::Int).min(0).max(100).derive().unwrap();
        let result = field.decode_cli(&v.to_string());
        if (0..=100).contains(&v) {
            prop_assert_eq!(result.unwrap(), Value::Int(v));
        } else {
            let is_out_of_bounds = matches!(result, Err(ArgumentError::OutOfBounds { .. }));
            prop_assert!(is_out_of_bounds);
        }
    }

    #[test]
    fn test_float_bounds_apply_on_every_surface(v in -2.0f64..2.0) {
        let field = Field::new("x", FieldType::Float).min(-1.0).max(1.0).derive().unwrap();
        let in_range = (-1.0..=1.0).contains(&v);
        prop_assert_eq!(field.decode_native(Value::Float(v)).is_ok(), in_range);
        prop_assert_eq!(field.decode_cli(&v.to_string()).is_ok(), in_range);
        prop_assert_eq!(field.decode_config(&serde_json::json!(v)).is_ok(), in_range);
    }
}
