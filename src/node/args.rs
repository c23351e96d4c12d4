//! Arguments going into and out of a node body.

use crate::error::ArgumentError;
use crate::schema::value::{FromValue, Value};

/// Native positional and keyword arguments for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }
}

/// Build [`CallArgs`]: positional values, then `;` and `name = value` pairs.
///
/// ```ignore
/// node.call(args![4])?;
/// node.call(args![4; label = "x", seed = 7])?;
/// node.call(args![; n = 4])?;
/// ```
#[macro_export]
macro_rules! args {
    ($($pos:expr),* $(,)? $(; $($key:ident = $val:expr),* $(,)?)?) => {{
        #[allow(unused_mut)]
        let mut args = $crate::node::CallArgs::new();
        $(args = args.arg($pos);)*
        $($(args = args.kwarg(stringify!($key), $val);)*)?
        args
    }};
}

/// Fully resolved arguments, one per declared field, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Kwargs {
    function: String,
    values: Vec<(String, Value)>,
}

impl Kwargs {
    pub(crate) fn new(function: String, values: Vec<(String, Value)>) -> Self {
        Self { function, values }
    }

    /// Name of the function these arguments were resolved for.
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Typed access to a resolved argument.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, ArgumentError> {
        let value = self.value(name).ok_or_else(|| ArgumentError::UndeclaredField {
            function: self.function.clone(),
            field: name.to_string(),
        })?;
        T::from_value(value).map_err(|e| ArgumentError::invalid(name, e))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Back to native keyword arguments, e.g. to forward a call.
    pub fn to_call_args(&self) -> CallArgs {
        CallArgs {
            positional: Vec::new(),
            keyword: self.values.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_macro() {
        assert_eq!(args![], CallArgs::new());
        let args = args![1, "a"; seed = 7, label = "x"];
        assert_eq!(args.positional, vec![Value::Int(1), Value::from("a")]);
        assert_eq!(
            args.keyword,
            vec![
                ("seed".to_string(), Value::Int(7)),
                ("label".to_string(), Value::from("x"))
            ]
        );
        let args = args![; n = 4];
        assert!(args.positional.is_empty());
        assert_eq!(args.keyword.len(), 1);
    }

    #[test]
    fn test_typed_access() {
        let kwargs = Kwargs::new(
            "f".to_string(),
            vec![("n".to_string(), Value::Int(4)), ("x".to_string(), Value::Null)],
        );
        assert_eq!(kwargs.get::<i64>("n").unwrap(), 4);
        assert_eq!(kwargs.get::<Option<f64>>("x").unwrap(), None);
        assert!(matches!(
            kwargs.get::<String>("n"),
            Err(ArgumentError::InvalidValue { .. })
        ));
        let err = kwargs.get::<i64>("missing").unwrap_err();
        assert!(matches!(err, ArgumentError::UndeclaredField { .. }));
        assert_eq!(err.subject(), "missing");
        assert_eq!(err.to_string(), "f() declares no field 'missing' to read");
        assert_eq!(kwargs.iter().map(|(k, _)| k).collect::<Vec<_>>(), ["n", "x"]);
    }
}
