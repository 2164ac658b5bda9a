//! Primitive scalar loaders

use crate::error::{LoadError, LoadResult};
use crate::loaded::Loaded;
use crate::parser::kind_name;
use serde_json::Value;

/// Scalar kinds accepted by a primitive loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Null,
    Bool,
    /// Integers, including `long`
    Int,
    /// Floating point numbers, including `double`; integers are not accepted
    Float,
    String,
}

impl PrimitiveKind {
    /// Name used in messages and in the type DSL
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Null => "null",
            PrimitiveKind::Bool => "boolean",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::String => "string",
        }
    }

    /// Check whether `value` is of exactly this kind
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (PrimitiveKind::Null, Value::Null) => true,
            (PrimitiveKind::Bool, Value::Bool(_)) => true,
            (PrimitiveKind::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (PrimitiveKind::Float, Value::Number(n)) => n.is_f64(),
            (PrimitiveKind::String, Value::String(_)) => true,
            _ => false,
        }
    }

    pub(crate) fn load(&self, value: &Value) -> LoadResult<Loaded> {
        if self.matches(value) {
            Ok(Loaded::Value(value.clone()))
        } else {
            Err(LoadError::validation(format!(
                "Expected a {} but got {}",
                self.name(),
                kind_name(value)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exact_kinds() {
        assert!(PrimitiveKind::Int.matches(&json!(3)));
        assert!(PrimitiveKind::Float.matches(&json!(3.5)));
        assert!(PrimitiveKind::String.matches(&json!("3")));
        assert!(PrimitiveKind::Bool.matches(&json!(false)));
        assert!(PrimitiveKind::Null.matches(&Value::Null));
    }

    #[test]
    fn test_no_coercion() {
        assert!(!PrimitiveKind::Int.matches(&json!("3")));
        assert!(!PrimitiveKind::String.matches(&json!(3)));
        assert!(!PrimitiveKind::Float.matches(&json!(3)));
        assert!(!PrimitiveKind::Int.matches(&json!(3.0)));
        assert!(!PrimitiveKind::Bool.matches(&json!("true")));
    }

    #[test]
    fn test_mismatch_message() {
        let err = PrimitiveKind::Int.load(&json!("x")).unwrap_err();
        assert_eq!(err.to_string(), "Expected a int but got string");

        let err = PrimitiveKind::String.load(&json!([1])).unwrap_err();
        assert_eq!(err.to_string(), "Expected a string but got array");
    }
}
