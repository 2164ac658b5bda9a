//! Secondary-file pattern shorthand
//!
//! `"p"` becomes `{pattern: p}`, `"p?"` becomes `{pattern: p, required: false}`,
//! mappings are checked to hold only `pattern` and `required`, and sequences
//! are normalised element by element. The inner loader always receives a
//! sequence.

use super::LoaderRef;
use crate::context::LoadingContext;
use crate::error::{LoadError, LoadResult};
use crate::loaded::Loaded;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct SecondaryDslLoader {
    inner: LoaderRef,
}

impl SecondaryDslLoader {
    pub fn new(inner: LoaderRef) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &LoaderRef {
        &self.inner
    }

    pub(crate) fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
        doc_root: Option<&str>,
    ) -> LoadResult<Loaded> {
        let entries = match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(pattern) => Ok(from_pattern(pattern)),
                    Value::Object(spec) => from_mapping(spec),
                    _ => Err(LoadError::validation(
                        "Expected a string or sequence of (strings or mappings).",
                    )),
                })
                .collect::<LoadResult<Vec<_>>>()?,
            Value::Object(spec) => vec![from_mapping(spec)?],
            Value::String(pattern) => vec![from_pattern(pattern)],
            _ => return Err(LoadError::validation("Expected str or sequence of str")),
        };
        self.inner.load(&Value::Array(entries), base_uri, ctx, doc_root)
    }
}

fn from_pattern(pattern: &str) -> Value {
    let mut entry = Map::new();
    match pattern.strip_suffix('?') {
        Some(stripped) => {
            entry.insert("pattern".to_string(), Value::String(stripped.to_string()));
            entry.insert("required".to_string(), Value::Bool(false));
        }
        None => {
            entry.insert("pattern".to_string(), Value::String(pattern.to_string()));
        }
    }
    Value::Object(entry)
}

fn from_mapping(spec: &Map<String, Value>) -> LoadResult<Value> {
    let Some(pattern) = spec.get("pattern") else {
        return Err(LoadError::validation(format!(
            "Missing pattern in secondaryFiles specification entry: {}",
            Value::Object(spec.clone())
        )));
    };

    let unallowed: Map<String, Value> = spec
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "pattern" | "required"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if !unallowed.is_empty() {
        return Err(LoadError::validation(format!(
            "Unallowed values in secondaryFiles specification entry: {}",
            Value::Object(unallowed)
        )));
    }

    let mut entry = Map::new();
    entry.insert("pattern".to_string(), pattern.clone());
    if let Some(required) = spec.get("required") {
        entry.insert("required".to_string(), required.clone());
    }
    Ok(Value::Object(entry))
}
