//! Named-map shorthand expansion
//!
//! Schemas may let a list of records be written as a mapping keyed by one of
//! the records' fields (the "subject"). For a subject of `id`:
//!
//! ```yaml
//! inputs:
//!   threads: {type: int}
//!   name: string
//! ```
//!
//! becomes `[{id: name, type: string}, {id: threads, type: int}]` when the
//! predicate is `type`. Keys are visited in sorted order.

use super::LoaderRef;
use crate::context::LoadingContext;
use crate::error::{LoadError, LoadResult};
use crate::loaded::Loaded;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct IdMapLoader {
    inner: LoaderRef,
    subject: String,
    predicate: Option<String>,
}

impl IdMapLoader {
    /// `subject` receives each key; non-mapping values are stored under
    /// `predicate`
    pub fn new(inner: LoaderRef, subject: impl Into<String>, predicate: Option<String>) -> Self {
        Self {
            inner,
            subject: subject.into(),
            predicate,
        }
    }

    pub fn inner(&self) -> &LoaderRef {
        &self.inner
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn predicate(&self) -> Option<&str> {
        self.predicate.as_deref()
    }

    pub(crate) fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        match value {
            Value::Object(entries) => {
                let expanded = self.expand(entries)?;
                self.inner.load(&expanded, base_uri, ctx, None)
            }
            other => self.inner.load(other, base_uri, ctx, None),
        }
    }

    fn expand(&self, entries: &Map<String, Value>) -> LoadResult<Value> {
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();

        let mut expanded = Vec::with_capacity(keys.len());
        for key in keys {
            let mut item = match (&entries[key.as_str()], &self.predicate) {
                (Value::Object(fields), _) => fields.clone(),
                (other, Some(predicate)) => {
                    let mut fields = Map::new();
                    fields.insert(predicate.clone(), other.clone());
                    fields
                }
                (_, None) => {
                    return Err(LoadError::validation(format!(
                        "No mapPredicate was specified for `{key}`"
                    )))
                }
            };
            item.insert(self.subject.clone(), Value::String(key.clone()));
            expanded.push(Value::Object(item));
        }
        Ok(Value::Array(expanded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Loader;
    use serde_json::json;

    fn loader(predicate: Option<&str>) -> IdMapLoader {
        IdMapLoader::new(Loader::array(Loader::any()), "id", predicate.map(str::to_string))
    }

    #[test]
    fn test_mapping_becomes_sorted_sequence() {
        let ctx = LoadingContext::new();
        let loaded = loader(Some("type"))
            .load(&json!({"threads": {"type": "int"}, "name": "string"}), "", &ctx)
            .unwrap();

        assert_eq!(
            loaded.save(false, "", false),
            json!([
                {"type": "string", "id": "name"},
                {"type": "int", "id": "threads"}
            ])
        );
    }

    #[test]
    fn test_missing_predicate() {
        let ctx = LoadingContext::new();
        let err = loader(None).load(&json!({"name": "string"}), "", &ctx).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("No mapPredicate was specified"));
    }

    #[test]
    fn test_sequences_pass_through() {
        let ctx = LoadingContext::new();
        let input = json!([{"id": "a"}]);
        let loaded = loader(None).load(&input, "", &ctx).unwrap();
        assert_eq!(loaded.save(false, "", false), input);
    }
}
