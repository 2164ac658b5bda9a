//! String-keyed mapping loaders

use super::LoaderRef;
use crate::context::LoadingContext;
use crate::error::{LoadError, LoadResult, ValidationError};
use crate::loaded::Loaded;
use crate::parser::kind_name;
use indexmap::IndexMap;
use serde_json::Value;
use std::borrow::Cow;

/// Loads every value of a mapping with a value loader
#[derive(Debug, Clone)]
pub struct MapLoader {
    values: LoaderRef,
    container: Option<String>,
}

impl MapLoader {
    /// `container` is attached to the context the values are loaded with
    pub fn new(values: LoaderRef, container: Option<String>) -> Self {
        Self { values, container }
    }

    pub fn values(&self) -> &LoaderRef {
        &self.values
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub(crate) fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        let Value::Object(entries) = value else {
            return Err(LoadError::validation(format!(
                "Value is a {}, but valid type for this field is a map.",
                kind_name(value)
            )));
        };

        let ctx = match &self.container {
            Some(container) => Cow::Owned(ctx.derive().container(container.as_str()).build()),
            None => Cow::Borrowed(ctx),
        };

        let mut loaded = IndexMap::with_capacity(entries.len());
        let mut errors = Vec::new();
        for (key, entry) in entries {
            match self.values.load_field(entry, base_uri, &ctx) {
                Ok(item) => {
                    loaded.insert(key.clone(), item);
                }
                Err(LoadError::Validation(error)) => errors.push(ValidationError::wrap(
                    format!("the `{key}` field is invalid because"),
                    error,
                )),
                Err(other) => return Err(other),
            }
        }

        if errors.is_empty() {
            Ok(Loaded::Map(loaded))
        } else {
            Err(ValidationError::aggregate(errors).into())
        }
    }
}
