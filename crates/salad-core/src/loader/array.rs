//! Sequence loaders

use super::{Loader, LoaderRef, UnionLoader};
use crate::context::LoadingContext;
use crate::error::{LoadError, LoadResult, ValidationError};
use crate::loaded::Loaded;
use crate::parser::kind_name;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Loads every element of a sequence with an item loader.
///
/// With flattening enabled, an element that is itself a sequence (or an
/// `$import` resolving to one) is loaded as an array and spliced into the
/// result.
#[derive(Debug, Clone)]
pub struct ArrayLoader {
    items: LoaderRef,
    flatten: bool,
}

impl ArrayLoader {
    pub fn new(items: LoaderRef) -> Self {
        Self {
            items,
            flatten: true,
        }
    }

    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    pub fn items(&self) -> &LoaderRef {
        &self.items
    }

    pub fn flattens(&self) -> bool {
        self.flatten
    }

    pub(crate) fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        let Value::Array(elements) = value else {
            return Err(LoadError::validation(format!(
                "Value is a {}, but valid type for this field is an array.",
                kind_name(value)
            )));
        };

        // self-or-item, so nested sequences can be spliced in
        let nested = self.flatten.then(|| {
            Loader::Union(UnionLoader::new(vec![
                Arc::new(Loader::Array(self.clone())),
                Arc::clone(&self.items),
            ]))
        });

        let mut loaded = Vec::with_capacity(elements.len());
        let mut errors = Vec::new();
        let mut ids = HashSet::new();

        for (index, element) in elements.iter().enumerate() {
            let element_loader = match &nested {
                Some(union) if may_be_sequence(element) => union,
                _ => self.items.as_ref(),
            };

            match element_loader.load_field(element, base_uri, ctx) {
                Ok(Loaded::List(items)) if nested.is_some() => loaded.extend(items),
                Ok(item) => loaded.push(item),
                Err(LoadError::Validation(error)) => {
                    errors.push(ValidationError::wrap(
                        format!("array item {index} is invalid because"),
                        error,
                    ));
                    continue;
                }
                Err(other) => return Err(other),
            }

            if let Some(id) = element.get("id").and_then(Value::as_str) {
                if !ids.insert(id) {
                    errors.push(ValidationError::new(format!("Duplicate field '{id}'")));
                }
            }
        }

        if errors.is_empty() {
            Ok(Loaded::List(loaded))
        } else {
            Err(ValidationError::aggregate(errors).into())
        }
    }
}

/// Elements that can only load through the array alternative
fn may_be_sequence(element: &Value) -> bool {
    match element {
        Value::Array(_) => true,
        Value::Object(map) => map.contains_key("$import"),
        _ => false,
    }
}
