//! Type shorthand expansion
//!
//! Type names may carry suffixes: `T?` means `["null", T]` and `T[]` means
//! `{"type": "array", "items": T}`. From salad v1.3 on the array suffix may be
//! repeated (`T[][]`); earlier versions leave such strings untouched so the
//! inner loader reports them as written.

use super::LoaderRef;
use crate::context::{LoadingContext, UriScope};
use crate::error::{LoadResult, ValidationError};
use crate::loaded::Loaded;
use serde_json::{json, Value};

/// Salad version assumed when none is configured
pub const DEFAULT_SALAD_VERSION: (u32, u32) = (1, 3);

/// First version allowing nested array suffixes
const NESTED_ARRAYS_SINCE: (u32, u32) = (1, 3);

#[derive(Debug, Clone)]
pub struct TypeDslLoader {
    inner: LoaderRef,
    ref_scope: Option<usize>,
    salad_version: (u32, u32),
}

impl TypeDslLoader {
    pub fn new(inner: LoaderRef, ref_scope: Option<usize>) -> Self {
        Self {
            inner,
            ref_scope,
            salad_version: DEFAULT_SALAD_VERSION,
        }
    }

    pub fn with_salad_version(mut self, major: u32, minor: u32) -> Self {
        self.salad_version = (major, minor);
        self
    }

    pub fn inner(&self) -> &LoaderRef {
        &self.inner
    }

    pub(crate) fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        let expanded = match value {
            Value::String(name) => self.resolve(name, base_uri, ctx)?,
            Value::Array(items) => {
                let mut resolved_items: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    let Value::String(name) = item else {
                        resolved_items.push(item.clone());
                        continue;
                    };
                    let resolved = match self.resolve(name, base_uri, ctx)? {
                        Value::Array(alternatives) => alternatives,
                        single => vec![single],
                    };
                    for entry in resolved {
                        if !resolved_items.contains(&entry) {
                            resolved_items.push(entry);
                        }
                    }
                }
                Value::Array(resolved_items)
            }
            other => other.clone(),
        };
        self.inner.load(&expanded, base_uri, ctx, None)
    }

    fn resolve(
        &self,
        name: &str,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> Result<Value, ValidationError> {
        if !is_type_shorthand(name) {
            return Ok(Value::String(name.to_string()));
        }
        let (body, optional) = match name.strip_suffix('?') {
            Some(body) => (body, true),
            None => (name, false),
        };

        let expanded = match body.strip_suffix("[]") {
            Some(items) if self.salad_version < NESTED_ARRAYS_SINCE => {
                if items.ends_with("[]") {
                    return Ok(Value::String(name.to_string()));
                }
                json!({"type": "array", "items": self.expand(items, base_uri, ctx)?})
            }
            Some(items) => {
                json!({"type": "array", "items": self.resolve(items, base_uri, ctx)?})
            }
            None => Value::String(self.expand(body, base_uri, ctx)?),
        };

        if optional {
            Ok(json!(["null", expanded]))
        } else {
            Ok(expanded)
        }
    }

    fn expand(&self, name: &str, base_uri: &str, ctx: &LoadingContext) -> Result<String, ValidationError> {
        let scope = UriScope {
            scoped_ref: self.ref_scope,
            ..UriScope::vocab()
        };
        ctx.expand_url(name, base_uri, scope)
    }
}

/// `Name([])*?` with a non-empty name free of `[` and `?`
fn is_type_shorthand(name: &str) -> bool {
    let mut stem = name.strip_suffix('?').unwrap_or(name);
    while let Some(inner) = stem.strip_suffix("[]") {
        stem = inner;
    }
    !stem.is_empty() && !stem.contains(['[', '?'])
}
