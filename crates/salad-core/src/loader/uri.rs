//! Loaders that normalise identifiers into absolute URIs

use super::LoaderRef;
use crate::context::{LoadingContext, UriScope};
use crate::error::LoadResult;
use crate::loaded::Loaded;
use serde_json::Value;

/// Expands string values with [`LoadingContext::expand_url`] before
/// delegating to the inner loader
#[derive(Debug, Clone)]
pub struct UriLoader {
    inner: LoaderRef,
    scope: UriScope,
}

impl UriLoader {
    pub fn new(inner: LoaderRef, scope: UriScope) -> Self {
        Self { inner, scope }
    }

    pub fn inner(&self) -> &LoaderRef {
        &self.inner
    }

    pub fn scope(&self) -> UriScope {
        self.scope
    }

    pub(crate) fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        let expanded = match value {
            Value::String(url) => Value::String(ctx.expand_url(url, base_uri, self.scope)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(url) => {
                            ctx.expand_url(url, base_uri, self.scope).map(Value::String)
                        }
                        other => Ok(other.clone()),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            other => other.clone(),
        };
        self.inner.load(&expanded, base_uri, ctx, None)
    }
}
