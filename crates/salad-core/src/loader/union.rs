//! Ordered-choice loaders

use super::LoaderRef;
use crate::context::LoadingContext;
use crate::error::{LoadError, LoadResult, ValidationError};
use crate::loaded::Loaded;
use serde_json::Value;

/// Message of the error raised when no alternative matches
pub const NO_ALTERNATIVE_MATCHED: &str = "failed to match any alternative of union type";

/// Tries each alternative in order; the first success wins
#[derive(Debug, Clone)]
pub struct UnionLoader {
    alternates: Vec<LoaderRef>,
}

impl UnionLoader {
    pub fn new(alternates: Vec<LoaderRef>) -> Self {
        Self { alternates }
    }

    pub fn alternates(&self) -> &[LoaderRef] {
        &self.alternates
    }

    pub(crate) fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
        doc_root: Option<&str>,
    ) -> LoadResult<Loaded> {
        let mut errors = Vec::with_capacity(self.alternates.len());
        for alternate in &self.alternates {
            match alternate.load(value, base_uri, ctx, doc_root) {
                Ok(loaded) => return Ok(loaded),
                Err(LoadError::Validation(error)) => errors.push(
                    ValidationError::wrap(format!("tried `{alternate}` but"), error)
                        .with_bullet("- "),
                ),
                Err(other) => return Err(other),
            }
        }
        Err(ValidationError::with_children(NO_ALTERNATIVE_MATCHED, errors).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Loader;
    use serde_json::json;

    fn enum_or_int() -> UnionLoader {
        UnionLoader::new(vec![
            Loader::enumeration("Letter", ["a", "b"]),
            Loader::int(),
        ])
    }

    #[test]
    fn test_first_match_wins() {
        let ctx = LoadingContext::new();
        let loader = enum_or_int();
        assert_eq!(loader.load(&json!("a"), "", &ctx, None).unwrap().as_str(), Some("a"));
        assert_eq!(loader.load(&json!(2), "", &ctx, None).unwrap().as_i64(), Some(2));

        // both alternatives accept strings; order decides
        let strings = UnionLoader::new(vec![Loader::expression(), Loader::string()]);
        assert!(strings.load(&json!("x"), "", &ctx, None).is_ok());
    }

    #[test]
    fn test_all_failures_aggregated() {
        let ctx = LoadingContext::new();
        let err = enum_or_int().load(&json!("c"), "", &ctx, None).unwrap_err();
        let error = err.as_validation().unwrap();

        assert_eq!(error.message(), NO_ALTERNATIVE_MATCHED);
        assert_eq!(error.len(), 2);
        assert_eq!(error.children()[0].message(), "tried `Letter` but");
        assert_eq!(error.children()[1].message(), "tried `int` but");
        assert_eq!(
            error.leaf_messages(),
            vec!["Expected one of ['a', 'b']", "Expected a int but got string"]
        );

        let rendered = err.to_string();
        assert!(rendered.contains("\n  - tried `int` but\n    Expected a int but got string"));
    }
}
