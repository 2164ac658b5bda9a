//! Loading context threaded through a document load
//!
//! A [`LoadingContext`] is immutable once built. Changing any of its settings
//! means deriving a new context through [`LoadingContextBuilder`], which
//! copies the parent and applies overrides. All contexts derived from one
//! root share the same [`DocumentCache`].
//!
//! The vocabulary maps (`vocab` and `rvocab`) are computed once when a
//! context is built, from the base [`Vocabulary`] overlaid with the
//! context's namespaces.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use crate::cache::DocumentCache;
use crate::config::{LoaderConfig, DEFAULT_MAX_IMPORT_DEPTH};
use crate::error::{LoadError, LoadResult, ValidationError};
use crate::fetcher::{DefaultFetcher, Fetcher};
use crate::uri::{self, UrlSplit};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Namespace of the salad built-in types
pub const SALAD_NAMESPACE: &str = "https://w3id.org/cwl/salad#";

/// Namespace of the XML Schema primitive types
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

/// Ordered term → absolute URI table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    terms: IndexMap<String, String>,
}

impl Vocabulary {
    /// Create an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in vocabulary of salad base types
    pub fn salad() -> Self {
        let mut vocabulary = Self::new();
        for term in ["null", "Any", "array", "record", "enum", "map", "union"] {
            vocabulary.insert(term, format!("{SALAD_NAMESPACE}{term}"));
        }
        for term in ["boolean", "int", "long", "float", "double", "string"] {
            vocabulary.insert(term, format!("{XSD_NAMESPACE}{term}"));
        }
        vocabulary
    }

    /// Add a term
    pub fn insert(&mut self, term: impl Into<String>, uri: impl Into<String>) {
        self.terms.insert(term.into(), uri.into());
    }

    /// Builder-style variant of [`insert`](Self::insert)
    pub fn with_term(mut self, term: impl Into<String>, uri: impl Into<String>) -> Self {
        self.insert(term, uri);
        self
    }

    /// The URI a term maps to
    pub fn get(&self, term: &str) -> Option<&str> {
        self.terms.get(term).map(String::as_str)
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Check whether the vocabulary has no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterate over `(term, uri)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Vocabulary
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vocabulary = Self::new();
        for (term, uri) in iter {
            vocabulary.insert(term, uri);
        }
        vocabulary
    }
}

/// Flags controlling how a URI-typed value is expanded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UriScope {
    /// Anchor relative names as fragments under the base URI
    pub scoped_id: bool,
    /// Resolve vocabulary terms and contract results back to terms
    pub vocab_term: bool,
    /// Anchor relative names under the base fragment, minus this many
    /// leading segments
    pub scoped_ref: Option<usize>,
}

impl UriScope {
    /// Plain relative-reference resolution
    pub fn plain() -> Self {
        Self::default()
    }

    /// Identifier scoping
    pub fn id() -> Self {
        Self {
            scoped_id: true,
            ..Self::default()
        }
    }

    /// Vocabulary term resolution
    pub fn vocab() -> Self {
        Self {
            vocab_term: true,
            ..Self::default()
        }
    }

    /// Reference scoping with the given depth
    pub fn reference(depth: usize) -> Self {
        Self {
            scoped_ref: Some(depth),
            ..Self::default()
        }
    }

    /// Additionally resolve vocabulary terms
    pub fn with_vocab_term(mut self) -> Self {
        self.vocab_term = true;
        self
    }
}

/// State carried through one document load
#[derive(Debug, Clone)]
pub struct LoadingContext {
    fetcher: Arc<dyn Fetcher>,
    file_uri: Option<String>,
    namespaces: Option<IndexMap<String, String>>,
    schemas: Option<Vec<String>>,
    base_uri: Option<String>,
    container: Option<String>,
    cache: DocumentCache,
    vocabulary: Arc<Vocabulary>,
    vocab: Arc<HashMap<String, String>>,
    rvocab: Arc<HashMap<String, String>>,
    import_stack: Vec<String>,
    max_import_depth: usize,
}

impl Default for LoadingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingContext {
    /// A root context with the default fetcher and the salad vocabulary
    pub fn new() -> Self {
        LoadingContextBuilder::new().build()
    }

    /// Start building a root context
    pub fn builder() -> LoadingContextBuilder {
        LoadingContextBuilder::new()
    }

    /// Start deriving a child context from this one
    pub fn derive(&self) -> LoadingContextBuilder {
        LoadingContextBuilder::copied_from(self)
    }

    /// The fetcher used for joins and retrieval
    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    /// URI of the document currently being loaded
    pub fn file_uri(&self) -> Option<&str> {
        self.file_uri.as_deref()
    }

    /// Namespace prefixes in effect
    pub fn namespaces(&self) -> Option<&IndexMap<String, String>> {
        self.namespaces.as_ref()
    }

    /// Schema URIs declared by the document
    pub fn schemas(&self) -> Option<&[String]> {
        self.schemas.as_deref()
    }

    /// Base URI declared by `$base`
    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    /// Container tag set by the enclosing map loader
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// The shared document cache
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Term → URI map
    pub fn vocab(&self) -> &HashMap<String, String> {
        &self.vocab
    }

    /// URI → term map
    pub fn rvocab(&self) -> &HashMap<String, String> {
        &self.rvocab
    }

    /// URLs resolved through `$import` so far
    pub fn imports(&self) -> Vec<String> {
        self.cache.imports()
    }

    /// URLs resolved through `$include` so far
    pub fn includes(&self) -> Vec<String> {
        self.cache.includes()
    }

    /// Number of documents on the current `$import` chain
    pub fn import_depth(&self) -> usize {
        self.import_stack.len()
    }

    /// Maximum length of the `$import` chain
    pub fn max_import_depth(&self) -> usize {
        self.max_import_depth
    }

    /// Resolve `url` against `base_url` with the context's fetcher
    pub fn url_join(&self, base_url: &str, url: &str) -> Result<String, ValidationError> {
        self.fetcher.url_join(base_url, url)
    }

    /// Expand `url` into an absolute URI (or a vocabulary term).
    ///
    /// Fails only when `scope.vocab_term` is set and the result has no
    /// scheme, or when the fetcher refuses the join.
    pub fn expand_url(
        &self,
        url: &str,
        base_url: &str,
        scope: UriScope,
    ) -> Result<String, ValidationError> {
        if url == "@id" || url == "@type" {
            return Ok(url.to_string());
        }
        if scope.vocab_term && self.vocab.contains_key(url) {
            return Ok(url.to_string());
        }

        let mut url = url.to_string();
        if !self.vocab.is_empty() {
            if let Some((prefix, rest)) = url.split_once(':') {
                if let Some(namespace) = self.vocab.get(prefix) {
                    url = format!("{namespace}{rest}");
                }
            }
        }

        let parts = uri::split(&url);
        let absolute = !parts.scheme.is_empty()
            && self
                .fetcher
                .supported_schemes()
                .contains(&parts.scheme.as_str());

        if absolute || url.starts_with("$(") || url.starts_with("${") {
            // already absolute, or an expression left for later evaluation
        } else if scope.scoped_id && !parts.has_fragment() {
            let base = uri::split(base_url);
            let fragment = if base.has_fragment() {
                format!("{}/{}", base.fragment, parts.path)
            } else {
                parts.path
            };
            let path = if base.path.is_empty() {
                "/".to_string()
            } else {
                base.path
            };
            url = UrlSplit {
                scheme: base.scheme,
                netloc: base.netloc,
                path,
                query: base.query,
                fragment,
            }
            .unsplit();
        } else if let Some(depth) = scope.scoped_ref.filter(|_| !parts.has_fragment()) {
            let base = uri::split(base_url);
            let fragment = {
                let mut segments: Vec<&str> = uri::fragment_segments(&base.fragment)
                    .into_iter()
                    .skip(depth)
                    .collect();
                segments.push(&url);
                segments.join("/")
            };
            url = UrlSplit {
                fragment,
                ..base
            }
            .unsplit();
        } else {
            url = self.fetcher.url_join(base_url, &url)?;
        }

        if scope.vocab_term {
            if uri::split(&url).scheme.is_empty() {
                return Err(ValidationError::new(format!("Term '{url}' not in vocabulary")));
            }
            if let Some(term) = self.rvocab.get(&url) {
                return Ok(term.clone());
            }
        }

        Ok(url)
    }

    /// Derive the context for loading the document at `url` through `$import`.
    ///
    /// Fails if `url` is already on the import chain or the chain would grow
    /// past the configured depth.
    pub(crate) fn entering(&self, url: &str) -> LoadResult<LoadingContext> {
        if self.import_stack.iter().any(|entry| entry == url) {
            warn!("Rejecting circular $import of {}", url);
            return Err(LoadError::validation(format!("circular $import of {url}")));
        }
        if self.import_stack.len() >= self.max_import_depth {
            return Err(LoadError::validation(format!(
                "$import of {url} exceeds the maximum depth of {}",
                self.max_import_depth
            )));
        }

        let mut stack = self.import_stack.clone();
        stack.push(url.to_string());
        Ok(self.derive().file_uri(url).import_stack(stack).build())
    }
}

/// Builder for root and derived [`LoadingContext`]s
#[derive(Debug, Default)]
pub struct LoadingContextBuilder {
    parent: Option<LoadingContext>,
    fetcher: Option<Arc<dyn Fetcher>>,
    file_uri: Option<String>,
    namespaces: Option<IndexMap<String, String>>,
    schemas: Option<Vec<String>>,
    base_uri: Option<String>,
    container: Option<String>,
    cache: Option<DocumentCache>,
    vocabulary: Option<Arc<Vocabulary>>,
    import_stack: Option<Vec<String>>,
    max_import_depth: Option<usize>,
}

impl LoadingContextBuilder {
    /// Builder for a root context
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder that copies every setting of `parent` unless overridden
    pub fn copied_from(parent: &LoadingContext) -> Self {
        Self {
            parent: Some(parent.clone()),
            ..Self::default()
        }
    }

    /// Builder for a root context configured from a [`LoaderConfig`]
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new()
            .fetcher(Arc::new(DefaultFetcher::with_config(config.fetcher.clone())))
            .max_import_depth(config.max_import_depth)
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn file_uri(mut self, file_uri: impl Into<String>) -> Self {
        self.file_uri = Some(file_uri.into());
        self
    }

    /// Replace the namespace prefixes; the vocabulary maps are recomputed
    pub fn namespaces(mut self, namespaces: IndexMap<String, String>) -> Self {
        self.namespaces = Some(namespaces);
        self
    }

    pub fn schemas(mut self, schemas: Vec<String>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Use a specific cache instead of the parent's (or a fresh one)
    pub fn cache(mut self, cache: DocumentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the base vocabulary; the vocabulary maps are recomputed
    pub fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(Arc::new(vocabulary));
        self
    }

    pub fn max_import_depth(mut self, max_import_depth: usize) -> Self {
        self.max_import_depth = Some(max_import_depth);
        self
    }

    fn import_stack(mut self, import_stack: Vec<String>) -> Self {
        self.import_stack = Some(import_stack);
        self
    }

    /// Build the context
    pub fn build(self) -> LoadingContext {
        let parent = self.parent;
        let recompute_vocab =
            parent.is_none() || self.namespaces.is_some() || self.vocabulary.is_some();

        let fetcher = self
            .fetcher
            .or_else(|| parent.as_ref().map(|p| Arc::clone(&p.fetcher)))
            .unwrap_or_else(|| Arc::new(DefaultFetcher::new()));
        let vocabulary = self
            .vocabulary
            .or_else(|| parent.as_ref().map(|p| Arc::clone(&p.vocabulary)))
            .unwrap_or_else(|| Arc::new(Vocabulary::salad()));
        let namespaces = self
            .namespaces
            .or_else(|| parent.as_ref().and_then(|p| p.namespaces.clone()));

        let (vocab, rvocab) = match parent.as_ref().filter(|_| !recompute_vocab) {
            Some(p) => (Arc::clone(&p.vocab), Arc::clone(&p.rvocab)),
            None => {
                let (vocab, rvocab) = build_vocab(&vocabulary, namespaces.as_ref());
                (Arc::new(vocab), Arc::new(rvocab))
            }
        };

        LoadingContext {
            file_uri: self
                .file_uri
                .or_else(|| parent.as_ref().and_then(|p| p.file_uri.clone())),
            schemas: self
                .schemas
                .or_else(|| parent.as_ref().and_then(|p| p.schemas.clone())),
            base_uri: self
                .base_uri
                .or_else(|| parent.as_ref().and_then(|p| p.base_uri.clone())),
            container: self
                .container
                .or_else(|| parent.as_ref().and_then(|p| p.container.clone())),
            cache: self
                .cache
                .or_else(|| parent.as_ref().map(|p| p.cache.clone()))
                .unwrap_or_default(),
            import_stack: self
                .import_stack
                .or_else(|| parent.as_ref().map(|p| p.import_stack.clone()))
                .unwrap_or_default(),
            max_import_depth: self
                .max_import_depth
                .or_else(|| parent.as_ref().map(|p| p.max_import_depth))
                .unwrap_or(DEFAULT_MAX_IMPORT_DEPTH),
            fetcher,
            namespaces,
            vocabulary,
            vocab,
            rvocab,
        }
    }
}

fn build_vocab(
    vocabulary: &Vocabulary,
    namespaces: Option<&IndexMap<String, String>>,
) -> (HashMap<String, String>, HashMap<String, String>) {
    let mut vocab = HashMap::new();
    let mut rvocab = HashMap::new();
    let overlay = namespaces.into_iter().flatten();
    for (term, uri) in vocabulary
        .iter()
        .chain(overlay.map(|(k, v)| (k.as_str(), v.as_str())))
    {
        vocab.insert(term.to_string(), uri.to_string());
        rvocab.insert(uri.to_string(), term.to_string());
    }
    (vocab, rvocab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MemoryFetcher;

    fn context() -> LoadingContext {
        LoadingContext::builder()
            .fetcher(Arc::new(MemoryFetcher::new()))
            .build()
    }

    fn with_namespaces(pairs: &[(&str, &str)]) -> LoadingContext {
        let namespaces = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        context().derive().namespaces(namespaces).build()
    }

    #[test]
    fn test_builtin_vocabulary() {
        let ctx = context();
        assert_eq!(
            ctx.vocab().get("string").map(String::as_str),
            Some("http://www.w3.org/2001/XMLSchema#string")
        );
        assert_eq!(
            ctx.rvocab().get("https://w3id.org/cwl/salad#record").map(String::as_str),
            Some("record")
        );
    }

    #[test]
    fn test_derivation_shares_cache_and_vocab() {
        let root = context();
        let child = root.derive().file_uri("file:///a.yml").container("inputs").build();

        assert!(root.cache().ptr_eq(child.cache()));
        assert!(Arc::ptr_eq(&root.vocab, &child.vocab));
        assert_eq!(child.file_uri(), Some("file:///a.yml"));
        assert_eq!(child.container(), Some("inputs"));
        assert_eq!(root.file_uri(), None);

        let grandchild = child.derive().build();
        assert_eq!(grandchild.file_uri(), Some("file:///a.yml"));
    }

    #[test]
    fn test_namespaces_recompute_vocab() {
        let root = context();
        let child = with_namespaces(&[("ex", "http://example.org/")]);

        assert_eq!(child.vocab().get("ex").map(String::as_str), Some("http://example.org/"));
        assert_eq!(child.rvocab().get("http://example.org/").map(String::as_str), Some("ex"));
        assert!(!root.vocab().contains_key("ex"));

        // inherited by further derivations
        let grandchild = child.derive().file_uri("file:///b.yml").build();
        assert!(grandchild.vocab().contains_key("ex"));
    }

    #[test]
    fn test_expand_passthrough() {
        let ctx = context();
        let base = "file:///work/doc.yml";
        assert_eq!(ctx.expand_url("@id", base, UriScope::plain()).unwrap(), "@id");
        assert_eq!(ctx.expand_url("@type", base, UriScope::vocab()).unwrap(), "@type");
        assert_eq!(
            ctx.expand_url("http://example.com/x", base, UriScope::id()).unwrap(),
            "http://example.com/x"
        );
        assert_eq!(ctx.expand_url("$(inputs.x)", base, UriScope::id()).unwrap(), "$(inputs.x)");
        assert_eq!(ctx.expand_url("${return 1;}", base, UriScope::plain()).unwrap(), "${return 1;}");
    }

    #[test]
    fn test_expand_namespace_prefix() {
        let ctx = with_namespaces(&[("ex", "http://example.org/")]);
        assert_eq!(
            ctx.expand_url("ex:Thing", "file:///work/doc.yml", UriScope::plain()).unwrap(),
            "http://example.org/Thing"
        );
    }

    #[test]
    fn test_expand_scoped_id() {
        let ctx = context();
        assert_eq!(
            ctx.expand_url("step", "file:///work/doc.yml", UriScope::id()).unwrap(),
            "file:///work/doc.yml#step"
        );
        assert_eq!(
            ctx.expand_url("out", "file:///work/doc.yml#main/step", UriScope::id()).unwrap(),
            "file:///work/doc.yml#main/step/out"
        );
        assert_eq!(
            ctx.expand_url("x", "http://example.com", UriScope::id()).unwrap(),
            "http://example.com/#x"
        );
        // an explicit fragment falls back to plain resolution
        assert_eq!(
            ctx.expand_url("#other", "file:///work/doc.yml#main", UriScope::id()).unwrap(),
            "file:///work/doc.yml#other"
        );
    }

    #[test]
    fn test_expand_scoped_ref() {
        let ctx = context();
        let base = "file:///work/doc.yml#main/step/in";
        assert_eq!(
            ctx.expand_url("src", base, UriScope::reference(1)).unwrap(),
            "file:///work/doc.yml#step/in/src"
        );
        assert_eq!(
            ctx.expand_url("src", base, UriScope::reference(2)).unwrap(),
            "file:///work/doc.yml#in/src"
        );
        assert_eq!(
            ctx.expand_url("src", base, UriScope::reference(9)).unwrap(),
            "file:///work/doc.yml#src"
        );
        assert_eq!(
            ctx.expand_url("src", "file:///work/doc.yml", UriScope::reference(0)).unwrap(),
            "file:///work/doc.yml#src"
        );
    }

    #[test]
    fn test_expand_plain_join() {
        let ctx = context();
        assert_eq!(
            ctx.expand_url("other.yml", "file:///work/doc.yml", UriScope::plain()).unwrap(),
            "file:///work/other.yml"
        );
        assert!(ctx
            .expand_url("file:///etc/passwd", "http://example.com/doc.yml", UriScope::plain())
            .is_ok());
    }

    #[test]
    fn test_expand_vocab_terms() {
        let ctx = with_namespaces(&[("ex", "http://example.org/")]);
        let base = "file:///work/doc.yml";

        assert_eq!(ctx.expand_url("string", base, UriScope::vocab()).unwrap(), "string");
        assert_eq!(
            ctx.expand_url("http://www.w3.org/2001/XMLSchema#int", base, UriScope::vocab())
                .unwrap(),
            "int"
        );
        assert_eq!(
            ctx.expand_url("xsd_unknown", base, UriScope::vocab()).unwrap(),
            "file:///work/xsd_unknown"
        );

        let err = ctx.expand_url("Unknown", "", UriScope::vocab()).unwrap_err();
        assert_eq!(err.message(), "Term 'Unknown' not in vocabulary");
    }

    #[test]
    fn test_entering_rejects_cycles() {
        let ctx = context();
        let a = ctx.entering("file:///a.yml").unwrap();
        assert_eq!(a.file_uri(), Some("file:///a.yml"));
        assert_eq!(a.import_depth(), 1);

        let b = a.entering("file:///b.yml").unwrap();
        let err = b.entering("file:///a.yml").unwrap_err();
        assert!(err.to_string().contains("circular $import of file:///a.yml"));

        // siblings are independent
        assert!(a.entering("file:///c.yml").is_ok());
    }

    #[test]
    fn test_entering_respects_depth() {
        let ctx = context().derive().max_import_depth(1).build();
        let a = ctx.entering("file:///a.yml").unwrap();
        let err = a.entering("file:///b.yml").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("maximum depth of 1"));
    }
}
