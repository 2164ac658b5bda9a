//! Type-directed loaders
//!
//! A [`Loader`] validates an untyped document tree against one schema type and
//! converts it into a [`Loaded`] value. The set of loader kinds is closed;
//! composite kinds hold shared references ([`LoaderRef`]) to the loaders they
//! delegate to, so one loader graph can serve any number of loads at once.
//!
//! Besides [`Loader::load`], every loader supports the document protocol:
//! [`Loader::load_field`] resolves `$import` and `$include`,
//! [`Loader::document_load`] handles `$namespaces`, `$schemas`, `$base` and
//! `$graph`, and [`Loader::document_load_by_url`] fetches, parses and caches
//! referenced documents.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

mod array;
mod enumeration;
mod idmap;
mod map;
mod primitive;
mod secondary;
mod typedsl;
mod union;
mod uri;

pub use array::ArrayLoader;
pub use enumeration::EnumLoader;
pub use idmap::IdMapLoader;
pub use map::MapLoader;
pub use primitive::PrimitiveKind;
pub use secondary::SecondaryDslLoader;
pub use typedsl::{TypeDslLoader, DEFAULT_SALAD_VERSION};
pub use union::UnionLoader;
pub use uri::UriLoader;

use crate::context::{LoadingContext, UriScope};
use crate::error::{LoadError, LoadResult, ValidationError};
use crate::loaded::Loaded;
use crate::parser::{kind_name, text_to_tree};
use crate::record::{RecordFactory, RecordLoader};
use crate::uri as uri_util;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument, trace};

/// Shared handle to a loader
pub type LoaderRef = Arc<Loader>;

/// Document keys consumed by [`Loader::document_load`]
const DIRECTIVE_KEYS: &[&str] = &["$namespaces", "$schemas", "$base"];

/// A schema type, as a loader
#[derive(Debug, Clone)]
pub enum Loader {
    /// A scalar of exactly one kind
    Primitive(PrimitiveKind),
    /// Any non-null value, unchanged
    Any,
    /// A string holding an expression
    Expression,
    Enum(EnumLoader),
    Array(ArrayLoader),
    Map(MapLoader),
    Union(UnionLoader),
    IdMap(IdMapLoader),
    TypeDsl(TypeDslLoader),
    SecondaryDsl(SecondaryDslLoader),
    Uri(UriLoader),
    Record(RecordLoader),
    /// A named placeholder resolved after construction, for recursive types
    Deferred(DeferredLoader),
}

impl Loader {
    pub fn string() -> LoaderRef {
        Arc::new(Loader::Primitive(PrimitiveKind::String))
    }

    pub fn int() -> LoaderRef {
        Arc::new(Loader::Primitive(PrimitiveKind::Int))
    }

    pub fn float() -> LoaderRef {
        Arc::new(Loader::Primitive(PrimitiveKind::Float))
    }

    pub fn boolean() -> LoaderRef {
        Arc::new(Loader::Primitive(PrimitiveKind::Bool))
    }

    pub fn null() -> LoaderRef {
        Arc::new(Loader::Primitive(PrimitiveKind::Null))
    }

    pub fn any() -> LoaderRef {
        Arc::new(Loader::Any)
    }

    pub fn expression() -> LoaderRef {
        Arc::new(Loader::Expression)
    }

    /// Enum over `symbols`, reported as `name` in messages
    pub fn enumeration<N, I, S>(name: N, symbols: I) -> LoaderRef
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Loader::Enum(EnumLoader::new(name, symbols)))
    }

    /// Array that flattens nested sequences one level
    pub fn array(items: LoaderRef) -> LoaderRef {
        Arc::new(Loader::Array(ArrayLoader::new(items)))
    }

    /// Array that keeps nested sequences as elements
    pub fn array_no_flatten(items: LoaderRef) -> LoaderRef {
        Arc::new(Loader::Array(ArrayLoader::new(items).with_flatten(false)))
    }

    pub fn map(values: LoaderRef, container: Option<&str>) -> LoaderRef {
        Arc::new(Loader::Map(MapLoader::new(values, container.map(str::to_string))))
    }

    pub fn union(alternates: Vec<LoaderRef>) -> LoaderRef {
        Arc::new(Loader::Union(UnionLoader::new(alternates)))
    }

    /// `null` or `inner`
    pub fn optional(inner: LoaderRef) -> LoaderRef {
        Loader::union(vec![Loader::null(), inner])
    }

    pub fn id_map(inner: LoaderRef, subject: &str, predicate: Option<&str>) -> LoaderRef {
        Arc::new(Loader::IdMap(IdMapLoader::new(
            inner,
            subject,
            predicate.map(str::to_string),
        )))
    }

    pub fn type_dsl(inner: LoaderRef, ref_scope: Option<usize>) -> LoaderRef {
        Arc::new(Loader::TypeDsl(TypeDslLoader::new(inner, ref_scope)))
    }

    pub fn secondary_dsl(inner: LoaderRef) -> LoaderRef {
        Arc::new(Loader::SecondaryDsl(SecondaryDslLoader::new(inner)))
    }

    pub fn uri(inner: LoaderRef, scope: UriScope) -> LoaderRef {
        Arc::new(Loader::Uri(UriLoader::new(inner, scope)))
    }

    pub fn record(factory: Arc<dyn RecordFactory>) -> LoaderRef {
        Arc::new(Loader::Record(RecordLoader::new(factory)))
    }

    /// Placeholder that must be [`resolve`](DeferredLoader::resolve)d before use
    pub fn deferred(name: &str) -> (LoaderRef, DeferredLoader) {
        let deferred = DeferredLoader::new(name);
        (Arc::new(Loader::Deferred(deferred.clone())), deferred)
    }

    /// Validate and convert `value`.
    ///
    /// `doc_root` is the URI of the enclosing top-level document; it is only
    /// forwarded to record construction.
    pub fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
        doc_root: Option<&str>,
    ) -> LoadResult<Loaded> {
        match self {
            Loader::Primitive(kind) => kind.load(value),
            Loader::Any => match value {
                Value::Null => Err(LoadError::validation("Expected non-null")),
                other => Ok(Loaded::Value(other.clone())),
            },
            Loader::Expression => match value {
                Value::String(_) => Ok(Loaded::Value(value.clone())),
                other => Err(LoadError::validation(format!(
                    "Value is a {}, but valid type for this field is a string.",
                    kind_name(other)
                ))),
            },
            Loader::Enum(inner) => inner.load(value),
            Loader::Array(inner) => inner.load(value, base_uri, ctx),
            Loader::Map(inner) => inner.load(value, base_uri, ctx),
            Loader::Union(inner) => inner.load(value, base_uri, ctx, doc_root),
            Loader::IdMap(inner) => inner.load(value, base_uri, ctx),
            Loader::TypeDsl(inner) => inner.load(value, base_uri, ctx),
            Loader::SecondaryDsl(inner) => inner.load(value, base_uri, ctx, doc_root),
            Loader::Uri(inner) => inner.load(value, base_uri, ctx),
            Loader::Record(inner) => inner.load(value, base_uri, ctx, doc_root),
            Loader::Deferred(inner) => inner.get()?.load(value, base_uri, ctx, doc_root),
        }
    }

    /// Load a field value, resolving `$import` and `$include` first
    pub fn load_field(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        if let Value::Object(map) = value {
            if let Some(target) = map.get("$import") {
                let url = resolve_reference("$import", target, ctx)?;
                debug!("Resolving $import of {}", url);
                let loaded = self.document_load_by_url(&url, ctx)?;
                ctx.cache().record_import(url);
                return Ok(loaded);
            }
            if let Some(target) = map.get("$include") {
                let url = resolve_reference("$include", target, ctx)?;
                debug!("Resolving $include of {}", url);
                let text = ctx.fetcher().fetch_text(&url)?;
                ctx.cache().record_include(url);
                return self.load(&Value::String(text), base_uri, ctx, None);
            }
        }
        self.load(value, base_uri, ctx, None)
    }

    /// Load a top-level document tree.
    ///
    /// A string is a reference to another document, relative to `base_uri`,
    /// and is loaded through [`Loader::document_load_by_url`]. Source text
    /// that still needs parsing goes through [`Loader::document_load_text`].
    pub fn document_load(
        &self,
        document: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        match document {
            Value::String(reference) => {
                let url = ctx.url_join(base_uri, reference)?;
                self.document_load_by_url(&url, ctx)
            }
            Value::Object(map) => self.document_load_mapping(document, map, base_uri, ctx),
            Value::Array(_) => self.load(document, base_uri, ctx, None),
            other => Err(LoadError::validation(format!(
                "Expected URI string, mapping or sequence, got {}",
                kind_name(other)
            ))),
        }
    }

    fn document_load_mapping(
        &self,
        document: &Value,
        map: &Map<String, Value>,
        base_uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        let mut derived = ctx.derive();
        if let Some(declared) = map.get("$namespaces") {
            let declared = parse_namespaces(declared)?;
            debug!("Document declares {} namespace(s)", declared.len());
            // declared prefixes overlay the inherited ones
            let mut namespaces = ctx.namespaces().cloned().unwrap_or_default();
            namespaces.extend(declared);
            derived = derived.namespaces(namespaces);
        }
        if let Some(schemas) = map.get("$schemas") {
            derived = derived.schemas(parse_schemas(schemas)?);
        }
        let base_uri = match map.get("$base") {
            Some(Value::String(base)) => {
                derived = derived.base_uri(base.as_str());
                base.as_str()
            }
            Some(other) => {
                return Err(LoadError::validation(format!(
                    "`$base` must be a string, got {}",
                    kind_name(other)
                )))
            }
            None => base_uri,
        };
        let ctx = derived.build();

        let document: Cow<'_, Value> =
            if map.keys().any(|key| DIRECTIVE_KEYS.contains(&key.as_str())) {
                Cow::Owned(Value::Object(
                    map.iter()
                        .filter(|(key, _)| !DIRECTIVE_KEYS.contains(&key.as_str()))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                ))
            } else {
                Cow::Borrowed(document)
            };

        if let Some(graph) = document.get("$graph") {
            return self.load(graph, base_uri, &ctx, None);
        }
        self.load(&document, base_uri, &ctx, Some(base_uri))
    }

    /// Parse `text` and load it as the document at `uri`
    pub fn document_load_text(
        &self,
        text: &str,
        uri: &str,
        ctx: &LoadingContext,
    ) -> LoadResult<Loaded> {
        let tree = text_to_tree(text, uri)?;
        self.document_load(&tree, uri, ctx)
    }

    /// Load the document at `url`, fetching and parsing it unless it is
    /// already cached.
    #[instrument(skip(self, ctx), level = "debug")]
    pub fn document_load_by_url(&self, url: &str, ctx: &LoadingContext) -> LoadResult<Loaded> {
        let (doc_url, _) = uri_util::defrag(url);
        let child = ctx.entering(doc_url)?;

        let tree = match ctx.cache().get(doc_url) {
            Some(tree) => {
                trace!("Document cache hit");
                tree
            }
            None => {
                let text = ctx.fetcher().fetch_text(doc_url)?;
                let tree = text_to_tree(&text, doc_url)?;
                debug!("Fetched and parsed {}", doc_url);
                ctx.cache().insert(doc_url, tree)
            }
        };

        self.document_load(&tree, doc_url, &child)
    }

    /// Short type description used in validation messages
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loader::Primitive(kind) => write!(f, "{}", kind.name()),
            Loader::Any => write!(f, "Any"),
            Loader::Expression => write!(f, "Expression"),
            Loader::Enum(inner) => write!(f, "{}", inner.name()),
            Loader::Array(inner) => write!(f, "array<{}>", inner.items()),
            Loader::Map(inner) => write!(f, "map<{}>", inner.values()),
            Loader::Union(inner) => {
                let names: Vec<String> = inner.alternates().iter().map(|a| a.to_string()).collect();
                write!(f, "{}", names.join(" | "))
            }
            Loader::IdMap(inner) => write!(f, "{}", inner.inner()),
            Loader::TypeDsl(inner) => write!(f, "{}", inner.inner()),
            Loader::SecondaryDsl(inner) => write!(f, "{}", inner.inner()),
            Loader::Uri(inner) => write!(f, "{}", inner.inner()),
            Loader::Record(inner) => write!(f, "{}", inner.class_name()),
            Loader::Deferred(inner) => write!(f, "{}", inner.name()),
        }
    }
}

/// Forward reference to a loader, for schemas whose types refer to
/// themselves
#[derive(Clone)]
pub struct DeferredLoader {
    name: Arc<str>,
    target: Arc<OnceLock<LoaderRef>>,
}

impl DeferredLoader {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            target: Arc::new(OnceLock::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind the placeholder. Returns `false` if it was already bound.
    pub fn resolve(&self, loader: LoaderRef) -> bool {
        self.target.set(loader).is_ok()
    }

    fn get(&self) -> LoadResult<&LoaderRef> {
        self.target.get().ok_or_else(|| {
            LoadError::validation(format!("loader `{}` was used before being defined", self.name))
        })
    }
}

// Only the name: the target usually points back at the loader containing us
impl fmt::Debug for DeferredLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredLoader")
            .field("name", &self.name)
            .field("resolved", &self.target.get().is_some())
            .finish()
    }
}

fn resolve_reference(directive: &str, target: &Value, ctx: &LoadingContext) -> LoadResult<String> {
    let file_uri = ctx.file_uri().ok_or_else(|| {
        LoadError::validation(format!("cannot resolve {directive} without a file context"))
    })?;
    let target = target.as_str().ok_or_else(|| {
        LoadError::validation(format!(
            "{directive} must be a string, got {}",
            kind_name(target)
        ))
    })?;
    Ok(ctx.url_join(file_uri, target)?)
}

fn parse_namespaces(value: &Value) -> LoadResult<IndexMap<String, String>> {
    let Value::Object(map) = value else {
        return Err(LoadError::validation(format!(
            "`$namespaces` must be a mapping, got {}",
            kind_name(value)
        )));
    };
    let mut namespaces = IndexMap::new();
    let mut errors = Vec::new();
    for (prefix, uri) in map {
        match uri.as_str() {
            Some(uri) => {
                namespaces.insert(prefix.clone(), uri.to_string());
            }
            None => errors.push(ValidationError::new(format!(
                "namespace `{prefix}` must map to a string, got {}",
                kind_name(uri)
            ))),
        }
    }
    if errors.is_empty() {
        Ok(namespaces)
    } else {
        Err(ValidationError::with_children("`$namespaces` is invalid", errors).into())
    }
}

fn parse_schemas(value: &Value) -> LoadResult<Vec<String>> {
    match value {
        Value::String(schema) => Ok(vec![schema.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    LoadError::validation(format!(
                        "`$schemas` entries must be strings, got {}",
                        kind_name(item)
                    ))
                })
            })
            .collect(),
        other => Err(LoadError::validation(format!(
            "`$schemas` must be a string or sequence of strings, got {}",
            kind_name(other)
        ))),
    }
}
