//! Record construction
//!
//! Records are the schema's named object types. The loader core treats them
//! as opaque: a [`RecordFactory`] builds one from a mapping and returns it as a
//! [`Saveable`]. Factories are looked up by class name in a
//! [`RecordRegistry`], filled once at startup.
//!
//! [`RecordSchema`] is a factory driven by a field table, producing
//! [`GenericRecord`]s. It is enough for schemas that do not need dedicated
//! Rust types.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use crate::context::{LoadingContext, UriScope};
use crate::error::{LoadError, LoadResult, ValidationError};
use crate::loaded::Loaded;
use crate::loader::{Loader, LoaderRef};
use crate::parser::kind_name;
use crate::uri::{self, save_relative_uri};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

/// A constructed record that can be converted back into a document tree
pub trait Saveable: Send + Sync + fmt::Debug {
    /// Schema class of the record
    fn class_name(&self) -> &str;

    /// Convert the record back into a document tree.
    ///
    /// URIs are made relative to `base_url` when `relative_uris` is set.
    /// `top` marks the document's root object, which also carries
    /// `$namespaces` and `$schemas`.
    fn save(&self, top: bool, base_url: &str, relative_uris: bool) -> Value;

    /// Access to the concrete type, for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Builds records of one class from raw mappings
pub trait RecordFactory: Send + Sync + fmt::Debug {
    fn class_name(&self) -> &str;

    /// Construct a record from `doc`.
    ///
    /// `doc_root` is the URI of the enclosing top-level document, if any.
    fn from_doc(
        &self,
        doc: &Map<String, Value>,
        base_uri: &str,
        ctx: &LoadingContext,
        doc_root: Option<&str>,
    ) -> LoadResult<Arc<dyn Saveable>>;
}

/// Signature of a plain function usable as a [`RecordFactory`]
pub type FactoryFn = dyn Fn(&Map<String, Value>, &str, &LoadingContext, Option<&str>) -> LoadResult<Arc<dyn Saveable>>
    + Send
    + Sync;

struct FnFactory {
    class: String,
    build: Box<FactoryFn>,
}

impl fmt::Debug for FnFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").field("class", &self.class).finish()
    }
}

impl RecordFactory for FnFactory {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn from_doc(
        &self,
        doc: &Map<String, Value>,
        base_uri: &str,
        ctx: &LoadingContext,
        doc_root: Option<&str>,
    ) -> LoadResult<Arc<dyn Saveable>> {
        (self.build)(doc, base_uri, ctx, doc_root)
    }
}

/// Loads a mapping through a [`RecordFactory`]
#[derive(Debug, Clone)]
pub struct RecordLoader {
    factory: Arc<dyn RecordFactory>,
}

impl RecordLoader {
    pub fn new(factory: Arc<dyn RecordFactory>) -> Self {
        Self { factory }
    }

    pub fn class_name(&self) -> &str {
        self.factory.class_name()
    }

    pub fn factory(&self) -> &Arc<dyn RecordFactory> {
        &self.factory
    }

    pub(crate) fn load(
        &self,
        value: &Value,
        base_uri: &str,
        ctx: &LoadingContext,
        doc_root: Option<&str>,
    ) -> LoadResult<Loaded> {
        let Value::Object(doc) = value else {
            return Err(LoadError::validation(format!(
                "Value is a {}, but valid type for this field is an object.",
                kind_name(value)
            )));
        };
        trace!("Constructing {} record", self.class_name());
        let record = self.factory.from_doc(doc, base_uri, ctx, doc_root)?;
        Ok(Loaded::Record(record))
    }
}

/// Class name → factory table
#[derive(Debug, Default, Clone)]
pub struct RecordRegistry {
    factories: IndexMap<String, Arc<dyn RecordFactory>>,
}

impl RecordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its class name, replacing any previous one
    pub fn register(&mut self, factory: Arc<dyn RecordFactory>) {
        debug!("Registering record factory for {}", factory.class_name());
        self.factories
            .insert(factory.class_name().to_string(), factory);
    }

    /// Register a closure as the factory for `class`
    pub fn register_fn<F>(&mut self, class: impl Into<String>, build: F)
    where
        F: Fn(&Map<String, Value>, &str, &LoadingContext, Option<&str>) -> LoadResult<Arc<dyn Saveable>>
            + Send
            + Sync
            + 'static,
    {
        self.register(Arc::new(FnFactory {
            class: class.into(),
            build: Box::new(build),
        }));
    }

    pub fn get(&self, class: &str) -> Option<&Arc<dyn RecordFactory>> {
        self.factories.get(class)
    }

    /// A record loader for `class`, if registered
    pub fn loader(&self, class: &str) -> Option<LoaderRef> {
        self.get(class).map(|factory| Loader::record(Arc::clone(factory)))
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered class names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// One field of a [`RecordSchema`]
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    loader: LoaderRef,
    required: bool,
    uri: bool,
    ref_scope: Option<usize>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, loader: LoaderRef) -> Self {
        Self {
            name: name.into(),
            loader,
            required: true,
            uri: false,
            ref_scope: None,
        }
    }

    pub fn optional(name: impl Into<String>, loader: LoaderRef) -> Self {
        Self {
            required: false,
            ..Self::required(name, loader)
        }
    }

    /// Save the field's values as URIs relative to the record, undoing a
    /// scoped-reference expansion of depth `ref_scope`
    pub fn as_uri(mut self, ref_scope: Option<usize>) -> Self {
        self.uri = true;
        self.ref_scope = ref_scope;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

#[derive(Debug, Clone)]
struct IdField {
    name: String,
    required: bool,
}

/// A record type described by a field table
#[derive(Debug, Clone)]
pub struct RecordSchema {
    class: String,
    check_class: bool,
    id_field: Option<IdField>,
    fields: Arc<Vec<FieldSpec>>,
}

impl RecordSchema {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            check_class: false,
            id_field: None,
            fields: Arc::new(Vec::new()),
        }
    }

    /// Require a `class` key naming this record
    pub fn with_class_check(mut self) -> Self {
        self.check_class = true;
        self
    }

    /// Declare the identifier field, expanded as a scoped id.
    ///
    /// A missing optional identifier falls back to the document root, then
    /// to a fresh blank node.
    pub fn with_id_field(mut self, name: impl Into<String>, required: bool) -> Self {
        self.id_field = Some(IdField {
            name: name.into(),
            required,
        });
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        Arc::make_mut(&mut self.fields).push(field);
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Wrap the schema in a record loader
    pub fn into_loader(self) -> LoaderRef {
        Loader::record(Arc::new(self))
    }

    fn attribute_names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.fields.len() + 2);
        if let Some(id) = &self.id_field {
            names.push(id.name.as_str());
        }
        if self.check_class {
            names.push("class");
        }
        names.extend(self.fields.iter().map(|field| field.name.as_str()));
        names
    }

    fn check_class(&self, doc: &Map<String, Value>) -> LoadResult<()> {
        let matches = match doc.get("class") {
            Some(Value::String(class)) => class == &self.class || uri::shortname(class) == self.class,
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(LoadError::validation(format!("Not a {}", self.class)))
        }
    }

    fn load_id(
        &self,
        field: &IdField,
        doc: &Map<String, Value>,
        base_uri: &str,
        ctx: &LoadingContext,
        doc_root: Option<&str>,
    ) -> LoadResult<Result<String, ValidationError>> {
        let explicit = match doc.get(&field.name) {
            Some(value) => {
                let loader = Loader::uri(Loader::optional(Loader::string()), UriScope::id());
                match loader.load_field(value, base_uri, ctx) {
                    Ok(loaded) => loaded.as_str().map(str::to_string),
                    Err(LoadError::Validation(error)) => {
                        return Ok(Err(ValidationError::wrap(
                            format!("the `{}` field is not valid because", field.name),
                            error,
                        )))
                    }
                    Err(other) => return Err(other),
                }
            }
            None => None,
        };

        Ok(match (explicit, doc_root) {
            (Some(id), _) => Ok(id),
            (None, Some(root)) => Ok(root.to_string()),
            (None, None) if !field.required => Ok(format!("_:{}", Uuid::new_v4())),
            (None, None) => Err(ValidationError::new(format!("Missing {}", field.name))),
        })
    }
}

impl RecordFactory for RecordSchema {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn from_doc(
        &self,
        doc: &Map<String, Value>,
        base_uri: &str,
        ctx: &LoadingContext,
        doc_root: Option<&str>,
    ) -> LoadResult<Arc<dyn Saveable>> {
        if self.check_class {
            self.check_class(doc)?;
        }

        let mut errors = Vec::new();

        let id = match &self.id_field {
            Some(field) => match self.load_id(field, doc, base_uri, ctx, doc_root)? {
                Ok(id) => Some(id),
                Err(error) => {
                    errors.push(error);
                    None
                }
            },
            None => None,
        };
        let field_base = id.as_deref().unwrap_or(base_uri);

        let mut fields = IndexMap::new();
        for field in self.fields.iter() {
            match doc.get(&field.name) {
                Some(value) => match field.loader.load_field(value, field_base, ctx) {
                    Ok(loaded) => {
                        fields.insert(field.name.clone(), loaded);
                    }
                    Err(LoadError::Validation(error)) => errors.push(ValidationError::wrap(
                        format!("the `{}` field is not valid because", field.name),
                        error,
                    )),
                    Err(other) => return Err(other),
                },
                None if field.required => errors.push(ValidationError::new(format!(
                    "missing required field `{}`",
                    field.name
                ))),
                None => {}
            }
        }

        let attributes = self.attribute_names();
        let mut extension_fields = IndexMap::new();
        for (key, value) in doc {
            if attributes.contains(&key.as_str()) {
                continue;
            }
            if key.is_empty() {
                errors.push(ValidationError::new("mapping with implicit null key"));
            } else if key.contains(':') {
                let expanded = ctx.expand_url(key, "", UriScope::plain())?;
                extension_fields.insert(expanded, value.clone());
            } else {
                let expected: Vec<String> =
                    attributes.iter().map(|name| format!("`{name}`")).collect();
                errors.push(ValidationError::new(format!(
                    "invalid field `{key}`, expected one of: {}",
                    expected.join(", ")
                )));
            }
        }

        if !errors.is_empty() {
            return Err(
                ValidationError::with_children(format!("Trying '{}'", self.class), errors).into(),
            );
        }

        Ok(Arc::new(GenericRecord {
            class: self.class.clone(),
            emit_class: self.check_class,
            id_name: self.id_field.as_ref().map(|field| field.name.clone()),
            id,
            fields,
            extension_fields,
            specs: Arc::clone(&self.fields),
            namespaces: ctx.namespaces().cloned(),
            schemas: ctx.schemas().map(<[String]>::to_vec),
        }))
    }
}

/// A record built by a [`RecordSchema`]
#[derive(Debug, Clone)]
pub struct GenericRecord {
    class: String,
    emit_class: bool,
    id_name: Option<String>,
    id: Option<String>,
    fields: IndexMap<String, Loaded>,
    extension_fields: IndexMap<String, Value>,
    specs: Arc<Vec<FieldSpec>>,
    namespaces: Option<IndexMap<String, String>>,
    schemas: Option<Vec<String>>,
}

impl GenericRecord {
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Absolute identifier, if the schema declares one
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn get(&self, field: &str) -> Option<&Loaded> {
        self.fields.get(field)
    }

    /// Fields present in the source document, in schema order
    pub fn fields(&self) -> &IndexMap<String, Loaded> {
        &self.fields
    }

    /// Keys outside the schema, keyed by their expanded URI
    pub fn extension_fields(&self) -> &IndexMap<String, Value> {
        &self.extension_fields
    }
}

impl Saveable for GenericRecord {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn save(&self, top: bool, base_url: &str, relative_uris: bool) -> Value {
        let mut saved = Map::new();

        for (key, value) in &self.extension_fields {
            let key = match (&self.namespaces, relative_uris) {
                (Some(namespaces), true) => uri::prefix_url(key, namespaces),
                _ => key.clone(),
            };
            saved.insert(key, value.clone());
        }

        if let (Some(name), Some(id)) = (&self.id_name, &self.id) {
            saved.insert(
                name.clone(),
                Value::String(save_relative_uri(id, base_url, None, relative_uris)),
            );
        }
        if self.emit_class {
            saved.insert("class".to_string(), Value::String(self.class.clone()));
        }

        let field_base = self.id.as_deref().unwrap_or(base_url);
        for spec in self.specs.iter() {
            let Some(loaded) = self.fields.get(&spec.name) else {
                continue;
            };
            let value = loaded.save(false, field_base, relative_uris);
            let value = if spec.uri {
                relativize(value, field_base, spec.ref_scope, relative_uris)
            } else {
                value
            };
            saved.insert(spec.name.clone(), value);
        }

        if top {
            if let Some(namespaces) = self.namespaces.as_ref().filter(|ns| !ns.is_empty()) {
                let namespaces = namespaces
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                saved.insert("$namespaces".to_string(), Value::Object(namespaces));
            }
            if let Some(schemas) = self.schemas.as_ref().filter(|s| !s.is_empty()) {
                let schemas = schemas.iter().cloned().map(Value::String).collect();
                saved.insert("$schemas".to_string(), Value::Array(schemas));
            }
        }

        Value::Object(saved)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn relativize(value: Value, base_url: &str, ref_scope: Option<usize>, relative_uris: bool) -> Value {
    match value {
        Value::String(uri) => Value::String(save_relative_uri(&uri, base_url, ref_scope, relative_uris)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| relativize(item, base_url, ref_scope, relative_uris))
                .collect(),
        ),
        other => other,
    }
}
