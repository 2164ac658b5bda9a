//! Values produced by loaders
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use crate::context::LoadingContext;
use crate::record::Saveable;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A loaded, validated value.
///
/// Scalars and untyped subtrees (from `Any`) stay as [`Value`]s; sequences and
/// maps hold loaded children; records are opaque [`Saveable`]s.
#[derive(Debug, Clone)]
pub enum Loaded {
    Value(Value),
    List(Vec<Loaded>),
    Map(IndexMap<String, Loaded>),
    Record(Arc<dyn Saveable>),
}

impl Loaded {
    /// The loaded null value
    pub fn null() -> Self {
        Loaded::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Loaded::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Loaded::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_list(&self) -> Option<&[Loaded]> {
        match self {
            Loaded::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Loaded>> {
        match self {
            Loaded::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Arc<dyn Saveable>> {
        match self {
            Loaded::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Borrow the record as a concrete type
    pub fn downcast_record<T: 'static>(&self) -> Option<&T> {
        self.as_record()
            .and_then(|record| record.as_any().downcast_ref::<T>())
    }

    /// Consume the value, returning its items if it is a list
    pub fn into_list(self) -> Option<Vec<Loaded>> {
        match self {
            Loaded::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert back into a plain document tree.
    ///
    /// `top` is forwarded to records only for this value itself; nested
    /// values are always saved with `top = false`.
    pub fn save(&self, top: bool, base_url: &str, relative_uris: bool) -> Value {
        match self {
            Loaded::Value(value) => value.clone(),
            Loaded::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.save(false, base_url, relative_uris))
                    .collect(),
            ),
            Loaded::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.save(false, base_url, relative_uris)))
                    .collect(),
            ),
            Loaded::Record(record) => record.save(top, base_url, relative_uris),
        }
    }

    /// Save and attach the `$namespaces`, `$schemas` and `$base` the document
    /// was loaded with.
    ///
    /// A list is saved under `$graph`; any other non-mapping result is
    /// dropped in favour of the metadata alone.
    pub fn save_with_metadata(
        &self,
        ctx: &LoadingContext,
        top: bool,
        base_url: &str,
        relative_uris: bool,
    ) -> Value {
        let mut document = match self.save(top, base_url, relative_uris) {
            Value::Array(items) => {
                let mut graph = Map::new();
                graph.insert("$graph".to_string(), Value::Array(items));
                graph
            }
            Value::Object(map) => map,
            _ => Map::new(),
        };

        if let Some(namespaces) = ctx.namespaces().filter(|ns| !ns.is_empty()) {
            let namespaces = namespaces
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            document.insert("$namespaces".to_string(), Value::Object(namespaces));
        }
        if let Some(schemas) = ctx.schemas().filter(|s| !s.is_empty()) {
            let schemas = schemas.iter().cloned().map(Value::String).collect();
            document.insert("$schemas".to_string(), Value::Array(schemas));
        }
        if let Some(base) = ctx.base_uri().filter(|b| !b.is_empty()) {
            document.insert("$base".to_string(), Value::String(base.to_string()));
        }

        Value::Object(document)
    }
}

impl PartialEq for Loaded {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Loaded::Value(a), Loaded::Value(b)) => a == b,
            (Loaded::List(a), Loaded::List(b)) => a == b,
            (Loaded::Map(a), Loaded::Map(b)) => a == b,
            (Loaded::Record(a), Loaded::Record(b)) => {
                a.class_name() == b.class_name() && a.save(false, "", false) == b.save(false, "", false)
            }
            _ => false,
        }
    }
}

impl From<Value> for Loaded {
    fn from(value: Value) -> Self {
        Loaded::Value(value)
    }
}

impl From<&str> for Loaded {
    fn from(value: &str) -> Self {
        Loaded::Value(Value::String(value.to_string()))
    }
}

impl From<Vec<Loaded>> for Loaded {
    fn from(items: Vec<Loaded>) -> Self {
        Loaded::List(items)
    }
}
