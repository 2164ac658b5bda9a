//! Conversion of source text into the generic document tree
//!
//! Documents are YAML (JSON being a subset of it). The tree is a
//! `serde_json::Value` with insertion-ordered mappings, so keys keep the order
//! they had in the source.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use crate::error::{ParseError, ParseResult};
use crate::uri;
use serde_json::Value;

/// Source formats recognised from a document URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML format (.yaml, .yml, .cwl and anything unknown)
    Yaml,
    /// JSON format (.json)
    Json,
}

impl Format {
    /// Detect format from the extension of a URI path
    pub fn from_uri(uri: &str) -> Self {
        let path = uri::split(uri).path;
        let extension = path
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// Parser turning document text into a [`Value`] tree
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentParser;

impl DocumentParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse text retrieved from `uri`, choosing the format by extension.
    ///
    /// JSON documents that fail strict parsing are retried as YAML so that
    /// the error reported is the YAML one.
    pub fn parse(&self, text: &str, uri: &str) -> ParseResult<Value> {
        match Format::from_uri(uri) {
            Format::Json => self.parse_json(text, uri).or_else(|_| self.parse_yaml(text, uri)),
            Format::Yaml => self.parse_yaml(text, uri),
        }
    }

    /// Parse YAML content
    pub fn parse_yaml(&self, text: &str, uri: &str) -> ParseResult<Value> {
        let yaml_value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| ParseError::yaml_error(uri, e))?;

        // Non-string keys and tagged values have no direct JSON shape
        serde_json::to_value(yaml_value).map_err(|e| ParseError::json_error(uri, e))
    }

    /// Parse JSON content
    pub fn parse_json(&self, text: &str, uri: &str) -> ParseResult<Value> {
        serde_json::from_str(text).map_err(|e| ParseError::json_error(uri, e))
    }
}

/// Parse document text into a tree
pub fn text_to_tree(text: &str, uri: &str) -> ParseResult<Value> {
    DocumentParser::new().parse(text, uri)
}

/// Name of the tree node kind, as used in validation messages
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
