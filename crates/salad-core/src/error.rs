//! Error types for document loading
//!
//! Every loader operation returns a [`LoadError`]. Only its
//! [`LoadError::Validation`] variant takes part in aggregation: arrays, maps,
//! unions and records collect validation failures from their children, while
//! fetch, parse and record-construction failures always propagate untouched.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of spaces each nesting level is indented by when pretty-printing
const INDENT_PER_LEVEL: usize = 2;

/// Result type for loader operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for text-to-tree parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// A tree of validation failures.
///
/// Leaf errors carry only a message. Composite errors raised by array, map,
/// union and record loading carry one child per failed element, entry or
/// alternative. A node whose message is empty is only a grouping node: when it
/// is nested into another error its children are hoisted in its place.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct ValidationError {
    /// Human-readable error message, empty for pure grouping nodes
    pub message: String,
    /// Nested causes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ValidationError>,
    /// Marker printed in front of the message, e.g. `"- "`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<String>,
}

impl ValidationError {
    /// Create a leaf validation error
    pub fn new<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self {
            message: message.into(),
            children: Vec::new(),
            bullet: None,
        }
    }

    /// Create a composite validation error.
    ///
    /// Children with an empty message are replaced by their own children.
    pub fn with_children<M, I>(message: M, children: I) -> Self
    where
        M: Into<String>,
        I: IntoIterator<Item = ValidationError>,
    {
        let mut flattened = Vec::new();
        for child in children {
            flattened.extend(child.simplify());
        }
        Self {
            message: message.into(),
            children: flattened,
            bullet: None,
        }
    }

    /// Group sibling failures under a message-less node
    pub fn aggregate<I>(errors: I) -> Self
    where
        I: IntoIterator<Item = ValidationError>,
    {
        Self::with_children("", errors)
    }

    /// Wrap a single cause under a new message
    pub fn wrap<M>(message: M, cause: ValidationError) -> Self
    where
        M: Into<String>,
    {
        Self::with_children(message, [cause])
    }

    /// Set the bullet printed before the message
    pub fn with_bullet<B>(mut self, bullet: B) -> Self
    where
        B: Into<String>,
    {
        self.bullet = Some(bullet.into());
        self
    }

    /// The message of this node
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The direct children of this node
    pub fn children(&self) -> &[ValidationError] {
        &self.children
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check whether this node has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Messages of every leaf below (and including) this node, depth first
    pub fn leaf_messages(&self) -> Vec<&str> {
        if self.children.is_empty() {
            return vec![self.message.as_str()];
        }
        self.children
            .iter()
            .flat_map(|child| child.leaf_messages())
            .collect()
    }

    fn simplify(self) -> Vec<ValidationError> {
        if self.message.is_empty() {
            self.children
        } else {
            vec![self]
        }
    }

    fn write_pretty(&self, f: &mut fmt::Formatter<'_>, level: usize, first: &mut bool) -> fmt::Result {
        let mut next_level = level;
        if !self.message.is_empty() {
            if !*first {
                writeln!(f)?;
            }
            *first = false;
            write!(
                f,
                "{:indent$}{}{}",
                "",
                self.bullet.as_deref().unwrap_or(""),
                self.message,
                indent = level * INDENT_PER_LEVEL
            )?;
            next_level += 1;
        }
        for child in &self.children {
            child.write_pretty(f, next_level, first)?;
        }
        Ok(())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        self.write_pretty(f, 0, &mut first)
    }
}

/// Errors raised by a [`Fetcher`](crate::fetcher::Fetcher) while retrieving text
#[derive(Error, Debug)]
pub enum FetchError {
    /// Local file could not be read
    #[error("Failed to read '{url}': {source}")]
    Io {
        url: String,
        source: std::io::Error,
    },

    /// Transport-level HTTP failure
    #[error("HTTP request for '{url}' failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// HTTP request completed with a non-success status
    #[error("HTTP request for '{url}' returned status {status}")]
    Status { url: String, status: u16 },

    /// The URL is not a valid absolute URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The fetcher does not know how to retrieve this scheme
    #[error("Unsupported scheme '{scheme}' in '{url}'")]
    UnsupportedScheme { url: String, scheme: String },

    /// Remote retrieval was disabled in the fetcher configuration
    #[error("Remote fetching is disabled, refusing '{url}'")]
    RemoteDisabled { url: String },

    /// The document is larger than the configured limit
    #[error("Document '{url}' exceeds the maximum size of {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    /// No document is known under this URL
    #[error("Document '{url}' not found")]
    NotFound { url: String },
}

impl FetchError {
    /// Create an I/O error with URL context
    pub fn io_error(url: impl Into<String>, error: std::io::Error) -> Self {
        Self::Io {
            url: url.into(),
            source: error,
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// The URL this error refers to
    pub fn url(&self) -> &str {
        match self {
            Self::Io { url, .. }
            | Self::Http { url, .. }
            | Self::Status { url, .. }
            | Self::InvalidUrl { url, .. }
            | Self::UnsupportedScheme { url, .. }
            | Self::RemoteDisabled { url }
            | Self::TooLarge { url, .. }
            | Self::NotFound { url } => url,
        }
    }
}

/// Errors raised while converting source text into a document tree
#[derive(Error, Debug)]
pub enum ParseError {
    /// YAML syntax errors
    #[error("Failed to parse YAML document '{uri}': {source}")]
    Yaml {
        uri: String,
        source: serde_yaml::Error,
    },

    /// JSON syntax errors, or YAML that has no JSON-shaped tree
    #[error("Failed to parse JSON document '{uri}': {source}")]
    Json {
        uri: String,
        source: serde_json::Error,
    },
}

impl ParseError {
    /// Create a YAML parsing error with URI context
    pub fn yaml_error(uri: impl Into<String>, error: serde_yaml::Error) -> Self {
        Self::Yaml {
            uri: uri.into(),
            source: error,
        }
    }

    /// Create a JSON parsing error with URI context
    pub fn json_error(uri: impl Into<String>, error: serde_json::Error) -> Self {
        Self::Json {
            uri: uri.into(),
            source: error,
        }
    }
}

/// Error returned by every loader operation
#[derive(Error, Debug)]
pub enum LoadError {
    /// The document does not match the expected shape
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced document could not be retrieved
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A referenced document could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A record construction function failed for a reason other than validation
    #[error("Failed to construct record '{class}': {source}")]
    Record {
        class: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LoadError {
    /// Create a leaf validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }

    /// Create a record construction error
    pub fn record(class: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Record {
            class: class.into(),
            source: source.into(),
        }
    }

    /// Check if this is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Borrow the validation tree, if this is a validation failure
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error),
            _ => None,
        }
    }
}
