//! Salad Core - schema-driven document loading
//!
//! This crate loads untyped YAML/JSON document trees into validated values,
//! directed by a graph of [`Loader`]s that describes a schema:
//! - **Typed loading**: primitives, enums, arrays, maps, unions, records and
//!   the named-map, type and secondary-file shorthands
//! - **Document protocol**: `$import`, `$include`, `$graph`, `$base`,
//!   `$namespaces` and `$schemas`, with a shared per-load document cache
//! - **URI normalization**: scoped identifiers, scoped references and
//!   vocabulary terms expanded to absolute URIs, and back again on save
//! - **Error aggregation**: every failure in a subtree is reported as one
//!   [`ValidationError`] tree
//!
//! ## Quick Start
//!
//! ```rust
//! use salad_core::{Loader, LoadingContext, MemoryFetcher, RootLoader};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let root = RootLoader::new(Loader::map(Loader::array(Loader::int()), None));
//!
//! let fetcher = MemoryFetcher::new().with_document("file:///work/sizes.yml", "[1, 2]\n");
//! let ctx = LoadingContext::builder().fetcher(Arc::new(fetcher)).build();
//!
//! let loaded = root
//!     .load_document_from_text(
//!         "sizes: {$import: sizes.yml}\nextra: [3]\n",
//!         Some("file:///work/job.yml"),
//!         Some(ctx),
//!     )
//!     .unwrap();
//!
//! assert_eq!(loaded.save(true, "", false), json!({"sizes": [1, 2], "extra": [3]}));
//! ```
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod loaded;
pub mod loader;
pub mod parser;
pub mod record;
pub mod root;
pub mod uri;

// Re-export commonly used types for convenience
pub use cache::{CacheStats, DocumentCache};
pub use config::{FetcherConfig, LoaderConfig};
pub use context::{LoadingContext, LoadingContextBuilder, UriScope, Vocabulary};
pub use error::{FetchError, LoadError, LoadResult, ParseError, ValidationError};
pub use fetcher::{DefaultFetcher, Fetcher, MemoryFetcher};
pub use loaded::Loaded;
pub use loader::{DeferredLoader, Loader, LoaderRef};
pub use record::{
    FieldSpec, GenericRecord, RecordFactory, RecordLoader, RecordRegistry, RecordSchema, Saveable,
};
pub use root::{default_base_uri, RootLoader};
