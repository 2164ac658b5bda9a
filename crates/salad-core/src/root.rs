//! Document entry points
//!
//! [`RootLoader`] binds the loader of a schema's root type to the document
//! protocol and fills in what callers leave out: a fresh context built from
//! [`LoaderConfig`], and a base URI defaulting to the current working
//! directory.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use crate::config::LoaderConfig;
use crate::context::{LoadingContext, LoadingContextBuilder, Vocabulary};
use crate::error::{FetchError, LoadResult};
use crate::loaded::Loaded;
use crate::loader::LoaderRef;
use crate::parser::text_to_tree;
use crate::uri;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Entry point for loading documents of one root type
#[derive(Debug, Clone)]
pub struct RootLoader {
    loader: LoaderRef,
    config: LoaderConfig,
    vocabulary: Option<Vocabulary>,
}

impl RootLoader {
    pub fn new(loader: LoaderRef) -> Self {
        Self {
            loader,
            config: LoaderConfig::default(),
            vocabulary: None,
        }
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `vocabulary` instead of the built-in salad terms
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn loader(&self) -> &LoaderRef {
        &self.loader
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// A fresh root context for this loader's configuration
    pub fn default_context(&self) -> LoadingContext {
        let builder = LoadingContextBuilder::from_config(&self.config);
        match &self.vocabulary {
            Some(vocabulary) => builder.vocabulary(vocabulary.clone()).build(),
            None => builder.build(),
        }
    }

    /// Load an already parsed document tree
    pub fn load_document(
        &self,
        tree: &Value,
        base_uri: Option<&str>,
        ctx: Option<LoadingContext>,
    ) -> LoadResult<Loaded> {
        let base_uri = self.resolve_base(base_uri)?;
        let ctx = ctx.unwrap_or_else(|| self.default_context());
        debug!("Loading document tree with base {}", base_uri);
        self.loader.document_load(tree, &base_uri, &ctx)
    }

    /// Parse `text` and load it as the document at `uri`.
    ///
    /// The parsed tree is cached under `uri`, so `$import`s pointing back at
    /// the document resolve without a fetch.
    #[instrument(skip(self, text, ctx), level = "debug")]
    pub fn load_document_from_text(
        &self,
        text: &str,
        uri: Option<&str>,
        ctx: Option<LoadingContext>,
    ) -> LoadResult<Loaded> {
        let uri = self.resolve_base(uri)?;
        let (doc_url, _) = uri::defrag(&uri);
        let ctx = ctx.unwrap_or_else(|| self.default_context());

        let tree = text_to_tree(text, doc_url)?;
        let tree = ctx.cache().insert(doc_url, tree);
        let ctx = ctx.entering(doc_url)?;
        self.loader.document_load(&tree, &uri, &ctx)
    }

    /// Fetch, parse and load the document at `url`
    pub fn load_document_by_url(
        &self,
        url: &str,
        ctx: Option<LoadingContext>,
    ) -> LoadResult<Loaded> {
        let ctx = ctx.unwrap_or_else(|| self.default_context());
        info!("Loading document {}", url);
        self.loader.document_load_by_url(url, &ctx)
    }

    /// Load a document from the filesystem; relative paths are taken from
    /// the current working directory
    pub fn load_path(&self, path: &Path, ctx: Option<LoadingContext>) -> LoadResult<Loaded> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            current_dir()?.join(path)
        };
        let url = uri::file_uri(&path.to_string_lossy(), false);
        self.load_document_by_url(&url, ctx)
    }

    fn resolve_base(&self, base_uri: Option<&str>) -> LoadResult<String> {
        match base_uri.or(self.config.base_uri.as_deref()) {
            Some(base_uri) => Ok(base_uri.to_string()),
            None => default_base_uri(),
        }
    }
}

/// File URI of the current working directory, with a trailing slash
pub fn default_base_uri() -> LoadResult<String> {
    Ok(uri::directory_uri(&current_dir()?))
}

fn current_dir() -> LoadResult<std::path::PathBuf> {
    std::env::current_dir()
        .map_err(|error| FetchError::io_error("current working directory", error).into())
}
