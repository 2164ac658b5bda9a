//! Loader and fetcher configuration
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

/// Default maximum size of a fetched document (16 MiB)
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 16 * 1024 * 1024;

/// Default bound on nested `$import` chains
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 32;

/// Configuration for [`DefaultFetcher`](crate::fetcher::DefaultFetcher)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Whether `http`/`https` documents may be retrieved
    pub allow_remote: bool,
    /// User agent sent with remote requests
    pub user_agent: String,
    /// Documents larger than this are rejected
    pub max_document_bytes: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            allow_remote: true,
            user_agent: format!("salad-core/{}", env!("CARGO_PKG_VERSION")),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl FetcherConfig {
    /// Set the request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Allow or forbid remote retrieval
    pub fn with_allow_remote(mut self, allow_remote: bool) -> Self {
        self.allow_remote = allow_remote;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the maximum document size
    pub fn with_max_document_bytes(mut self, max_document_bytes: u64) -> Self {
        self.max_document_bytes = max_document_bytes;
        self
    }
}

/// Configuration for document loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Base URI used when the caller does not supply one.
    /// `None` means the current working directory.
    pub base_uri: Option<String>,
    /// Maximum depth of nested `$import` chains
    pub max_import_depth: usize,
    /// Configuration of the default fetcher
    pub fetcher: FetcherConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_uri: None,
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
            fetcher: FetcherConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Set the default base URI
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Set the maximum `$import` depth
    pub fn with_max_import_depth(mut self, max_import_depth: usize) -> Self {
        self.max_import_depth = max_import_depth;
        self
    }

    /// Replace the fetcher configuration
    pub fn with_fetcher(mut self, fetcher: FetcherConfig) -> Self {
        self.fetcher = fetcher;
        self
    }
}
