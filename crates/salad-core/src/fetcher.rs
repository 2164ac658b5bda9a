//! Retrieval of referenced documents
//!
//! A [`Fetcher`] resolves relative references and returns the raw text behind
//! an absolute URI. [`DefaultFetcher`] reads `file:` URIs from disk and
//! `http`/`https` URIs over the network; [`MemoryFetcher`] serves pre-staged
//! documents and counts how often each one was requested.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use crate::config::FetcherConfig;
use crate::error::{FetchError, FetchResult, ValidationError};
use crate::uri;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Schemes understood by the built-in fetchers
pub const DEFAULT_SCHEMES: &[&str] = &["file", "http", "https"];

/// Capability for resolving and retrieving documents
pub trait Fetcher: Send + Sync + Debug {
    /// Resolve `url` against `base_url`.
    ///
    /// The default implementation refuses to resolve `file:` references from
    /// documents with any other scheme.
    fn url_join(&self, base_url: &str, url: &str) -> Result<String, ValidationError> {
        uri::join_url(base_url, url)
    }

    /// Retrieve the text behind an absolute URI
    fn fetch_text(&self, url: &str) -> FetchResult<String>;

    /// Schemes whose URIs are already absolute for identifier expansion
    fn supported_schemes(&self) -> &[&str] {
        DEFAULT_SCHEMES
    }
}

/// Fetcher backed by the filesystem and a blocking HTTP client
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    config: FetcherConfig,
}

impl DefaultFetcher {
    /// Create a fetcher with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher with custom configuration
    pub fn with_config(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    fn fetch_file(&self, url: &str, parsed: &Url) -> FetchResult<String> {
        let path = parsed
            .to_file_path()
            .map_err(|_| FetchError::invalid_url(url, "not a local file path"))?;

        let metadata = std::fs::metadata(&path).map_err(|e| FetchError::io_error(url, e))?;
        if metadata.len() > self.config.max_document_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.config.max_document_bytes,
            });
        }

        std::fs::read_to_string(&path).map_err(|e| FetchError::io_error(url, e))
    }

    fn fetch_remote(&self, url: &str) -> FetchResult<String> {
        if !self.config.allow_remote {
            return Err(FetchError::RemoteDisabled {
                url: url.to_string(),
            });
        }

        let http_error = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(http_error)?;

        let response = client.get(url).send().map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let limit = self.config.max_document_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit,
            });
        }

        // Read one byte past the limit so oversized bodies without a
        // content-length header are still caught.
        let mut body = Vec::new();
        response
            .take(limit.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| FetchError::io_error(url, e))?;
        if body.len() as u64 > limit {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit,
            });
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl Fetcher for DefaultFetcher {
    #[instrument(skip(self), level = "debug")]
    fn fetch_text(&self, url: &str) -> FetchResult<String> {
        let parsed = Url::parse(url).map_err(|e| FetchError::invalid_url(url, e.to_string()))?;
        debug!("Fetching {} document", parsed.scheme());

        match parsed.scheme() {
            "file" => self.fetch_file(url, &parsed),
            "http" | "https" => self.fetch_remote(url),
            other => Err(FetchError::UnsupportedScheme {
                url: url.to_string(),
                scheme: other.to_string(),
            }),
        }
    }
}

/// Fetcher serving documents from memory
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: RwLock<HashMap<String, String>>,
    fetches: RwLock<HashMap<String, usize>>,
    total_fetches: AtomicUsize,
}

impl MemoryFetcher {
    /// Create an empty fetcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`insert`](Self::insert)
    pub fn with_document(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(url, text);
        self
    }

    /// Stage a document under an absolute URL
    pub fn insert(&self, url: impl Into<String>, text: impl Into<String>) {
        let mut documents = match self.documents.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        documents.insert(url.into(), text.into());
    }

    /// Total number of `fetch_text` calls, including failed ones
    pub fn fetch_count(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }

    /// Number of `fetch_text` calls for one URL
    pub fn fetch_count_for(&self, url: &str) -> usize {
        let fetches = match self.fetches.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        fetches.get(url).copied().unwrap_or(0)
    }
}

impl Fetcher for MemoryFetcher {
    #[instrument(skip(self), level = "trace")]
    fn fetch_text(&self, url: &str) -> FetchResult<String> {
        self.total_fetches.fetch_add(1, Ordering::SeqCst);
        {
            let mut fetches = match self.fetches.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *fetches.entry(url.to_string()).or_insert(0) += 1;
        }

        let documents = match self.documents.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}
