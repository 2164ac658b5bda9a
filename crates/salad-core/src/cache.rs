//! Document cache shared by a chain of loading contexts
//!
//! Every context derived from a common root holds a clone of the same
//! [`DocumentCache`] handle. The cache maps fragment-less document URLs to
//! parsed trees, and also records which URLs were resolved through `$import`
//! and `$include` during the load.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

#[derive(Debug, Default)]
struct CacheState {
    documents: HashMap<String, Arc<Value>>,
    imports: Vec<String>,
    includes: Vec<String>,
    hits: u64,
    misses: u64,
}

/// Shared, interior-mutable document cache
#[derive(Debug, Clone, Default)]
pub struct DocumentCache {
    state: Arc<Mutex<CacheState>>,
}

impl DocumentCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Look up a document, counting the hit or miss
    pub fn get(&self, url: &str) -> Option<Arc<Value>> {
        let mut state = self.lock();
        let found = state.documents.get(url).cloned();
        if found.is_some() {
            state.hits += 1;
            trace!("Document cache hit for {}", url);
        } else {
            state.misses += 1;
            trace!("Document cache miss for {}", url);
        }
        found
    }

    /// Store a parsed document, returning the shared handle to it
    pub fn insert(&self, url: impl Into<String>, document: Value) -> Arc<Value> {
        let document = Arc::new(document);
        self.lock().documents.insert(url.into(), Arc::clone(&document));
        document
    }

    /// Check whether a document is cached, without touching the statistics
    pub fn contains(&self, url: &str) -> bool {
        self.lock().documents.contains_key(url)
    }

    /// Number of cached documents
    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    /// Check whether the cache holds no documents
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached document and recorded reference
    pub fn clear(&self) {
        let mut state = self.lock();
        state.documents.clear();
        state.imports.clear();
        state.includes.clear();
    }

    /// Record a URL resolved through `$import`
    pub fn record_import(&self, url: impl Into<String>) {
        self.lock().imports.push(url.into());
    }

    /// Record a URL resolved through `$include`
    pub fn record_include(&self, url: impl Into<String>) {
        self.lock().includes.push(url.into());
    }

    /// URLs resolved through `$import`, in resolution order
    pub fn imports(&self) -> Vec<String> {
        self.lock().imports.clone()
    }

    /// URLs resolved through `$include`, in resolution order
    pub fn includes(&self) -> Vec<String> {
        self.lock().includes.clone()
    }

    /// Check whether two handles refer to the same cache
    pub fn ptr_eq(&self, other: &DocumentCache) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.documents.len(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that were served from the cache, in percent
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            (self.hits as f64 / lookups as f64) * 100.0
        }
    }
}
