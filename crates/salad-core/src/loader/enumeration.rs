//! Enumerated string loaders

use crate::error::{LoadError, LoadResult};
use crate::loaded::Loaded;
use serde_json::Value;
use std::sync::Arc;

/// Accepts one string out of a fixed, ordered set of symbols
#[derive(Debug, Clone)]
pub struct EnumLoader {
    name: String,
    symbols: Arc<[String]>,
}

impl EnumLoader {
    pub fn new<N, I, S>(name: N, symbols: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub(crate) fn load(&self, value: &Value) -> LoadResult<Loaded> {
        match value {
            Value::String(symbol) if self.symbols.iter().any(|s| s == symbol) => {
                Ok(Loaded::Value(value.clone()))
            }
            Value::String(_) => Err(LoadError::validation(format!(
                "Expected one of {}",
                self.quoted_symbols()
            ))),
            _ => Err(LoadError::validation("Expected raw string")),
        }
    }

    fn quoted_symbols(&self) -> String {
        let quoted: Vec<String> = self.symbols.iter().map(|s| format!("'{s}'")).collect();
        format!("[{}]", quoted.join(", "))
    }
}
