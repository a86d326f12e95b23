//! Caching of parsed patterns.
//!
//! [`CachingPatternParser`] puts a [`PatternCache`] in front of any
//! [`PatternParser`], so identical templates are parsed once. The cache is a
//! collaborator: failures are logged and parsing falls back to the wrapped
//! parser, never failing the caller.
//!
//! ```
//! use sql_pattern::cache::{CachingPatternParser, MemoryCache};
//! use sql_pattern::{PatternParser, SqlPatternParser};
//!
//! let parser = CachingPatternParser::new(SqlPatternParser::new()?, MemoryCache::new());
//! let first = parser.parse("SELECT * FROM person WHERE id = %int")?;
//! let second = parser.parse("SELECT * FROM person WHERE id = %int")?;
//! assert_eq!(first, second);
//! # Ok::<(), sql_pattern::Error>(())
//! ```

use crate::error::Result;
use crate::parser::PatternParser;
use crate::pattern::Pattern;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Longest key a cache has to accept.
pub const MAX_CACHE_KEY_LENGTH: usize = 64;

/// Namespace prepended to cache keys unless configured otherwise.
pub const DEFAULT_KEY_PREFIX: &str = "sqlpattern.";

/// Errors reported by cache collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache store could not be reached or refused the operation
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// The key does not satisfy the store's constraints
    #[error("Invalid cache key '{0}'")]
    InvalidKey(String),
}

/// Result type alias for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Key-value store holding parsed patterns.
///
/// Concurrent writes of the same key must leave one of the written values
/// in place; implementations provide that guarantee.
pub trait PatternCache: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<Pattern>>;

    /// Stores `pattern` without expiry. Returns whether it was stored.
    fn put_permanently(&self, key: &str, pattern: &Pattern) -> CacheResult<bool>;

    /// Removes the entry under `key`. Returns whether one existed.
    fn flush(&self, key: &str) -> CacheResult<bool>;
}

impl<C: PatternCache + ?Sized> PatternCache for Arc<C> {
    fn get(&self, key: &str) -> CacheResult<Option<Pattern>> {
        (**self).get(key)
    }

    fn put_permanently(&self, key: &str, pattern: &Pattern) -> CacheResult<bool> {
        (**self).put_permanently(key, pattern)
    }

    fn flush(&self, key: &str) -> CacheResult<bool> {
        (**self).flush(key)
    }
}

/// In-process [`PatternCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Pattern>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn check_key(key: &str) -> CacheResult<()> {
        if key.len() > MAX_CACHE_KEY_LENGTH || !key.is_ascii() {
            return Err(CacheError::InvalidKey(key.to_owned()));
        }
        Ok(())
    }
}

impl PatternCache for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<Pattern>> {
        Self::check_key(key)?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put_permanently(&self, key: &str, pattern: &Pattern) -> CacheResult<bool> {
        Self::check_key(key)?;
        self.entries
            .write()
            .entry(key.to_owned())
            .or_insert_with(|| pattern.clone());
        Ok(true)
    }

    fn flush(&self, key: &str) -> CacheResult<bool> {
        Self::check_key(key)?;
        Ok(self.entries.write().remove(key).is_some())
    }
}

/// A [`PatternParser`] consulting a [`PatternCache`] before parsing.
#[derive(Debug)]
pub struct CachingPatternParser<P, C> {
    parser: P,
    cache: C,
    key_prefix: String,
}

impl<P: PatternParser, C: PatternCache> CachingPatternParser<P, C> {
    pub fn new(parser: P, cache: C) -> Self {
        Self {
            parser,
            cache,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
        }
    }

    /// Namespaces cache keys with `prefix`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// The key `template` is cached under: the prefix followed by the hex
    /// form of the first 16 bytes of the template's SHA-256 digest.
    pub fn cache_key(&self, template: &str) -> String {
        let digest = Sha256::digest(template.as_bytes());
        format!("{}{}", self.key_prefix, hex::encode(&digest[..16]))
    }

    /// Drops the cached pattern of `template`. Returns whether one was cached.
    pub fn forget(&self, template: &str) -> bool {
        let key = self.cache_key(template);
        self.cache.flush(&key).unwrap_or_else(|err| {
            warn!(error = %err, key = %key, "failed to flush cached pattern");
            false
        })
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn inner(&self) -> &P {
        &self.parser
    }
}

impl<P: PatternParser, C: PatternCache> PatternParser for CachingPatternParser<P, C> {
    fn parse(&self, template: &str) -> Result<Pattern> {
        let key = self.cache_key(template);
        match self.cache.get(&key) {
            Ok(Some(pattern)) => {
                trace!(key = %key, "pattern cache hit");
                return Ok(pattern);
            }
            Ok(None) => trace!(key = %key, "pattern cache miss"),
            Err(err) => {
                warn!(error = %err, key = %key, "pattern cache lookup failed, parsing without cache");
                return self.parser.parse(template);
            }
        }

        let pattern = self.parser.parse(template)?;
        if let Err(err) = self.cache.put_permanently(&key, &pattern) {
            warn!(error = %err, key = %key, "failed to store parsed pattern in cache");
        }
        Ok(pattern)
    }
}
