//! File-backed cache of known registry plugin slugs.
//!
//! The registry slug list used for brute-force enumeration is fetched at
//! most once per TTL window and stored as a single JSON document:
//!
//! ```json
//! { "fetched_at": "2026-10-18T09:12:44Z", "plugin_slugs": ["akismet", "jetpack"] }
//! ```
//!
//! Freshness is judged from `fetched_at` against the wall clock. The cache
//! is invalidated wholesale; it is never refreshed in part.
//!
//! # Cache Location
//!
//! - Linux: `~/.cache/wpscout/plugin_slugs.json`
//! - macOS: `~/Library/Caches/wpscout/plugin_slugs.json`
//! - Windows: `%LOCALAPPDATA%\wpscout\plugin_slugs.json`
//!
//! # Example
//!
//! ```no_run
//! use wpscout::KnownSlugCache;
//!
//! let cache = KnownSlugCache::new();
//! cache.store(&["akismet".to_string()]).unwrap();
//!
//! let slugs = cache.load_fresh();
//! assert_eq!(slugs, Some(vec!["akismet".to_string()]));
//! ```

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths::cache_dir;

/// Default cache TTL in hours.
const CACHE_TTL_HOURS: u64 = 24;

/// Longer TTLs are clamped to a century.
const MAX_TTL_HOURS: u64 = 24 * 365 * 100;

const CACHE_FILE: &str = "plugin_slugs.json";

#[derive(Debug, Serialize, Deserialize)]
struct SlugDocument {
    fetched_at: DateTime<Utc>,
    plugin_slugs: Vec<String>,
}

/// Time-bounded store of registry plugin slugs.
#[derive(Debug, Clone)]
pub struct KnownSlugCache {
    path: PathBuf,
    ttl: Duration,
}

impl KnownSlugCache {
    /// Creates a cache in the platform cache directory with the default
    /// 24-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl_hours(CACHE_TTL_HOURS)
    }

    /// Creates a cache in the platform cache directory with a custom TTL.
    pub fn with_ttl_hours(hours: u64) -> Self {
        Self::at(cache_dir().join(CACHE_FILE), hours)
    }

    /// Creates a cache backed by an explicit file.
    pub fn at(path: impl Into<PathBuf>, ttl_hours: u64) -> Self {
        Self {
            path: path.into(),
            ttl: Duration::hours(ttl_hours.min(MAX_TTL_HOURS) as i64),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached slugs if the document exists and is still fresh.
    ///
    /// An expired document is removed. A corrupt one is treated as missing.
    pub fn load_fresh(&self) -> Option<Vec<String>> {
        let content = fs::read_to_string(&self.path).ok()?;
        let document: SlugDocument = serde_json::from_str(&content).ok()?;

        if Utc::now() - document.fetched_at >= self.ttl {
            let _ = fs::remove_file(&self.path);
            return None;
        }

        Some(document.plugin_slugs)
    }

    /// Replaces the cached document with `slugs`, stamped with the current
    /// time.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created or the
    /// file cannot be written.
    pub fn store(&self, slugs: &[String]) -> Result<()> {
        self.store_at(slugs, Utc::now())
    }

    fn store_at(&self, slugs: &[String], fetched_at: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let document = SlugDocument {
            fetched_at,
            plugin_slugs: slugs.to_vec(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }

    /// Removes the cached document.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, slugs: &[String], age: Duration) -> Result<()> {
        self.store_at(slugs, Utc::now() - age)
    }
}

impl Default for KnownSlugCache {
    fn default() -> Self {
        Self::new()
    }
}
