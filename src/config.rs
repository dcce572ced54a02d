//! Configuration file handling.
//!
//! This module provides loading and saving of wpscout configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/wpscout/config.toml`
//! - macOS: `~/Library/Application Support/wpscout/config.toml`
//! - Windows: `%APPDATA%\wpscout\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! max_registry_probes = 30
//! cache_ttl_hours = 24
//! concurrency = 8
//! scan_deadline_secs = 90
//! enrich_plugins = true
//! default_format = "table"
//!
//! [timeouts]
//! signature_secs = 5
//! content_secs = 10
//! registry_secs = 15
//!
//! [ignore]
//! plugins = ["hello-dolly", "wp-*-cache"]
//! themes = ["twenty*"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::model::ComponentKind;

pub const DEFAULT_REGISTRY_URL: &str = "https://api.wordpress.org/plugins/info/1.2/";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Application configuration.
///
/// Loaded once at startup and handed to the detector, enumerators and
/// registry client when they are constructed.
///
/// # Example
///
/// ```no_run
/// use wpscout::Config;
///
/// let config = Config::load().unwrap();
///
/// println!("Registry probes per scan: {}", config.max_registry_probes);
/// println!("Slug cache TTL: {} hours", config.cache_ttl_hours);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of registry slugs brute-forced against one target.
    ///
    /// Default: 30
    pub max_registry_probes: usize,

    /// How long the cached registry slug list stays fresh, in hours.
    ///
    /// Default: 24 hours
    pub cache_ttl_hours: u64,

    /// Probes in flight at once per technique.
    ///
    /// Default: 8
    pub concurrency: usize,

    /// Overall budget for one detection or enumeration pass, in seconds.
    /// Whatever was collected when it runs out is returned.
    ///
    /// Default: 90
    pub scan_deadline_secs: u64,

    /// Response bodies are truncated after this many KiB.
    ///
    /// Default: 2048
    pub max_body_kib: usize,

    /// User-Agent presented by the hosted-variant detection pass.
    pub user_agent: String,

    /// Base URL of the plugin directory API.
    pub registry_url: String,

    /// Whether detected plugins are looked up in the registry.
    ///
    /// Default: true
    pub enrich_plugins: bool,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    /// Whether every scan is written to the results directory.
    ///
    /// Default: false
    pub save_results: bool,

    /// Per-probe timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Components to drop from results.
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Per-probe timeouts, in seconds.
///
/// Existence checks favour short timeouts, content-bearing requests longer
/// ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// HEAD probes and small files (readme.txt, style.css).
    pub signature_secs: u64,
    /// Homepage and directory listing GETs.
    pub content_secs: u64,
    /// Registry API calls.
    pub registry_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            signature_secs: 5,
            content_secs: 10,
            registry_secs: 15,
        }
    }
}

/// Slugs to suppress from results.
///
/// Supports `*` as a wildcard (e.g., "wp-*", "*-cache").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    pub plugins: Vec<String>,
    pub themes: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a component should be dropped from results.
    pub fn should_ignore(&self, kind: ComponentKind, slug: &str) -> bool {
        let patterns = match kind {
            ComponentKind::Plugin => &self.plugins,
            ComponentKind::Theme => &self.themes,
        };

        patterns.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, slug)
            } else {
                pattern.eq_ignore_ascii_case(slug)
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    // Prefix before the first *
    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    // Suffix after the last *
    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_registry_probes: 30,
            cache_ttl_hours: 24,
            concurrency: 8,
            scan_deadline_secs: 90,
            max_body_kib: 2048,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            enrich_plugins: true,
            default_format: "table".to_string(),
            save_results: false,
            timeouts: TimeoutConfig::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wpscout")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_kib.saturating_mul(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("akismet", "akismet"));
        assert!(!glob_match("akismet", "jetpack"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("wp-*", "wp-super-cache"));
        assert!(glob_match("wp-*", "wp-"));
        assert!(!glob_match("wp-*", "jetpack"));
    }

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*-cache", "wp-super-cache"));
        assert!(!glob_match("*-cache", "cache-enabler"));
    }

    #[test]
    fn test_glob_match_contains() {
        assert!(glob_match("*seo*", "wordpress-seo"));
        assert!(glob_match("*seo*", "all-in-one-seo-pack"));
        assert!(!glob_match("*seo*", "akismet"));
    }

    #[test]
    fn test_ignore_config_by_kind() {
        let config = IgnoreConfig {
            plugins: vec!["hello-dolly".to_string(), "wp-*".to_string()],
            themes: vec!["twenty*".to_string()],
        };

        assert!(config.should_ignore(ComponentKind::Plugin, "hello-dolly"));
        assert!(config.should_ignore(ComponentKind::Plugin, "wp-super-cache"));
        assert!(!config.should_ignore(ComponentKind::Plugin, "akismet"));
        assert!(config.should_ignore(ComponentKind::Theme, "twentytwentyfour"));
        assert!(!config.should_ignore(ComponentKind::Theme, "hello-dolly"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.max_registry_probes, 30);
        assert_eq!(config.cache_ttl_hours, 24);
        assert_eq!(config.default_format, "table");
        assert_eq!(config.timeouts.signature_secs, 5);
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
        assert!(config.enrich_plugins);
        assert!(config.ignore.plugins.is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("max_registry_probes = 5\n[timeouts]\ncontent_secs = 3\n").unwrap();

        assert_eq!(config.max_registry_probes, 5);
        assert_eq!(config.cache_ttl_hours, 24);
        assert_eq!(config.timeouts.content_secs, 3);
        assert_eq!(config.timeouts.signature_secs, 5);
    }
}
