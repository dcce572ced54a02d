//! Scan orchestration.
//!
//! A [`Scanner`] wires one [`Prober`] into the detector, both enumerators
//! and the registry client, then runs them in order: detect, enumerate
//! (plugins and themes concurrently), drop ignored slugs, enrich.
//!
//! # Example
//!
//! ```no_run
//! use wpscout::{Config, Scanner, Target};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let scanner = Scanner::from_config(&config)?;
//!
//!     let target = Target::parse("blog.example.com")?;
//!     let result = scanner.scan(&target).await;
//!     for component in &result.components {
//!         println!("{} {} ({})", component.kind, component.slug, component.detected_by);
//!     }
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

use crate::cache::KnownSlugCache;
use crate::config::{Config, IgnoreConfig};
use crate::detector::PlatformDetector;
use crate::enumerator::{all_enumerators, Enumerator};
use crate::fetcher::{HttpFetcher, PageFetcher, Prober};
use crate::model::{Component, ScanResult, Target};
use crate::registry::RegistryClient;

pub struct Scanner {
    detector: PlatformDetector,
    enumerators: Vec<Box<dyn Enumerator>>,
    registry: Arc<RegistryClient>,
    enrich: bool,
    ignore: IgnoreConfig,
}

impl Scanner {
    /// Builds a scanner over an arbitrary fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured registry URL does not parse.
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &Config, cache: KnownSlugCache) -> Result<Self> {
        let prober = Arc::new(Prober::new(fetcher, config));
        let registry = Arc::new(RegistryClient::new(
            prober.clone(),
            &config.registry_url,
            cache,
        )?);

        Ok(Self {
            detector: PlatformDetector::new(prober.clone()),
            enumerators: all_enumerators(prober, registry.clone(), config),
            registry,
            enrich: config.enrich_plugins,
            ignore: config.ignore.clone(),
        })
    }

    /// Builds a scanner that talks HTTP and caches slugs in the user cache
    /// directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            Arc::new(HttpFetcher::new(config.max_body_bytes())),
            config,
            KnownSlugCache::with_ttl_hours(config.cache_ttl_hours),
        )
    }

    /// Scans one target. Never fails; an unreachable or non-WordPress
    /// target yields a result with `platform_detected = false` and no
    /// components.
    pub async fn scan(&self, target: &Target) -> ScanResult {
        let detection = self.detector.inspect(target).await;
        if !detection.is_detected() {
            return ScanResult::new(target, false, Vec::new()).with_protection(detection.protection);
        }

        let found = join_all(self.enumerators.iter().map(|enumerator| async move {
            let kind = enumerator.kind();
            let components = enumerator.enumerate(target).await;
            info!(
                "{} enumeration found {} on {}",
                enumerator.name(),
                components.len(),
                target
            );
            components
                .into_iter()
                .filter(|c| !self.ignore.should_ignore(kind, &c.slug))
                .collect::<Vec<_>>()
        }))
        .await;

        let mut components: Vec<Component> = found.into_iter().flatten().collect();

        if self.enrich {
            self.registry.enrich(&mut components).await;
        }

        info!("Scan of {} found {} components", target, components.len());
        ScanResult::new(target, true, components).with_protection(detection.protection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::StubFetcher;
    use crate::model::{ComponentKind, DetectionMethod};

    const HOMEPAGE: &str = r#"<html><head>
        <meta name="generator" content="WordPress 6.4.3">
        <link rel="stylesheet" href="/wp-content/themes/astra/style.min.css?ver=4.6.4">
        <script src="/wp-content/plugins/akismet/_inc/akismet-frontend.js?ver=4.9"></script>
        <script src="/wp-content/plugins/hello-dolly/hello.js"></script>
        </head><body></body></html>"#;

    const AKISMET_INFO: &str = r#"{"name":"Akismet Anti-spam","version":"5.3.1","active_installs":6000000}"#;

    fn config() -> Config {
        Config {
            max_registry_probes: 0,
            ..Config::default()
        }
    }

    fn scanner(stub: &Arc<StubFetcher>, config: &Config, dir: &tempfile::TempDir) -> Scanner {
        let fetcher: Arc<dyn PageFetcher> = stub.clone();
        let cache = KnownSlugCache::at(dir.path().join("plugin_slugs.json"), 24);
        Scanner::new(fetcher, config, cache).unwrap()
    }

    fn wordpress_site() -> StubFetcher {
        StubFetcher::new()
            .get("/", 200, HOMEPAGE)
            .get(
                "/wp-content/plugins/akismet/readme.txt",
                200,
                "=== Akismet ===\nVersion: 4.9\n",
            )
            .get_query("/plugins/info/1.2/", "akismet", 200, AKISMET_INFO)
    }

    #[tokio::test]
    async fn test_unreachable_target() {
        let stub = Arc::new(StubFetcher::unreachable());
        let dir = tempfile::tempdir().unwrap();

        let result = scanner(&stub, &Config::default(), &dir)
            .scan(&Target::parse("http://site.test").unwrap())
            .await;

        assert!(!result.platform_detected);
        assert!(result.components.is_empty());
        assert_eq!(result.plugins().count(), 0);
        assert_eq!(result.themes().count(), 0);
    }

    #[tokio::test]
    async fn test_not_wordpress_skips_enumeration() {
        let stub = Arc::new(StubFetcher::new().get("/", 200, "<html><body>static site</body></html>"));
        let dir = tempfile::tempdir().unwrap();

        let result = scanner(&stub, &config(), &dir)
            .scan(&Target::parse("http://site.test").unwrap())
            .await;

        assert!(!result.platform_detected);
        assert_eq!(stub.count_query("plugin_information"), 0);
        assert!(stub
            .requests()
            .iter()
            .all(|r| !r.path.ends_with("readme.txt")));
    }

    #[tokio::test]
    async fn test_full_scan_with_enrichment() {
        let stub = Arc::new(wordpress_site());
        let dir = tempfile::tempdir().unwrap();

        let result = scanner(&stub, &config(), &dir)
            .scan(&Target::parse("http://site.test").unwrap())
            .await;

        assert!(result.platform_detected);
        let plugins: Vec<_> = result.plugins().collect();
        assert_eq!(plugins.len(), 2);

        let akismet = plugins.iter().find(|c| c.slug == "akismet").unwrap();
        assert_eq!(akismet.version.as_deref(), Some("4.9"));
        assert_eq!(akismet.verified_by, Some(DetectionMethod::ReadmeVerified));
        assert_eq!(akismet.latest_version(), Some("5.3.1"));

        let themes: Vec<_> = result.themes().collect();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].slug, "astra");
        assert!(themes[0].details.is_none());
    }

    #[tokio::test]
    async fn test_protection_carried_into_result() {
        let stub = Arc::new(wordpress_site().get_with_header(
            "/wp-login.php",
            "<html></html>",
            "server",
            "cloudflare",
        ));
        let dir = tempfile::tempdir().unwrap();

        let result = scanner(&stub, &config(), &dir)
            .scan(&Target::parse("http://site.test").unwrap())
            .await;

        assert!(result.platform_detected);
        assert_eq!(result.protection.as_deref(), Some("Cloudflare"));
        assert!(!result.components.is_empty());

        let blocked = Arc::new(StubFetcher::new().get("/", 403, "Sorry, you have been blocked. Cloudflare"));
        let result = scanner(&blocked, &config(), &dir)
            .scan(&Target::parse("http://site.test").unwrap())
            .await;

        assert!(!result.platform_detected);
        assert_eq!(result.protection.as_deref(), Some("Cloudflare"));
    }

    #[tokio::test]
    async fn test_ignore_and_no_enrich() {
        let stub = Arc::new(wordpress_site());
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.enrich_plugins = false;
        config.ignore.plugins = vec!["hello-*".to_string()];

        let result = scanner(&stub, &config, &dir)
            .scan(&Target::parse("http://site.test").unwrap())
            .await;

        let slugs: Vec<_> = result
            .components
            .iter()
            .map(|c| (c.kind, c.slug.as_str()))
            .collect();
        assert_eq!(
            slugs,
            vec![(ComponentKind::Plugin, "akismet"), (ComponentKind::Theme, "astra")]
        );
        assert_eq!(stub.count_query("plugin_information"), 0);
    }
}
