use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use super::{fetch_homepage, listing_slugs, referenced_slugs, CandidateSet, Enumerator};
use crate::fetcher::{into_signal, Page, Prober};
use crate::model::{Component, ComponentKind, DetectionMethod, Target};
use crate::registry::RegistryClient;
use crate::signatures::{
    PLUGIN_LISTING_PATHS, PLUGIN_MARKER, PLUGIN_ROOT, PLUGIN_SIGNATURE_FILES,
    README_PLACEHOLDER_NAME,
};

static README_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^===\s*(.+?)\s*===").unwrap());
static README_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?mi)^Version:\s*([\d.]+)").unwrap());

const RESOURCE_TAGS: &[&str] = &["script", "link", "img", "iframe"];

/// What a plugin's `readme.txt` says about it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReadmeHeader {
    name: Option<String>,
    version: Option<String>,
}

/// Parses a `readme.txt`. Returns `None` unless the body carries a
/// `=== Name ===` header line.
fn parse_readme(body: &str) -> Option<ReadmeHeader> {
    let header = README_HEADER.captures(body)?;
    let name = header
        .get(1)
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty() && *name != README_PLACEHOLDER_NAME)
        .map(str::to_string);

    let version = README_VERSION
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .filter(|v| !v.is_empty());

    Some(ReadmeHeader { name, version })
}

/// Enumerates installed plugins.
///
/// Resource URLs, signature files, registry slugs and directory listings
/// run concurrently and are merged in that order. Every surviving slug is
/// then checked against its `readme.txt`.
pub struct PluginEnumerator {
    prober: Arc<Prober>,
    registry: Arc<RegistryClient>,
    max_registry_probes: usize,
}

impl PluginEnumerator {
    pub fn new(prober: Arc<Prober>, registry: Arc<RegistryClient>, max_registry_probes: usize) -> Self {
        Self {
            prober,
            registry,
            max_registry_probes,
        }
    }

    async fn scan_resources(&self, target: &Target, deadline: Instant) -> Vec<Component> {
        let Some(homepage) = fetch_homepage(&self.prober, target, deadline).await else {
            return Vec::new();
        };

        referenced_slugs(&homepage.body, RESOURCE_TAGS, PLUGIN_MARKER)
            .into_iter()
            .map(|slug| Component::plugin(slug, DetectionMethod::ResourceUrl))
            .collect()
    }

    async fn probe_signature_files(&self, target: &Target, deadline: Instant) -> Vec<Component> {
        let prober = &self.prober;
        prober
            .probe_all(
                PLUGIN_SIGNATURE_FILES.iter().copied(),
                deadline,
                move |(file, name)| async move {
                    let url = target.join(&format!("{}{}", PLUGIN_ROOT, file))?;
                    into_signal(prober.head(url).await.and_then(Page::ensure_ok))?;
                    let slug = file.split('/').next()?;
                    Some(Component::plugin(slug, DetectionMethod::KnownSignatureFile).with_name(name))
                },
            )
            .await
    }

    async fn probe_registry_slugs(&self, target: &Target, deadline: Instant) -> Vec<Component> {
        let slugs = self.registry.known_slugs(self.max_registry_probes).await;
        if slugs.is_empty() {
            return Vec::new();
        }
        debug!("Probing {} registry slugs on {}", slugs.len(), target);

        let prober = &self.prober;
        prober
            .probe_all(slugs, deadline, move |slug| async move {
                let url = target.join(&format!("{}{}/", PLUGIN_ROOT, slug))?;
                into_signal(prober.head(url).await.and_then(Page::ensure_ok))?;
                Some(Component::plugin(slug, DetectionMethod::RegistrySlugProbe))
            })
            .await
    }

    async fn read_listings(&self, target: &Target, deadline: Instant) -> Vec<Component> {
        listing_slugs(&self.prober, target, PLUGIN_LISTING_PATHS, deadline)
            .await
            .into_iter()
            .map(|slug| Component::plugin(slug, DetectionMethod::DirectoryListing))
            .collect()
    }

    /// Fetches `readme.txt` from each `(slug, directory)` and returns the
    /// headers found, keyed by slug.
    async fn verify_readmes(
        &self,
        target: &Target,
        directories: Vec<(String, String)>,
        deadline: Instant,
    ) -> Vec<(String, ReadmeHeader)> {
        let prober = &self.prober;
        prober
            .probe_all(directories, deadline, move |(slug, directory)| async move {
                let url = target.join(&format!("{}{}/readme.txt", PLUGIN_ROOT, directory))?;
                let page = into_signal(prober.get_small(url).await.and_then(Page::ensure_ok))?;
                let header = parse_readme(&page.body)?;
                Some((slug, header))
            })
            .await
    }
}

#[async_trait]
impl Enumerator for PluginEnumerator {
    fn name(&self) -> &'static str {
        "Plugins"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Plugin
    }

    async fn enumerate(&self, target: &Target) -> Vec<Component> {
        let deadline = self.prober.deadline();

        let (resources, signatures, registry, listings) = tokio::join!(
            self.scan_resources(target, deadline),
            self.probe_signature_files(target, deadline),
            self.probe_registry_slugs(target, deadline),
            self.read_listings(target, deadline),
        );
        debug!(
            "Plugin candidates: {} resource, {} signature, {} registry, {} listing",
            resources.len(),
            signatures.len(),
            registry.len(),
            listings.len()
        );

        let mut candidates = CandidateSet::plugins();
        candidates.extend(resources);
        candidates.extend(signatures);
        candidates.extend(registry);
        candidates.extend(listings);

        let verified = self
            .verify_readmes(target, candidates.path_segments(), deadline)
            .await;
        for (slug, header) in verified {
            if let Some(component) = candidates.get_mut(&slug) {
                component.verified_by = Some(DetectionMethod::ReadmeVerified);
                if component.name.is_none() {
                    component.name = header.name;
                }
                if component.version.is_none() {
                    component.version = header.version;
                }
            }
        }

        candidates.into_vec()
    }
}
