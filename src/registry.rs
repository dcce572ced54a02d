//! Plugin directory client.
//!
//! Two calls against the public plugin directory API:
//!
//! - `action=plugin_information` resolves one slug to [`RegistryMetadata`]
//! - `action=query_plugins` lists popular slugs for brute-force enumeration,
//!   served through [`KnownSlugCache`]
//!
//! Missing fields mean "no data". Non-success statuses, transport failures
//! and malformed JSON all resolve to "absent", never to an error.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::KnownSlugCache;
use crate::error::{ProbeError, ProbeResult};
use crate::fetcher::{Page, Prober};
use crate::html;
use crate::model::{Component, ComponentKind, RegistryMetadata};

/// The listing call always asks for at least this many slugs so the cached
/// document can serve later scans with a higher probe limit.
const MIN_PAGE_SIZE: usize = 250;

#[derive(Deserialize)]
struct QueryPluginsResponse {
    #[serde(default)]
    plugins: Vec<PluginSummary>,
}

#[derive(Deserialize)]
struct PluginSummary {
    slug: Option<String>,
}

pub struct RegistryClient {
    prober: Arc<Prober>,
    base: Url,
    cache: KnownSlugCache,
}

impl RegistryClient {
    pub fn new(prober: Arc<Prober>, registry_url: &str, cache: KnownSlugCache) -> Result<Self> {
        Ok(Self {
            prober,
            base: Url::parse(registry_url)?,
            cache,
        })
    }

    pub fn cache(&self) -> &KnownSlugCache {
        &self.cache
    }

    fn endpoint(&self, query: &str) -> Url {
        let mut url = self.base.clone();
        url.set_query(Some(query));
        url
    }

    /// Resolves a plugin slug to its directory metadata.
    pub async fn lookup(&self, slug: &str) -> Option<RegistryMetadata> {
        match self.fetch_information(slug).await {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!("Registry lookup for {} failed: {}", slug, err);
                None
            }
        }
    }

    async fn fetch_information(&self, slug: &str) -> ProbeResult<Option<RegistryMetadata>> {
        let url = self.endpoint(&format!(
            "action=plugin_information&request[slug]={}",
            slug
        ));
        let page = self.prober.get_registry(url).await?.ensure_ok()?;
        let value: Value = parse_json(&page)?;
        Ok(parse_information(&value))
    }

    /// Returns up to `limit` known plugin slugs, most popular first.
    ///
    /// A fresh cache is served as is. Otherwise the list is fetched once,
    /// persisted, and returned; if that fetch fails the result is empty
    /// rather than stale.
    pub async fn known_slugs(&self, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }

        if let Some(mut slugs) = self.cache.load_fresh() {
            debug!("Using {} cached registry slugs", slugs.len());
            slugs.truncate(limit);
            return slugs;
        }

        let mut slugs = match self.fetch_slug_page(limit.max(MIN_PAGE_SIZE)).await {
            Ok(slugs) if !slugs.is_empty() => slugs,
            Ok(_) => {
                warn!("Registry returned no plugin slugs");
                return Vec::new();
            }
            Err(err) => {
                warn!("Registry slug list unavailable: {}", err);
                return Vec::new();
            }
        };

        info!("Fetched {} plugin slugs from the registry", slugs.len());
        if let Err(err) = self.cache.store(&slugs) {
            warn!(
                "Could not write slug cache {}: {}",
                self.cache.path().display(),
                err
            );
        }

        slugs.truncate(limit);
        slugs
    }

    async fn fetch_slug_page(&self, per_page: usize) -> ProbeResult<Vec<String>> {
        let url = self.endpoint(&format!(
            "action=query_plugins&request[page]=1&request[per_page]={}",
            per_page
        ));
        let page = self.prober.get_registry(url).await?.ensure_ok()?;
        let response: QueryPluginsResponse = parse_json(&page)?;

        Ok(response
            .plugins
            .into_iter()
            .filter_map(|plugin| plugin.slug)
            .filter(|slug| !slug.is_empty())
            .collect())
    }

    /// Attaches registry metadata to every plugin that has none yet.
    pub async fn enrich(&self, components: &mut [Component]) {
        let slugs: Vec<String> = components
            .iter()
            .filter(|c| c.kind == ComponentKind::Plugin && c.details.is_none())
            .map(|c| c.slug.clone())
            .collect();

        if slugs.is_empty() {
            return;
        }

        let client = self;
        let found: HashMap<String, RegistryMetadata> = self
            .prober
            .probe_all(slugs, self.prober.deadline(), move |slug| async move {
                let metadata = client.lookup(&slug).await?;
                Some((slug, metadata))
            })
            .await
            .into_iter()
            .collect();

        info!("Registry metadata found for {} plugins", found.len());
        for component in components.iter_mut() {
            if component.kind != ComponentKind::Plugin {
                continue;
            }
            if let Some(metadata) = found.get(&component.slug) {
                component.details = Some(metadata.clone());
            }
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(page: &Page) -> ProbeResult<T> {
    serde_json::from_str(&page.body).map_err(|e| ProbeError::parse(page.url.as_str(), e))
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extracts metadata from a `plugin_information` response.
///
/// The directory answers unknown slugs with `{"error": ...}`; that and a
/// response without a name both count as no data.
fn parse_information(value: &Value) -> Option<RegistryMetadata> {
    if value.get("error").is_some() {
        return None;
    }

    let name = string_field(value, "name")?;

    Some(RegistryMetadata {
        name: Some(html::text_content(&name)),
        version: string_field(value, "version"),
        author: string_field(value, "author").map(|author| html::text_content(&author)),
        requires: string_field(value, "requires"),
        tested: string_field(value, "tested"),
        last_updated: string_field(value, "last_updated"),
        active_installs: value.get("active_installs").and_then(Value::as_u64),
        homepage: string_field(value, "homepage"),
    })
}
