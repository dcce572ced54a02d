//! Plugin and theme enumeration.
//!
//! This module provides the [`Enumerator`] trait and the two enumerators
//! run once the platform is confirmed.
//!
//! | Enumerator | Techniques |
//! |------------|------------|
//! | [`PluginEnumerator`] | resource URLs, signature files, registry slugs, directory listing, readme verification |
//! | [`ThemeEnumerator`] | directory listing, resource URLs, `style.css` header |
//!
//! Techniques produce candidates independently. Every candidate passes
//! through a single [`CandidateSet`], which normalizes, filters and
//! deduplicates slugs in technique order.

mod plugins;
mod themes;

pub use plugins::PluginEnumerator;
pub use themes::ThemeEnumerator;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use crate::config::Config;
use crate::fetcher::{into_signal, Page, Prober};
use crate::html;
use crate::model::{Component, ComponentKind, Target};
use crate::registry::RegistryClient;
use crate::signatures::FALSE_POSITIVE_SLUGS;

// At least one alphanumeric, so `.` and `..` never pass.
static SAFE_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._-]*[a-z0-9][a-z0-9._-]*$").unwrap());
static VERSION_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+(\.\d+)?$").unwrap());

/// Enumerates one kind of installed component on a confirmed target.
///
/// Enumeration never fails: probe errors are logged and treated as
/// "nothing found", so an unreachable target yields an empty list.
#[async_trait]
pub trait Enumerator: Send + Sync {
    /// Returns the human-readable name of this enumerator.
    fn name(&self) -> &'static str;

    /// Returns the component kind this enumerator produces.
    fn kind(&self) -> ComponentKind;

    /// Runs every technique against `target` and returns the deduplicated
    /// components in discovery order.
    async fn enumerate(&self, target: &Target) -> Vec<Component>;
}

/// Returns the plugin and theme enumerators, sharing one prober.
pub fn all_enumerators(
    prober: Arc<Prober>,
    registry: Arc<RegistryClient>,
    config: &Config,
) -> Vec<Box<dyn Enumerator>> {
    vec![
        Box::new(PluginEnumerator::new(
            prober.clone(),
            registry,
            config.max_registry_probes,
        )),
        Box::new(ThemeEnumerator::new(prober)),
    ]
}

/// Ordered, deduplicated set of candidate components.
///
/// Slugs are lowercased on insert. The first sighting of a slug keeps its
/// position, its `detected_by` and the path segment exactly as the site
/// spelled it; later sightings only fill empty fields.
#[derive(Debug)]
pub struct CandidateSet {
    filter_noise: bool,
    entries: Vec<Component>,
    segments: Vec<String>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    /// A set that also drops well-known non-plugin folders and bare
    /// version numbers.
    pub fn plugins() -> Self {
        Self {
            filter_noise: true,
            entries: Vec::new(),
            segments: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn themes() -> Self {
        Self {
            filter_noise: false,
            entries: Vec::new(),
            segments: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn accepts(&self, slug: &str) -> bool {
        if !SAFE_SLUG.is_match(slug) {
            return false;
        }
        if self.filter_noise
            && (FALSE_POSITIVE_SLUGS.contains(&slug) || VERSION_LIKE.is_match(slug))
        {
            return false;
        }
        true
    }

    /// Adds a candidate. Returns true if the slug was new.
    pub fn insert(&mut self, mut component: Component) -> bool {
        let segment = component.slug.trim().to_string();
        component.slug = segment.to_lowercase();
        if !self.accepts(&component.slug) {
            debug!("Dropping candidate {:?}", component.slug);
            return false;
        }

        match self.index.get(&component.slug) {
            Some(&position) => {
                self.entries[position].absorb(component);
                false
            }
            None => {
                self.index
                    .insert(component.slug.clone(), self.entries.len());
                self.entries.push(component);
                self.segments.push(segment);
                true
            }
        }
    }

    pub fn get_mut(&mut self, slug: &str) -> Option<&mut Component> {
        let position = *self.index.get(slug)?;
        self.entries.get_mut(position)
    }

    pub fn slugs(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.slug.clone()).collect()
    }

    /// `(slug, path segment)` for every entry. Follow-up fetches use the
    /// segment so case-sensitive servers resolve the directory.
    pub fn path_segments(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .zip(&self.segments)
            .map(|(c, segment)| (c.slug.clone(), segment.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Component> {
        self.entries
    }
}

impl Extend<Component> for CandidateSet {
    fn extend<T: IntoIterator<Item = Component>>(&mut self, iter: T) {
        for component in iter {
            self.insert(component);
        }
    }
}

/// Fetches the target's homepage, giving up at `deadline`.
pub(crate) async fn fetch_homepage(prober: &Prober, target: &Target, deadline: Instant) -> Option<Page> {
    match tokio::time::timeout_at(deadline, prober.get(target.url().clone())).await {
        Ok(result) => into_signal(result),
        Err(_) => {
            debug!("Homepage fetch for {} hit the deadline", target);
            None
        }
    }
}

/// Slugs referenced under `marker` by the given tags of `body`, in
/// document order.
pub(crate) fn referenced_slugs(body: &str, tags: &[&str], marker: &str) -> Vec<String> {
    html::resource_refs(body, tags)
        .iter()
        .filter_map(|reference| html::segment_after(reference, marker))
        .collect()
}

/// Directory names exposed by any of the listing `paths`.
///
/// A path only counts when it answers `200 OK` with a directory index;
/// a normal page that happens to contain links is ignored.
pub(crate) async fn listing_slugs(
    prober: &Prober,
    target: &Target,
    paths: &[&str],
    deadline: Instant,
) -> Vec<String> {
    let listings = prober
        .probe_all(paths.iter().copied(), deadline, move |path| async move {
            let url = target.join(path)?;
            let page = into_signal(prober.get(url).await.and_then(Page::ensure_ok))?;
            if !html::is_directory_index(&page.body) {
                debug!("{} is not a directory index", path);
                return None;
            }
            Some(html::directory_entries(&page.body))
        })
        .await;

    listings.into_iter().flatten().collect()
}
