use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::time::Instant;

use super::{fetch_homepage, listing_slugs, referenced_slugs, CandidateSet, Enumerator};
use crate::fetcher::{into_signal, Page, Prober};
use crate::model::{Component, ComponentKind, DetectionMethod, Target};
use crate::signatures::{THEME_LISTING_PATHS, THEME_MARKER, THEME_ROOT};

// Header lines may sit inside a block comment, so leading comment
// punctuation is skipped. `Author URI:` never matches `Author:`.
static THEME_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[ \t/*#@]*Theme Name:[ \t]*(.+?)[ \t\r]*$").unwrap());
static THEME_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[ \t/*#@]*Version:[ \t]*(.+?)[ \t\r]*$").unwrap());
static THEME_AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[ \t/*#@]*Author:[ \t]*(.+?)[ \t\r]*$").unwrap());

const RESOURCE_TAGS: &[&str] = &["link", "script", "img"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct StylesheetHeader {
    name: Option<String>,
    version: Option<String>,
    author: Option<String>,
}

impl StylesheetHeader {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.version.is_none() && self.author.is_none()
    }
}

fn header_field(regex: &Regex, css: &str) -> Option<String> {
    regex
        .captures(css)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_stylesheet(css: &str) -> StylesheetHeader {
    StylesheetHeader {
        name: header_field(&THEME_NAME, css),
        version: header_field(&THEME_VERSION, css),
        author: header_field(&THEME_AUTHOR, css),
    }
}

/// Enumerates installed themes from directory listings and resource URLs,
/// then reads each theme's `style.css` header.
pub struct ThemeEnumerator {
    prober: Arc<Prober>,
}

impl ThemeEnumerator {
    pub fn new(prober: Arc<Prober>) -> Self {
        Self { prober }
    }

    async fn scan_resources(&self, target: &Target, deadline: Instant) -> Vec<Component> {
        let Some(homepage) = fetch_homepage(&self.prober, target, deadline).await else {
            return Vec::new();
        };

        referenced_slugs(&homepage.body, RESOURCE_TAGS, THEME_MARKER)
            .into_iter()
            .map(|slug| Component::theme(slug, DetectionMethod::ResourceUrl))
            .collect()
    }

    /// Reads `style.css` from each `(slug, directory)`, keyed by slug.
    async fn read_stylesheets(
        &self,
        target: &Target,
        directories: Vec<(String, String)>,
        deadline: Instant,
    ) -> Vec<(String, StylesheetHeader)> {
        let prober = &self.prober;
        prober
            .probe_all(directories, deadline, move |(slug, directory)| async move {
                let url = target.join(&format!("{}{}/style.css", THEME_ROOT, directory))?;
                let page = into_signal(prober.get_small(url).await.and_then(Page::ensure_ok))?;
                let header = parse_stylesheet(&page.body);
                (!header.is_empty()).then_some((slug, header))
            })
            .await
    }
}

#[async_trait]
impl Enumerator for ThemeEnumerator {
    fn name(&self) -> &'static str {
        "Themes"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Theme
    }

    async fn enumerate(&self, target: &Target) -> Vec<Component> {
        let deadline = self.prober.deadline();

        let (listed, referenced) = tokio::join!(
            listing_slugs(&self.prober, target, THEME_LISTING_PATHS, deadline),
            self.scan_resources(target, deadline),
        );

        let mut candidates = CandidateSet::themes();
        candidates.extend(
            listed
                .into_iter()
                .map(|slug| Component::theme(slug, DetectionMethod::DirectoryListing)),
        );
        candidates.extend(referenced);

        let headers = self
            .read_stylesheets(target, candidates.path_segments(), deadline)
            .await;
        for (slug, header) in headers {
            if let Some(component) = candidates.get_mut(&slug) {
                component.name = component.name.take().or(header.name);
                component.version = component.version.take().or(header.version);
                component.author = component.author.take().or(header.author);
            }
        }

        candidates.into_vec()
    }
}
