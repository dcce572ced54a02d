//! Platform detection.
//!
//! [`PlatformDetector`] answers one question: does this target run
//! WordPress? Techniques run cheapest and most precise first and the first
//! positive signal wins:
//!
//! 1. Known paths (`wp-admin/`, `wp-login.php`, ...) answering `200 OK`
//! 2. A generator meta tag naming the platform
//! 3. Script or stylesheet URLs under `wp-content`
//! 4. Hosted-variant signals, fetched with a browser User-Agent
//!
//! Any transport failure counts as "signal absent". Detection never
//! returns an error; an unreachable target is simply not confirmed.
//!
//! Every page fetched along the way is also checked for an edge protection
//! service, reported in [`Detection::protection`].

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::fetcher::{into_signal, Page, Prober};
use crate::html;
use crate::model::Target;
use crate::signatures::{
    CONTENT_MARKER, HOSTED_BODY_MARKER, HOSTED_CLASSES, HOSTING_HEADER, KNOWN_PATHS, PLATFORM_NAME,
    PROTECTION_MARKER, PROTECTION_NAME,
};

/// The signal that confirmed the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    KnownPath(String),
    GeneratorMeta(String),
    ResourcePath(String),
    HostingHeader(String),
    HostedClass(String),
    HostedMarker,
}

impl std::fmt::Display for Evidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evidence::KnownPath(path) => write!(f, "known path {}", path),
            Evidence::GeneratorMeta(content) => write!(f, "generator meta tag \"{}\"", content),
            Evidence::ResourcePath(url) => write!(f, "resource path {}", url),
            Evidence::HostingHeader(value) => write!(f, "{} header \"{}\"", HOSTING_HEADER, value),
            Evidence::HostedClass(class) => write!(f, "hosted class \"{}\"", class),
            Evidence::HostedMarker => write!(f, "hosted marker \"{}\"", HOSTED_BODY_MARKER),
        }
    }
}

/// Outcome of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub evidence: Option<Evidence>,
    pub protection: Option<String>,
}

impl Detection {
    pub fn is_detected(&self) -> bool {
        self.evidence.is_some()
    }
}

pub struct PlatformDetector {
    prober: Arc<Prober>,
}

impl PlatformDetector {
    pub fn new(prober: Arc<Prober>) -> Self {
        Self { prober }
    }

    /// Returns true if any signal confirms the platform.
    pub async fn detect(&self, target: &Target) -> bool {
        self.inspect(target).await.is_detected()
    }

    /// Returns the first signal that confirmed the platform, if any.
    pub async fn detect_evidence(&self, target: &Target) -> Option<Evidence> {
        self.inspect(target).await.evidence
    }

    /// Runs a full detection pass.
    ///
    /// The whole pass is bounded by the prober deadline; running out of
    /// time counts as not confirmed, but protection seen before then is
    /// still reported.
    pub async fn inspect(&self, target: &Target) -> Detection {
        let deadline = self.prober.deadline();
        let mut protection = None;
        let evidence = tokio::time::timeout_at(deadline, self.run(target, &mut protection))
            .await
            .unwrap_or_else(|_| {
                debug!("Platform detection for {} hit the deadline", target);
                None
            });

        match &evidence {
            Some(found) => info!("WordPress confirmed on {} via {}", target, found),
            None => info!("WordPress not confirmed on {}", target),
        }
        if let Some(name) = &protection {
            warn!("{} appears to be behind {}; detection may be limited", target, name);
        }
        Detection {
            evidence,
            protection,
        }
    }

    async fn run(&self, target: &Target, protection: &mut Option<String>) -> Option<Evidence> {
        if let Some(evidence) = self.probe_known_paths(target, protection).await {
            return Some(evidence);
        }

        if let Some(homepage) = into_signal(self.prober.get(target.url().clone()).await) {
            note_protection(protection, &homepage);
            if let Some(evidence) = standard_page_signals(&homepage.body) {
                return Some(evidence);
            }
        }

        let hosted = into_signal(self.prober.get_as_browser(target.url().clone()).await)?;
        note_protection(protection, &hosted);
        hosted_signals(&hosted)
    }

    /// Probes the known paths on the bounded pool and stops at the first
    /// `200 OK`.
    async fn probe_known_paths(
        &self,
        target: &Target,
        protection: &mut Option<String>,
    ) -> Option<Evidence> {
        let prober = &self.prober;
        let urls: Vec<(&str, _)> = KNOWN_PATHS
            .iter()
            .filter_map(|path| target.join(path).map(|url| (*path, url)))
            .collect();

        let mut probes = stream::iter(urls)
            .map(|(path, url)| async move { (path, into_signal(prober.get(url).await)) })
            .buffer_unordered(prober.concurrency());

        while let Some((path, page)) = probes.next().await {
            let Some(page) = page else { continue };
            note_protection(protection, &page);
            if page.is_ok() {
                return Some(Evidence::KnownPath(path.to_string()));
            }
            debug!("{} answered {}", path, page.status);
        }
        None
    }
}

fn note_protection(protection: &mut Option<String>, page: &Page) {
    if protection.is_none() {
        *protection = protection_signal(page);
    }
}

/// A `Server` header naming the service, or a `403` challenge page
/// mentioning it.
fn protection_signal(page: &Page) -> Option<String> {
    let by_server = page
        .header("server")
        .map(|server| server.to_lowercase().contains(PROTECTION_MARKER))
        .unwrap_or(false);
    let by_challenge = page.status == 403 && page.body.to_lowercase().contains(PROTECTION_MARKER);

    (by_server || by_challenge).then(|| PROTECTION_NAME.to_string())
}

/// Generator meta tag, then script/stylesheet references.
fn standard_page_signals(body: &str) -> Option<Evidence> {
    if let Some(content) = html::generator_contents(body)
        .into_iter()
        .find(|content| content.to_lowercase().contains(PLATFORM_NAME))
    {
        return Some(Evidence::GeneratorMeta(content));
    }

    html::resource_refs(body, &["script", "link"])
        .into_iter()
        .find(|reference| reference.contains(CONTENT_MARKER))
        .map(Evidence::ResourcePath)
}

/// Hosting header, hosted CSS classes, then the raw body marker.
fn hosted_signals(page: &Page) -> Option<Evidence> {
    if let Some(value) = page.header(HOSTING_HEADER) {
        if value.to_lowercase().contains(PLATFORM_NAME) {
            return Some(Evidence::HostingHeader(value.to_string()));
        }
    }

    if let Some(class) = html::find_class(&page.body, HOSTED_CLASSES) {
        return Some(Evidence::HostedClass(class.to_string()));
    }

    if page.body.to_lowercase().contains(HOSTED_BODY_MARKER) {
        return Some(Evidence::HostedMarker);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::{prober, StubFetcher};
    use crate::fetcher::FetchMethod;

    fn target() -> Target {
        Target::parse("http://site.test").unwrap()
    }

    fn detector(stub: &Arc<StubFetcher>) -> PlatformDetector {
        PlatformDetector::new(Arc::new(prober(stub)))
    }

    #[tokio::test]
    async fn test_known_path_short_circuits_homepage() {
        let stub = Arc::new(StubFetcher::new().get("/wp-admin/", 200, "<html></html>"));

        let evidence = detector(&stub).detect_evidence(&target()).await;

        assert_eq!(evidence, Some(Evidence::KnownPath("wp-admin/".to_string())));
        assert_eq!(stub.count(FetchMethod::Get, "/"), 0);
    }

    #[tokio::test]
    async fn test_generator_meta_alone() {
        let stub = Arc::new(StubFetcher::new().get(
            "/",
            200,
            r#"<html><head><meta name="generator" content="WordPress 6.2"></head><body></body></html>"#,
        ));

        let evidence = detector(&stub).detect_evidence(&target()).await;

        assert_eq!(evidence, Some(Evidence::GeneratorMeta("WordPress 6.2".to_string())));
    }

    #[tokio::test]
    async fn test_generator_meta_is_case_insensitive() {
        let stub = Arc::new(StubFetcher::new().get(
            "/",
            200,
            r#"<meta name="generator" content="WORDPRESS.com">"#,
        ));
        assert!(detector(&stub).detect(&target()).await);
    }

    #[tokio::test]
    async fn test_resource_path_signature() {
        let stub = Arc::new(StubFetcher::new().get(
            "/",
            200,
            r#"<link rel="stylesheet" href="https://site.test/wp-content/themes/astra/style.css">"#,
        ));

        let evidence = detector(&stub).detect_evidence(&target()).await;

        assert!(matches!(evidence, Some(Evidence::ResourcePath(_))));
    }

    #[tokio::test]
    async fn test_hosting_header_uses_browser_agent() {
        let stub = Arc::new(StubFetcher::new().get_with_header(
            "/",
            "<html></html>",
            "x-hosting-provider",
            "WordPress VIP",
        ));

        let evidence = detector(&stub).detect_evidence(&target()).await;

        assert_eq!(evidence, Some(Evidence::HostingHeader("WordPress VIP".to_string())));
        let homepage_fetches: Vec<_> = stub
            .requests()
            .into_iter()
            .filter(|r| r.path == "/")
            .collect();
        assert_eq!(homepage_fetches.len(), 2);
        assert!(homepage_fetches[0].user_agent.is_none());
        assert!(homepage_fetches[1].user_agent.is_some());
    }

    #[tokio::test]
    async fn test_hosted_class_and_marker() {
        let stub = Arc::new(StubFetcher::new().get("/", 200, r#"<body class="wpcom home"></body>"#));
        assert_eq!(
            detector(&stub).detect_evidence(&target()).await,
            Some(Evidence::HostedClass("wpcom".to_string()))
        );

        let stub = Arc::new(StubFetcher::new().get("/", 200, "<!-- served by WPVIP -->"));
        assert_eq!(
            detector(&stub).detect_evidence(&target()).await,
            Some(Evidence::HostedMarker)
        );
    }

    #[tokio::test]
    async fn test_plain_site_is_not_confirmed() {
        let stub = Arc::new(
            StubFetcher::new()
                .get("/", 200, r#"<html><head><meta name="generator" content="Hugo 0.120"></head></html>"#)
                .get("/wp-admin/", 403, ""),
        );
        assert!(!detector(&stub).detect(&target()).await);
    }

    #[tokio::test]
    async fn test_unreachable_target_fails_closed() {
        let stub = Arc::new(StubFetcher::unreachable());
        assert!(!detector(&stub).detect(&target()).await);
    }

    #[tokio::test]
    async fn test_protection_from_server_header() {
        let stub = Arc::new(StubFetcher::new().get_with_header(
            "/wp-admin/",
            "<html></html>",
            "server",
            "cloudflare",
        ));

        let detection = detector(&stub).inspect(&target()).await;

        assert_eq!(detection.evidence, Some(Evidence::KnownPath("wp-admin/".to_string())));
        assert_eq!(detection.protection.as_deref(), Some("Cloudflare"));
    }

    #[tokio::test]
    async fn test_protection_from_challenge_page() {
        let stub = Arc::new(StubFetcher::new().get(
            "/",
            403,
            "<html><title>Attention Required! | Cloudflare</title></html>",
        ));

        let detection = detector(&stub).inspect(&target()).await;

        assert!(!detection.is_detected());
        assert_eq!(detection.protection.as_deref(), Some("Cloudflare"));
    }

    #[tokio::test]
    async fn test_plain_forbidden_is_not_protection() {
        let stub = Arc::new(
            StubFetcher::new()
                .get("/", 403, "<html>Forbidden</html>")
                .get("/wp-admin/", 403, "Forbidden"),
        );

        let detection = detector(&stub).inspect(&target()).await;

        assert_eq!(detection, Detection::default());
    }

    #[test]
    fn test_protection_needs_challenge_status_for_body_match() {
        let page = Page {
            url: target().url().clone(),
            status: 200,
            headers: Default::default(),
            body: "Performance by Cloudflare".to_string(),
        };
        assert_eq!(protection_signal(&page), None);
    }

    #[tokio::test]
    async fn test_more_signals_never_flip_to_false() {
        let meta = r#"<meta name="generator" content="WordPress 6.2">"#;
        let combined = r#"<meta name="generator" content="WordPress 6.2">
            <script src="/wp-content/plugins/x/x.js"></script>
            <body class="vip">wpvip</body>"#;

        let variants = vec![
            StubFetcher::new().get("/", 200, meta),
            StubFetcher::new().get("/", 200, combined),
            StubFetcher::new().get("/", 200, combined).get("/readme.html", 200, ""),
            StubFetcher::new()
                .get("/", 200, combined)
                .get("/wp-login.php", 200, "")
                .get_with_header("/wp-content/", "", "x-hosting-provider", "wordpress"),
        ];

        for stub in variants {
            let stub = Arc::new(stub);
            assert!(detector(&stub).detect(&target()).await);
        }
    }
}
