//! HTTP probing.
//!
//! [`PageFetcher`] issues exactly one GET or HEAD per call and never retries.
//! [`Prober`] sits on top of it and owns the cost controls every technique
//! shares: per-probe timeouts, the bounded worker pool and the overall
//! enumeration deadline.

use async_trait::async_trait;
use futures::future::{self, FutureExt};
use futures::stream::{self, StreamExt};
use reqwest::header::HeaderMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{ProbeError, ProbeResult};

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    Head,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: FetchMethod,
    pub url: Url,
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            method: FetchMethod::Get,
            url,
            timeout,
            headers: Vec::new(),
        }
    }

    pub fn head(url: Url, timeout: Duration) -> Self {
        Self {
            method: FetchMethod::Head,
            url,
            timeout,
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A fetched response. HEAD responses carry an empty body.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl Page {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Turns anything but `200 OK` into [`ProbeError::UnexpectedStatus`].
    pub fn ensure_ok(self) -> ProbeResult<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ProbeError::UnexpectedStatus {
                url: self.url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Issues a single HTTP request.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> ProbeResult<Page>;
}

/// [`PageFetcher`] backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(max_body_bytes: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            max_body_bytes,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(2 * 1024 * 1024)
    }
}

fn classify(url: &Url, timeout: Duration, err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        ProbeError::transport(url.as_str(), err)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> ProbeResult<Page> {
        let mut builder = match request.method {
            FetchMethod::Get => self.client.get(request.url.clone()),
            FetchMethod::Head => self.client.head(request.url.clone()),
        };
        builder = builder.timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| classify(&request.url, request.timeout, e))?;

        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response.headers().clone();

        // Bodies are capped; a hostile target can stream forever.
        let mut body = Vec::new();
        if request.method == FetchMethod::Get {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| classify(&request.url, request.timeout, e))?
            {
                let room = self.max_body_bytes.saturating_sub(body.len());
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if body.len() >= self.max_body_bytes {
                    break;
                }
            }
        }

        Ok(Page {
            url,
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Converts a probe outcome into "signal present or absent", logging why
/// a probe came back empty.
pub(crate) fn into_signal(result: ProbeResult<Page>) -> Option<Page> {
    match result {
        Ok(page) => Some(page),
        Err(err) => {
            debug!("{}", err);
            None
        }
    }
}

/// Shared probing front end used by the detector, enumerators and registry.
pub struct Prober {
    fetcher: Arc<dyn PageFetcher>,
    concurrency: usize,
    signature_timeout: Duration,
    content_timeout: Duration,
    registry_timeout: Duration,
    deadline: Duration,
    user_agent: String,
}

impl Prober {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &Config) -> Self {
        Self {
            fetcher,
            concurrency: config.concurrency.max(1),
            signature_timeout: Duration::from_secs(config.timeouts.signature_secs),
            content_timeout: Duration::from_secs(config.timeouts.content_secs),
            registry_timeout: Duration::from_secs(config.timeouts.registry_secs),
            deadline: Duration::from_secs(config.scan_deadline_secs),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Overrides the overall deadline applied to each detection or
    /// enumeration pass.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Deadline for a pass starting now. Deadlines past what the clock
    /// can represent fall back to thirty years out.
    pub fn deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.deadline)
            .unwrap_or_else(|| now + FAR_FUTURE)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs one request under its own timeout.
    pub async fn fetch(&self, request: FetchRequest) -> ProbeResult<Page> {
        match tokio::time::timeout(request.timeout, self.fetcher.fetch(&request)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout {
                url: request.url.to_string(),
                timeout: request.timeout,
            }),
        }
    }

    /// Short-timeout existence check.
    pub async fn head(&self, url: Url) -> ProbeResult<Page> {
        self.fetch(FetchRequest::head(url, self.signature_timeout)).await
    }

    /// Content-bearing GET.
    pub async fn get(&self, url: Url) -> ProbeResult<Page> {
        self.fetch(FetchRequest::get(url, self.content_timeout)).await
    }

    /// Content GET with the short signature timeout, for small files.
    pub async fn get_small(&self, url: Url) -> ProbeResult<Page> {
        self.fetch(FetchRequest::get(url, self.signature_timeout)).await
    }

    /// Content GET presenting a realistic browser User-Agent.
    pub async fn get_as_browser(&self, url: Url) -> ProbeResult<Page> {
        let request = FetchRequest::get(url, self.content_timeout)
            .header("User-Agent", self.user_agent.as_str());
        self.fetch(request).await
    }

    /// GET against the plugin registry API.
    pub async fn get_registry(&self, url: Url) -> ProbeResult<Page> {
        self.fetch(FetchRequest::get(url, self.registry_timeout)).await
    }

    /// Runs `probe` over `items` on the bounded pool until `deadline`.
    ///
    /// Results come back in input order regardless of completion order.
    /// Probes still running at the deadline are dropped and everything
    /// already collected is returned.
    pub async fn probe_all<I, T, F, Fut>(&self, items: I, deadline: Instant, mut probe: F) -> Vec<T>
    where
        I: IntoIterator,
        I::IntoIter: Send,
        I::Item: Send,
        F: FnMut(I::Item) -> Fut + Send,
        Fut: Future<Output = Option<T>> + Send,
        T: Send,
    {
        let stop = tokio::time::sleep_until(deadline);

        let mut hits: Vec<(usize, T)> = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| {
                let fut = probe(item);
                async move { (index, fut.await) }
            })
            .buffer_unordered(self.concurrency)
            .take_until(stop)
            .filter_map(|(index, hit)| future::ready(hit.map(|h| (index, h))))
            .collect::<Vec<_>>()
            .boxed()
            .await;

        hits.sort_by_key(|(index, _)| *index);
        hits.into_iter().map(|(_, hit)| hit).collect()
    }
}
