use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

use crate::session::{cookie_header, AttemptOutcome, PageSession, SessionError};

/// Desktop Chrome User-Agent sent on every attempt.
pub const DESKTOP_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36";

/// Baseline headers shared by all strategies, tuned to the binary
/// media types a fact sheet is served as.
pub static BASELINE_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/pdf,application/octet-stream"),
    );
    headers
});

/// One pipeline invocation's worth of request state: the target URL,
/// the baseline headers, and the page capabilities to fetch through.
pub struct FetchRequest<'a> {
    pub url: &'a Url,
    pub headers: &'a HeaderMap,
    pub session: &'a dyn PageSession,
}

/// A self-contained retrieval attempt with its own header/context
/// profile. Strategies are attempted exactly once each, in chain
/// order, by the pipeline.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, request: &FetchRequest<'_>) -> Result<AttemptOutcome, SessionError>;
}

/// The fixed strategy chain, least to most privileged. Order matters:
/// each later strategy is more likely to succeed but touches more
/// session state.
pub fn default_chain() -> Vec<Box<dyn FetchStrategy>> {
    vec![
        Box::new(DirectFetch),
        Box::new(ContextualFetch),
        Box::new(InContextFetch),
    ]
}

/// Strategy 1: out-of-band GET with baseline headers only.
pub struct DirectFetch;

#[async_trait]
impl FetchStrategy for DirectFetch {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn attempt(&self, request: &FetchRequest<'_>) -> Result<AttemptOutcome, SessionError> {
        request
            .session
            .request(request.url, request.headers.clone())
            .await
    }
}

/// Strategy 2: out-of-band GET carrying the workflow origin as the
/// `Referer` plus the browsing context's cookies.
pub struct ContextualFetch;

#[async_trait]
impl FetchStrategy for ContextualFetch {
    fn name(&self) -> &'static str {
        "contextual"
    }

    async fn attempt(&self, request: &FetchRequest<'_>) -> Result<AttemptOutcome, SessionError> {
        let cookies = request.session.cookies().await?;

        let mut headers = request.headers.clone();
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(request.session.origin_url().as_str())?,
        );
        if let Some(value) = cookie_header(&cookies) {
            headers.insert(header::COOKIE, HeaderValue::from_str(&value)?);
        }

        request.session.request(request.url, headers).await
    }
}

/// Strategy 3: fetch from inside the document's own execution
/// environment, inheriting its ambient credentials.
pub struct InContextFetch;

#[async_trait]
impl FetchStrategy for InContextFetch {
    fn name(&self) -> &'static str {
        "in-context"
    }

    async fn attempt(&self, request: &FetchRequest<'_>) -> Result<AttemptOutcome, SessionError> {
        request
            .session
            .in_context_fetch(request.url, request.headers.clone())
            .await
    }
}
