use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] header::InvalidHeaderValue),

    #[error("in-context payload could not be decoded: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("malformed cookie pair (expected name=value): {0}")]
    CookiePair(String),
}

/// A cookie as read from the browsing context. The pipeline only ever
/// reads cookies; it never writes them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl FromStr for Cookie {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| SessionError::CookiePair(s.to_string()))?;
        if name.trim().is_empty() {
            return Err(SessionError::CookiePair(s.to_string()));
        }
        Ok(Self {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        })
    }
}

/// Serializes cookies into a single `name=value; ...` header value.
/// Returns None when there are no cookies to send.
pub(crate) fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Outcome of a single retrieval attempt. `status` is the HTTP status,
/// or 0 when the attempt never reached the network.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub ok: bool,
    pub status: u16,
    pub bytes: Option<Vec<u8>>,
}

impl AttemptOutcome {
    pub fn success(status: u16, bytes: Vec<u8>) -> Self {
        Self {
            ok: true,
            status,
            bytes: Some(bytes),
        }
    }

    pub fn failure(status: u16) -> Self {
        Self {
            ok: false,
            status,
            bytes: None,
        }
    }

    /// The payload, if this attempt succeeded with a non-empty body.
    pub fn accepted_bytes(&self) -> Option<&[u8]> {
        if !self.ok {
            return None;
        }
        self.bytes.as_deref().filter(|b| !b.is_empty())
    }
}

/// Wire form of an in-context fetch result. The document's execution
/// environment cannot hand binary buffers back to the orchestrating
/// process, so the payload crosses the boundary as plain JSON with the
/// body serialized as a numeric array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InContextFetchResult {
    pub ok: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
}

impl InContextFetchResult {
    pub fn into_outcome(self) -> AttemptOutcome {
        AttemptOutcome {
            ok: self.ok,
            status: self.status,
            bytes: self.bytes,
        }
    }
}

/// Reconstructs an attempt outcome from the JSON payload returned by an
/// in-context fetch script.
pub(crate) fn decode_in_context_payload(
    value: serde_json::Value,
) -> Result<AttemptOutcome, SessionError> {
    let result: InContextFetchResult = serde_json::from_value(value)?;
    Ok(result.into_outcome())
}

/// Capabilities of a loaded document-bearing page that the retrieval
/// pipeline relies on. The navigation layer that produced the page is
/// out of scope; this trait is its entire surface here.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// URL the page is currently on; expected to point at the document.
    fn document_url(&self) -> &Url;

    /// Origin URL of the workflow, used as the `Referer` on the
    /// contextual attempt.
    fn origin_url(&self) -> &Url;

    /// Snapshot of the cookies held by the browsing context.
    async fn cookies(&self) -> Result<Vec<Cookie>, SessionError>;

    /// Issues an out-of-band GET with exactly the given headers. A
    /// non-2xx response is reported as a failed outcome, not an error.
    async fn request(&self, url: &Url, headers: HeaderMap)
        -> Result<AttemptOutcome, SessionError>;

    /// Issues a GET from inside the document's own execution
    /// environment, carrying its ambient session credentials. Transport
    /// failures inside that environment surface as a status-0 outcome
    /// rather than an error, since the script cannot raise across the
    /// boundary.
    async fn in_context_fetch(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> Result<AttemptOutcome, SessionError>;
}

/// `PageSession` over plain HTTP: one client without ambient state for
/// out-of-band requests, and one with a live cookie store emulating the
/// document environment's ambient credentials. Cookies captured by the
/// navigation layer are injected at construction.
pub struct HttpSession {
    client: Client,
    ambient: Client,
    document_url: Url,
    origin_url: Url,
    cookies: Vec<Cookie>,
}

impl HttpSession {
    pub fn new(document_url: Url, origin_url: Url, cookies: Vec<Cookie>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        let ambient = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            ambient,
            document_url,
            origin_url,
            cookies,
        }
    }
}

#[async_trait]
impl PageSession for HttpSession {
    fn document_url(&self) -> &Url {
        &self.document_url
    }

    fn origin_url(&self) -> &Url {
        &self.origin_url
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, SessionError> {
        Ok(self.cookies.clone())
    }

    async fn request(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> Result<AttemptOutcome, SessionError> {
        let response = self.client.get(url.as_str()).headers(headers).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Ok(AttemptOutcome::failure(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        Ok(AttemptOutcome::success(status.as_u16(), bytes.to_vec()))
    }

    async fn in_context_fetch(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> Result<AttemptOutcome, SessionError> {
        let mut headers = headers;
        if let Some(value) = cookie_header(&self.cookies) {
            headers.insert(header::COOKIE, HeaderValue::from_str(&value)?);
        }

        let result = match self.ambient.get(url.as_str()).headers(headers).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if response.status().is_success() {
                    match response.bytes().await {
                        Ok(bytes) => InContextFetchResult {
                            ok: true,
                            status,
                            bytes: Some(bytes.to_vec()),
                        },
                        Err(_) => InContextFetchResult {
                            ok: false,
                            status: 0,
                            bytes: None,
                        },
                    }
                } else {
                    InContextFetchResult {
                        ok: false,
                        status,
                        bytes: None,
                    }
                }
            }
            // The in-context environment reports transport failures as
            // status 0 instead of raising across the boundary.
            Err(_) => InContextFetchResult {
                ok: false,
                status: 0,
                bytes: None,
            },
        };

        // Round-trip through the wire format the script boundary uses.
        let payload = serde_json::to_value(&result)?;
        decode_in_context_payload(payload)
    }
}
