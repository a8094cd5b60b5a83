// Raw GET plumbing. No retry logic lives here; the retry loop decides what a
// status code means.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("no response configured for {0}")]
    Unrouted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn raw_get(&self, url: &str) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport used by the binary.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        // Coinbase rejects requests without a User-Agent
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn raw_get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let http_err = |source| TransportError::Http { url: url.to_owned(), source };
        let resp = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(http_err)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(http_err)?;
        debug!(url, status, bytes = body.len(), "GET complete");
        Ok(RawResponse { status, body: body.to_vec() })
    }
}

/// Serves canned responses per URL. Each URL holds a queue; the last entry
/// keeps being served once the queue is down to one.
#[derive(Debug, Default)]
pub struct StaticTransport {
    routes: Mutex<HashMap<String, VecDeque<RawResponse>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(
        self,
        url: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.routes.lock().entry(url.into()).or_default().push_back(RawResponse::new(status, body));
        self
    }

    pub fn with_sequence(self, url: impl Into<String>, responses: Vec<RawResponse>) -> Self {
        self.routes.lock().entry(url.into()).or_default().extend(responses);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Transport for StaticTransport {
    async fn raw_get(&self, url: &str) -> Result<RawResponse, TransportError> {
        *self.calls.lock().entry(url.to_owned()).or_default() += 1;
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(url).ok_or_else(|| TransportError::Unrouted(url.to_owned()))?;
        let resp = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
        resp.ok_or_else(|| TransportError::Unrouted(url.to_owned()))
    }
}
