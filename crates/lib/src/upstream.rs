//! Upstream transport: one POST per forwarded event, body delivered as a stream of events.
//!
//! [`Upstream`] is the seam between the forwarder and the network. [`HttpUpstream`] is the
//! reqwest implementation; tests substitute scripted transports.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

/// Content type declared on every forwarded request.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// One event from the upstream response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyEvent {
    /// A chunk of body bytes, in arrival order.
    Data(Vec<u8>),
    /// The response stream broke after the connection was established.
    Error(String),
    /// The response stream finished.
    End,
}

/// Response body as a stream of [`BodyEvent`]s.
pub type BodyStream = BoxStream<'static, BodyEvent>;

/// The request issued to the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub url: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    pub fn json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            content_type: JSON_CONTENT_TYPE,
            body,
        }
    }

    /// Exact byte length of the body, sent as Content-Length.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Failure before any response body was available.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{0}")]
    Connect(String),
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),
}

/// Transport that sends one request and yields the response body as events.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send the request. `Err` means no reply channel was obtained (connect or write failed).
    async fn post(&self, request: OutboundRequest) -> Result<BodyStream, UpstreamError>;
}

/// Upstream over HTTPS using reqwest.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl Default for HttpUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpUpstream {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn post(&self, request: OutboundRequest) -> Result<BodyStream, UpstreamError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{}: {}", request.url, e)))?;
        let content_length = request.content_length();
        let res = self
            .client
            .post(url)
            .header(CONTENT_TYPE, request.content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(request.body)
            .send()
            .await
            .map_err(|e| UpstreamError::Connect(e.to_string()))?;
        log::debug!(
            "upstream replied {} to POST {} ({} bytes sent)",
            res.status(),
            request.url,
            content_length
        );
        let body = res.bytes_stream().map(|chunk| match chunk {
            Ok(bytes) => BodyEvent::Data(bytes.to_vec()),
            Err(e) => BodyEvent::Error(e.to_string()),
        });
        Ok(body.chain(stream::once(async { BodyEvent::End })).boxed())
    }
}

/// Body stream from a fixed list of events (tests and local replays).
pub fn scripted_body(events: Vec<BodyEvent>) -> BodyStream {
    stream::iter(events).boxed()
}
