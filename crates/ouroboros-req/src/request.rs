//! The assembled outbound request

use bytes::Bytes;
use http::{HeaderMap, Method};
use url::Url;

/// Body of an assembled request
#[derive(Debug)]
pub(crate) enum OutgoingBody {
    Empty,
    Full(Bytes),
    /// Multipart pipe; taken when the request is handed to the transport
    Stream(Option<reqwest::Body>),
}

/// A fully assembled request, ready for the transport.
///
/// Materialized bodies stay inspectable after sending; a streamed
/// multipart body is consumed by the transport.
#[derive(Debug)]
pub struct OutgoingRequest {
    pub(crate) method: Method,
    pub(crate) raw_url: String,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: OutgoingBody,
}

impl OutgoingRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Parsed target URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Target URL exactly as assembled, before normalization by the parser
    pub fn url_str(&self) -> &str {
        &self.raw_url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Materialized body bytes; `None` for empty and streamed bodies
    pub fn body(&self) -> Option<&Bytes> {
        match &self.body {
            OutgoingBody::Full(data) => Some(data),
            _ => None,
        }
    }

    /// Whether the body is produced by the multipart pipeline
    pub fn is_streaming(&self) -> bool {
        matches!(self.body, OutgoingBody::Stream(_))
    }

    /// Build the transport request, moving a streamed body out of `self`
    pub(crate) fn to_reqwest(&mut self) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        match &mut self.body {
            OutgoingBody::Empty => {}
            OutgoingBody::Full(data) => *request.body_mut() = Some(reqwest::Body::from(data.clone())),
            OutgoingBody::Stream(stream) => *request.body_mut() = stream.take(),
        }
        request
    }
}
