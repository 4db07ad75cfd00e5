//! Request/response wrapper returned by the executor

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use crate::error::{HttpResult, ReqError};
use crate::format::{render, DumpFormat, Snapshot};
use crate::request::OutgoingRequest;
use crate::response::ResponseHead;

/// One executed (or attempted) request together with what came back.
///
/// Textual responses (`Content-Type` absent or mentioning `xml`, `json` or
/// `text`) are buffered when the response arrives; anything else is left
/// unread so it can be streamed with [`Req::to_file`] or pulled in with
/// [`Req::buffer`].
///
/// `Display` renders a diagnostic dump: `{:+}` is the pretty form,
/// `{:-}` the single-line form and `{}` picks between them.
pub struct Req {
    pub(crate) request: OutgoingRequest,
    pub(crate) req_body: Option<Bytes>,
    pub(crate) response: Option<ResponseHead>,
    pub(crate) resp_body: Option<Bytes>,
    pub(crate) unread: Option<reqwest::Response>,
    pub(crate) cost: Duration,
    pub(crate) show_cost: bool,
    pub(crate) transport: Option<reqwest::Client>,
}

impl Req {
    pub(crate) fn new(request: OutgoingRequest, req_body: Option<Bytes>, show_cost: bool) -> Self {
        Self {
            request,
            req_body,
            response: None,
            resp_body: None,
            unread: None,
            cost: Duration::ZERO,
            show_cost,
            transport: None,
        }
    }

    /// The outbound request as assembled
    pub fn request(&self) -> &OutgoingRequest {
        &self.request
    }

    /// Response head, once one has been received
    pub fn response(&self) -> Option<&ResponseHead> {
        self.response.as_ref()
    }

    /// Buffered response body; empty when nothing was buffered
    pub fn bytes(&self) -> &[u8] {
        self.resp_body.as_deref().unwrap_or_default()
    }

    /// Buffered response body as text, invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.bytes())
    }

    pub fn is_buffered(&self) -> bool {
        self.resp_body.is_some()
    }

    /// Read a response left unread into memory and return the buffer
    pub async fn buffer(&mut self) -> HttpResult<&Bytes> {
        if let Some(response) = self.unread.take() {
            let data = response.bytes().await.map_err(ReqError::ResponseRead)?;
            self.resp_body = Some(data);
        }
        self.resp_body.as_ref().ok_or(ReqError::NoResponse)
    }

    /// Decode the buffered body as JSON
    pub fn to_json<T: DeserializeOwned>(&self) -> HttpResult<T> {
        serde_json::from_slice(self.bytes())
            .map_err(|e| ReqError::Decode(format!("Failed to deserialize JSON: {}", e)))
    }

    /// Decode the buffered body as XML
    pub fn to_xml<T: DeserializeOwned>(&self) -> HttpResult<T> {
        let text = std::str::from_utf8(self.bytes())
            .map_err(|e| ReqError::Decode(format!("Invalid UTF-8 in response: {}", e)))?;
        quick_xml::de::from_str(text)
            .map_err(|e| ReqError::Decode(format!("Failed to deserialize XML: {}", e)))
    }

    /// Write the response body to `path`, creating or truncating it.
    ///
    /// An unread body is streamed chunk by chunk and consumed; a buffered
    /// body is written as is. Returns the number of bytes written.
    pub async fn to_file(&mut self, path: impl AsRef<Path>) -> HttpResult<u64> {
        let path = path.as_ref();
        if let Some(mut response) = self.unread.take() {
            let mut file = tokio::fs::File::create(path).await?;
            let mut written = 0u64;
            while let Some(chunk) = response.chunk().await.map_err(ReqError::ResponseRead)? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            tracing::debug!(path = %path.display(), bytes = written, "Downloaded response body");
            return Ok(written);
        }

        match &self.resp_body {
            Some(data) => {
                tokio::fs::write(path, data).await?;
                Ok(data.len() as u64)
            }
            None => Err(ReqError::NoResponse),
        }
    }

    /// Time spent in the transport call
    pub fn cost(&self) -> Duration {
        self.cost
    }

    /// Request body as captured for diagnostics.
    ///
    /// This is the body itself when it was materialized, its first
    /// [`CAPTURE_LIMIT`](crate::CAPTURE_LIMIT) bytes when it came from a
    /// reader, and the redacted form for multipart uploads.
    pub fn request_body(&self) -> Option<&Bytes> {
        self.req_body.as_ref()
    }

    /// Transport override supplied as an ingredient, if any
    pub fn transport(&self) -> Option<&reqwest::Client> {
        self.transport.as_ref()
    }

    pub fn render(&self, format: DumpFormat) -> String {
        render(&self.snapshot(), format)
    }

    /// Pretty dump with request and response headers
    pub fn dump(&self) -> String {
        self.render(DumpFormat::Pretty)
    }

    pub(crate) fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            method: self.request.method().as_str(),
            url: self.request.url_str(),
            cost: self.show_cost.then_some(self.cost),
            request_headers: Some(self.request.headers()),
            request_body: self.req_body.as_deref().unwrap_or_default(),
            response: self.response.as_ref(),
            response_body: self.bytes(),
        }
    }
}

impl fmt::Debug for Req {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Req")
            .field("method", self.request.method())
            .field("url", &self.request.url_str())
            .field("status", &self.response.as_ref().map(ResponseHead::status))
            .field("buffered", &self.resp_body.as_ref().map(Bytes::len))
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
