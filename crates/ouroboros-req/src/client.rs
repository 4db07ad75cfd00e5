//! HTTP client: assembles ingredient lists and executes them

use std::io;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use bytes::Bytes;
use http::Method;
use regex::Regex;
use tokio::task::JoinHandle;

use crate::config::HttpClientConfig;
use crate::error::{ExecError, HttpResult, ReqError};
use crate::ingredient::Ingredient;
use crate::req::Req;
use crate::request::OutgoingRequest;
use crate::resolve::assemble;
use crate::response::ResponseHead;

/// Async HTTP client with connection pooling that builds requests from
/// ingredient lists
///
/// # Example
///
/// ```ignore
/// use ouroboros_req::{ingredients, HttpClient, HttpClientConfig, Param};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HttpClient::new(HttpClientConfig::new().show_cost(true))?;
///
///     let req = client
///         .get("https://api.example.com/users", ingredients![Param::from([("page", "1")])])
///         .await?;
///     println!("{}", req);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

struct HttpClientInner {
    client: reqwest::Client,
    config: HttpClientConfig,
}

/// A request assembled by [`HttpClient::prepare`] and not yet sent.
///
/// Dropping it before sending cancels a pending multipart upload.
pub struct Prepared {
    req: Req,
    upload: Option<PendingUpload>,
}

/// Multipart producer handle; aborts the task when dropped
struct PendingUpload {
    handle: Option<JoinHandle<io::Result<Bytes>>>,
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("Cancelling unsent multipart upload");
            handle.abort();
        }
    }
}

impl Prepared {
    pub fn request(&self) -> &OutgoingRequest {
        self.req.request()
    }

    /// Request body as it will appear in dumps; for multipart uploads this
    /// is only known after sending
    pub fn request_body(&self) -> Option<&Bytes> {
        self.req.request_body()
    }
}

impl std::fmt::Debug for Prepared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prepared")
            .field("request", self.req.request())
            .field("upload", &self.upload.is_some())
            .finish()
    }
}

fn textual_content_type() -> &'static Regex {
    static TEXTUAL: OnceLock<Regex> = OnceLock::new();
    TEXTUAL.get_or_init(|| Regex::new("xml|json|text").expect("valid regex"))
}

/// Whether a response with this `Content-Type` is read into memory
pub(crate) fn should_buffer(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => ct.is_empty() || textual_content_type().is_match(ct),
    }
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> HttpResult<Self> {
        let client = config.build_transport()?;
        Ok(Self {
            inner: Arc::new(HttpClientInner { client, config }),
        })
    }

    /// Create a client with default configuration
    pub fn default_client() -> HttpResult<Self> {
        Self::new(HttpClientConfig::default())
    }

    /// Process-wide client with default configuration, built on first use
    pub fn shared() -> HttpResult<&'static HttpClient> {
        static SHARED: OnceLock<HttpClient> = OnceLock::new();
        if let Some(client) = SHARED.get() {
            return Ok(client);
        }
        let client = Self::default_client()?;
        Ok(SHARED.get_or_init(|| client))
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }

    /// Assemble a request without sending it.
    ///
    /// All ingredient validation happens here: an empty URL, conflicting
    /// bodies, bad headers or an error ingredient fail before any network
    /// I/O. Reader bodies are drained now; a multipart upload starts
    /// streaming in the background and is paced by the transport.
    pub async fn prepare<I>(&self, method: Method, url: &str, ingredients: I) -> HttpResult<Prepared>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        let assembled = assemble(method, url, ingredients).await?;
        let mut req = Req::new(
            assembled.request,
            assembled.captured,
            self.inner.config.show_cost,
        );
        req.transport = assembled.transport;
        Ok(Prepared {
            req,
            upload: assembled.upload.map(|handle| PendingUpload {
                handle: Some(handle),
            }),
        })
    }

    /// Send a prepared request.
    ///
    /// Failures after assembly keep the [`Req`] in the returned error, with
    /// elapsed time and request diagnostics filled in.
    pub async fn send(&self, prepared: Prepared) -> Result<Req, ExecError> {
        let Prepared { mut req, mut upload } = prepared;
        let transport = req
            .transport
            .clone()
            .unwrap_or_else(|| self.inner.client.clone());
        let request = req.request.to_reqwest();

        let start = Instant::now();
        let result = transport.execute(request).await;
        req.cost = start.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                drop(upload);
                let error = ReqError::Transport(e);
                tracing::warn!(
                    method = %req.request.method(),
                    category = ?error.category(),
                    elapsed_ms = req.cost.as_millis() as u64,
                    error = %error.sanitized_message(),
                    "Request failed"
                );
                return Err(ExecError::new(error, Some(req)));
            }
        };
        req.response = Some(ResponseHead::from_reqwest(&response));

        if let Some(handle) = upload.as_mut().and_then(|u| u.handle.as_mut()) {
            if let Err(error) = self.finish_upload(&mut req, handle).await {
                tracing::warn!(
                    method = %req.request.method(),
                    error = %error.sanitized_message(),
                    "Multipart upload failed"
                );
                req.unread = Some(response);
                return Err(ExecError::new(error, Some(req)));
            }
        }

        if should_buffer(req.response.as_ref().and_then(ResponseHead::content_type)) {
            match response.bytes().await {
                Ok(data) => req.resp_body = Some(data),
                Err(e) => {
                    let error = ReqError::ResponseRead(e);
                    tracing::warn!(error = %error.sanitized_message(), "Reading response body failed");
                    return Err(ExecError::new(error, Some(req)));
                }
            }
        } else {
            req.unread = Some(response);
        }

        tracing::debug!(
            method = %req.request.method(),
            status = req.response.as_ref().map(ResponseHead::status_code),
            elapsed_ms = req.cost.as_millis() as u64,
            buffered = req.resp_body.is_some(),
            "Request completed"
        );
        if self.inner.config.debug {
            tracing::info!("{}", req.dump());
        }
        Ok(req)
    }

    /// Wait for the multipart producer and keep its redacted snapshot.
    ///
    /// Bounded by the client timeout, since a peer that answers without
    /// reading the body can leave the producer blocked on the pipe.
    async fn finish_upload(
        &self,
        req: &mut Req,
        upload: &mut JoinHandle<io::Result<Bytes>>,
    ) -> HttpResult<()> {
        match tokio::time::timeout(self.inner.config.timeout, &mut *upload).await {
            Ok(Ok(Ok(snapshot))) => {
                req.req_body = Some(snapshot);
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(ReqError::Upload(e)),
            Ok(Err(join)) => Err(ReqError::Upload(io::Error::other(join))),
            Err(_) => {
                upload.abort();
                Err(ReqError::Upload(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "multipart producer did not finish",
                )))
            }
        }
    }

    /// Assemble and send in one step
    pub async fn execute<I>(&self, method: Method, url: &str, ingredients: I) -> Result<Req, ExecError>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        let prepared = self.prepare(method, url, ingredients).await?;
        self.send(prepared).await
    }

    // Convenience methods for common HTTP methods

    /// Send a GET request
    pub async fn get<I>(&self, url: &str, ingredients: I) -> Result<Req, ExecError>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        self.execute(Method::GET, url, ingredients).await
    }

    /// Send a POST request
    pub async fn post<I>(&self, url: &str, ingredients: I) -> Result<Req, ExecError>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        self.execute(Method::POST, url, ingredients).await
    }

    /// Send a PUT request
    pub async fn put<I>(&self, url: &str, ingredients: I) -> Result<Req, ExecError>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        self.execute(Method::PUT, url, ingredients).await
    }

    /// Send a PATCH request
    pub async fn patch<I>(&self, url: &str, ingredients: I) -> Result<Req, ExecError>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        self.execute(Method::PATCH, url, ingredients).await
    }

    /// Send a DELETE request
    pub async fn delete<I>(&self, url: &str, ingredients: I) -> Result<Req, ExecError>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        self.execute(Method::DELETE, url, ingredients).await
    }

    /// Send a HEAD request
    pub async fn head<I>(&self, url: &str, ingredients: I) -> Result<Req, ExecError>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        self.execute(Method::HEAD, url, ingredients).await
    }

    /// Send an OPTIONS request
    pub async fn options<I>(&self, url: &str, ingredients: I) -> Result<Req, ExecError>
    where
        I: IntoIterator<Item = Ingredient>,
    {
        self.execute(Method::OPTIONS, url, ingredients).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.inner.config.timeout)
            .field("debug", &self.inner.config.debug)
            .finish()
    }
}
