//! ouroboros-req: ingredient-based HTTP requests
//!
//! A request is described as an unordered list of [`Ingredient`]s (headers,
//! form and query parameters, a body, file uploads, cookies, a host or
//! transport override) and assembled deterministically into one outbound
//! request. The result is a [`Req`] holding both sides of the exchange,
//! with buffered or streamed access to the response body and diagnostic
//! dumps through `Display`.
//!
//! # Architecture
//!
//! - `classify` / `resolve`: ingredient buckets and body precedence
//! - `multipart`: streaming uploads with a redacted copy for dumps
//! - `tee`: bounded capture of streamed request bodies
//! - `HttpClient`: connection-pooled executor
//! - `Req` / `ResponseHead`: response access and rendering
//!
//! ```ignore
//! use ouroboros_req::{body_json, ingredients, Header, QueryParam};
//!
//! let req = ouroboros_req::post(
//!     "https://api.example.com/items",
//!     ingredients![
//!         Header::from([("Authorization", "Bearer abc")]),
//!         QueryParam::from([("dry_run", "1")]),
//!         body_json(&serde_json::json!({"name": "widget"})),
//!     ],
//! )
//! .await?;
//! println!("{:+}", req);
//! ```

mod body;
mod classify;
mod client;
mod config;
mod error;
mod format;
mod ingredient;
mod multipart;
mod req;
mod request;
mod resolve;
mod response;
mod tee;

pub use body::{body_json, body_json_raw, body_xml, body_xml_raw, Body};
pub use client::{HttpClient, Prepared};
pub use config::HttpClientConfig;
pub use error::{ErrorCategory, ExecError, HttpResult, ReqError};
pub use format::DumpFormat;
pub use ingredient::{files, BodyReader, Cookie, FileUpload, Header, Host, Ingredient, Param, QueryParam};
pub use multipart::PLACEHOLDER;
pub use req::Req;
pub use request::OutgoingRequest;
pub use response::ResponseHead;
pub use tee::{TeeReader, CAPTURE_LIMIT};

pub use http::Method;

/// Execute a request with the shared default client
pub async fn execute<I>(method: Method, url: &str, ingredients: I) -> Result<Req, ExecError>
where
    I: IntoIterator<Item = Ingredient>,
{
    HttpClient::shared()?.execute(method, url, ingredients).await
}

/// Send a GET request with the shared default client
pub async fn get<I>(url: &str, ingredients: I) -> Result<Req, ExecError>
where
    I: IntoIterator<Item = Ingredient>,
{
    execute(Method::GET, url, ingredients).await
}

/// Send a POST request with the shared default client
pub async fn post<I>(url: &str, ingredients: I) -> Result<Req, ExecError>
where
    I: IntoIterator<Item = Ingredient>,
{
    execute(Method::POST, url, ingredients).await
}

/// Send a PUT request with the shared default client
pub async fn put<I>(url: &str, ingredients: I) -> Result<Req, ExecError>
where
    I: IntoIterator<Item = Ingredient>,
{
    execute(Method::PUT, url, ingredients).await
}

/// Send a PATCH request with the shared default client
pub async fn patch<I>(url: &str, ingredients: I) -> Result<Req, ExecError>
where
    I: IntoIterator<Item = Ingredient>,
{
    execute(Method::PATCH, url, ingredients).await
}

/// Send a DELETE request with the shared default client
pub async fn delete<I>(url: &str, ingredients: I) -> Result<Req, ExecError>
where
    I: IntoIterator<Item = Ingredient>,
{
    execute(Method::DELETE, url, ingredients).await
}

/// Send a HEAD request with the shared default client
pub async fn head<I>(url: &str, ingredients: I) -> Result<Req, ExecError>
where
    I: IntoIterator<Item = Ingredient>,
{
    execute(Method::HEAD, url, ingredients).await
}

/// Send an OPTIONS request with the shared default client
pub async fn options<I>(url: &str, ingredients: I) -> Result<Req, ExecError>
where
    I: IntoIterator<Item = Ingredient>,
{
    execute(Method::OPTIONS, url, ingredients).await
}
