//! Response head captured from the transport

use http::{HeaderMap, StatusCode, Version};
use url::Url;

/// Status line, headers and final URL of a received response.
///
/// The body is kept separately by [`Req`](crate::Req), either buffered or
/// still unread.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    /// Final URL (may differ from request URL due to redirects)
    url: Url,
}

impl ResponseHead {
    pub fn new(status: StatusCode, version: Version, headers: HeaderMap, url: Url) -> Self {
        Self {
            status,
            version,
            headers,
            url,
        }
    }

    pub(crate) fn from_reqwest(response: &reqwest::Response) -> Self {
        Self::new(
            response.status(),
            response.version(),
            response.headers().clone(),
            response.url().clone(),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if status is client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Check if status is server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Check if status is redirect (3xx)
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Get a header value; lookup is case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Check if content type is JSON
    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false)
    }

    /// `HTTP/1.1 200 OK` style status line
    pub fn status_line(&self) -> String {
        format!(
            "{:?} {} {}",
            self.version,
            self.status.as_str(),
            self.status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn head(status: u16, content_type: Option<&str>) -> ResponseHead {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert("content-type", HeaderValue::from_str(ct).unwrap());
        }
        ResponseHead::new(
            StatusCode::from_u16(status).unwrap(),
            Version::HTTP_11,
            headers,
            Url::parse("http://example.com/").unwrap(),
        )
    }

    #[test]
    fn test_response_status_checks() {
        let response = head(200, None);
        assert!(response.is_success());
        assert!(!response.is_client_error());

        let response = head(404, None);
        assert!(!response.is_success());
        assert!(response.is_client_error());

        assert!(head(500, None).is_server_error());
        assert!(head(302, None).is_redirect());
    }

    #[test]
    fn test_response_header_case_insensitive() {
        let response = head(200, Some("application/json"));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_response_is_json() {
        assert!(head(200, Some("application/json; charset=utf-8")).is_json());
        assert!(!head(200, Some("text/html")).is_json());
    }

    #[test]
    fn test_status_line() {
        assert_eq!(head(200, None).status_line(), "HTTP/1.1 200 OK");
        assert_eq!(head(599, None).status_line(), "HTTP/1.1 599");
    }
}
