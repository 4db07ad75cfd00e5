//! Error types for request assembly and execution

use crate::req::Req;
use thiserror::Error;

/// Errors raised while assembling, sending or reading a request
#[derive(Error, Debug)]
pub enum ReqError {
    /// The URL argument was empty
    #[error("req: url not specified")]
    MissingUrl,

    /// The assembled URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// More than one ingredient tried to become the request body
    #[error("req: can not set both {existing} and {incoming} as the request body")]
    ConflictingBody {
        existing: &'static str,
        incoming: &'static str,
    },

    /// None of the glob patterns matched anything
    #[error("req: no file matched patterns {0:?}")]
    NoFilesMatched(Vec<String>),

    /// Malformed glob pattern
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Header name or value rejected by the `http` crate
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A body codec failed to encode its value
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A buffered response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Local I/O failure (reading a body stream, opening or writing a file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport failed before a response was received
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response arrived but its body could not be read
    #[error("Response error: {0}")]
    ResponseRead(#[source] reqwest::Error),

    /// The multipart producer failed while streaming the request body
    #[error("Upload error: {0}")]
    Upload(#[source] std::io::Error),

    /// An operation needed a response that does not exist
    #[error("req: no response available")]
    NoResponse,

    /// Caller-supplied error carried through the ingredient list
    #[error("{0}")]
    Other(String),
}

impl ReqError {
    /// Build a caller-defined error, typically to pass as an ingredient
    pub fn other(message: impl Into<String>) -> Self {
        ReqError::Other(message.into())
    }

    /// Categorize the error for reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReqError::MissingUrl
            | ReqError::InvalidUrl(_)
            | ReqError::ConflictingBody { .. }
            | ReqError::NoFilesMatched(_)
            | ReqError::Pattern(_)
            | ReqError::InvalidHeader(_)
            | ReqError::Other(_) => ErrorCategory::Input,
            ReqError::Serialization(_) => ErrorCategory::Serialization,
            ReqError::Decode(_) | ReqError::ResponseRead(_) | ReqError::NoResponse => {
                ErrorCategory::Response
            }
            ReqError::Io(_) => ErrorCategory::Input,
            ReqError::Upload(_) => ErrorCategory::Upload,
            ReqError::Transport(e) => {
                if e.is_connect() {
                    ErrorCategory::Connection
                } else if e.is_timeout() {
                    ErrorCategory::Timeout
                } else {
                    ErrorCategory::Transport
                }
            }
        }
    }

    /// Sanitize error message (remove sensitive info like credentials, internal IPs)
    pub fn sanitized_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Result type for request operations
pub type HttpResult<T> = Result<T, ReqError>;

/// Error category for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any network I/O
    Input,
    /// A body codec failed
    Serialization,
    /// DNS, TCP or TLS failure
    Connection,
    /// Transport timeout
    Timeout,
    /// Other transport failure
    Transport,
    /// Reading or decoding the response failed
    Response,
    /// The multipart producer failed
    Upload,
}

/// Failure of [`HttpClient::send`](crate::HttpClient::send).
///
/// Carries the partially populated [`Req`] when one exists, so elapsed time,
/// the captured request body and any received response head stay available
/// for diagnostics.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ExecError {
    #[source]
    error: ReqError,
    req: Option<Box<Req>>,
}

impl ExecError {
    pub(crate) fn new(error: ReqError, req: Option<Req>) -> Self {
        Self {
            error,
            req: req.map(Box::new),
        }
    }

    /// The underlying error
    pub fn error(&self) -> &ReqError {
        &self.error
    }

    /// The partially populated request wrapper, if assembly got that far
    pub fn req(&self) -> Option<&Req> {
        self.req.as_deref()
    }

    /// Split into the error and the wrapper
    pub fn into_parts(self) -> (ReqError, Option<Req>) {
        (self.error, self.req.map(|r| *r))
    }
}

impl From<ReqError> for ExecError {
    fn from(error: ReqError) -> Self {
        Self::new(error, None)
    }
}

/// Sanitize error messages by removing sensitive information
fn sanitize_error_message(msg: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static URL_CREDS_RE: OnceLock<Regex> = OnceLock::new();
    static INTERNAL_IP_RE: OnceLock<Regex> = OnceLock::new();
    static AUTH_HEADER_RE: OnceLock<Regex> = OnceLock::new();

    let url_creds_re = URL_CREDS_RE
        .get_or_init(|| Regex::new(r"(https?)://[^@/\s:]+:[^@/\s]+@").expect("valid regex"));
    let internal_ip_re = INTERNAL_IP_RE.get_or_init(|| {
        Regex::new(r"\b(10\.|172\.(1[6-9]|2[0-9]|3[01])\.|192\.168\.)\d+\.\d+\b")
            .expect("valid regex")
    });
    let auth_header_re = AUTH_HEADER_RE.get_or_init(|| {
        Regex::new(r"(?i)(bearer|api[_-]?key|token)\s*[:=]?\s*[^\s&]+").expect("valid regex")
    });

    let sanitized = url_creds_re.replace_all(msg, "$1://[REDACTED]@");
    let sanitized = internal_ip_re.replace_all(&sanitized, "[INTERNAL_IP]");
    let sanitized = auth_header_re.replace_all(&sanitized, "$1 [REDACTED]");

    sanitized.to_string()
}
