//! Request ingredients: the closed set of things a request can be built from

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::body::Body;
use crate::error::{HttpResult, ReqError};

/// Boxed byte stream used for reader bodies and file contents
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

macro_rules! string_map {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name(BTreeMap<String, String>);

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Insert a pair, returning the value it replaced within this map
            pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
                self.0.insert(key.into(), value.into())
            }

            /// Builder-style insert
            pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
                self.insert(key, value);
                self
            }

            pub fn get(&self, key: &str) -> Option<&str> {
                self.0.get(key).map(String::as_str)
            }

            pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
                self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for $name {
            fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
                Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
            }
        }

        impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for $name {
            fn from(pairs: [(K, V); N]) -> Self {
                pairs.into_iter().collect()
            }
        }
    };
}

string_map!(
    /// Headers added to the request; a repeated key adds another value
    Header
);
string_map!(
    /// Form parameters: query string for GET, url-encoded or multipart body otherwise
    Param
);
string_map!(
    /// Parameters always appended to the URL, whatever the method
    QueryParam
);

/// Overrides the `Host` header of the outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host(pub String);

impl From<&str> for Host {
    fn from(host: &str) -> Self {
        Host(host.to_string())
    }
}

/// A request cookie, appended to the `Cookie` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub(crate) fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// A file to send as one part of a multipart body.
///
/// The upload pipeline takes ownership of `content` and drops it once the
/// whole stream has been copied.
pub struct FileUpload {
    /// Form field name; `fileN` is assigned when this is empty
    pub field_name: Option<String>,
    /// File name reported in the part header
    pub file_name: String,
    pub content: BodyReader,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, content: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            field_name: None,
            file_name: file_name.into(),
            content: Box::new(content),
        }
    }

    /// Set the form field name
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

/// One facet of a request.
///
/// A request is described by an unordered list of ingredients; see
/// [`HttpClient::execute`](crate::HttpClient::execute) for how each kind is
/// applied. Most variants have a `From` conversion, so lists are usually
/// built with the [`ingredients!`](crate::ingredients) macro.
pub enum Ingredient {
    /// Headers merged into the current header set
    Header(Header),
    /// Replaces the whole header set
    HeaderMap(http::HeaderMap),
    /// Body read from a stream
    Reader(BodyReader),
    /// Materialized body
    Body(Body),
    Param(Param),
    QueryParam(QueryParam),
    /// Transport used instead of the client's own connection pool
    Transport(reqwest::Client),
    File(FileUpload),
    Files(Vec<FileUpload>),
    Cookie(Cookie),
    Host(Host),
    /// Aborts assembly with this error before any I/O
    Error(ReqError),
}

impl Ingredient {
    /// Stream body ingredient
    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Ingredient::Reader(Box::new(reader))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Ingredient::Header(_) => "header",
            Ingredient::HeaderMap(_) => "header map",
            Ingredient::Reader(_) => "reader",
            Ingredient::Body(_) => "body",
            Ingredient::Param(_) => "param",
            Ingredient::QueryParam(_) => "query param",
            Ingredient::Transport(_) => "transport",
            Ingredient::File(_) => "file",
            Ingredient::Files(_) => "files",
            Ingredient::Cookie(_) => "cookie",
            Ingredient::Host(_) => "host",
            Ingredient::Error(_) => "error",
        }
    }
}

impl fmt::Debug for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ingredient::Header(h) => f.debug_tuple("Header").field(h).finish(),
            Ingredient::HeaderMap(h) => f.debug_tuple("HeaderMap").field(h).finish(),
            Ingredient::Reader(_) => f.write_str("Reader(..)"),
            Ingredient::Body(b) => f.debug_tuple("Body").field(b).finish(),
            Ingredient::Param(p) => f.debug_tuple("Param").field(p).finish(),
            Ingredient::QueryParam(q) => f.debug_tuple("QueryParam").field(q).finish(),
            Ingredient::Transport(_) => f.write_str("Transport(..)"),
            Ingredient::File(file) => f.debug_tuple("File").field(file).finish(),
            Ingredient::Files(files) => f.debug_tuple("Files").field(files).finish(),
            Ingredient::Cookie(c) => f.debug_tuple("Cookie").field(c).finish(),
            Ingredient::Host(h) => f.debug_tuple("Host").field(h).finish(),
            Ingredient::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

impl From<Header> for Ingredient {
    fn from(h: Header) -> Self {
        Ingredient::Header(h)
    }
}

impl From<http::HeaderMap> for Ingredient {
    fn from(h: http::HeaderMap) -> Self {
        Ingredient::HeaderMap(h)
    }
}

impl From<Body> for Ingredient {
    fn from(b: Body) -> Self {
        Ingredient::Body(b)
    }
}

impl From<&str> for Ingredient {
    fn from(s: &str) -> Self {
        Ingredient::Body(Body::raw(s.to_string()))
    }
}

impl From<String> for Ingredient {
    fn from(s: String) -> Self {
        Ingredient::Body(Body::raw(s))
    }
}

impl From<Vec<u8>> for Ingredient {
    fn from(data: Vec<u8>) -> Self {
        Ingredient::Body(Body::raw(data))
    }
}

impl From<&'static [u8]> for Ingredient {
    fn from(data: &'static [u8]) -> Self {
        Ingredient::Body(Body::raw(data))
    }
}

impl From<Bytes> for Ingredient {
    fn from(data: Bytes) -> Self {
        Ingredient::Body(Body::raw(data))
    }
}

impl From<Param> for Ingredient {
    fn from(p: Param) -> Self {
        Ingredient::Param(p)
    }
}

impl From<QueryParam> for Ingredient {
    fn from(q: QueryParam) -> Self {
        Ingredient::QueryParam(q)
    }
}

impl From<reqwest::Client> for Ingredient {
    fn from(client: reqwest::Client) -> Self {
        Ingredient::Transport(client)
    }
}

impl From<FileUpload> for Ingredient {
    fn from(f: FileUpload) -> Self {
        Ingredient::File(f)
    }
}

impl From<Vec<FileUpload>> for Ingredient {
    fn from(files: Vec<FileUpload>) -> Self {
        Ingredient::Files(files)
    }
}

impl From<Cookie> for Ingredient {
    fn from(c: Cookie) -> Self {
        Ingredient::Cookie(c)
    }
}

impl From<Host> for Ingredient {
    fn from(h: Host) -> Self {
        Ingredient::Host(h)
    }
}

impl From<ReqError> for Ingredient {
    fn from(e: ReqError) -> Self {
        Ingredient::Error(e)
    }
}

impl<T: Into<Ingredient>> From<HttpResult<T>> for Ingredient {
    fn from(result: HttpResult<T>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(e) => Ingredient::Error(e),
        }
    }
}

/// Build a `Vec<Ingredient>` from values of different ingredient types.
///
/// ```ignore
/// let ingredients = ingredients![
///     Header::from([("Accept", "application/json")]),
///     Param::from([("page", "1")]),
///     body_json(&payload),
/// ];
/// ```
#[macro_export]
macro_rules! ingredients {
    () => {
        ::std::vec::Vec::<$crate::Ingredient>::new()
    };
    ($($item:expr),+ $(,)?) => {
        ::std::vec![$($crate::Ingredient::from($item)),+]
    };
}

/// Expand glob patterns into file uploads.
///
/// Directories are skipped and each regular file is opened for streaming,
/// named after its base name. Fails when no pattern matched any path;
/// matching only directories yields an empty list.
pub fn files<I, S>(patterns: I) -> HttpResult<Vec<FileUpload>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut requested = Vec::new();
    let mut matches = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        requested.push(pattern.to_string());
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) => matches.push(path),
                Err(e) => tracing::debug!(error = %e, "Skipping unreadable glob match"),
            }
        }
    }
    if matches.is_empty() {
        return Err(ReqError::NoFilesMatched(requested));
    }

    let mut uploads = Vec::with_capacity(matches.len());
    for path in matches {
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            _ => continue,
        }
        let file = std::fs::File::open(&path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        uploads.push(FileUpload::new(file_name, tokio::fs::File::from_std(file)));
    }
    Ok(uploads)
}
