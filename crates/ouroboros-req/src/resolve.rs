//! Turn classified ingredients into one outbound request

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE, HOST};
use http::Method;
use tokio::task::JoinHandle;
use url::Url;

use crate::body::FORM_CONTENT_TYPE;
use crate::classify::{classify, BodySource, Buckets};
use crate::error::{HttpResult, ReqError};
use crate::ingredient::{Cookie, Ingredient};
use crate::multipart::spawn_upload;
use crate::request::{OutgoingBody, OutgoingRequest};
use crate::tee;

const MULTIPART: &str = "multipart upload";
const FORM: &str = "form params";

/// Output of assembly: the request plus everything the executor needs
/// alongside it
pub(crate) struct Assembled {
    pub request: OutgoingRequest,
    /// Request body as shown in dumps
    pub captured: Option<Bytes>,
    pub transport: Option<reqwest::Client>,
    /// Multipart producer; resolves to the redacted snapshot
    pub upload: Option<JoinHandle<std::io::Result<Bytes>>>,
}

/// Build the outbound request for `method` and `url` from `ingredients`.
///
/// Every input error is returned before any network I/O. A reader body is
/// drained here, and a multipart producer is started only once everything
/// else has been validated.
pub(crate) async fn assemble(
    method: Method,
    url: &str,
    ingredients: impl IntoIterator<Item = Ingredient>,
) -> HttpResult<Assembled> {
    if url.is_empty() {
        return Err(ReqError::MissingUrl);
    }

    let Buckets {
        mut headers,
        params,
        query,
        files,
        bodies,
        transport,
        cookies,
        host,
    } = classify(ingredients)?;

    let mut body = OutgoingBody::Empty;
    let mut source: Option<&'static str> = None;
    let mut content_type: Option<String> = None;
    let mut captured: Option<Bytes> = None;

    for incoming in bodies {
        if let Some(existing) = source {
            return Err(ReqError::ConflictingBody {
                existing,
                incoming: incoming.label(),
            });
        }
        source = Some(incoming.label());
        match incoming {
            BodySource::Value(value) => {
                let (value_type, data) = value.into_parts();
                content_type = value_type;
                captured = Some(data.clone());
                body = OutgoingBody::Full(data);
            }
            BodySource::Reader(reader) => {
                let (full, prefix) = tee::drain(reader).await?;
                captured = Some(prefix);
                body = OutgoingBody::Full(full);
            }
        }
    }

    let fields = merge_sorted(params.iter().flat_map(|p| p.iter()));
    let multipart = if files.is_empty() {
        false
    } else if accepts_files(&method) {
        if let Some(existing) = source {
            return Err(ReqError::ConflictingBody {
                existing,
                incoming: MULTIPART,
            });
        }
        true
    } else {
        tracing::warn!(
            method = %method,
            files = files.len(),
            "File uploads are only sent with POST or PUT, dropping them"
        );
        false
    };

    let mut raw_url = url.to_string();
    if !multipart && !fields.is_empty() {
        if method == Method::GET {
            append_query(&mut raw_url, &encode(&fields));
        } else {
            if let Some(existing) = source {
                return Err(ReqError::ConflictingBody {
                    existing,
                    incoming: FORM,
                });
            }
            let data = Bytes::from(encode(&fields));
            content_type = Some(FORM_CONTENT_TYPE.to_string());
            captured = Some(data.clone());
            body = OutgoingBody::Full(data);
        }
    }

    let query = merge_sorted(query.iter().flat_map(|q| q.iter()));
    if !query.is_empty() {
        append_query(&mut raw_url, &encode(&query));
    }
    let parsed = Url::parse(&raw_url)?;

    if let Some(content_type) = content_type {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, header_value(&content_type)?);
        }
    }
    apply_cookies(&mut headers, &cookies)?;
    if let Some(host) = host {
        headers.insert(HOST, header_value(&host)?);
    }

    let mut upload = None;
    if multipart {
        let started = spawn_upload(fields, files);
        headers.insert(CONTENT_TYPE, header_value(&started.content_type)?);
        body = OutgoingBody::Stream(Some(started.body));
        upload = Some(started.completion);
    }

    tracing::debug!(method = %method, url = %raw_url, multipart, "Assembled request");

    Ok(Assembled {
        request: OutgoingRequest {
            method,
            raw_url,
            url: parsed,
            headers,
            body,
        },
        captured,
        transport,
        upload,
    })
}

fn accepts_files(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT
}

/// Merge maps in encounter order, then stable-sort by key so that values
/// sharing a key keep their relative order.
fn merge_sorted<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = pairs
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    merged.sort_by(|a, b| a.0.cmp(&b.0));
    merged
}

fn encode(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn append_query(url: &mut String, encoded: &str) {
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(encoded);
}

fn header_value(value: &str) -> HttpResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ReqError::InvalidHeader(format!("{}: {}", value, e)))
}

fn apply_cookies(headers: &mut HeaderMap, cookies: &[Cookie]) -> HttpResult<()> {
    if cookies.is_empty() {
        return Ok(());
    }
    let mut joined: Vec<String> = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| vec![v.to_string()])
        .unwrap_or_default();
    joined.extend(cookies.iter().map(Cookie::pair));
    headers.insert(COOKIE, header_value(&joined.join("; "))?);
    Ok(())
}
