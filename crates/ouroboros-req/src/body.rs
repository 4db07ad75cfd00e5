//! Materialized request bodies and the JSON/XML producers

use bytes::Bytes;
use serde::Serialize;

use crate::error::{HttpResult, ReqError};

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub(crate) const XML_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";
pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// A fully materialized request payload.
///
/// The content type is a hint: it is applied to the outbound request only
/// when the caller has not already set a `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    content_type: Option<String>,
    data: Bytes,
}

impl Body {
    /// Literal payload without a content type
    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self {
            content_type: None,
            data: data.into(),
        }
    }

    /// Payload with an explicit content type
    pub fn with_content_type(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Bytes) {
        (self.content_type, self.data)
    }
}

/// Serialize `value` as a JSON body.
///
/// Pass the result straight into an ingredient list; a serialization
/// failure becomes an error ingredient and aborts the request before any
/// network I/O.
pub fn body_json<T: Serialize + ?Sized>(value: &T) -> HttpResult<Body> {
    let data = serde_json::to_vec(value)
        .map_err(|e| ReqError::Serialization(format!("Failed to encode JSON body: {}", e)))?;
    Ok(Body::with_content_type(JSON_CONTENT_TYPE, data))
}

/// Use already-encoded JSON text or bytes as the body, unchanged
pub fn body_json_raw(data: impl Into<Bytes>) -> Body {
    Body::with_content_type(JSON_CONTENT_TYPE, data)
}

/// Serialize `value` as an XML body
pub fn body_xml<T: Serialize + ?Sized>(value: &T) -> HttpResult<Body> {
    let text = quick_xml::se::to_string(value)
        .map_err(|e| ReqError::Serialization(format!("Failed to encode XML body: {}", e)))?;
    Ok(Body::with_content_type(XML_CONTENT_TYPE, text))
}

/// Use already-encoded XML text or bytes as the body, unchanged
pub fn body_xml_raw(data: impl Into<Bytes>) -> Body {
    Body::with_content_type(XML_CONTENT_TYPE, data)
}
