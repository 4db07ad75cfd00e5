//! Partition an ingredient list into buckets

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::body::Body;
use crate::error::{HttpResult, ReqError};
use crate::ingredient::{BodyReader, Cookie, FileUpload, Ingredient, Param, QueryParam};

/// A candidate request body, in the order it was supplied
pub(crate) enum BodySource {
    Value(Body),
    Reader(BodyReader),
}

impl BodySource {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            BodySource::Value(_) => "body",
            BodySource::Reader(_) => "reader",
        }
    }
}

/// Ingredients sorted by kind; order within each bucket is preserved
#[derive(Default)]
pub(crate) struct Buckets {
    pub headers: HeaderMap,
    pub params: Vec<Param>,
    pub query: Vec<QueryParam>,
    pub files: Vec<FileUpload>,
    pub bodies: Vec<BodySource>,
    pub transport: Option<reqwest::Client>,
    pub cookies: Vec<Cookie>,
    pub host: Option<String>,
}

/// Sort `ingredients` into buckets.
///
/// Header maps are applied to the header set as they are met, so a later
/// `HeaderMap` wipes earlier `Header` additions. The first error ingredient
/// stops classification and is returned as is.
pub(crate) fn classify(ingredients: impl IntoIterator<Item = Ingredient>) -> HttpResult<Buckets> {
    let mut buckets = Buckets::default();
    for ingredient in ingredients {
        tracing::trace!(kind = ingredient.kind(), "Classifying ingredient");
        match ingredient {
            Ingredient::Header(header) => {
                for (key, value) in header.iter() {
                    let name = HeaderName::from_bytes(key.as_bytes())
                        .map_err(|e| ReqError::InvalidHeader(format!("{}: {}", key, e)))?;
                    let value = HeaderValue::from_str(value)
                        .map_err(|e| ReqError::InvalidHeader(format!("{}: {}", key, e)))?;
                    buckets.headers.append(name, value);
                }
            }
            Ingredient::HeaderMap(headers) => buckets.headers = headers,
            Ingredient::Reader(reader) => buckets.bodies.push(BodySource::Reader(reader)),
            Ingredient::Body(body) => buckets.bodies.push(BodySource::Value(body)),
            Ingredient::Param(param) => buckets.params.push(param),
            Ingredient::QueryParam(query) => buckets.query.push(query),
            Ingredient::Transport(client) => buckets.transport = Some(client),
            Ingredient::File(file) => buckets.files.push(file),
            Ingredient::Files(files) => buckets.files.extend(files),
            Ingredient::Cookie(cookie) => buckets.cookies.push(cookie),
            Ingredient::Host(host) => buckets.host = Some(host.0),
            Ingredient::Error(e) => return Err(e),
        }
    }
    Ok(buckets)
}
