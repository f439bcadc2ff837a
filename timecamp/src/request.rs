use core::fmt;
use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use crate::CallError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Deduplication key of a request.
///
/// Two requests with the same method, path, canonical body and header set
/// share a fingerprint and are collapsed into one network call while in
/// flight. The key may contain credentials, so it is never logged.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fingerprint").field(&self.0.len()).finish()
    }
}

#[derive(Debug, Clone)]
enum Payload {
    Json(Value),
    Unserializable(String),
}

/// Description of a single API call: method, path (with query string),
/// optional JSON body and headers.
///
/// Header names are stored lowercased in a sorted map, so insertion order
/// and name casing never affect the fingerprint.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Payload>,
    headers: BTreeMap<String, String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Self {
            method,
            path,
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(path: impl AsRef<str>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl AsRef<str>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl AsRef<str>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl AsRef<str>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body. A body that cannot be represented as JSON is kept
    /// as an error and reported as [`CallError::Serialization`] when the
    /// request is executed.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(match serde_json::to_value(body) {
            Ok(value) => Payload::Json(value),
            Err(e) => Payload::Unserializable(e.to_string()),
        });
        self
    }

    /// Set a header, replacing any previous value under the same name.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn bearer_auth(self, token: impl fmt::Display) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Compute the deduplication key.
    ///
    /// The body is encoded with RFC 8785 JSON canonicalization so logically
    /// equal payloads produce the same key regardless of map key order.
    /// Headers are validated here so that malformed requests fail before
    /// they can be shared with other callers.
    ///
    /// Every variable part is length-prefixed, so no path, body or header
    /// content can pass for another part of the key.
    pub fn fingerprint(&self) -> Result<Fingerprint, CallError> {
        let mut key = String::new();
        push_part(&mut key, self.method.as_str());
        push_part(&mut key, &self.path);

        match &self.body {
            Some(body) => {
                let value = payload_value(body)?;
                let canonical = serde_json_canonicalizer::to_vec(value)
                    .map_err(|e| CallError::Serialization(e.to_string()))?;
                key.push('B');
                push_part(&mut key, &String::from_utf8_lossy(&canonical));
            }
            None => key.push('N'),
        }

        for (name, value) in &self.headers {
            validate_header(name, value)?;
            push_part(&mut key, name);
            push_part(&mut key, value);
        }

        Ok(Fingerprint(key))
    }

    /// Body bytes as sent on the wire.
    pub(crate) fn wire_body(&self) -> Result<Option<Bytes>, CallError> {
        let Some(body) = &self.body else {
            return Ok(None);
        };

        let bytes = serde_json::to_vec(payload_value(body)?)
            .map_err(|e| CallError::Serialization(e.to_string()))?;
        Ok(Some(Bytes::from(bytes)))
    }
}

fn push_part(key: &mut String, part: &str) {
    key.push_str(&part.len().to_string());
    key.push(':');
    key.push_str(part);
}

fn payload_value(payload: &Payload) -> Result<&Value, CallError> {
    match payload {
        Payload::Json(value) => Ok(value),
        Payload::Unserializable(reason) => Err(CallError::Serialization(reason.clone())),
    }
}

pub(crate) fn validate_header(
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), CallError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| CallError::Serialization(format!("invalid header name {}: {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| CallError::Serialization(format!("invalid value for header {}: {}", name, e)))?;
    Ok((header_name, header_value))
}
