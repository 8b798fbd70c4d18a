//! Response handling and transformation.
//!
//! # Responsibilities
//! - The response record produced by the dispatcher ([`SiteResponse`])
//! - The forward instruction handed to the upstream client ([`ForwardInstruction`])
//! - Safe construction of `Location` values
//!
//! # Design Decisions
//! - Bodies are fully buffered `Bytes`; no streaming semantics
//! - `Location` never carries raw control characters: anything outside
//!   visible ASCII is percent-encoded before it becomes a header value
//! - `HEAD` responses keep their headers and drop the body at the wire

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::http::request::SiteRequest;

/// Bytes that must not reach a `Location` header unescaped. Non-ASCII is
/// always encoded; other visible ASCII passes through.
const LOCATION_ESCAPE: &AsciiSet = &CONTROLS.add(b' ');

/// A fully formed response.
#[derive(Debug, Clone)]
pub struct SiteResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl SiteResponse {
    /// No headers, no body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A redirect to `location`, escaped for header use.
    pub fn redirect(status: StatusCode, location: &str) -> Self {
        let mut resp = Self::empty(status);
        resp.headers.insert(header::LOCATION, location_value(location));
        resp
    }

    /// A body with its content type.
    pub fn content(status: StatusCode, body: impl Into<Bytes>, content_type: &str) -> Self {
        let mut resp = Self::empty(status);
        resp.body = body.into();
        if let Ok(value) = HeaderValue::from_str(content_type) {
            resp.headers.insert(header::CONTENT_TYPE, value);
        }
        resp
    }

    /// Drop the body, keeping headers, for `HEAD`.
    pub fn for_method(mut self, method: &Method) -> Self {
        if method == Method::HEAD {
            if !self.body.is_empty() && !self.headers.contains_key(header::CONTENT_LENGTH) {
                self.headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
            }
            self.body = Bytes::new();
        }
        self
    }

    /// The `Location` header, if any.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for SiteResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// A request to be sent to an upstream origin.
#[derive(Debug, Clone)]
pub struct ForwardInstruction {
    /// Origin URL with the mount suffix and query applied.
    pub url: Url,
    pub method: Method,
    /// Request headers, hop-by-hop ones removed.
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Mount prefix that matched.
    pub mount: String,
    /// Merged headers to set over whatever the origin returns.
    pub response_headers: HeaderMap,
}

/// Result of dispatching one request.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Answer directly.
    Reply(SiteResponse),
    /// Forward upstream, then apply `response_headers`.
    Forward(ForwardInstruction),
}

impl Outcome {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Outcome::Reply(resp) => Some(resp.status),
            Outcome::Forward(_) => None,
        }
    }

    pub fn reply(&self) -> Option<&SiteResponse> {
        match self {
            Outcome::Reply(resp) => Some(resp),
            Outcome::Forward(_) => None,
        }
    }

    pub fn forward(&self) -> Option<&ForwardInstruction> {
        match self {
            Outcome::Forward(fwd) => Some(fwd),
            Outcome::Reply(_) => None,
        }
    }
}

/// Escape a location for use as a header value.
pub fn location_value(raw: &str) -> HeaderValue {
    let escaped = utf8_percent_encode(raw, LOCATION_ESCAPE).to_string();
    HeaderValue::from_str(&escaped).unwrap_or_else(|_| HeaderValue::from_static("/"))
}

/// Make a site-relative target absolute using the request's scheme and host.
///
/// The port is left out, matching the `https` upgrade.
pub fn absolute_location(request: &SiteRequest, target: &str) -> String {
    if target.starts_with('/') && !target.starts_with("//") && !request.host.is_empty() {
        format!("{}://{}{}", request.scheme, request.host, target)
    } else {
        target.to_string()
    }
}
