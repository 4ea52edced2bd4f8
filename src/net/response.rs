//! Buffered HTTP response returned by [`CookieDispatcher::fetch`](crate::net::CookieDispatcher::fetch).
//!
//! The body is kept as raw bytes. `headers` is an `http::HeaderMap`, so
//! header names are case-insensitive.
use http::HeaderMap;

use crate::errors::Degradation;

#[derive(Debug)]
pub struct Response {
    /// Final URL of the response (after redirects, if any).
    pub url: url::Url,

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub status: u16,

    /// Reason phrase of the status code, `"Unknown"` for non-standard codes.
    pub status_text: String,

    pub headers: HeaderMap,

    pub body: Vec<u8>,

    /// Cookie operations of this request/response cycle that timed out or
    /// failed. Empty when cookies were handled normally.
    pub cookie_degradations: Vec<Degradation>,
}

impl Response {
    pub fn is_degraded(&self) -> bool {
        !self.cookie_degradations.is_empty()
    }
}
