//! Owner-scoped, pluggable cookie persistence for an HTTP client.
//!
//! - [`cookies`]: the cookie model, domain matching, the [`CookieStore`](cookies::CookieStore)
//!   contract, its backends and the RFC 6265 [`CookieJar`](cookies::CookieJar).
//! - [`net`]: the [`CookieDispatcher`](net::CookieDispatcher), which runs the
//!   request/response cookie cycle under deadlines.

pub mod config;
pub mod cookies;
pub mod errors;
pub mod net;
pub mod owner;

#[cfg(test)]
mod testing;
