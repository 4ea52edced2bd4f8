//! `Set-Cookie` header parsing (RFC 6265, section 5.2).
//!
//! Parsing is purely syntactic: the result carries only what the header says.
//! Scoping defaults (host-only domain, default path) and acceptance rules are
//! the jar's job, see [`CookieJar`](crate::cookies::CookieJar).

use time::format_description::well_known::Rfc2822;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::cookies::cookie::{Cookie, Expiry, MaxAge, SameSite};
use crate::cookies::domain::canonical_domain;

const IMF_FIXDATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[day] [month repr:short case_sensitive:false] [year] [hour]:[minute]:[second] GMT"
);

const DASHED_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[day]-[month repr:short case_sensitive:false]-[year] [hour]:[minute]:[second] GMT"
);

/// Parses an HTTP date as found in the `Expires` attribute.
///
/// Accepts IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`), the dashed variant
/// (`Sun, 06-Nov-1994 08:49:37 GMT`) and RFC 2822 with a numeric offset.
pub fn parse_http_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    let without_weekday = raw.split_once(", ").map_or(raw, |(_, rest)| rest);

    PrimitiveDateTime::parse(without_weekday, IMF_FIXDATE)
        .or_else(|_| PrimitiveDateTime::parse(without_weekday, DASHED_DATE))
        .map(PrimitiveDateTime::assume_utc)
        .ok()
        .or_else(|| OffsetDateTime::parse(raw, &Rfc2822).ok())
}

fn parse_max_age(raw: &str) -> Option<MaxAge> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Anything too large to represent lives forever in practice.
    Some(raw.parse::<i64>().map_or_else(
        |_| if raw.starts_with('-') { MaxAge::NegInfinity } else { MaxAge::Infinity },
        MaxAge::Seconds,
    ))
}

/// Parses one `Set-Cookie` header value.
///
/// Returns `None` when the header has no `name=value` pair or an empty name.
/// Unknown attributes are preserved verbatim in `extensions`.
pub fn parse_set_cookie(header: &str, now: OffsetDateTime) -> Option<Cookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = Cookie::new(name, value.trim());
    cookie.creation = Some(now);
    cookie.last_accessed = Some(now);

    let mut extensions = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (attr, attr_value) = match part.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (part, ""),
        };

        match attr.to_ascii_lowercase().as_str() {
            "expires" => {
                if let Some(at) = parse_http_date(attr_value) {
                    cookie.expires = Expiry::At(at);
                }
            }
            "max-age" => {
                if let Some(max_age) = parse_max_age(attr_value) {
                    cookie.max_age = Some(max_age);
                }
            }
            "domain" => {
                let domain = canonical_domain(attr_value);
                if !domain.is_empty() {
                    cookie.domain = Some(domain);
                }
            }
            "path" => {
                if attr_value.starts_with('/') {
                    cookie.path = Some(attr_value.to_string());
                }
            }
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "samesite" => cookie.same_site = attr_value.parse::<SameSite>().ok(),
            _ => extensions.push(part.to_string()),
        }
    }

    if !extensions.is_empty() {
        cookie.extensions = Some(extensions);
    }

    Some(cookie)
}
