//! The cookie entity.
//!
//! [`Cookie`] is the in-memory form the jar and the store exchange. Unset
//! attributes are modelled with `Option` (or the [`Expiry::Never`] sentinel),
//! never with empty strings; the empty-string sentinels only exist in the
//! persisted [`CookieRecord`](crate::cookies::CookieRecord).

use std::fmt::Display;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use time::{Duration, OffsetDateTime};

static CREATION_INDEX: AtomicU64 = AtomicU64::new(0);

/// Returns the next process-wide creation index.
///
/// Indexes only ever grow, so two cookies created in the same instant still
/// have a stable relative order.
pub fn next_creation_index() -> u64 {
    CREATION_INDEX.fetch_add(1, Ordering::Relaxed) + 1
}

/// SameSite policy of a cookie.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "strict",
            SameSite::Lax => "lax",
            SameSite::None => "none",
        }
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("strict") {
            Ok(SameSite::Strict)
        } else if s.eq_ignore_ascii_case("lax") {
            Ok(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("none") {
            Ok(SameSite::None)
        } else {
            Err(format!("unknown SameSite value {s:?}"))
        }
    }
}

impl Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute expiry of a cookie.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Expiry {
    /// Session cookie, or a cookie that never expires by date.
    #[default]
    Never,
    At(OffsetDateTime),
}

/// Relative lifetime of a cookie (the `Max-Age` attribute).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaxAge {
    Seconds(i64),
    Infinity,
    NegInfinity,
}

impl MaxAge {
    pub const INFINITY_TOKEN: &'static str = "Infinity";
    pub const NEG_INFINITY_TOKEN: &'static str = "-Infinity";
}

impl Display for MaxAge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaxAge::Seconds(secs) => write!(f, "{secs}"),
            MaxAge::Infinity => f.write_str(Self::INFINITY_TOKEN),
            MaxAge::NegInfinity => f.write_str(Self::NEG_INFINITY_TOKEN),
        }
    }
}

impl FromStr for MaxAge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::INFINITY_TOKEN => Ok(MaxAge::Infinity),
            Self::NEG_INFINITY_TOKEN => Ok(MaxAge::NegInfinity),
            other => other
                .parse::<i64>()
                .map(MaxAge::Seconds)
                .map_err(|e| format!("invalid max-age {other:?}: {e}")),
        }
    }
}

/// A single cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name (case-sensitive). May be empty for nameless cookies.
    pub key: String,
    /// Raw cookie value (not URL-decoded).
    pub value: String,
    /// Domain scope, lowercased, without a leading dot.
    pub domain: Option<String>,
    /// Path scope
    pub path: Option<String>,
    /// Only sent over secure transports
    pub secure: bool,
    /// Hidden from non-HTTP APIs
    pub http_only: bool,
    /// Only sent to the exact host that set it
    pub host_only: bool,
    /// The path was derived from the request rather than set by an attribute
    pub path_is_default: bool,
    pub same_site: Option<SameSite>,
    pub expires: Expiry,
    pub max_age: Option<MaxAge>,
    /// Unrecognized attributes, verbatim and in order
    pub extensions: Option<Vec<String>>,
    pub creation: Option<OffsetDateTime>,
    pub last_accessed: Option<OffsetDateTime>,
    /// Tie breaker for cookies created in the same instant
    pub creation_index: u64,
}

impl Cookie {
    /// Creates a session cookie with no scope set, stamped with the current time
    /// and a fresh creation index.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            host_only: false,
            path_is_default: false,
            same_site: None,
            expires: Expiry::Never,
            max_age: None,
            extensions: None,
            creation: Some(OffsetDateTime::now_utc()),
            last_accessed: None,
            creation_index: next_creation_index(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Returns the moment this cookie stops being valid, or `None` if it never does.
    ///
    /// `max_age` wins over `expires`. A finite `max_age` counts from `creation`;
    /// zero or negative values are already in the past.
    pub fn expiry_time(&self) -> Option<OffsetDateTime> {
        match self.max_age {
            Some(MaxAge::Infinity) => None,
            Some(MaxAge::NegInfinity) => Some(OffsetDateTime::UNIX_EPOCH),
            Some(MaxAge::Seconds(secs)) if secs <= 0 => Some(OffsetDateTime::UNIX_EPOCH),
            Some(MaxAge::Seconds(secs)) => {
                let base = self.creation.unwrap_or_else(OffsetDateTime::now_utc);
                Some(base.saturating_add(Duration::seconds(secs)))
            }
            None => match self.expires {
                Expiry::Never => None,
                Expiry::At(at) => Some(at),
            },
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expiry_time().is_some_and(|at| at <= now)
    }

    /// True when the cookie outlives the session.
    pub fn is_persistent(&self) -> bool {
        self.max_age.is_some() || self.expires != Expiry::Never
    }

    /// Serializes the cookie as it appears in a `Cookie` request header.
    pub fn to_header_pair(&self) -> String {
        if self.key.is_empty() {
            self.value.clone()
        } else {
            format!("{}={}", self.key, self.value)
        }
    }
}
