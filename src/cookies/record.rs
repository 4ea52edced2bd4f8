//! Persisted cookie representation.
//!
//! A [`CookieRecord`] is one row of the `cookies` table (minus the owner
//! column, which backends manage themselves). Conversions to and from
//! [`Cookie`] apply the storage encoding:
//!
//! | in memory                     | persisted                     |
//! |-------------------------------|-------------------------------|
//! | `domain`/`path` = `None`      | `""`                          |
//! | `same_site` = `None`          | `"none"`                      |
//! | `expires` = `Expiry::Never`   | `NULL`                        |
//! | `max_age` = `None`            | `NULL`                        |
//! | `max_age` = `±Infinity`       | `"Infinity"` / `"-Infinity"`  |
//! | `extensions` = `None`         | `NULL`, otherwise `\n`-joined |
//! | `extensions` = `Some([])`     | `""`                          |
//! | `creation`/`last_accessed` unset | current time               |

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::cookies::cookie::{Cookie, Expiry, MaxAge, SameSite};
use crate::errors::BackendError;

const EXTENSION_SEPARATOR: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub key: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,
    pub max_age: Option<String>,
    pub extensions: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub creation: OffsetDateTime,
    pub creation_index: u64,
    pub host_only: bool,
    pub path_is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_accessed: OffsetDateTime,
}

impl CookieRecord {
    /// The composite identity inside one owner: `(domain, path, key)`.
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.domain, &self.path, &self.key)
    }
}

impl From<&Cookie> for CookieRecord {
    fn from(cookie: &Cookie) -> Self {
        let now = OffsetDateTime::now_utc();

        Self {
            key: cookie.key.clone(),
            value: cookie.value.clone(),
            domain: cookie.domain.clone().unwrap_or_default(),
            path: cookie.path.clone().unwrap_or_default(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            same_site: cookie.same_site.unwrap_or(SameSite::None).as_str().to_string(),
            expires: match cookie.expires {
                Expiry::Never => None,
                Expiry::At(at) => Some(at),
            },
            max_age: cookie.max_age.map(|m| m.to_string()),
            extensions: cookie.extensions.as_ref().map(|ext| ext.join(EXTENSION_SEPARATOR)),
            creation: cookie.creation.unwrap_or(now),
            creation_index: cookie.creation_index,
            host_only: cookie.host_only,
            path_is_default: cookie.path_is_default,
            last_accessed: cookie.last_accessed.unwrap_or(now),
        }
    }
}

impl TryFrom<CookieRecord> for Cookie {
    type Error = BackendError;

    fn try_from(record: CookieRecord) -> Result<Self, Self::Error> {
        let same_site = record.same_site.parse::<SameSite>().map_err(BackendError::Decode)?;
        let max_age = record
            .max_age
            .as_deref()
            .map(str::parse::<MaxAge>)
            .transpose()
            .map_err(BackendError::Decode)?;

        Ok(Cookie {
            key: record.key,
            value: record.value,
            domain: Some(record.domain).filter(|d| !d.is_empty()),
            path: Some(record.path).filter(|p| !p.is_empty()),
            secure: record.secure,
            http_only: record.http_only,
            host_only: record.host_only,
            path_is_default: record.path_is_default,
            same_site: Some(same_site),
            expires: record.expires.map_or(Expiry::Never, Expiry::At),
            max_age,
            extensions: record.extensions.map(|ext| match ext.as_str() {
                "" => vec![],
                ext => ext.split(EXTENSION_SEPARATOR).map(str::to_string).collect(),
            }),
            creation: Some(record.creation),
            last_accessed: Some(record.last_accessed),
            creation_index: record.creation_index,
        })
    }
}

/// Formats a timestamp for text columns.
pub(crate) fn format_timestamp(at: OffsetDateTime) -> Result<String, BackendError> {
    at.format(&Rfc3339).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Parses a timestamp from a text column.
pub(crate) fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, BackendError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| BackendError::Decode(format!("timestamp {raw:?}: {e}")))
}
