//! Cookies: [`CookieJar`], [`CookieStore`] and persistence backends.

mod backend;
mod cookie;
mod domain;
mod jar;
mod parse;
mod record;
mod store;

pub use cookie::next_creation_index;
pub use cookie::{Cookie, Expiry, MaxAge, SameSite};

pub use domain::{
    canonical_domain, default_path, domain_match, is_public_suffix, is_special_use, path_match, permute_domain,
    registrable_domain,
};
pub use parse::{parse_http_date, parse_set_cookie};
pub use record::CookieRecord;

pub use backend::{CookieBackend, CookieQuery, InMemoryBackend, JsonBackend};
#[cfg(feature = "sqlite_cookie_store")]
pub use backend::SqliteBackend;

pub use store::{CookieStore, CookieStoreHandle};

pub use jar::{CookieJar, RequestContext, SameSiteContext};
