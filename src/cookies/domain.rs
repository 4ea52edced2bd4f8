//! Domain and path matching (RFC 6265, sections 5.1.3 and 5.1.4).
//!
//! [`permute_domain`] expands a request host into every domain a stored cookie
//! could be scoped to. The registrable boundary comes from the public suffix
//! list via `addr`; special-use names (RFC 6761) are handled before the list
//! is consulted.

use std::net::IpAddr;

/// Top-level names reserved for non-public use.
const SPECIAL_USE_DOMAINS: &[&str] = &["local", "example", "invalid", "localhost", "test"];

/// Special-use names that are valid cookie domains on their own.
const SPECIAL_TREATMENT_DOMAINS: &[&str] = &["localhost", "invalid"];

/// Normalizes a domain: trims whitespace, strips one leading and one trailing dot, lowercases.
pub fn canonical_domain(domain: &str) -> String {
    let domain = domain.trim();
    let domain = domain.strip_prefix('.').unwrap_or(domain);
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    domain.to_ascii_lowercase()
}

/// Returns true when the top-level label of `domain` is reserved for special use.
pub fn is_special_use(domain: &str) -> bool {
    let domain = canonical_domain(domain);
    domain
        .rsplit('.')
        .next()
        .is_some_and(|tld| SPECIAL_USE_DOMAINS.contains(&tld))
}

fn is_ip(domain: &str) -> bool {
    domain.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok()
}

/// Returns the registrable domain ("public suffix plus one label") of `domain`.
///
/// `None` when `domain` is itself a public suffix, is malformed, or is a
/// special-use name while `allow_special_use_domain` is false.
pub fn registrable_domain(domain: &str, allow_special_use_domain: bool) -> Option<String> {
    let domain = canonical_domain(domain);
    if domain.is_empty() {
        return None;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let tld = labels[labels.len() - 1];

    if SPECIAL_USE_DOMAINS.contains(&tld) {
        if !allow_special_use_domain {
            return None;
        }
        if labels.len() > 1 {
            return Some(format!("{}.{}", labels[labels.len() - 2], tld));
        }
        if SPECIAL_TREATMENT_DOMAINS.contains(&tld) {
            return Some(tld.to_string());
        }
        return None;
    }

    let name = addr::parse_domain_name(&domain).ok()?;
    name.root().map(str::to_string)
}

/// Returns true when `domain` is a public suffix such as `com` or `co.uk`.
pub fn is_public_suffix(domain: &str) -> bool {
    let domain = canonical_domain(domain);
    if domain.is_empty() || is_ip(&domain) {
        return false;
    }
    registrable_domain(&domain, true).is_none()
}

/// Expands `domain` into the domains a matching cookie may be stored under,
/// most specific first, stopping at the registrable domain.
///
/// ```
/// use gosub_cookie_store::cookies::permute_domain;
///
/// assert_eq!(
///     permute_domain("a.b.example.com", false),
///     vec!["a.b.example.com", "b.example.com", "example.com"],
/// );
/// ```
///
/// An empty result means the input could not be expanded; callers fall back
/// to the original domain alone.
pub fn permute_domain(domain: &str, allow_special_use_domain: bool) -> Vec<String> {
    let domain = canonical_domain(domain);
    if domain.is_empty() {
        return vec![];
    }
    if is_ip(&domain) {
        return vec![domain];
    }

    let Some(root) = registrable_domain(&domain, allow_special_use_domain) else {
        return vec![];
    };
    if root == domain {
        return vec![domain];
    }

    let Some(prefix) = domain.strip_suffix(&format!(".{root}")) else {
        return vec![];
    };

    let mut permutations = vec![root.clone()];
    let mut current = root;
    for label in prefix.rsplit('.') {
        current = format!("{label}.{current}");
        permutations.push(current.clone());
    }
    permutations.reverse();
    permutations
}

/// RFC 6265 domain-match: `host` equals `cookie_domain`, or is a subdomain of it.
/// IP addresses only ever match themselves.
pub fn domain_match(host: &str, cookie_domain: &str) -> bool {
    let host = canonical_domain(host);
    let cookie_domain = canonical_domain(cookie_domain);

    if host == cookie_domain {
        return true;
    }
    if is_ip(&host) {
        return false;
    }
    host.len() > cookie_domain.len()
        && host.ends_with(&cookie_domain)
        && host.as_bytes()[host.len() - cookie_domain.len() - 1] == b'.'
}

/// RFC 6265 path-match of a request path against a cookie path.
pub fn path_match(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    if !request_path.starts_with(cookie_path) {
        return false;
    }
    cookie_path.ends_with('/') || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/')
}

/// The default cookie path for a request path: everything up to, not
/// including, the right-most `/`, or `/` when there is nothing left.
pub fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutes_up_to_registrable_domain() {
        assert_eq!(
            permute_domain("a.b.example.com", false),
            vec!["a.b.example.com", "b.example.com", "example.com"]
        );
        assert_eq!(permute_domain("example.com", false), vec!["example.com"]);
        assert_eq!(permute_domain("www.example.co.uk", true), vec!["www.example.co.uk", "example.co.uk"]);
    }

    #[test]
    fn normalizes_before_permuting() {
        assert_eq!(permute_domain(".WWW.Example.com.", false), vec!["www.example.com", "example.com"]);
    }

    #[test]
    fn special_use_domains_need_permission() {
        assert!(permute_domain("app.dev.localhost", false).is_empty());
        assert_eq!(
            permute_domain("app.dev.localhost", true),
            vec!["app.dev.localhost", "dev.localhost"]
        );
        assert_eq!(permute_domain("localhost", true), vec!["localhost"]);
        assert!(permute_domain("test", true).is_empty());
        assert!(permute_domain("shop.example", false).is_empty());
    }

    #[test]
    fn public_suffix_and_garbage_do_not_expand() {
        assert!(permute_domain("com", false).is_empty());
        assert!(permute_domain("", true).is_empty());
        assert!(permute_domain("   ", true).is_empty());
    }

    #[test]
    fn ip_addresses_are_their_own_candidate() {
        assert_eq!(permute_domain("127.0.0.1", false), vec!["127.0.0.1"]);
    }

    #[test]
    fn detects_public_suffixes() {
        assert!(is_public_suffix("com"));
        assert!(is_public_suffix("co.uk"));
        assert!(!is_public_suffix("example.com"));
        assert!(!is_public_suffix("localhost"));
        assert!(is_special_use("foo.test"));
        assert!(!is_special_use("example.com"));
    }

    #[test]
    fn domain_matching() {
        assert!(domain_match("example.com", "example.com"));
        assert!(domain_match("www.example.com", "example.com"));
        assert!(domain_match("www.example.com", ".Example.com"));
        assert!(!domain_match("badexample.com", "example.com"));
        assert!(!domain_match("example.com", "www.example.com"));
        assert!(!domain_match("10.0.0.1", "0.0.1"));
    }

    #[test]
    fn path_matching() {
        assert!(path_match("/", "/"));
        assert!(path_match("/docs/intro", "/docs"));
        assert!(path_match("/docs/intro", "/docs/"));
        assert!(!path_match("/docsearch", "/docs"));
        assert!(!path_match("/", "/docs"));
    }

    #[test]
    fn default_paths() {
        assert_eq!(default_path(""), "/");
        assert_eq!(default_path("/"), "/");
        assert_eq!(default_path("/index.html"), "/");
        assert_eq!(default_path("/docs/intro"), "/docs");
        assert_eq!(default_path("relative"), "/");
    }
}
