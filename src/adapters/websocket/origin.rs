//! Origin policy for the upgrade handshake.
//!
//! - No `Origin` header (non-browser clients): allowed
//! - Development mode or a `*` entry: every origin allowed
//! - Otherwise: exact match, or `*.domain` matching any subdomain of `domain`

/// Decides which browser origins may open a stream.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    development: bool,
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(development: bool, allowed: Vec<String>) -> Self {
        let allowed = allowed
            .into_iter()
            .map(|origin| origin.trim().trim_end_matches('/').to_ascii_lowercase())
            .filter(|origin| !origin.is_empty())
            .collect();
        Self {
            development,
            allowed,
        }
    }

    /// Accepts every origin.
    pub fn permissive() -> Self {
        Self::new(true, Vec::new())
    }

    pub fn allows(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };
        if self.development {
            return true;
        }

        let origin = origin.trim().trim_end_matches('/').to_ascii_lowercase();
        let host = host_of(&origin);

        self.allowed.iter().any(|pattern| {
            if pattern.as_str() == "*" || *pattern == origin {
                return true;
            }
            match pattern.strip_prefix("*.") {
                Some(domain) => host.ends_with(&format!(".{}", domain)),
                None => false,
            }
        })
    }
}

/// Host part of an origin: scheme and port stripped.
fn host_of(origin: &str) -> &str {
    let without_scheme = origin.split_once("://").map(|(_, rest)| rest).unwrap_or(origin);
    without_scheme
        .rsplit_once(':')
        .map(|(host, _port)| host)
        .unwrap_or(without_scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production(allowed: &[&str]) -> OriginPolicy {
        OriginPolicy::new(false, allowed.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn missing_origin_is_allowed() {
        assert!(production(&[]).allows(None));
    }

    #[test]
    fn development_allows_everything() {
        assert!(OriginPolicy::permissive().allows(Some("https://evil.example")));
    }

    #[test]
    fn exact_match_is_required_without_wildcard() {
        let policy = production(&["https://poker.example.com"]);
        assert!(policy.allows(Some("https://poker.example.com")));
        assert!(policy.allows(Some("https://POKER.example.com/")));
        assert!(!policy.allows(Some("http://poker.example.com")));
        assert!(!policy.allows(Some("https://other.example.com")));
    }

    #[test]
    fn wildcard_matches_subdomains_only() {
        let policy = production(&["*.example.com"]);
        assert!(policy.allows(Some("https://poker.example.com")));
        assert!(policy.allows(Some("https://a.b.example.com:8443")));
        assert!(!policy.allows(Some("https://example.com")));
        assert!(!policy.allows(Some("https://badexample.com")));
    }

    #[test]
    fn star_allows_all() {
        assert!(production(&["*"]).allows(Some("https://anything.test")));
    }

    #[test]
    fn host_of_strips_scheme_and_port() {
        assert_eq!(host_of("https://poker.example.com:8443"), "poker.example.com");
        assert_eq!(host_of("poker.example.com"), "poker.example.com");
    }
}
