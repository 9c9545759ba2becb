//! Domain blocklist.

use std::collections::BTreeSet;

use crate::utils::normalize_domain;

/// Normalized set of blocked domains.
///
/// Entries are lower-cased with any leading `www.` removed. A domain is
/// blocked when it equals an entry or is a subdomain of one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlocklistSet {
    domains: BTreeSet<String>,
}

impl BlocklistSet {
    pub fn from_domains<S: AsRef<str>>(domains: &[S]) -> Self {
        let domains = domains
            .iter()
            .map(|d| normalize_domain(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Check whether `domain` (or one of its parents) is blocked.
    pub fn contains_domain(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        if domain.is_empty() {
            return false;
        }
        self.domains.iter().any(|blocked| {
            domain == *blocked
                || domain
                    .strip_suffix(blocked.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_subdomain_match() {
        let blocklist = BlocklistSet::from_domains(&["WSJ.com", "www.houstonchronicle.com", " "]);
        assert_eq!(blocklist.len(), 2);
        assert!(blocklist.contains_domain("wsj.com"));
        assert!(blocklist.contains_domain("www.wsj.com"));
        assert!(blocklist.contains_domain("blogs.wsj.com"));
        assert!(blocklist.contains_domain("houstonchronicle.com"));
    }

    #[test]
    fn test_suffix_without_dot_is_not_blocked() {
        let blocklist = BlocklistSet::from_domains(&["wsj.com"]);
        assert!(!blocklist.contains_domain("notwsj.com"));
        assert!(!blocklist.contains_domain(""));
    }
}
