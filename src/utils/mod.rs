//! Utility functions and helpers.

pub mod http;
pub mod progress;
pub mod text;

use url::Url;

/// Extract the host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}

/// Lower-case, trim, and drop a leading `www.`.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    match domain.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => domain,
    }
}

/// Normalized domain of a link, empty when the link has no host.
pub fn link_domain(url_str: &str) -> String {
    get_domain(url_str)
        .map(|host| normalize_domain(&host))
        .unwrap_or_default()
}

/// Join a path onto a base URL, keeping exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://example.com/path"),
            Some("example.com".to_string())
        );
        assert_eq!(
            get_domain("https://sub.example.com:8080/path"),
            Some("sub.example.com".to_string())
        );
        assert_eq!(get_domain("not a url"), None);
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain(" WWW.Example.COM. "), "example.com");
        assert_eq!(normalize_domain("news.example.com"), "news.example.com");
    }

    #[test]
    fn test_link_domain() {
        assert_eq!(link_domain("https://www.KHOU.com/article/1"), "khou.com");
        assert_eq!(link_domain("/relative/path"), "");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://example.com/pod/", "/episodes/2025-01-01/"),
            "https://example.com/pod/episodes/2025-01-01/"
        );
    }
}
