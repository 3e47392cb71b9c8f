//! Static policy list of social/video/paywalled hosts excluded from search
//! results (spec.md §4.A). A plain Rust constant, not configuration —
//! mirrors the teacher's `rootsignal-common` domain-classification lists.

const BLACKLISTED_HOST_SUFFIXES: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "reddit.com",
    "youtube.com",
    "youtu.be",
    "linkedin.com",
    "threads.net",
    "pinterest.com",
    "nytimes.com",
    "wsj.com",
    "ft.com",
    "bloomberg.com",
];

/// True if `url`'s host matches (or is a subdomain of) a blacklisted host.
pub fn is_blacklisted(url: &str) -> bool {
    let Some(host) = extract_host(url) else {
        return false;
    };
    BLACKLISTED_HOST_SUFFIXES
        .iter()
        .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")))
}

fn extract_host(url: &str) -> Option<String> {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme
        .split('/')
        .next()?
        .split('?')
        .next()?
        .split('@')
        .last()?
        .split(':')
        .next()?;
    Some(host.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_exact_and_subdomain_matches() {
        assert!(is_blacklisted("https://www.facebook.com/events/123"));
        assert!(is_blacklisted("https://x.com/someone/status/1"));
        assert!(is_blacklisted("https://m.youtube.com/watch?v=abc"));
    }

    #[test]
    fn allows_unrelated_hosts() {
        assert!(!is_blacklisted("https://example.com/news/ai"));
        assert!(!is_blacklisted("https://techcrunch.com/2026/ai-news"));
    }

    #[test]
    fn does_not_false_positive_on_suffix_substring() {
        // "notfacebook.com" should not match "facebook.com" by naive contains().
        assert!(!is_blacklisted("https://notfacebook.com/page"));
    }
}
