//! Hostname and site-root helpers

use url::Url;

/// Host of `url`, lowercased, without a leading `www.` or `m.`
///
/// Returns `None` when the URL doesn't parse or has no host.
pub fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(host.as_str());
    Some(host.to_string())
}

/// Scheme, host and (non-default) port of `url`, without a trailing slash
pub fn site_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{}://{}:{}", parsed.scheme(), host, port)),
        None => Some(format!("{}://{}", parsed.scheme(), host)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_strips_prefixes() {
        assert_eq!(
            hostname("https://www.fanfiction.net/s/1/"),
            Some("fanfiction.net".to_string())
        );
        assert_eq!(
            hostname("https://m.FictionPress.com/s/1/"),
            Some("fictionpress.com".to_string())
        );
        assert_eq!(
            hostname("http://127.0.0.1:8080/u/1/"),
            Some("127.0.0.1".to_string())
        );
        assert_eq!(hostname("not a url"), None);
    }

    #[test]
    fn test_site_url() {
        assert_eq!(
            site_url("https://www.fanfiction.net/s/123/1/Title"),
            Some("https://www.fanfiction.net".to_string())
        );
        assert_eq!(
            site_url("http://127.0.0.1:8080/s/123/"),
            Some("http://127.0.0.1:8080".to_string())
        );
        assert_eq!(
            site_url("https://example.com:443/s/1/"),
            Some("https://example.com".to_string())
        );
        assert_eq!(site_url("mailto:someone@example.com"), None);
    }
}
