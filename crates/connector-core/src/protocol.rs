//! URL eligibility for hand-off.

use tracing::debug;
use url::Url;

/// Schemes the companion app can download.
const SUPPORTED_SCHEMES: &[&str] = &["http", "https"];

/// Returns true if `url` is an `http` or `https` URL.
///
/// Empty input and strings that do not parse as a URL are unsupported.
pub fn is_supported_protocol(url: Option<&str>) -> bool {
    let Some(raw) = url.filter(|u| !u.is_empty()) else {
        return false;
    };

    match Url::parse(raw) {
        Ok(parsed) => SUPPORTED_SCHEMES.contains(&parsed.scheme()),
        Err(e) => {
            debug!(url = raw, error = %e, "Malformed URL treated as unsupported");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert!(is_supported_protocol(Some("https://example.com/file.zip")));
        assert!(is_supported_protocol(Some("http://x/y")));
        assert!(is_supported_protocol(Some("HTTPS://EXAMPLE.COM/a")));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(!is_supported_protocol(Some("ftp://x/y")));
        assert!(!is_supported_protocol(Some("blob:https://example.com/uuid")));
        assert!(!is_supported_protocol(Some("data:text/plain,hello")));
        assert!(!is_supported_protocol(Some("file:///tmp/a.zip")));
    }

    #[test]
    fn test_rejects_missing_input() {
        assert!(!is_supported_protocol(Some("")));
        assert!(!is_supported_protocol(None));
    }

    #[test]
    fn test_malformed_url_is_unsupported() {
        assert!(!is_supported_protocol(Some("not a url")));
        assert!(!is_supported_protocol(Some("http://[::1")));
    }
}
