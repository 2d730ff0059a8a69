use crate::UrlError;
use url::{Origin, Url};

/// Extracts the origin (scheme, host, port) of an HTTP(S) URL
///
/// # Returns
///
/// * `Ok(Origin)` - The tuple origin of the URL
/// * `Err(UrlError)` - The URL does not parse, is not HTTP(S), or has no host
///
/// # Examples
///
/// ```
/// use product_trawl::url::origin_of;
///
/// let a = origin_of("https://shop.example.com/cart").unwrap();
/// let b = origin_of("https://shop.example.com:443/p-1?x=1").unwrap();
/// assert_eq!(a, b);
/// assert!(origin_of("mailto:sales@example.com").is_err());
/// ```
pub fn origin_of(url_str: &str) -> Result<Origin, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url.origin())
}

/// Returns true when both URLs share scheme, host and port
///
/// Opaque or non-HTTP(S) URLs never share an origin with anything.
pub fn same_origin(candidate: &str, root: &str) -> bool {
    match (origin_of(candidate), origin_of(root)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_host_same_origin() {
        assert!(same_origin(
            "https://example.com/collections/shoes",
            "https://example.com/"
        ));
    }

    #[test]
    fn test_host_case_insensitive() {
        assert!(same_origin("https://EXAMPLE.com/a", "https://example.COM/"));
    }

    #[test]
    fn test_scheme_differs() {
        assert!(!same_origin("http://example.com/a", "https://example.com/"));
    }

    #[test]
    fn test_port_differs() {
        assert!(!same_origin("https://example.com:8443/a", "https://example.com/"));
        assert!(same_origin("https://example.com:443/a", "https://example.com/"));
    }

    #[test]
    fn test_subdomain_is_other_origin() {
        assert!(!same_origin("https://blog.example.com/", "https://example.com/"));
    }

    #[test]
    fn test_opaque_never_matches() {
        assert!(!same_origin("not a url", "not a url"));
        assert!(!same_origin("/relative", "https://example.com/"));
    }

    #[test]
    fn test_origin_errors() {
        assert!(matches!(
            origin_of("ftp://example.com/file").unwrap_err(),
            UrlError::InvalidScheme(_)
        ));
        assert!(matches!(origin_of("nope").unwrap_err(), UrlError::Parse(_)));
    }
}
