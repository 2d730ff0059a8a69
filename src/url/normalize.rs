use crate::UrlError;
use url::Url;

/// Normalizes a URL for visited-set tracking and classification
///
/// # Normalization Steps
///
/// 1. Parse as an absolute URL
/// 2. Remove the query string
/// 3. Remove the fragment
/// 4. Serialize back to the canonical string form
///
/// Input that does not parse as an absolute URL is returned unchanged. Such
/// opaque strings can still be tracked as visited, but they never share an
/// origin with anything (see [`super::same_origin`]).
///
/// Normalizing an already normalized URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use product_trawl::url::normalize;
///
/// assert_eq!(
///     normalize("https://Shop.Example.com/p-12?color=red#reviews"),
///     "https://shop.example.com/p-12"
/// );
/// assert_eq!(normalize("not a url"), "not a url");
/// ```
pub fn normalize(url_str: &str) -> String {
    match try_normalize(url_str) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::trace!("Keeping opaque URL {:?}: {}", url_str, e);
            url_str.to_string()
        }
    }
}

/// Parses and normalizes a URL, reporting why it could not be parsed
pub fn try_normalize(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
