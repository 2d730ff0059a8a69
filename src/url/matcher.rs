use crate::ConfigError;

/// Product patterns used when the configuration does not name any
pub const DEFAULT_PRODUCT_PATTERNS: &[&str] = &["products", "product", "p", "item", "p-*"];

/// A single path-segment pattern identifying product pages
///
/// Two forms are supported:
/// 1. Segment: "products" matches a path segment equal to "products" that is
///    followed by a slash ("/products/blue-shoe", "/products/")
/// 2. Prefix: "p-*" matches a segment starting with "p-" that has at least
///    one more character ("/p-12345")
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductPattern {
    Segment(String),
    Prefix(String),
}

impl ProductPattern {
    /// Parses a pattern string from the configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use product_trawl::url::ProductPattern;
    ///
    /// assert_eq!(
    ///     ProductPattern::parse("p-*").unwrap(),
    ///     ProductPattern::Prefix("p-".to_string())
    /// );
    /// assert!(ProductPattern::parse("a*b").is_err());
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = pattern.trim();

        if pattern.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Product pattern cannot be empty".to_string(),
            ));
        }

        if pattern.contains('/') {
            return Err(ConfigError::InvalidPattern(format!(
                "Product pattern '{}' must be a single path segment",
                pattern
            )));
        }

        match pattern.strip_suffix('*') {
            Some(prefix) if prefix.is_empty() => Err(ConfigError::InvalidPattern(
                "Product pattern '*' would match every segment".to_string(),
            )),
            Some(prefix) if prefix.contains('*') => Err(ConfigError::InvalidPattern(format!(
                "Product pattern '{}' may only use '*' as its last character",
                pattern
            ))),
            Some(prefix) => Ok(Self::Prefix(prefix.to_string())),
            None if pattern.contains('*') => Err(ConfigError::InvalidPattern(format!(
                "Product pattern '{}' may only use '*' as its last character",
                pattern
            ))),
            None => Ok(Self::Segment(pattern.to_string())),
        }
    }

    /// Checks the pattern against the segments of a normalized path
    pub fn matches_segments(&self, segments: &[&str]) -> bool {
        match self {
            Self::Segment(name) => segments
                .windows(2)
                .any(|pair| pair[0] == name.as_str()),
            Self::Prefix(prefix) => segments.iter().any(|segment| {
                segment.len() > prefix.len() && segment.starts_with(prefix.as_str())
            }),
        }
    }
}

/// Checks a URL path against a single pattern
///
/// # Examples
///
/// ```
/// use product_trawl::url::{matches_product_path, ProductPattern};
///
/// let pattern = ProductPattern::Segment("item".to_string());
/// assert!(matches_product_path(&pattern, "/shop/item/42"));
/// assert!(!matches_product_path(&pattern, "/shop/items/42"));
/// ```
pub fn matches_product_path(pattern: &ProductPattern, path: &str) -> bool {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    pattern.matches_segments(&segments)
}
