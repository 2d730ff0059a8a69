//! URL handling module for Product-Trawl
//!
//! This module provides URL normalization, origin comparison and
//! product-page classification.

mod matcher;
mod normalize;
mod origin;

use crate::ConfigError;
use url::Url;

// Re-export main functions
pub use matcher::{matches_product_path, ProductPattern, DEFAULT_PRODUCT_PATTERNS};
pub use normalize::{normalize, try_normalize};
pub use origin::{origin_of, same_origin};

/// Link classification types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// Product page - collected, never visited
    Product,
    /// Same-origin page - may be queued for traversal
    Traversal,
    /// Other origin or opaque URL - ignored
    Foreign,
}

/// Normalizes and triages links discovered during a crawl
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    patterns: Vec<ProductPattern>,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        let patterns = DEFAULT_PRODUCT_PATTERNS
            .iter()
            .filter_map(|p| ProductPattern::parse(p).ok())
            .collect();
        Self { patterns }
    }
}

impl UrlClassifier {
    /// Creates a classifier from already parsed patterns
    pub fn new(patterns: Vec<ProductPattern>) -> Self {
        Self { patterns }
    }

    /// Creates a classifier from configuration pattern strings
    ///
    /// An empty list falls back to the default patterns.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }

        let patterns = patterns
            .iter()
            .map(|p| ProductPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Returns the configured patterns
    pub fn patterns(&self) -> &[ProductPattern] {
        &self.patterns
    }

    /// See [`normalize`]
    pub fn normalize(&self, url: &str) -> String {
        normalize(url)
    }

    /// Returns true if the URL's normalized path matches any product pattern
    ///
    /// Opaque URLs have no path and are never products.
    pub fn is_product(&self, url: &str) -> bool {
        let Ok(parsed) = try_normalize(url) else {
            return false;
        };

        path_matches(&self.patterns, &parsed)
    }

    /// Classifies a link relative to the root URL of the crawl
    pub fn classify(&self, url: &str, root: &str) -> LinkClass {
        if self.is_product(url) {
            LinkClass::Product
        } else if same_origin(url, root) {
            LinkClass::Traversal
        } else {
            LinkClass::Foreign
        }
    }
}

fn path_matches(patterns: &[ProductPattern], url: &Url) -> bool {
    let Some(segments) = url.path_segments() else {
        return false;
    };
    let segments: Vec<&str> = segments.collect();

    patterns.iter().any(|p| p.matches_segments(&segments))
}

/// Classifies a URL with the default product patterns
///
/// # Examples
///
/// ```
/// use product_trawl::url::is_product;
///
/// assert!(is_product("https://shop.example.com/products/linen-shirt"));
/// assert!(is_product("https://shop.example.com/p-884120?size=m"));
/// assert!(!is_product("https://shop.example.com/collections/shirts"));
/// ```
pub fn is_product(url: &str) -> bool {
    UrlClassifier::default().is_product(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns() {
        let classifier = UrlClassifier::default();
        assert_eq!(classifier.patterns().len(), DEFAULT_PRODUCT_PATTERNS.len());

        assert!(classifier.is_product("https://example.com/products/a"));
        assert!(classifier.is_product("https://example.com/product/a"));
        assert!(classifier.is_product("https://example.com/p/a"));
        assert!(classifier.is_product("https://example.com/item/a"));
        assert!(classifier.is_product("https://example.com/p-a"));
    }

    #[test]
    fn test_non_product_paths() {
        let classifier = UrlClassifier::default();
        assert!(!classifier.is_product("https://example.com/"));
        assert!(!classifier.is_product("https://example.com/collections/all"));
        assert!(!classifier.is_product("https://example.com/products"));
        assert!(!classifier.is_product("https://example.com/pages/products-we-love"));
    }

    #[test]
    fn test_trailing_slash_listing_is_product() {
        let classifier = UrlClassifier::default();
        assert!(classifier.is_product("https://shop.test/products/"));
        assert!(classifier.is_product("https://shop.test/p/"));
        assert!(classifier.is_product("https://shop.test/item/"));
        assert_eq!(
            classifier.classify("https://shop.test/products/", "https://shop.test/"),
            LinkClass::Product
        );
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        let classifier = UrlClassifier::default();
        assert!(!classifier.is_product("https://example.com/search?next=/products/a"));
        assert!(!classifier.is_product("https://example.com/home#/p/a"));
        assert!(classifier.is_product("https://example.com/item/9?ref=home#reviews"));
    }

    #[test]
    fn test_query_identified_products_are_not_detected() {
        let classifier = UrlClassifier::default();
        assert!(!classifier.is_product("https://example.com/view?product_id=42"));
    }

    #[test]
    fn test_opaque_is_not_product() {
        let classifier = UrlClassifier::default();
        assert!(!classifier.is_product("/products/a"));
        assert!(!classifier.is_product("not a url"));
    }

    #[test]
    fn test_custom_patterns() {
        let classifier = UrlClassifier::from_patterns(&["dp", "sku-*"]).unwrap();
        assert!(classifier.is_product("https://example.com/gp/dp/B00X"));
        assert!(classifier.is_product("https://example.com/sku-778"));
        assert!(!classifier.is_product("https://example.com/products/a"));
    }

    #[test]
    fn test_empty_patterns_fall_back_to_default() {
        let empty: Vec<String> = Vec::new();
        let classifier = UrlClassifier::from_patterns(&empty).unwrap();
        assert!(classifier.is_product("https://example.com/products/a"));
    }

    #[test]
    fn test_invalid_custom_pattern() {
        assert!(UrlClassifier::from_patterns(&["*"]).is_err());
    }

    #[test]
    fn test_classify() {
        let classifier = UrlClassifier::default();
        let root = "https://example.com/";

        assert_eq!(
            classifier.classify("https://other.com/products/a", root),
            LinkClass::Product
        );
        assert_eq!(
            classifier.classify("https://example.com/collections", root),
            LinkClass::Traversal
        );
        assert_eq!(
            classifier.classify("https://other.com/collections", root),
            LinkClass::Foreign
        );
        assert_eq!(classifier.classify("garbage", root), LinkClass::Foreign);
    }

    #[test]
    fn test_free_function_matches_default() {
        assert!(is_product("https://example.com/p/1"));
        assert!(!is_product("https://example.com/pp/1"));
    }
}
