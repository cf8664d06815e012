//! CSS selectors for the 6pm.com results page, kept in one place.
//!
//! The site ships obfuscated class names that rotate with frontend deploys.
//! When extraction starts coming back empty, capture the page source, update
//! the selectors here, and adjust the extractor tests.

/// Site identity stamped into every record.
pub const SITE_URL: &str = "www.6pm.com";

/// Origin used to qualify relative product links.
pub const BASE_ORIGIN: &str = "https://www.6pm.com";

/// One product card in the results grid.
pub const PRODUCT_CARD: &str = "article[data-style-id]";

/// Container shown when a search has no matches.
pub const NO_RESULTS: &str = "div._-z";

/// Text expected inside [`NO_RESULTS`] (lowercased before matching).
pub const NO_RESULTS_TEXT: &str = "no results found";

/// Either the grid or the no-results container; whichever appears first
/// means the page finished rendering.
pub const PAGE_READY: &str = "article[data-style-id], div._-z";

/// Primary link inside a product card.
pub const PRODUCT_LINK: &str = "a.NR-z";

/// Brand name inside a product card.
pub const BRAND: &str = "dd.OR-z span";

/// Product title inside a product card.
pub const TITLE: &str = "dd.PR-z";

/// Lead image inside a product card's figure.
pub const IMAGE: &str = "figure img.Jn-z";

/// Current (sale) price.
pub const CURRENT_PRICE: &str = "span.c--z";

/// Original (MSRP) price; absent when the item is not marked down.
pub const ORIGINAL_PRICE: &str = "span.g--z";

/// Container for the pagination links.
pub const PAGINATION: &str = "span.ro-z";

/// Link that navigates from page `n` to page `n + 1`.
///
/// The site's hrefs carry a zero-based page parameter: the link to page 2
/// contains `&p=1`, so the link out of page `n` contains `&p=n`.
pub fn next_page_link(current_page: u32) -> String {
    format!("a[href*='&p={}']", current_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_link_is_zero_based() {
        assert_eq!(next_page_link(1), "a[href*='&p=1']");
        assert_eq!(next_page_link(4), "a[href*='&p=4']");
    }

    #[test]
    fn test_page_ready_covers_both_markers() {
        assert!(PAGE_READY.contains(PRODUCT_CARD));
        assert!(PAGE_READY.contains(NO_RESULTS));
    }
}
