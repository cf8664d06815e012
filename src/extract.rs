//! Maps one rendered product node to a [`ProductRecord`].
//!
//! Field lookups are independently defensive: a missing sub-element
//! defaults its field and never blocks the others. Only two things abort
//! an item: the node going stale mid-read (skip the item) and the session
//! dying underneath the read (escalated by the caller).

use crate::error::{ExtractFault, is_session_fault, is_stale};
use crate::price;
use crate::results::{ProductRecord, UNKNOWN};
use crate::selectors;
use fantoccini::Locator;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use url::Url;

/// Raw field values read off one product node, before interpretation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub href: Option<String>,
    pub brand: Option<String>,
    pub title: Option<String>,
    pub image: Option<String>,
    pub current_price_text: Option<String>,
    pub original_price_text: Option<String>,
}

/// Extracts one product record from a live grid node.
pub async fn extract_product(item: &Element) -> Result<ProductRecord, ExtractFault> {
    let raw = read_raw(item).await?;
    Ok(assemble(raw))
}

/// Reads every sub-field off the node. Field order matches the record's
/// column order; each lookup degrades to `None` on a missing element.
async fn read_raw(item: &Element) -> Result<RawItem, ExtractFault> {
    Ok(RawItem {
        href: sub_attr(item, selectors::PRODUCT_LINK, "href").await?,
        brand: sub_text(item, selectors::BRAND, "brand").await?,
        title: sub_text(item, selectors::TITLE, "title").await?,
        image: sub_attr(item, selectors::IMAGE, "src").await?,
        current_price_text: sub_text(item, selectors::CURRENT_PRICE, "current price").await?,
        original_price_text: sub_text(item, selectors::ORIGINAL_PRICE, "original price").await?,
    })
}

/// Turns raw field values into a finished record, applying defaults and
/// the missing-original-price rule.
pub fn assemble(raw: RawItem) -> ProductRecord {
    let mut record = ProductRecord::unknown(selectors::SITE_URL);

    if let Some(href) = raw.href {
        record.product_url = qualify_url(&href);
    }
    if let Some(brand) = raw.brand {
        record.brand = brand;
    }
    if let Some(title) = raw.title {
        record.title = title;
    }
    if let Some(image) = raw.image {
        record.image_url = image;
    }
    if let Some(text) = raw.current_price_text {
        record.current_price = price::parse_price(&text);
    }

    // No original-price element means the item is not marked down: treat
    // the current price as the original so the discount computes to zero.
    record.original_price = match raw.original_price_text {
        Some(text) => price::parse_price(&text),
        None => record.current_price,
    };
    record.discount_percent = price::discount(record.original_price, record.current_price);

    record
}

/// Qualifies a possibly-relative href against the site origin.
fn qualify_url(href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    Url::parse(selectors::BASE_ORIGIN)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| UNKNOWN.to_string())
}

async fn sub_text(
    item: &Element,
    css: &str,
    what: &str,
) -> Result<Option<String>, ExtractFault> {
    match item.find(Locator::Css(css)).await {
        Ok(el) => match el.text().await {
            Ok(text) => Ok(Some(text.trim().to_string())),
            Err(e) => degrade(e, what),
        },
        Err(e) => degrade(e, what),
    }
}

async fn sub_attr(
    item: &Element,
    css: &str,
    attr: &str,
) -> Result<Option<String>, ExtractFault> {
    match item.find(Locator::Css(css)).await {
        Ok(el) => match el.attr(attr).await {
            Ok(value) => Ok(value),
            Err(e) => degrade(e, css),
        },
        Err(e) => degrade(e, css),
    }
}

/// Sorts a sub-lookup error into: skip-this-item (stale), kill-the-run
/// (session), or default-the-field (everything else).
fn degrade(e: CmdError, what: &str) -> Result<Option<String>, ExtractFault> {
    if is_stale(&e) {
        return Err(ExtractFault::Stale);
    }
    if is_session_fault(&e) {
        return Err(ExtractFault::Session(e));
    }
    if e.is_no_such_element() {
        ::log::debug!("{} element not found", what);
    } else {
        ::log::warn!("Failed to read {}: {}", what, e);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_raw() -> RawItem {
        RawItem {
            href: Some("/p/nine-west-pump/product/9000001".to_string()),
            brand: Some("Nine West".to_string()),
            title: Some("Tatiana Pump".to_string()),
            image: Some("https://m.media.6pm.com/images/tatiana.jpg".to_string()),
            current_price_text: Some("$29.99".to_string()),
            original_price_text: Some("$59.99".to_string()),
        }
    }

    #[test]
    fn test_assemble_full_item() {
        let record = assemble(full_raw());
        assert_eq!(record.brand, "Nine West");
        assert_eq!(record.title, "Tatiana Pump");
        assert_eq!(record.current_price, 29.99);
        assert_eq!(record.original_price, 59.99);
        assert_eq!(record.discount_percent, 50.0);
        assert_eq!(
            record.product_url,
            "https://www.6pm.com/p/nine-west-pump/product/9000001"
        );
        assert_eq!(record.site_url, "www.6pm.com");
    }

    #[test]
    fn test_missing_original_price_backfills_current() {
        let raw = RawItem {
            original_price_text: None,
            ..full_raw()
        };
        let record = assemble(raw);
        assert_eq!(record.original_price, record.current_price);
        assert_eq!(record.discount_percent, 0.0);
    }

    #[test]
    fn test_absolute_href_kept_as_is() {
        let raw = RawItem {
            href: Some("https://www.6pm.com/p/x".to_string()),
            ..full_raw()
        };
        assert_eq!(assemble(raw).product_url, "https://www.6pm.com/p/x");
    }

    #[test]
    fn test_missing_fields_default_without_blocking_others() {
        let raw = RawItem {
            href: None,
            brand: None,
            image: None,
            ..full_raw()
        };
        let record = assemble(raw);
        assert_eq!(record.product_url, UNKNOWN);
        assert_eq!(record.brand, UNKNOWN);
        assert_eq!(record.image_url, UNKNOWN);
        // The present fields still came through.
        assert_eq!(record.title, "Tatiana Pump");
        assert_eq!(record.current_price, 29.99);
    }

    #[test]
    fn test_empty_raw_is_fully_unknown() {
        let record = assemble(RawItem::default());
        assert_eq!(record, ProductRecord::unknown(selectors::SITE_URL));
    }

    #[test]
    fn test_unparseable_prices_parse_to_zero() {
        let raw = RawItem {
            current_price_text: Some("MSRP".to_string()),
            original_price_text: Some("".to_string()),
            ..full_raw()
        };
        let record = assemble(raw);
        assert_eq!(record.current_price, 0.0);
        assert_eq!(record.original_price, 0.0);
        assert_eq!(record.discount_percent, 0.0);
    }
}
