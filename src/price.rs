use regex::Regex;
use std::sync::LazyLock;

/// Everything that is not a digit or a decimal point gets stripped before
/// numeric parsing.
static NON_PRICE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.]").expect("static pattern is valid"));

/// Extracts a numeric value from a raw price string ("$1,299.95" -> 1299.95).
///
/// Returns 0.0 for empty or unparseable input instead of erroring; a missing
/// price is treated the same as an unknown one downstream.
pub fn parse_price(price_text: &str) -> f64 {
    if price_text.is_empty() {
        return 0.0;
    }

    let cleaned = NON_PRICE_CHARS.replace_all(price_text, "");
    match cleaned.parse::<f64>() {
        Ok(value) => value,
        Err(_) => {
            ::log::warn!("Could not parse price from text: {}", price_text);
            0.0
        }
    }
}

/// Computes the discount percentage of `current` against `original`,
/// rounded to two decimals.
///
/// Returns 0.0 unless `original > 0` and `current < original`, so the
/// result is always in `[0, 100)` and never divides by zero.
pub fn discount(original: f64, current: f64) -> f64 {
    if original > 0.0 && current < original {
        let pct = (original - current) / original * 100.0;
        (pct * 100.0).round() / 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_with_currency_symbol() {
        assert_eq!(parse_price("$49.99"), 49.99);
        assert_eq!(parse_price("USD 120.00"), 120.0);
    }

    #[test]
    fn test_parse_price_with_thousands_separator() {
        assert_eq!(parse_price("$1,299.95"), 1299.95);
        assert_eq!(parse_price("2,000"), 2000.0);
    }

    #[test]
    fn test_parse_price_plain_number() {
        assert_eq!(parse_price("35"), 35.0);
        assert_eq!(parse_price("35.5"), 35.5);
    }

    #[test]
    fn test_parse_price_empty_or_garbage() {
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("Sold Out"), 0.0);
        // Multiple decimal points survive the strip but fail float parsing
        assert_eq!(parse_price("1.2.3"), 0.0);
    }

    #[test]
    fn test_discount_normal_case() {
        assert_eq!(discount(100.0, 60.0), 40.0);
        assert_eq!(discount(89.99, 44.99), 50.01);
    }

    #[test]
    fn test_discount_rounding() {
        // 1/3 off = 33.333..% -> 33.33
        assert_eq!(discount(3.0, 2.0), 33.33);
    }

    #[test]
    fn test_discount_no_markdown() {
        assert_eq!(discount(50.0, 50.0), 0.0);
        assert_eq!(discount(50.0, 60.0), 0.0);
    }

    #[test]
    fn test_discount_degenerate_original() {
        assert_eq!(discount(0.0, 10.0), 0.0);
        assert_eq!(discount(-5.0, 1.0), 0.0);
    }

    #[test]
    fn test_discount_stays_in_range() {
        for (orig, cur) in [(100.0, 0.01), (5.0, 4.99), (1000.0, 999.0)] {
            let d = discount(orig, cur);
            assert!((0.0..100.0).contains(&d), "discount {} out of range", d);
        }
    }
}
