use serde::{Deserialize, Serialize};
use std::path::Path;

/// Marker used when a text or URL field cannot be located on the page.
/// Records always carry every field so downstream consumers see a fixed
/// shape.
pub const UNKNOWN: &str = "N/A";

/// One product as observed on a results page.
///
/// Created once during a page's extraction pass and immutable afterwards.
/// Invariant: `original_price >= current_price` whenever both are known; a
/// missing original price is backfilled with the current price, which makes
/// the discount 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub brand: String,
    pub title: String,
    pub current_price: f64,
    pub original_price: f64,
    pub discount_percent: f64,
    pub product_url: String,
    pub image_url: String,
    pub site_url: String,
}

impl ProductRecord {
    /// Column names in spreadsheet order. The storage sink writes these as
    /// the header row on first use.
    pub const FIELDS: [&'static str; 8] = [
        "brand",
        "title",
        "current_price",
        "original_price",
        "discount_percent",
        "product_url",
        "image_url",
        "site_url",
    ];

    /// A record with every field set to its explicit unknown marker.
    /// Extraction starts from this and fills in whatever it can find.
    pub fn unknown(site_url: &str) -> Self {
        Self {
            brand: UNKNOWN.to_string(),
            title: UNKNOWN.to_string(),
            current_price: 0.0,
            original_price: 0.0,
            discount_percent: 0.0,
            product_url: UNKNOWN.to_string(),
            image_url: UNKNOWN.to_string(),
            site_url: site_url.to_string(),
        }
    }

    /// Field values as strings, in [`Self::FIELDS`] order.
    pub fn row(&self) -> Vec<String> {
        vec![
            self.brand.clone(),
            self.title.clone(),
            format!("{}", self.current_price),
            format!("{}", self.original_price),
            format!("{}", self.discount_percent),
            self.product_url.clone(),
            self.image_url.clone(),
            self.site_url.clone(),
        ]
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Pagination ended naturally: page limit, no-results marker, or a
    /// missing next-page link.
    Completed,
    /// The run died mid-flight. Whatever was collected before the fault is
    /// still in `records`.
    Failed(String),
}

/// Accumulated output of one run: records in strict page order (DOM order
/// within a page) plus counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub records: Vec<ProductRecord>,
    pub pages_visited: u32,
    pub alerts_sent: u32,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            pages_visited: 0,
            alerts_sent: 0,
            outcome: RunOutcome::Completed,
        }
    }

    /// Dumps the full record list as pretty-printed JSON. This local
    /// artifact is written regardless of whether the sinks succeeded.
    pub fn write_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_record_shape() {
        let record = ProductRecord::unknown("www.6pm.com");
        assert_eq!(record.brand, UNKNOWN);
        assert_eq!(record.title, UNKNOWN);
        assert_eq!(record.product_url, UNKNOWN);
        assert_eq!(record.image_url, UNKNOWN);
        assert_eq!(record.current_price, 0.0);
        assert_eq!(record.original_price, 0.0);
        assert_eq!(record.discount_percent, 0.0);
        assert_eq!(record.site_url, "www.6pm.com");
    }

    #[test]
    fn test_row_matches_field_order() {
        let mut record = ProductRecord::unknown("www.6pm.com");
        record.brand = "Nine West".to_string();
        record.current_price = 29.99;
        let row = record.row();
        assert_eq!(row.len(), ProductRecord::FIELDS.len());
        assert_eq!(row[0], "Nine West");
        assert_eq!(row[2], "29.99");
        assert_eq!(row[7], "www.6pm.com");
    }

    #[test]
    fn test_report_json_round_trip() {
        let mut report = RunReport::new();
        report.records.push(ProductRecord::unknown("www.6pm.com"));
        report.pages_visited = 1;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        report.write_json(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<ProductRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, report.records);
    }
}
