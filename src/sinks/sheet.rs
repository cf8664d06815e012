use super::StorageSink;
use crate::results::ProductRecord;
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Local spreadsheet store: a CSV file with a header row written on first
/// use and data rows appended on every hand-off, mirroring the append
/// semantics of a remote sheet. A hosted implementation can replace this
/// behind the same trait without touching the retrieval loop.
pub struct CsvSheet {
    path: PathBuf,
}

impl CsvSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn try_append(&self, records: &[ProductRecord]) -> std::io::Result<()> {
        let need_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if need_header {
            let header: Vec<String> = ProductRecord::FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect();
            file.write_all(csv_row(&header).as_bytes())?;
        }

        for record in records {
            file.write_all(csv_row(&record.row()).as_bytes())?;
        }
        file.flush()
    }
}

#[async_trait]
impl StorageSink for CsvSheet {
    async fn append_all(&self, records: &[ProductRecord]) {
        if records.is_empty() {
            ::log::info!("No records to store, skipping spreadsheet update");
            return;
        }
        match self.try_append(records) {
            Ok(()) => ::log::info!(
                "Appended {} rows to {}",
                records.len(),
                self.path.display()
            ),
            Err(e) => ::log::error!(
                "Failed to append rows to {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Quotes a field when it contains the delimiter, a quote, or a line
/// break; embedded quotes are doubled.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(title: &str) -> ProductRecord {
        let mut record = ProductRecord::unknown("www.6pm.com");
        record.brand = "SKECHERS".to_string();
        record.title = title.to_string();
        record.current_price = 35.99;
        record.original_price = 60.0;
        record.discount_percent = 40.02;
        record
    }

    #[tokio::test]
    async fn test_header_written_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.csv");
        let sheet = CsvSheet::new(&path);

        sheet.append_all(&[sample_record("Go Walk")]).await;
        sheet.append_all(&[sample_record("Arch Fit")]).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ProductRecord::FIELDS.join(","));
        assert!(lines[1].contains("Go Walk"));
        assert!(lines[2].contains("Arch Fit"));
    }

    #[tokio::test]
    async fn test_empty_hand_off_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.csv");
        CsvSheet::new(&path).append_all(&[]).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_fields_with_delimiters_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.csv");
        CsvSheet::new(&path)
            .append_all(&[sample_record("Pump, \"Patent\" Leather")])
            .await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"Pump, \"\"Patent\"\" Leather\""));
    }

    #[test]
    fn test_csv_field_plain_value_unquoted() {
        assert_eq!(csv_field("SKECHERS"), "SKECHERS");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
    }
}
