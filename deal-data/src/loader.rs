//! JSONL ingestion of raw product dumps

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use deal_core::Item;

use crate::error::Result;
use crate::item::{ItemNormalizer, RawProduct};

/// Counts collected while loading one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Non-empty lines read
    pub lines: usize,
    /// Lines that parsed as product records
    pub parsed: usize,
    /// Records that survived normalization
    pub kept: usize,
}

/// Load and normalize every record of a JSONL dump
///
/// Malformed lines and records failing data-quality checks are skipped and
/// only show up in the report.
#[instrument(skip(normalizer), fields(path = %path.as_ref().display()))]
pub fn load_jsonl<P: AsRef<Path>>(
    path: P,
    category: &str,
    normalizer: &ItemNormalizer,
) -> Result<(Vec<Item>, LoadReport)> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut report = LoadReport::default();
    let mut items = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        report.lines += 1;

        let raw: RawProduct = match serde_json::from_str(&line) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Skipping line {}: {}", line_no + 1, e);
                continue;
            }
        };
        report.parsed += 1;

        if let Some(item) = normalizer.normalize(&raw, category)? {
            items.push(item);
        }
    }

    report.kept = items.len();
    info!(
        "Loaded {} items for {} ({} lines, {} parsed)",
        report.kept, category, report.lines, report.parsed
    );
    Ok((items, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemConfig;
    use crate::tokenizer::Tokenizer;
    use std::io::Write;

    fn product_line(price: &str) -> String {
        let description = vec!["sturdy aluminum frame with padded grip"; 40].join(" ");
        serde_json::json!({
            "title": "Trail Bike Pump",
            "description": [description],
            "features": ["fits presta and schrader valves"],
            "details": "{\"Brand\": \"Acme\"}",
            "price": price,
        })
        .to_string()
    }

    #[test]
    fn test_load_jsonl_reports_counts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", product_line("24.99")).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", product_line("None")).unwrap();
        writeln!(file, "{}", product_line("5000")).unwrap();

        let normalizer = ItemNormalizer::new(Tokenizer::Words, ItemConfig::default());
        let (items, report) = load_jsonl(file.path(), "Sports", &normalizer).unwrap();

        assert_eq!(report.lines, 4);
        assert_eq!(report.parsed, 3);
        assert_eq!(report.kept, 1);
        assert_eq!(items[0].category, "Sports");
        assert_eq!(items[0].price, 24.99);
    }

    #[test]
    fn test_missing_file() {
        let normalizer = ItemNormalizer::new(Tokenizer::Words, ItemConfig::default());
        assert!(load_jsonl("/nonexistent/file.jsonl", "Sports", &normalizer).is_err());
    }
}
