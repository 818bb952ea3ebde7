//! Catalog CSV loading.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::models::CatalogRecord;

/// Load catalog records from a CSV file (gzip-compressed if it ends in `.gz`).
///
/// The header row must name the record fields (`id,category,link,...`);
/// `food` is accepted in place of `category`.
/// Rows without a stored `geohash` get one computed at `precision`; rows whose
/// coordinates cannot be parsed in that case are skipped.
pub fn load_records(path: &Path, precision: usize) -> Result<Vec<CatalogRecord>> {
    info!("Loading catalog records from {}", path.display());

    let file = File::open(path).context("Failed to open catalog file")?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut computed = 0usize;
    let mut skipped = 0usize;

    for (row, result) in csv_reader.deserialize::<CatalogRecord>().enumerate() {
        let mut record = result.with_context(|| format!("Malformed catalog row {}", row + 1))?;

        match record.ensure_geohash(precision) {
            Ok(true) => computed += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("Skipping catalog record {}: {}", record.id, e);
                skipped += 1;
                continue;
            }
        }

        records.push(record);
    }

    info!(
        "Loaded {} records ({} keys computed, {} skipped)",
        records.len(),
        computed,
        skipped
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const CSV: &str = "\
id,category,image,link,address,postal_code,google_maps_link,latitude,longitude,formatted_address,geohash
1,Chicken Rice,,https://example.com/1,1 Road,123456,,1.3,103.8,1 Road Singapore,w21z6h8v5
2,Laksa,,https://example.com/2,2 Road,654321,,1.30001,103.80001,2 Road Singapore,
3,Broken,,https://example.com/3,3 Road,000000,,,,3 Road Singapore,
";

    #[test]
    fn test_load_plain_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let records = load_records(file.path(), 9).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].geohash, "w21z6h8v5");
        assert_eq!(records[1].category, "Laksa");
        assert_eq!(records[1].geohash.len(), 9);
        assert!(records[1].geohash.starts_with("w21z6h"));
    }

    #[test]
    fn test_load_gzip_csv() {
        let file = tempfile::Builder::new().suffix(".csv.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(File::create(file.path()).unwrap(), Compression::default());
        encoder.write_all(CSV.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let records = load_records(file.path(), 9).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_load_legacy_food_column() {
        let csv = "\
id,food,image,link,address,postal_code,google_maps_link,latitude,longitude,formatted_address,geohash
11,Char Kway Teow,,https://example.com/11,11 Road,123456,,1.3,103.8,11 Road Singapore,w21z6h8v5
";
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(csv.as_bytes()).unwrap();

        let records = load_records(file.path(), 9).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "Char Kway Teow");
    }

    #[test]
    fn test_missing_file() {
        assert!(load_records(Path::new("/nonexistent/catalog.csv"), 9).is_err());
    }
}
