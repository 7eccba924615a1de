use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ParseError;

/// Reads CSV bytes into row maps keyed by the header row. Ragged rows are
/// tolerated and rows with no non-empty cell are dropped. An unreadable
/// header is structural and errors out; an unreadable record is skipped
/// with a warning.
pub fn read_rows(bytes: &[u8]) -> Result<(Vec<String>, Vec<Map<String, Value>>), ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(row = idx, "skipping unreadable CSV record: {}", e);
                continue;
            }
        };
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let cell = record.get(i).unwrap_or("");
            row.insert(header.clone(), Value::String(cell.to_string()));
        }
        rows.push(row);
    }

    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_row_becomes_keys() {
        let bytes = b"Symbol,Qty,Price\nAAPL,10,100.5\nMSFT,5,300\n";
        let (headers, rows) = read_rows(bytes).unwrap();
        assert_eq!(headers, vec!["Symbol", "Qty", "Price"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Symbol").unwrap(), "AAPL");
        assert_eq!(rows[1].get("Price").unwrap(), "300");
    }

    #[test]
    fn test_empty_and_ragged_rows() {
        let bytes = b"Symbol,Qty,Price\n,,\nAAPL,10\n";
        let (_, rows) = read_rows(bytes).unwrap();
        // the all-empty row disappears, the ragged one pads out
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Price").unwrap(), "");
    }
}
