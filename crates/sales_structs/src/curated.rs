//! Curated (schema-normalized) row layout written by the curation step.

use serde_json::{Map, Value};

use crate::{SalesRecord, ValidationError};

/// A single curated row as stored in the curated bucket.
pub type CuratedRow = Map<String, Value>;

/// Ingestion-facing column name paired with its curated name.
pub const CURATED_RENAMES: [(&str, &str); 2] = [
    ("net_revenue", "net_revenue_usd"),
    ("ad_spend", "ad_spend_usd"),
];

/// Converts a validated record into its curated layout.
///
/// Monetary columns gain a currency suffix and `sale_date` is added as the
/// partition column.
#[must_use]
pub fn to_curated_row(record: &SalesRecord) -> CuratedRow {
    let mut row = match serde_json::to_value(record) {
        Ok(Value::Object(row)) => row,
        _ => Map::new(),
    };
    for (ingest, curated) in CURATED_RENAMES {
        if let Some(value) = row.remove(ingest) {
            row.insert(curated.to_string(), value);
        }
    }
    row.insert(
        "sale_date".to_string(),
        Value::String(record.date.format("%Y-%m-%d").to_string()),
    );
    row
}

/// Maps curated column names back to the names the trainer expects.
pub fn rename_curated_columns(row: &mut CuratedRow) {
    for (ingest, curated) in CURATED_RENAMES {
        if let Some(value) = row.remove(curated) {
            row.insert(ingest.to_string(), value);
        }
    }
}

/// Reads a record from a row that already carries trainer column names.
///
/// Columns the record does not know about are ignored.
pub fn record_from_row(index: usize, row: CuratedRow) -> Result<SalesRecord, ValidationError> {
    let record: SalesRecord = serde_json::from_value(Value::Object(row))
        .map_err(|source| ValidationError::Malformed { index, source })?;
    record.validate().map_err(|err| err.at(index))?;
    Ok(record)
}

/// Parses one curated partition.
///
/// `.jsonl` partitions hold one row object per line, anything else is read
/// as a JSON array of row objects.
pub fn parse_curated_rows(bytes: &[u8], newline_delimited: bool) -> Result<Vec<CuratedRow>, ValidationError> {
    if newline_delimited {
        return bytes
            .split(|b| *b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .enumerate()
            .map(|(index, line)| {
                serde_json::from_slice(line)
                    .map_err(|source| ValidationError::Malformed { index, source })
            })
            .collect();
    }

    let value: Value = serde_json::from_slice(bytes).map_err(ValidationError::Json)?;
    let Value::Array(items) = value else {
        return Err(ValidationError::NotAList);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|source| ValidationError::Malformed { index, source })
        })
        .collect()
}

/// Serializes rows as newline-delimited JSON.
pub fn to_json_lines(rows: &[CuratedRow]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.push(b'\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn record() -> SalesRecord {
        SalesRecord {
            seller_id: "seller-123".to_string(),
            sku: "SKU-001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            units_sold: 10,
            net_revenue: 200.0,
            ad_spend: Some(20.0),
            inventory_on_hand: Some(50),
        }
    }

    #[test]
    fn test_curated_row_uses_suffixed_columns() {
        let row = to_curated_row(&record());
        assert_eq!(row.get("net_revenue_usd"), Some(&json!(200.0)));
        assert_eq!(row.get("ad_spend_usd"), Some(&json!(20.0)));
        assert_eq!(row.get("sale_date"), Some(&json!("2024-02-01")));
        assert!(!row.contains_key("net_revenue"));
    }

    #[test]
    fn test_renaming_restores_the_original_record() {
        let mut row = to_curated_row(&record());
        rename_curated_columns(&mut row);
        let parsed = record_from_row(0, row).unwrap();
        assert_eq!(parsed, record());
    }

    #[test]
    fn test_json_lines_round_trip_skips_blank_lines() {
        let rows = vec![to_curated_row(&record()), to_curated_row(&record())];
        let mut bytes = to_json_lines(&rows).unwrap();
        bytes.extend_from_slice(b"\n\n");
        let parsed = parse_curated_rows(&bytes, true).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_array_partition_must_hold_objects() {
        let err = parse_curated_rows(br#"[1, 2]"#, false).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { index: 0, .. }));
    }
}
