use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// A single seller sales record, one per seller, SKU and day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Pseudonymized seller identifier
    pub seller_id: String,
    pub sku: String,
    pub date: NaiveDate,
    pub units_sold: u32,
    pub net_revenue: f64,
    #[serde(default)]
    pub ad_spend: Option<f64>,
    #[serde(default)]
    pub inventory_on_hand: Option<u32>,
}

impl SalesRecord {
    /// Checks the invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.seller_id.trim().is_empty() {
            return Err(ValidationError::Missing { field: "seller_id" });
        }
        if self.sku.trim().is_empty() {
            return Err(ValidationError::Missing { field: "sku" });
        }
        check_non_negative("net_revenue", self.net_revenue)?;
        if let Some(ad_spend) = self.ad_spend {
            check_non_negative("ad_spend", ad_spend)?;
        }
        Ok(())
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

/// Parses and validates a JSON array of sales records.
///
/// A blank body is [`ValidationError::EmptyPayload`] rather than a JSON error.
pub fn parse_sales_payload(body: &[u8]) -> Result<Vec<SalesRecord>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::EmptyPayload);
    }
    let value: serde_json::Value = serde_json::from_slice(body).map_err(ValidationError::Json)?;
    let serde_json::Value::Array(items) = value else {
        return Err(ValidationError::NotAList);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let record: SalesRecord = serde_json::from_value(item)
                .map_err(|source| ValidationError::Malformed { index, source })?;
            record.validate().map_err(|err| err.at(index))?;
            Ok(record)
        })
        .collect()
}
