//! Feature extractor crate for the demand forecast model.
//!
//! This crate enriches ordered seller sales records with the derived ratios
//! used by forecasting: revenue per unit, ad efficiency and stockout risk.
//! Every ratio with a zero or missing denominator resolves to `0.0`, so the
//! resulting frame never carries `NaN` or infinite values.

use sales_structs::SalesRecord;

/// Number of rows (current row included) summed for the stockout risk ratio.
pub const STOCKOUT_WINDOW: usize = 7;

/// Number of numeric features a row contributes to the model.
/// This includes:
/// - Base columns: net revenue, ad spend, inventory on hand = 3
/// - Derived ratios: revenue per unit, ad efficiency, stockout risk = 3
///
/// `units_sold` is the training target and never a feature.
pub const FEATURE_COUNT: usize = 6;

/// Column names matching the order of [`FeatureRow::numeric_features`].
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "net_revenue",
    "ad_spend",
    "inventory_on_hand",
    "revenue_per_unit",
    "ad_efficiency",
    "stockout_risk",
];

/// A sales record augmented with its derived ratios.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub record: SalesRecord,
    /// Net revenue divided by units sold (at least one unit).
    pub revenue_per_unit: f64,
    /// Net revenue divided by ad spend.
    pub ad_efficiency: f64,
    /// Trailing units sold divided by inventory on hand.
    pub stockout_risk: f64,
}

impl FeatureRow {
    /// Numeric feature values in [`FEATURE_NAMES`] order, missing values as `0.0`.
    #[must_use]
    pub fn numeric_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.record.net_revenue,
            self.record.ad_spend.unwrap_or(0.0),
            self.record.inventory_on_hand.map_or(0.0, f64::from),
            self.revenue_per_unit,
            self.ad_efficiency,
            self.stockout_risk,
        ]
    }

    /// Training target for this row.
    #[must_use]
    pub fn target(&self) -> f64 {
        f64::from(self.record.units_sold)
    }
}

/// Ordered sequence of feature rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    #[must_use]
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The underlying records, in frame order.
    #[must_use]
    pub fn to_records(&self) -> Vec<SalesRecord> {
        self.rows.iter().map(|row| row.record.clone()).collect()
    }
}

/// Enriches records with derived ratios, preserving row count and order.
///
/// The stockout window trails over the sequence as given; callers pass rows
/// for a single SKU ordered by date.
#[must_use]
pub fn build_feature_frame(records: &[SalesRecord]) -> FeatureFrame {
    let rows = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let window_start = (idx + 1).saturating_sub(STOCKOUT_WINDOW);
            let trailing_units: f64 = records[window_start..=idx]
                .iter()
                .map(|r| f64::from(r.units_sold))
                .sum();

            FeatureRow {
                revenue_per_unit: ratio(record.net_revenue, f64::from(record.units_sold.max(1))),
                ad_efficiency: ratio(record.net_revenue, record.ad_spend.unwrap_or(0.0)),
                stockout_risk: ratio(
                    trailing_units,
                    record.inventory_on_hand.map_or(0.0, f64::from),
                ),
                record: record.clone(),
            }
        })
        .collect();

    FeatureFrame { rows }
}

/// Division that resolves undefined results to `0.0`.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() { value } else { 0.0 }
}
