//! Conversion of prediction payloads into model input rows.

use serde_json::{Map, Value};

use crate::ForecastError;

fn invalid(message: impl Into<String>) -> ForecastError {
    ForecastError::InvalidPayload(message.into())
}

fn numeric(value: &Value, feature: &str, row: usize) -> Result<f64, ForecastError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("feature `{feature}` of row {row} is not a finite number"))),
        other => Err(invalid(format!(
            "feature `{feature}` of row {row} must be numeric, got {other}"
        ))),
    }
}

fn row_from_object(object: &Map<String, Value>, features: &[String], row: usize) -> Result<Vec<f64>, ForecastError> {
    features
        .iter()
        .map(|name| {
            let value = object
                .get(name)
                .ok_or_else(|| invalid(format!("row {row} is missing feature `{name}`")))?;
            numeric(value, name, row)
        })
        .collect()
}

fn rows_from_columns(columns: &Map<String, Value>, features: &[String]) -> Result<Vec<Vec<f64>>, ForecastError> {
    let mut selected = Vec::with_capacity(features.len());
    for name in features {
        match columns.get(name) {
            Some(Value::Array(values)) => selected.push((name, values)),
            Some(_) => return Err(invalid(format!("column `{name}` must be a list of values"))),
            None => return Err(invalid(format!("payload is missing feature column `{name}`"))),
        }
    }

    let n_rows = selected.first().map_or(0, |(_, values)| values.len());
    if let Some((name, values)) = selected.iter().find(|(_, values)| values.len() != n_rows) {
        return Err(invalid(format!(
            "column `{name}` has {} values, expected {n_rows}",
            values.len()
        )));
    }

    (0..n_rows)
        .map(|row| {
            selected
                .iter()
                .map(|(name, values)| numeric(&values[row], name, row))
                .collect::<Result<Vec<f64>, _>>()
        })
        .collect()
}

/// Reads the `instances` of a payload as rows in `features` order.
///
/// `instances` is either a list of row objects or an object of equally
/// long columns. Features are matched by name, extra keys are ignored and
/// `null` reads as `0.0`.
pub fn instances_to_rows(payload: &Value, features: &[String]) -> Result<Vec<Vec<f64>>, ForecastError> {
    let instances = payload
        .get("instances")
        .ok_or_else(|| invalid("payload missing 'instances' key"))?;

    match instances {
        Value::Array(rows) => rows
            .iter()
            .enumerate()
            .map(|(idx, row)| match row {
                Value::Object(object) => row_from_object(object, features, idx),
                _ => Err(invalid(format!("row {idx} is not an object"))),
            })
            .collect(),
        Value::Object(columns) => rows_from_columns(columns, features),
        _ => Err(invalid(
            "unsupported payload shape; expected a list of rows or a mapping of columns",
        )),
    }
}
