use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DeclineError;
use crate::series::{Metric, SignalInput, SnapshotMetrics, TrendRow, TrendTable};

/// Reads a CSV or JSON file into an analysis input. Files ending in `.csv`
/// are parsed as a header row plus one row per observation.
pub fn load_input(path: &Path) -> Result<SignalInput, DeclineError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let reader = csv::Reader::from_path(path)?;
        return read_csv(reader);
    }

    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    parse_input(value)
}

pub fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<SignalInput, DeclineError> {
    let mut rows = Vec::new();
    for record in reader.deserialize::<TrendRow>() {
        rows.push(record?);
    }
    if rows.is_empty() {
        return Err(DeclineError::InvalidInput("csv input has no rows".to_string()));
    }
    Ok(SignalInput::Series(TrendTable::new(rows)))
}

/// Resolves a JSON payload into a series table or a snapshot.
///
/// Accepted shapes: an array of row objects, an object with a `data` array of
/// rows (and optional `trend_name`), an object of equally long column arrays,
/// or a flat object of numeric fields (snapshot mode).
pub fn parse_input(value: Value) -> Result<SignalInput, DeclineError> {
    match value {
        Value::Array(items) => Ok(SignalInput::Series(rows_from_array(items, None)?)),
        Value::Object(map) => parse_object(map),
        other => Err(DeclineError::InvalidInput(format!(
            "expected a time series or a snapshot mapping, got {}",
            json_kind(&other)
        ))),
    }
}

fn parse_object(mut map: Map<String, Value>) -> Result<SignalInput, DeclineError> {
    let name = map
        .get("trend_name")
        .and_then(Value::as_str)
        .map(str::to_string);
    if name.is_some() {
        map.remove("trend_name");
    }

    match map.remove("data") {
        Some(Value::Array(items)) => {
            return Ok(SignalInput::Series(rows_from_array(items, name)?));
        }
        Some(other) => {
            return Err(DeclineError::InvalidInput(format!(
                "'data' must be an array of rows, got {}",
                json_kind(&other)
            )))
        }
        None => {}
    }

    if map.is_empty() {
        return Err(DeclineError::InvalidInput("input mapping is empty".to_string()));
    }

    if map.values().all(|value| value.is_array()) {
        let mut table = rows_from_columns(map)?;
        for row in table.rows.iter_mut().filter(|row| row.trend_name.is_none()) {
            row.trend_name = name.clone();
        }
        return Ok(SignalInput::Series(table));
    }

    let mut fields = BTreeMap::new();
    for (key, value) in map {
        match value {
            Value::Number(number) => {
                let parsed = number.as_f64().ok_or_else(|| {
                    DeclineError::InvalidInput(format!("field '{}' is not a finite number", key))
                })?;
                fields.insert(key, parsed);
            }
            Value::String(_) | Value::Null | Value::Bool(_) => continue,
            other => {
                return Err(DeclineError::InvalidInput(format!(
                    "snapshot field '{}' must be a number, got {}",
                    key,
                    json_kind(&other)
                )))
            }
        }
    }

    if fields.is_empty() {
        return Err(DeclineError::InvalidInput(
            "snapshot mapping has no numeric fields".to_string(),
        ));
    }
    Ok(SignalInput::Snapshot(SnapshotMetrics::new(fields)))
}

fn rows_from_array(items: Vec<Value>, trend_name: Option<String>) -> Result<TrendTable, DeclineError> {
    if items.is_empty() {
        return Err(DeclineError::InvalidInput("time series has no rows".to_string()));
    }
    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(DeclineError::InvalidInput(format!(
                "row {} must be an object, got {}",
                index + 1,
                json_kind(&item)
            )));
        }
        let mut row: TrendRow = serde_json::from_value(item).map_err(|err| {
            DeclineError::InvalidInput(format!("row {} is malformed: {}", index + 1, err))
        })?;
        if row.trend_name.is_none() {
            row.trend_name = trend_name.clone();
        }
        rows.push(row);
    }
    Ok(TrendTable::new(rows))
}

fn rows_from_columns(map: Map<String, Value>) -> Result<TrendTable, DeclineError> {
    let mut length = None;
    for (key, value) in &map {
        let len = value.as_array().map(|items| items.len()).unwrap_or(0);
        match length {
            None => length = Some(len),
            Some(expected) if expected != len => {
                return Err(DeclineError::InvalidInput(format!(
                    "column '{}' has {} values, expected {}",
                    key, len, expected
                )))
            }
            _ => {}
        }
    }

    let length = length.unwrap_or(0);
    if length == 0 {
        return Err(DeclineError::InvalidInput("time series has no rows".to_string()));
    }

    let mut rows = vec![TrendRow::default(); length];
    for (key, value) in map {
        let items = match value {
            Value::Array(items) => items,
            _ => continue,
        };
        let metric = Metric::ALL.into_iter().find(|metric| metric.column() == key);
        for (index, item) in items.into_iter().enumerate() {
            let row = &mut rows[index];
            match (key.as_str(), metric) {
                ("date", _) => row.date = item.as_str().map(|value| value.to_string()),
                ("trend_name", _) => row.trend_name = item.as_str().map(|value| value.to_string()),
                (_, Some(metric)) => {
                    let number = item.as_f64().ok_or_else(|| {
                        DeclineError::InvalidInput(format!(
                            "column '{}' has a non-numeric value at row {}",
                            key,
                            index + 1
                        ))
                    })?;
                    set_metric(row, metric, number);
                }
                _ => {}
            }
        }
    }

    Ok(TrendTable::new(rows))
}

fn set_metric(row: &mut TrendRow, metric: Metric, value: f64) {
    match metric {
        Metric::EngagementRate => row.engagement_rate = Some(value),
        Metric::SentimentScore => row.sentiment_score = Some(value),
        Metric::InfluencerRatio => row.influencer_ratio = Some(value),
        Metric::SaturationScore => row.saturation_score = Some(value),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
