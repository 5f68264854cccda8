use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DeclineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    EngagementRate,
    SentimentScore,
    InfluencerRatio,
    SaturationScore,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::EngagementRate,
        Metric::SentimentScore,
        Metric::InfluencerRatio,
        Metric::SaturationScore,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Metric::EngagementRate => "engagement_rate",
            Metric::SentimentScore => "sentiment_score",
            Metric::InfluencerRatio => "influencer_ratio",
            Metric::SaturationScore => "saturation_score",
        }
    }
}

/// One chronological observation. Metric columns are optional so that a
/// table can carry only the metrics it has.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub trend_name: Option<String>,
    #[serde(default)]
    pub engagement_rate: Option<f64>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub influencer_ratio: Option<f64>,
    #[serde(default)]
    pub saturation_score: Option<f64>,
}

impl TrendRow {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::EngagementRate => self.engagement_rate,
            Metric::SentimentScore => self.sentiment_score,
            Metric::InfluencerRatio => self.influencer_ratio,
            Metric::SaturationScore => self.saturation_score,
        }
    }
}

/// Chronologically ordered rows for one trend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendTable {
    pub rows: Vec<TrendRow>,
}

impl TrendTable {
    pub fn new(rows: Vec<TrendRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, metric: Metric) -> bool {
        self.rows.iter().any(|row| row.value(metric).is_some())
    }

    /// Extracts one metric column. The column must exist, be present on every
    /// row and hold finite values.
    pub fn series(&self, metric: Metric) -> Result<MetricSeries, DeclineError> {
        if self.rows.is_empty() {
            return Err(DeclineError::EmptySeries(metric.column()));
        }
        if !self.has_column(metric) {
            return Err(DeclineError::MissingColumn(metric.column()));
        }

        let mut points = Vec::with_capacity(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            let value = row.value(metric).ok_or_else(|| {
                DeclineError::InvalidInput(format!(
                    "column '{}' has no value at row {}",
                    metric.column(),
                    index + 1
                ))
            })?;
            if !value.is_finite() {
                return Err(DeclineError::InvalidInput(format!(
                    "column '{}' has a non-finite value at row {}",
                    metric.column(),
                    index + 1
                )));
            }
            points.push(SeriesPoint {
                date: row.date.clone(),
                value,
            });
        }

        MetricSeries::new(metric, points)
    }

    pub fn trend_name(&self) -> Option<&str> {
        self.rows
            .iter()
            .find_map(|row| row.trend_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    pub fn first_date(&self) -> Option<&str> {
        self.rows.iter().find_map(|row| row.date.as_deref())
    }

    pub fn last_date(&self) -> Option<&str> {
        self.rows.iter().rev().find_map(|row| row.date.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: Option<String>,
    pub value: f64,
}

/// A non-empty ordered sequence of observations for a single metric.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    metric: Metric,
    points: Vec<SeriesPoint>,
}

impl MetricSeries {
    pub fn new(metric: Metric, points: Vec<SeriesPoint>) -> Result<Self, DeclineError> {
        if points.is_empty() {
            return Err(DeclineError::EmptySeries(metric.column()));
        }
        Ok(Self { metric, points })
    }

    pub fn from_values(metric: Metric, values: &[f64]) -> Result<Self, DeclineError> {
        let points = values
            .iter()
            .map(|value| SeriesPoint {
                date: None,
                value: *value,
            })
            .collect();
        MetricSeries::new(metric, points)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.value).collect()
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }
}

/// Flat mapping of named scalar fields for single-snapshot analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotMetrics {
    fields: BTreeMap<String, f64>,
}

impl SnapshotMetrics {
    pub fn new(fields: BTreeMap<String, f64>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.fields.get(key).copied().filter(|value| value.is_finite())
    }

    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: &str, value: f64) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The accepted input shapes, resolved once at the boundary.
#[derive(Debug, Clone)]
pub enum SignalInput {
    Series(TrendTable),
    Snapshot(SnapshotMetrics),
}

impl SignalInput {
    pub fn data_points(&self) -> usize {
        match self {
            SignalInput::Series(table) => table.len(),
            SignalInput::Snapshot(_) => 1,
        }
    }

    pub fn as_series(&self) -> Option<&TrendTable> {
        match self {
            SignalInput::Series(table) => Some(table),
            SignalInput::Snapshot(_) => None,
        }
    }
}
