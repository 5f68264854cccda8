use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::stats;
use super::{RiskLevel, Signal, SignalExtractor, SignalKind, SignalSummary};
use crate::error::DeclineError;
use crate::series::{Metric, SignalInput, SnapshotMetrics};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationConfig {
    pub velocity_window: usize,
    pub fatigue_threshold: f64,
    pub critical_threshold: f64,
    pub safe_threshold: f64,
    pub peak_threshold: f64,
    pub max_days_to_peak: u32,
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self {
            velocity_window: 7,
            fatigue_threshold: 70.0,
            critical_threshold: 85.0,
            safe_threshold: 50.0,
            peak_threshold: 95.0,
            max_days_to_peak: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBreach {
    pub threshold: String,
    pub value: f64,
    /// 1-based index of the first observation at or above `value`.
    pub day: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepetitionRisk {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RepetitionRisk {
    pub fn label(self) -> &'static str {
        match self {
            RepetitionRisk::Low => "Low",
            RepetitionRisk::Moderate => "Moderate",
            RepetitionRisk::High => "High",
            RepetitionRisk::Extreme => "Extreme",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaturationStage {
    #[serde(rename = "Early Stage")]
    EarlyStage,
    #[serde(rename = "Growing Market")]
    GrowingMarket,
    #[serde(rename = "Moderate Saturation")]
    Moderate,
    #[serde(rename = "High Saturation")]
    High,
    #[serde(rename = "Peak Saturation")]
    Peak,
}

impl SaturationStage {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            SaturationStage::Peak
        } else if score >= 70.0 {
            SaturationStage::High
        } else if score >= 50.0 {
            SaturationStage::Moderate
        } else if score >= 30.0 {
            SaturationStage::GrowingMarket
        } else {
            SaturationStage::EarlyStage
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SaturationStage::EarlyStage => "Early Stage",
            SaturationStage::GrowingMarket => "Growing Market",
            SaturationStage::Moderate => "Moderate Saturation",
            SaturationStage::High => "High Saturation",
            SaturationStage::Peak => "Peak Saturation",
        }
    }
}

/// Days until saturation reaches the peak threshold at the current velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TimeToPeak {
    AlreadyPeaked,
    NotTrending,
    Days(u32),
    Beyond(u32),
}

impl fmt::Display for TimeToPeak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeToPeak::AlreadyPeaked => write!(f, "Already Peaked"),
            TimeToPeak::NotTrending => write!(f, "Not Trending to Peak"),
            TimeToPeak::Days(days) => write!(f, "{} days", days),
            TimeToPeak::Beyond(limit) => write!(f, "{}+ days", limit),
        }
    }
}

impl From<TimeToPeak> for String {
    fn from(value: TimeToPeak) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for TimeToPeak {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Already Peaked" => return Ok(TimeToPeak::AlreadyPeaked),
            "Not Trending to Peak" => return Ok(TimeToPeak::NotTrending),
            _ => {}
        }
        let days = value
            .strip_suffix(" days")
            .ok_or_else(|| format!("unrecognised time to peak '{}'", value))?;
        if let Some(limit) = days.strip_suffix('+') {
            return limit
                .parse()
                .map(TimeToPeak::Beyond)
                .map_err(|err| format!("invalid day count '{}': {}", limit, err));
        }
        days.parse()
            .map(TimeToPeak::Days)
            .map_err(|err| format!("invalid day count '{}': {}", days, err))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationMetrics {
    pub current_saturation: f64,
    pub peak_saturation: f64,
    pub average_saturation: f64,
    pub initial_saturation: f64,
    pub saturation_velocity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationSignal {
    pub saturation_score: f64,
    pub saturation_impact_level: RiskLevel,
    pub market_penetration: f64,
    pub repetition_risk: RepetitionRisk,
    pub metrics: SaturationMetrics,
    pub saturation_stage: SaturationStage,
    pub threshold_breaches: Vec<ThresholdBreach>,
    pub time_to_peak: TimeToPeak,
    pub fatigue_detected: bool,
    pub insights: String,
}

impl Signal for SaturationSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Saturation
    }

    fn summary(&self) -> SignalSummary {
        let mut metrics = BTreeMap::new();
        metrics.insert("current".to_string(), self.metrics.current_saturation);
        metrics.insert("peak".to_string(), self.metrics.peak_saturation);
        metrics.insert("average".to_string(), self.metrics.average_saturation);
        metrics.insert("initial".to_string(), self.metrics.initial_saturation);
        metrics.insert("velocity".to_string(), self.metrics.saturation_velocity);
        metrics.insert("breaches".to_string(), self.threshold_breaches.len() as f64);

        SignalSummary {
            decline_score: stats::clamp(self.saturation_score, 0.0, 100.0),
            category_label: self.saturation_stage.label().to_string(),
            risk_level: self.saturation_impact_level,
            metrics,
            narrative: self.insights.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SaturationExtractor {
    config: SaturationConfig,
}

impl SaturationExtractor {
    pub fn new(config: SaturationConfig) -> Self {
        Self { config }
    }

    pub fn analyze_series(&self, values: &[f64]) -> SaturationSignal {
        let current = stats::last(values);
        let velocity = stats::slope(stats::tail(values, self.config.velocity_window));
        let breaches = self.threshold_breaches(values);
        let repetition_risk = repetition_risk(current, velocity);
        let stage = SaturationStage::from_score(current);
        let impact = self.impact_level(current, velocity, breaches.len());
        let time_to_peak = self.time_to_peak(current, velocity);

        SaturationSignal {
            saturation_score: stats::round_to(current, 2),
            saturation_impact_level: impact,
            market_penetration: stats::round_to(current, 2),
            repetition_risk,
            metrics: SaturationMetrics {
                current_saturation: stats::round_to(current, 2),
                peak_saturation: stats::round_to(stats::max(values), 2),
                average_saturation: stats::round_to(stats::mean(values), 2),
                initial_saturation: stats::round_to(stats::first(values), 2),
                saturation_velocity: stats::round_to(velocity, 4),
            },
            saturation_stage: stage,
            fatigue_detected: current >= self.config.fatigue_threshold,
            insights: insights(current, stage, impact, repetition_risk, breaches.len()),
            threshold_breaches: breaches,
            time_to_peak,
        }
    }

    /// A snapshot is a one-point series; `penetration` in [0, 1] is scaled to percent.
    pub fn analyze_snapshot(&self, snapshot: &SnapshotMetrics) -> Result<SaturationSignal, DeclineError> {
        let score = match snapshot.get(Metric::SaturationScore.column()) {
            Some(score) => score,
            None => {
                let penetration = snapshot
                    .get("penetration")
                    .ok_or(DeclineError::MissingColumn(Metric::SaturationScore.column()))?;
                if penetration <= 1.0 {
                    penetration * 100.0
                } else {
                    penetration
                }
            }
        };
        Ok(self.analyze_series(&[score]))
    }

    pub fn threshold_breaches(&self, values: &[f64]) -> Vec<ThresholdBreach> {
        [
            ("Content Fatigue", self.config.fatigue_threshold),
            ("Critical Saturation", self.config.critical_threshold),
        ]
        .into_iter()
        .filter_map(|(name, threshold)| {
            values
                .iter()
                .position(|value| *value >= threshold)
                .map(|index| ThresholdBreach {
                    threshold: name.to_string(),
                    value: threshold,
                    day: index + 1,
                })
        })
        .collect()
    }

    fn impact_level(&self, saturation: f64, velocity: f64, breach_count: usize) -> RiskLevel {
        if saturation >= self.config.critical_threshold || breach_count >= 2 {
            return RiskLevel::Critical;
        }
        if saturation >= self.config.fatigue_threshold || (saturation >= 60.0 && velocity > 1.5) {
            return RiskLevel::High;
        }
        if saturation >= self.config.safe_threshold || velocity > 1.0 {
            return RiskLevel::Medium;
        }
        RiskLevel::Low
    }

    fn time_to_peak(&self, current: f64, velocity: f64) -> TimeToPeak {
        if current >= self.config.peak_threshold {
            return TimeToPeak::AlreadyPeaked;
        }
        if velocity <= 0.0 {
            return TimeToPeak::NotTrending;
        }
        let days = ((self.config.peak_threshold - current) / velocity).trunc();
        if days > self.config.max_days_to_peak as f64 {
            TimeToPeak::Beyond(self.config.max_days_to_peak)
        } else {
            TimeToPeak::Days(days as u32)
        }
    }
}

impl SignalExtractor for SaturationExtractor {
    type Output = SaturationSignal;

    fn kind(&self) -> SignalKind {
        SignalKind::Saturation
    }

    fn extract(&self, input: &SignalInput) -> Result<SaturationSignal, DeclineError> {
        match input {
            SignalInput::Series(table) => {
                let series = table.series(Metric::SaturationScore)?;
                Ok(self.analyze_series(&series.values()))
            }
            SignalInput::Snapshot(snapshot) => self.analyze_snapshot(snapshot),
        }
    }
}

pub fn repetition_risk(current: f64, velocity: f64) -> RepetitionRisk {
    if current >= 85.0 && velocity > 1.5 {
        return RepetitionRisk::Extreme;
    }
    if current >= 70.0 {
        if velocity > 1.0 {
            return RepetitionRisk::High;
        }
        return RepetitionRisk::Moderate;
    }
    if current >= 50.0 {
        return RepetitionRisk::Moderate;
    }
    RepetitionRisk::Low
}

fn insights(
    saturation: f64,
    stage: SaturationStage,
    impact: RiskLevel,
    risk: RepetitionRisk,
    breach_count: usize,
) -> String {
    let stage = stage.label();
    match impact {
        RiskLevel::Critical => {
            let breaches = if breach_count > 0 {
                format!(" Breached {} threshold(s).", breach_count)
            } else {
                String::new()
            };
            format!(
                "CRITICAL: {} at {:.1}%.{} Market is oversaturated. Trend collapse imminent.",
                stage, saturation, breaches
            )
        }
        RiskLevel::High => format!(
            "HIGH IMPACT: {} at {:.1}%. Content fatigue setting in. Repetition risk: {}.",
            stage,
            saturation,
            risk.label()
        ),
        RiskLevel::Medium => format!(
            "MODERATE: {} at {:.1}%. Market approaching saturation. Monitor for fatigue signals.",
            stage, saturation
        ),
        RiskLevel::Low => format!(
            "HEALTHY: {} at {:.1}%. Plenty of room for growth. Repetition risk: {}.",
            stage,
            saturation,
            risk.label()
        ),
    }
}
