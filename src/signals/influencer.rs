use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stats;
use super::{RiskLevel, Signal, SignalExtractor, SignalKind, SignalSummary, TrendDirection};
use crate::error::DeclineError;
use crate::series::{Metric, SignalInput, SnapshotMetrics};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluencerConfig {
    pub window: usize,
    pub trend_window: usize,
    pub trend_epsilon: f64,
    pub snapshot_impact_score: f64,
}

impl Default for InfluencerConfig {
    fn default() -> Self {
        Self {
            window: 7,
            trend_window: 10,
            trend_epsilon: 0.001,
            snapshot_impact_score: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disengagement {
    #[serde(rename = "Severe Disengagement")]
    Severe,
    #[serde(rename = "Moderate Disengagement")]
    Moderate,
    #[serde(rename = "Slight Disengagement")]
    Slight,
    #[serde(rename = "Increasing Engagement")]
    Increasing,
    #[serde(rename = "Stable Engagement")]
    Stable,
}

impl Disengagement {
    /// Classifies the drops between consecutive thirds of the series.
    pub fn from_thirds(early: f64, mid: f64, late: f64) -> Self {
        let early_to_mid = stats::percent_drop(early, mid);
        let mid_to_late = stats::percent_drop(mid, late);

        if early_to_mid > 30.0 && mid_to_late > 30.0 {
            Disengagement::Severe
        } else if early_to_mid > 20.0 || mid_to_late > 20.0 {
            Disengagement::Moderate
        } else if early_to_mid > 10.0 || mid_to_late > 10.0 {
            Disengagement::Slight
        } else if early_to_mid < -10.0 || mid_to_late < -10.0 {
            Disengagement::Increasing
        } else {
            Disengagement::Stable
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Disengagement::Severe => "Severe Disengagement",
            Disengagement::Moderate => "Moderate Disengagement",
            Disengagement::Slight => "Slight Disengagement",
            Disengagement::Increasing => "Increasing Engagement",
            Disengagement::Stable => "Stable Engagement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfluencerActivity {
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Moderate,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

impl InfluencerActivity {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.20 {
            InfluencerActivity::VeryHigh
        } else if ratio >= 0.15 {
            InfluencerActivity::High
        } else if ratio >= 0.10 {
            InfluencerActivity::Moderate
        } else if ratio >= 0.05 {
            InfluencerActivity::Low
        } else {
            InfluencerActivity::VeryLow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InfluencerActivity::VeryHigh => "Very High",
            InfluencerActivity::High => "High",
            InfluencerActivity::Moderate => "Moderate",
            InfluencerActivity::Low => "Low",
            InfluencerActivity::VeryLow => "Very Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerMetrics {
    pub initial_ratio: f64,
    pub current_ratio: f64,
    pub peak_ratio: f64,
    pub overall_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerSnapshot {
    pub influencer_count: f64,
    pub total_reach: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerSignal {
    pub participation_drop_percent: f64,
    /// Strength of influencer presence, 0-100. Higher is healthier.
    pub influence_impact_score: f64,
    pub disengagement_status: Disengagement,
    pub risk_level: RiskLevel,
    pub metrics: InfluencerMetrics,
    pub trend_direction: TrendDirection,
    pub influencer_activity: InfluencerActivity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<InfluencerSnapshot>,
    pub insights: String,
}

impl Signal for InfluencerSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Influencer
    }

    fn summary(&self) -> SignalSummary {
        let mut metrics = BTreeMap::new();
        metrics.insert("participation_drop_percent".to_string(), self.participation_drop_percent);
        metrics.insert("impact_score".to_string(), self.influence_impact_score);
        metrics.insert("initial_ratio".to_string(), self.metrics.initial_ratio);
        metrics.insert("current_ratio".to_string(), self.metrics.current_ratio);
        metrics.insert("peak_ratio".to_string(), self.metrics.peak_ratio);

        SignalSummary {
            decline_score: stats::clamp(self.participation_drop_percent, 0.0, 100.0),
            category_label: self.disengagement_status.label().to_string(),
            risk_level: self.risk_level,
            metrics,
            narrative: self.insights.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InfluencerExtractor {
    config: InfluencerConfig,
}

impl InfluencerExtractor {
    pub fn new(config: InfluencerConfig) -> Self {
        Self { config }
    }

    pub fn analyze_series(&self, values: &[f64]) -> InfluencerSignal {
        let initial = stats::mean(stats::head(values, self.config.window));
        let current = stats::mean(stats::tail(values, self.config.window));
        let drop = stats::percent_drop(initial, current);

        let (early, mid, late) = stats::thirds(values);
        let disengagement = Disengagement::from_thirds(early, mid, late);
        let trend_direction = TrendDirection::from_slope(
            stats::slope(stats::tail(values, self.config.trend_window)),
            self.config.trend_epsilon,
        );
        let impact = impact_score(current, drop, trend_direction);
        let risk_level = assign_risk_level(drop, disengagement, current);
        let activity = InfluencerActivity::from_ratio(current);

        InfluencerSignal {
            participation_drop_percent: stats::round_to(drop, 2),
            influence_impact_score: stats::round_to(impact, 2),
            disengagement_status: disengagement,
            risk_level,
            metrics: InfluencerMetrics {
                initial_ratio: stats::round_to(initial, 4),
                current_ratio: stats::round_to(current, 4),
                peak_ratio: stats::round_to(stats::max(values), 4),
                overall_average: stats::round_to(stats::mean(values), 4),
            },
            trend_direction,
            influencer_activity: activity,
            snapshot: None,
            insights: insights(disengagement, drop, risk_level, activity),
        }
    }

    pub fn analyze_snapshot(&self, snapshot: &SnapshotMetrics) -> Result<InfluencerSignal, DeclineError> {
        let count = snapshot.get("influencer_count");
        let reach = snapshot.get("total_reach");
        let ratio = snapshot.get(Metric::InfluencerRatio.column());
        if count.is_none() && reach.is_none() && ratio.is_none() {
            return Err(DeclineError::MissingColumn(Metric::InfluencerRatio.column()));
        }

        let ratio = ratio.unwrap_or(0.0);
        let activity = InfluencerActivity::from_ratio(ratio);
        Ok(InfluencerSignal {
            participation_drop_percent: 0.0,
            influence_impact_score: self.config.snapshot_impact_score,
            disengagement_status: Disengagement::Stable,
            risk_level: RiskLevel::Low,
            metrics: InfluencerMetrics {
                initial_ratio: ratio,
                current_ratio: ratio,
                peak_ratio: ratio,
                overall_average: ratio,
            },
            trend_direction: TrendDirection::Stable,
            influencer_activity: activity,
            snapshot: Some(InfluencerSnapshot {
                influencer_count: count.unwrap_or(0.0),
                total_reach: reach.unwrap_or(0.0),
            }),
            insights: "Snapshot analysis. Time-series data recommended for trend detection."
                .to_string(),
        })
    }
}

impl SignalExtractor for InfluencerExtractor {
    type Output = InfluencerSignal;

    fn kind(&self) -> SignalKind {
        SignalKind::Influencer
    }

    fn extract(&self, input: &SignalInput) -> Result<InfluencerSignal, DeclineError> {
        match input {
            SignalInput::Series(table) => {
                let series = table.series(Metric::InfluencerRatio)?;
                Ok(self.analyze_series(&series.values()))
            }
            SignalInput::Snapshot(snapshot) => self.analyze_snapshot(snapshot),
        }
    }
}

pub fn impact_score(current_ratio: f64, drop_percent: f64, trend: TrendDirection) -> f64 {
    let base = current_ratio * 500.0;
    let penalty = (drop_percent * 0.5).min(30.0);
    let modifier = match trend {
        TrendDirection::Increasing => 20.0,
        TrendDirection::Decreasing => -20.0,
        TrendDirection::Stable => 0.0,
    };
    stats::clamp(base - penalty + modifier, 0.0, 100.0)
}

pub fn assign_risk_level(drop_percent: f64, disengagement: Disengagement, current_ratio: f64) -> RiskLevel {
    if disengagement == Disengagement::Severe || drop_percent > 60.0 {
        return RiskLevel::Critical;
    }
    if disengagement == Disengagement::Moderate || drop_percent > 40.0 {
        return RiskLevel::High;
    }
    if drop_percent > 20.0 || current_ratio < 0.05 {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

fn insights(
    disengagement: Disengagement,
    drop: f64,
    risk_level: RiskLevel,
    activity: InfluencerActivity,
) -> String {
    match risk_level {
        RiskLevel::Critical => format!(
            "CRITICAL: {} detected with {:.1}% drop. Influencer exodus underway. Urgent re-engagement needed.",
            disengagement.label(),
            drop
        ),
        RiskLevel::High => format!(
            "HIGH RISK: {}. Participation dropped {:.1}%. Major influencers leaving the trend.",
            disengagement.label(),
            drop
        ),
        RiskLevel::Medium => format!(
            "MEDIUM RISK: {:.1}% drop in influencer participation. Activity level: {}. Monitor key influencers.",
            drop,
            activity.label()
        ),
        RiskLevel::Low if disengagement == Disengagement::Increasing => format!(
            "POSITIVE: Influencer engagement is increasing. Current activity: {}. Trend gaining momentum.",
            activity.label()
        ),
        RiskLevel::Low => format!(
            "STABLE: Influencer participation is healthy at {} level. Continue current strategy.",
            activity.label()
        ),
    }
}
