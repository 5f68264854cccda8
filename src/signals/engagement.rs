use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stats;
use super::{DecaySpeed, RiskLevel, Signal, SignalExtractor, SignalKind, SignalSummary, TrendDirection};
use crate::error::DeclineError;
use crate::series::{Metric, SignalInput, SnapshotMetrics};

const SNAPSHOT_FIELDS: [&str; 4] = ["likes", "comments", "shares", "views"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub decay_window: usize,
    pub trend_window: usize,
    pub trend_epsilon: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            decay_window: 7,
            trend_window: 10,
            trend_epsilon: 0.0005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub peak_engagement: f64,
    pub current_engagement: f64,
    pub average_engagement: f64,
    pub volatility: f64,
}

/// Raw counters and derived scores of a single engagement snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub engagement_score: f64,
    pub engagement_rate: f64,
    pub likes: f64,
    pub comments: f64,
    pub shares: f64,
    pub views: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSignal {
    pub engagement_decline_percent: f64,
    pub risk_level: RiskLevel,
    pub decay_speed: DecaySpeed,
    pub trend_direction: TrendDirection,
    pub metrics: EngagementMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<EngagementSnapshot>,
    pub insights: String,
}

impl Signal for EngagementSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Engagement
    }

    fn summary(&self) -> SignalSummary {
        let mut metrics = BTreeMap::new();
        metrics.insert("decline_percent".to_string(), self.engagement_decline_percent);
        metrics.insert("peak".to_string(), self.metrics.peak_engagement);
        metrics.insert("current".to_string(), self.metrics.current_engagement);
        metrics.insert("average".to_string(), self.metrics.average_engagement);
        metrics.insert("volatility".to_string(), self.metrics.volatility);
        if let Some(snapshot) = &self.snapshot {
            metrics.insert("engagement_score".to_string(), snapshot.engagement_score);
        }

        SignalSummary {
            decline_score: stats::clamp(self.engagement_decline_percent, 0.0, 100.0),
            category_label: format!("{} decay", self.decay_speed.label()),
            risk_level: self.risk_level,
            metrics,
            narrative: self.insights.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngagementExtractor {
    config: EngagementConfig,
}

impl EngagementExtractor {
    pub fn new(config: EngagementConfig) -> Self {
        Self { config }
    }

    pub fn analyze_series(&self, values: &[f64]) -> EngagementSignal {
        let peak = stats::max(values);
        let current = stats::last(values);
        let decline = stats::percent_drop(peak, current);

        let decay_speed = decay_speed(values, self.config.decay_window);
        let trend_direction = TrendDirection::from_slope(
            stats::slope(stats::tail(values, self.config.trend_window)),
            self.config.trend_epsilon,
        );
        let risk_level = assign_risk_level(decline, decay_speed);

        EngagementSignal {
            engagement_decline_percent: stats::round_to(decline, 2),
            risk_level,
            decay_speed,
            trend_direction,
            metrics: EngagementMetrics {
                peak_engagement: stats::round_to(peak, 4),
                current_engagement: stats::round_to(current, 4),
                average_engagement: stats::round_to(stats::mean(values), 4),
                volatility: stats::round_to(stats::std_dev(values), 4),
            },
            snapshot: None,
            insights: insights(decline, decay_speed, risk_level),
        }
    }

    pub fn analyze_snapshot(&self, snapshot: &SnapshotMetrics) -> Result<EngagementSignal, DeclineError> {
        if SNAPSHOT_FIELDS.iter().all(|key| snapshot.get(key).is_none()) {
            return Err(DeclineError::MissingColumn(Metric::EngagementRate.column()));
        }

        let likes = snapshot.get_or("likes", 0.0);
        let comments = snapshot.get_or("comments", 0.0);
        let shares = snapshot.get_or("shares", 0.0);
        let views = snapshot.get_or("views", 1.0);

        let weighted = likes + comments * 2.0 + shares * 3.0;
        let rate = if views > 0.0 { weighted / views } else { 0.0 };
        let score = stats::clamp(rate * 100.0, 0.0, 100.0);
        let rate = stats::round_to(rate, 4);

        Ok(EngagementSignal {
            engagement_decline_percent: 0.0,
            risk_level: RiskLevel::Low,
            decay_speed: DecaySpeed::Slow,
            trend_direction: TrendDirection::Stable,
            metrics: EngagementMetrics {
                peak_engagement: rate,
                current_engagement: rate,
                average_engagement: rate,
                volatility: 0.0,
            },
            snapshot: Some(EngagementSnapshot {
                engagement_score: stats::round_to(score, 2),
                engagement_rate: rate,
                likes,
                comments,
                shares,
                views,
            }),
            insights: "Single snapshot analyzed. Time-series data recommended for decline detection."
                .to_string(),
        })
    }
}

impl SignalExtractor for EngagementExtractor {
    type Output = EngagementSignal;

    fn kind(&self) -> SignalKind {
        SignalKind::Engagement
    }

    fn extract(&self, input: &SignalInput) -> Result<EngagementSignal, DeclineError> {
        match input {
            SignalInput::Series(table) => {
                let series = table.series(Metric::EngagementRate)?;
                Ok(self.analyze_series(&series.values()))
            }
            SignalInput::Snapshot(snapshot) => self.analyze_snapshot(snapshot),
        }
    }
}

/// Relative drop of the last `window` points against everything before them.
pub fn decay_speed(values: &[f64], window: usize) -> DecaySpeed {
    let window = window.min(values.len()).max(1);
    let recent = stats::mean(stats::tail(values, window));
    let previous = if values.len() > window {
        stats::mean(&values[..values.len() - window])
    } else {
        recent
    };
    DecaySpeed::from_decay_rate(stats::percent_drop(previous, recent))
}

pub fn assign_risk_level(decline_percent: f64, decay_speed: DecaySpeed) -> RiskLevel {
    if decline_percent < 20.0 {
        match decay_speed {
            DecaySpeed::Slow | DecaySpeed::Moderate => RiskLevel::Low,
            DecaySpeed::Rapid => RiskLevel::Medium,
        }
    } else if decline_percent < 50.0 {
        match decay_speed {
            DecaySpeed::Slow => RiskLevel::Low,
            DecaySpeed::Moderate => RiskLevel::Medium,
            DecaySpeed::Rapid => RiskLevel::High,
        }
    } else {
        match decay_speed {
            DecaySpeed::Slow => RiskLevel::Medium,
            DecaySpeed::Moderate | DecaySpeed::Rapid => RiskLevel::High,
        }
    }
}

fn insights(decline: f64, decay_speed: DecaySpeed, risk_level: RiskLevel) -> String {
    let speed = decay_speed.label();
    match risk_level {
        RiskLevel::Low => format!(
            "Engagement is healthy with {:.1}% decline and {} decay. Trend is stable.",
            decline, speed
        ),
        RiskLevel::Medium => format!(
            "Moderate risk detected. Engagement declined {:.1}% with {} decay. Monitor closely.",
            decline, speed
        ),
        RiskLevel::High | RiskLevel::Critical => format!(
            "High risk! Engagement dropped {:.1}% with {} decay. Immediate action recommended.",
            decline, speed
        ),
    }
}
