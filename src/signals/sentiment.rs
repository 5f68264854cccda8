use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stats;
use super::{RiskLevel, Signal, SignalExtractor, SignalKind, SignalSummary};
use crate::error::DeclineError;
use crate::series::{Metric, SignalInput, SnapshotMetrics};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub window: usize,
    pub positive_threshold: f64,
    pub neutral_threshold: f64,
    pub direction_threshold: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            window: 7,
            positive_threshold: 0.6,
            neutral_threshold: 0.4,
            direction_threshold: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentCategory {
    Positive,
    Neutral,
    Negative,
}

impl SentimentCategory {
    pub fn label(self) -> &'static str {
        match self {
            SentimentCategory::Positive => "Positive",
            SentimentCategory::Neutral => "Neutral",
            SentimentCategory::Negative => "Negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentMetrics {
    pub initial_sentiment: f64,
    pub current_sentiment: f64,
    pub overall_sentiment: f64,
    pub sentiment_change_percent: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentCategories {
    pub initial: SentimentCategory,
    pub current: SentimentCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    /// "Stable" or "Early → Late" over the first and last thirds.
    pub sentiment_shift: String,
    pub shift_description: String,
    pub impact_level: RiskLevel,
    pub metrics: SentimentMetrics,
    pub sentiment_categories: SentimentCategories,
    pub trend_direction: SentimentTrend,
    pub insights: String,
}

impl Signal for SentimentSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Sentiment
    }

    fn summary(&self) -> SignalSummary {
        let mut metrics = BTreeMap::new();
        metrics.insert("initial".to_string(), self.metrics.initial_sentiment);
        metrics.insert("current".to_string(), self.metrics.current_sentiment);
        metrics.insert("overall".to_string(), self.metrics.overall_sentiment);
        metrics.insert("change_percent".to_string(), self.metrics.sentiment_change_percent);
        metrics.insert("volatility".to_string(), self.metrics.volatility);

        SignalSummary {
            decline_score: stats::clamp(-self.metrics.sentiment_change_percent, 0.0, 100.0),
            category_label: self.sentiment_shift.clone(),
            risk_level: self.impact_level,
            metrics,
            narrative: self.insights.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SentimentExtractor {
    config: SentimentConfig,
}

impl SentimentExtractor {
    pub fn new(config: SentimentConfig) -> Self {
        Self { config }
    }

    pub fn categorize(&self, score: f64) -> SentimentCategory {
        if score >= self.config.positive_threshold {
            SentimentCategory::Positive
        } else if score >= self.config.neutral_threshold {
            SentimentCategory::Neutral
        } else {
            SentimentCategory::Negative
        }
    }

    pub fn analyze_series(&self, values: &[f64]) -> SentimentSignal {
        let initial = stats::mean(stats::head(values, self.config.window));
        let current = stats::mean(stats::tail(values, self.config.window));
        let overall = stats::mean(values);
        let change = if initial > 0.0 {
            (current - initial) / initial * 100.0
        } else {
            0.0
        };
        let volatility = stats::std_dev(values);

        let (early, _, late) = stats::thirds(values);
        let shift = self.detect_shift(early, late);
        self.build(initial, current, overall, change, volatility, shift)
    }

    pub fn analyze_snapshot(&self, snapshot: &SnapshotMetrics) -> Result<SentimentSignal, DeclineError> {
        let score = snapshot
            .get(Metric::SentimentScore.column())
            .ok_or(DeclineError::MissingColumn(Metric::SentimentScore.column()))?;
        Ok(self.build(score, score, score, 0.0, 0.0, "Stable".to_string()))
    }

    fn detect_shift(&self, early: f64, late: f64) -> String {
        let early = self.categorize(early);
        let late = self.categorize(late);
        if early == late {
            "Stable".to_string()
        } else {
            format!("{} → {}", early.label(), late.label())
        }
    }

    fn build(
        &self,
        initial: f64,
        current: f64,
        overall: f64,
        change: f64,
        volatility: f64,
        shift: String,
    ) -> SentimentSignal {
        let impact_level = impact_level(&shift, volatility, change);
        let initial_category = self.categorize(initial);
        let current_category = self.categorize(current);
        let shift_description = shift_description(initial_category, current_category, change);

        let trend_direction = if change > self.config.direction_threshold {
            SentimentTrend::Improving
        } else if change < -self.config.direction_threshold {
            SentimentTrend::Declining
        } else {
            SentimentTrend::Stable
        };

        SentimentSignal {
            insights: insights(&shift_description, impact_level, volatility, change),
            sentiment_shift: shift,
            shift_description,
            impact_level,
            metrics: SentimentMetrics {
                initial_sentiment: stats::round_to(initial, 4),
                current_sentiment: stats::round_to(current, 4),
                overall_sentiment: stats::round_to(overall, 4),
                sentiment_change_percent: stats::round_to(change, 2),
                volatility: stats::round_to(volatility, 4),
            },
            sentiment_categories: SentimentCategories {
                initial: initial_category,
                current: current_category,
            },
            trend_direction,
        }
    }
}

impl SignalExtractor for SentimentExtractor {
    type Output = SentimentSignal;

    fn kind(&self) -> SignalKind {
        SignalKind::Sentiment
    }

    fn extract(&self, input: &SignalInput) -> Result<SentimentSignal, DeclineError> {
        match input {
            SignalInput::Series(table) => {
                let series = table.series(Metric::SentimentScore)?;
                Ok(self.analyze_series(&series.values()))
            }
            SignalInput::Snapshot(snapshot) => self.analyze_snapshot(snapshot),
        }
    }
}

pub fn impact_level(shift: &str, volatility: f64, change: f64) -> RiskLevel {
    if shift.contains("Positive → Negative") || change < -30.0 {
        return RiskLevel::Critical;
    }
    if shift.contains("Negative") && volatility > 0.15 {
        return RiskLevel::High;
    }
    if change < -20.0 || volatility > 0.20 {
        return RiskLevel::High;
    }
    if shift.contains("Neutral") || (volatility > 0.10 && change < -10.0) {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

fn shift_description(initial: SentimentCategory, current: SentimentCategory, change: f64) -> String {
    if initial == current {
        format!(
            "Sentiment remains {} with {:.1}% change",
            initial.label().to_lowercase(),
            change.abs()
        )
    } else {
        let direction = if change > 0.0 { "improved" } else { "declined" };
        format!(
            "Sentiment {} from {} to {} ({:+.1}%)",
            direction,
            initial.label().to_lowercase(),
            current.label().to_lowercase(),
            change
        )
    }
}

fn insights(description: &str, impact: RiskLevel, volatility: f64, change: f64) -> String {
    match impact {
        RiskLevel::Critical => format!(
            "CRITICAL: {}. High volatility ({:.3}). Immediate intervention required.",
            description, volatility
        ),
        RiskLevel::High => format!(
            "HIGH RISK: {}. Monitor closely and consider damage control strategies.",
            description
        ),
        RiskLevel::Medium => format!("MODERATE: {}. Keep monitoring sentiment trends.", description),
        RiskLevel::Low if change > 0.0 => {
            format!("HEALTHY: {}. Sentiment is stable or improving.", description)
        }
        RiskLevel::Low => format!(
            "STABLE: {}. Minor fluctuations within acceptable range.",
            description
        ),
    }
}
