use serde::{Deserialize, Serialize};

use crate::enhancer::{ConfidenceAssessment, ConfidenceLevel, DeclineDriver, RiskClassification};
use crate::predictor::{EarlyWarning, LifecycleStage, PredictionResult, WarningLevel};
use crate::signals::stats;
use crate::signals::{AggregatedSignals, DecaySpeed, Disengagement};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapseWindow {
    pub estimated_days: u32,
    pub window_range: String,
    pub confidence: String,
    pub decay_velocity: DecaySpeed,
}

/// Predictor early warning extended with cross-signal checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedEarlyWarning {
    #[serde(flatten)]
    pub base: EarlyWarning,
    pub collapse_window: CollapseWindow,
    pub severity_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    #[serde(rename = "At Risk")]
    AtRisk,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueImpact {
    pub impact_level: String,
    pub estimated_revenue_loss_pct: f64,
    pub stage_multiplier: f64,
    pub mitigation_potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionUrgency {
    pub urgency_level: String,
    pub days_to_action: String,
    pub immediate_actions_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub health_score: f64,
    pub decline_probability: f64,
    pub confidence: f64,
    pub days_to_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub trend_health_score: f64,
    pub health_status: HealthStatus,
    pub decline_risk: String,
    pub confidence_level: ConfidenceLevel,
    pub lifecycle_stage: LifecycleStage,
    pub revenue_impact_proxy: RevenueImpact,
    pub marketing_action_urgency: ActionUrgency,
    pub key_insights: Vec<String>,
    pub top_strategic_actions: Vec<String>,
    pub dashboard_metrics: DashboardMetrics,
}

/// Everything the executive summary reads from a finished analysis.
#[derive(Debug, Clone, Copy)]
pub struct SummaryContext<'a> {
    pub prediction: &'a PredictionResult,
    pub risk: &'a RiskClassification,
    pub confidence: &'a ConfidenceAssessment,
    pub drivers: &'a [DeclineDriver],
    pub early_warning: &'a EnhancedEarlyWarning,
    pub recommendations: &'a [String],
}

#[derive(Debug, Clone, Default)]
pub struct ExecutiveIntelligence;

impl ExecutiveIntelligence {
    pub fn new() -> Self {
        Self
    }

    pub fn enhance_early_warning(
        &self,
        prediction: &PredictionResult,
        signals: &AggregatedSignals,
    ) -> EnhancedEarlyWarning {
        let mut base = prediction.early_warning.clone();
        let mut extra = Vec::new();

        if declining_signal_count(signals) >= 3 {
            extra.push("Multi-signal decline convergence detected - cascading failure risk".to_string());
        }
        if let Some(engagement) = &signals.engagement {
            if engagement.decay_speed == DecaySpeed::Rapid && engagement.engagement_decline_percent > 50.0 {
                extra.push(format!(
                    "Sudden engagement drop: {:.1}% decline detected",
                    engagement.engagement_decline_percent
                ));
            }
        }
        if let Some(influencer) = &signals.influencer {
            if influencer.participation_drop_percent > 40.0 {
                extra.push(format!(
                    "Influencer withdrawal spike: {:.1}% drop in participation",
                    influencer.participation_drop_percent
                ));
            }
        }

        if extra.len() >= 2 && matches!(base.warning_level, WarningLevel::Moderate | WarningLevel::High) {
            base.warning_level = base.warning_level.escalate();
            base.recommended_action = base.warning_level.recommended_action().to_string();
        }
        base.active_warnings.extend(extra);
        base.warning_count = base.active_warnings.len();

        let severity_score = severity_score(base.warning_level, base.warning_count);
        EnhancedEarlyWarning {
            collapse_window: collapse_window(prediction, signals),
            severity_score,
            base,
        }
    }

    pub fn generate_executive_summary(&self, context: SummaryContext<'_>) -> ExecutiveSummary {
        let probability = context.prediction.decline_probability;
        let stage = context.prediction.lifecycle_stage;
        let health = 100.0 - probability;

        let health_status = if health >= 70.0 {
            HealthStatus::Excellent
        } else if health >= 50.0 {
            HealthStatus::Good
        } else if health >= 30.0 {
            HealthStatus::AtRisk
        } else {
            HealthStatus::Critical
        };
        let urgency = action_urgency(probability, stage);

        ExecutiveSummary {
            trend_health_score: stats::round_to(health, 1),
            health_status,
            decline_risk: context.risk.risk_label.clone(),
            confidence_level: context.confidence.confidence_level,
            lifecycle_stage: stage,
            revenue_impact_proxy: revenue_impact(probability, stage),
            key_insights: key_insights(&context),
            top_strategic_actions: context.recommendations.iter().take(3).cloned().collect(),
            dashboard_metrics: DashboardMetrics {
                health_score: stats::round_to(health, 1),
                decline_probability: stats::round_to(probability, 1),
                confidence: stats::round_to(context.confidence.confidence_score, 1),
                days_to_action: urgency.days_to_action.clone(),
            },
            marketing_action_urgency: urgency,
        }
    }
}

fn declining_signal_count(signals: &AggregatedSignals) -> usize {
    let mut count = 0;
    if signals
        .engagement
        .as_ref()
        .map(|signal| signal.risk_level.is_elevated())
        .unwrap_or(false)
    {
        count += 1;
    }
    if signals
        .sentiment
        .as_ref()
        .map(|signal| signal.impact_level.is_elevated())
        .unwrap_or(false)
    {
        count += 1;
    }
    if signals
        .influencer
        .as_ref()
        .map(|signal| {
            !matches!(
                signal.disengagement_status,
                Disengagement::Stable | Disengagement::Increasing
            )
        })
        .unwrap_or(false)
    {
        count += 1;
    }
    if signals
        .saturation
        .as_ref()
        .map(|signal| signal.saturation_score > 70.0)
        .unwrap_or(false)
    {
        count += 1;
    }
    count
}

/// Midpoint of a "min-max days" range, 0 once collapsed, 30 when unparseable.
pub fn collapse_midpoint(days_to_collapse: &str) -> f64 {
    if days_to_collapse == "Already Collapsed" {
        return 0.0;
    }
    let parsed = days_to_collapse.split_once('-').and_then(|(low, high)| {
        let low: f64 = low.trim().split_whitespace().next()?.parse().ok()?;
        let high: f64 = high.trim().split_whitespace().next()?.parse().ok()?;
        Some((low + high) / 2.0)
    });
    parsed.unwrap_or(30.0)
}

fn collapse_window(prediction: &PredictionResult, signals: &AggregatedSignals) -> CollapseWindow {
    let decay_speed = signals
        .engagement
        .as_ref()
        .map(|signal| signal.decay_speed)
        .unwrap_or(DecaySpeed::Moderate);
    let multiplier = match decay_speed {
        DecaySpeed::Slow => 1.5,
        DecaySpeed::Moderate => 1.0,
        DecaySpeed::Rapid => 0.5,
    };
    let days = collapse_midpoint(&prediction.days_to_collapse) * multiplier;

    CollapseWindow {
        estimated_days: days.max(0.0).trunc() as u32,
        window_range: prediction.days_to_collapse.clone(),
        confidence: if prediction.decline_probability > 60.0 {
            "High".to_string()
        } else {
            "Moderate".to_string()
        },
        decay_velocity: decay_speed,
    }
}

pub fn severity_score(level: WarningLevel, warning_count: usize) -> u32 {
    let base = match level {
        WarningLevel::Low => 20,
        WarningLevel::Moderate => 40,
        WarningLevel::High => 70,
        WarningLevel::Critical => 95,
    };
    let points = (warning_count as u32).saturating_mul(5).min(30);
    (base + points).min(100)
}

fn revenue_impact(probability: f64, stage: LifecycleStage) -> RevenueImpact {
    let multiplier = match stage {
        LifecycleStage::Growth => 1.5,
        LifecycleStage::Peak => 2.0,
        LifecycleStage::EarlyDecline => 1.2,
        LifecycleStage::RapidCollapse => 0.5,
        LifecycleStage::DeadTrend => 0.1,
    };
    let (level, rate) = if probability < 30.0 {
        ("Minimal", 0.3)
    } else if probability < 60.0 {
        ("Moderate", 0.5)
    } else if probability < 80.0 {
        ("Significant", 0.7)
    } else {
        ("Severe", 0.9)
    };
    let loss = (probability * rate * multiplier).min(100.0);

    RevenueImpact {
        impact_level: level.to_string(),
        estimated_revenue_loss_pct: stats::round_to(loss, 1),
        stage_multiplier: multiplier,
        mitigation_potential: stats::round_to(100.0 - probability, 1),
    }
}

fn action_urgency(probability: f64, stage: LifecycleStage) -> ActionUrgency {
    let (level, days) = if probability >= 80.0 || stage == LifecycleStage::RapidCollapse {
        ("Critical - Immediate", "0-2 days")
    } else if probability >= 60.0 || stage == LifecycleStage::EarlyDecline {
        ("High - Urgent", "3-7 days")
    } else if probability >= 40.0 {
        ("Medium - Plan", "1-2 weeks")
    } else {
        ("Low - Monitor", "Routine")
    };
    ActionUrgency {
        urgency_level: level.to_string(),
        days_to_action: days.to_string(),
        immediate_actions_required: probability >= 60.0,
    }
}

fn key_insights(context: &SummaryContext<'_>) -> Vec<String> {
    let prediction = context.prediction;
    let mut insights = vec![format!(
        "Trend is in {} stage with {:.1}% decline risk",
        prediction.lifecycle_stage, prediction.decline_probability
    )];

    if let Some(top) = context.drivers.first() {
        insights.push(format!(
            "Primary risk factor: {} ({:.1}% contribution)",
            top.driver, top.contribution_percentage
        ));
    }

    let warning = &context.early_warning.base;
    if matches!(warning.warning_level, WarningLevel::High | WarningLevel::Critical) {
        insights.push(format!(
            "Early warning: {} - {} risk signals detected",
            warning.warning_level.label(),
            warning.active_warnings.len()
        ));
    }
    insights
}
