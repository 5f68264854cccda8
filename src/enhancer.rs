use serde::{Deserialize, Serialize};

use crate::error::DeclineError;
use crate::predictor::{LifecycleStage, PredictionResult};
use crate::signals::stats;
use crate::signals::{AggregatedSignals, DecaySpeed, SignalKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTier {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub urgency: String,
    pub action_timeline: String,
}

impl RiskTier {
    fn new(label: &str, min: f64, max: f64, urgency: &str, action_timeline: &str) -> Self {
        Self {
            label: label.to_string(),
            min,
            max,
            urgency: urgency.to_string(),
            action_timeline: action_timeline.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub agreement_weight: f64,
    pub completeness_weight: f64,
    pub stability_weight: f64,
    pub volatility_scale: f64,
    pub default_stability: f64,
    /// Inclusive tiers. Gaps between tiers are kept as-is and classify as "Unknown".
    pub risk_tiers: Vec<RiskTier>,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            agreement_weight: 0.40,
            completeness_weight: 0.35,
            stability_weight: 0.25,
            volatility_scale: 10.0,
            default_stability: 70.0,
            risk_tiers: vec![
                RiskTier::new("Low Risk", 0.0, 30.0, "Low", "Routine monitoring"),
                RiskTier::new("Moderate Risk", 31.0, 60.0, "Moderate", "Within 2-4 weeks"),
                RiskTier::new("High Risk", 61.0, 80.0, "Urgent", "Within 1 week"),
                RiskTier::new(
                    "Critical Decline",
                    81.0,
                    100.0,
                    "Immediate Action Required",
                    "Within 24-48 hours",
                ),
            ],
        }
    }
}

impl EnhancerConfig {
    pub fn validate(&self) -> Result<(), DeclineError> {
        if self.risk_tiers.is_empty() {
            return Err(DeclineError::Config("at least one risk tier is required".to_string()));
        }
        for tier in &self.risk_tiers {
            if tier.min > tier.max {
                return Err(DeclineError::Config(format!(
                    "risk tier '{}' has min {} above max {}",
                    tier.label, tier.min, tier.max
                )));
            }
        }
        for pair in self.risk_tiers.windows(2) {
            if pair[1].min <= pair[0].max {
                return Err(DeclineError::Config(format!(
                    "risk tier '{}' overlaps '{}'",
                    pair[1].label, pair[0].label
                )));
            }
        }
        let sum = self.agreement_weight + self.completeness_weight + self.stability_weight;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(DeclineError::Config(format!(
                "confidence weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    pub signal_agreement: f64,
    pub data_completeness: f64,
    pub signal_stability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAssessment {
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub factors: ConfidenceFactors,
    pub reliability: Reliability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineDriver {
    pub rank: usize,
    pub driver: String,
    pub signal: SignalKind,
    pub contribution: f64,
    pub contribution_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskClassification {
    pub risk_label: String,
    pub risk_tier_range: (f64, f64),
    pub decline_probability: f64,
    pub urgency: String,
    pub action_timeline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStability {
    Stable,
    Transitioning,
    Unstable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    Growth,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleView {
    pub current_stage: LifecycleStage,
    pub stage_index: usize,
    pub total_stages: usize,
    pub next_stage: Option<LifecycleStage>,
    pub stage_stability: StageStability,
    pub transition_risk: String,
    pub stage_progression: Vec<LifecycleStage>,
    pub curve_type: CurveType,
}

#[derive(Debug, Clone, Default)]
pub struct IntelligenceEnhancer {
    config: EnhancerConfig,
}

impl IntelligenceEnhancer {
    pub fn new(config: EnhancerConfig) -> Result<Self, DeclineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn calculate_confidence(
        &self,
        prediction: &PredictionResult,
        signals: &AggregatedSignals,
    ) -> ConfidenceAssessment {
        let agreement = signal_agreement(&prediction.signal_scores.values());
        let completeness = signals.present_count() as f64 / SignalKind::CANONICAL.len() as f64 * 100.0;
        let stability = self.signal_stability(signals);

        let score = agreement * self.config.agreement_weight
            + completeness * self.config.completeness_weight
            + stability * self.config.stability_weight;

        let confidence_level = if score >= 80.0 {
            ConfidenceLevel::VeryHigh
        } else if score >= 65.0 {
            ConfidenceLevel::High
        } else if score >= 50.0 {
            ConfidenceLevel::Moderate
        } else {
            ConfidenceLevel::Low
        };
        let reliability = if score >= 70.0 {
            Reliability::High
        } else if score >= 50.0 {
            Reliability::Medium
        } else {
            Reliability::Low
        };

        ConfidenceAssessment {
            confidence_score: stats::round_to(score, 2),
            confidence_level,
            factors: ConfidenceFactors {
                signal_agreement: stats::round_to(agreement, 2),
                data_completeness: stats::round_to(completeness, 2),
                signal_stability: stats::round_to(stability, 2),
            },
            reliability,
        }
    }

    /// Inverted volatility from sentiment volatility and engagement decay speed.
    fn signal_stability(&self, signals: &AggregatedSignals) -> f64 {
        let mut indicators = Vec::new();
        if let Some(sentiment) = &signals.sentiment {
            indicators.push((sentiment.metrics.volatility * self.config.volatility_scale).min(100.0));
        }
        if let Some(engagement) = &signals.engagement {
            indicators.push(match engagement.decay_speed {
                DecaySpeed::Slow => 20.0,
                DecaySpeed::Moderate => 50.0,
                DecaySpeed::Rapid => 80.0,
            });
        }
        if indicators.is_empty() {
            return self.config.default_stability;
        }
        (100.0 - stats::mean(&indicators)).max(0.0)
    }

    pub fn rank_decline_drivers(&self, prediction: &PredictionResult) -> Vec<DeclineDriver> {
        let probability = prediction.decline_probability;
        let mut drivers: Vec<DeclineDriver> = SignalKind::CANONICAL
            .iter()
            .map(|kind| {
                let contribution = prediction.weighted_contributions.get(*kind);
                let percentage = if probability > 0.0 {
                    contribution / probability * 100.0
                } else {
                    0.0
                };
                DeclineDriver {
                    rank: 0,
                    driver: kind.driver_name().to_string(),
                    signal: *kind,
                    contribution,
                    contribution_percentage: stats::round_to(percentage, 1),
                }
            })
            .collect();

        drivers.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
        for (index, driver) in drivers.iter_mut().enumerate() {
            driver.rank = index + 1;
        }
        drivers
    }

    pub fn classify_risk(&self, probability: f64) -> RiskClassification {
        let tier = self
            .config
            .risk_tiers
            .iter()
            .find(|tier| tier.min <= probability && probability <= tier.max);

        let urgency_tier = self
            .config
            .risk_tiers
            .iter()
            .rev()
            .find(|tier| probability >= tier.min)
            .or_else(|| self.config.risk_tiers.first());

        RiskClassification {
            risk_label: tier
                .map(|tier| tier.label.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            risk_tier_range: tier.map(|tier| (tier.min, tier.max)).unwrap_or((0.0, 0.0)),
            decline_probability: stats::round_to(probability, 2),
            urgency: urgency_tier
                .map(|tier| tier.urgency.clone())
                .unwrap_or_default(),
            action_timeline: urgency_tier
                .map(|tier| tier.action_timeline.clone())
                .unwrap_or_default(),
        }
    }

    pub fn detect_lifecycle_stage(&self, prediction: &PredictionResult) -> LifecycleView {
        let probability = prediction.decline_probability;
        let stage = prediction.lifecycle_stage;
        let (stability, transition_risk) = if probability < 30.0 {
            (StageStability::Stable, "Low")
        } else if probability < 60.0 {
            (StageStability::Transitioning, "Moderate")
        } else {
            (StageStability::Unstable, "High")
        };

        LifecycleView {
            current_stage: stage,
            stage_index: stage.index(),
            total_stages: LifecycleStage::ALL.len(),
            next_stage: stage.next(),
            stage_stability: stability,
            transition_risk: transition_risk.to_string(),
            stage_progression: LifecycleStage::ALL.to_vec(),
            curve_type: if probability > 50.0 {
                CurveType::Decline
            } else {
                CurveType::Growth
            },
        }
    }
}

/// 100 minus half the coefficient of variation (as a percentage), in [0, 100].
pub fn signal_agreement(scores: &[f64]) -> f64 {
    let avg = stats::mean(scores);
    if avg == 0.0 {
        return 100.0;
    }
    let cv = stats::std_dev(scores) / avg;
    stats::clamp(100.0 - cv * 50.0, 0.0, 100.0)
}
