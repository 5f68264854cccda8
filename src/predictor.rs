use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DeclineError;
use crate::signals::stats;
use crate::signals::{AggregatedSignals, DecaySpeed, RiskLevel, SignalKind};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Fusion weights per signal. They must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub engagement: f64,
    pub influencer: f64,
    pub sentiment: f64,
    pub saturation: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            engagement: 0.35,
            influencer: 0.25,
            sentiment: 0.20,
            saturation: 0.20,
        }
    }
}

impl FusionWeights {
    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Engagement => self.engagement,
            SignalKind::Influencer => self.influencer,
            SignalKind::Sentiment => self.sentiment,
            SignalKind::Saturation => self.saturation,
        }
    }

    pub fn sum(&self) -> f64 {
        SignalKind::CANONICAL.iter().map(|kind| self.get(*kind)).sum()
    }

    pub fn validate(&self) -> Result<(), DeclineError> {
        for kind in SignalKind::CANONICAL {
            let weight = self.get(kind);
            if !weight.is_finite() || weight < 0.0 {
                return Err(DeclineError::Config(format!(
                    "weight for {} must be a non-negative number, got {}",
                    kind.label(),
                    weight
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(DeclineError::Config(format!(
                "fusion weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }
}

/// Lower bounds of each lifecycle stage after Growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageThresholds {
    pub peak: f64,
    pub early_decline: f64,
    pub rapid_collapse: f64,
    pub dead_trend: f64,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            peak: 25.0,
            early_decline: 45.0,
            rapid_collapse: 65.0,
            dead_trend: 85.0,
        }
    }
}

impl StageThresholds {
    pub fn validate(&self) -> Result<(), DeclineError> {
        let bounds = [0.0, self.peak, self.early_decline, self.rapid_collapse, self.dead_trend, 100.0];
        if bounds.windows(2).all(|pair| pair[0] < pair[1]) {
            Ok(())
        } else {
            Err(DeclineError::Config(format!(
                "lifecycle thresholds must ascend strictly within (0, 100), got {:?}",
                &bounds[1..5]
            )))
        }
    }

    pub fn stage(&self, probability: f64) -> LifecycleStage {
        if probability < self.peak {
            LifecycleStage::Growth
        } else if probability < self.early_decline {
            LifecycleStage::Peak
        } else if probability < self.rapid_collapse {
            LifecycleStage::EarlyDecline
        } else if probability < self.dead_trend {
            LifecycleStage::RapidCollapse
        } else {
            LifecycleStage::DeadTrend
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: 75.0,
            high: 55.0,
            medium: 35.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyWarningConfig {
    pub warning_threshold: f64,
    pub critical_zone: f64,
    pub engagement: f64,
    pub influencer: f64,
    pub sentiment: f64,
    pub saturation: f64,
    pub high_signal: f64,
}

impl Default for EarlyWarningConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 45.0,
            critical_zone: 65.0,
            engagement: 40.0,
            influencer: 35.0,
            sentiment: 30.0,
            saturation: 60.0,
            high_signal: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub stages: StageThresholds,
    pub risk: RiskThresholds,
    pub early_warning: EarlyWarningConfig,
    /// Raw indicators a full analysis supplies; three per signal group.
    pub expected_indicators: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            stages: StageThresholds::default(),
            risk: RiskThresholds::default(),
            early_warning: EarlyWarningConfig::default(),
            expected_indicators: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleStage {
    Growth,
    Peak,
    #[serde(rename = "Early Decline")]
    EarlyDecline,
    #[serde(rename = "Rapid Collapse")]
    RapidCollapse,
    #[serde(rename = "Dead Trend")]
    DeadTrend,
}

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 5] = [
        LifecycleStage::Growth,
        LifecycleStage::Peak,
        LifecycleStage::EarlyDecline,
        LifecycleStage::RapidCollapse,
        LifecycleStage::DeadTrend,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LifecycleStage::Growth => "Growth",
            LifecycleStage::Peak => "Peak",
            LifecycleStage::EarlyDecline => "Early Decline",
            LifecycleStage::RapidCollapse => "Rapid Collapse",
            LifecycleStage::DeadTrend => "Dead Trend",
        }
    }

    /// 1-based position in the lifecycle.
    pub fn index(self) -> usize {
        match self {
            LifecycleStage::Growth => 1,
            LifecycleStage::Peak => 2,
            LifecycleStage::EarlyDecline => 3,
            LifecycleStage::RapidCollapse => 4,
            LifecycleStage::DeadTrend => 5,
        }
    }

    pub fn next(self) -> Option<LifecycleStage> {
        Self::ALL.get(self.index()).copied()
    }

    pub fn is_collapsing(self) -> bool {
        matches!(self, LifecycleStage::RapidCollapse | LifecycleStage::DeadTrend)
    }

    /// Day range until collapse, keyed on stage and engagement decay speed.
    pub fn days_to_collapse(self, decay_speed: DecaySpeed) -> &'static str {
        match (self, decay_speed) {
            (LifecycleStage::DeadTrend, _) => "Already Collapsed",
            (LifecycleStage::Growth, _) => "60+ days",
            (LifecycleStage::Peak, _) => "45-60 days",
            (LifecycleStage::EarlyDecline, DecaySpeed::Rapid) => "15-25 days",
            (LifecycleStage::EarlyDecline, DecaySpeed::Moderate) => "25-35 days",
            (LifecycleStage::EarlyDecline, DecaySpeed::Slow) => "35-45 days",
            (LifecycleStage::RapidCollapse, DecaySpeed::Rapid) => "5-10 days",
            (LifecycleStage::RapidCollapse, DecaySpeed::Moderate) => "10-15 days",
            (LifecycleStage::RapidCollapse, DecaySpeed::Slow) => "15-20 days",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WarningLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl WarningLevel {
    pub fn from_count(count: usize) -> Self {
        if count >= 4 {
            WarningLevel::Critical
        } else if count >= 2 {
            WarningLevel::High
        } else if count >= 1 {
            WarningLevel::Moderate
        } else {
            WarningLevel::Low
        }
    }

    pub fn escalate(self) -> Self {
        match self {
            WarningLevel::Low => WarningLevel::Low,
            WarningLevel::Moderate => WarningLevel::High,
            WarningLevel::High | WarningLevel::Critical => WarningLevel::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WarningLevel::Low => "Low",
            WarningLevel::Moderate => "Moderate",
            WarningLevel::High => "High",
            WarningLevel::Critical => "Critical",
        }
    }

    pub fn recommended_action(self) -> &'static str {
        match self {
            WarningLevel::Critical => {
                "Immediate intervention required - deploy emergency retention strategies"
            }
            WarningLevel::High => "Urgent attention needed - activate mitigation measures within 48 hours",
            WarningLevel::Moderate => "Close monitoring required - prepare contingency plans",
            WarningLevel::Low => "Continue routine monitoring",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyWarning {
    pub warning_level: WarningLevel,
    pub warning_threshold: f64,
    pub approaching_critical: bool,
    pub active_warnings: Vec<String>,
    pub warning_count: usize,
    pub days_to_critical_zone: String,
    pub recommended_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingFactor {
    pub factor: SignalKind,
    pub contribution: f64,
    pub raw_score: f64,
}

/// Normalized 0-100 decline score per signal. Absent signals score 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub engagement_score: f64,
    pub influencer_score: f64,
    pub sentiment_score: f64,
    pub saturation_score: f64,
}

impl SignalScores {
    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Engagement => self.engagement_score,
            SignalKind::Influencer => self.influencer_score,
            SignalKind::Sentiment => self.sentiment_score,
            SignalKind::Saturation => self.saturation_score,
        }
    }

    fn set(&mut self, kind: SignalKind, value: f64) {
        match kind {
            SignalKind::Engagement => self.engagement_score = value,
            SignalKind::Influencer => self.influencer_score = value,
            SignalKind::Sentiment => self.sentiment_score = value,
            SignalKind::Saturation => self.saturation_score = value,
        }
    }

    pub fn values(&self) -> [f64; 4] {
        SignalKind::CANONICAL.map(|kind| self.get(kind))
    }
}

/// Per-signal `score × weight`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedContributions {
    pub engagement_weight: f64,
    pub influencer_weight: f64,
    pub sentiment_weight: f64,
    pub saturation_weight: f64,
}

impl WeightedContributions {
    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Engagement => self.engagement_weight,
            SignalKind::Influencer => self.influencer_weight,
            SignalKind::Sentiment => self.sentiment_weight,
            SignalKind::Saturation => self.saturation_weight,
        }
    }

    fn set(&mut self, kind: SignalKind, value: f64) {
        match kind {
            SignalKind::Engagement => self.engagement_weight = value,
            SignalKind::Influencer => self.influencer_weight = value,
            SignalKind::Sentiment => self.sentiment_weight = value,
            SignalKind::Saturation => self.saturation_weight = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub decline_probability: f64,
    pub lifecycle_stage: LifecycleStage,
    pub days_to_collapse: String,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub early_warning: EarlyWarning,
    pub signal_scores: SignalScores,
    pub weighted_contributions: WeightedContributions,
    pub contributing_factors: Vec<ContributingFactor>,
    pub missing_signals: Vec<SignalKind>,
    pub recommendations: Vec<String>,
    pub insights: String,
}

#[derive(Debug, Clone)]
pub struct DeclinePredictor {
    weights: FusionWeights,
    config: PredictorConfig,
}

impl DeclinePredictor {
    pub fn new(weights: FusionWeights, config: PredictorConfig) -> Result<Self, DeclineError> {
        weights.validate()?;
        config.stages.validate()?;
        Ok(Self { weights, config })
    }

    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn lifecycle_stage(&self, probability: f64) -> LifecycleStage {
        self.config.stages.stage(probability)
    }

    pub fn predict(&self, signals: &AggregatedSignals) -> Result<PredictionResult, DeclineError> {
        if signals.is_empty() {
            return Err(DeclineError::NoSignalsAvailable);
        }

        let scores = normalize(signals);
        let raw_probability: f64 = SignalKind::CANONICAL
            .iter()
            .map(|kind| scores.get(*kind) * self.weights.get(*kind))
            .sum();
        // Bins and thresholds see the unrounded value; only the output is rounded.
        let clamped = stats::clamp(raw_probability, 0.0, 100.0);
        let probability = stats::round_to(clamped, 2);

        let stage = self.lifecycle_stage(clamped);
        let decay_speed = signals
            .engagement
            .as_ref()
            .map(|signal| signal.decay_speed)
            .unwrap_or(DecaySpeed::Moderate);
        let days_to_collapse = stage.days_to_collapse(decay_speed).to_string();
        let risk_level = self.risk_level(clamped, stage);
        let confidence = self.confidence(signals);
        let factors = self.contributing_factors(&scores);
        let early_warning = self.early_warning(clamped, &scores, signals);

        let mut signal_scores = SignalScores::default();
        let mut contributions = WeightedContributions::default();
        for kind in SignalKind::CANONICAL {
            let score = scores.get(kind);
            signal_scores.set(kind, stats::round_to(score, 2));
            contributions.set(kind, stats::round_to(score * self.weights.get(kind), 2));
        }

        Ok(PredictionResult {
            decline_probability: probability,
            lifecycle_stage: stage,
            recommendations: recommendations(stage, &factors),
            insights: insights(probability, stage, &days_to_collapse, risk_level),
            days_to_collapse,
            risk_level,
            confidence,
            early_warning,
            signal_scores,
            weighted_contributions: contributions,
            contributing_factors: factors,
            missing_signals: signals.missing(),
        })
    }

    fn risk_level(&self, probability: f64, stage: LifecycleStage) -> RiskLevel {
        let risk = &self.config.risk;
        if probability >= risk.critical || stage.is_collapsing() {
            RiskLevel::Critical
        } else if probability >= risk.high || stage == LifecycleStage::EarlyDecline {
            RiskLevel::High
        } else if probability >= risk.medium || stage == LifecycleStage::Peak {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn confidence(&self, signals: &AggregatedSignals) -> f64 {
        if self.config.expected_indicators == 0 {
            return 0.0;
        }
        let available = signals.present_count() * 3;
        let coverage = available as f64 / self.config.expected_indicators as f64 * 100.0;
        stats::round_to(coverage.min(100.0), 2)
    }

    fn contributing_factors(&self, scores: &SignalScores) -> Vec<ContributingFactor> {
        let mut factors: Vec<(f64, ContributingFactor)> = SignalKind::CANONICAL
            .iter()
            .map(|kind| {
                let score = scores.get(*kind);
                let contribution = stats::round_to(score * self.weights.get(*kind), 2);
                (
                    contribution,
                    ContributingFactor {
                        factor: *kind,
                        contribution,
                        raw_score: stats::round_to(score, 2),
                    },
                )
            })
            .collect();
        // Sorted on the emitted value; stable sort keeps canonical order for ties.
        factors.sort_by(|a, b| b.0.total_cmp(&a.0));
        factors.into_iter().map(|(_, factor)| factor).collect()
    }

    fn early_warning(
        &self,
        probability: f64,
        scores: &SignalScores,
        signals: &AggregatedSignals,
    ) -> EarlyWarning {
        let config = &self.config.early_warning;
        let mut warnings = Vec::new();

        if scores.engagement_score > config.engagement {
            warnings.push("Engagement showing early decline signs".to_string());
        }
        if scores.influencer_score > config.influencer {
            warnings.push("Influencer disengagement detected".to_string());
        }
        if scores.sentiment_score > config.sentiment {
            warnings.push("Sentiment deterioration observed".to_string());
        }
        if scores.saturation_score > config.saturation {
            warnings.push("Market saturation approaching critical levels".to_string());
        }
        let rapid = signals
            .engagement
            .as_ref()
            .map(|signal| signal.decay_speed == DecaySpeed::Rapid)
            .unwrap_or(false);
        if rapid {
            warnings.push("Rapid decay velocity detected - accelerated decline possible".to_string());
        }
        let high_signals = scores
            .values()
            .iter()
            .filter(|score| **score > config.high_signal)
            .count();
        if high_signals >= 2 {
            warnings.push("Multiple signals showing high risk - cascading failure possible".to_string());
        }

        let level = WarningLevel::from_count(warnings.len());
        let days_to_critical_zone = if probability < config.warning_threshold {
            "Not applicable - no immediate warning"
        } else if probability < config.critical_zone {
            "5-15 days until critical zone"
        } else {
            "Already in critical zone"
        };

        EarlyWarning {
            warning_level: level,
            warning_threshold: config.warning_threshold,
            approaching_critical: probability > config.warning_threshold
                && probability < config.critical_zone,
            warning_count: warnings.len(),
            active_warnings: warnings,
            days_to_critical_zone: days_to_critical_zone.to_string(),
            recommended_action: level.recommended_action().to_string(),
        }
    }
}

/// Maps each present signal's raw indicators onto a 0-100 decline score.
pub fn normalize(signals: &AggregatedSignals) -> SignalScores {
    let mut scores = SignalScores::default();

    if let Some(engagement) = &signals.engagement {
        let multiplier = match engagement.decay_speed {
            DecaySpeed::Slow => 0.8,
            DecaySpeed::Moderate => 1.0,
            DecaySpeed::Rapid => 1.3,
        };
        scores.engagement_score =
            stats::clamp(engagement.engagement_decline_percent * multiplier, 0.0, 100.0);
    }

    if let Some(influencer) = &signals.influencer {
        let penalty = 100.0 - influencer.influence_impact_score;
        scores.influencer_score = stats::clamp(
            influencer.participation_drop_percent * 0.7 + penalty * 0.3,
            0.0,
            100.0,
        );
    }

    if let Some(sentiment) = &signals.sentiment {
        let multiplier = match sentiment.impact_level {
            RiskLevel::Low => 0.5,
            RiskLevel::Medium => 1.0,
            RiskLevel::High => 1.5,
            RiskLevel::Critical => 2.0,
        };
        scores.sentiment_score = stats::clamp(
            sentiment.metrics.sentiment_change_percent.abs() * multiplier,
            0.0,
            100.0,
        );
    }

    if let Some(saturation) = &signals.saturation {
        scores.saturation_score = stats::clamp(saturation.saturation_score, 0.0, 100.0);
    }

    scores
}

fn recommendations(stage: LifecycleStage, factors: &[ContributingFactor]) -> Vec<String> {
    let mut recommendations = Vec::new();

    if let Some(top) = factors.first() {
        let message = match top.factor {
            SignalKind::Engagement if top.contribution > 20.0 => {
                Some("Boost engagement through interactive content and contests")
            }
            SignalKind::Influencer if top.contribution > 15.0 => {
                Some("Re-engage key influencers with exclusive opportunities")
            }
            SignalKind::Sentiment if top.contribution > 15.0 => {
                Some("Address negative sentiment through quality improvements")
            }
            SignalKind::Saturation if top.contribution > 15.0 => {
                Some("Introduce fresh variations to combat content fatigue")
            }
            _ => None,
        };
        if let Some(message) = message {
            recommendations.push(message.to_string());
        }
    }

    match stage {
        LifecycleStage::EarlyDecline => {
            recommendations.push("Monitor metrics daily and activate retention strategies".to_string())
        }
        LifecycleStage::RapidCollapse => recommendations
            .push("Urgent intervention required - consider pivot or wind-down".to_string()),
        LifecycleStage::Peak => recommendations
            .push("Prepare for decline phase - build sustainability strategies".to_string()),
        _ => {}
    }

    if recommendations.is_empty() {
        recommendations.push("Continue current strategy".to_string());
    }
    recommendations
}

fn insights(probability: f64, stage: LifecycleStage, days: &str, risk: RiskLevel) -> String {
    if stage == LifecycleStage::DeadTrend {
        return format!(
            "DEAD TREND: Decline probability {:.1}%. Trend has collapsed. Post-mortem analysis recommended.",
            probability
        );
    }
    match risk {
        RiskLevel::Critical => format!(
            "CRITICAL: {} with {:.1}% decline probability. Estimated collapse: {}. Immediate action required.",
            stage, probability, days
        ),
        RiskLevel::High => format!(
            "HIGH RISK: {} detected. Decline probability: {:.1}%. Time to collapse: {}. Activate mitigation strategies.",
            stage, probability, days
        ),
        RiskLevel::Medium => format!(
            "MEDIUM RISK: Currently in {}. Decline probability: {:.1}%. Monitor closely for deterioration.",
            stage, probability
        ),
        RiskLevel::Low => format!(
            "LOW RISK: {} with {:.1}% decline probability. Trend is healthy. Continue growth strategies.",
            stage, probability
        ),
    }
}
