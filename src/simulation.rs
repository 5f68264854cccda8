use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::DeclineError;
use crate::predictor::{DeclinePredictor, LifecycleStage, PredictionResult};
use crate::signals::stats;
use crate::signals::AggregatedSignals;

/// Fractional what-if adjustments. Boosts and improvements shrink the
/// matching decline indicator by `(1 - value)`, drops and declines grow it
/// by `(1 + |value|)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_boost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_drop: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_improvement: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_decline: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influencer_boost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influencer_drop: Option<f64>,
}

impl ParameterChanges {
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, value)| value.is_none())
    }

    fn entries(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("engagement_boost", self.engagement_boost),
            ("engagement_drop", self.engagement_drop),
            ("sentiment_improvement", self.sentiment_improvement),
            ("sentiment_decline", self.sentiment_decline),
            ("influencer_boost", self.influencer_boost),
            ("influencer_drop", self.influencer_drop),
        ]
    }

    pub fn validate(&self) -> Result<(), DeclineError> {
        for (name, value) in self.entries() {
            let Some(value) = value else { continue };
            if !value.is_finite() || value.abs() > 1.0 {
                return Err(DeclineError::InvalidInput(format!(
                    "{} must be a fraction between -1.0 and 1.0, got {}",
                    name, value
                )));
            }
            let is_gain = name.ends_with("boost") || name.ends_with("improvement");
            if is_gain && value < 0.0 {
                return Err(DeclineError::InvalidInput(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Returns a modified copy of `signals`; the input is never touched.
    pub fn apply(&self, signals: &AggregatedSignals) -> AggregatedSignals {
        let mut modified = signals.clone();

        if let Some(engagement) = modified.engagement.as_mut() {
            if let Some(boost) = self.engagement_boost {
                engagement.engagement_decline_percent =
                    (engagement.engagement_decline_percent * (1.0 - boost)).max(0.0);
            }
            if let Some(drop) = self.engagement_drop {
                engagement.engagement_decline_percent *= 1.0 + drop.abs();
            }
        }

        if let Some(sentiment) = modified.sentiment.as_mut() {
            if let Some(improvement) = self.sentiment_improvement {
                sentiment.metrics.sentiment_change_percent *= 1.0 - improvement;
            }
            if let Some(decline) = self.sentiment_decline {
                sentiment.metrics.sentiment_change_percent *= 1.0 + decline.abs();
            }
        }

        if let Some(influencer) = modified.influencer.as_mut() {
            if let Some(boost) = self.influencer_boost {
                influencer.participation_drop_percent =
                    (influencer.participation_drop_percent * (1.0 - boost)).max(0.0);
                influencer.influence_impact_score =
                    (influencer.influence_impact_score * (1.0 + boost)).min(100.0);
            }
            if let Some(drop) = self.influencer_drop {
                influencer.participation_drop_percent *= 1.0 + drop.abs();
            }
        }

        modified
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactCategory {
    #[serde(rename = "Significant Improvement")]
    SignificantImprovement,
    #[serde(rename = "Moderate Improvement")]
    ModerateImprovement,
    #[serde(rename = "Minimal Change")]
    MinimalChange,
    #[serde(rename = "Moderate Deterioration")]
    ModerateDeterioration,
    #[serde(rename = "Significant Deterioration")]
    SignificantDeterioration,
}

impl ImpactCategory {
    pub fn from_change(change: f64) -> Self {
        if change < -15.0 {
            ImpactCategory::SignificantImprovement
        } else if change < -5.0 {
            ImpactCategory::ModerateImprovement
        } else if change < 5.0 {
            ImpactCategory::MinimalChange
        } else if change < 15.0 {
            ImpactCategory::ModerateDeterioration
        } else {
            ImpactCategory::SignificantDeterioration
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImpactCategory::SignificantImprovement => "Significant Improvement",
            ImpactCategory::ModerateImprovement => "Moderate Improvement",
            ImpactCategory::MinimalChange => "Minimal Change",
            ImpactCategory::ModerateDeterioration => "Moderate Deterioration",
            ImpactCategory::SignificantDeterioration => "Significant Deterioration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Improvement,
    Neutral,
    Deterioration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecoveryPotential {
    None,
    Low,
    Moderate,
    High,
}

impl RecoveryPotential {
    pub fn from_change(change: f64) -> Self {
        if change < -20.0 {
            RecoveryPotential::High
        } else if change < -10.0 {
            RecoveryPotential::Moderate
        } else if change < 0.0 {
            RecoveryPotential::Low
        } else {
            RecoveryPotential::None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecoveryPotential::None => "None",
            RecoveryPotential::Low => "Low",
            RecoveryPotential::Moderate => "Moderate",
            RecoveryPotential::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    pub probability_change: f64,
    pub percent_change: f64,
    pub impact_category: ImpactCategory,
    pub direction: ChangeDirection,
}

impl ImpactAnalysis {
    pub fn between(original: f64, new: f64) -> Self {
        let change = new - original;
        let percent = if original > 0.0 {
            change / original * 100.0
        } else {
            0.0
        };
        let direction = if change < 0.0 {
            ChangeDirection::Improvement
        } else if change > 0.0 {
            ChangeDirection::Deterioration
        } else {
            ChangeDirection::Neutral
        };
        Self {
            probability_change: stats::round_to(change, 2),
            percent_change: stats::round_to(percent, 2),
            impact_category: ImpactCategory::from_change(change),
            direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario_name: String,
    pub original_decline_probability: f64,
    pub new_decline_probability: f64,
    pub original_lifecycle_stage: LifecycleStage,
    pub new_lifecycle_stage: LifecycleStage,
    pub original_days_to_collapse: String,
    pub new_days_to_collapse: String,
    pub parameter_changes: ParameterChanges,
    pub impact_analysis: ImpactAnalysis,
    pub recovery_potential: RecoveryPotential,
    pub full_prediction: PredictionResult,
}

#[derive(Debug, Clone)]
pub struct ScenarioPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub changes: ParameterChanges,
}

/// The canned optimistic, realistic and pessimistic scenarios.
pub fn scenario_presets() -> Vec<ScenarioPreset> {
    vec![
        ScenarioPreset {
            id: "optimistic",
            name: "Optimistic Recovery",
            changes: ParameterChanges {
                influencer_boost: Some(0.30),
                engagement_boost: Some(0.25),
                sentiment_improvement: Some(0.20),
                ..ParameterChanges::default()
            },
        },
        ScenarioPreset {
            id: "realistic",
            name: "Realistic Improvement",
            changes: ParameterChanges {
                influencer_boost: Some(0.15),
                engagement_boost: Some(0.10),
                sentiment_improvement: Some(0.05),
                ..ParameterChanges::default()
            },
        },
        ScenarioPreset {
            id: "pessimistic",
            name: "Pessimistic Decline",
            changes: ParameterChanges {
                influencer_drop: Some(-0.20),
                engagement_drop: Some(-0.15),
                sentiment_decline: Some(-0.10),
                ..ParameterChanges::default()
            },
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub scenarios: BTreeMap<String, SimulationResult>,
    pub most_likely_outcome: String,
    pub best_case: Option<String>,
    pub worst_case: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SimulationEngine {
    predictor: DeclinePredictor,
}

impl SimulationEngine {
    pub fn new(predictor: DeclinePredictor) -> Self {
        Self { predictor }
    }

    pub fn simulate(
        &self,
        signals: &AggregatedSignals,
        baseline: &PredictionResult,
        changes: &ParameterChanges,
        scenario_name: &str,
    ) -> Result<SimulationResult, DeclineError> {
        changes.validate()?;
        let modified = changes.apply(signals);
        let prediction = self.predictor.predict(&modified)?;
        let impact = ImpactAnalysis::between(baseline.decline_probability, prediction.decline_probability);
        debug!(
            scenario = scenario_name,
            original = baseline.decline_probability,
            new = prediction.decline_probability,
            "simulation complete"
        );

        Ok(SimulationResult {
            scenario_name: scenario_name.to_string(),
            original_decline_probability: baseline.decline_probability,
            new_decline_probability: prediction.decline_probability,
            original_lifecycle_stage: baseline.lifecycle_stage,
            new_lifecycle_stage: prediction.lifecycle_stage,
            original_days_to_collapse: baseline.days_to_collapse.clone(),
            new_days_to_collapse: prediction.days_to_collapse.clone(),
            parameter_changes: changes.clone(),
            recovery_potential: RecoveryPotential::from_change(impact.probability_change),
            impact_analysis: impact,
            full_prediction: prediction,
        })
    }

    pub fn run_multiple_scenarios(
        &self,
        signals: &AggregatedSignals,
        baseline: &PredictionResult,
    ) -> Result<ScenarioComparison, DeclineError> {
        let mut scenarios = BTreeMap::new();
        for preset in scenario_presets() {
            let result = self.simulate(signals, baseline, &preset.changes, preset.name)?;
            scenarios.insert(preset.id.to_string(), result);
        }

        let present = |id: &str| scenarios.contains_key(id).then(|| id.to_string());
        Ok(ScenarioComparison {
            most_likely_outcome: present("realistic").unwrap_or_else(|| "unknown".to_string()),
            best_case: present("optimistic"),
            worst_case: present("pessimistic"),
            scenarios,
        })
    }
}
