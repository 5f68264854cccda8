use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::DeclineConfig;
use crate::enhancer::{
    ConfidenceAssessment, ConfidenceLevel, DeclineDriver, IntelligenceEnhancer, LifecycleView,
    RiskClassification,
};
use crate::error::DeclineError;
use crate::executive::{EnhancedEarlyWarning, ExecutiveIntelligence, ExecutiveSummary, SummaryContext};
use crate::narrative::templates;
use crate::predictor::{ContributingFactor, DeclinePredictor, LifecycleStage, PredictionResult};
use crate::series::SignalInput;
use crate::signals::{
    AggregatedSignals, Disengagement, EngagementExtractor, InfluencerExtractor, RiskLevel,
    SaturationExtractor, SentimentExtractor, SignalExtractor, SignalKind, SignalSummary,
};
use crate::simulation::{ParameterChanges, ScenarioComparison, SimulationEngine, SimulationResult};
use crate::stable_hash64;

pub const UNKNOWN_TREND: &str = "Unknown Trend";

/// An extractor that raised for this request and was dropped from fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFailure {
    pub signal: SignalKind,
    pub agent: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: RiskLevel,
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementDriver {
    pub decline_percent: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentDriver {
    pub shift: String,
    pub impact_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerDriver {
    pub participation_drop: f64,
    pub disengagement: Disengagement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationDriver {
    pub saturation_score: f64,
    pub fatigue_detected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclineDrivers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<EngagementDriver>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentDriver>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influencer: Option<InfluencerDriver>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<SaturationDriver>,
}

impl DeclineDrivers {
    fn from_signals(signals: &AggregatedSignals) -> Self {
        Self {
            engagement: signals.engagement.as_ref().map(|signal| EngagementDriver {
                decline_percent: signal.engagement_decline_percent,
                risk_level: signal.risk_level,
            }),
            sentiment: signals.sentiment.as_ref().map(|signal| SentimentDriver {
                shift: signal.sentiment_shift.clone(),
                impact_level: signal.impact_level,
            }),
            influencer: signals.influencer.as_ref().map(|signal| InfluencerDriver {
                participation_drop: signal.participation_drop_percent,
                disengagement: signal.disengagement_status,
            }),
            saturation: signals.saturation.as_ref().map(|signal| SaturationDriver {
                saturation_score: signal.saturation_score,
                fatigue_detected: signal.fatigue_detected,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub contributing_factors: Vec<ContributingFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_decline: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influencer_drop: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation_level: Option<f64>,
    pub overall_decline_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub trend_name: String,
    pub data_points: usize,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Unified result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub analysis_id: String,
    pub trend_name: String,
    pub decline_probability: f64,
    pub lifecycle_stage: LifecycleStage,
    pub days_to_collapse: String,
    pub early_warning: EnhancedEarlyWarning,
    pub decline_drivers: DeclineDrivers,
    pub narrative_explanation: String,
    pub strategy_recommendations: Vec<String>,
    pub prediction: PredictionSummary,
    pub summary: String,
    pub key_insights: Vec<String>,
    pub key_metrics: KeyMetrics,
    pub alerts: Vec<Alert>,
    pub confidence_analysis: ConfidenceAssessment,
    pub risk_classification: RiskClassification,
    pub driver_ranking: Vec<DeclineDriver>,
    pub lifecycle_visualization: LifecycleView,
    pub executive_summary: ExecutiveSummary,
    pub signal_summaries: BTreeMap<SignalKind, SignalSummary>,
    pub signal_failures: Vec<SignalFailure>,
    pub signal_details: AggregatedSignals,
    pub decline_prediction: PredictionResult,
    pub metadata: AnalysisMetadata,
}

/// Runs extractors, predictor and enhancers over one input. Every component
/// is injected and holds only configuration, so one instance serves any
/// number of requests.
#[derive(Debug, Clone)]
pub struct TrendOrchestrator {
    engagement: EngagementExtractor,
    sentiment: SentimentExtractor,
    influencer: InfluencerExtractor,
    saturation: SaturationExtractor,
    predictor: DeclinePredictor,
    enhancer: IntelligenceEnhancer,
    executive: ExecutiveIntelligence,
    simulation: SimulationEngine,
}

impl TrendOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engagement: EngagementExtractor,
        sentiment: SentimentExtractor,
        influencer: InfluencerExtractor,
        saturation: SaturationExtractor,
        predictor: DeclinePredictor,
        enhancer: IntelligenceEnhancer,
        executive: ExecutiveIntelligence,
    ) -> Self {
        let simulation = SimulationEngine::new(predictor.clone());
        Self {
            engagement,
            sentiment,
            influencer,
            saturation,
            predictor,
            enhancer,
            executive,
            simulation,
        }
    }

    pub fn from_config(config: &DeclineConfig) -> Result<Self, DeclineError> {
        config.validate()?;
        Ok(Self::new(
            EngagementExtractor::new(config.engagement.clone()),
            SentimentExtractor::new(config.sentiment.clone()),
            InfluencerExtractor::new(config.influencer.clone()),
            SaturationExtractor::new(config.saturation.clone()),
            DeclinePredictor::new(config.weights.clone(), config.predictor.clone())?,
            IntelligenceEnhancer::new(config.enhancer.clone())?,
            ExecutiveIntelligence::new(),
        ))
    }

    pub fn predictor(&self) -> &DeclinePredictor {
        &self.predictor
    }

    /// Runs all four extractors. A failing extractor leaves its slot empty
    /// and is reported instead of aborting the run.
    pub fn collect_signals(&self, input: &SignalInput) -> (AggregatedSignals, Vec<SignalFailure>) {
        let mut failures = Vec::new();
        let signals = AggregatedSignals {
            engagement: run_extractor(&self.engagement, input, &mut failures),
            sentiment: run_extractor(&self.sentiment, input, &mut failures),
            influencer: run_extractor(&self.influencer, input, &mut failures),
            saturation: run_extractor(&self.saturation, input, &mut failures),
        };
        (signals, failures)
    }

    pub fn analyze(
        &self,
        input: &SignalInput,
        trend_name: Option<&str>,
    ) -> Result<TrendAnalysis, DeclineError> {
        let trend_name = resolve_trend_name(input, trend_name);
        let (signals, failures) = self.collect_signals(input);
        if signals.is_empty() {
            warn!(trend = %trend_name, failures = failures.len(), "no signals available");
            return Err(DeclineError::NoSignalsAvailable);
        }

        let prediction = self.predictor.predict(&signals)?;
        let confidence = self.enhancer.calculate_confidence(&prediction, &signals);
        let risk = self.enhancer.classify_risk(prediction.decline_probability);
        let drivers = self.enhancer.rank_decline_drivers(&prediction);
        let lifecycle = self.enhancer.detect_lifecycle_stage(&prediction);
        let early_warning = self.executive.enhance_early_warning(&prediction, &signals);
        let recommendations = templates::strategy_recommendations(&prediction);
        let executive_summary = self.executive.generate_executive_summary(SummaryContext {
            prediction: &prediction,
            risk: &risk,
            confidence: &confidence,
            drivers: &drivers,
            early_warning: &early_warning,
            recommendations: &recommendations,
        });

        info!(
            trend = %trend_name,
            probability = prediction.decline_probability,
            stage = prediction.lifecycle_stage.label(),
            signals = signals.present_count(),
            "trend analysis complete"
        );

        Ok(TrendAnalysis {
            analysis_id: analysis_id(input, &trend_name)?,
            decline_probability: prediction.decline_probability,
            lifecycle_stage: prediction.lifecycle_stage,
            days_to_collapse: prediction.days_to_collapse.clone(),
            early_warning,
            decline_drivers: DeclineDrivers::from_signals(&signals),
            narrative_explanation: templates::narrative_explanation(&prediction),
            strategy_recommendations: recommendations,
            prediction: PredictionSummary {
                risk_level: prediction.risk_level,
                confidence: prediction.confidence,
                confidence_level: confidence.confidence_level,
                contributing_factors: prediction.contributing_factors.clone(),
            },
            summary: summary_text(&prediction),
            key_insights: templates::key_insights(&prediction),
            key_metrics: key_metrics(&signals, &prediction),
            alerts: alerts(&signals, &prediction),
            confidence_analysis: confidence,
            risk_classification: risk,
            driver_ranking: drivers,
            lifecycle_visualization: lifecycle,
            executive_summary,
            signal_summaries: signals.summaries(),
            signal_failures: failures,
            metadata: metadata(input, &trend_name),
            trend_name,
            signal_details: signals,
            decline_prediction: prediction,
        })
    }

    pub fn simulate(
        &self,
        analysis: &TrendAnalysis,
        changes: &ParameterChanges,
        scenario_name: &str,
    ) -> Result<SimulationResult, DeclineError> {
        self.simulation.simulate(
            &analysis.signal_details,
            &analysis.decline_prediction,
            changes,
            scenario_name,
        )
    }

    pub fn run_scenarios(&self, analysis: &TrendAnalysis) -> Result<ScenarioComparison, DeclineError> {
        self.simulation
            .run_multiple_scenarios(&analysis.signal_details, &analysis.decline_prediction)
    }
}

fn run_extractor<E: SignalExtractor>(
    extractor: &E,
    input: &SignalInput,
    failures: &mut Vec<SignalFailure>,
) -> Option<E::Output> {
    let kind = extractor.kind();
    match extractor.extract(input) {
        Ok(signal) => {
            debug!(signal = kind.label(), "extractor succeeded");
            Some(signal)
        }
        Err(err) => {
            warn!(signal = kind.label(), error = %err, "extractor failed, continuing without it");
            failures.push(SignalFailure {
                signal: kind,
                agent: kind.agent_name().to_string(),
                error: err.to_string(),
            });
            None
        }
    }
}

fn resolve_trend_name(input: &SignalInput, explicit: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| input.as_series().and_then(|table| table.trend_name()))
        .unwrap_or(UNKNOWN_TREND)
        .to_string()
}

fn analysis_id(input: &SignalInput, trend_name: &str) -> Result<String, DeclineError> {
    let body = match input {
        SignalInput::Series(table) => serde_json::to_string(table)?,
        SignalInput::Snapshot(snapshot) => serde_json::to_string(snapshot)?,
    };
    Ok(format!("{:016x}", stable_hash64(&format!("{}\n{}", trend_name, body))))
}

fn metadata(input: &SignalInput, trend_name: &str) -> AnalysisMetadata {
    let table = input.as_series();
    AnalysisMetadata {
        trend_name: trend_name.to_string(),
        data_points: input.data_points(),
        start_date: table.and_then(|table| table.first_date()).map(str::to_string),
        end_date: table.and_then(|table| table.last_date()).map(str::to_string),
    }
}

fn summary_text(prediction: &PredictionResult) -> String {
    format!(
        "The trend is currently in {} with a {:.1}% decline probability. Risk level is {}. Estimated time to collapse: {}.",
        prediction.lifecycle_stage,
        prediction.decline_probability,
        prediction.risk_level.label(),
        prediction.days_to_collapse
    )
}

fn key_metrics(signals: &AggregatedSignals, prediction: &PredictionResult) -> KeyMetrics {
    KeyMetrics {
        engagement_decline: signals
            .engagement
            .as_ref()
            .map(|signal| signal.engagement_decline_percent),
        sentiment_change: signals
            .sentiment
            .as_ref()
            .map(|signal| signal.metrics.sentiment_change_percent),
        influencer_drop: signals
            .influencer
            .as_ref()
            .map(|signal| signal.participation_drop_percent),
        saturation_level: signals.saturation.as_ref().map(|signal| signal.saturation_score),
        overall_decline_probability: prediction.decline_probability,
    }
}

fn alerts(signals: &AggregatedSignals, prediction: &PredictionResult) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if prediction.risk_level == RiskLevel::Critical {
        alerts.push(Alert {
            severity: RiskLevel::Critical,
            source: "Decline Predictor".to_string(),
            message: prediction.insights.clone(),
        });
    }
    if let Some(engagement) = &signals.engagement {
        if engagement.risk_level == RiskLevel::High {
            alerts.push(Alert {
                severity: RiskLevel::High,
                source: SignalKind::Engagement.agent_name().to_string(),
                message: format!(
                    "Engagement declined {:.1}%",
                    engagement.engagement_decline_percent
                ),
            });
        }
    }
    if let Some(sentiment) = &signals.sentiment {
        if sentiment.impact_level.is_elevated() {
            alerts.push(Alert {
                severity: sentiment.impact_level,
                source: SignalKind::Sentiment.agent_name().to_string(),
                message: format!("Sentiment shift: {}", sentiment.sentiment_shift),
            });
        }
    }
    if let Some(influencer) = &signals.influencer {
        if influencer.risk_level.is_elevated() {
            alerts.push(Alert {
                severity: influencer.risk_level,
                source: SignalKind::Influencer.agent_name().to_string(),
                message: format!("{} detected", influencer.disengagement_status.label()),
            });
        }
    }
    if let Some(saturation) = &signals.saturation {
        if saturation.fatigue_detected {
            alerts.push(Alert {
                severity: RiskLevel::High,
                source: SignalKind::Saturation.agent_name().to_string(),
                message: format!(
                    "Content fatigue at {:.1}% saturation",
                    saturation.saturation_score
                ),
            });
        }
    }
    alerts
}
