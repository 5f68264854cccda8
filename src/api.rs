use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use crate::narrative::templates;
use crate::orchestrator::Alert;
use crate::simulation::ScenarioComparison;
use crate::{
    parse_input, DeclineError, LifecycleStage, NarrativeResponse, ParameterChanges, SignalInput,
    SimulationResult, TrendAnalysis,
};

#[derive(Debug, Deserialize)]
pub struct ApiAnalysisRequest {
    pub request_id: Option<String>,
    pub trend_name: Option<String>,
    pub data: Option<Value>,
}

impl ApiAnalysisRequest {
    pub fn into_input(self) -> Result<(SignalInput, Option<String>), DeclineError> {
        let data = self
            .data
            .ok_or_else(|| DeclineError::InvalidInput("data is required".to_string()))?;
        let input = parse_input(data)?;
        let trend_name = self
            .trend_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok((input, trend_name))
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiSimulationRequest {
    pub request_id: Option<String>,
    pub trend_name: Option<String>,
    pub data: Option<Value>,
    pub scenario_name: Option<String>,
    #[serde(default)]
    pub parameter_changes: ParameterChanges,
}

impl ApiSimulationRequest {
    pub fn analysis_request(&mut self) -> ApiAnalysisRequest {
        ApiAnalysisRequest {
            request_id: self.request_id.clone(),
            trend_name: self.trend_name.take(),
            data: self.data.take(),
        }
    }

    pub fn scenario_name(&self) -> String {
        self.scenario_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("Custom Scenario")
            .to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiAnalysisResponse {
    pub request_id: String,
    pub status: &'static str,
    #[serde(flatten)]
    pub analysis: TrendAnalysis,
}

impl ApiAnalysisResponse {
    pub fn from_analysis(analysis: TrendAnalysis, request_id: String) -> Self {
        Self {
            request_id,
            status: "success",
            analysis,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiEarlyWarningResponse {
    pub request_id: String,
    pub trend_name: String,
    pub decline_probability: f64,
    pub lifecycle_stage: LifecycleStage,
    pub days_to_collapse: String,
    pub early_warning: crate::executive::EnhancedEarlyWarning,
    pub alerts: Vec<Alert>,
}

impl ApiEarlyWarningResponse {
    pub fn from_analysis(analysis: TrendAnalysis, request_id: String) -> Self {
        Self {
            request_id,
            trend_name: analysis.trend_name,
            decline_probability: analysis.decline_probability,
            lifecycle_stage: analysis.lifecycle_stage,
            days_to_collapse: analysis.days_to_collapse,
            early_warning: analysis.early_warning,
            alerts: analysis.alerts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiNarrativeResponse {
    pub request_id: String,
    pub trend_name: String,
    #[serde(flatten)]
    pub narrative: NarrativeResponse,
    pub strategy_recommendations: Vec<String>,
    pub key_insights: Vec<String>,
}

impl ApiNarrativeResponse {
    pub fn new(analysis: TrendAnalysis, narrative: NarrativeResponse, request_id: String) -> Self {
        Self {
            request_id,
            trend_name: analysis.trend_name,
            narrative,
            strategy_recommendations: analysis.strategy_recommendations,
            key_insights: analysis.key_insights,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiSimulationResponse {
    pub request_id: String,
    pub trend_name: String,
    pub explanation: String,
    #[serde(flatten)]
    pub result: SimulationResult,
}

impl ApiSimulationResponse {
    pub fn from_result(trend_name: String, result: SimulationResult, request_id: String) -> Self {
        Self {
            request_id,
            trend_name,
            explanation: templates::simulation_explanation(&result),
            result,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiScenariosResponse {
    pub request_id: String,
    pub trend_name: String,
    pub explanations: BTreeMap<String, String>,
    #[serde(flatten)]
    pub comparison: ScenarioComparison,
}

impl ApiScenariosResponse {
    pub fn from_comparison(trend_name: String, comparison: ScenarioComparison, request_id: String) -> Self {
        let explanations = comparison
            .scenarios
            .iter()
            .map(|(id, result)| (id.clone(), templates::simulation_explanation(result)))
            .collect();
        Self {
            request_id,
            trend_name,
            explanations,
            comparison,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiFailure {
    pub request_id: String,
    pub status: &'static str,
    pub error: String,
}
