pub mod client;
pub mod templates;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::predictor::PredictionResult;

pub use client::CompletionClient;

pub const TEMPLATE_MODEL: &str = "template";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.featherless.ai/v1/completions".to_string(),
            model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            timeout_ms: 30_000,
            max_tokens: 400,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    Ai,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeResponse {
    pub explanation: String,
    pub source: NarrativeSource,
    pub model: String,
}

impl NarrativeResponse {
    pub fn template(prediction: &PredictionResult) -> Self {
        Self {
            explanation: templates::narrative_explanation(prediction),
            source: NarrativeSource::Template,
            model: TEMPLATE_MODEL.to_string(),
        }
    }
}

/// Business explanation of a prediction. Uses the completion service when
/// one is configured and always falls back to the template text.
#[derive(Clone, Default)]
pub struct NarrativeGenerator {
    client: Option<CompletionClient>,
}

impl NarrativeGenerator {
    pub fn new(client: Option<CompletionClient>) -> Self {
        Self { client }
    }

    pub fn from_config(config: &NarrativeConfig) -> Self {
        match CompletionClient::from_env(config) {
            Ok(client) => Self::new(Some(client)),
            Err(err) => {
                debug!(error = %err, "narrative service disabled, using templates");
                Self::new(None)
            }
        }
    }

    pub fn is_ai_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn explain(&self, prediction: &PredictionResult) -> NarrativeResponse {
        let Some(client) = &self.client else {
            return NarrativeResponse::template(prediction);
        };

        let prompt = templates::narrative_prompt(prediction);
        match client.complete(&prompt).await {
            Ok(explanation) => NarrativeResponse {
                explanation,
                source: NarrativeSource::Ai,
                model: client.model().to_string(),
            },
            Err(err) => {
                warn!(error = %err, "narrative service failed, falling back to template");
                NarrativeResponse::template(prediction)
            }
        }
    }
}
