use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::NarrativeError;
use crate::narrative::NarrativeConfig;

pub const API_KEY_VAR: &str = "FEATHERLESS_API_KEY";

/// Text-completion endpoint speaking the `/v1/completions` shape.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

impl CompletionClient {
    pub fn new(config: &NarrativeConfig, api_key: String) -> Result<Self, NarrativeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| NarrativeError::Request(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    pub fn from_env(config: &NarrativeConfig) -> Result<Self, NarrativeError> {
        let api_key = env::var(API_KEY_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| NarrativeError::NotConfigured(format!("{} is not set", API_KEY_VAR)))?;
        Self::new(config, api_key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, NarrativeError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|err| NarrativeError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let detail = error_body.trim();
            if detail.is_empty() {
                return Err(NarrativeError::Status(status.to_string()));
            }
            return Err(NarrativeError::Status(format!("{} {}", status, detail)));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|err| NarrativeError::Parse(err.to_string()))?;

        let text = body
            .choices
            .first()
            .map(|choice| choice.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(NarrativeError::Empty);
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}
