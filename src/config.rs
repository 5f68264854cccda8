use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::enhancer::EnhancerConfig;
use crate::error::DeclineError;
use crate::narrative::NarrativeConfig;
use crate::predictor::{FusionWeights, PredictorConfig};
use crate::signals::{EngagementConfig, InfluencerConfig, SaturationConfig, SentimentConfig};

pub const CONFIG_PATH_VAR: &str = "DECLINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/decline.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclineConfig {
    pub weights: FusionWeights,
    pub engagement: EngagementConfig,
    pub sentiment: SentimentConfig,
    pub influencer: InfluencerConfig,
    pub saturation: SaturationConfig,
    pub predictor: PredictorConfig,
    pub enhancer: EnhancerConfig,
    pub narrative: NarrativeConfig,
}

impl DeclineConfig {
    /// Reads the explicit path, else `DECLINE_CONFIG_PATH`, else
    /// `config/decline.toml`. A missing file yields the defaults.
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), DeclineError> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => DeclineConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, config_path))
    }

    pub fn from_file(path: &Path) -> Result<Self, DeclineError> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            DeclineError::Config(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, DeclineError> {
        toml::from_str(contents)
            .map_err(|err| DeclineError::Config(format!("failed to parse config: {}", err)))
    }

    pub fn validate(&self) -> Result<(), DeclineError> {
        self.weights.validate()?;
        self.predictor.stages.validate()?;
        self.enhancer.validate()?;
        if self.predictor.expected_indicators == 0 {
            return Err(DeclineError::Config(
                "predictor.expected_indicators must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn write(&self, path: &Path) -> Result<(), DeclineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| DeclineError::Config(format!("failed to serialize config: {}", err)))?;
        std::fs::write(path, payload)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = env::var("NARRATIVE_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.narrative.endpoint = endpoint;
            }
        }
        if let Ok(model) = env::var("NARRATIVE_MODEL") {
            if !model.trim().is_empty() {
                self.narrative.model = model;
            }
        }
        if let Ok(timeout) = env::var("NARRATIVE_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.narrative.timeout_ms = value;
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var(CONFIG_PATH_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_PATH)))
}
