use thiserror::Error;

/// Errors surfaced by the analysis pipeline.
#[derive(Debug, Error)]
pub enum DeclineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("input is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("series '{0}' has no data points")]
    EmptySeries(&'static str),

    #[error("no valid agent signals available")]
    NoSignalsAvailable,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl DeclineError {
    /// True for errors caused by the shape or content of caller-supplied data.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DeclineError::InvalidInput(_)
                | DeclineError::MissingColumn(_)
                | DeclineError::EmptySeries(_)
                | DeclineError::Json(_)
                | DeclineError::Csv(_)
        )
    }
}

/// Failures talking to the text-completion service.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative client not configured: {0}")]
    NotConfigured(String),

    #[error("narrative request failed: {0}")]
    Request(String),

    #[error("narrative API error: {0}")]
    Status(String),

    #[error("narrative response parse failed: {0}")]
    Parse(String),

    #[error("narrative response was empty")]
    Empty,
}
