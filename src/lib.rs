pub mod api;
pub mod config;
pub mod enhancer;
pub mod error;
pub mod executive;
pub mod input;
pub mod narrative;
pub mod orchestrator;
pub mod predictor;
pub mod series;
pub mod server;
pub mod signals;
pub mod simulation;

pub use config::DeclineConfig;
pub use enhancer::IntelligenceEnhancer;
pub use error::{DeclineError, NarrativeError};
pub use executive::ExecutiveIntelligence;
pub use input::{load_input, parse_input};
pub use narrative::{NarrativeGenerator, NarrativeResponse, NarrativeSource};
pub use orchestrator::{TrendAnalysis, TrendOrchestrator};
pub use predictor::{DeclinePredictor, FusionWeights, LifecycleStage, PredictionResult};
pub use series::{SignalInput, SnapshotMetrics, TrendRow, TrendTable};
pub use signals::{AggregatedSignals, RiskLevel, SignalKind};
pub use simulation::{ParameterChanges, SimulationEngine, SimulationResult};

/// First eight bytes of the SHA-256 digest, big-endian.
pub fn stable_hash64(value: &str) -> u64 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Formats a 0-100 score as a percentage.
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}
