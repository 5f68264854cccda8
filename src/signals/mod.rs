pub mod engagement;
pub mod influencer;
pub mod saturation;
pub mod sentiment;
pub mod stats;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DeclineError;
use crate::series::SignalInput;

pub use engagement::{
    EngagementConfig, EngagementExtractor, EngagementMetrics, EngagementSignal, EngagementSnapshot,
};
pub use influencer::{
    Disengagement, InfluencerActivity, InfluencerConfig, InfluencerExtractor, InfluencerMetrics,
    InfluencerSignal, InfluencerSnapshot,
};
pub use saturation::{
    RepetitionRisk, SaturationConfig, SaturationExtractor, SaturationMetrics, SaturationSignal,
    SaturationStage, ThresholdBreach, TimeToPeak,
};
pub use sentiment::{
    SentimentCategories, SentimentCategory, SentimentConfig, SentimentExtractor, SentimentMetrics,
    SentimentSignal, SentimentTrend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Engagement,
    Influencer,
    Sentiment,
    Saturation,
}

impl SignalKind {
    /// Fixed order used for fusion and for breaking ranking ties.
    pub const CANONICAL: [SignalKind; 4] = [
        SignalKind::Engagement,
        SignalKind::Influencer,
        SignalKind::Sentiment,
        SignalKind::Saturation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SignalKind::Engagement => "engagement",
            SignalKind::Influencer => "influencer",
            SignalKind::Sentiment => "sentiment",
            SignalKind::Saturation => "saturation",
        }
    }

    pub fn agent_name(self) -> &'static str {
        match self {
            SignalKind::Engagement => "Engagement Agent",
            SignalKind::Influencer => "Influencer Agent",
            SignalKind::Sentiment => "Sentiment Agent",
            SignalKind::Saturation => "Saturation Agent",
        }
    }

    pub fn driver_name(self) -> &'static str {
        match self {
            SignalKind::Engagement => "Engagement Decline",
            SignalKind::Influencer => "Influencer Disengagement",
            SignalKind::Sentiment => "Sentiment Shift",
            SignalKind::Saturation => "Content Saturation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    pub fn is_elevated(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecaySpeed {
    Slow,
    Moderate,
    Rapid,
}

impl DecaySpeed {
    /// Buckets a relative drop (in percent) of the recent window average.
    pub fn from_decay_rate(rate: f64) -> Self {
        if rate < 10.0 {
            DecaySpeed::Slow
        } else if rate < 30.0 {
            DecaySpeed::Moderate
        } else {
            DecaySpeed::Rapid
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DecaySpeed::Slow => "slow",
            DecaySpeed::Moderate => "moderate",
            DecaySpeed::Rapid => "rapid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl TrendDirection {
    pub fn from_slope(slope: f64, epsilon: f64) -> Self {
        if slope > epsilon {
            TrendDirection::Increasing
        } else if slope < -epsilon {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Stable => "stable",
            TrendDirection::Decreasing => "decreasing",
        }
    }
}

/// Uniform view over any extractor's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSummary {
    pub decline_score: f64,
    pub category_label: String,
    pub risk_level: RiskLevel,
    pub metrics: BTreeMap<String, f64>,
    pub narrative: String,
}

pub trait Signal {
    fn kind(&self) -> SignalKind;
    fn summary(&self) -> SignalSummary;
}

/// A stateless service turning one input into one signal.
pub trait SignalExtractor {
    type Output: Signal;

    fn kind(&self) -> SignalKind;
    fn extract(&self, input: &SignalInput) -> Result<Self::Output, DeclineError>;
}

/// Per-signal extractor outputs. `None` marks a signal whose extractor
/// failed or whose input was absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedSignals {
    pub engagement: Option<EngagementSignal>,
    pub sentiment: Option<SentimentSignal>,
    pub influencer: Option<InfluencerSignal>,
    pub saturation: Option<SaturationSignal>,
}

impl AggregatedSignals {
    pub fn is_present(&self, kind: SignalKind) -> bool {
        match kind {
            SignalKind::Engagement => self.engagement.is_some(),
            SignalKind::Sentiment => self.sentiment.is_some(),
            SignalKind::Influencer => self.influencer.is_some(),
            SignalKind::Saturation => self.saturation.is_some(),
        }
    }

    pub fn present_count(&self) -> usize {
        SignalKind::CANONICAL
            .iter()
            .filter(|kind| self.is_present(**kind))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    pub fn missing(&self) -> Vec<SignalKind> {
        SignalKind::CANONICAL
            .into_iter()
            .filter(|kind| !self.is_present(*kind))
            .collect()
    }

    pub fn without(&self, kind: SignalKind) -> Self {
        let mut copy = self.clone();
        match kind {
            SignalKind::Engagement => copy.engagement = None,
            SignalKind::Sentiment => copy.sentiment = None,
            SignalKind::Influencer => copy.influencer = None,
            SignalKind::Saturation => copy.saturation = None,
        }
        copy
    }

    pub fn summaries(&self) -> BTreeMap<SignalKind, SignalSummary> {
        let mut summaries = BTreeMap::new();
        if let Some(signal) = &self.engagement {
            summaries.insert(signal.kind(), signal.summary());
        }
        if let Some(signal) = &self.sentiment {
            summaries.insert(signal.kind(), signal.summary());
        }
        if let Some(signal) = &self.influencer {
            summaries.insert(signal.kind(), signal.summary());
        }
        if let Some(signal) = &self.saturation {
            summaries.insert(signal.kind(), signal.summary());
        }
        summaries
    }
}
