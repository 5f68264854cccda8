#![allow(dead_code)]

use trend_decline::series::{SignalInput, TrendRow, TrendTable};
use trend_decline::signals::{
    AggregatedSignals, DecaySpeed, EngagementExtractor, InfluencerExtractor, RiskLevel,
    SaturationExtractor, SentimentExtractor,
};

pub fn approx(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} within {} of {}",
        actual,
        tolerance,
        expected
    );
}

/// Engagement 65% rapid, influencer 55% drop / 25 impact, sentiment -32% High,
/// saturation 78.5.
pub fn fixture_signals() -> AggregatedSignals {
    let mut engagement = EngagementExtractor::default().analyze_series(&[0.10, 0.05, 0.035]);
    engagement.engagement_decline_percent = 65.0;
    engagement.decay_speed = DecaySpeed::Rapid;
    engagement.risk_level = RiskLevel::High;

    let mut influencer = InfluencerExtractor::default().analyze_series(&[0.20, 0.10, 0.09]);
    influencer.participation_drop_percent = 55.0;
    influencer.influence_impact_score = 25.0;

    let mut sentiment = SentimentExtractor::default().analyze_series(&[0.70, 0.55, 0.476]);
    sentiment.metrics.sentiment_change_percent = -32.0;
    sentiment.impact_level = RiskLevel::High;

    let mut saturation = SaturationExtractor::default().analyze_series(&[60.0, 70.0, 78.5]);
    saturation.saturation_score = 78.5;

    AggregatedSignals {
        engagement: Some(engagement),
        sentiment: Some(sentiment),
        influencer: Some(influencer),
        saturation: Some(saturation),
    }
}

/// Every signal present with a zero decline score.
pub fn quiet_signals() -> AggregatedSignals {
    let mut signals = fixture_signals();
    if let Some(engagement) = signals.engagement.as_mut() {
        engagement.engagement_decline_percent = 0.0;
        engagement.decay_speed = DecaySpeed::Slow;
    }
    if let Some(influencer) = signals.influencer.as_mut() {
        influencer.participation_drop_percent = 0.0;
        influencer.influence_impact_score = 100.0;
    }
    if let Some(sentiment) = signals.sentiment.as_mut() {
        sentiment.metrics.sentiment_change_percent = 0.0;
    }
    if let Some(saturation) = signals.saturation.as_mut() {
        saturation.saturation_score = 0.0;
    }
    signals
}

/// Three weeks of a trend losing engagement, sentiment and influencers while
/// saturation climbs.
pub fn declining_table() -> TrendTable {
    let days = 21;
    let rows = (0..days)
        .map(|day| {
            let t = day as f64 / (days - 1) as f64;
            TrendRow {
                date: Some(format!("2024-03-{:02}", day + 1)),
                trend_name: Some("Sourdough Challenge".to_string()),
                engagement_rate: Some(0.10 - 0.07 * t),
                sentiment_score: Some(0.75 - 0.40 * t),
                influencer_ratio: Some(0.20 - 0.15 * t),
                saturation_score: Some(40.0 + 48.0 * t),
            }
        })
        .collect();
    TrendTable::new(rows)
}

pub fn declining_input() -> SignalInput {
    SignalInput::Series(declining_table())
}
