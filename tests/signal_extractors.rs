mod common;

use common::approx;
use std::collections::BTreeMap;
use trend_decline::series::{SignalInput, SnapshotMetrics, TrendRow, TrendTable};
use trend_decline::signals::{
    influencer, DecaySpeed, Disengagement, EngagementExtractor, InfluencerActivity,
    InfluencerExtractor, RiskLevel, SaturationExtractor, SaturationStage, SentimentCategory,
    SentimentExtractor, SentimentTrend, Signal, SignalExtractor, TimeToPeak, TrendDirection,
};
use trend_decline::DeclineError;

fn snapshot(fields: &[(&str, f64)]) -> SnapshotMetrics {
    let map: BTreeMap<String, f64> = fields
        .iter()
        .map(|(key, value)| (key.to_string(), *value))
        .collect();
    SnapshotMetrics::new(map)
}

fn repeat(first: f64, second: f64, each: usize) -> Vec<f64> {
    let mut values = vec![first; each];
    values.extend(vec![second; each]);
    values
}

#[test]
fn engagement_halving_is_rapid_high_risk() {
    let signal = EngagementExtractor::default().analyze_series(&repeat(0.10, 0.05, 7));

    approx(signal.engagement_decline_percent, 50.0, 0.01);
    assert_eq!(signal.decay_speed, DecaySpeed::Rapid);
    assert_eq!(signal.risk_level, RiskLevel::High);
    assert_eq!(signal.trend_direction, TrendDirection::Decreasing);
    approx(signal.metrics.peak_engagement, 0.10, 1e-9);
    approx(signal.metrics.current_engagement, 0.05, 1e-9);
    approx(signal.metrics.volatility, 0.025, 1e-4);
}

#[test]
fn engagement_single_point_degrades_gracefully() {
    let signal = EngagementExtractor::default().analyze_series(&[0.05]);

    approx(signal.engagement_decline_percent, 0.0, 1e-9);
    assert_eq!(signal.decay_speed, DecaySpeed::Slow);
    assert_eq!(signal.risk_level, RiskLevel::Low);
    assert_eq!(signal.trend_direction, TrendDirection::Stable);
}

#[test]
fn engagement_risk_matrix() {
    use trend_decline::signals::engagement::assign_risk_level;

    assert_eq!(assign_risk_level(10.0, DecaySpeed::Moderate), RiskLevel::Low);
    assert_eq!(assign_risk_level(10.0, DecaySpeed::Rapid), RiskLevel::Medium);
    assert_eq!(assign_risk_level(35.0, DecaySpeed::Slow), RiskLevel::Low);
    assert_eq!(assign_risk_level(35.0, DecaySpeed::Moderate), RiskLevel::Medium);
    assert_eq!(assign_risk_level(60.0, DecaySpeed::Slow), RiskLevel::Medium);
    assert_eq!(assign_risk_level(60.0, DecaySpeed::Moderate), RiskLevel::High);
}

#[test]
fn engagement_snapshot_weights_interactions() {
    let input = snapshot(&[
        ("likes", 100.0),
        ("comments", 20.0),
        ("shares", 10.0),
        ("views", 1000.0),
    ]);
    let signal = EngagementExtractor::default().analyze_snapshot(&input).unwrap();
    let details = signal.snapshot.as_ref().unwrap();

    approx(details.engagement_rate, 0.17, 1e-9);
    approx(details.engagement_score, 17.0, 1e-9);
    approx(signal.engagement_decline_percent, 0.0, 1e-9);
    assert_eq!(signal.decay_speed, DecaySpeed::Slow);
}

#[test]
fn engagement_snapshot_requires_interaction_fields() {
    let err = EngagementExtractor::default()
        .analyze_snapshot(&snapshot(&[("sentiment_score", 0.5)]))
        .unwrap_err();
    assert!(matches!(err, DeclineError::MissingColumn("engagement_rate")));
}

#[test]
fn sentiment_collapse_is_critical() {
    let signal = SentimentExtractor::default().analyze_series(&repeat(0.8, 0.3, 7));

    approx(signal.metrics.sentiment_change_percent, -62.5, 0.01);
    assert_eq!(signal.sentiment_shift, "Positive → Negative");
    assert_eq!(signal.impact_level, RiskLevel::Critical);
    assert_eq!(signal.trend_direction, SentimentTrend::Declining);
    assert_eq!(signal.sentiment_categories.initial, SentimentCategory::Positive);
    assert_eq!(signal.sentiment_categories.current, SentimentCategory::Negative);
    approx(signal.summary().decline_score, 62.5, 0.01);
}

#[test]
fn sentiment_recovery_into_neutral_is_medium() {
    let signal = SentimentExtractor::default().analyze_series(&repeat(0.3, 0.5, 7));

    assert_eq!(signal.sentiment_shift, "Negative → Neutral");
    assert_eq!(signal.impact_level, RiskLevel::Medium);
    assert_eq!(signal.trend_direction, SentimentTrend::Improving);
    approx(signal.summary().decline_score, 0.0, 1e-9);
}

#[test]
fn flat_sentiment_is_stable() {
    let signal = SentimentExtractor::default().analyze_series(&[0.5; 10]);

    assert_eq!(signal.sentiment_shift, "Stable");
    assert_eq!(signal.impact_level, RiskLevel::Low);
    assert_eq!(signal.trend_direction, SentimentTrend::Stable);
    approx(signal.metrics.volatility, 0.0, 1e-12);
}

#[test]
fn sentiment_snapshot_reads_score() {
    let signal = SentimentExtractor::default()
        .analyze_snapshot(&snapshot(&[("sentiment_score", 0.72)]))
        .unwrap();
    assert_eq!(signal.sentiment_categories.current, SentimentCategory::Positive);
    approx(signal.metrics.sentiment_change_percent, 0.0, 1e-12);
}

#[test]
fn influencer_thirds_detect_severe_disengagement() {
    let values = [0.3, 0.3, 0.3, 0.15, 0.15, 0.15, 0.05, 0.05, 0.05];
    let signal = InfluencerExtractor::default().analyze_series(&values);

    assert_eq!(signal.disengagement_status, Disengagement::Severe);
    assert_eq!(signal.risk_level, RiskLevel::Critical);
    assert_eq!(signal.trend_direction, TrendDirection::Decreasing);
    assert_eq!(signal.influencer_activity, InfluencerActivity::Moderate);
    approx(signal.participation_drop_percent, 35.71, 0.01);
}

#[test]
fn influencer_growth_is_increasing_engagement() {
    let values = [0.05, 0.05, 0.05, 0.1, 0.1, 0.1, 0.15, 0.15, 0.15];
    let signal = InfluencerExtractor::default().analyze_series(&values);

    assert_eq!(signal.disengagement_status, Disengagement::Increasing);
    assert_eq!(signal.risk_level, RiskLevel::Low);
    assert_eq!(signal.trend_direction, TrendDirection::Increasing);
}

#[test]
fn influencer_single_point_is_stable() {
    let signal = InfluencerExtractor::default().analyze_series(&[0.12]);

    assert_eq!(signal.disengagement_status, Disengagement::Stable);
    approx(signal.participation_drop_percent, 0.0, 1e-12);
    assert_eq!(signal.trend_direction, TrendDirection::Stable);
}

#[test]
fn influencer_impact_score_is_bounded() {
    approx(influencer::impact_score(0.1, 20.0, TrendDirection::Stable), 40.0, 1e-9);
    approx(influencer::impact_score(0.3, 0.0, TrendDirection::Increasing), 100.0, 1e-9);
    approx(influencer::impact_score(0.01, 100.0, TrendDirection::Decreasing), 0.0, 1e-9);
}

#[test]
fn influencer_snapshot_uses_neutral_impact() {
    let signal = InfluencerExtractor::default()
        .analyze_snapshot(&snapshot(&[("influencer_count", 12.0), ("total_reach", 250000.0)]))
        .unwrap();

    approx(signal.influence_impact_score, 50.0, 1e-12);
    approx(signal.participation_drop_percent, 0.0, 1e-12);
    let details = signal.snapshot.as_ref().unwrap();
    approx(details.influencer_count, 12.0, 1e-12);
}

#[test]
fn saturation_reports_first_breach_days() {
    let values = [50.0, 60.0, 65.0, 72.0, 80.0, 86.0, 90.0];
    let signal = SaturationExtractor::default().analyze_series(&values);

    assert_eq!(signal.threshold_breaches.len(), 2);
    assert_eq!(signal.threshold_breaches[0].threshold, "Content Fatigue");
    assert_eq!(signal.threshold_breaches[0].day, 4);
    assert_eq!(signal.threshold_breaches[1].threshold, "Critical Saturation");
    assert_eq!(signal.threshold_breaches[1].day, 6);
    assert!(signal.fatigue_detected);
    assert_eq!(signal.saturation_stage, SaturationStage::Peak);
    assert_eq!(signal.saturation_impact_level, RiskLevel::Critical);
}

#[test]
fn saturation_time_to_peak_edges() {
    let extractor = SaturationExtractor::default();

    let falling = extractor.analyze_series(&[80.0, 70.0, 60.0]);
    assert_eq!(falling.time_to_peak, TimeToPeak::NotTrending);
    assert!(!falling.fatigue_detected);
    assert_eq!(falling.saturation_impact_level, RiskLevel::Medium);

    let steady = extractor.analyze_series(&[40.0, 41.0, 42.0]);
    assert_eq!(steady.time_to_peak, TimeToPeak::Days(53));
    assert_eq!(steady.time_to_peak.to_string(), "53 days");

    let slow = extractor.analyze_series(&[10.0, 10.1]);
    assert_eq!(slow.time_to_peak, TimeToPeak::Beyond(100));
    assert_eq!(
        serde_json::to_value(slow.time_to_peak).unwrap(),
        serde_json::json!("100+ days")
    );

    let peaked = extractor.analyze_series(&[96.0]);
    assert_eq!(peaked.time_to_peak, TimeToPeak::AlreadyPeaked);
}

#[test]
fn saturation_snapshot_scales_penetration() {
    let signal = SaturationExtractor::default()
        .analyze_snapshot(&snapshot(&[("penetration", 0.42)]))
        .unwrap();
    approx(signal.saturation_score, 42.0, 1e-9);
    assert!(signal.threshold_breaches.is_empty());
}

#[test]
fn series_input_without_column_is_rejected() {
    let rows = vec![TrendRow {
        engagement_rate: Some(0.05),
        ..TrendRow::default()
    }];
    let input = SignalInput::Series(TrendTable::new(rows));

    assert!(EngagementExtractor::default().extract(&input).is_ok());
    let err = SentimentExtractor::default().extract(&input).unwrap_err();
    assert!(matches!(err, DeclineError::MissingColumn("sentiment_score")));
}

#[test]
fn series_input_with_gaps_is_invalid() {
    let rows = vec![
        TrendRow {
            saturation_score: Some(40.0),
            ..TrendRow::default()
        },
        TrendRow::default(),
    ];
    let input = SignalInput::Series(TrendTable::new(rows));
    let err = SaturationExtractor::default().extract(&input).unwrap_err();
    assert!(err.is_input_error());
}
