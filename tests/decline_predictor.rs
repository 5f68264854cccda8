mod common;

use common::{approx, fixture_signals, quiet_signals};
use trend_decline::predictor::{
    normalize, DeclinePredictor, FusionWeights, LifecycleStage, PredictorConfig, StageThresholds,
    WarningLevel,
};
use trend_decline::signals::{AggregatedSignals, RiskLevel, SignalKind};
use trend_decline::DeclineError;

fn predictor() -> DeclinePredictor {
    DeclinePredictor::new(FusionWeights::default(), PredictorConfig::default()).unwrap()
}

#[test]
fn fixture_scores_rapid_collapse() {
    let result = predictor().predict(&fixture_signals()).unwrap();

    approx(result.decline_probability, 70.125, 0.006);
    assert_eq!(result.lifecycle_stage, LifecycleStage::RapidCollapse);
    assert_eq!(result.days_to_collapse, "5-10 days");
    assert_eq!(result.risk_level, RiskLevel::Critical);
    approx(result.confidence, 100.0, 1e-9);
    assert!(result.missing_signals.is_empty());

    approx(result.signal_scores.engagement_score, 84.5, 1e-9);
    approx(result.signal_scores.influencer_score, 61.0, 1e-9);
    approx(result.signal_scores.sentiment_score, 48.0, 1e-9);
    approx(result.signal_scores.saturation_score, 78.5, 1e-9);
}

#[test]
fn contributing_factors_rank_by_weighted_score() {
    let result = predictor().predict(&fixture_signals()).unwrap();
    let order: Vec<SignalKind> = result
        .contributing_factors
        .iter()
        .map(|factor| factor.factor)
        .collect();

    assert_eq!(
        order,
        vec![
            SignalKind::Engagement,
            SignalKind::Saturation,
            SignalKind::Influencer,
            SignalKind::Sentiment,
        ]
    );
    approx(result.contributing_factors[0].contribution, 29.575, 0.006);
}

#[test]
fn tied_factors_keep_canonical_order() {
    let result = predictor().predict(&quiet_signals()).unwrap();
    let order: Vec<SignalKind> = result
        .contributing_factors
        .iter()
        .map(|factor| factor.factor)
        .collect();

    assert_eq!(order, SignalKind::CANONICAL.to_vec());
    approx(result.decline_probability, 0.0, 1e-9);
    assert_eq!(result.lifecycle_stage, LifecycleStage::Growth);
    assert_eq!(result.risk_level, RiskLevel::Low);
}

#[test]
fn lifecycle_bins_are_half_open() {
    let predictor = predictor();
    assert_eq!(predictor.lifecycle_stage(0.0), LifecycleStage::Growth);
    assert_eq!(predictor.lifecycle_stage(24.999), LifecycleStage::Growth);
    assert_eq!(predictor.lifecycle_stage(25.0), LifecycleStage::Peak);
    assert_eq!(predictor.lifecycle_stage(44.99), LifecycleStage::Peak);
    assert_eq!(predictor.lifecycle_stage(45.0), LifecycleStage::EarlyDecline);
    assert_eq!(predictor.lifecycle_stage(65.0), LifecycleStage::RapidCollapse);
    assert_eq!(predictor.lifecycle_stage(85.0), LifecycleStage::DeadTrend);
    assert_eq!(predictor.lifecycle_stage(100.0), LifecycleStage::DeadTrend);
}

#[test]
fn prediction_is_deterministic() {
    let predictor = predictor();
    let signals = fixture_signals();
    let first = predictor.predict(&signals).unwrap();
    let second = predictor.predict(&signals).unwrap();
    assert_eq!(first, second);
}

#[test]
fn removing_a_signal_never_raises_probability() {
    let predictor = predictor();
    let signals = fixture_signals();
    let full = predictor.predict(&signals).unwrap();

    for kind in SignalKind::CANONICAL {
        let partial = predictor.predict(&signals.without(kind)).unwrap();
        assert!(partial.decline_probability <= full.decline_probability);
        assert_eq!(partial.missing_signals, vec![kind]);
        approx(partial.confidence, 75.0, 1e-9);
        approx(partial.signal_scores.get(kind), 0.0, 1e-9);
    }
}

#[test]
fn missing_weights_are_not_renormalized() {
    let signals = AggregatedSignals {
        engagement: fixture_signals().engagement,
        ..AggregatedSignals::default()
    };
    let result = predictor().predict(&signals).unwrap();

    approx(result.decline_probability, 84.5 * 0.35, 0.006);
    approx(result.confidence, 25.0, 1e-9);
    assert_eq!(result.missing_signals.len(), 3);
}

#[test]
fn empty_signals_are_refused() {
    let err = predictor().predict(&AggregatedSignals::default()).unwrap_err();
    assert!(matches!(err, DeclineError::NoSignalsAvailable));
}

#[test]
fn normalized_scores_are_clamped() {
    let mut signals = fixture_signals();
    if let Some(engagement) = signals.engagement.as_mut() {
        engagement.engagement_decline_percent = 95.0;
    }
    if let Some(sentiment) = signals.sentiment.as_mut() {
        sentiment.metrics.sentiment_change_percent = -80.0;
        sentiment.impact_level = RiskLevel::Critical;
    }
    let scores = normalize(&signals);
    approx(scores.engagement_score, 100.0, 1e-9);
    approx(scores.sentiment_score, 100.0, 1e-9);
}

#[test]
fn early_warning_counts_triggers() {
    let result = predictor().predict(&fixture_signals()).unwrap();
    let warning = &result.early_warning;

    // four signal thresholds, rapid decay and multiple high signals
    assert_eq!(warning.warning_count, 6);
    assert_eq!(warning.active_warnings.len(), 6);
    assert_eq!(warning.warning_level, WarningLevel::Critical);
    assert!(!warning.approaching_critical);
    assert_eq!(warning.days_to_critical_zone, "Already in critical zone");

    let quiet = predictor().predict(&quiet_signals()).unwrap();
    assert_eq!(quiet.early_warning.warning_level, WarningLevel::Low);
    assert!(quiet.early_warning.active_warnings.is_empty());
}

#[test]
fn weights_must_sum_to_one() {
    let weights = FusionWeights {
        engagement: 0.5,
        ..FusionWeights::default()
    };
    let err = DeclinePredictor::new(weights, PredictorConfig::default()).unwrap_err();
    assert!(matches!(err, DeclineError::Config(_)));

    let negative = FusionWeights {
        engagement: -0.35,
        influencer: 0.95,
        sentiment: 0.2,
        saturation: 0.2,
    };
    assert!(negative.validate().is_err());
}

#[test]
fn stage_thresholds_must_ascend() {
    let config = PredictorConfig {
        stages: StageThresholds {
            peak: 50.0,
            early_decline: 45.0,
            ..StageThresholds::default()
        },
        ..PredictorConfig::default()
    };
    let err = DeclinePredictor::new(FusionWeights::default(), config).unwrap_err();
    assert!(matches!(err, DeclineError::Config(_)));
}

#[test]
fn timeline_table_follows_decay_speed() {
    use trend_decline::signals::DecaySpeed;

    assert_eq!(
        LifecycleStage::EarlyDecline.days_to_collapse(DecaySpeed::Slow),
        "35-45 days"
    );
    assert_eq!(
        LifecycleStage::RapidCollapse.days_to_collapse(DecaySpeed::Moderate),
        "10-15 days"
    );
    assert_eq!(
        LifecycleStage::DeadTrend.days_to_collapse(DecaySpeed::Rapid),
        "Already Collapsed"
    );
}

#[test]
fn stage_is_chosen_before_rounding() {
    let mut engagement = fixture_signals().engagement;
    if let Some(signal) = engagement.as_mut() {
        signal.engagement_decline_percent = 71.4171;
        signal.decay_speed = trend_decline::signals::DecaySpeed::Moderate;
    }
    let signals = AggregatedSignals {
        engagement,
        ..AggregatedSignals::default()
    };
    let result = predictor().predict(&signals).unwrap();

    // 71.4171 * 0.35 = 24.995985, just under the peak boundary
    approx(result.decline_probability, 25.0, 1e-9);
    assert_eq!(result.lifecycle_stage, LifecycleStage::Growth);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert_eq!(result.days_to_collapse, "60+ days");
}

#[test]
fn factors_tied_after_rounding_keep_canonical_order() {
    let base = fixture_signals();
    let mut engagement = base.engagement;
    if let Some(signal) = engagement.as_mut() {
        signal.engagement_decline_percent = 28.58;
        signal.decay_speed = trend_decline::signals::DecaySpeed::Moderate;
    }
    let mut saturation = base.saturation;
    if let Some(signal) = saturation.as_mut() {
        signal.saturation_score = 50.02;
    }
    let signals = AggregatedSignals {
        engagement,
        saturation,
        ..AggregatedSignals::default()
    };
    let result = predictor().predict(&signals).unwrap();
    let order: Vec<SignalKind> = result
        .contributing_factors
        .iter()
        .map(|factor| factor.factor)
        .collect();

    // 10.003 and 10.004 both emit as 10.0
    approx(result.contributing_factors[0].contribution, 10.0, 1e-9);
    approx(result.contributing_factors[1].contribution, 10.0, 1e-9);
    assert_eq!(
        order,
        vec![
            SignalKind::Engagement,
            SignalKind::Saturation,
            SignalKind::Influencer,
            SignalKind::Sentiment,
        ]
    );
}
