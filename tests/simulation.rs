mod common;

use common::{approx, fixture_signals};
use trend_decline::predictor::{DeclinePredictor, FusionWeights, PredictorConfig};
use trend_decline::simulation::{
    scenario_presets, ChangeDirection, ImpactCategory, ParameterChanges, RecoveryPotential,
    SimulationEngine,
};
use trend_decline::DeclineError;

fn engine() -> (SimulationEngine, DeclinePredictor) {
    let predictor =
        DeclinePredictor::new(FusionWeights::default(), PredictorConfig::default()).unwrap();
    (SimulationEngine::new(predictor.clone()), predictor)
}

#[test]
fn empty_changes_reproduce_baseline() {
    let (engine, predictor) = engine();
    let signals = fixture_signals();
    let baseline = predictor.predict(&signals).unwrap();

    let result = engine
        .simulate(&signals, &baseline, &ParameterChanges::default(), "No-op")
        .unwrap();

    assert_eq!(result.new_decline_probability, baseline.decline_probability);
    assert_eq!(result.new_lifecycle_stage, baseline.lifecycle_stage);
    assert_eq!(result.impact_analysis.probability_change, 0.0);
    assert_eq!(result.impact_analysis.impact_category, ImpactCategory::MinimalChange);
    assert_eq!(result.impact_analysis.direction, ChangeDirection::Neutral);
    assert_eq!(result.recovery_potential, RecoveryPotential::None);
    assert_eq!(result.full_prediction, baseline);
}

#[test]
fn engagement_boost_lowers_probability() {
    let (engine, predictor) = engine();
    let signals = fixture_signals();
    let baseline = predictor.predict(&signals).unwrap();
    let changes = ParameterChanges {
        engagement_boost: Some(0.5),
        ..ParameterChanges::default()
    };

    let result = engine.simulate(&signals, &baseline, &changes, "Boost").unwrap();

    approx(result.new_decline_probability, 55.34, 0.01);
    approx(result.impact_analysis.probability_change, -14.79, 0.02);
    assert_eq!(result.impact_analysis.impact_category, ImpactCategory::ModerateImprovement);
    assert_eq!(result.impact_analysis.direction, ChangeDirection::Improvement);
    assert_eq!(result.recovery_potential, RecoveryPotential::Moderate);
    assert_eq!(result.scenario_name, "Boost");
    assert_eq!(result.original_days_to_collapse, "5-10 days");
}

#[test]
fn simulation_leaves_input_signals_untouched() {
    let (engine, predictor) = engine();
    let signals = fixture_signals();
    let baseline = predictor.predict(&signals).unwrap();
    let changes = ParameterChanges {
        engagement_boost: Some(0.3),
        influencer_boost: Some(0.3),
        sentiment_improvement: Some(0.3),
        ..ParameterChanges::default()
    };

    engine.simulate(&signals, &baseline, &changes, "Check").unwrap();

    let engagement = signals.engagement.as_ref().unwrap();
    assert_eq!(engagement.engagement_decline_percent, 65.0);
    let influencer = signals.influencer.as_ref().unwrap();
    assert_eq!(influencer.participation_drop_percent, 55.0);
    assert_eq!(influencer.influence_impact_score, 25.0);
    let sentiment = signals.sentiment.as_ref().unwrap();
    assert_eq!(sentiment.metrics.sentiment_change_percent, -32.0);
}

#[test]
fn influencer_boost_raises_impact_score_capped() {
    let signals = fixture_signals();
    let changes = ParameterChanges {
        influencer_boost: Some(1.0),
        ..ParameterChanges::default()
    };
    let modified = changes.apply(&signals);
    let influencer = modified.influencer.as_ref().unwrap();

    assert_eq!(influencer.participation_drop_percent, 0.0);
    assert_eq!(influencer.influence_impact_score, 50.0);
}

#[test]
fn out_of_range_changes_are_rejected() {
    let (engine, predictor) = engine();
    let signals = fixture_signals();
    let baseline = predictor.predict(&signals).unwrap();

    for changes in [
        ParameterChanges {
            engagement_boost: Some(1.5),
            ..ParameterChanges::default()
        },
        ParameterChanges {
            sentiment_improvement: Some(-0.2),
            ..ParameterChanges::default()
        },
        ParameterChanges {
            influencer_drop: Some(f64::NAN),
            ..ParameterChanges::default()
        },
    ] {
        let err = engine
            .simulate(&signals, &baseline, &changes, "Bad")
            .unwrap_err();
        assert!(matches!(err, DeclineError::InvalidInput(_)), "{:?}", changes);
    }
}

#[test]
fn negative_drops_are_accepted() {
    let changes = ParameterChanges {
        engagement_drop: Some(-0.15),
        ..ParameterChanges::default()
    };
    assert!(changes.validate().is_ok());
}

#[test]
fn unknown_change_fields_fail_to_parse() {
    let parsed: Result<ParameterChanges, _> =
        serde_json::from_value(serde_json::json!({ "engagement_boost": 0.1, "virality": 0.2 }));
    assert!(parsed.is_err());

    let parsed: ParameterChanges =
        serde_json::from_value(serde_json::json!({ "influencer_drop": -0.2 })).unwrap();
    assert_eq!(parsed.influencer_drop, Some(-0.2));
    assert!(!parsed.is_empty());
}

#[test]
fn scenario_comparison_orders_outcomes() {
    let (engine, predictor) = engine();
    let signals = fixture_signals();
    let baseline = predictor.predict(&signals).unwrap();

    let comparison = engine.run_multiple_scenarios(&signals, &baseline).unwrap();

    assert_eq!(comparison.scenarios.len(), 3);
    assert_eq!(comparison.most_likely_outcome, "realistic");
    assert_eq!(comparison.best_case.as_deref(), Some("optimistic"));
    assert_eq!(comparison.worst_case.as_deref(), Some("pessimistic"));

    let optimistic = &comparison.scenarios["optimistic"];
    let realistic = &comparison.scenarios["realistic"];
    let pessimistic = &comparison.scenarios["pessimistic"];
    assert!(optimistic.new_decline_probability < realistic.new_decline_probability);
    assert!(realistic.new_decline_probability < baseline.decline_probability);
    assert!(pessimistic.new_decline_probability > baseline.decline_probability);
    assert_eq!(optimistic.scenario_name, "Optimistic Recovery");
}

#[test]
fn presets_are_valid_changes() {
    let presets = scenario_presets();
    assert_eq!(presets.len(), 3);
    for preset in presets {
        assert!(preset.changes.validate().is_ok(), "{}", preset.id);
        assert!(!preset.changes.is_empty());
    }
}

#[test]
fn impact_buckets() {
    assert_eq!(ImpactCategory::from_change(-20.0), ImpactCategory::SignificantImprovement);
    assert_eq!(ImpactCategory::from_change(-5.0), ImpactCategory::MinimalChange);
    assert_eq!(ImpactCategory::from_change(5.0), ImpactCategory::ModerateDeterioration);
    assert_eq!(ImpactCategory::from_change(15.0), ImpactCategory::SignificantDeterioration);
    assert_eq!(RecoveryPotential::from_change(-25.0), RecoveryPotential::High);
    assert_eq!(RecoveryPotential::from_change(-0.5), RecoveryPotential::Low);
}
