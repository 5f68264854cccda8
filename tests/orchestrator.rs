mod common;

use common::{approx, declining_input, declining_table};
use serde_json::json;
use trend_decline::orchestrator::UNKNOWN_TREND;
use trend_decline::series::{SignalInput, TrendRow, TrendTable};
use trend_decline::signals::SignalKind;
use trend_decline::{
    load_input, parse_input, DeclineConfig, DeclineError, LifecycleStage, ParameterChanges,
    TrendOrchestrator,
};

fn orchestrator() -> TrendOrchestrator {
    TrendOrchestrator::from_config(&DeclineConfig::default()).unwrap()
}

#[test]
fn declining_series_runs_full_pipeline() {
    let analysis = orchestrator().analyze(&declining_input(), None).unwrap();

    assert_eq!(analysis.trend_name, "Sourdough Challenge");
    assert!(analysis.signal_failures.is_empty());
    assert_eq!(analysis.signal_details.present_count(), 4);
    assert_eq!(analysis.signal_summaries.len(), 4);
    assert!(analysis.decline_probability > 70.0);
    assert!(analysis.lifecycle_stage.is_collapsing());
    approx(analysis.prediction.confidence, 100.0, 1e-9);
    assert_eq!(analysis.driver_ranking.len(), 4);
    assert!(!analysis.alerts.is_empty());
    assert!(!analysis.strategy_recommendations.is_empty());

    assert_eq!(analysis.metadata.data_points, 21);
    assert_eq!(analysis.metadata.start_date.as_deref(), Some("2024-03-01"));
    assert_eq!(analysis.metadata.end_date.as_deref(), Some("2024-03-21"));
}

#[test]
fn repeated_runs_are_identical() {
    let orchestrator = orchestrator();
    let first = orchestrator.analyze(&declining_input(), None).unwrap();
    let second = orchestrator.analyze(&declining_input(), None).unwrap();

    assert_eq!(first.analysis_id, second.analysis_id);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn explicit_name_overrides_table_name() {
    let orchestrator = orchestrator();
    let named = orchestrator
        .analyze(&declining_input(), Some("  Focaccia Art  "))
        .unwrap();
    let default = orchestrator.analyze(&declining_input(), None).unwrap();

    assert_eq!(named.trend_name, "Focaccia Art");
    assert_eq!(named.metadata.trend_name, "Focaccia Art");
    assert_ne!(named.analysis_id, default.analysis_id);
    assert_eq!(named.decline_probability, default.decline_probability);
}

#[test]
fn missing_columns_degrade_to_partial_analysis() {
    let rows = declining_table()
        .rows
        .into_iter()
        .map(|row| TrendRow {
            sentiment_score: None,
            influencer_ratio: None,
            saturation_score: None,
            ..row
        })
        .collect();
    let input = SignalInput::Series(TrendTable::new(rows));

    let analysis = orchestrator().analyze(&input, None).unwrap();

    let failed: Vec<SignalKind> = analysis
        .signal_failures
        .iter()
        .map(|failure| failure.signal)
        .collect();
    assert_eq!(
        failed,
        vec![SignalKind::Sentiment, SignalKind::Influencer, SignalKind::Saturation]
    );
    assert_eq!(analysis.signal_failures[0].agent, "Sentiment Agent");
    approx(analysis.prediction.confidence, 25.0, 1e-9);
    assert_eq!(analysis.decline_prediction.missing_signals.len(), 3);
    assert!(analysis.decline_drivers.sentiment.is_none());
    assert!(analysis.key_metrics.engagement_decline.is_some());
    assert!(analysis.key_metrics.saturation_level.is_none());
}

#[test]
fn snapshot_input_scores_single_point() {
    let input = parse_input(json!({
        "likes": 120,
        "comments": 30,
        "shares": 12,
        "views": 4000,
        "sentiment_score": 0.7,
        "penetration": 0.4,
        "influencer_count": 5,
        "total_reach": 90000
    }))
    .unwrap();

    let analysis = orchestrator().analyze(&input, None).unwrap();

    assert_eq!(analysis.trend_name, UNKNOWN_TREND);
    assert!(analysis.signal_failures.is_empty());
    approx(analysis.decline_probability, 11.75, 1e-9);
    assert_eq!(analysis.lifecycle_stage, LifecycleStage::Growth);
    assert_eq!(analysis.days_to_collapse, "60+ days");
    assert_eq!(analysis.metadata.data_points, 1);
    assert!(analysis.metadata.start_date.is_none());
}

#[test]
fn snapshot_without_known_fields_has_no_signals() {
    let input = parse_input(json!({ "followers": 1200 })).unwrap();
    let err = orchestrator().analyze(&input, None).unwrap_err();
    assert!(matches!(err, DeclineError::NoSignalsAvailable));
}

#[test]
fn malformed_payloads_are_input_errors() {
    for payload in [
        json!(42),
        json!([]),
        json!({}),
        json!(["not a row"]),
        json!({ "engagement_rate": [0.1, 0.2], "sentiment_score": [0.5] }),
        json!({ "label": "only text" }),
    ] {
        let err = parse_input(payload.clone()).unwrap_err();
        assert!(err.is_input_error(), "{} gave {}", payload, err);
    }
}

#[test]
fn column_and_wrapped_shapes_parse_as_series() {
    let columns = parse_input(json!({
        "engagement_rate": [0.1, 0.08, 0.05],
        "date": ["2024-01-01", "2024-01-02", "2024-01-03"]
    }))
    .unwrap();
    let table = columns.as_series().unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.last_date(), Some("2024-01-03"));

    let wrapped = parse_input(json!({
        "trend_name": "Cloud Bread",
        "data": [{ "engagement_rate": 0.1 }, { "engagement_rate": 0.05 }]
    }))
    .unwrap();
    assert_eq!(wrapped.as_series().unwrap().trend_name(), Some("Cloud Bread"));
}

#[test]
fn csv_files_load_as_series() {
    let path = std::env::temp_dir().join(format!("trend-decline-{}.csv", std::process::id()));
    std::fs::write(
        &path,
        "date,trend_name,engagement_rate,saturation_score\n\
         2024-05-01,Latte Art,0.12,55\n\
         2024-05-02,Latte Art,0.09,61\n\
         2024-05-03,Latte Art,0.06,68\n",
    )
    .unwrap();

    let input = load_input(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let analysis = orchestrator().analyze(&input, None).unwrap();
    assert_eq!(analysis.trend_name, "Latte Art");
    assert_eq!(analysis.signal_failures.len(), 2);
    assert_eq!(analysis.metadata.end_date.as_deref(), Some("2024-05-03"));
}

#[test]
fn serialized_analysis_exposes_flat_warning_fields() {
    let analysis = orchestrator().analyze(&declining_input(), None).unwrap();
    let value = serde_json::to_value(&analysis).unwrap();

    let warning = &value["early_warning"];
    assert!(warning["warning_level"].is_string());
    assert!(warning["active_warnings"].is_array());
    assert!(warning["collapse_window"]["estimated_days"].is_u64());
    assert!(warning["severity_score"].is_u64());

    assert!(value["decline_drivers"]["engagement"]["decline_percent"].is_f64());
    assert!(value["prediction"]["contributing_factors"].is_array());
    assert!(value["signal_summaries"]["engagement"]["decline_score"].is_f64());
    assert!(value.get("timestamp").is_none());
}

#[test]
fn empty_simulation_matches_analysis() {
    let orchestrator = orchestrator();
    let analysis = orchestrator.analyze(&declining_input(), None).unwrap();

    let result = orchestrator
        .simulate(&analysis, &ParameterChanges::default(), "Baseline")
        .unwrap();
    assert_eq!(result.new_decline_probability, analysis.decline_probability);
    assert_eq!(result.new_lifecycle_stage, analysis.lifecycle_stage);

    let comparison = orchestrator.run_scenarios(&analysis).unwrap();
    assert_eq!(comparison.scenarios.len(), 3);
    assert!(
        comparison.scenarios["optimistic"].new_decline_probability < analysis.decline_probability
    );
}

#[test]
fn analysis_ids_are_fixed_width_hex() {
    let orchestrator = orchestrator();
    for name in ["Sourdough Challenge", "Cloud Bread", "Dalgona Coffee", "Feta Pasta", "Pesto Eggs"] {
        let analysis = orchestrator.analyze(&declining_input(), Some(name)).unwrap();
        assert_eq!(analysis.analysis_id.len(), 16, "{}", analysis.analysis_id);
        assert!(analysis.analysis_id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[test]
fn non_array_data_is_rejected() {
    for data in [json!("rows"), json!({ "engagement_rate": 0.1 }), json!(null)] {
        let err = parse_input(json!({ "trend_name": "Cloud Bread", "data": data })).unwrap_err();
        assert!(matches!(err, DeclineError::InvalidInput(_)), "{}", err);
    }
}

#[test]
fn column_arrays_carry_a_scalar_trend_name() {
    let input = parse_input(json!({
        "trend_name": "Cloud Bread",
        "engagement_rate": [0.1, 0.08, 0.05],
        "sentiment_score": [0.7, 0.6, 0.5]
    }))
    .unwrap();

    let table = input.as_series().unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.trend_name(), Some("Cloud Bread"));
}
