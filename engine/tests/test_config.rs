//! Configuration Tests

use scenario_engine_core::{ScenarioConfig, ScenarioEngine, ScenarioError};
use std::io::Write;

#[test]
fn test_parse_full_config() {
    let json = r#"{
        "name": "Barrier search",
        "case_id": "Case_12",
        "start_time": 100,
        "scenario_step_ms": 500,
        "step_delay_ms": 20,
        "seed": 42
    }"#;

    let config = ScenarioConfig::from_json_str(json).unwrap();

    assert_eq!(config.name.as_deref(), Some("Barrier search"));
    assert_eq!(config.case_id.as_deref(), Some("Case_12"));
    assert_eq!(config.start_time, 100);
    assert_eq!(config.scenario_step_ms, 500);
    assert_eq!(config.step_delay_ms, 20);
    assert_eq!(config.seed, Some(42));
}

#[test]
fn test_missing_fields_use_defaults() {
    let config = ScenarioConfig::from_json_str("{}").unwrap();
    assert_eq!(config, ScenarioConfig::default());
}

#[test]
fn test_malformed_json_rejected() {
    let result = ScenarioConfig::from_json_str("{ \"start_time\": ");
    assert!(matches!(result, Err(ScenarioError::ConfigParse(_))));
}

#[test]
fn test_non_positive_step_rejected() {
    let result = ScenarioConfig::from_json_str(r#"{ "scenario_step_ms": 0 }"#);
    assert!(matches!(result, Err(ScenarioError::InvalidConfig(_))));
}

#[test]
fn test_config_round_trips_through_json() {
    let config = ScenarioConfig {
        name: Some("Convoy".to_string()),
        seed: Some(9),
        ..Default::default()
    };

    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(ScenarioConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!(
        "scenario_config_{}.json",
        std::process::id()
    ));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{ "name": "From disk", "scenario_step_ms": 250 }}"#).unwrap();
    }

    let config = ScenarioConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.name.as_deref(), Some("From disk"));
    assert_eq!(config.scenario_step_ms, 250);
}

#[test]
fn test_missing_file_reports_io_error() {
    let result = ScenarioConfig::from_json_file("/nonexistent/scenario/config.json");
    assert!(matches!(result, Err(ScenarioError::ConfigIo(_))));
}

#[test]
fn test_engine_takes_settings_from_config() {
    let config = ScenarioConfig::from_json_str(
        r#"{ "name": "Patrol", "case_id": "Case_3", "start_time": 60000, "step_delay_ms": 75 }"#,
    )
    .unwrap();

    let engine = ScenarioEngine::new(config).unwrap();

    assert_eq!(engine.name(), "Patrol");
    assert_eq!(engine.case_id(), "Case_3");
    assert_eq!(engine.time(), 60000);
    assert_eq!(engine.start_time(), 60000);
    assert_eq!(engine.step_time(), 75);
    assert_eq!(engine.scenario_step_time(), 1000);
    assert_eq!(engine.seed(), None);
}

#[test]
fn test_error_messages_are_descriptive() {
    let err = ScenarioError::InvalidStepSize(-3);
    assert!(err.to_string().contains("-3"));

    let err = ScenarioError::UnknownParticipantType("FRIGATE".to_string());
    assert!(err.to_string().contains("FRIGATE"));
}
