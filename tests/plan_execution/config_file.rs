//! Configuration File Tests
//!
//! A session opened from a `bridge.toml` picks up its label, listener and
//! ramp spacing.

use crate::common::*;
use authoring_bridge::{
    BridgeConfig, Command, Error, Output, Plan, SessionContext, CONFIG_FILE_NAME,
};
use bridge_session::methods;
use tempfile::TempDir;

#[test]
fn settings_from_file_reach_the_session() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &file,
        r#"
transaction_label = "Footstep pass"
listener_id = 9
rtpc_step_ms = 100

[log]
level = "debug"
"#,
    )
    .unwrap();

    let config = BridgeConfig::from_file(&file).unwrap();
    assert_eq!(config.log.level, "debug");

    let project = create_project();
    project
        .add_object("\\Events\\Default Work Unit", "Play_Step", "Event")
        .unwrap();
    project
        .add_object("\\Game Parameters\\Default Work Unit", "Speed", "GameParameter")
        .unwrap();
    let mut ctx = SessionContext::connect(&project.connector(), config).unwrap();

    let outcome = ctx
        .execute(Plan::new(vec![
            create(&root_a(), &["Foo"], "Sound"),
            Command::PostEvent {
                event: "Play_Step".into(),
                game_object: Some("Hero".into()),
                delay_ms: 0,
            },
            Command::SetRtpc {
                rtpc: "Speed".into(),
                from: 0.0,
                to: 1.0,
                duration_ms: 200,
                game_object: None,
            },
        ]))
        .unwrap();

    assert_success(&outcome);
    assert_eq!(project.undo_history(), vec!["Footstep pass".to_string()]);
    assert_eq!(project.default_listeners(), vec![9]);
    assert_eq!(outcome.output(2), Some(&Output::Scheduled { samples: 3 }));
    assert_eq!(project.call_count(methods::SET_RTPC_VALUE), 3);
}

#[test]
fn default_file_is_written_once() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join(CONFIG_FILE_NAME);

    BridgeConfig::write_default_if_missing(&file).unwrap();
    let written = std::fs::read_to_string(&file).unwrap();
    assert_eq!(written, BridgeConfig::default_toml());
    assert_eq!(BridgeConfig::from_file(&file).unwrap(), BridgeConfig::default());

    std::fs::write(&file, "listener_id = 3\n").unwrap();
    BridgeConfig::write_default_if_missing(&file).unwrap();
    assert_eq!(BridgeConfig::from_file(&file).unwrap().listener_id, 3);
}

#[test]
fn invalid_file_refuses_to_connect() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&file, "call_timeout_ms = 0\n").unwrap();

    assert!(matches!(
        BridgeConfig::from_file(&file),
        Err(Error::Config { .. })
    ));

    let config = BridgeConfig {
        position_step_ms: 0,
        ..BridgeConfig::default()
    };
    let project = create_project();
    let err = SessionContext::connect(&project.connector(), config).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert_eq!(project.total_calls(), 0);
}
