//! Plan Scenarios
//!
//! The four canonical plans: commit, rollback, read-only and chained.

use crate::common::*;
use authoring_bridge::{
    Command, Error, Output, Plan, PlanStatus, PropertyValue, RollbackStatus, Selector,
};
use bridge_session::{methods, TransactionState};

// ============================================================================
// Scenario A: create then rename commits as one group
// ============================================================================

#[test]
fn create_then_rename_commits() {
    let project = create_project();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![
            create(&root_a(), &["Foo"], "ActorMixer"),
            Command::RenameObjects {
                targets: Selector::path(&format!("{}\\Foo", root_a())).unwrap(),
                new_names: vec!["Bar".into()],
            },
        ]))
        .unwrap();

    assert_success(&outcome);
    assert!(outcome.transactional);
    assert_eq!(outcome.steps.len(), 2);

    assert!(ctx.index().contains(&path(&format!("{}\\Bar", root_a()))));
    assert!(!ctx.index().contains(&path(&format!("{}\\Foo", root_a()))));
    assert!(project.exists(&format!("{}\\Bar", root_a())));

    assert_eq!(project.call_count(methods::UNDO_BEGIN), 1);
    assert_eq!(project.call_count(methods::UNDO_END), 1);
    assert_eq!(project.call_count(methods::UNDO_CANCEL), 0);
    assert_eq!(project.transaction_state(), TransactionState::Committed);
}

// ============================================================================
// Scenario B: a failing command cancels the group
// ============================================================================

#[test]
fn missing_parent_rolls_back_earlier_create() {
    let project = create_project();
    let mut ctx = connect(&project);
    let before = project.dump();

    let outcome = ctx
        .execute(Plan::new(vec![
            create(&root_a(), &["Foo"], "ActorMixer"),
            create(&format!("{}\\Root\\Missing", UNIT), &["Child"], "ActorMixer"),
        ]))
        .unwrap();

    assert_eq!(outcome.status, PlanStatus::Failed);
    assert!(outcome.steps[0].is_ok());
    let failure = outcome.failure.as_ref().unwrap();
    assert_eq!(failure.index, 1);
    assert!(matches!(failure.error, Error::NotFound { .. }));
    assert_eq!(failure.rollback, RollbackStatus::RolledBack);

    assert!(!project.exists(&format!("{}\\Foo", root_a())));
    assert_eq!(project.dump(), before);
    assert!(!ctx.index().contains(&path(&format!("{}\\Foo", root_a()))));
    assert_eq!(project.call_count(methods::UNDO_CANCEL), 1);
    assert_eq!(project.transaction_state(), TransactionState::Cancelled);
    assert!(project.undo_history().is_empty());
}

#[test]
fn remaining_commands_are_skipped_after_failure() {
    let project = create_project();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![
            create(&format!("{}\\Root\\Missing", UNIT), &["Child"], "ActorMixer"),
            create(&root_a(), &["Never"], "ActorMixer"),
        ]))
        .unwrap();

    assert_eq!(outcome.steps.len(), 1);
    assert!(!project.exists(&format!("{}\\Never", root_a())));
}

// ============================================================================
// Scenario C: read-only plans never open a group
// ============================================================================

#[test]
fn list_events_runs_unwrapped() {
    let project = create_project();
    project
        .add_object("\\Events\\Default Work Unit", "Play_Foo", "Event")
        .unwrap();
    project
        .add_object("\\Events\\Default Work Unit", "Stop_Foo", "Event")
        .unwrap();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![Command::ListEvents { filter: None }]))
        .unwrap();

    assert_success(&outcome);
    assert!(!outcome.transactional);
    match outcome.output(0) {
        Some(Output::Listing(events)) => assert_eq!(events.len(), 2),
        other => panic!("Expected Output::Listing, got {:?}", other),
    }
    assert_eq!(project.call_count(methods::UNDO_BEGIN), 0);
    assert_eq!(project.mutating_calls(), 0);
}

// ============================================================================
// Scenario D: chained command consumes exactly the produced objects
// ============================================================================

#[test]
fn chained_command_consumes_created_objects() {
    let project = create_project();
    project.add_object(&root_a(), "Bystander", "Sound").unwrap();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![
            create(&root_a(), &["One", "Two", "Three"], "Sound"),
            Command::SetProperty {
                targets: Selector::Previous,
                property: "Pitch".into(),
                value: PropertyValue::Real(120.0),
            },
        ]))
        .unwrap();

    assert_success(&outcome);
    assert_eq!(extract_count(outcome.output(1)), 3);
    for name in ["One", "Two", "Three"] {
        assert!(project
            .property(&format!("{}\\{}", root_a(), name), "Pitch")
            .is_some());
    }
    assert!(project
        .property(&format!("{}\\Bystander", root_a()), "Pitch")
        .is_none());
    assert_eq!(outcome.result_set.map(|s| s.len()), Some(3));
}

#[test]
fn reuse_previous_flag_feeds_empty_selectors() {
    let project = create_project();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(
            Plan::new(vec![
                create(&root_a(), &["Foo"], "Sound"),
                Command::RenameObjects {
                    targets: Selector::Paths(Vec::new()),
                    new_names: vec!["Bar".into()],
                },
            ])
            .reusing_previous(),
        )
        .unwrap();

    assert_success(&outcome);
    assert!(project.exists(&format!("{}\\Bar", root_a())));
}
