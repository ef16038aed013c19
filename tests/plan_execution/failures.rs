//! Failure Escalation Tests
//!
//! Timeouts, failed commits and failed cancels, and plans on a closed
//! session.

use crate::common::*;
use authoring_bridge::{BridgeConfig, Error, Plan, RollbackStatus, SessionContext};
use bridge_session::{methods, TransactionState};

#[test]
fn timeout_is_rolled_back_like_an_error() {
    let project = create_project();
    let mut ctx = connect(&project);
    let before = project.dump();
    // the create reaches the project, then its reply is lost
    project.time_out_next(methods::OBJECT_CREATE);

    let outcome = ctx
        .execute(Plan::new(vec![create(&root_a(), &["Slow"], "Sound")]))
        .unwrap();

    let failure = outcome.failure.unwrap();
    assert!(matches!(failure.error, Error::Timeout { .. }));
    assert_eq!(failure.rollback, RollbackStatus::RolledBack);
    assert_eq!(project.dump(), before);
}

#[test]
fn commit_failure_cancels_the_group() {
    let project = create_project();
    let mut ctx = connect(&project);
    project.fail_next(methods::UNDO_END, "undo history is locked");

    let outcome = ctx
        .execute(Plan::new(vec![create(&root_a(), &["Foo"], "Sound")]))
        .unwrap();

    let failure = outcome.failure.unwrap();
    assert_eq!(failure.index, 1);
    assert_eq!(failure.command, "Commit");
    assert_eq!(failure.rollback, RollbackStatus::RolledBack);
    assert!(!project.exists(&format!("{}\\Foo", root_a())));
    assert_eq!(project.transaction_state(), TransactionState::Cancelled);
}

#[test]
fn failed_cancel_is_escalated() {
    let project = create_project();
    let mut ctx = connect(&project);
    project.fail_next_cancel();

    let err = ctx
        .execute(Plan::new(vec![
            create(&root_a(), &["Partial"], "Sound"),
            create(&format!("{}\\Root\\Missing", UNIT), &["Child"], "Sound"),
        ]))
        .unwrap_err();

    match err {
        Error::RollbackFailed {
            failed_command,
            cause,
            reason,
        } => {
            assert_eq!(failed_command, 1);
            assert!(cause.contains("Missing"));
            assert!(reason.contains("locked"));
        }
        other => panic!("Expected RollbackFailed, got {:?}", other),
    }

    // the partial change is visible and nothing cached is trusted
    assert!(project.exists(&format!("{}\\Partial", root_a())));
    assert!(ctx.cache().get().is_none());
    assert!(ctx.index().entries().all(|e| e.stale));

    // the session stays usable and sees the partial change
    let id = ctx.lookup(&path(&format!("{}\\Partial", root_a()))).unwrap();
    assert_eq!(Some(id), project.id_of(&format!("{}\\Partial", root_a())));
}

#[test]
fn refused_connection_is_reported() {
    let project = create_project();
    project.refuse_connections(true);

    let err = SessionContext::connect(&project.connector(), BridgeConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Connection { .. }));
}

#[test]
fn plan_after_disconnect_is_rejected() {
    let project = create_project();
    let mut ctx = connect(&project);
    ctx.disconnect();

    let err = ctx
        .execute(Plan::new(vec![create(&root_a(), &["Foo"], "Sound")]))
        .unwrap_err();
    assert_eq!(err, Error::NotConnected);
    assert!(!project.exists(&format!("{}\\Foo", root_a())));
    assert_eq!(project.call_count(methods::UNDO_BEGIN), 0);
}
