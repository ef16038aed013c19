//! Invariant Tests
//!
//! Properties that hold for every plan:
//! - a failed mutating plan leaves the remote project as it found it
//! - a read-only plan never opens an undo group
//! - a recorded path resolves without a remote call
//! - an invalidated path costs exactly one remote call
//! - rebuilding an unchanged subtree yields identical entries

use crate::common::*;
use authoring_bridge::{Command, Output, Plan, PropertyValue, Selector};
use bridge_session::methods;
use proptest::prelude::*;

fn property_command(value: f64) -> Command {
    Command::SetProperty {
        targets: Selector::Previous,
        property: "Volume".into(),
        value: PropertyValue::Real(value),
    }
}

fn failing_command() -> Command {
    Command::RenameObjects {
        targets: Selector::path(&format!("{}\\Root\\Missing", UNIT)).unwrap(),
        new_names: vec!["Anything".into()],
    }
}

fn read_only_command(pick: u8) -> Command {
    match pick % 6 {
        0 => Command::ListEvents { filter: None },
        1 => Command::GetProjectInfo,
        2 => Command::GetSelection,
        3 => Command::ListGameObjects,
        4 => Command::IndexSubtree {
            root: path(&root_a()),
            extend: true,
        },
        _ => Command::ResolvePaths {
            paths: vec![path(&root_a()), path("\\Nowhere\\At\\All")],
        },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn failed_plan_restores_remote_state(
        names in proptest::collection::vec("[A-Za-z][A-Za-z0-9_]{0,7}", 1..4),
        volume in -96.0f64..12.0,
        fail_at in 0usize..4,
    ) {
        let project = create_project();
        project.add_object(&root_a(), "Existing", "Sound").unwrap();
        let mut ctx = connect(&project);
        let before = project.dump();

        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut commands = vec![
            create(&root_a(), &names, "Sound"),
            property_command(volume),
            Command::RegisterGameObjects {
                names: vec!["Hero".into()],
                positions: Vec::new(),
            },
        ];
        commands.insert(fail_at.min(commands.len()), failing_command());

        let outcome = ctx.execute(Plan::new(commands)).unwrap();
        prop_assert!(!outcome.is_success());
        prop_assert_eq!(project.dump(), before);
        prop_assert!(ctx.cache().get().is_none());
    }

    #[test]
    fn read_only_plan_opens_no_group(picks in proptest::collection::vec(any::<u8>(), 0..8)) {
        let project = create_project();
        let mut ctx = connect(&project);

        let commands: Vec<Command> = picks.iter().map(|p| read_only_command(*p)).collect();
        let outcome = ctx.execute(Plan::new(commands)).unwrap();

        prop_assert!(!outcome.transactional);
        prop_assert_eq!(outcome.steps.len(), picks.len());
        prop_assert_eq!(project.call_count(methods::UNDO_BEGIN), 0);
        prop_assert_eq!(project.mutating_calls(), 0);
    }
}

#[test]
fn recorded_path_resolves_without_remote_call() {
    let project = create_project();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![create(&root_a(), &["Fresh"], "Sound")]))
        .unwrap();
    assert_success(&outcome);

    let fresh = path(&format!("{}\\Fresh", root_a()));
    project.reset_counters();
    let hits = ctx.index().stats().hits;

    let id = ctx.lookup(&fresh).unwrap();
    assert_eq!(Some(id), project.id_of(fresh.as_str()));
    assert_eq!(project.total_calls(), 0);
    assert_eq!(ctx.index().stats().hits, hits + 1);
}

#[test]
fn invalidated_path_costs_one_remote_call() {
    let project = create_project();
    project.add_object(&root_a(), "Leaf", "Sound").unwrap();
    let mut ctx = connect(&project);
    let leaf = path(&format!("{}\\Leaf", root_a()));

    ctx.execute(Plan::new(vec![Command::IndexSubtree {
        root: path(UNIT),
        extend: false,
    }]))
    .unwrap();

    // fresh entry: no call
    project.reset_counters();
    ctx.lookup(&leaf).unwrap();
    assert_eq!(project.call_count(methods::OBJECT_GET), 0);

    assert!(ctx.invalidate(&leaf) >= 1);
    ctx.lookup(&leaf).unwrap();
    assert_eq!(project.call_count(methods::OBJECT_GET), 1);

    // refreshed by the lookup
    ctx.lookup(&leaf).unwrap();
    assert_eq!(project.call_count(methods::OBJECT_GET), 1);
}

#[test]
fn invalidating_unknown_path_still_costs_one_call() {
    let project = create_project();
    let mut ctx = connect(&project);
    let a = path(&root_a());

    assert_eq!(ctx.invalidate(&a), 0);
    project.reset_counters();
    ctx.lookup(&a).unwrap();
    assert_eq!(project.call_count(methods::OBJECT_GET), 1);
}

#[test]
fn rebuilding_unchanged_subtree_is_idempotent() {
    let project = create_project();
    project
        .add_path(&format!("{}\\Deep\\Deeper\\Deepest", root_a()), "Sound")
        .unwrap();
    let mut ctx = connect(&project);
    let build = Command::IndexSubtree {
        root: path(UNIT),
        extend: false,
    };

    let first = ctx.execute(Plan::new(vec![build.clone()])).unwrap();
    let second = ctx.execute(Plan::new(vec![build])).unwrap();

    let entries = |outcome: &authoring_bridge::PlanOutcome| match outcome.output(0) {
        Some(Output::Indexed { entries, .. }) => entries.clone(),
        other => panic!("Expected Output::Indexed, got {:?}", other),
    };
    assert_eq!(entries(&first), entries(&second));
    assert_eq!(ctx.query_index(&path(UNIT)), entries(&second));
}
