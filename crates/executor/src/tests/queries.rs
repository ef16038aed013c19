//! Read-only command tests: listings, project info, index scans and
//! subscriptions.

use bridge_session::methods;

use super::*;
use crate::{Error, Output, Plan, PropertyValue, Selector};

const EVENTS_UNIT: &str = "\\Events\\Default Work Unit";

fn listing_names(outcome: &PlanOutcome, index: usize) -> Vec<String> {
    match outcome.output(index) {
        Some(Output::Listing(objects)) => objects.iter().map(|o| o.path.name().to_string()).collect(),
        other => panic!("expected Listing, got {:?}", other),
    }
}

#[test]
fn test_list_events_with_filters() {
    let project = MemoryProject::new();
    project.add_object(EVENTS_UNIT, "Play_Footsteps", "Event").unwrap();
    project.add_object(EVENTS_UNIT, "Stop_Footsteps", "Event").unwrap();
    project.add_path("\\Events\\Ambience\\Play_Rain", "Event").unwrap();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![
            Command::ListEvents { filter: None },
            Command::ListEvents {
                filter: Some("FOOT".into()),
            },
            Command::ListEvents {
                filter: Some("\\Events\\Ambience".into()),
            },
        ]))
        .unwrap();

    assert_success(&outcome);
    assert!(!outcome.transactional);
    let mut all = listing_names(&outcome, 0);
    all.sort();
    assert_eq!(all, vec!["Play_Footsteps", "Play_Rain", "Stop_Footsteps"]);
    assert_eq!(listing_names(&outcome, 1).len(), 2);
    assert_eq!(listing_names(&outcome, 2), vec!["Play_Rain"]);
}

#[test]
fn test_list_game_parameters() {
    let project = MemoryProject::new();
    project
        .add_object("\\Game Parameters\\Default Work Unit", "Speed", "GameParameter")
        .unwrap();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![Command::ListGameParameters { filter: None }]))
        .unwrap();
    assert_eq!(listing_names(&outcome, 0), vec!["Speed"]);
}

#[test]
fn test_list_switch_groups_with_members() {
    let project = MemoryProject::new();
    let unit = "\\Switches\\Default Work Unit";
    project.add_object(unit, "Surface", "SwitchGroup").unwrap();
    project.add_object(&format!("{}\\Surface", unit), "Grass", "Switch").unwrap();
    project.add_object(&format!("{}\\Surface", unit), "Stone", "Switch").unwrap();
    project.add_object(unit, "Empty", "SwitchGroup").unwrap();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![
            Command::ListSwitchGroups { filter: None },
            Command::ListStateGroups { filter: None },
        ]))
        .unwrap();

    assert_success(&outcome);
    match outcome.output(0) {
        Some(Output::Groups(groups)) => {
            assert_eq!(groups.len(), 2);
            let surface = groups.iter().find(|g| g.group.path.name() == "Surface").unwrap();
            assert_eq!(surface.members, vec!["Grass", "Stone"]);
            let empty = groups.iter().find(|g| g.group.path.name() == "Empty").unwrap();
            assert!(empty.members.is_empty());
        }
        other => panic!("expected Groups, got {:?}", other),
    }
    assert_eq!(outcome.output(1), Some(&Output::Groups(Vec::new())));
}

#[test]
fn test_project_info() {
    let project = MemoryProject::new();
    let mut ctx = connect(&project);

    let outcome = ctx.execute(Plan::new(vec![Command::GetProjectInfo])).unwrap();
    match outcome.output(0) {
        Some(Output::ProjectInfo(info)) => {
            assert_eq!(info.name, "Sim");
            assert!(info.path.ends_with("Sim.wproj"));
            assert_eq!(info.platforms, vec!["Windows", "Mac"]);
            assert_eq!(info.languages, vec!["English(US)", "French(France)"]);
        }
        other => panic!("expected ProjectInfo, got {:?}", other),
    }
}

#[test]
fn test_list_properties() {
    let project = MemoryProject::new();
    let mut ctx = connect(&project);

    let outcome = ctx.execute(Plan::new(vec![Command::ListProperties])).unwrap();
    match outcome.output(0) {
        Some(Output::Properties(props)) => {
            assert!(props.iter().any(|p| p.name == "Volume"));
            assert!(props.iter().all(|p| !p.accepts.is_empty()));
        }
        other => panic!("expected Properties, got {:?}", other),
    }
    // no remote round trip needed
    assert_eq!(project.total_calls(), 0);
}

#[test]
fn test_selection_feeds_next_plan() {
    let project = MemoryProject::new();
    project.add_object(UNIT, "Picked", "Sound").unwrap();
    project.add_object(UNIT, "Other", "Sound").unwrap();
    project.select(&[under_unit("Picked").as_str()]).unwrap();
    let mut ctx = connect(&project);

    let outcome = ctx.execute(Plan::new(vec![Command::GetSelection])).unwrap();
    assert_success(&outcome);
    assert_eq!(outcome.result_set.as_ref().map(|s| s.len()), Some(1));

    let outcome = ctx
        .execute(Plan::new(vec![Command::SetProperty {
            targets: Selector::Previous,
            property: "Volume".into(),
            value: PropertyValue::Real(-3.0),
        }]))
        .unwrap();
    assert_success(&outcome);
    assert_eq!(
        project.property(&under_unit("Picked"), "Volume").and_then(|v| v.as_f64()),
        Some(-3.0)
    );
    assert!(project.property(&under_unit("Other"), "Volume").is_none());
}

#[test]
fn test_index_subtree_output() {
    let project = MemoryProject::new();
    project.add_path(&format!("{}\\Mix\\Step", UNIT), "Sound").unwrap();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![Command::IndexSubtree {
            root: path(UNIT),
            extend: false,
        }]))
        .unwrap();

    assert_success(&outcome);
    match outcome.output(0) {
        Some(Output::Indexed { count, entries }) => {
            assert_eq!(*count, 3);
            assert_eq!(entries.len(), 3);
            assert_eq!(entries[0].path, path(UNIT));
            assert!(entries.iter().any(|e| e.path.name() == "Step" && e.object_type == "Sound"));
        }
        other => panic!("expected Indexed, got {:?}", other),
    }
    assert_eq!(ctx.index().roots(), &[path(UNIT)]);
    assert_eq!(outcome.result_set.as_ref().map(|s| s.len()), Some(3));
}

#[test]
fn test_index_subtree_missing_root() {
    let project = MemoryProject::new();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![Command::IndexSubtree {
            root: path("\\Nowhere"),
            extend: true,
        }]))
        .unwrap();
    let failure = outcome.failure.unwrap();
    assert!(matches!(failure.error, Error::Resolution { .. }));
    assert!(ctx.index().is_empty());
}

#[test]
fn test_resolve_paths_reports_per_path() {
    let project = MemoryProject::new();
    project.add_object(UNIT, "Here", "Sound").unwrap();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![Command::ResolvePaths {
            paths: vec![path(&under_unit("Here")), path(&under_unit("Gone"))],
        }]))
        .unwrap();

    assert_success(&outcome);
    match outcome.output(0) {
        Some(Output::Resolved(results)) => {
            assert!(results[0].is_found());
            assert_eq!(results[0].object_type.as_deref(), Some("Sound"));
            assert!(!results[1].is_found());
            assert!(results[1].error.is_some());
        }
        other => panic!("expected Resolved, got {:?}", other),
    }
}

#[test]
fn test_subscribe_poll_unsubscribe() {
    let project = MemoryProject::new();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![Command::Subscribe {
            topic: methods::TOPIC_CREATED.into(),
        }]))
        .unwrap();
    let id = match outcome.output(0) {
        Some(Output::Subscribed { id, topic }) => {
            assert_eq!(topic, methods::TOPIC_CREATED);
            *id
        }
        other => panic!("expected Subscribed, got {:?}", other),
    };
    assert_eq!(ctx.subscription_ids(), vec![id]);

    project.add_object(UNIT, "Fresh", "Sound").unwrap();

    let outcome = ctx
        .execute(Plan::new(vec![
            Command::PollEvents {
                id: Some(id),
                max: None,
            },
            Command::PollEvents { id: None, max: None },
        ]))
        .unwrap();
    assert_success(&outcome);
    match outcome.output(0) {
        Some(Output::ChangeEvents(events)) => {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].topic, methods::TOPIC_CREATED);
            assert_eq!(events[0].path, Some(path(&under_unit("Fresh"))));
        }
        other => panic!("expected ChangeEvents, got {:?}", other),
    }
    assert_eq!(outcome.output(1), Some(&Output::ChangeEvents(Vec::new())));

    let outcome = ctx
        .execute(Plan::new(vec![
            Command::Unsubscribe { id },
            Command::PollEvents {
                id: Some(id),
                max: None,
            },
        ]))
        .unwrap();
    assert_eq!(outcome.output(0), Some(&Output::Bool(true)));
    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].1, Error::SubscriptionNotFound { .. }));
    assert!(ctx.subscription_ids().is_empty());
}

#[test]
fn test_subscribe_rejects_empty_topic() {
    let project = MemoryProject::new();
    let mut ctx = connect(&project);

    let outcome = ctx
        .execute(Plan::new(vec![Command::Subscribe { topic: " ".into() }]))
        .unwrap();
    assert!(matches!(
        outcome.failure.map(|f| f.error),
        Some(Error::InvalidInput { .. })
    ));
}
