mod common;

use common::{card_ids, persisted_board, temp_board, RecordingBackend};
use lazyplan_core::engine::ordering::visible_lane_order;
use lazyplan_core::{
    is_temp_id, BackendError, Card, Command, EntityKind, Lane, ManualClock, MutationState, Planner,
    PlannerSession, PlannerStore, SyncCoordinator, SyncError, SyncOutcome, ValidationError,
};
use std::collections::BTreeMap;
use std::time::Duration;

fn session(planner: Planner, backend: RecordingBackend) -> PlannerSession<RecordingBackend, ManualClock> {
    PlannerSession::new(planner, backend, ManualClock::new(0), Duration::from_millis(2_000))
}

fn rename_card(card_id: &str, title: &str) -> Command {
    let mut fields = BTreeMap::new();
    fields.insert("title".to_string(), title.to_string());
    Command::UpdateCard {
        card_id: card_id.to_string(),
        fields,
    }
}

#[test]
fn failed_move_restores_previous_board_and_queues_notice() {
    let backend = RecordingBackend::new();
    backend.fail_next(
        "move_card",
        BackendError::Status {
            status: 500,
            message: "lane locked".to_string(),
        },
    );
    let mut session = session(persisted_board(), backend);
    let before = session.planner().clone();

    let err = session.dispatch(Command::move_card("b", "doing", 0)).unwrap_err();

    assert!(matches!(
        err,
        SyncError::Backend(BackendError::Status { status: 500, .. })
    ));
    assert_eq!(session.planner(), &before);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].operation, "move_card");
    assert_eq!(notices[0].code, "backend_error");
    assert!(notices[0].message.contains("lane locked"));
    assert!(session.take_notices().is_empty());
}

#[test]
fn confirmed_move_sends_post_apply_position() {
    let mut session = session(persisted_board(), RecordingBackend::new());

    let outcome = session.dispatch(Command::move_card("a", "doing", 1)).unwrap();

    assert_eq!(outcome, SyncOutcome::Confirmed);
    assert_eq!(card_ids(session.planner(), "todo"), vec!["b"]);
    assert_eq!(card_ids(session.planner(), "doing"), vec!["c", "a"]);
    let calls = session.coordinator().backend().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].operation, "move_card");
    assert_eq!(calls[0].ids, vec!["p1", "a"]);
    assert_eq!(calls[0].body["new_lane_id"], "doing");
    assert_eq!(calls[0].body["new_position"], 1);
}

#[test]
fn temp_planner_mutations_never_reach_the_backend() {
    let mut session = session(temp_board(), RecordingBackend::new());

    let outcome = session.dispatch(Command::add_lane("Later", "", None)).unwrap();
    assert_eq!(outcome, SyncOutcome::Bypassed);
    let new_lane = session.planner().lanes.last().unwrap().id.clone();
    assert!(new_lane.starts_with("temp-lane-"));

    session.dispatch(Command::move_card("a", &new_lane, 0)).unwrap();
    session
        .dispatch(Command::split_lane("doing", "Doing (2)", "", 0, None))
        .unwrap();
    session
        .dispatch(Command::DeleteLane {
            lane_id: "done".to_string(),
        })
        .unwrap();

    assert!(session.coordinator().backend().calls().is_empty());
    assert_eq!(card_ids(session.planner(), &new_lane), vec!["a"]);
}

#[test]
fn temp_lane_and_card_bypass_inside_persisted_planner() {
    let mut planner = persisted_board();
    planner.lanes.push(Lane::new("temp-lane-x", "p1", "Draft", 3));
    let mut session = session(planner, RecordingBackend::new());

    let outcome = session.dispatch(Command::add_card("temp-lane-x", "Idea", "")).unwrap();
    assert_eq!(outcome, SyncOutcome::Bypassed);
    let outcome = session.dispatch(Command::move_card("a", "temp-lane-x", 0)).unwrap();
    assert_eq!(outcome, SyncOutcome::Bypassed);

    assert!(session.coordinator().backend().calls().is_empty());
    assert_eq!(card_ids(session.planner(), "temp-lane-x")[0], "a");
}

#[test]
fn add_lane_confirmation_remaps_temp_id_to_server_id() {
    let mut session = session(persisted_board(), RecordingBackend::new());

    let outcome = session.dispatch(Command::add_lane("Later", "parked", None)).unwrap();
    assert_eq!(outcome, SyncOutcome::Confirmed);

    let planner = session.planner();
    assert!(planner.lanes.iter().all(|lane| !is_temp_id(&lane.id)));
    let lane = planner.lane("lane-1").unwrap();
    assert_eq!(lane.position, 3);
    assert_eq!(lane.description, "parked");

    session.dispatch(Command::add_card("lane-1", "Follow up", "")).unwrap();
    let calls = session.coordinator().backend().calls();
    assert_eq!(calls[0].body["position"], 3);
    assert_eq!(calls[1].operation, "add_card");
    assert_eq!(calls[1].ids, vec!["p1", "lane-1"]);
    assert_eq!(card_ids(session.planner(), "lane-1"), vec!["card-2"]);
}

#[test]
fn split_confirmation_links_server_lane_and_keeps_moved_cards() {
    let mut session = session(persisted_board(), RecordingBackend::new());

    let outcome = session
        .dispatch(Command::split_lane("todo", "To Do (2)", "", 1, None))
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Confirmed);
    let planner = session.planner();
    assert_eq!(visible_lane_order(planner), vec!["todo", "lane-1", "doing", "done"]);
    assert_eq!(card_ids(planner, "todo"), vec!["a"]);
    assert_eq!(card_ids(planner, "lane-1"), vec!["b"]);
    let split = planner.lane("lane-1").unwrap();
    assert_eq!(split.template_lane_id.as_deref(), Some("todo"));
    assert!(split.cards.iter().all(|card| card.lane_id == "lane-1"));

    let calls = session.coordinator().backend().calls();
    assert_eq!(calls[0].ids, vec!["p1", "todo"]);
    assert_eq!(calls[0].body["split_position"], 1);
}

#[test]
fn split_request_clamps_position_to_card_count() {
    let mut session = session(persisted_board(), RecordingBackend::new());

    session
        .dispatch(Command::split_lane("todo", "Overflow", "", 10, None))
        .unwrap();

    let calls = session.coordinator().backend().calls();
    assert_eq!(calls[0].body["split_position"], 2);
    assert!(session.planner().lane("lane-1").unwrap().cards.is_empty());
}

#[test]
fn reorder_with_unchanged_persisted_order_skips_the_network() {
    let mut planner = persisted_board();
    let lane = planner.lane_mut("todo").unwrap();
    lane.cards.insert(1, Card::new("temp-card-x", "todo", "Draft", "", 1));
    let mut session = session(planner, RecordingBackend::new());

    let outcome = session
        .dispatch(Command::ReorderCards {
            lane_id: "todo".to_string(),
            card_ids: vec!["temp-card-x".to_string(), "a".to_string(), "b".to_string()],
        })
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Bypassed);
    assert_eq!(card_ids(session.planner(), "todo"), vec!["temp-card-x", "a", "b"]);
    assert!(session.coordinator().backend().calls().is_empty());
}

#[test]
fn group_reorder_sends_full_persisted_lane_order() {
    let mut session = session(persisted_board(), RecordingBackend::new());

    session
        .dispatch(Command::ReorderLaneGroups {
            lane_id: "done".to_string(),
            dest_group_index: 0,
        })
        .unwrap();

    let calls = session.coordinator().backend().calls();
    assert_eq!(calls[0].operation, "reorder_lanes");
    assert_eq!(
        calls[0].body["lane_ids"],
        serde_json::json!(["done", "todo", "doing"])
    );
}

#[test]
fn delete_card_addresses_owning_lane() {
    let mut session = session(persisted_board(), RecordingBackend::new());

    session
        .dispatch(Command::DeleteCard {
            card_id: "b".to_string(),
        })
        .unwrap();

    let calls = session.coordinator().backend().calls();
    assert_eq!(calls[0].operation, "delete_card");
    assert_eq!(calls[0].ids, vec!["p1", "todo", "b"]);
    assert_eq!(card_ids(session.planner(), "todo"), vec!["a"]);
}

#[test]
fn no_op_move_makes_no_call_and_keeps_version() {
    let mut session = session(persisted_board(), RecordingBackend::new());

    let outcome = session.dispatch(Command::move_card("a", "todo", 0)).unwrap();

    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert!(session.coordinator().backend().calls().is_empty());
    assert_eq!(session.coordinator().version("card:a"), 0);
}

#[test]
fn validation_failure_changes_nothing_and_sends_nothing() {
    let mut session = session(persisted_board(), RecordingBackend::new());
    let before = session.planner().clone();

    let err = session.dispatch(Command::add_card("todo", "   ", "")).unwrap_err();

    assert_eq!(
        err,
        SyncError::Validation(ValidationError::BlankTitle(EntityKind::Card))
    );
    assert_eq!(session.planner(), &before);
    assert!(session.coordinator().backend().calls().is_empty());
    assert_eq!(session.take_notices()[0].code, "validation_error");
}

#[test]
fn stale_confirmation_does_not_overwrite_newer_edit() {
    let mut store = PlannerStore::new(persisted_board());
    let mut coordinator = SyncCoordinator::new(RecordingBackend::new());

    let mut first = coordinator.begin(&mut store, rename_card("a", "One")).unwrap();
    let mut second = coordinator.begin(&mut store, rename_card("a", "Two")).unwrap();
    assert_eq!(second.version(), first.version() + 1);

    let second_reply = coordinator.send(&second);
    let first_reply = coordinator.send(&first);

    let outcome = coordinator.settle(&mut store, &mut second, second_reply).unwrap();
    assert_eq!(outcome, SyncOutcome::Confirmed);
    let outcome = coordinator.settle(&mut store, &mut first, first_reply).unwrap();
    assert_eq!(outcome, SyncOutcome::Stale);

    assert_eq!(first.state(), MutationState::Superseded);
    assert_eq!(second.state(), MutationState::Confirmed);
    assert_eq!(store.current().card("a").unwrap().title(), "Two");
}

#[test]
fn stale_failure_keeps_newer_state() {
    let mut store = PlannerStore::new(persisted_board());
    let mut coordinator = SyncCoordinator::new(RecordingBackend::new());

    let mut first = coordinator
        .begin(&mut store, Command::move_card("a", "done", 0))
        .unwrap();
    let mut second = coordinator
        .begin(&mut store, Command::move_card("a", "doing", 0))
        .unwrap();

    let reply = coordinator.send(&second);
    coordinator.settle(&mut store, &mut second, reply).unwrap();
    let err = coordinator
        .settle(
            &mut store,
            &mut first,
            Err(BackendError::Network("timed out".to_string())),
        )
        .unwrap_err();

    assert_eq!(err.code(), "network_error");
    assert_eq!(first.state(), MutationState::Superseded);
    assert_eq!(card_ids(store.current(), "doing"), vec!["a", "c"]);
    assert!(card_ids(store.current(), "done").is_empty());
}

#[test]
fn latest_failure_rolls_back_to_its_snapshot() {
    let mut store = PlannerStore::new(persisted_board());
    let before = store.current().clone();
    let mut coordinator = SyncCoordinator::new(RecordingBackend::new());

    let mut pending = coordinator
        .begin(&mut store, Command::move_card("b", "done", 0))
        .unwrap();
    assert_eq!(pending.state(), MutationState::Optimistic);
    assert_eq!(card_ids(store.current(), "done"), vec!["b"]);

    let result = coordinator.settle(
        &mut store,
        &mut pending,
        Err(BackendError::Status {
            status: 409,
            message: String::new(),
        }),
    );

    assert!(result.is_err());
    assert_eq!(pending.state(), MutationState::RolledBack);
    assert_eq!(store.current(), &before);
}

#[test]
fn stale_add_confirmation_still_remaps_ids() {
    let mut store = PlannerStore::new(persisted_board());
    let mut coordinator = SyncCoordinator::new(RecordingBackend::new());

    let add = Command::add_card("todo", "Draft", "");
    let Command::AddCard { card_id, .. } = &add else {
        unreachable!();
    };
    let card_id = card_id.clone();
    let mut first = coordinator.begin(&mut store, add).unwrap();
    let reply = coordinator.send(&first);
    coordinator
        .begin(&mut store, rename_card(&card_id, "Draft v2"))
        .unwrap();

    let outcome = coordinator.settle(&mut store, &mut first, reply).unwrap();

    assert_eq!(outcome, SyncOutcome::Stale);
    let card = store.current().card("card-1").unwrap();
    assert_eq!(card.title(), "Draft v2");
    assert!(store.current().card(&card_id).is_none());
}
