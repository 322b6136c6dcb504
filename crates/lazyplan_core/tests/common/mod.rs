#![allow(dead_code)]

use lazyplan_core::sync::backend::{
    AddCardRequest, AddLaneRequest, CreatePlannerRequest, ImportMarkdownRequest, MoveCardRequest,
    ReorderCardsRequest, ReorderLanesRequest, SplitLaneRequest, UpdateCardRequest,
    UpdateLaneRequest, UpdatePlannerRequest,
};
use lazyplan_core::{
    BackendError, BackendResult, Card, Lane, Planner, PlannerBackend, PlannerTemplate,
};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// One request observed by `RecordingBackend`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: &'static str,
    /// Path ids in request order (planner, lane, card).
    pub ids: Vec<String>,
    pub body: Value,
}

/// In-memory backend that records every call and answers with server ids
/// `lane-N` / `card-N` / `planner-N`.
#[derive(Default)]
pub struct RecordingBackend {
    calls: RefCell<Vec<RecordedCall>>,
    failures: RefCell<HashMap<&'static str, BackendError>>,
    offline: Cell<bool>,
    next_id: Cell<u32>,
    planner: RefCell<Option<Planner>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose every call fails with a network error.
    pub fn offline() -> Self {
        let backend = Self::default();
        backend.offline.set(true);
        backend
    }

    /// Planner returned by `get_planner`.
    pub fn with_planner(planner: Planner) -> Self {
        let backend = Self::default();
        *backend.planner.borrow_mut() = Some(planner);
        backend
    }

    /// Fails the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: &'static str, error: BackendError) {
        self.failures.borrow_mut().insert(operation, error);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|call| call.operation).collect()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    fn record(&self, operation: &'static str, ids: &[&str], body: Value) -> BackendResult<()> {
        self.calls.borrow_mut().push(RecordedCall {
            operation,
            ids: ids.iter().map(|id| id.to_string()).collect(),
            body,
        });
        if self.offline.get() {
            return Err(BackendError::Network("connection refused".to_string()));
        }
        match self.failures.borrow_mut().remove(operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn mint(&self, prefix: &str) -> String {
        let next = self.next_id.get() + 1;
        self.next_id.set(next);
        format!("{prefix}-{next}")
    }
}

impl PlannerBackend for RecordingBackend {
    fn list_templates(&self) -> BackendResult<Vec<PlannerTemplate>> {
        self.record("list_templates", &[], Value::Null)?;
        Ok(vec![PlannerTemplate::kanban()])
    }

    fn create_planner(&self, request: &CreatePlannerRequest) -> BackendResult<Planner> {
        self.record("create_planner", &[], json!(request))?;
        let planner_id = self.mint("planner");
        let mut planner = Planner::new(planner_id.clone(), request.title.clone());
        planner.description = request.description.clone();
        planner.template_id = Some(request.template_id.clone());
        // Out of order on purpose: clients must normalize.
        planner.lanes.push(Lane::new(self.mint("lane"), planner_id.clone(), "Done", 1));
        planner.lanes.push(Lane::new(self.mint("lane"), planner_id, "To Do", 0));
        Ok(planner)
    }

    fn get_planner(&self, planner_id: &str) -> BackendResult<Planner> {
        self.record("get_planner", &[planner_id], Value::Null)?;
        self.planner.borrow().clone().ok_or(BackendError::Status {
            status: 404,
            message: "planner not found".to_string(),
        })
    }

    fn update_planner(
        &self,
        planner_id: &str,
        request: &UpdatePlannerRequest,
    ) -> BackendResult<Planner> {
        self.record("update_planner", &[planner_id], json!(request))?;
        let mut planner = Planner::new(planner_id, request.title.clone());
        planner.description = request.description.clone();
        Ok(planner)
    }

    fn delete_planner(&self, planner_id: &str) -> BackendResult<()> {
        self.record("delete_planner", &[planner_id], Value::Null)
    }

    fn add_lane(&self, planner_id: &str, request: &AddLaneRequest) -> BackendResult<Lane> {
        self.record("add_lane", &[planner_id], json!(request))?;
        let mut lane = Lane::new(self.mint("lane"), planner_id, request.title.clone(), request.position);
        lane.description = request.description.clone();
        lane.color = request.color.clone();
        Ok(lane)
    }

    fn update_lane(
        &self,
        planner_id: &str,
        lane_id: &str,
        request: &UpdateLaneRequest,
    ) -> BackendResult<Lane> {
        self.record("update_lane", &[planner_id, lane_id], json!(request))?;
        let mut lane = Lane::new(lane_id, planner_id, request.title.clone(), 0);
        lane.description = request.description.clone();
        lane.color = request.color.clone();
        Ok(lane)
    }

    fn delete_lane(&self, planner_id: &str, lane_id: &str) -> BackendResult<()> {
        self.record("delete_lane", &[planner_id, lane_id], Value::Null)
    }

    fn split_lane(
        &self,
        planner_id: &str,
        lane_id: &str,
        request: &SplitLaneRequest,
    ) -> BackendResult<Lane> {
        self.record("split_lane", &[planner_id, lane_id], json!(request))?;
        let mut lane = Lane::new(self.mint("lane"), planner_id, request.new_title.clone(), 0);
        lane.template_lane_id = Some(lane_id.to_string());
        Ok(lane)
    }

    fn reorder_lanes(&self, planner_id: &str, request: &ReorderLanesRequest) -> BackendResult<()> {
        self.record("reorder_lanes", &[planner_id], json!(request))
    }

    fn add_card(
        &self,
        planner_id: &str,
        lane_id: &str,
        request: &AddCardRequest,
    ) -> BackendResult<Card> {
        self.record("add_card", &[planner_id, lane_id], json!(request))?;
        Ok(Card::new(
            self.mint("card"),
            lane_id,
            request.title.clone(),
            request.content.clone(),
            request.position,
        ))
    }

    fn update_card(
        &self,
        planner_id: &str,
        lane_id: &str,
        card_id: &str,
        request: &UpdateCardRequest,
    ) -> BackendResult<Card> {
        self.record("update_card", &[planner_id, lane_id, card_id], json!(request))?;
        Ok(Card::new(card_id, lane_id, request.title.clone(), request.content.clone(), 0))
    }

    fn delete_card(&self, planner_id: &str, lane_id: &str, card_id: &str) -> BackendResult<()> {
        self.record("delete_card", &[planner_id, lane_id, card_id], Value::Null)
    }

    fn reorder_cards(
        &self,
        planner_id: &str,
        lane_id: &str,
        request: &ReorderCardsRequest,
    ) -> BackendResult<()> {
        self.record("reorder_cards", &[planner_id, lane_id], json!(request))
    }

    fn move_card(
        &self,
        planner_id: &str,
        card_id: &str,
        request: &MoveCardRequest,
    ) -> BackendResult<Card> {
        self.record("move_card", &[planner_id, card_id], json!(request))?;
        Ok(Card {
            id: card_id.to_string(),
            lane_id: request.new_lane_id.clone(),
            fields: Default::default(),
            position: request.new_position,
        })
    }

    fn export_markdown(&self, planner_id: &str) -> BackendResult<String> {
        self.record("export_markdown", &[planner_id], Value::Null)?;
        Ok("# From server\n".to_string())
    }

    fn import_markdown(&self, request: &ImportMarkdownRequest) -> BackendResult<Planner> {
        self.record("import_markdown", &[], json!(request))?;
        Ok(Planner::new(self.mint("planner"), "Imported on server"))
    }
}

/// Persisted board `p1`:
/// `todo [a, b]`, `doing [c]`, `done []`.
pub fn persisted_board() -> Planner {
    let mut planner = Planner::new("p1", "Roadmap");
    planner.description = "Q3".to_string();
    let mut todo = Lane::new("todo", "p1", "To Do", 0);
    todo.cards.push(Card::new("a", "todo", "A", "first", 0));
    todo.cards.push(Card::new("b", "todo", "B", "", 1));
    let mut doing = Lane::new("doing", "p1", "Doing", 1);
    doing.cards.push(Card::new("c", "doing", "C", "", 0));
    planner.lanes.push(todo);
    planner.lanes.push(doing);
    planner.lanes.push(Lane::new("done", "p1", "Done", 2));
    planner
}

/// Local-only copy of `persisted_board` under planner id `temp-123`.
pub fn temp_board() -> Planner {
    let mut planner = persisted_board();
    planner.id = "temp-123".to_string();
    for lane in &mut planner.lanes {
        lane.planner_id = planner.id.clone();
    }
    planner
}

/// Card ids of one lane in position order.
pub fn card_ids(planner: &Planner, lane_id: &str) -> Vec<String> {
    planner
        .lane(lane_id)
        .map(|lane| lane.cards.iter().map(|card| card.id.clone()).collect())
        .unwrap_or_default()
}
