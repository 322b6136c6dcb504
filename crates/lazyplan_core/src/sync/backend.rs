//! Backend collaborator contract and wire request bodies.
//!
//! # Responsibility
//! - Define the planner REST surface as a storage-agnostic trait.
//! - Keep request body field names identical to the backend contract.
//!
//! # Invariants
//! - Implementations never see `temp-` ids; the coordinator filters them.
//! - `DELETE`/reorder endpoints answer with no body (`204`).

use crate::model::planner::{Card, Lane, Planner};
use crate::model::template::PlannerTemplate;
use crate::sync::error::BackendResult;
use serde::{Deserialize, Serialize};

/// Body of `POST /planner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePlannerRequest {
    pub template_id: String,
    pub title: String,
    pub description: String,
}

/// Body of `PUT /planner/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePlannerRequest {
    pub title: String,
    pub description: String,
}

/// Body of `POST /planner/:id/lane`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLaneRequest {
    pub title: String,
    pub description: String,
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Body of `PUT /planner/:id/lane/:laneId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLaneRequest {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Body of `POST /planner/:id/lane/:laneId/split`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLaneRequest {
    pub new_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_description: Option<String>,
    pub split_position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_color: Option<String>,
}

/// Body of `PUT /planner/:id/lanes/reorder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderLanesRequest {
    pub lane_ids: Vec<String>,
}

/// Body of `POST /planner/:id/lane/:laneId/card`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCardRequest {
    pub title: String,
    pub content: String,
    pub position: i64,
}

/// Body of `PUT /planner/:id/lane/:laneId/card/:cardId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    pub title: String,
    pub content: String,
}

/// Body of `PUT /planner/:id/lane/:laneId/cards/reorder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderCardsRequest {
    pub card_ids: Vec<String>,
}

/// Body of `PUT /planner/:id/card/:cardId/move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCardRequest {
    pub new_lane_id: String,
    pub new_position: i64,
}

/// Body of `POST /planner/import`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMarkdownRequest {
    pub markdown: String,
    pub template_id: String,
}

/// Planner REST collaborator.
///
/// Calls are blocking from the caller's point of view; the single-threaded
/// event loop treats each call as its only suspension point.
pub trait PlannerBackend {
    /// `GET /planner/templates`
    fn list_templates(&self) -> BackendResult<Vec<PlannerTemplate>>;
    /// `POST /planner`
    fn create_planner(&self, request: &CreatePlannerRequest) -> BackendResult<Planner>;
    /// `GET /planner/:id`
    fn get_planner(&self, planner_id: &str) -> BackendResult<Planner>;
    /// `PUT /planner/:id`
    fn update_planner(
        &self,
        planner_id: &str,
        request: &UpdatePlannerRequest,
    ) -> BackendResult<Planner>;
    /// `DELETE /planner/:id`
    fn delete_planner(&self, planner_id: &str) -> BackendResult<()>;
    /// `POST /planner/:id/lane`
    fn add_lane(&self, planner_id: &str, request: &AddLaneRequest) -> BackendResult<Lane>;
    /// `PUT /planner/:id/lane/:laneId`
    fn update_lane(
        &self,
        planner_id: &str,
        lane_id: &str,
        request: &UpdateLaneRequest,
    ) -> BackendResult<Lane>;
    /// `DELETE /planner/:id/lane/:laneId`
    fn delete_lane(&self, planner_id: &str, lane_id: &str) -> BackendResult<()>;
    /// `POST /planner/:id/lane/:laneId/split`, answering with the new lane.
    fn split_lane(
        &self,
        planner_id: &str,
        lane_id: &str,
        request: &SplitLaneRequest,
    ) -> BackendResult<Lane>;
    /// `PUT /planner/:id/lanes/reorder`
    fn reorder_lanes(&self, planner_id: &str, request: &ReorderLanesRequest) -> BackendResult<()>;
    /// `POST /planner/:id/lane/:laneId/card`
    fn add_card(
        &self,
        planner_id: &str,
        lane_id: &str,
        request: &AddCardRequest,
    ) -> BackendResult<Card>;
    /// `PUT /planner/:id/lane/:laneId/card/:cardId`
    fn update_card(
        &self,
        planner_id: &str,
        lane_id: &str,
        card_id: &str,
        request: &UpdateCardRequest,
    ) -> BackendResult<Card>;
    /// `DELETE /planner/:id/lane/:laneId/card/:cardId`
    fn delete_card(&self, planner_id: &str, lane_id: &str, card_id: &str) -> BackendResult<()>;
    /// `PUT /planner/:id/lane/:laneId/cards/reorder`
    fn reorder_cards(
        &self,
        planner_id: &str,
        lane_id: &str,
        request: &ReorderCardsRequest,
    ) -> BackendResult<()>;
    /// `PUT /planner/:id/card/:cardId/move`
    fn move_card(
        &self,
        planner_id: &str,
        card_id: &str,
        request: &MoveCardRequest,
    ) -> BackendResult<Card>;
    /// `GET /planner/:id/export`, answering `text/markdown`.
    fn export_markdown(&self, planner_id: &str) -> BackendResult<String>;
    /// `POST /planner/import`
    fn import_markdown(&self, request: &ImportMarkdownRequest) -> BackendResult<Planner>;
}
