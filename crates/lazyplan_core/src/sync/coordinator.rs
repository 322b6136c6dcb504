//! Optimistic apply / confirm / rollback protocol for board mutations.
//!
//! # Responsibility
//! - Snapshot, apply locally, then confirm against the backend.
//! - Route `temp-` entities around the network entirely.
//! - Merge server replies (generated ids, authoritative fields) into the
//!   local planner.
//! - Discard confirmations that a newer local mutation has superseded.
//!
//! # Invariants
//! - A validation failure changes nothing and never reaches the backend.
//! - A failed latest mutation restores the pre-mutation snapshot exactly.
//! - A superseded reply never overwrites fields; it only remaps server ids.
//! - Versions are per entity key and strictly increase per local mutation.

use crate::engine::command::Command;
use crate::engine::ordering::{renumber_cards, visible_lane_order};
use crate::model::planner::{is_temp_id, Card, Lane, Planner};
use crate::store::{PlannerSnapshot, PlannerStore};
use crate::sync::backend::{
    AddCardRequest, AddLaneRequest, MoveCardRequest, PlannerBackend, ReorderCardsRequest,
    ReorderLanesRequest, SplitLaneRequest, UpdateCardRequest, UpdateLaneRequest,
    UpdatePlannerRequest,
};
use crate::sync::error::{BackendResult, SyncError, SyncResult};
use log::{debug, info, warn};
use std::collections::HashMap;

/// One planned backend request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    AddLane {
        planner_id: String,
        request: AddLaneRequest,
    },
    UpdateLane {
        planner_id: String,
        lane_id: String,
        request: UpdateLaneRequest,
    },
    DeleteLane {
        planner_id: String,
        lane_id: String,
    },
    SplitLane {
        planner_id: String,
        lane_id: String,
        request: SplitLaneRequest,
    },
    ReorderLanes {
        planner_id: String,
        request: ReorderLanesRequest,
    },
    AddCard {
        planner_id: String,
        lane_id: String,
        request: AddCardRequest,
    },
    UpdateCard {
        planner_id: String,
        lane_id: String,
        card_id: String,
        request: UpdateCardRequest,
    },
    DeleteCard {
        planner_id: String,
        lane_id: String,
        card_id: String,
    },
    ReorderCards {
        planner_id: String,
        lane_id: String,
        request: ReorderCardsRequest,
    },
    MoveCard {
        planner_id: String,
        card_id: String,
        request: MoveCardRequest,
    },
}

impl BackendCall {
    /// Stable operation name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddLane { .. } => "add_lane",
            Self::UpdateLane { .. } => "update_lane",
            Self::DeleteLane { .. } => "delete_lane",
            Self::SplitLane { .. } => "split_lane",
            Self::ReorderLanes { .. } => "reorder_lanes",
            Self::AddCard { .. } => "add_card",
            Self::UpdateCard { .. } => "update_card",
            Self::DeleteCard { .. } => "delete_card",
            Self::ReorderCards { .. } => "reorder_cards",
            Self::MoveCard { .. } => "move_card",
        }
    }

    /// Issues this call against `backend`.
    pub fn invoke<B: PlannerBackend + ?Sized>(&self, backend: &B) -> BackendResult<BackendReply> {
        match self {
            Self::AddLane { planner_id, request } => {
                backend.add_lane(planner_id, request).map(BackendReply::Lane)
            }
            Self::UpdateLane {
                planner_id,
                lane_id,
                request,
            } => backend
                .update_lane(planner_id, lane_id, request)
                .map(BackendReply::Lane),
            Self::DeleteLane {
                planner_id,
                lane_id,
            } => backend
                .delete_lane(planner_id, lane_id)
                .map(|()| BackendReply::Empty),
            Self::SplitLane {
                planner_id,
                lane_id,
                request,
            } => backend
                .split_lane(planner_id, lane_id, request)
                .map(BackendReply::Lane),
            Self::ReorderLanes { planner_id, request } => backend
                .reorder_lanes(planner_id, request)
                .map(|()| BackendReply::Empty),
            Self::AddCard {
                planner_id,
                lane_id,
                request,
            } => backend
                .add_card(planner_id, lane_id, request)
                .map(BackendReply::Card),
            Self::UpdateCard {
                planner_id,
                lane_id,
                card_id,
                request,
            } => backend
                .update_card(planner_id, lane_id, card_id, request)
                .map(BackendReply::Card),
            Self::DeleteCard {
                planner_id,
                lane_id,
                card_id,
            } => backend
                .delete_card(planner_id, lane_id, card_id)
                .map(|()| BackendReply::Empty),
            Self::ReorderCards {
                planner_id,
                lane_id,
                request,
            } => backend
                .reorder_cards(planner_id, lane_id, request)
                .map(|()| BackendReply::Empty),
            Self::MoveCard {
                planner_id,
                card_id,
                request,
            } => backend
                .move_card(planner_id, card_id, request)
                .map(BackendReply::Card),
        }
    }
}

/// Decoded successful backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    Lane(Lane),
    Card(Card),
    /// `204` endpoints.
    Empty,
}

/// How a mutation reaches (or skips) the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The reducer produced no change; nothing to confirm.
    Unchanged,
    /// Persisted later by the auto-save scheduler.
    Deferred,
    /// Involves a `temp-` entity; the local result is final.
    Bypass,
    Remote(BackendCall),
}

/// Lifecycle of one in-flight mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    /// Applied locally, awaiting confirmation.
    Optimistic,
    Confirmed,
    RolledBack,
    /// Settled after a newer mutation on the same entity; reply discarded.
    Superseded,
}

/// Result of a settled mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Backend accepted; reply merged.
    Confirmed,
    /// Local-only entity; no request was made.
    Bypassed,
    /// Applied locally; auto-save persists it.
    Deferred,
    /// The command did not change the planner.
    Unchanged,
    /// Reply arrived after a newer local mutation and was discarded.
    Stale,
}

impl SyncOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Bypassed => "bypassed",
            Self::Deferred => "deferred",
            Self::Unchanged => "unchanged",
            Self::Stale => "stale",
        }
    }
}

/// Mutation between `begin` and `settle`.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    command: Command,
    snapshot: PlannerSnapshot,
    route: Route,
    entity_key: String,
    /// Local id of the entity a lane/card reply describes.
    local_id: Option<String>,
    version: u64,
    state: MutationState,
}

impl PendingMutation {
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn snapshot(&self) -> &PlannerSnapshot {
        &self.snapshot
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn entity_key(&self) -> &str {
        &self.entity_key
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state(&self) -> MutationState {
        self.state
    }
}

/// Metadata save between `begin_metadata_save` and `settle_metadata_save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSave {
    planner_id: String,
    request: UpdatePlannerRequest,
    fingerprint: String,
    version: u64,
}

impl MetadataSave {
    pub fn planner_id(&self) -> &str {
        &self.planner_id
    }

    /// Fingerprint of the metadata this save sends.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Drives optimistic mutations against one backend.
pub struct SyncCoordinator<B: PlannerBackend> {
    backend: B,
    versions: HashMap<String, u64>,
}

impl<B: PlannerBackend> SyncCoordinator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            versions: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Latest locally-applied version for `entity_key` (`0` when untouched).
    pub fn version(&self, entity_key: &str) -> u64 {
        self.versions.get(entity_key).copied().unwrap_or(0)
    }

    /// Applies `command` optimistically and plans its backend request.
    ///
    /// # Errors
    /// - `SyncError::Validation` when the command fails its preconditions;
    ///   the store is untouched.
    pub fn begin(&mut self, store: &mut PlannerStore, command: Command) -> SyncResult<PendingMutation> {
        let snapshot = store.snapshot();
        if let Err(err) = store.apply(&command) {
            warn!(
                "event=mutation_apply module=sync status=error command={} error_code=validation_error error={}",
                command.name(),
                err
            );
            return Err(err.into());
        }

        let before = snapshot.planner();
        let after = store.current();
        let route = plan_route(before, after, &command);
        let entity_key = entity_key(after, &command);
        let version = if route == Route::Unchanged {
            self.version(&entity_key)
        } else {
            self.bump(&entity_key)
        };

        debug!(
            "event=mutation_apply module=sync status=ok command={} entity={} version={}",
            command.name(),
            entity_key,
            version
        );

        Ok(PendingMutation {
            local_id: local_entity_id(&command),
            command,
            snapshot,
            route,
            entity_key,
            version,
            state: MutationState::Optimistic,
        })
    }

    /// Sends the planned request; non-remote routes answer `Empty` locally.
    pub fn send(&self, pending: &PendingMutation) -> BackendResult<BackendReply> {
        match &pending.route {
            Route::Remote(call) => call.invoke(&self.backend),
            Route::Unchanged | Route::Deferred | Route::Bypass => Ok(BackendReply::Empty),
        }
    }

    /// Applies a backend reply to the store.
    ///
    /// Replies for the latest version are merged; failures of the latest
    /// version restore the snapshot. Replies for superseded versions only
    /// remap server ids, and their failures leave the newer state in place.
    ///
    /// The restored snapshot is the whole board as of `begin`; pending
    /// mutations on other entities begun after it are dropped with it.
    ///
    /// # Errors
    /// - `SyncError::Backend` whenever `reply` is an error, rolled back or not.
    pub fn settle(
        &mut self,
        store: &mut PlannerStore,
        pending: &mut PendingMutation,
        reply: BackendResult<BackendReply>,
    ) -> SyncResult<SyncOutcome> {
        let operation = match &pending.route {
            Route::Unchanged => {
                pending.state = MutationState::Confirmed;
                return Ok(SyncOutcome::Unchanged);
            }
            Route::Deferred => {
                pending.state = MutationState::Confirmed;
                return Ok(SyncOutcome::Deferred);
            }
            Route::Bypass => {
                pending.state = MutationState::Confirmed;
                info!(
                    "event=mutation_bypass module=sync status=ok command={} entity={}",
                    pending.command.name(),
                    pending.entity_key
                );
                return Ok(SyncOutcome::Bypassed);
            }
            Route::Remote(call) => call.name(),
        };

        let latest = self.version(&pending.entity_key) == pending.version;
        match reply {
            Ok(reply) if latest => {
                merge_reply(store.current_mut(), pending.local_id.as_deref(), reply, MergeMode::Full);
                pending.state = MutationState::Confirmed;
                info!(
                    "event=mutation_confirm module=sync status=ok operation={} entity={} version={}",
                    operation, pending.entity_key, pending.version
                );
                Ok(SyncOutcome::Confirmed)
            }
            Ok(reply) => {
                merge_reply(store.current_mut(), pending.local_id.as_deref(), reply, MergeMode::IdsOnly);
                pending.state = MutationState::Superseded;
                warn!(
                    "event=mutation_stale module=sync status=skip operation={} entity={} version={} latest={}",
                    operation,
                    pending.entity_key,
                    pending.version,
                    self.version(&pending.entity_key)
                );
                Ok(SyncOutcome::Stale)
            }
            Err(err) if latest => {
                store.restore(pending.snapshot.clone());
                pending.state = MutationState::RolledBack;
                warn!(
                    "event=mutation_rollback module=sync status=error operation={} entity={} version={} error_code={} error={}",
                    operation,
                    pending.entity_key,
                    pending.version,
                    err.code(),
                    err
                );
                Err(err.into())
            }
            Err(err) => {
                pending.state = MutationState::Superseded;
                warn!(
                    "event=mutation_stale module=sync status=error operation={} entity={} version={} error_code={} error={}",
                    operation,
                    pending.entity_key,
                    pending.version,
                    err.code(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Runs `begin`, `send` and `settle` back to back.
    pub fn dispatch(&mut self, store: &mut PlannerStore, command: Command) -> SyncResult<SyncOutcome> {
        let mut pending = self.begin(store, command)?;
        let reply = self.send(&pending);
        self.settle(store, &mut pending, reply)
    }

    /// Captures the metadata to persist. `None` for `temp-` planners.
    pub fn begin_metadata_save(&self, store: &PlannerStore) -> Option<MetadataSave> {
        let planner = store.current();
        if planner.is_temp() {
            return None;
        }
        Some(MetadataSave {
            planner_id: planner.id.clone(),
            request: UpdatePlannerRequest {
                title: planner.title.clone(),
                description: planner.description.clone(),
            },
            fingerprint: store.metadata_fingerprint(),
            version: self.version(&planner_key(&planner.id)),
        })
    }

    pub fn send_metadata_save(&self, save: &MetadataSave) -> BackendResult<Planner> {
        self.backend.update_planner(&save.planner_id, &save.request)
    }

    /// Records a finished metadata save.
    ///
    /// The sent fingerprint always counts as saved on success; server
    /// title/description are merged only when no newer edit happened.
    /// Failures never roll back local edits.
    pub fn settle_metadata_save(
        &mut self,
        store: &mut PlannerStore,
        save: MetadataSave,
        reply: BackendResult<Planner>,
    ) -> SyncResult<SyncOutcome> {
        let key = planner_key(&save.planner_id);
        let server = match reply {
            Ok(server) => server,
            Err(err) => {
                warn!(
                    "event=mutation_confirm module=sync status=error operation=update_planner entity={} error_code={} error={}",
                    key,
                    err.code(),
                    err
                );
                return Err(SyncError::Backend(err));
            }
        };

        store.mark_saved(save.fingerprint);
        if self.version(&key) != save.version || store.current().id != save.planner_id {
            warn!(
                "event=mutation_stale module=sync status=skip operation=update_planner entity={} version={}",
                key, save.version
            );
            return Ok(SyncOutcome::Stale);
        }

        let planner = store.current_mut();
        if !server.title.trim().is_empty() {
            planner.title = server.title;
        }
        if !server.description.is_empty() {
            planner.description = server.description;
        }
        let fingerprint = store.metadata_fingerprint();
        store.mark_saved(fingerprint);
        info!(
            "event=mutation_confirm module=sync status=ok operation=update_planner entity={} version={}",
            key, save.version
        );
        Ok(SyncOutcome::Confirmed)
    }

    /// Persists planner metadata in one step.
    pub fn save_metadata(&mut self, store: &mut PlannerStore) -> SyncResult<SyncOutcome> {
        let Some(save) = self.begin_metadata_save(store) else {
            return Ok(SyncOutcome::Bypassed);
        };
        let reply = self.send_metadata_save(&save);
        self.settle_metadata_save(store, save, reply)
    }

    fn bump(&mut self, entity_key: &str) -> u64 {
        let version = self.versions.entry(entity_key.to_string()).or_insert(0);
        *version += 1;
        *version
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeMode {
    Full,
    IdsOnly,
}

fn planner_key(planner_id: &str) -> String {
    format!("planner:{planner_id}")
}

fn entity_key(planner: &Planner, command: &Command) -> String {
    match command {
        Command::UpdatePlanner { .. } => planner_key(&planner.id),
        Command::AddLane { lane_id, .. }
        | Command::UpdateLane { lane_id, .. }
        | Command::DeleteLane { lane_id }
        | Command::SplitLane { lane_id, .. } => format!("lane:{lane_id}"),
        Command::ReorderLaneGroups { .. } => format!("lanes:{}", planner.id),
        Command::AddCard { card_id, .. }
        | Command::UpdateCard { card_id, .. }
        | Command::DeleteCard { card_id }
        | Command::MoveCard { card_id, .. } => format!("card:{card_id}"),
        Command::ReorderCards { lane_id, .. } => format!("cards:{lane_id}"),
    }
}

fn local_entity_id(command: &Command) -> Option<String> {
    match command {
        Command::AddLane { lane_id, .. } | Command::UpdateLane { lane_id, .. } => {
            Some(lane_id.clone())
        }
        Command::SplitLane { new_lane_id, .. } => Some(new_lane_id.clone()),
        Command::AddCard { card_id, .. }
        | Command::UpdateCard { card_id, .. }
        | Command::MoveCard { card_id, .. } => Some(card_id.clone()),
        _ => None,
    }
}

fn persisted_lane_order(planner: &Planner) -> Vec<String> {
    visible_lane_order(planner)
        .into_iter()
        .filter(|id| !is_temp_id(id))
        .collect()
}

fn persisted_card_order(planner: &Planner, lane_id: &str) -> Vec<String> {
    planner
        .lane(lane_id)
        .map(|lane| {
            lane.cards
                .iter()
                .filter(|card| !is_temp_id(&card.id))
                .map(|card| card.id.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Decides whether and how `command` reaches the backend.
///
/// `before`/`after` are the planner around the optimistic apply; request
/// bodies carry positions as they look after the apply.
fn plan_route(before: &Planner, after: &Planner, command: &Command) -> Route {
    if before == after {
        return Route::Unchanged;
    }
    if let Command::UpdatePlanner { .. } = command {
        return Route::Deferred;
    }

    let planner_id = after.id.clone();
    if is_temp_id(&planner_id) {
        return Route::Bypass;
    }

    let call = match command {
        Command::UpdatePlanner { .. } => return Route::Deferred,
        Command::AddLane { lane_id, .. } => {
            let Some(lane) = after.lane(lane_id) else {
                return Route::Unchanged;
            };
            BackendCall::AddLane {
                planner_id,
                request: AddLaneRequest {
                    title: lane.title.clone(),
                    description: lane.description.clone(),
                    position: lane.position,
                    color: lane.color.clone(),
                },
            }
        }
        Command::UpdateLane { lane_id, .. } => {
            if is_temp_id(lane_id) {
                return Route::Bypass;
            }
            let Some(lane) = after.lane(lane_id) else {
                return Route::Unchanged;
            };
            BackendCall::UpdateLane {
                planner_id,
                lane_id: lane_id.clone(),
                request: UpdateLaneRequest {
                    title: lane.title.clone(),
                    description: lane.description.clone(),
                    color: lane.color.clone(),
                },
            }
        }
        Command::DeleteLane { lane_id } => {
            if is_temp_id(lane_id) {
                return Route::Bypass;
            }
            BackendCall::DeleteLane {
                planner_id,
                lane_id: lane_id.clone(),
            }
        }
        Command::SplitLane {
            lane_id,
            new_title,
            new_description,
            split_index,
            new_color,
            ..
        } => {
            if is_temp_id(lane_id) {
                return Route::Bypass;
            }
            let card_count = before.lane(lane_id).map(|lane| lane.cards.len()).unwrap_or(0);
            BackendCall::SplitLane {
                planner_id,
                lane_id: lane_id.clone(),
                request: SplitLaneRequest {
                    new_title: new_title.trim().to_string(),
                    new_description: Some(new_description.clone()).filter(|value| !value.is_empty()),
                    split_position: (*split_index).min(card_count),
                    new_color: new_color.clone(),
                },
            }
        }
        Command::ReorderLaneGroups { .. } => {
            let lane_ids = persisted_lane_order(after);
            if lane_ids == persisted_lane_order(before) {
                return Route::Bypass;
            }
            BackendCall::ReorderLanes {
                planner_id,
                request: ReorderLanesRequest { lane_ids },
            }
        }
        Command::AddCard { card_id, lane_id, .. } => {
            if is_temp_id(lane_id) {
                return Route::Bypass;
            }
            let Some(card) = after.card(card_id) else {
                return Route::Unchanged;
            };
            BackendCall::AddCard {
                planner_id,
                lane_id: lane_id.clone(),
                request: AddCardRequest {
                    title: card.title().to_string(),
                    content: card.content().to_string(),
                    position: card.position,
                },
            }
        }
        Command::UpdateCard { card_id, .. } => {
            let Some(card) = after.card(card_id) else {
                return Route::Unchanged;
            };
            if is_temp_id(card_id) || is_temp_id(&card.lane_id) {
                return Route::Bypass;
            }
            BackendCall::UpdateCard {
                planner_id,
                lane_id: card.lane_id.clone(),
                card_id: card_id.clone(),
                request: UpdateCardRequest {
                    title: card.title().to_string(),
                    content: card.content().to_string(),
                },
            }
        }
        Command::DeleteCard { card_id } => {
            let Some(card) = before.card(card_id) else {
                return Route::Unchanged;
            };
            if is_temp_id(card_id) || is_temp_id(&card.lane_id) {
                return Route::Bypass;
            }
            BackendCall::DeleteCard {
                planner_id,
                lane_id: card.lane_id.clone(),
                card_id: card_id.clone(),
            }
        }
        Command::MoveCard {
            card_id,
            dest_lane_id,
            ..
        } => {
            if is_temp_id(card_id) || is_temp_id(dest_lane_id) {
                return Route::Bypass;
            }
            let Some(card) = after.card(card_id) else {
                return Route::Unchanged;
            };
            BackendCall::MoveCard {
                planner_id,
                card_id: card_id.clone(),
                request: MoveCardRequest {
                    new_lane_id: dest_lane_id.clone(),
                    new_position: card.position,
                },
            }
        }
        Command::ReorderCards { lane_id, .. } => {
            if is_temp_id(lane_id) {
                return Route::Bypass;
            }
            let card_ids = persisted_card_order(after, lane_id);
            if card_ids == persisted_card_order(before, lane_id) {
                return Route::Bypass;
            }
            BackendCall::ReorderCards {
                planner_id,
                lane_id: lane_id.clone(),
                request: ReorderCardsRequest { card_ids },
            }
        }
    };

    Route::Remote(call)
}

fn merge_reply(planner: &mut Planner, local_id: Option<&str>, reply: BackendReply, mode: MergeMode) {
    let Some(local_id) = local_id else {
        return;
    };
    match reply {
        BackendReply::Lane(lane) => merge_lane(planner, local_id, lane, mode),
        BackendReply::Card(card) => merge_card(planner, local_id, card, mode),
        BackendReply::Empty => {}
    }
}

/// Renames a lane and every reference to it (cards, split siblings).
pub(crate) fn remap_lane_id(planner: &mut Planner, from: &str, to: &str) {
    if from == to || to.is_empty() {
        return;
    }
    for lane in &mut planner.lanes {
        if lane.id == from {
            lane.id = to.to_string();
            for card in &mut lane.cards {
                card.lane_id = to.to_string();
            }
        }
        if lane.template_lane_id.as_deref() == Some(from) {
            lane.template_lane_id = Some(to.to_string());
        }
    }
}

fn merge_lane(planner: &mut Planner, local_id: &str, server: Lane, mode: MergeMode) {
    let lane_id = if server.id.is_empty() {
        local_id.to_string()
    } else {
        server.id.clone()
    };
    remap_lane_id(planner, local_id, &lane_id);
    if mode == MergeMode::IdsOnly {
        return;
    }

    let Some(lane) = planner.lane_mut(&lane_id) else {
        return;
    };
    if !server.title.trim().is_empty() {
        lane.title = server.title;
    }
    if !server.description.is_empty() {
        lane.description = server.description;
    }
    if server.color.is_some() {
        lane.color = server.color;
    }
    if !server.planner_id.is_empty() {
        lane.planner_id = server.planner_id;
    }
    if server.template_lane_id.is_some() {
        lane.template_lane_id = server.template_lane_id;
    }
    if !server.cards.is_empty() {
        let mut cards = server.cards;
        cards.sort_by_key(|card| card.position);
        for card in &mut cards {
            card.lane_id = lane_id.clone();
        }
        renumber_cards(&mut cards);
        lane.cards = cards;
    }
}

fn merge_card(planner: &mut Planner, local_id: &str, server: Card, mode: MergeMode) {
    let Some((lane_index, card_index)) = planner.locate_card(local_id) else {
        return;
    };
    let card = &mut planner.lanes[lane_index].cards[card_index];
    if !server.id.is_empty() {
        card.id = server.id;
    }
    if mode == MergeMode::IdsOnly {
        return;
    }
    for (key, value) in server.fields {
        card.fields.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::{entity_key, plan_route, remap_lane_id, BackendCall, Route};
    use crate::engine::command::{reduce, Command};
    use crate::model::planner::{Card, Lane, Planner};

    fn planner(id: &str) -> Planner {
        let mut planner = Planner::new(id, "Board");
        let mut todo = Lane::new("todo", id, "To Do", 0);
        todo.cards.push(Card::new("a", "todo", "A", "", 0));
        todo.cards.push(Card::new("b", "todo", "B", "", 1));
        planner.lanes.push(todo);
        planner.lanes.push(Lane::new("done", id, "Done", 1));
        planner
    }

    fn route(before: &Planner, command: &Command) -> Route {
        let after = reduce(before, command).unwrap();
        plan_route(before, &after, command)
    }

    #[test]
    fn move_request_carries_post_apply_position() {
        let before = planner("p1");
        let Route::Remote(BackendCall::MoveCard { request, .. }) =
            route(&before, &Command::move_card("b", "done", 7))
        else {
            panic!("expected remote move");
        };
        assert_eq!(request.new_lane_id, "done");
        assert_eq!(request.new_position, 0);
    }

    #[test]
    fn temp_entities_bypass_the_backend() {
        assert_eq!(
            route(&planner("temp-123"), &Command::add_lane("Review", "", None)),
            Route::Bypass
        );

        let mut before = planner("p1");
        before.lanes.push(Lane::new("temp-lane-x", "p1", "Local", 2));
        assert_eq!(route(&before, &Command::add_card("temp-lane-x", "Card", "")), Route::Bypass);
        assert_eq!(route(&before, &Command::move_card("a", "temp-lane-x", 0)), Route::Bypass);
    }

    #[test]
    fn no_op_commands_are_unchanged() {
        let before = planner("p1");
        assert_eq!(route(&before, &Command::move_card("a", "todo", 0)), Route::Unchanged);
        assert_eq!(
            route(
                &before,
                &Command::DeleteCard {
                    card_id: "ghost".to_string()
                }
            ),
            Route::Unchanged
        );
    }

    #[test]
    fn split_request_clamps_position() {
        let before = planner("p1");
        let Route::Remote(BackendCall::SplitLane { request, .. }) =
            route(&before, &Command::split_lane("todo", "Later", "", 9, None))
        else {
            panic!("expected remote split");
        };
        assert_eq!(request.split_position, 2);
        assert_eq!(request.new_description, None);
    }

    #[test]
    fn entity_keys_group_related_commands() {
        let planner = planner("p1");
        assert_eq!(entity_key(&planner, &Command::move_card("a", "done", 0)), "card:a");
        assert_eq!(
            entity_key(
                &planner,
                &Command::ReorderLaneGroups {
                    lane_id: "todo".to_string(),
                    dest_group_index: 1
                }
            ),
            "lanes:p1"
        );
    }

    #[test]
    fn remap_updates_cards_and_siblings() {
        let mut planner = planner("p1");
        let mut sibling = Lane::new("todo-2", "p1", "To Do (2)", 1);
        sibling.template_lane_id = Some("todo".to_string());
        planner.lanes.insert(1, sibling);

        remap_lane_id(&mut planner, "todo", "lane-42");
        let lane = planner.lane("lane-42").unwrap();
        assert!(lane.cards.iter().all(|card| card.lane_id == "lane-42"));
        assert_eq!(
            planner.lane("todo-2").unwrap().template_lane_id.as_deref(),
            Some("lane-42")
        );
    }
}
