//! Lane splitting into linked split groups.
//!
//! # Responsibility
//! - Partition one lane's cards into the original lane and a new sibling.
//! - Link the new lane into the original lane's split group.
//!
//! # Invariants
//! - Card count is conserved: `before == original.cards + new_lane.cards`.
//! - `split_index` is clamped to `[0, cards.len()]`; `0` and empty lanes are
//!   legal and yield an empty side.
//! - The new lane renders directly after the original lane.

use crate::engine::ordering::{normalize_lane_positions, renumber_cards};
use crate::model::planner::{Lane, Planner};

/// Parameters for one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSpec {
    pub new_title: String,
    pub new_description: String,
    /// Cards at index `>= split_index` move to the new lane.
    pub split_index: usize,
    /// Falls back to the original lane's color when `None`.
    pub new_color: Option<String>,
}

/// Result of splitting one lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub original: Lane,
    pub new_lane: Lane,
}

/// Splits `lane` at `spec.split_index` into itself and a new sibling.
///
/// The new lane gets `new_lane_id`, joins the original's group
/// (`template_lane_id = lane.template_lane_id ?? lane.id`) and is positioned
/// immediately after the original.
pub fn split_lane(lane: &Lane, spec: &SplitSpec, new_lane_id: impl Into<String>) -> SplitOutcome {
    let new_lane_id = new_lane_id.into();
    let mut original = lane.clone();
    let split_at = spec.split_index.min(original.cards.len());

    let mut moved = original.cards.split_off(split_at);
    for card in &mut moved {
        card.lane_id = new_lane_id.clone();
    }
    renumber_cards(&mut original.cards);
    renumber_cards(&mut moved);

    let new_lane = Lane {
        id: new_lane_id,
        planner_id: lane.planner_id.clone(),
        template_lane_id: Some(lane.group_key().to_string()),
        title: spec.new_title.clone(),
        description: spec.new_description.clone(),
        position: lane.position + 1,
        color: spec.new_color.clone().or_else(|| lane.color.clone()),
        cards: moved,
    };

    SplitOutcome { original, new_lane }
}

/// Applies a split to the whole planner and renumbers lanes globally.
///
/// Unknown `lane_id` returns the planner unchanged.
pub fn apply_split(planner: &Planner, lane_id: &str, spec: &SplitSpec, new_lane_id: &str) -> Planner {
    let Some(index) = planner.lane_index(lane_id) else {
        return planner.clone();
    };

    let outcome = split_lane(&planner.lanes[index], spec, new_lane_id);
    let mut next = planner.clone();
    let pivot = outcome.original.position;
    for lane in &mut next.lanes {
        if lane.position > pivot {
            lane.position += 1;
        }
    }
    next.lanes[index] = outcome.original;
    next.lanes.insert(index + 1, outcome.new_lane);
    normalize_lane_positions(&next)
}
