//! Position bookkeeping for lanes and cards.
//!
//! # Responsibility
//! - Keep card positions contiguous inside each lane.
//! - Compute split-group aware lane ordering and global lane renumbering.
//!
//! # Invariants
//! - Every function is total over well-formed input: unknown ids return the
//!   planner unchanged instead of failing.
//! - Out-of-range target indexes are clamped (append semantics).
//! - After any lane reorder, flattening groups in visible order yields lane
//!   positions `0..m-1`, and `planner.lanes` is stored in that order.

use crate::model::planner::{Card, Lane, LaneGroupRole, Planner};

/// One split group in visible order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneGroup {
    /// Id of the group's anchor lane.
    pub key: String,
    /// Member ids sorted by ascending position.
    pub lane_ids: Vec<String>,
    /// Smallest member position; orders groups against each other.
    pub min_position: i64,
}

/// Renumbers `lane.cards[i].position = i`.
pub fn reindex_cards(mut lane: Lane) -> Lane {
    renumber_cards(&mut lane.cards);
    lane
}

pub(crate) fn renumber_cards(cards: &mut [Card]) {
    for (index, card) in cards.iter_mut().enumerate() {
        card.position = index as i64;
    }
}

/// Moves one card to `dest_index` of `dest_lane_id`.
///
/// Same-lane moves are the `source == destination` case. The source lane is
/// reindexed before insertion, so `dest_index` addresses the destination as
/// it looks without the moved card.
pub fn move_card(planner: &Planner, card_id: &str, dest_lane_id: &str, dest_index: usize) -> Planner {
    let mut next = planner.clone();
    let Some((source_lane, card_index)) = next.locate_card(card_id) else {
        return next;
    };
    let Some(dest_lane) = next.lane_index(dest_lane_id) else {
        return next;
    };

    let mut card = next.lanes[source_lane].cards.remove(card_index);
    renumber_cards(&mut next.lanes[source_lane].cards);

    card.lane_id = dest_lane_id.to_string();
    let dest_cards = &mut next.lanes[dest_lane].cards;
    let index = dest_index.min(dest_cards.len());
    dest_cards.insert(index, card);
    renumber_cards(dest_cards);
    next
}

/// Reorders the cards of one lane to follow `card_ids`.
///
/// Unknown ids are ignored; cards absent from `card_ids` keep their relative
/// order after the listed ones.
pub fn reorder_cards(planner: &Planner, lane_id: &str, card_ids: &[String]) -> Planner {
    let mut next = planner.clone();
    let Some(lane) = next.lane_mut(lane_id) else {
        return next;
    };

    let mut remaining = std::mem::take(&mut lane.cards);
    let mut ordered = Vec::with_capacity(remaining.len());
    for card_id in card_ids {
        if let Some(index) = remaining.iter().position(|card| &card.id == card_id) {
            ordered.push(remaining.remove(index));
        }
    }
    ordered.append(&mut remaining);
    renumber_cards(&mut ordered);
    lane.cards = ordered;
    next
}

/// Inserts a card into a lane at `index` (clamped; `None` appends).
pub fn insert_card(planner: &Planner, lane_id: &str, mut card: Card, index: Option<usize>) -> Planner {
    let mut next = planner.clone();
    let Some(lane) = next.lane_mut(lane_id) else {
        return next;
    };
    card.lane_id = lane_id.to_string();
    let index = index.unwrap_or(lane.cards.len()).min(lane.cards.len());
    lane.cards.insert(index, card);
    renumber_cards(&mut lane.cards);
    next
}

/// Removes a card and reindexes its lane.
pub fn remove_card(planner: &Planner, card_id: &str) -> Planner {
    let mut next = planner.clone();
    if let Some((lane_index, card_index)) = next.locate_card(card_id) {
        let cards = &mut next.lanes[lane_index].cards;
        cards.remove(card_index);
        renumber_cards(cards);
    }
    next
}

/// Groups lanes under their anchor (see `Planner::lane_role`), in visible
/// order.
///
/// Groups are ordered by their minimum position; members by ascending
/// position. Equal positions fall back to storage order.
pub fn lane_groups(planner: &Planner) -> Vec<LaneGroup> {
    let mut ordered: Vec<(usize, &Lane)> = planner.lanes.iter().enumerate().collect();
    ordered.sort_by_key(|(index, lane)| (lane.position, *index));

    let mut groups: Vec<LaneGroup> = Vec::new();
    for (_, lane) in ordered {
        let key = planner
            .lane_role(&lane.id)
            .map(|role| role.anchor_id().to_string())
            .unwrap_or_else(|| lane.id.clone());
        match groups.iter_mut().find(|group| group.key == key) {
            Some(group) => group.lane_ids.push(lane.id.clone()),
            None => groups.push(LaneGroup {
                key,
                lane_ids: vec![lane.id.clone()],
                min_position: lane.position,
            }),
        }
    }
    groups
}

/// Flattens `lane_groups` into the order lanes render in.
pub fn visible_lane_order(planner: &Planner) -> Vec<String> {
    lane_groups(planner)
        .into_iter()
        .flat_map(|group| group.lane_ids)
        .collect()
}

/// Renumbers lane positions `0..m-1` following visible order.
pub fn normalize_lane_positions(planner: &Planner) -> Planner {
    let order = visible_lane_order(planner);
    apply_lane_order(planner, &order)
}

/// Canonicalizes a planner received from the backend.
///
/// Cards are sorted by their stored position and reindexed, lanes are stored
/// in visible order with positions `0..m-1`.
pub fn normalize_planner(planner: &Planner) -> Planner {
    let mut next = normalize_lane_positions(planner);
    for lane in &mut next.lanes {
        lane.cards.sort_by_key(|card| card.position);
        for card in &mut lane.cards {
            card.lane_id = lane.id.clone();
        }
        renumber_cards(&mut lane.cards);
    }
    next
}

/// Moves the whole group containing `dragged_lane_id` to `dest_group_index`.
///
/// Any member id identifies the group; the anchor is the usual drag handle.
pub fn reorder_lane_groups(planner: &Planner, dragged_lane_id: &str, dest_group_index: usize) -> Planner {
    let mut groups = lane_groups(planner);
    let Some(from) = groups
        .iter()
        .position(|group| group.lane_ids.iter().any(|id| id == dragged_lane_id))
    else {
        return planner.clone();
    };

    let group = groups.remove(from);
    let dest = dest_group_index.min(groups.len());
    groups.insert(dest, group);

    let order: Vec<String> = groups.into_iter().flat_map(|group| group.lane_ids).collect();
    apply_lane_order(planner, &order)
}

/// Inserts a standalone lane as its own group at `group_index`.
///
/// `None` appends after the last group.
pub fn insert_lane(planner: &Planner, lane: Lane, group_index: Option<usize>) -> Planner {
    let groups = lane_groups(planner);
    let dest = group_index.unwrap_or(groups.len()).min(groups.len());

    let mut order: Vec<String> = Vec::with_capacity(planner.lanes.len() + 1);
    for (index, group) in groups.into_iter().enumerate() {
        if index == dest {
            order.push(lane.id.clone());
        }
        order.extend(group.lane_ids);
    }
    if !order.iter().any(|id| id == &lane.id) {
        order.push(lane.id.clone());
    }

    let mut next = planner.clone();
    next.lanes.push(lane);
    apply_lane_order(&next, &order)
}

/// Removes a lane with its cards, then renumbers globally.
///
/// When the removed lane anchors siblings keyed by its own id, the
/// lowest-positioned sibling becomes the new anchor and the rest are
/// re-keyed to it. Template-keyed groups re-anchor on their own.
pub fn remove_lane(planner: &Planner, lane_id: &str) -> Planner {
    let Some(index) = planner.lane_index(lane_id) else {
        return planner.clone();
    };

    let siblings: Vec<String> = match planner.lane_role(lane_id) {
        Some(LaneGroupRole::Anchor { .. }) => planner
            .lanes
            .iter()
            .filter_map(|lane| match planner.lane_role(&lane.id) {
                Some(LaneGroupRole::Sibling { id, anchor_id }) if anchor_id == lane_id => Some(id),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut next = planner.clone();
    let removed = next.lanes.remove(index);

    if removed.group_key() == removed.id {
        let mut orphans: Vec<&mut Lane> = next
            .lanes
            .iter_mut()
            .filter(|lane| siblings.contains(&lane.id))
            .collect();
        orphans.sort_by_key(|lane| lane.position);
        if let Some((promoted, rest)) = orphans.split_first_mut() {
            promoted.template_lane_id = None;
            let promoted_id = promoted.id.clone();
            for sibling in rest.iter_mut() {
                sibling.template_lane_id = Some(promoted_id.clone());
            }
        }
    }

    normalize_lane_positions(&next)
}

/// Rebuilds `planner.lanes` in `order` with sequential positions.
///
/// Lanes missing from `order` keep their relative order at the end.
pub(crate) fn apply_lane_order(planner: &Planner, order: &[String]) -> Planner {
    let mut next = planner.clone();
    let mut remaining = std::mem::take(&mut next.lanes);
    let mut lanes = Vec::with_capacity(remaining.len());
    for lane_id in order {
        if let Some(index) = remaining.iter().position(|lane| &lane.id == lane_id) {
            lanes.push(remaining.remove(index));
        }
    }
    lanes.append(&mut remaining);
    for (position, lane) in lanes.iter_mut().enumerate() {
        lane.position = position as i64;
    }
    next.lanes = lanes;
    next
}
