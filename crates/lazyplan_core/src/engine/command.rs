//! Board commands and the pure reducer that applies them.
//!
//! # Responsibility
//! - Describe every board mutation as one tagged `Command` value.
//! - Apply commands as `(Planner, Command) -> Planner` with no side effects.
//!
//! # Invariants
//! - Validation runs before any change; a rejected command changes nothing.
//! - Commands naming unknown lanes/cards return the planner unchanged.
//! - Creating commands carry their provisional id, so `reduce` is pure and
//!   replayable.

use crate::engine::ordering::{
    insert_card, insert_lane, move_card, remove_card, remove_lane, reorder_cards,
    reorder_lane_groups,
};
use crate::engine::split::{apply_split, SplitSpec};
use crate::model::planner::{temp_card_id, temp_lane_id, Card, Lane, Planner};
use crate::model::validation::{require_id, require_title, EntityKind, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One user-level board mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Planner title/description edit. Persisted by auto-save.
    UpdatePlanner { title: String, description: String },
    AddLane {
        lane_id: String,
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        color: Option<String>,
        /// Target group index; `None` appends.
        #[serde(default)]
        group_index: Option<usize>,
    },
    UpdateLane {
        lane_id: String,
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        color: Option<String>,
    },
    DeleteLane { lane_id: String },
    SplitLane {
        lane_id: String,
        new_lane_id: String,
        new_title: String,
        #[serde(default)]
        new_description: String,
        split_index: usize,
        #[serde(default)]
        new_color: Option<String>,
    },
    /// Drags the whole split group containing `lane_id`.
    ReorderLaneGroups { lane_id: String, dest_group_index: usize },
    AddCard {
        card_id: String,
        lane_id: String,
        title: String,
        #[serde(default)]
        content: String,
        /// Target index in the lane; `None` appends.
        #[serde(default)]
        index: Option<usize>,
    },
    /// Merges `fields` over the card's existing fields.
    UpdateCard {
        card_id: String,
        fields: BTreeMap<String, String>,
    },
    DeleteCard { card_id: String },
    MoveCard {
        card_id: String,
        dest_lane_id: String,
        dest_index: usize,
    },
    ReorderCards { lane_id: String, card_ids: Vec<String> },
}

impl Command {
    /// Builds an `AddLane` with a freshly minted `temp-lane-` id.
    pub fn add_lane(title: impl Into<String>, description: impl Into<String>, color: Option<String>) -> Self {
        Self::AddLane {
            lane_id: temp_lane_id(),
            title: title.into(),
            description: description.into(),
            color,
            group_index: None,
        }
    }

    /// Builds an `AddCard` appended to `lane_id` with a `temp-card-` id.
    pub fn add_card(lane_id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::AddCard {
            card_id: temp_card_id(),
            lane_id: lane_id.into(),
            title: title.into(),
            content: content.into(),
            index: None,
        }
    }

    /// Builds a `SplitLane` whose new lane gets a `temp-lane-` id.
    pub fn split_lane(
        lane_id: impl Into<String>,
        new_title: impl Into<String>,
        new_description: impl Into<String>,
        split_index: usize,
        new_color: Option<String>,
    ) -> Self {
        Self::SplitLane {
            lane_id: lane_id.into(),
            new_lane_id: temp_lane_id(),
            new_title: new_title.into(),
            new_description: new_description.into(),
            split_index,
            new_color,
        }
    }

    pub fn move_card(card_id: impl Into<String>, dest_lane_id: impl Into<String>, dest_index: usize) -> Self {
        Self::MoveCard {
            card_id: card_id.into(),
            dest_lane_id: dest_lane_id.into(),
            dest_index,
        }
    }

    /// Stable name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdatePlanner { .. } => "update_planner",
            Self::AddLane { .. } => "add_lane",
            Self::UpdateLane { .. } => "update_lane",
            Self::DeleteLane { .. } => "delete_lane",
            Self::SplitLane { .. } => "split_lane",
            Self::ReorderLaneGroups { .. } => "reorder_lane_groups",
            Self::AddCard { .. } => "add_card",
            Self::UpdateCard { .. } => "update_card",
            Self::DeleteCard { .. } => "delete_card",
            Self::MoveCard { .. } => "move_card",
            Self::ReorderCards { .. } => "reorder_cards",
        }
    }

    /// Checks client-side preconditions without touching any planner.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::UpdatePlanner { title, .. } => require_title(title, EntityKind::Planner).map(drop),
            Self::AddLane { lane_id, title, .. } => {
                require_id(lane_id, EntityKind::Lane)?;
                require_title(title, EntityKind::Lane).map(drop)
            }
            Self::UpdateLane { lane_id, title, .. } => {
                require_id(lane_id, EntityKind::Lane)?;
                require_title(title, EntityKind::Lane).map(drop)
            }
            Self::SplitLane {
                lane_id,
                new_lane_id,
                new_title,
                ..
            } => {
                require_id(lane_id, EntityKind::Lane)?;
                require_id(new_lane_id, EntityKind::Lane)?;
                require_title(new_title, EntityKind::Lane).map(drop)
            }
            Self::AddCard {
                card_id,
                lane_id,
                title,
                ..
            } => {
                require_id(card_id, EntityKind::Card)?;
                require_id(lane_id, EntityKind::Lane)?;
                require_title(title, EntityKind::Card).map(drop)
            }
            Self::UpdateCard { card_id, fields } => {
                require_id(card_id, EntityKind::Card)?;
                match fields.get("title") {
                    Some(title) => require_title(title, EntityKind::Card).map(drop),
                    None => Ok(()),
                }
            }
            Self::DeleteLane { lane_id } | Self::ReorderLaneGroups { lane_id, .. } => {
                require_id(lane_id, EntityKind::Lane)
            }
            Self::ReorderCards { lane_id, .. } => require_id(lane_id, EntityKind::Lane),
            Self::DeleteCard { card_id } => require_id(card_id, EntityKind::Card),
            Self::MoveCard {
                card_id,
                dest_lane_id,
                ..
            } => {
                require_id(card_id, EntityKind::Card)?;
                require_id(dest_lane_id, EntityKind::Lane)
            }
        }
    }
}

/// Applies one command to a planner.
///
/// # Errors
/// - Returns `ValidationError` when the command fails its preconditions.
pub fn reduce(planner: &Planner, command: &Command) -> Result<Planner, ValidationError> {
    command.validate()?;

    let next = match command {
        Command::UpdatePlanner { title, description } => {
            let mut next = planner.clone();
            next.title = title.trim().to_string();
            next.description = description.clone();
            next
        }
        Command::AddLane {
            lane_id,
            title,
            description,
            color,
            group_index,
        } => {
            if planner.lane(lane_id).is_some() {
                return Ok(planner.clone());
            }
            let mut lane = Lane::new(lane_id.clone(), planner.id.clone(), title.trim(), 0);
            lane.description = description.clone();
            lane.color = color.clone();
            insert_lane(planner, lane, *group_index)
        }
        Command::UpdateLane {
            lane_id,
            title,
            description,
            color,
        } => {
            let mut next = planner.clone();
            if let Some(lane) = next.lane_mut(lane_id) {
                lane.title = title.trim().to_string();
                lane.description = description.clone();
                if color.is_some() {
                    lane.color = color.clone();
                }
            }
            next
        }
        Command::DeleteLane { lane_id } => remove_lane(planner, lane_id),
        Command::SplitLane {
            lane_id,
            new_lane_id,
            new_title,
            new_description,
            split_index,
            new_color,
        } => {
            if planner.lane(new_lane_id).is_some() {
                return Ok(planner.clone());
            }
            let spec = SplitSpec {
                new_title: new_title.trim().to_string(),
                new_description: new_description.clone(),
                split_index: *split_index,
                new_color: new_color.clone(),
            };
            apply_split(planner, lane_id, &spec, new_lane_id)
        }
        Command::ReorderLaneGroups {
            lane_id,
            dest_group_index,
        } => reorder_lane_groups(planner, lane_id, *dest_group_index),
        Command::AddCard {
            card_id,
            lane_id,
            title,
            content,
            index,
        } => {
            if planner.card(card_id).is_some() {
                return Ok(planner.clone());
            }
            let card = Card::new(card_id.clone(), lane_id.clone(), title.trim(), content.clone(), 0);
            insert_card(planner, lane_id, card, *index)
        }
        Command::UpdateCard { card_id, fields } => {
            let mut next = planner.clone();
            if let Some((lane_index, card_index)) = next.locate_card(card_id) {
                let card = &mut next.lanes[lane_index].cards[card_index];
                for (key, value) in fields {
                    card.fields.insert(key.clone(), value.clone());
                }
            }
            next
        }
        Command::DeleteCard { card_id } => remove_card(planner, card_id),
        Command::MoveCard {
            card_id,
            dest_lane_id,
            dest_index,
        } => move_card(planner, card_id, dest_lane_id, *dest_index),
        Command::ReorderCards { lane_id, card_ids } => reorder_cards(planner, lane_id, card_ids),
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::{reduce, Command};
    use crate::model::planner::{Lane, Planner};
    use crate::model::validation::{EntityKind, ValidationError};
    use std::collections::BTreeMap;

    fn planner() -> Planner {
        let mut planner = Planner::new("p1", "Board");
        planner.lanes.push(Lane::new("todo", "p1", "To Do", 0));
        planner
    }

    #[test]
    fn blank_titles_are_rejected_before_any_change() {
        let err = reduce(&planner(), &Command::add_lane("  ", "", None)).unwrap_err();
        assert_eq!(err, ValidationError::BlankTitle(EntityKind::Lane));

        let err = reduce(&planner(), &Command::add_card("todo", "", "body")).unwrap_err();
        assert_eq!(err, ValidationError::BlankTitle(EntityKind::Card));
    }

    #[test]
    fn add_lane_and_card_use_provisional_ids() {
        let add_lane = Command::add_lane("Review", "", Some("#f00".to_string()));
        let Command::AddLane { lane_id, .. } = &add_lane else {
            unreachable!()
        };
        let next = reduce(&planner(), &add_lane).unwrap();
        assert!(lane_id.starts_with("temp-lane-"));
        let lane = next.lane(lane_id).unwrap();
        assert_eq!(lane.position, 1);
        assert_eq!(lane.planner_id, "p1");

        let add_card = Command::add_card("todo", " Write docs ", "body");
        let next = reduce(&next, &add_card).unwrap();
        let card = &next.lane("todo").unwrap().cards[0];
        assert!(card.id.starts_with("temp-card-"));
        assert_eq!(card.title(), "Write docs");
        assert_eq!(card.content(), "body");
    }

    #[test]
    fn replaying_a_creating_command_is_a_no_op() {
        let add_lane = Command::add_lane("Review", "", None);
        let once = reduce(&planner(), &add_lane).unwrap();
        let twice = reduce(&once, &add_lane).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn update_card_merges_fields() {
        let add_card = Command::AddCard {
            card_id: "c1".to_string(),
            lane_id: "todo".to_string(),
            title: "A".to_string(),
            content: "body".to_string(),
            index: None,
        };
        let next = reduce(&planner(), &add_card).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), "B".to_string());
        fields.insert("due".to_string(), "2026-11-01".to_string());
        let next = reduce(
            &next,
            &Command::UpdateCard {
                card_id: "c1".to_string(),
                fields,
            },
        )
        .unwrap();
        let card = next.card("c1").unwrap();
        assert_eq!(card.title(), "B");
        assert_eq!(card.content(), "body");
        assert_eq!(card.field("due"), "2026-11-01");
    }

    #[test]
    fn unknown_targets_leave_planner_unchanged() {
        let base = planner();
        let commands = vec![
            Command::DeleteLane {
                lane_id: "ghost".to_string(),
            },
            Command::move_card("ghost", "todo", 0),
            Command::split_lane("ghost", "B", "", 0, None),
            Command::add_card("ghost", "Card", ""),
        ];
        for command in commands {
            assert_eq!(reduce(&base, &command).unwrap(), base, "{}", command.name());
        }
    }

    #[test]
    fn commands_use_tagged_wire_format() {
        let json = r#"{"type":"move_card","card_id":"c1","dest_lane_id":"l2","dest_index":0}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(command, Command::move_card("c1", "l2", 0));
    }
}
