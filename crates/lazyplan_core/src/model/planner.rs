//! Planner board aggregate: planner, lanes and cards.
//!
//! # Responsibility
//! - Define the canonical board shape shared by engine, sync and UI layers.
//! - Own the temp-id convention for entities that exist only locally.
//! - Resolve split-group membership into an explicit `LaneGroupRole`.
//!
//! # Invariants
//! - Within one lane, `cards[i].position == i` once the engine has touched it.
//! - A lane's group key is `template_lane_id` when set, otherwise its own id.
//! - Ids starting with `temp-` are locally authoritative and never sent to
//!   the backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Prefix shared by every locally authoritative id.
pub const TEMP_ID_PREFIX: &str = "temp-";
/// Prefix for locally minted lane ids.
pub const TEMP_LANE_PREFIX: &str = "temp-lane-";
/// Prefix for locally minted card ids.
pub const TEMP_CARD_PREFIX: &str = "temp-card-";

/// Field key holding a card's title.
pub const CARD_TITLE_FIELD: &str = "title";
/// Field key holding a card's body.
pub const CARD_CONTENT_FIELD: &str = "content";

/// Returns whether `id` names a client-only entity.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Mints a client-only planner id (`temp-<uuid>`).
pub fn temp_planner_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
}

/// Mints a client-only lane id (`temp-lane-<uuid>`).
pub fn temp_lane_id() -> String {
    format!("{TEMP_LANE_PREFIX}{}", Uuid::new_v4())
}

/// Mints a client-only card id (`temp-card-<uuid>`).
pub fn temp_card_id() -> String {
    format!("{TEMP_CARD_PREFIX}{}", Uuid::new_v4())
}

/// Root aggregate: one open board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planner {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub lanes: Vec<Lane>,
}

/// One column of ordered cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: String,
    #[serde(default)]
    pub planner_id: String,
    /// Split-group key. `None` or equal to `id` marks a standalone anchor.
    #[serde(default)]
    pub template_lane_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// One task/item owned by exactly one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub lane_id: String,
    /// Schema-free beyond `title` and `content`.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub position: i64,
}

/// Explicit split-group membership of one lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneGroupRole {
    /// Defines the group's place in cross-group ordering.
    Anchor { id: String },
    /// Split-off member rendered next to its anchor.
    Sibling { id: String, anchor_id: String },
}

impl LaneGroupRole {
    pub fn lane_id(&self) -> &str {
        match self {
            Self::Anchor { id } | Self::Sibling { id, .. } => id,
        }
    }

    /// Id of the lane anchoring this lane's group (itself for anchors).
    pub fn anchor_id(&self) -> &str {
        match self {
            Self::Anchor { id } => id,
            Self::Sibling { anchor_id, .. } => anchor_id,
        }
    }

    pub fn is_anchor(&self) -> bool {
        matches!(self, Self::Anchor { .. })
    }
}

impl Planner {
    /// Creates an empty planner with the given identity.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            template_id: None,
            lanes: Vec::new(),
        }
    }

    /// Returns whether this planner exists only locally.
    pub fn is_temp(&self) -> bool {
        is_temp_id(&self.id)
    }

    pub fn lane(&self, lane_id: &str) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.id == lane_id)
    }

    pub fn lane_mut(&mut self, lane_id: &str) -> Option<&mut Lane> {
        self.lanes.iter_mut().find(|lane| lane.id == lane_id)
    }

    pub(crate) fn lane_index(&self, lane_id: &str) -> Option<usize> {
        self.lanes.iter().position(|lane| lane.id == lane_id)
    }

    /// Finds a card anywhere on the board.
    ///
    /// Returns `(lane_index, card_index)`.
    pub fn locate_card(&self, card_id: &str) -> Option<(usize, usize)> {
        self.lanes.iter().enumerate().find_map(|(lane_index, lane)| {
            lane.cards
                .iter()
                .position(|card| card.id == card_id)
                .map(|card_index| (lane_index, card_index))
        })
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        let (lane_index, card_index) = self.locate_card(card_id)?;
        self.lanes[lane_index].cards.get(card_index)
    }

    /// Total number of cards across all lanes.
    pub fn card_count(&self) -> usize {
        self.lanes.iter().map(|lane| lane.cards.len()).sum()
    }

    /// Resolves the split-group role of one lane.
    ///
    /// The anchor is the member whose id equals the group key; when no member
    /// carries that id (template-linked groups), the lowest-positioned member
    /// anchors the group.
    pub fn lane_role(&self, lane_id: &str) -> Option<LaneGroupRole> {
        let lane = self.lane(lane_id)?;
        let key = lane.group_key();
        let anchor_id = if self.lane(key).is_some() {
            key.to_string()
        } else {
            self.lanes
                .iter()
                .enumerate()
                .filter(|(_, member)| member.group_key() == key)
                .min_by_key(|(index, member)| (member.position, *index))
                .map(|(_, member)| member.id.clone())
                .unwrap_or_else(|| lane.id.clone())
        };

        if anchor_id == lane.id {
            Some(LaneGroupRole::Anchor {
                id: lane.id.clone(),
            })
        } else {
            Some(LaneGroupRole::Sibling {
                id: lane.id.clone(),
                anchor_id,
            })
        }
    }
}

impl Lane {
    /// Creates a standalone lane with no cards.
    pub fn new(
        id: impl Into<String>,
        planner_id: impl Into<String>,
        title: impl Into<String>,
        position: i64,
    ) -> Self {
        Self {
            id: id.into(),
            planner_id: planner_id.into(),
            template_lane_id: None,
            title: title.into(),
            description: String::new(),
            position,
            color: None,
            cards: Vec::new(),
        }
    }

    /// Returns the id shared by every member of this lane's split group.
    pub fn group_key(&self) -> &str {
        self.template_lane_id.as_deref().unwrap_or(&self.id)
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == card_id)
    }
}

impl Card {
    /// Creates a card with `title`/`content` fields populated.
    pub fn new(
        id: impl Into<String>,
        lane_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        position: i64,
    ) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(CARD_TITLE_FIELD.to_string(), title.into());
        fields.insert(CARD_CONTENT_FIELD.to_string(), content.into());
        Self {
            id: id.into(),
            lane_id: lane_id.into(),
            fields,
            position,
        }
    }

    pub fn title(&self) -> &str {
        self.field(CARD_TITLE_FIELD)
    }

    pub fn content(&self) -> &str {
        self.field(CARD_CONTENT_FIELD)
    }

    /// Returns one field value, or an empty string when absent.
    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }
}
