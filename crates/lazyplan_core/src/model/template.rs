//! Planner templates: predefined lane sets for new boards.
//!
//! # Responsibility
//! - Describe backend-provided templates on the wire.
//! - Ship built-in `kanban`/`scrum` templates for offline creation.
//!
//! # Invariants
//! - Template lanes are instantiated in ascending `position` order.

use crate::model::planner::{temp_lane_id, Lane, Planner};
use serde::{Deserialize, Serialize};

/// Board flavour a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    Kanban,
    Scrum,
    #[serde(other)]
    Custom,
}

impl PlannerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kanban => "kanban",
            Self::Scrum => "scrum",
            Self::Custom => "custom",
        }
    }
}

/// One predefined lane in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLane {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub color: Option<String>,
}

/// Template as returned by `GET /planner/templates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: PlannerKind,
    #[serde(default)]
    pub lanes: Vec<TemplateLane>,
}

fn default_kind() -> PlannerKind {
    PlannerKind::Custom
}

impl PlannerTemplate {
    /// Built-in kanban board: To Do / In Progress / Done.
    pub fn kanban() -> Self {
        Self {
            id: "kanban".to_string(),
            name: "Kanban".to_string(),
            description: "Visualize work as it flows from idea to done.".to_string(),
            kind: PlannerKind::Kanban,
            lanes: vec![
                template_lane("kanban-todo", "To Do", "Work that has not started", 0, "#94a3b8"),
                template_lane("kanban-doing", "In Progress", "Work being done now", 1, "#3b82f6"),
                template_lane("kanban-done", "Done", "Finished work", 2, "#22c55e"),
            ],
        }
    }

    /// Built-in scrum board with backlog, sprint and review lanes.
    pub fn scrum() -> Self {
        Self {
            id: "scrum".to_string(),
            name: "Scrum".to_string(),
            description: "Plan sprints and track them through review.".to_string(),
            kind: PlannerKind::Scrum,
            lanes: vec![
                template_lane("scrum-backlog", "Product Backlog", "Everything wanted", 0, "#94a3b8"),
                template_lane("scrum-sprint", "Sprint Backlog", "Committed this sprint", 1, "#a855f7"),
                template_lane("scrum-doing", "In Progress", "Being worked on", 2, "#3b82f6"),
                template_lane("scrum-review", "Review", "Awaiting review", 3, "#f59e0b"),
                template_lane("scrum-done", "Done", "Accepted work", 4, "#22c55e"),
            ],
        }
    }

    /// Returns every built-in template.
    pub fn builtins() -> Vec<Self> {
        vec![Self::kanban(), Self::scrum()]
    }

    /// Looks a built-in template up by id or kind name.
    pub fn builtin(id: &str) -> Option<Self> {
        let normalized = id.trim().to_ascii_lowercase();
        Self::builtins()
            .into_iter()
            .find(|template| template.id == normalized || template.kind.as_str() == normalized)
    }

    /// Instantiates a local planner from this template.
    ///
    /// Lanes get fresh `temp-lane-` ids and are standalone anchors.
    pub fn instantiate(
        &self,
        planner_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Planner {
        let planner_id = planner_id.into();
        let mut template_lanes = self.lanes.clone();
        template_lanes.sort_by_key(|lane| lane.position);

        let lanes = template_lanes
            .into_iter()
            .enumerate()
            .map(|(index, template_lane)| {
                let mut lane = Lane::new(
                    temp_lane_id(),
                    planner_id.clone(),
                    template_lane.title,
                    index as i64,
                );
                lane.description = template_lane.description;
                lane.color = template_lane.color;
                lane
            })
            .collect();

        Planner {
            id: planner_id,
            title: title.into(),
            description: description.into(),
            template_id: Some(self.id.clone()),
            lanes,
        }
    }
}

fn template_lane(id: &str, title: &str, description: &str, position: i64, color: &str) -> TemplateLane {
    TemplateLane {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        position,
        color: Some(color.to_string()),
    }
}
