//! Local markdown export/import for planners.
//!
//! # Responsibility
//! - Render a planner as markdown when the backend exporter is unavailable
//!   (temp planners, offline).
//! - Parse markdown back into a local-only planner.
//!
//! # Invariants
//! - Export follows visible lane order and card positions.
//! - Import mints `temp-` ids for the planner, every lane and every card.
//! - `import(export(p))` keeps lane titles, lane descriptions, card titles,
//!   card contents and their order.
//!
//! Format:
//!
//! ```text
//! # Planner title
//!
//! > Planner description
//!
//! ## Lane title
//! > Lane description
//!
//! - Card title
//!   content line
//! ```
//!
//! Descriptions are always quoted and card content is always indented, so
//! their lines never read back as headings or items. A card title starting
//! with `[` or `\` is escaped with a leading backslash so it is not taken
//! for a checkbox marker.

use crate::engine::ordering::visible_lane_order;
use crate::model::planner::{temp_card_id, temp_lane_id, temp_planner_id, Card, Lane, Planner};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Title used when the document has no `# ` heading.
pub const DEFAULT_IMPORT_TITLE: &str = "Imported planner";

const CONTENT_INDENT: &str = "  ";
const TITLE_ESCAPE: char = '\\';

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,2})(?:\s+(.*?))?\s*$").expect("valid heading regex"));
static CARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-*+]\s+(?:\[[ xX]\]\s+)?(.*?)\s*$").expect("valid card item regex")
});
static QUOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s?(.*)$").expect("valid quote regex"));

/// Markdown parse failures. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownError {
    /// Input is blank.
    Empty,
    /// A `- card` item appears before any `## lane` heading.
    CardOutsideLane { line: usize },
    BlankLaneTitle { line: usize },
    BlankCardTitle { line: usize },
}

impl Display for MarkdownError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "markdown document is empty"),
            Self::CardOutsideLane { line } => {
                write!(f, "line {line}: card item appears before any lane heading")
            }
            Self::BlankLaneTitle { line } => write!(f, "line {line}: lane title must not be blank"),
            Self::BlankCardTitle { line } => write!(f, "line {line}: card title must not be blank"),
        }
    }
}

impl Error for MarkdownError {}

/// Renders `planner` as markdown.
pub fn export_planner_markdown(planner: &Planner) -> String {
    let mut out = format!("# {}\n", single_line(&planner.title));
    let description = planner.description.trim();
    if !description.is_empty() {
        out.push('\n');
        push_quoted(&mut out, description);
    }

    for lane_id in visible_lane_order(planner) {
        let Some(lane) = planner.lane(&lane_id) else {
            continue;
        };
        out.push_str(&format!("\n## {}\n", single_line(&lane.title)));
        if !lane.description.is_empty() {
            push_quoted(&mut out, &lane.description);
        }
        if !lane.cards.is_empty() {
            out.push('\n');
        }
        for card in &lane.cards {
            out.push_str(&format!("- {}\n", escape_card_title(&single_line(card.title()))));
            if !card.content().is_empty() {
                for line in card.content().split('\n') {
                    out.push_str(&format!("{CONTENT_INDENT}{line}\n"));
                }
            }
        }
    }
    out
}

#[derive(Debug, Default)]
struct ParsedLane {
    title: String,
    description: Vec<String>,
    cards: Vec<ParsedCard>,
}

#[derive(Debug)]
struct ParsedCard {
    title: String,
    content: Vec<String>,
}

/// Parses markdown into a local-only planner.
///
/// `- [ ]`/`- [x]` checkbox markers are stripped from card titles. A single
/// leading backslash on a card title is dropped.
///
/// # Errors
/// - `MarkdownError::Empty` for blank input.
/// - `MarkdownError::CardOutsideLane` when a card precedes every lane.
/// - `MarkdownError::BlankLaneTitle` / `BlankCardTitle` for empty headings
///   or items.
pub fn import_planner_from_markdown(
    markdown: &str,
    template_id: Option<&str>,
) -> Result<Planner, MarkdownError> {
    if markdown.trim().is_empty() {
        return Err(MarkdownError::Empty);
    }

    let mut title: Option<String> = None;
    let mut description: Vec<String> = Vec::new();
    let mut lanes: Vec<ParsedLane> = Vec::new();
    let mut card_open = false;

    for (index, raw) in markdown.lines().enumerate() {
        let line = index + 1;

        if card_open {
            if let Some(content) = raw.strip_prefix(CONTENT_INDENT) {
                if let Some(card) = lanes.last_mut().and_then(|lane| lane.cards.last_mut()) {
                    card.content.push(content.to_string());
                }
                continue;
            }
        }

        if raw.trim().is_empty() {
            if lanes.is_empty() && title.is_some() {
                description.push(String::new());
            }
            continue;
        }

        if let Some(caps) = HEADING_RE.captures(raw) {
            let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            match caps[1].len() {
                1 if title.is_none() && lanes.is_empty() => {
                    if !text.is_empty() {
                        title = Some(text.to_string());
                    }
                    continue;
                }
                2 => {
                    if text.is_empty() {
                        return Err(MarkdownError::BlankLaneTitle { line });
                    }
                    lanes.push(ParsedLane {
                        title: text.to_string(),
                        ..ParsedLane::default()
                    });
                    card_open = false;
                    continue;
                }
                _ => {}
            }
        }

        if let Some(caps) = CARD_RE.captures(raw) {
            let Some(lane) = lanes.last_mut() else {
                return Err(MarkdownError::CardOutsideLane { line });
            };
            let card_title = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let card_title = card_title.strip_prefix(TITLE_ESCAPE).unwrap_or(card_title);
            if card_title.is_empty() {
                return Err(MarkdownError::BlankCardTitle { line });
            }
            lane.cards.push(ParsedCard {
                title: card_title.to_string(),
                content: Vec::new(),
            });
            card_open = true;
            continue;
        }

        let quoted = QUOTE_RE
            .captures(raw)
            .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()));
        match lanes.last_mut() {
            None => description.push(quoted.unwrap_or_else(|| raw.trim_end().to_string())),
            Some(lane) => match (quoted, lane.cards.last_mut()) {
                (Some(text), _) => lane.description.push(text),
                (None, Some(card)) if card_open => card.content.push(raw.trim_end().to_string()),
                (None, _) => lane.description.push(raw.trim_end().to_string()),
            },
        }
    }

    let planner = build_planner(title, description, lanes, template_id);
    info!(
        "event=markdown_import module=markdown status=ok mode=local lanes={} cards={}",
        planner.lanes.len(),
        planner.card_count()
    );
    Ok(planner)
}

fn build_planner(
    title: Option<String>,
    description: Vec<String>,
    lanes: Vec<ParsedLane>,
    template_id: Option<&str>,
) -> Planner {
    let planner_id = temp_planner_id();
    let mut planner = Planner::new(
        planner_id.clone(),
        title.unwrap_or_else(|| DEFAULT_IMPORT_TITLE.to_string()),
    );
    planner.description = description.join("\n").trim_matches('\n').to_string();
    planner.template_id = template_id
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    for (position, parsed) in lanes.into_iter().enumerate() {
        let lane_id = temp_lane_id();
        let mut lane = Lane::new(lane_id.clone(), planner_id.clone(), parsed.title, position as i64);
        lane.description = parsed.description.join("\n");
        for (card_position, card) in parsed.cards.into_iter().enumerate() {
            lane.cards.push(Card::new(
                temp_card_id(),
                lane_id.clone(),
                card.title,
                card.content.join("\n"),
                card_position as i64,
            ));
        }
        planner.lanes.push(lane);
    }
    planner
}

fn push_quoted(out: &mut String, text: &str) {
    for line in text.split('\n') {
        if line.is_empty() {
            out.push_str(">\n");
        } else {
            out.push_str(&format!("> {line}\n"));
        }
    }
}

fn escape_card_title(title: &str) -> String {
    if title.starts_with('[') || title.starts_with(TITLE_ESCAPE) {
        format!("{TITLE_ESCAPE}{title}")
    } else {
        title.to_string()
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{export_planner_markdown, import_planner_from_markdown, MarkdownError};
    use crate::model::planner::{Card, Lane, Planner};

    fn sample() -> Planner {
        let mut planner = Planner::new("p1", "Release");
        planner.description = "Ship it.".to_string();
        let mut todo = Lane::new("todo", "p1", "To Do", 0);
        todo.description = "Incoming\n\nwork".to_string();
        todo.cards
            .push(Card::new("c1", "todo", "Write notes", "first\n\n  indented", 0));
        todo.cards.push(Card::new("c2", "todo", "Tag build", "", 1));
        planner.lanes.push(todo);
        planner.lanes.push(Lane::new("done", "p1", "Done", 1));
        planner
    }

    #[test]
    fn export_renders_headings_quotes_and_indented_content() {
        let markdown = export_planner_markdown(&sample());
        let expected = "# Release\n\n> Ship it.\n\n## To Do\n> Incoming\n>\n> work\n\n- Write notes\n  first\n  \n    indented\n- Tag build\n\n## Done\n";
        assert_eq!(markdown, expected);
    }

    #[test]
    fn import_restores_exported_structure() {
        let source = sample();
        let planner =
            import_planner_from_markdown(&export_planner_markdown(&source), Some("kanban")).unwrap();

        assert!(planner.is_temp());
        assert_eq!(planner.title, "Release");
        assert_eq!(planner.description, "Ship it.");
        assert_eq!(planner.template_id.as_deref(), Some("kanban"));
        assert_eq!(planner.lanes.len(), 2);
        let todo = &planner.lanes[0];
        assert!(todo.id.starts_with("temp-lane-"));
        assert_eq!(todo.description, "Incoming\n\nwork");
        assert_eq!(todo.cards[0].title(), "Write notes");
        assert_eq!(todo.cards[0].content(), "first\n\n  indented");
        assert_eq!(todo.cards[0].lane_id, todo.id);
        assert_eq!(todo.cards[1].position, 1);
    }

    #[test]
    fn import_accepts_checkboxes_and_missing_title() {
        let planner = import_planner_from_markdown("## Backlog\n- [ ] Triage\n- [x] Done item\n", None).unwrap();
        assert_eq!(planner.title, "Imported planner");
        let titles: Vec<&str> = planner.lanes[0].cards.iter().map(|card| card.title()).collect();
        assert_eq!(titles, vec!["Triage", "Done item"]);
    }

    #[test]
    fn round_trip_keeps_item_like_descriptions_and_bracketed_titles() {
        let mut source = Planner::new("p1", "Launch");
        source.description = "Goals:\n- ship v1\n## Notes".to_string();
        let mut todo = Lane::new("todo", "p1", "Todo", 0);
        todo.cards.push(Card::new("c1", "todo", "[x] Done thing", "", 0));
        todo.cards.push(Card::new("c2", "todo", "\\raw", "- nested\n## not a lane", 1));
        source.lanes.push(todo);

        let markdown = export_planner_markdown(&source);
        let planner = import_planner_from_markdown(&markdown, None).unwrap();

        assert_eq!(planner.description, "Goals:\n- ship v1\n## Notes");
        let titles: Vec<&str> = planner.lanes.iter().map(|lane| lane.title.as_str()).collect();
        assert_eq!(titles, vec!["Todo"]);
        let cards = &planner.lanes[0].cards;
        assert_eq!(cards[0].title(), "[x] Done thing");
        assert_eq!(cards[1].title(), "\\raw");
        assert_eq!(cards[1].content(), "- nested\n## not a lane");
    }

    #[test]
    fn import_rejects_malformed_documents() {
        assert_eq!(import_planner_from_markdown("  \n", None), Err(MarkdownError::Empty));
        assert_eq!(
            import_planner_from_markdown("# Board\n- orphan\n", None),
            Err(MarkdownError::CardOutsideLane { line: 2 })
        );
        assert_eq!(
            import_planner_from_markdown("# Board\n##\n", None),
            Err(MarkdownError::BlankLaneTitle { line: 2 })
        );
    }
}
