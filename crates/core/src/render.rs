//! Presentation layer: maps criteria items to input widgets.
//!
//! Rendering is one exhaustive `match` over [`ItemType`], so a new item
//! type cannot be added without deciding how it is shown. Widgets are plain
//! data; their `Display` impls give the terminal rendering.

use std::fmt;

use serde::Serialize;

use crate::completion::CompletionTracker;
use crate::navigator::CriteriaNavigator;
use crate::store::ResponseStore;
use crate::types::{CriteriaItem, GroupId, ItemId, ItemType, ResponseValue, NO, YES};
use crate::validate::{self, is_valid, ObservationFeedback, RATING_MAX};

/// Positions of the star rating control.
const STARS: u8 = RATING_MAX as u8;

/// Whether the widget accepts input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    Editable,
    /// Used to show one responder's answers inside another responder's view.
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Oui,
    Non,
}

/// One input control bound to a response value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    /// Five-position discrete rating.
    StarRating {
        rating: Option<u8>,
        stars: u8,
        mode: RenderMode,
    },
    /// Two-way exclusive choice between `oui` and `non`.
    BinaryChoice {
        choice: Option<Choice>,
        mode: RenderMode,
    },
    /// Free text with live character count against the observation floor.
    FreeText {
        text: String,
        count: usize,
        minimum: usize,
        mode: RenderMode,
    },
    /// Item type this client cannot render.
    Unsupported { mode: RenderMode },
}

impl Widget {
    pub fn mode(&self) -> RenderMode {
        match self {
            Widget::StarRating { mode, .. }
            | Widget::BinaryChoice { mode, .. }
            | Widget::FreeText { mode, .. }
            | Widget::Unsupported { mode } => *mode,
        }
    }
}

/// Build the widget for `item`, bound to `value`.
pub fn widget_for(item_type: ItemType, value: Option<&ResponseValue>, mode: RenderMode) -> Widget {
    match item_type {
        ItemType::Numeric => Widget::StarRating {
            rating: value
                .filter(|v| is_valid(v, ItemType::Numeric))
                .and_then(ResponseValue::as_integer)
                .and_then(|n| u8::try_from(n).ok()),
            stars: STARS,
            mode,
        },
        ItemType::Boolean => Widget::BinaryChoice {
            choice: match value.and_then(ResponseValue::as_text) {
                Some(YES) => Some(Choice::Oui),
                Some(NO) => Some(Choice::Non),
                _ => None,
            },
            mode,
        },
        ItemType::Observation => {
            let ObservationFeedback { count, minimum, .. } = validate::observation_feedback(value);
            Widget::FreeText {
                text: value
                    .and_then(ResponseValue::as_text)
                    .unwrap_or_default()
                    .to_string(),
                count,
                minimum,
                mode,
            }
        }
        ItemType::Unknown => Widget::Unsupported { mode },
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Widget::StarRating { rating, stars, .. } => {
                let filled = rating.unwrap_or(0).min(*stars);
                for i in 0..*stars {
                    f.write_str(if i < filled { "★" } else { "☆" })?;
                }
                match rating {
                    Some(r) => write!(f, " {}/{}", r, stars),
                    None => write!(f, " -/{}", stars),
                }
            }
            Widget::BinaryChoice { choice, .. } => {
                let mark = |c: Choice| if *choice == Some(c) { "(•)" } else { "( )" };
                write!(f, "{} oui  {} non", mark(Choice::Oui), mark(Choice::Non))
            }
            Widget::FreeText {
                text,
                count,
                minimum,
                ..
            } => {
                if text.is_empty() {
                    f.write_str("<empty>")?;
                } else {
                    write!(f, "\"{}\"", text)?;
                }
                if count >= minimum {
                    write!(f, " [{}/{} ✓]", count, minimum)
                } else {
                    write!(f, " [{}/{}, {} more]", count, minimum, minimum - count)
                }
            }
            Widget::Unsupported { .. } => f.write_str("<unsupported item type>"),
        }
    }
}

/// A criteria item together with its widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub item_id: ItemId,
    pub label: String,
    pub valid: bool,
    pub widget: Widget,
}

pub fn render_item(
    item: &CriteriaItem,
    value: Option<&ResponseValue>,
    mode: RenderMode,
) -> ItemView {
    ItemView {
        item_id: item.id,
        label: item.label.clone(),
        valid: validate::is_answered(value, item.item_type),
        widget: widget_for(item.item_type, value, mode),
    }
}

/// Render every item of a group against one responder's store.
pub fn render_group(
    items: &[CriteriaItem],
    store: &ResponseStore,
    mode: RenderMode,
) -> Vec<ItemView> {
    items
        .iter()
        .map(|item| render_item(item, store.get(item.id), mode))
        .collect()
}

impl fmt::Display for ItemView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.valid { " " } else { "!" };
        write!(
            f,
            "{} #{} {}: {}",
            flag, self.item_id, self.label, self.widget
        )?;
        if self.widget.mode() == RenderMode::ReadOnly {
            f.write_str(" (locked)")?;
        }
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Group tabs
// ──────────────────────────────────────────────

/// Navigation tab for one criteria group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTab {
    pub group_id: GroupId,
    pub name: String,
    pub active: bool,
    /// Shown until the group is known to be complete.
    pub warning: bool,
}

pub fn group_tabs(navigator: &CriteriaNavigator, completion: &CompletionTracker) -> Vec<GroupTab> {
    navigator
        .groups()
        .iter()
        .enumerate()
        .map(|(i, g)| GroupTab {
            group_id: g.id,
            name: g.name.clone(),
            active: i == navigator.current_index(),
            warning: completion.is_complete(g.id) != Some(true),
        })
        .collect()
}

impl fmt::Display for GroupTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = if self.active { ("[", "]") } else { (" ", " ") };
        write!(f, "{}{}{}", open, self.name, close)?;
        if self.warning {
            f.write_str(" ⚠")?;
        }
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Final validation summary
// ──────────────────────────────────────────────

/// Employee and evaluator answers to the same item, side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub item_id: ItemId,
    pub group_id: GroupId,
    pub label: String,
    pub employee: Widget,
    pub evaluator: Widget,
}

/// Read-only comparison of both response sets.
pub fn summary_rows(
    items: &[CriteriaItem],
    employee: &ResponseStore,
    evaluator: &ResponseStore,
) -> Vec<SummaryRow> {
    items
        .iter()
        .map(|item| SummaryRow {
            item_id: item.id,
            group_id: item.group_id,
            label: item.label.clone(),
            employee: widget_for(item.item_type, employee.get(item.id), RenderMode::ReadOnly),
            evaluator: widget_for(item.item_type, evaluator.get(item.id), RenderMode::ReadOnly),
        })
        .collect()
}

/// Mean of the valid numeric ratings in `store`, if any.
pub fn average_rating(items: &[CriteriaItem], store: &ResponseStore) -> Option<f64> {
    let ratings: Vec<f64> = items
        .iter()
        .filter(|item| item.item_type == ItemType::Numeric)
        .filter_map(|item| store.get(item.id))
        .filter(|v| is_valid(v, ItemType::Numeric))
        .filter_map(ResponseValue::as_integer)
        .map(|n| n as f64)
        .collect();
    if ratings.is_empty() {
        return None;
    }
    Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
}
