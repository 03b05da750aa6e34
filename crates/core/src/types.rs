//! Domain types shared by every layer of the evaluation workflow.
//!
//! Criteria groups and items are created by the backend and are read-only
//! here. Responses are plain JSON scalars keyed by item id; their meaning
//! depends on the [`ItemType`] of the item they answer.

use std::fmt;

use serde::{Deserialize, Serialize};

pub type GroupId = i64;
pub type ItemId = i64;
pub type EmployeeId = i64;
pub type MissionId = i64;

// ──────────────────────────────────────────────
// Criteria
// ──────────────────────────────────────────────

/// A named bucket of criteria shown together as one navigable page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaGroup {
    pub id: GroupId,
    pub name: String,
}

/// Response type of a criteria item.
///
/// Type strings the client does not know deserialize to [`ItemType::Unknown`]
/// so that a single new backend type does not fail the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Numeric,
    Observation,
    Boolean,
    #[serde(other)]
    Unknown,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Numeric => "numeric",
            ItemType::Observation => "observation",
            ItemType::Boolean => "boolean",
            ItemType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single evaluation question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub label: String,
    pub group_id: GroupId,
}

// ──────────────────────────────────────────────
// Responses
// ──────────────────────────────────────────────

/// Literal token for an affirmative boolean answer.
pub const YES: &str = "oui";
/// Literal token for a negative boolean answer.
pub const NO: &str = "non";

/// Raw value of a response as exchanged with the backend.
///
/// Ratings are integers on the wire. A fractional number still
/// deserializes, as [`ResponseValue::Decimal`], so one bad answer does not
/// fail the whole response set; it is never a valid rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl ResponseValue {
    /// Integer reading of the value. Strings are parsed after trimming;
    /// decimals count only when they have no fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ResponseValue::Integer(n) => Some(*n),
            ResponseValue::Decimal(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            ResponseValue::Text(s) => s.trim().parse::<i64>().ok(),
            ResponseValue::Decimal(_) | ResponseValue::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ResponseValue {
    fn from(s: &str) -> Self {
        ResponseValue::Text(s.to_string())
    }
}

impl From<String> for ResponseValue {
    fn from(s: String) -> Self {
        ResponseValue::Text(s)
    }
}

impl From<i32> for ResponseValue {
    fn from(n: i32) -> Self {
        ResponseValue::Integer(i64::from(n))
    }
}

impl From<i64> for ResponseValue {
    fn from(n: i64) -> Self {
        ResponseValue::Integer(n)
    }
}

impl From<f64> for ResponseValue {
    fn from(n: f64) -> Self {
        ResponseValue::Decimal(n)
    }
}

impl From<bool> for ResponseValue {
    fn from(b: bool) -> Self {
        ResponseValue::Bool(b)
    }
}

impl fmt::Display for ResponseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseValue::Bool(b) => write!(f, "{}", b),
            ResponseValue::Integer(n) => write!(f, "{}", n),
            ResponseValue::Decimal(n) => write!(f, "{}", n),
            ResponseValue::Text(s) => f.write_str(s),
        }
    }
}

/// One answer to one criteria item, as sent to and read back from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub item_id: ItemId,
    pub value: ResponseValue,
}

/// Whose answers a response set holds. Sets are never shared between responders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Responder {
    Employee,
    Evaluator,
}

impl fmt::Display for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Responder::Employee => f.write_str("employee"),
            Responder::Evaluator => f.write_str("evaluator"),
        }
    }
}

// ──────────────────────────────────────────────
// People
// ──────────────────────────────────────────────

/// Directory entry used to pick an evaluator and an approver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Evaluator and approver chosen during the self-assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub evaluator_id: Option<EmployeeId>,
    pub approver_id: Option<EmployeeId>,
}
