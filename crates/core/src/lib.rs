//! appraisal-core: domain model of the multi-step evaluation workflow.
//!
//! Everything here is synchronous and free of I/O. The client crate wires
//! these pieces to a backend and owns them in an evaluation session.
//!
//! # Public API
//!
//! - [`ResponseStore`] -- one responder's answers, keyed by item
//! - [`validate::is_valid`] -- per-type response validation
//! - [`CompletionTracker`] -- per-group completion flags
//! - [`CriteriaNavigator`] -- active group and progress
//! - [`StepController`] -- workflow step state machine and decisions
//! - [`render`] -- tagged-variant widgets, group tabs, summary rows

pub mod completion;
pub mod error;
pub mod navigator;
pub mod render;
pub mod step;
pub mod store;
pub mod types;
pub mod validate;

// ── Convenience re-exports ───────────────────────────────────────────

pub use completion::CompletionTracker;
pub use error::{NavigationError, StepError};
pub use navigator::CriteriaNavigator;
pub use render::{GroupTab, ItemView, RenderMode, SummaryRow, Widget};
pub use step::{Decision, StepController, WorkflowStep};
pub use store::ResponseStore;
pub use types::{
    Assignment, CriteriaGroup, CriteriaItem, Employee, EmployeeId, EvaluationResponse, GroupId,
    ItemId, ItemType, MissionId, Responder, ResponseValue,
};
