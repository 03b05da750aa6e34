use appraisal_core::{ItemId, NavigationError, StepError, WorkflowStep};

use crate::backend::BackendError;
use crate::gateway::SubmissionError;

/// Errors surfaced by an [`EvaluationSession`](crate::EvaluationSession).
///
/// Validation variants are local and never reach the server; the session
/// stays on its current step whatever the error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Nobody may edit responses at this step.
    #[error("responses are read-only at step {step}")]
    ReadOnly { step: WorkflowStep },

    /// The item is not part of any loaded criteria group.
    #[error("criteria item {item_id} is not loaded in this evaluation")]
    UnknownItem { item_id: ItemId },

    /// The chosen person cannot take that role.
    #[error("employee {employee_id} cannot be selected as {role}")]
    InvalidSelection {
        employee_id: i64,
        role: &'static str,
    },
}
