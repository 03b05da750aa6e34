//! Local validation errors. None of these are ever sent to the server.

use crate::step::WorkflowStep;
use crate::types::GroupId;

/// Refused navigation request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("criteria group {group_id} does not exist")]
    UnknownGroup { group_id: GroupId },
}

/// Refused workflow transition or decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// Evaluator and/or approver not chosen before leaving the self-assessment.
    #[error("select {missing} before submitting the self-assessment")]
    MissingSelection { missing: &'static str },

    /// The action belongs to another step.
    #[error("this action requires step {expected}, evaluation is at step {actual}")]
    WrongStep {
        expected: WorkflowStep,
        actual: WorkflowStep,
    },

    /// Rejection comment under the required length.
    #[error("a rejection comment needs at least {minimum} characters (got {length})")]
    CommentTooShort { length: usize, minimum: usize },

    /// A decision was already issued for this evaluation.
    #[error("a decision has already been issued for this evaluation")]
    AlreadyDecided,
}
