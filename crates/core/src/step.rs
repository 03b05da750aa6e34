//! Workflow step state machine.
//!
//! ```text
//! SelfAssessment (1) ──submit──▶ ManagerEvaluation (2) ──server──▶ FinalValidation (3)
//! ```
//!
//! The step only ever moves forward. Leaving step 1 is a client transition
//! gated on the evaluator/approver selection; reaching step 3 is observed
//! from server data. At step 3 the approver issues a terminal [`Decision`].
//! A rejection sends the evaluation back to the manager on the server side;
//! the client step is left untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::types::{Assignment, EmployeeId};

/// Minimum length of a rejection comment, in characters.
pub const REJECT_COMMENT_MIN_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WorkflowStep {
    SelfAssessment = 1,
    ManagerEvaluation = 2,
    FinalValidation = 3,
}

impl WorkflowStep {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkflowStep::SelfAssessment => "self-assessment",
            WorkflowStep::ManagerEvaluation => "manager evaluation",
            WorkflowStep::FinalValidation => "final validation",
        }
    }
}

impl TryFrom<u8> for WorkflowStep {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(WorkflowStep::SelfAssessment),
            2 => Ok(WorkflowStep::ManagerEvaluation),
            3 => Ok(WorkflowStep::FinalValidation),
            other => Err(format!(
                "invalid workflow step {}, expected 1, 2 or 3",
                other
            )),
        }
    }
}

impl From<WorkflowStep> for u8 {
    fn from(step: WorkflowStep) -> u8 {
        step.number()
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Terminal approver decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject { comment: String },
}

impl Decision {
    /// Check the decision's own input requirements.
    pub fn validate(&self) -> Result<(), StepError> {
        match self {
            Decision::Approve => Ok(()),
            Decision::Reject { comment } => {
                let length = comment.chars().count();
                if length < REJECT_COMMENT_MIN_CHARS {
                    return Err(StepError::CommentTooShort {
                        length,
                        minimum: REJECT_COMMENT_MIN_CHARS,
                    });
                }
                Ok(())
            }
        }
    }
}

/// Owns the active step of one evaluation instance.
#[derive(Debug, Clone)]
pub struct StepController {
    step: WorkflowStep,
    decision: Option<Decision>,
}

impl Default for StepController {
    fn default() -> Self {
        Self::new()
    }
}

impl StepController {
    pub fn new() -> Self {
        StepController {
            step: WorkflowStep::SelfAssessment,
            decision: None,
        }
    }

    /// Resume at a step already reached on the server.
    pub fn at(step: WorkflowStep) -> Self {
        StepController {
            step,
            decision: None,
        }
    }

    /// Resume with a decision the server already holds. The decision is
    /// only kept at step 3; a rejected evaluation is back at step 2.
    pub fn resume(step: WorkflowStep, decision: Option<Decision>) -> Self {
        StepController {
            step,
            decision: decision.filter(|_| step == WorkflowStep::FinalValidation),
        }
    }

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    /// Check that the self-assessment may be submitted, without changing
    /// state. Returns the selected `(evaluator, approver)` pair.
    pub fn check_submission(
        &self,
        assignment: &Assignment,
    ) -> Result<(EmployeeId, EmployeeId), StepError> {
        self.require(WorkflowStep::SelfAssessment)?;
        let missing = match (assignment.evaluator_id, assignment.approver_id) {
            (Some(evaluator), Some(approver)) => return Ok((evaluator, approver)),
            (None, Some(_)) => "an evaluator",
            (Some(_), None) => "an approver",
            (None, None) => "an evaluator and an approver",
        };
        Err(StepError::MissingSelection { missing })
    }

    /// Transition 1 → 2. Refused, with no state change, unless both the
    /// evaluator and the approver are selected.
    pub fn complete_self_assessment(
        &mut self,
        assignment: &Assignment,
    ) -> Result<WorkflowStep, StepError> {
        self.check_submission(assignment)?;
        self.step = WorkflowStep::ManagerEvaluation;
        Ok(self.step)
    }

    /// Align with the step reported by the server. Only forward moves are
    /// applied; returns whether the step changed.
    pub fn sync(&mut self, observed: WorkflowStep) -> bool {
        if observed > self.step {
            self.step = observed;
            true
        } else {
            false
        }
    }

    /// Adopt a decision already held by the server, e.g. one issued from
    /// another session. Only applies at step 3 when no decision is held
    /// yet; returns whether it was recorded.
    pub fn observe_decision(&mut self, decision: Option<Decision>) -> bool {
        if self.step != WorkflowStep::FinalValidation || self.decision.is_some() {
            return false;
        }
        match decision {
            Some(decision) => {
                self.decision = Some(decision);
                true
            }
            None => false,
        }
    }

    /// Check a decision without recording it.
    pub fn check_decision(&self, decision: &Decision) -> Result<(), StepError> {
        self.require(WorkflowStep::FinalValidation)?;
        if self.decision.is_some() {
            return Err(StepError::AlreadyDecided);
        }
        decision.validate()
    }

    /// Record the approver's decision. Only valid once, at step 3.
    pub fn decide(&mut self, decision: Decision) -> Result<&Decision, StepError> {
        self.check_decision(&decision)?;
        Ok(self.decision.insert(decision))
    }

    fn require(&self, expected: WorkflowStep) -> Result<(), StepError> {
        if self.step != expected {
            return Err(StepError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }
}
