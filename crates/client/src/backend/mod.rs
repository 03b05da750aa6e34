//! Backend abstraction for the evaluation REST surface.
//!
//! [`EvaluationBackend`] covers everything the workflow reads from or writes
//! to the HRIS backend. Two implementations ship with the crate:
//!
//! - [`http::HttpBackend`] -- the real REST API, via `ureq`
//! - [`memory::InMemoryBackend`] -- fixture-seeded, with failure injection

pub mod http;
pub mod memory;

use std::fmt;

use appraisal_core::{
    Assignment, CriteriaGroup, CriteriaItem, Decision, Employee, EmployeeId, EvaluationResponse,
    GroupId, MissionId, Responder, WorkflowStep,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

/// Body of the self-assessment submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfAssessmentPayload {
    pub mission_id: MissionId,
    pub evaluator_id: EmployeeId,
    pub approver_id: EmployeeId,
    pub responses: Vec<EvaluationResponse>,
}

/// Body of the manager evaluation submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerEvaluationPayload {
    pub mission_id: MissionId,
    pub responses: Vec<EvaluationResponse>,
}

/// Server view of where an evaluation stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStatus {
    pub mission_id: MissionId,
    pub step: WorkflowStep,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(flatten)]
    pub assignment: Assignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

// ──────────────────────────────────────────────
// BackendError
// ──────────────────────────────────────────────

/// Errors raised while talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never got a response (DNS, connection, timeout).
    Transport { endpoint: String, message: String },
    /// The backend answered 404.
    NotFound { endpoint: String },
    /// The backend answered with another non-success status.
    Status { endpoint: String, status: u16 },
    /// The response body could not be decoded.
    Decode { endpoint: String, message: String },
    /// Missing or invalid client configuration.
    Config { message: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transport { endpoint, message } => {
                write!(f, "request to '{}' failed: {}", endpoint, message)
            }
            BackendError::NotFound { endpoint } => {
                write!(f, "'{}' not found", endpoint)
            }
            BackendError::Status { endpoint, status } => {
                write!(f, "'{}' answered with status {}", endpoint, status)
            }
            BackendError::Decode { endpoint, message } => {
                write!(
                    f,
                    "could not decode response from '{}': {}",
                    endpoint, message
                )
            }
            BackendError::Config { message } => {
                write!(f, "backend config error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

// ──────────────────────────────────────────────
// EvaluationBackend trait
// ──────────────────────────────────────────────

/// The HRIS endpoints the evaluation workflow depends on.
#[async_trait]
pub trait EvaluationBackend: Send + Sync {
    async fn criteria_groups(&self) -> Result<Vec<CriteriaGroup>, BackendError>;

    async fn criteria_items(&self, group_id: GroupId) -> Result<Vec<CriteriaItem>, BackendError>;

    async fn employees(&self) -> Result<Vec<Employee>, BackendError>;

    /// Current server-side state of an evaluation. `NotFound` for an
    /// evaluation that was never submitted.
    async fn evaluation_status(&self, mission_id: MissionId)
        -> Result<EvaluationStatus, BackendError>;

    /// Consolidated responses of one responder, as persisted.
    async fn responses(
        &self,
        mission_id: MissionId,
        responder: Responder,
    ) -> Result<Vec<EvaluationResponse>, BackendError>;

    async fn submit_self_assessment(
        &self,
        payload: &SelfAssessmentPayload,
    ) -> Result<(), BackendError>;

    async fn submit_manager_evaluation(
        &self,
        payload: &ManagerEvaluationPayload,
    ) -> Result<(), BackendError>;

    async fn submit_decision(
        &self,
        mission_id: MissionId,
        decision: &Decision,
    ) -> Result<(), BackendError>;

    /// Short identifier used in logs (e.g. "http", "memory").
    fn backend_id(&self) -> &str;
}
