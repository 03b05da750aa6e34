//! Submission gateway.
//!
//! A submission is two calls: the write, then a read-back of the
//! consolidated responses. The policy is asymmetric:
//!
//! - write fails → [`SubmissionError::Rejected`], nothing advances, retry allowed
//! - read-back fails → [`SubmissionStatus::Partial`], navigation proceeds,
//!   because the authoritative write already landed
//!
//! Only one submission may be outstanding at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use appraisal_core::{EvaluationResponse, MissionId, Responder, WorkflowStep};
use serde::Serialize;

use crate::backend::{
    BackendError, EvaluationBackend, ManagerEvaluationPayload, SelfAssessmentPayload,
};

/// What is being submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    SelfAssessment(SelfAssessmentPayload),
    ManagerEvaluation(ManagerEvaluationPayload),
}

impl Submission {
    pub fn mission_id(&self) -> MissionId {
        match self {
            Submission::SelfAssessment(p) => p.mission_id,
            Submission::ManagerEvaluation(p) => p.mission_id,
        }
    }

    pub fn responder(&self) -> Responder {
        match self {
            Submission::SelfAssessment(_) => Responder::Employee,
            Submission::ManagerEvaluation(_) => Responder::Evaluator,
        }
    }

    pub fn responses(&self) -> &[EvaluationResponse] {
        match self {
            Submission::SelfAssessment(p) => &p.responses,
            Submission::ManagerEvaluation(p) => &p.responses,
        }
    }

    /// Where the user goes once the submission is accepted.
    pub fn redirect(&self) -> Redirect {
        match self {
            Submission::SelfAssessment(_) => Redirect::Step(WorkflowStep::ManagerEvaluation),
            Submission::ManagerEvaluation(_) => Redirect::Listing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    /// Stay in the evaluation and show this step.
    Step(WorkflowStep),
    /// Return to the evaluation listing.
    Listing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Complete,
    /// Written, but the read-back failed. `warning` is meant for the user.
    Partial { warning: String },
}

/// Read-only copy of what was submitted, kept for the summary view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionSnapshot {
    pub mission_id: MissionId,
    pub responder: Responder,
    pub responses: Vec<EvaluationResponse>,
    /// RFC 3339 timestamp of the accepted write.
    pub submitted_at: String,
    /// `true` when `responses` come from the server read-back, `false` when
    /// they are the locally sent copy.
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    #[serde(flatten)]
    pub status: SubmissionStatus,
    pub redirect: Redirect,
    pub snapshot: SubmissionSnapshot,
}

impl SubmissionOutcome {
    pub fn is_partial(&self) -> bool {
        matches!(self.status, SubmissionStatus::Partial { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// Another submission has not resolved yet.
    #[error("a submission is already in progress")]
    InFlight,

    /// The write was refused or never arrived. Safe to retry.
    #[error("submission failed, please retry: {0}")]
    Rejected(#[source] BackendError),
}

/// Sends submissions through a backend, one at a time.
pub struct SubmissionGateway {
    backend: Arc<dyn EvaluationBackend>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the submission resolves or is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SubmissionGateway {
    pub fn new(backend: Arc<dyn EvaluationBackend>) -> Self {
        SubmissionGateway {
            backend,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn submit(
        &self,
        submission: &Submission,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SubmissionError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let mission_id = submission.mission_id();
        let responder = submission.responder();
        tracing::debug!(
            backend = self.backend.backend_id(),
            mission_id,
            %responder,
            responses = submission.responses().len(),
            "submitting"
        );

        let written = match submission {
            Submission::SelfAssessment(p) => self.backend.submit_self_assessment(p).await,
            Submission::ManagerEvaluation(p) => self.backend.submit_manager_evaluation(p).await,
        };
        if let Err(e) = written {
            tracing::warn!(mission_id, %responder, error = %e, "submission rejected");
            return Err(SubmissionError::Rejected(e));
        }
        let submitted_at = now_rfc3339();

        let (status, responses, confirmed) =
            match self.backend.responses(mission_id, responder).await {
                Ok(responses) => (SubmissionStatus::Complete, responses, true),
                Err(e) => {
                    tracing::warn!(
                        mission_id,
                        %responder,
                        error = %e,
                        "read-back failed after submission"
                    );
                    (
                        SubmissionStatus::Partial {
                            warning: format!(
                                "responses were saved but could not be reloaded ({})",
                                e
                            ),
                        },
                        submission.responses().to_vec(),
                        false,
                    )
                }
            };

        Ok(SubmissionOutcome {
            status,
            redirect: submission.redirect(),
            snapshot: SubmissionSnapshot {
                mission_id,
                responder,
                responses,
                submitted_at,
                confirmed,
            },
        })
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;

    fn self_assessment() -> Submission {
        Submission::SelfAssessment(SelfAssessmentPayload {
            mission_id: 1,
            evaluator_id: 2,
            approver_id: 3,
            responses: vec![EvaluationResponse {
                item_id: 1,
                value: 5.into(),
            }],
        })
    }

    #[test]
    fn redirects_by_kind() {
        assert_eq!(
            self_assessment().redirect(),
            Redirect::Step(WorkflowStep::ManagerEvaluation)
        );
        let manager = Submission::ManagerEvaluation(ManagerEvaluationPayload {
            mission_id: 1,
            responses: vec![],
        });
        assert_eq!(manager.redirect(), Redirect::Listing);
        assert_eq!(manager.responder(), Responder::Evaluator);
    }

    #[tokio::test]
    async fn complete_submission_reads_back() {
        let backend = Arc::new(InMemoryBackend::new());
        let gateway = SubmissionGateway::new(backend.clone());

        let outcome = gateway.submit(&self_assessment()).await.unwrap();
        assert_eq!(outcome.status, SubmissionStatus::Complete);
        assert!(outcome.snapshot.confirmed);
        assert_eq!(outcome.snapshot.responses.len(), 1);
        assert!(!gateway.is_in_flight());
    }

    #[tokio::test]
    async fn guard_is_released_after_failure() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_submissions(true);
        let gateway = SubmissionGateway::new(backend.clone());

        let err = gateway.submit(&self_assessment()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Rejected(_)));
        assert!(!gateway.is_in_flight());

        backend.fail_submissions(false);
        assert!(gateway.submit(&self_assessment()).await.is_ok());
    }

    #[test]
    fn outcome_serializes_flat_status() {
        let outcome = SubmissionOutcome {
            status: SubmissionStatus::Partial {
                warning: "reload failed".into(),
            },
            redirect: Redirect::Listing,
            snapshot: SubmissionSnapshot {
                mission_id: 4,
                responder: Responder::Evaluator,
                responses: vec![],
                submitted_at: "2026-01-01T00:00:00Z".into(),
                confirmed: false,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "partial");
        assert_eq!(json["warning"], "reload failed");
        assert_eq!(json["redirect"], "listing");
        assert!(outcome.is_partial());
    }
}
