//! End-to-end workflow tests against the in-memory backend.

use std::sync::Arc;

use appraisal_client::{
    BackendError, EvaluationBackend, EvaluationSession, EvaluationStatus, Fixture,
    InMemoryBackend, ManagerEvaluationPayload, Redirect, SelfAssessmentPayload, SessionError,
    SessionOptions, Submission, SubmissionError, SubmissionGateway, SubmissionStatus,
};
use appraisal_core::{
    CriteriaGroup, CriteriaItem, Decision, Employee, EvaluationResponse, GroupId, ItemType,
    MissionId, Responder, ResponseValue, StepError, WorkflowStep,
};
use async_trait::async_trait;

const MISSION: MissionId = 77;
const EMPLOYEE: i64 = 1;

fn item(id: i64, item_type: ItemType, group_id: GroupId) -> CriteriaItem {
    CriteriaItem {
        id,
        item_type,
        label: format!("critère {id}"),
        group_id,
    }
}

fn fixture() -> Fixture {
    Fixture {
        groups: vec![
            CriteriaGroup {
                id: 1,
                name: "Savoir-être".into(),
            },
            CriteriaGroup {
                id: 2,
                name: "Savoir-faire".into(),
            },
            CriteriaGroup {
                id: 3,
                name: "Objectifs".into(),
            },
        ],
        items: vec![
            item(11, ItemType::Numeric, 1),
            item(12, ItemType::Boolean, 1),
            item(13, ItemType::Observation, 1),
            item(21, ItemType::Numeric, 2),
            item(31, ItemType::Boolean, 3),
        ],
        employees: vec![
            Employee {
                id: EMPLOYEE,
                name: "Amina".into(),
                position: None,
            },
            Employee {
                id: 2,
                name: "Karim".into(),
                position: Some("Chef de projet".into()),
            },
            Employee {
                id: 3,
                name: "Leila".into(),
                position: Some("Directrice".into()),
            },
        ],
        ..Fixture::default()
    }
}

async fn open(backend: &Arc<InMemoryBackend>) -> EvaluationSession {
    let options = SessionOptions {
        employee_id: Some(EMPLOYEE),
        ..SessionOptions::default()
    };
    EvaluationSession::open(backend.clone(), MISSION, options)
        .await
        .unwrap()
}

fn observation(len: usize) -> String {
    "o".repeat(len)
}

/// Fill every item of every group for the active responder.
async fn fill_all(session: &mut EvaluationSession) {
    session.load_all_items().await.unwrap();
    for item in session.loaded_items() {
        let valid = match item.item_type {
            ItemType::Numeric => session.set_response(item.id, 4),
            ItemType::Boolean => session.set_response(item.id, "oui"),
            ItemType::Observation => session.set_response(item.id, observation(60)),
            ItemType::Unknown => continue,
        }
        .unwrap();
        assert!(valid);
    }
}

// ──────────────────────────────────────────────
// Step 1
// ──────────────────────────────────────────────

#[tokio::test]
async fn fresh_evaluation_starts_at_step_one_on_first_group() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let session = open(&backend).await;

    assert_eq!(session.step(), WorkflowStep::SelfAssessment);
    assert_eq!(session.active_responder(), Some(Responder::Employee));
    assert_eq!(session.current_group().map(|g| g.id), Some(1));
    assert_eq!(session.current_items().len(), 3);
    assert_eq!(session.progress(), 33);
}

#[tokio::test]
async fn group_tab_warning_follows_completion() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;

    assert!(session.set_response(11, 4).unwrap());
    assert!(session.set_response(12, "oui").unwrap());
    assert!(session.group_tabs()[0].warning);

    assert!(session.set_response(13, observation(60)).unwrap());
    assert!(!session.group_tabs()[0].warning);

    // Shortening the observation brings the warning back.
    assert!(!session.set_response(13, observation(49)).unwrap());
    assert!(session.group_tabs()[0].warning);
}

#[tokio::test]
async fn navigation_is_never_blocked_by_incomplete_groups() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;

    assert!(session.next().await.unwrap());
    assert!(session.next().await.unwrap());
    assert_eq!(session.progress(), 100);
    assert!(!session.next().await.unwrap());
    assert_eq!(session.progress(), 100);

    session.go_to(2).await.unwrap();
    assert_eq!(session.current_items().len(), 1);
    assert!(matches!(
        session.go_to(9).await,
        Err(SessionError::Navigation(_))
    ));
    assert_eq!(session.current_group().map(|g| g.id), Some(2));

    assert!(session.previous().await.unwrap());
    assert!(!session.previous().await.unwrap());
}

#[tokio::test]
async fn unknown_items_are_refused() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;
    // Group 2 is not loaded yet.
    assert!(matches!(
        session.set_response(21, 3),
        Err(SessionError::UnknownItem { item_id: 21 })
    ));
}

#[tokio::test]
async fn candidates_exclude_the_evaluated_employee() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;

    let ids: Vec<_> = session
        .candidates()
        .await
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![2, 3]);
    assert!(matches!(
        session.select_evaluator(EMPLOYEE),
        Err(SessionError::InvalidSelection {
            role: "evaluator",
            ..
        })
    ));
}

#[tokio::test]
async fn submission_without_selection_is_refused_locally() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;
    fill_all(&mut session).await;
    session.select_evaluator(2).unwrap();

    let err = session.submit_self_assessment().await.unwrap_err();
    match err {
        SessionError::Step(StepError::MissingSelection { missing }) => {
            assert_eq!(missing, "an approver")
        }
        other => panic!("expected MissingSelection, got {other:?}"),
    }
    assert_eq!(session.step(), WorkflowStep::SelfAssessment);
    assert!(backend.submissions().is_empty());
}

#[tokio::test]
async fn self_assessment_advances_to_step_two() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;
    fill_all(&mut session).await;
    session.select_evaluator(2).unwrap();
    session.select_approver(3).unwrap();

    let outcome = session.submit_self_assessment().await.unwrap();
    assert_eq!(outcome.status, SubmissionStatus::Complete);
    assert_eq!(
        outcome.redirect,
        Redirect::Step(WorkflowStep::ManagerEvaluation)
    );
    assert!(outcome.snapshot.confirmed);
    assert_eq!(outcome.snapshot.responses.len(), 5);

    assert_eq!(session.step(), WorkflowStep::ManagerEvaluation);
    assert_eq!(session.active_responder(), Some(Responder::Evaluator));
    assert_eq!(
        session.snapshot().map(|s| s.responder),
        Some(Responder::Employee)
    );

    // Selection is closed once step 1 is over.
    assert!(matches!(
        session.select_approver(2),
        Err(SessionError::Step(StepError::WrongStep { .. }))
    ));
}

#[tokio::test]
async fn rejected_write_keeps_step_and_allows_retry() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;
    fill_all(&mut session).await;
    session.select_evaluator(2).unwrap();
    session.select_approver(3).unwrap();

    backend.fail_submissions(true);
    let err = session.submit_self_assessment().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Submission(SubmissionError::Rejected(BackendError::Status {
            status: 500,
            ..
        }))
    ));
    assert_eq!(session.step(), WorkflowStep::SelfAssessment);
    assert_eq!(session.store(Responder::Employee).len(), 5);
    assert!(!session.is_submitting());

    backend.fail_submissions(false);
    session.submit_self_assessment().await.unwrap();
    assert_eq!(session.step(), WorkflowStep::ManagerEvaluation);
}

#[tokio::test]
async fn failed_read_back_is_partial_success() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;
    fill_all(&mut session).await;
    session.select_evaluator(2).unwrap();
    session.select_approver(3).unwrap();

    backend.fail_read_back(true);
    let outcome = session.submit_self_assessment().await.unwrap();
    assert!(outcome.is_partial());
    assert!(!outcome.snapshot.confirmed);
    assert_eq!(outcome.snapshot.responses.len(), 5);
    assert_eq!(session.step(), WorkflowStep::ManagerEvaluation);
}

// ──────────────────────────────────────────────
// Step 2
// ──────────────────────────────────────────────

async fn at_step_two(backend: &Arc<InMemoryBackend>) -> EvaluationSession {
    let mut session = open(backend).await;
    fill_all(&mut session).await;
    session.select_evaluator(2).unwrap();
    session.select_approver(3).unwrap();
    session.submit_self_assessment().await.unwrap();
    // The evaluator opens the evaluation in a new session.
    open(backend).await
}

#[tokio::test]
async fn evaluator_sees_locked_self_assessment() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_two(&backend).await;

    assert_eq!(session.step(), WorkflowStep::ManagerEvaluation);
    assert_eq!(session.assignment().evaluator_id, Some(2));
    let reference = session.reference_view().unwrap();
    assert_eq!(reference.len(), 3);
    let locked = reference
        .iter()
        .all(|v| v.valid && v.to_string().ends_with("(locked)"));
    assert!(locked);

    // The evaluator starts from an empty form.
    assert!(session.group_tabs()[0].warning);
    assert!(!session.set_response(11, 6).unwrap());
    assert!(session.store(Responder::Employee).get(11).is_some());
}

#[tokio::test]
async fn manager_evaluation_redirects_to_listing_and_stays_at_step_two() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_two(&backend).await;
    fill_all(&mut session).await;

    let outcome = session.submit_manager_evaluation().await.unwrap();
    assert_eq!(outcome.redirect, Redirect::Listing);
    assert_eq!(outcome.snapshot.responder, Responder::Evaluator);
    assert_eq!(session.step(), WorkflowStep::ManagerEvaluation);

    // The server moves it to final validation; the client follows.
    backend.set_step(MISSION, WorkflowStep::FinalValidation);
    assert_eq!(
        session.refresh_status().await.unwrap(),
        WorkflowStep::FinalValidation
    );
}

#[tokio::test]
async fn manager_evaluation_outside_step_two_is_refused() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;
    assert!(matches!(
        session.submit_manager_evaluation().await,
        Err(SessionError::Step(StepError::WrongStep { .. }))
    ));
}

#[tokio::test]
async fn status_never_moves_backwards() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_two(&backend).await;
    backend.set_step(MISSION, WorkflowStep::SelfAssessment);
    assert_eq!(
        session.refresh_status().await.unwrap(),
        WorkflowStep::ManagerEvaluation
    );
}

#[tokio::test]
async fn advance_seen_through_refresh_loads_persisted_self_assessment() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut stale = open(&backend).await;
    stale.set_response(11, 2).unwrap();

    // The employee submits from another session.
    let mut submitter = open(&backend).await;
    fill_all(&mut submitter).await;
    submitter.select_evaluator(2).unwrap();
    submitter.select_approver(3).unwrap();
    submitter.submit_self_assessment().await.unwrap();

    assert_eq!(
        stale.refresh_status().await.unwrap(),
        WorkflowStep::ManagerEvaluation
    );
    let rating = ResponseValue::Integer(4);
    assert_eq!(stale.store(Responder::Employee).get(11), Some(&rating));
    assert_eq!(stale.store(Responder::Employee).len(), 5);
    assert_eq!(stale.assignment().evaluator_id, Some(2));
    assert_eq!(stale.assignment().approver_id, Some(3));

    let reference = stale.reference_view().unwrap();
    assert!(reference.iter().all(|v| v.valid));
    assert_eq!(reference[0].widget.to_string(), "★★★★☆ 4/5");
}

// ──────────────────────────────────────────────
// Step 3
// ──────────────────────────────────────────────

async fn at_step_three(backend: &Arc<InMemoryBackend>) -> EvaluationSession {
    let mut session = at_step_two(backend).await;
    fill_all(&mut session).await;
    session.set_response(11, 2).unwrap();
    session.submit_manager_evaluation().await.unwrap();
    backend.set_step(MISSION, WorkflowStep::FinalValidation);
    open(backend).await
}

#[tokio::test]
async fn step_three_is_read_only() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_three(&backend).await;

    assert_eq!(session.active_responder(), None);
    assert!(matches!(
        session.set_response(11, 5),
        Err(SessionError::ReadOnly {
            step: WorkflowStep::FinalValidation
        })
    ));
    let locked = session
        .current_view()
        .iter()
        .all(|v| v.to_string().ends_with("(locked)"));
    assert!(locked);
}

#[tokio::test]
async fn summary_compares_both_responders() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_three(&backend).await;

    let summary = session.summary().await.unwrap();
    assert_eq!(summary.rows.len(), 5);
    let first = &summary.rows[0];
    assert_eq!(first.item_id, 11);
    assert_eq!(first.employee.to_string(), "★★★★☆ 4/5");
    assert_eq!(first.evaluator.to_string(), "★★☆☆☆ 2/5");
    assert_eq!(summary.employee_average, Some(4.0));
    assert_eq!(summary.evaluator_average, Some(3.0));
}

#[tokio::test]
async fn summary_before_step_three_is_refused() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = open(&backend).await;
    assert!(matches!(
        session.summary().await,
        Err(SessionError::Step(StepError::WrongStep { .. }))
    ));
}

#[tokio::test]
async fn short_reject_comment_never_reaches_the_server() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_three(&backend).await;
    let before = backend.submissions().len();

    let err = session
        .decide(Decision::Reject {
            comment: "trop vite".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Step(StepError::CommentTooShort {
            length: 9,
            minimum: 10
        })
    ));
    assert_eq!(backend.submissions().len(), before);
    assert!(session.decision().is_none());
}

#[tokio::test]
async fn reject_with_comment_is_sent_and_recorded() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_three(&backend).await;

    let decision = Decision::Reject {
        comment: "à compléter".into(),
    };
    session.decide(decision.clone()).await.unwrap();
    assert_eq!(session.decision(), Some(&decision));
    // The client stays at step 3; the server sends the evaluation back.
    assert_eq!(session.step(), WorkflowStep::FinalValidation);
    let status = backend.evaluation_status(MISSION).await.unwrap();
    assert_eq!(status.step, WorkflowStep::ManagerEvaluation);
}

#[tokio::test]
async fn approve_is_terminal() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_three(&backend).await;

    session.decide(Decision::Approve).await.unwrap();
    assert!(matches!(
        session.decide(Decision::Approve).await,
        Err(SessionError::Step(StepError::AlreadyDecided))
    ));

    let reopened = open(&backend).await;
    assert_eq!(reopened.decision(), Some(&Decision::Approve));
}

#[tokio::test]
async fn decision_issued_from_another_session_cannot_be_overridden() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut first = at_step_three(&backend).await;
    let mut second = open(&backend).await;

    second.decide(Decision::Approve).await.unwrap();
    assert!(first.decision().is_none());

    assert_eq!(
        first.refresh_status().await.unwrap(),
        WorkflowStep::FinalValidation
    );
    assert_eq!(first.decision(), Some(&Decision::Approve));

    let before = backend.submissions().len();
    let change = Decision::Reject {
        comment: "changement d'avis".into(),
    };
    assert!(matches!(
        first.decide(change).await,
        Err(SessionError::Step(StepError::AlreadyDecided))
    ));
    assert_eq!(backend.submissions().len(), before);
    let status = backend.evaluation_status(MISSION).await.unwrap();
    assert_eq!(status.decision, Some(Decision::Approve));
}

#[tokio::test]
async fn failed_decision_is_not_recorded() {
    let backend = Arc::new(InMemoryBackend::from_fixture(fixture()));
    let mut session = at_step_three(&backend).await;

    backend.fail_submissions(true);
    assert!(matches!(
        session.decide(Decision::Approve).await,
        Err(SessionError::Backend(_))
    ));
    assert!(session.decision().is_none());
}

// ──────────────────────────────────────────────
// Concurrent submission guard
// ──────────────────────────────────────────────

/// Holds every write until released.
struct GatedBackend {
    inner: InMemoryBackend,
    gate: tokio::sync::Notify,
}

#[async_trait]
impl EvaluationBackend for GatedBackend {
    async fn criteria_groups(&self) -> Result<Vec<CriteriaGroup>, BackendError> {
        self.inner.criteria_groups().await
    }

    async fn criteria_items(&self, group_id: GroupId) -> Result<Vec<CriteriaItem>, BackendError> {
        self.inner.criteria_items(group_id).await
    }

    async fn employees(&self) -> Result<Vec<Employee>, BackendError> {
        self.inner.employees().await
    }

    async fn evaluation_status(
        &self,
        mission_id: MissionId,
    ) -> Result<EvaluationStatus, BackendError> {
        self.inner.evaluation_status(mission_id).await
    }

    async fn responses(
        &self,
        mission_id: MissionId,
        responder: Responder,
    ) -> Result<Vec<EvaluationResponse>, BackendError> {
        self.inner.responses(mission_id, responder).await
    }

    async fn submit_self_assessment(
        &self,
        payload: &SelfAssessmentPayload,
    ) -> Result<(), BackendError> {
        self.gate.notified().await;
        self.inner.submit_self_assessment(payload).await
    }

    async fn submit_manager_evaluation(
        &self,
        payload: &ManagerEvaluationPayload,
    ) -> Result<(), BackendError> {
        self.gate.notified().await;
        self.inner.submit_manager_evaluation(payload).await
    }

    async fn submit_decision(
        &self,
        mission_id: MissionId,
        decision: &Decision,
    ) -> Result<(), BackendError> {
        self.inner.submit_decision(mission_id, decision).await
    }

    fn backend_id(&self) -> &str {
        "gated"
    }
}

#[tokio::test]
async fn second_submit_while_in_flight_is_refused() {
    let backend = Arc::new(GatedBackend {
        inner: InMemoryBackend::from_fixture(fixture()),
        gate: tokio::sync::Notify::new(),
    });
    let gateway = Arc::new(SubmissionGateway::new(backend.clone()));
    let submission = Submission::SelfAssessment(SelfAssessmentPayload {
        mission_id: MISSION,
        evaluator_id: 2,
        approver_id: 3,
        responses: vec![EvaluationResponse {
            item_id: 11,
            value: 5.into(),
        }],
    });

    let first = {
        let gateway = gateway.clone();
        let submission = submission.clone();
        tokio::spawn(async move { gateway.submit(&submission).await })
    };
    while !gateway.is_in_flight() {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        gateway.submit(&submission).await.unwrap_err(),
        SubmissionError::InFlight
    );

    backend.gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.status, SubmissionStatus::Complete);
    assert!(!gateway.is_in_flight());
}
