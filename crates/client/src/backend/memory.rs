//! In-memory backend seeded from a JSON fixture.
//!
//! Behaves like the server for the parts of the workflow the client sees:
//! a self-assessment moves the evaluation to step 2, a rejection sends it
//! back to step 2, and read-backs return what was last submitted. Failure
//! injection flags let tests exercise the submission error paths.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use appraisal_core::{
    Assignment, CriteriaGroup, CriteriaItem, Decision, Employee, EvaluationResponse, GroupId,
    MissionId, Responder, WorkflowStep,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    BackendError, EvaluationBackend, EvaluationStatus, ManagerEvaluationPayload,
    SelfAssessmentPayload,
};

/// Stored answers of one responder for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSet {
    pub mission_id: MissionId,
    pub responder: Responder,
    pub responses: Vec<EvaluationResponse>,
}

/// Serializable backend state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub groups: Vec<CriteriaGroup>,
    pub items: Vec<CriteriaItem>,
    pub employees: Vec<Employee>,
    pub evaluations: Vec<EvaluationStatus>,
    pub responses: Vec<ResponseSet>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let content = std::fs::read_to_string(path).map_err(|e| BackendError::Config {
            message: format!("could not read fixture '{}': {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| BackendError::Config {
            message: format!("could not parse fixture '{}': {}", path.display(), e),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), BackendError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| BackendError::Config {
            message: format!("could not encode fixture: {}", e),
        })?;
        std::fs::write(path, json + "\n").map_err(|e| BackendError::Config {
            message: format!("could not write fixture '{}': {}", path.display(), e),
        })
    }
}

#[derive(Debug, Default)]
struct State {
    groups: Vec<CriteriaGroup>,
    items: BTreeMap<GroupId, Vec<CriteriaItem>>,
    employees: Vec<Employee>,
    evaluations: BTreeMap<MissionId, EvaluationStatus>,
    responses: HashMap<(MissionId, Responder), Vec<EvaluationResponse>>,
}

/// Backend that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    fail_submissions: AtomicBool,
    fail_read_back: AtomicBool,
    submissions: Mutex<Vec<String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut items: BTreeMap<GroupId, Vec<CriteriaItem>> = BTreeMap::new();
        for item in fixture.items {
            items.entry(item.group_id).or_default().push(item);
        }
        let state = State {
            groups: fixture.groups,
            items,
            employees: fixture.employees,
            evaluations: fixture
                .evaluations
                .into_iter()
                .map(|e| (e.mission_id, e))
                .collect(),
            responses: fixture
                .responses
                .into_iter()
                .map(|r| ((r.mission_id, r.responder), r.responses))
                .collect(),
        };
        InMemoryBackend {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Export the current state, e.g. to persist it between CLI runs.
    pub fn to_fixture(&self) -> Fixture {
        let state = self.lock();
        let mut responses: Vec<ResponseSet> = state
            .responses
            .iter()
            .map(|((mission_id, responder), responses)| ResponseSet {
                mission_id: *mission_id,
                responder: *responder,
                responses: responses.clone(),
            })
            .collect();
        responses.sort_by_key(|r| (r.mission_id, r.responder == Responder::Evaluator));
        Fixture {
            groups: state.groups.clone(),
            items: state.items.values().flatten().cloned().collect(),
            employees: state.employees.clone(),
            evaluations: state.evaluations.values().cloned().collect(),
            responses,
        }
    }

    /// Make every submission call fail with a 500.
    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    /// Make every response read-back fail with a 503.
    pub fn fail_read_back(&self, fail: bool) {
        self.fail_read_back.store(fail, Ordering::SeqCst);
    }

    /// Move an evaluation to `step`, as the server-side workflow would.
    pub fn set_step(&self, mission_id: MissionId, step: WorkflowStep) {
        let mut state = self.lock();
        state
            .evaluations
            .entry(mission_id)
            .or_insert_with(|| EvaluationStatus {
                mission_id,
                step,
                employee_id: None,
                assignment: Assignment::default(),
                decision: None,
            })
            .step = step;
    }

    /// Names of the submission endpoints hit so far, in order.
    pub fn submissions(&self) -> Vec<String> {
        self.submissions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // Recover data even if a panicking test poisoned the lock.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, endpoint: &str) -> Result<(), BackendError> {
        self.submissions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(endpoint.to_string());
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                endpoint: endpoint.to_string(),
                status: 500,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EvaluationBackend for InMemoryBackend {
    async fn criteria_groups(&self) -> Result<Vec<CriteriaGroup>, BackendError> {
        Ok(self.lock().groups.clone())
    }

    async fn criteria_items(&self, group_id: GroupId) -> Result<Vec<CriteriaItem>, BackendError> {
        let state = self.lock();
        if !state.groups.iter().any(|g| g.id == group_id) {
            return Err(BackendError::NotFound {
                endpoint: format!("criteria-groups/{}/items", group_id),
            });
        }
        Ok(state.items.get(&group_id).cloned().unwrap_or_default())
    }

    async fn employees(&self) -> Result<Vec<Employee>, BackendError> {
        Ok(self.lock().employees.clone())
    }

    async fn evaluation_status(
        &self,
        mission_id: MissionId,
    ) -> Result<EvaluationStatus, BackendError> {
        self.lock()
            .evaluations
            .get(&mission_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                endpoint: format!("evaluations/{}", mission_id),
            })
    }

    async fn responses(
        &self,
        mission_id: MissionId,
        responder: Responder,
    ) -> Result<Vec<EvaluationResponse>, BackendError> {
        let endpoint = format!("evaluations/{}/{}-responses", mission_id, responder);
        if self.fail_read_back.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                endpoint,
                status: 503,
            });
        }
        Ok(self
            .lock()
            .responses
            .get(&(mission_id, responder))
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_self_assessment(
        &self,
        payload: &SelfAssessmentPayload,
    ) -> Result<(), BackendError> {
        self.record("self-assessment")?;
        let mut state = self.lock();
        state.responses.insert(
            (payload.mission_id, Responder::Employee),
            payload.responses.clone(),
        );
        let status = state
            .evaluations
            .entry(payload.mission_id)
            .or_insert_with(|| EvaluationStatus {
                mission_id: payload.mission_id,
                step: WorkflowStep::SelfAssessment,
                employee_id: None,
                assignment: Assignment::default(),
                decision: None,
            });
        status.step = status.step.max(WorkflowStep::ManagerEvaluation);
        status.assignment = Assignment {
            evaluator_id: Some(payload.evaluator_id),
            approver_id: Some(payload.approver_id),
        };
        Ok(())
    }

    async fn submit_manager_evaluation(
        &self,
        payload: &ManagerEvaluationPayload,
    ) -> Result<(), BackendError> {
        self.record("manager-evaluation")?;
        let mut state = self.lock();
        if !state.evaluations.contains_key(&payload.mission_id) {
            return Err(BackendError::NotFound {
                endpoint: format!("evaluations/{}", payload.mission_id),
            });
        }
        state.responses.insert(
            (payload.mission_id, Responder::Evaluator),
            payload.responses.clone(),
        );
        Ok(())
    }

    async fn submit_decision(
        &self,
        mission_id: MissionId,
        decision: &Decision,
    ) -> Result<(), BackendError> {
        self.record("decision")?;
        let mut state = self.lock();
        let status = state
            .evaluations
            .get_mut(&mission_id)
            .ok_or_else(|| BackendError::NotFound {
                endpoint: format!("evaluations/{}", mission_id),
            })?;
        status.decision = Some(decision.clone());
        if let Decision::Reject { .. } = decision {
            // Rejected evaluations go back to the manager for revision.
            status.step = WorkflowStep::ManagerEvaluation;
        }
        Ok(())
    }

    fn backend_id(&self) -> &str {
        "memory"
    }
}
