//! One evaluation, from self-assessment to the approver's decision.
//!
//! [`EvaluationSession`] is owned by whoever started the evaluation and is
//! passed around explicitly. It ties together the two response stores, the
//! group navigator, the step controller and the submission gateway.
//!
//! Edits and submissions cannot interleave: the payload is snapshotted from
//! the store before the request is sent, and every `submit_*` method holds
//! `&mut self` until the request resolves, so the editing surface is locked
//! for the whole round-trip.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use appraisal_core::completion;
use appraisal_core::render::{self, GroupTab, ItemView, RenderMode, SummaryRow};
use appraisal_core::validate;
use appraisal_core::{
    Assignment, CompletionTracker, CriteriaGroup, CriteriaItem, CriteriaNavigator, Decision,
    Employee, EmployeeId, GroupId, ItemId, MissionId, Responder, ResponseStore, ResponseValue,
    StepController, StepError, WorkflowStep,
};
use serde::Serialize;

use crate::backend::{
    BackendError, EvaluationBackend, ManagerEvaluationPayload, SelfAssessmentPayload,
};
use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::gateway::{Submission, SubmissionGateway, SubmissionOutcome, SubmissionSnapshot};

/// Per-session settings.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Pause before the self-assessment submission fires.
    pub submit_delay: Duration,
    /// The evaluated employee, when the server does not report one.
    pub employee_id: Option<EmployeeId>,
}

impl SessionOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        SessionOptions {
            submit_delay: config.submit_delay(),
            employee_id: None,
        }
    }
}

/// Step-3 comparison of both response sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub mission_id: MissionId,
    pub rows: Vec<SummaryRow>,
    pub employee_average: Option<f64>,
    pub evaluator_average: Option<f64>,
    pub decision: Option<Decision>,
}

pub struct EvaluationSession {
    backend: Arc<dyn EvaluationBackend>,
    gateway: SubmissionGateway,
    mission_id: MissionId,
    employee_id: Option<EmployeeId>,
    submit_delay: Duration,
    navigator: CriteriaNavigator,
    items: BTreeMap<GroupId, Vec<CriteriaItem>>,
    employee: ResponseStore,
    evaluator: ResponseStore,
    completion: CompletionTracker,
    steps: StepController,
    assignment: Assignment,
    snapshot: Option<SubmissionSnapshot>,
}

impl EvaluationSession {
    /// Open the evaluation of `mission_id`.
    ///
    /// Fetches the criteria groups and the server status (an evaluation the
    /// server does not know yet starts at step 1), the answers already
    /// persisted for the current step, and the items of the first group.
    pub async fn open(
        backend: Arc<dyn EvaluationBackend>,
        mission_id: MissionId,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let groups = backend.criteria_groups().await?;
        let status = match backend.evaluation_status(mission_id).await {
            Ok(status) => Some(status),
            Err(BackendError::NotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        let (steps, assignment, employee_id) = match status {
            Some(s) => (
                StepController::resume(s.step, s.decision),
                s.assignment,
                s.employee_id.or(options.employee_id),
            ),
            None => (StepController::new(), Assignment::default(), options.employee_id),
        };
        tracing::debug!(
            mission_id,
            step = %steps.step(),
            groups = groups.len(),
            "evaluation session opened"
        );

        let mut session = EvaluationSession {
            gateway: SubmissionGateway::new(backend.clone()),
            backend,
            mission_id,
            employee_id,
            submit_delay: options.submit_delay,
            navigator: CriteriaNavigator::new(groups),
            items: BTreeMap::new(),
            employee: ResponseStore::new(Responder::Employee),
            evaluator: ResponseStore::new(Responder::Evaluator),
            completion: CompletionTracker::new(),
            steps,
            assignment,
            snapshot: None,
        };
        if session.step() >= WorkflowStep::ManagerEvaluation {
            session.load_responses().await?;
        }
        session.ensure_current_items().await?;
        Ok(session)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn mission_id(&self) -> MissionId {
        self.mission_id
    }

    pub fn step(&self) -> WorkflowStep {
        self.steps.step()
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.steps.decision()
    }

    pub fn assignment(&self) -> Assignment {
        self.assignment
    }

    /// Snapshot of the last accepted submission.
    pub fn snapshot(&self) -> Option<&SubmissionSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn store(&self, responder: Responder) -> &ResponseStore {
        match responder {
            Responder::Employee => &self.employee,
            Responder::Evaluator => &self.evaluator,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.gateway.is_in_flight()
    }

    /// Who may edit at the current step. Nobody edits at step 3.
    pub fn active_responder(&self) -> Option<Responder> {
        match self.steps.step() {
            WorkflowStep::SelfAssessment => Some(Responder::Employee),
            WorkflowStep::ManagerEvaluation => Some(Responder::Evaluator),
            WorkflowStep::FinalValidation => None,
        }
    }

    /// Responder whose answers drive the group tabs.
    fn displayed_responder(&self) -> Responder {
        self.active_responder().unwrap_or(Responder::Evaluator)
    }

    // ── Navigation ───────────────────────────────────────────────────

    pub fn groups(&self) -> &[CriteriaGroup] {
        self.navigator.groups()
    }

    pub fn current_group(&self) -> Option<&CriteriaGroup> {
        self.navigator.current()
    }

    /// Items of the current group, empty until they have been loaded.
    pub fn current_items(&self) -> &[CriteriaItem] {
        self.navigator
            .current()
            .and_then(|g| self.items.get(&g.id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn progress(&self) -> u8 {
        self.navigator.progress()
    }

    pub async fn next(&mut self) -> Result<bool, SessionError> {
        let moved = self.navigator.next();
        if moved {
            self.ensure_current_items().await?;
        }
        Ok(moved)
    }

    pub async fn previous(&mut self) -> Result<bool, SessionError> {
        let moved = self.navigator.previous();
        if moved {
            self.ensure_current_items().await?;
        }
        Ok(moved)
    }

    pub async fn go_to(&mut self, group_id: GroupId) -> Result<(), SessionError> {
        self.navigator.go_to(group_id)?;
        self.ensure_current_items().await?;
        Ok(())
    }

    async fn ensure_current_items(&mut self) -> Result<(), SessionError> {
        if let Some(group_id) = self.navigator.current().map(|g| g.id) {
            self.ensure_items(group_id).await?;
        }
        Ok(())
    }

    /// Items of `group_id`, fetched on first use and cached afterwards.
    pub async fn ensure_items(
        &mut self,
        group_id: GroupId,
    ) -> Result<&[CriteriaItem], SessionError> {
        if !self.items.contains_key(&group_id) {
            let items = self.backend.criteria_items(group_id).await?;
            self.items.insert(group_id, items);
            self.refresh_completion(group_id);
        }
        Ok(self.items.get(&group_id).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Load the items of every group.
    pub async fn load_all_items(&mut self) -> Result<(), SessionError> {
        let ids: Vec<GroupId> = self.navigator.groups().iter().map(|g| g.id).collect();
        for group_id in ids {
            self.ensure_items(group_id).await?;
        }
        Ok(())
    }

    /// Every loaded item, in group order.
    pub fn loaded_items(&self) -> Vec<CriteriaItem> {
        self.navigator
            .groups()
            .iter()
            .filter_map(|g| self.items.get(&g.id))
            .flatten()
            .cloned()
            .collect()
    }

    fn find_item(&self, item_id: ItemId) -> Option<&CriteriaItem> {
        self.items.values().flatten().find(|i| i.id == item_id)
    }

    // ── Responses ────────────────────────────────────────────────────

    /// Record an answer for the active responder and refresh the owning
    /// group's completion flag. Returns whether the answer is valid; an
    /// invalid answer is still stored so the user can keep typing.
    pub fn set_response(
        &mut self,
        item_id: ItemId,
        value: impl Into<ResponseValue>,
    ) -> Result<bool, SessionError> {
        let responder = self.active_responder().ok_or(SessionError::ReadOnly {
            step: self.step(),
        })?;
        let (group_id, item_type) = self
            .find_item(item_id)
            .map(|i| (i.group_id, i.item_type))
            .ok_or(SessionError::UnknownItem { item_id })?;

        let value = value.into();
        let valid = validate::is_valid(&value, item_type);
        match responder {
            Responder::Employee => self.employee.set(item_id, value),
            Responder::Evaluator => self.evaluator.set(item_id, value),
        };
        self.refresh_completion(group_id);
        Ok(valid)
    }

    /// Clear an answer of the active responder.
    pub fn clear_response(&mut self, item_id: ItemId) -> Result<(), SessionError> {
        let responder = self.active_responder().ok_or(SessionError::ReadOnly {
            step: self.step(),
        })?;
        let group_id = self
            .find_item(item_id)
            .map(|i| i.group_id)
            .ok_or(SessionError::UnknownItem { item_id })?;
        match responder {
            Responder::Employee => self.employee.remove(item_id),
            Responder::Evaluator => self.evaluator.remove(item_id),
        };
        self.refresh_completion(group_id);
        Ok(())
    }

    fn refresh_completion(&mut self, group_id: GroupId) {
        let store = match self.displayed_responder() {
            Responder::Employee => &self.employee,
            Responder::Evaluator => &self.evaluator,
        };
        if let Some(items) = self.items.get(&group_id) {
            self.completion.refresh(group_id, items, store);
        }
    }

    fn refresh_all_completion(&mut self) {
        self.completion.clear();
        let ids: Vec<GroupId> = self.items.keys().copied().collect();
        for group_id in ids {
            self.refresh_completion(group_id);
        }
    }

    /// Loaded items still lacking a valid answer from the displayed responder.
    pub fn missing_items(&self) -> Vec<&CriteriaItem> {
        let store = self.store(self.displayed_responder());
        self.navigator
            .groups()
            .iter()
            .filter_map(|g| self.items.get(&g.id))
            .flat_map(|items| completion::missing_items(items, store))
            .collect()
    }

    async fn load_responses(&mut self) -> Result<(), SessionError> {
        let employee = self
            .backend
            .responses(self.mission_id, Responder::Employee)
            .await?;
        let evaluator = self
            .backend
            .responses(self.mission_id, Responder::Evaluator)
            .await?;
        self.employee = ResponseStore::from_responses(Responder::Employee, employee);
        self.evaluator = ResponseStore::from_responses(Responder::Evaluator, evaluator);
        self.refresh_all_completion();
        Ok(())
    }

    // ── Rendering ────────────────────────────────────────────────────

    /// Widgets of the current group for the displayed responder.
    pub fn current_view(&self) -> Vec<ItemView> {
        let mode = if self.active_responder().is_some() {
            RenderMode::Editable
        } else {
            RenderMode::ReadOnly
        };
        render::render_group(
            self.current_items(),
            self.store(self.displayed_responder()),
            mode,
        )
    }

    /// The employee's locked self-assessment, shown beside the evaluator's
    /// form at step 2.
    pub fn reference_view(&self) -> Option<Vec<ItemView>> {
        (self.step() == WorkflowStep::ManagerEvaluation).then(|| {
            render::render_group(self.current_items(), &self.employee, RenderMode::ReadOnly)
        })
    }

    pub fn group_tabs(&self) -> Vec<GroupTab> {
        render::group_tabs(&self.navigator, &self.completion)
    }

    // ── People ───────────────────────────────────────────────────────

    /// Employees who may act as evaluator or approver.
    pub async fn candidates(&self) -> Result<Vec<Employee>, SessionError> {
        let employees = self.backend.employees().await?;
        Ok(employees
            .into_iter()
            .filter(|e| Some(e.id) != self.employee_id)
            .collect())
    }

    pub fn select_evaluator(&mut self, employee_id: EmployeeId) -> Result<(), SessionError> {
        self.check_selection(employee_id, "evaluator")?;
        self.assignment.evaluator_id = Some(employee_id);
        Ok(())
    }

    pub fn select_approver(&mut self, employee_id: EmployeeId) -> Result<(), SessionError> {
        self.check_selection(employee_id, "approver")?;
        self.assignment.approver_id = Some(employee_id);
        Ok(())
    }

    fn check_selection(
        &self,
        employee_id: EmployeeId,
        role: &'static str,
    ) -> Result<(), SessionError> {
        if self.step() != WorkflowStep::SelfAssessment {
            return Err(StepError::WrongStep {
                expected: WorkflowStep::SelfAssessment,
                actual: self.step(),
            }
            .into());
        }
        if Some(employee_id) == self.employee_id {
            return Err(SessionError::InvalidSelection { employee_id, role });
        }
        Ok(())
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Submit the self-assessment and move to step 2.
    ///
    /// Refused without contacting the server when the evaluator or the
    /// approver is missing. A rejected write leaves the session at step 1
    /// with its responses intact.
    pub async fn submit_self_assessment(&mut self) -> Result<SubmissionOutcome, SessionError> {
        let (evaluator_id, approver_id) = self.steps.check_submission(&self.assignment)?;
        let submission = Submission::SelfAssessment(SelfAssessmentPayload {
            mission_id: self.mission_id,
            evaluator_id,
            approver_id,
            responses: self.employee.responses(),
        });

        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        let outcome = self.gateway.submit(&submission).await?;

        let step = self.steps.complete_self_assessment(&self.assignment)?;
        tracing::info!(
            mission_id = self.mission_id,
            %step,
            partial = outcome.is_partial(),
            "self-assessment submitted"
        );
        self.accept(&outcome);
        Ok(outcome)
    }

    /// Submit the manager evaluation. The step stays at 2 until the server
    /// reports the evaluation has reached final validation.
    pub async fn submit_manager_evaluation(&mut self) -> Result<SubmissionOutcome, SessionError> {
        if self.step() != WorkflowStep::ManagerEvaluation {
            return Err(StepError::WrongStep {
                expected: WorkflowStep::ManagerEvaluation,
                actual: self.step(),
            }
            .into());
        }
        let submission = Submission::ManagerEvaluation(ManagerEvaluationPayload {
            mission_id: self.mission_id,
            responses: self.evaluator.responses(),
        });
        let outcome = self.gateway.submit(&submission).await?;
        tracing::info!(
            mission_id = self.mission_id,
            partial = outcome.is_partial(),
            "manager evaluation submitted"
        );
        self.accept(&outcome);
        Ok(outcome)
    }

    /// Replace the working responses with the submitted snapshot.
    fn accept(&mut self, outcome: &SubmissionOutcome) {
        let snapshot = outcome.snapshot.clone();
        let store = ResponseStore::from_responses(snapshot.responder, snapshot.responses.clone());
        match snapshot.responder {
            Responder::Employee => self.employee = store,
            Responder::Evaluator => self.evaluator = store,
        }
        self.snapshot = Some(snapshot);
        self.refresh_all_completion();
    }

    /// Pull the server status and move forward if the evaluation advanced.
    ///
    /// A forward move reloads both persisted response sets. At step 3 a
    /// decision already held by the server is adopted, so it cannot be
    /// issued a second time from this session.
    pub async fn refresh_status(&mut self) -> Result<WorkflowStep, SessionError> {
        let status = match self.backend.evaluation_status(self.mission_id).await {
            Ok(status) => status,
            Err(BackendError::NotFound { .. }) => return Ok(self.step()),
            Err(e) => return Err(e.into()),
        };
        let previous = self.step();
        if self.steps.sync(status.step) {
            tracing::info!(
                mission_id = self.mission_id,
                from = %previous,
                to = %status.step,
                "evaluation advanced"
            );
            self.assignment = status.assignment;
            self.load_responses().await?;
        }
        if self.steps.observe_decision(status.decision) {
            tracing::info!(
                mission_id = self.mission_id,
                decision = ?self.steps.decision(),
                "decision already issued"
            );
        }
        Ok(self.step())
    }

    /// Issue the approver's decision.
    ///
    /// Checked locally first (step 3, one decision, rejection comment
    /// length), then sent to the server, then recorded.
    pub async fn decide(&mut self, decision: Decision) -> Result<(), SessionError> {
        self.steps.check_decision(&decision)?;
        self.backend
            .submit_decision(self.mission_id, &decision)
            .await?;
        let decision = self.steps.decide(decision)?;
        tracing::info!(mission_id = self.mission_id, ?decision, "decision issued");
        Ok(())
    }

    /// Read-only comparison of both response sets. Only available at step 3.
    pub async fn summary(&mut self) -> Result<Summary, SessionError> {
        if self.step() != WorkflowStep::FinalValidation {
            return Err(StepError::WrongStep {
                expected: WorkflowStep::FinalValidation,
                actual: self.step(),
            }
            .into());
        }
        self.load_all_items().await?;
        let items = self.loaded_items();
        Ok(Summary {
            mission_id: self.mission_id,
            rows: render::summary_rows(&items, &self.employee, &self.evaluator),
            employee_average: render::average_rating(&items, &self.employee),
            evaluator_average: render::average_rating(&items, &self.evaluator),
            decision: self.steps.decision().cloned(),
        })
    }
}
