//! HTTP backend -- talks to the HRIS REST API.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` so a slow
//! request never blocks the async runtime. The session token, when
//! configured, is sent as `Authorization: Bearer <token>`.

use appraisal_core::{
    CriteriaGroup, CriteriaItem, Decision, Employee, EvaluationResponse, GroupId, MissionId,
    Responder,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    BackendError, EvaluationBackend, EvaluationStatus, ManagerEvaluationPayload,
    SelfAssessmentPayload,
};
use crate::config::{with_group, with_mission, ClientConfig, Endpoints};

/// Backend that sends every call to the REST API under `base_url`.
pub struct HttpBackend {
    base_url: String,
    auth_token: Option<String>,
    endpoints: Endpoints,
    agent: ureq::Agent,
}

impl HttpBackend {
    /// Build from configuration. Fails when `base_url` is missing.
    pub fn new(config: &ClientConfig) -> Result<Self, BackendError> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| BackendError::Config {
                message: "'base_url' is required for the HTTP backend".to_string(),
            })?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .into();

        Ok(HttpBackend {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            endpoints: config.endpoints.clone(),
            agent,
        })
    }

    /// Join `base_url` and an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T>(&self, path: String) -> Result<T, BackendError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.url(&path);
        let endpoint = path.clone();
        let agent = self.agent.clone();
        let auth_token = self.auth_token.clone();
        tracing::debug!(%url, "GET");

        tokio::task::spawn_blocking(move || {
            let mut request = agent.get(&url);
            if let Some(ref token) = auth_token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }
            let response = request.call().map_err(|e| map_ureq_error(&path, e))?;
            response
                .into_body()
                .read_json::<T>()
                .map_err(|e| BackendError::Decode {
                    endpoint: path,
                    message: e.to_string(),
                })
        })
        .await
        .map_err(|e| join_error(&endpoint, e))?
    }

    async fn post_json<P>(&self, path: String, body: &P) -> Result<(), BackendError>
    where
        P: Serialize,
    {
        let body = serde_json::to_value(body).map_err(|e| BackendError::Decode {
            endpoint: path.clone(),
            message: format!("failed to encode request body: {}", e),
        })?;
        let url = self.url(&path);
        let endpoint = path.clone();
        let agent = self.agent.clone();
        let auth_token = self.auth_token.clone();
        tracing::debug!(%url, "POST");

        tokio::task::spawn_blocking(move || {
            let mut request = agent.post(&url);
            if let Some(ref token) = auth_token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }
            request
                .send_json(&body)
                .map(|_| ())
                .map_err(|e| map_ureq_error(&path, e))
        })
        .await
        .map_err(|e| join_error(&endpoint, e))?
    }
}

fn map_ureq_error(endpoint: &str, err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::StatusCode(404) => BackendError::NotFound {
            endpoint: endpoint.to_string(),
        },
        ureq::Error::StatusCode(status) => BackendError::Status {
            endpoint: endpoint.to_string(),
            status,
        },
        other => BackendError::Transport {
            endpoint: endpoint.to_string(),
            message: other.to_string(),
        },
    }
}

fn join_error(endpoint: &str, err: tokio::task::JoinError) -> BackendError {
    BackendError::Transport {
        endpoint: endpoint.to_string(),
        message: format!("task join error: {}", err),
    }
}

#[async_trait]
impl EvaluationBackend for HttpBackend {
    async fn criteria_groups(&self) -> Result<Vec<CriteriaGroup>, BackendError> {
        self.get_json(self.endpoints.criteria_groups.clone()).await
    }

    async fn criteria_items(&self, group_id: GroupId) -> Result<Vec<CriteriaItem>, BackendError> {
        self.get_json(with_group(&self.endpoints.criteria_items, group_id))
            .await
    }

    async fn employees(&self) -> Result<Vec<Employee>, BackendError> {
        self.get_json(self.endpoints.employees.clone()).await
    }

    async fn evaluation_status(
        &self,
        mission_id: MissionId,
    ) -> Result<EvaluationStatus, BackendError> {
        self.get_json(with_mission(&self.endpoints.evaluation_status, mission_id))
            .await
    }

    async fn responses(
        &self,
        mission_id: MissionId,
        responder: Responder,
    ) -> Result<Vec<EvaluationResponse>, BackendError> {
        let template = match responder {
            Responder::Employee => &self.endpoints.employee_responses,
            Responder::Evaluator => &self.endpoints.evaluator_responses,
        };
        self.get_json(with_mission(template, mission_id)).await
    }

    async fn submit_self_assessment(
        &self,
        payload: &SelfAssessmentPayload,
    ) -> Result<(), BackendError> {
        self.post_json(self.endpoints.submit_self_assessment.clone(), payload)
            .await
    }

    async fn submit_manager_evaluation(
        &self,
        payload: &ManagerEvaluationPayload,
    ) -> Result<(), BackendError> {
        self.post_json(self.endpoints.submit_manager_evaluation.clone(), payload)
            .await
    }

    async fn submit_decision(
        &self,
        mission_id: MissionId,
        decision: &Decision,
    ) -> Result<(), BackendError> {
        self.post_json(
            with_mission(&self.endpoints.submit_decision, mission_id),
            decision,
        )
        .await
    }

    fn backend_id(&self) -> &str {
        "http"
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
