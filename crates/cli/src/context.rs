//! Backend selection and helpers shared by every subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use appraisal_client::{
    ClientConfig, EvaluationBackend, EvaluationSession, Fixture, HttpBackend, InMemoryBackend,
    SessionOptions,
};
use appraisal_core::{EmployeeId, EvaluationResponse, MissionId};
use serde::Serialize;

use crate::OutputFormat;

pub(crate) struct Context {
    pub backend: Arc<dyn EvaluationBackend>,
    pub config: ClientConfig,
    pub output: OutputFormat,
    pub quiet: bool,
    /// In fixture mode, the backend and the file it is saved back to.
    fixture: Option<(Arc<InMemoryBackend>, PathBuf)>,
}

impl Context {
    pub fn new(
        config_path: Option<&Path>,
        fixture_path: Option<PathBuf>,
        output: OutputFormat,
        quiet: bool,
    ) -> Result<Self, String> {
        let config = ClientConfig::load(config_path).map_err(|e| e.to_string())?;

        let (backend, fixture): (Arc<dyn EvaluationBackend>, _) = match fixture_path {
            Some(path) => {
                let memory = Arc::new(InMemoryBackend::from_fixture(
                    Fixture::load(&path).map_err(|e| e.to_string())?,
                ));
                let backend: Arc<dyn EvaluationBackend> = memory.clone();
                (backend, Some((memory, path)))
            }
            None => (
                Arc::new(HttpBackend::new(&config).map_err(|e| e.to_string())?),
                None,
            ),
        };
        tracing::debug!(backend = backend.backend_id(), "backend ready");

        Ok(Context {
            backend,
            config,
            output,
            quiet,
            fixture,
        })
    }

    pub async fn open(
        &self,
        mission_id: MissionId,
        employee_id: Option<EmployeeId>,
    ) -> Result<EvaluationSession, String> {
        let options = SessionOptions {
            employee_id,
            ..SessionOptions::from_config(&self.config)
        };
        EvaluationSession::open(self.backend.clone(), mission_id, options)
            .await
            .map_err(|e| e.to_string())
    }

    /// Write fixture-backed state back to disk. No-op against the REST API.
    pub fn persist(&self) -> Result<(), String> {
        match &self.fixture {
            Some((memory, path)) => memory.to_fixture().save(path).map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    pub fn print_json<T: Serialize>(&self, value: &T) {
        if self.quiet {
            return;
        }
        println!(
            "{}",
            serde_json::to_string_pretty(value)
                .unwrap_or_else(|e| format!("serialization error: {}", e))
        );
    }

    pub fn print_text(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", text.as_ref());
        }
    }
}

/// Read a JSON array of `{item_id, value}` responses.
pub(crate) fn read_responses(path: &Path) -> Result<Vec<EvaluationResponse>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("could not parse responses in '{}': {}", path.display(), e))
}

/// Load every group and apply `responses` for the active responder.
pub(crate) async fn apply_responses(
    session: &mut EvaluationSession,
    responses: Vec<EvaluationResponse>,
) -> Result<(), String> {
    session.load_all_items().await.map_err(|e| e.to_string())?;
    for r in responses {
        session
            .set_response(r.item_id, r.value)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}
