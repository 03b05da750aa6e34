//! Client configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables.
//!
//! # Example
//!
//! ```toml
//! base_url = "https://hris.example.com/api"
//! auth_token = "eyJhbGciOi..."
//! submit_delay_ms = 1500
//! timeout_secs = 30
//!
//! [endpoints]
//! criteria_items = "/criteres/{group}/items"
//! ```
//!
//! Environment overrides: `APPRAISAL_BASE_URL`, `APPRAISAL_AUTH_TOKEN`,
//! `APPRAISAL_SUBMIT_DELAY_MS`.

use std::path::Path;
use std::time::Duration;

use appraisal_core::{GroupId, MissionId};
use serde::{Deserialize, Serialize};

pub const ENV_BASE_URL: &str = "APPRAISAL_BASE_URL";
pub const ENV_AUTH_TOKEN: &str = "APPRAISAL_AUTH_TOKEN";
pub const ENV_SUBMIT_DELAY_MS: &str = "APPRAISAL_SUBMIT_DELAY_MS";

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: &'static str, value: String },
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the HRIS REST API. Required by the HTTP backend.
    pub base_url: Option<String>,
    /// Session token sent as a bearer token.
    pub auth_token: Option<String>,
    /// Pause before the self-assessment submission fires.
    pub submit_delay_ms: u64,
    pub timeout_secs: u64,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: None,
            auth_token: None,
            submit_delay_ms: 1500,
            timeout_secs: 30,
            endpoints: Endpoints::default(),
        }
    }
}

/// Endpoint path templates, relative to `base_url`.
///
/// `{mission}` and `{group}` are substituted at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub criteria_groups: String,
    pub criteria_items: String,
    pub employees: String,
    pub evaluation_status: String,
    pub employee_responses: String,
    pub evaluator_responses: String,
    pub submit_self_assessment: String,
    pub submit_manager_evaluation: String,
    pub submit_decision: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            criteria_groups: "/criteria-groups".to_string(),
            criteria_items: "/criteria-groups/{group}/items".to_string(),
            employees: "/employees".to_string(),
            evaluation_status: "/evaluations/{mission}".to_string(),
            employee_responses: "/evaluations/{mission}/collaborator-responses".to_string(),
            evaluator_responses: "/evaluations/{mission}/evaluator-responses".to_string(),
            submit_self_assessment: "/evaluations/self-assessment".to_string(),
            submit_manager_evaluation: "/evaluations/manager-evaluation".to_string(),
            submit_decision: "/evaluations/{mission}/decision".to_string(),
        }
    }
}

/// Substitute `{mission}` in an endpoint template.
pub fn with_mission(template: &str, mission_id: MissionId) -> String {
    template.replace("{mission}", &mission_id.to_string())
}

/// Substitute `{group}` in an endpoint template.
pub fn with_group(template: &str, group_id: GroupId) -> String {
    template.replace("{group}", &group_id.to_string())
}

// ── Functions ─────────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Read `path` (when given) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => ClientConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_AUTH_TOKEN) {
            self.auth_token = Some(token);
        }
        if let Some(raw) = lookup(ENV_SUBMIT_DELAY_MS) {
            self.submit_delay_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_SUBMIT_DELAY_MS,
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
