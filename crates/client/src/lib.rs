//! appraisal-client: drives the evaluation workflow against the HRIS backend.
//!
//! The client consumes the REST surface through [`EvaluationBackend`],
//! submits through a [`SubmissionGateway`] that applies the write/read-back
//! failure policy, and exposes the whole workflow as an explicitly owned
//! [`EvaluationSession`].

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;

pub use backend::http::HttpBackend;
pub use backend::memory::{Fixture, InMemoryBackend};
pub use backend::{
    BackendError, EvaluationBackend, EvaluationStatus, ManagerEvaluationPayload,
    SelfAssessmentPayload,
};
pub use config::{ClientConfig, ConfigError, Endpoints};
pub use error::SessionError;
pub use gateway::{
    Redirect, Submission, SubmissionError, SubmissionGateway, SubmissionOutcome,
    SubmissionSnapshot, SubmissionStatus,
};
pub use session::{EvaluationSession, SessionOptions, Summary};
