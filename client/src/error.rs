use common::{JobAction, JobId, JobStatus, KeywordError, TemplateError};
use std::result;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Invalid API base URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Keywords(#[from] KeywordError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Cannot {action} job {job_id} while it is {status}")]
    ActionNotAllowed {
        job_id: JobId,
        action: JobAction,
        status: JobStatus,
    },
    #[error("A {0} request is already in flight")]
    ActionInFlight(String),
    #[error("Job {0} is not in the current job list")]
    JobNotFound(JobId),
    #[error("Operation cancelled because the job board was closed")]
    Cancelled,
    #[error("Draft storage error: {0}")]
    Draft(#[from] rusqlite::Error),
    #[error("Draft storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Draft storage is unavailable")]
    DraftStoreUnavailable,
}

impl Error {
    /// HTTP status for API-level failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Client-side validation failures that never reached the network.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Keywords(_) | Error::Template(_))
    }
}

pub type Result<T> = result::Result<T, Error>;
