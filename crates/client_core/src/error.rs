use std::path::PathBuf;

use shared::{domain::Category, error::ApiException};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpSetup(reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("{endpoint}: {source}")]
    Api {
        endpoint: String,
        source: ApiException,
    },
    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    /// The backend answered 2xx but reported `success: false`.
    #[error("{0}")]
    Rejected(String),
    #[error("select at least one source")]
    NoSourcesSelected,
    #[error("unknown source '{source_name}' for {category}")]
    UnknownSource {
        category: Category,
        source_name: String,
    },
    #[error("day window {days} is outside {min}..={max} for {category}")]
    DaysOutOfRange {
        category: Category,
        days: u32,
        min: u32,
        max: u32,
    },
    #[error("a fetch is already in progress")]
    FetchInProgress,
    #[error("no item at index {index} (panel holds {len})")]
    NoSuchItem { index: usize, len: usize },
    #[error("timed out waiting for fetch to complete after {attempts} attempts")]
    PollTimeout { attempts: u32 },
    #[error("fetch task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },
    #[error("failed to render report: {0}")]
    Render(#[from] minijinja::Error),
    #[error("failed to encode report: {0}")]
    Encode(serde_json::Error),
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ClientError {
    /// True when the backend could not be reached at all, as opposed to
    /// answering with an error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoSourcesSelected
                | Self::UnknownSource { .. }
                | Self::DaysOutOfRange { .. }
                | Self::NoSuchItem { .. }
        )
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
