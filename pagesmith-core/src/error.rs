//! Pipeline failures.
//!
//! Collaborators report failures as [`RemoteError`]; the pipeline wraps them
//! into a [`PipelineError`] variant naming the step that failed. Every
//! `PipelineError` is fatal for the current round or sub-round.

use std::fmt;

use crate::types::ContainerName;

/// Failure reported by a remote collaborator.
///
/// `status` is `None` when the request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.status, .body))]
pub struct RemoteError {
    pub status: Option<u16>,
    pub body: String,
}

impl RemoteError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
        }
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        Self {
            status: None,
            body: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

fn describe(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("HTTP {code}: {body}"),
        None => format!("transport error: {body}"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("attachment {name}: only data: URIs are supported")]
    AttachmentSourceUnsupported { name: String },

    #[error("attachment {name}: invalid data URI: {cause}")]
    AttachmentDecode { name: String, cause: String },

    #[error("brief is empty")]
    MissingBrief,

    #[error("code generation failed: {0}")]
    Generation(RemoteError),

    #[error("failed to create repository {container}: {source}")]
    ContainerCreate {
        container: ContainerName,
        source: RemoteError,
    },

    #[error("{file} does not exist in {container}; round 1 must publish it first")]
    MissingPriorRevision {
        container: ContainerName,
        file: String,
    },

    #[error("failed to look up current sha of {file}: {source}")]
    IdentifierLookup { file: String, source: RemoteError },

    #[error("failed to push {file}: {source}")]
    Publish { file: String, source: RemoteError },

    #[error("evaluation callback failed: {0}")]
    Notification(RemoteError),

    #[error("invalid round {0}, expected 1 or 2")]
    InvalidRound(u8),
}

/// Pages could not be enabled. Logged and reported, never fatal: Pages
/// activation on GitHub is eventually consistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not enable Pages for {container}: {cause}")]
pub struct HostingEnableWarning {
    pub container: ContainerName,
    pub cause: RemoteError,
}
