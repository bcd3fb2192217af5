//! Hosting provider interface and content-identifier resolution.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{PipelineError, RemoteError};
use crate::types::{ContainerName, ContentId, FileRecord, Mode, RevisionId};

/// Public addresses of a published container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAddress {
    pub repo_url: String,
    pub pages_url: String,
}

/// One file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: String,
    /// Base64 of the file bytes.
    pub content: String,
    pub message: String,
    /// Current blob sha. Present means overwrite; absent means create.
    pub prior: Option<ContentId>,
}

/// Repository storage with public static hosting.
#[async_trait]
pub trait HostingProvider: Send + Sync {
    async fn create_container(&self, name: &ContainerName) -> Result<(), RemoteError>;

    async fn enable_hosting(&self, name: &ContainerName) -> Result<(), RemoteError>;

    /// Current identifier of `path`, or `None` if the file does not exist.
    async fn file_identifier(
        &self,
        name: &ContainerName,
        path: &str,
    ) -> Result<Option<ContentId>, RemoteError>;

    async fn write_file(
        &self,
        name: &ContainerName,
        write: FileWrite,
    ) -> Result<RevisionId, RemoteError>;

    /// Pure: same name, same addresses.
    fn address(&self, name: &ContainerName) -> SiteAddress;
}

/// Resolve the identifier one file must be written with.
///
/// Create mode never looks anything up. Revise mode requires the file to
/// exist already.
pub async fn resolve_identifier(
    hosting: &dyn HostingProvider,
    container: &ContainerName,
    file: &str,
    mode: Mode,
) -> Result<Option<ContentId>, PipelineError> {
    if mode == Mode::Create {
        return Ok(None);
    }
    match hosting.file_identifier(container, file).await {
        Ok(Some(id)) => Ok(Some(id)),
        Ok(None) => Err(PipelineError::MissingPriorRevision {
            container: container.clone(),
            file: file.to_string(),
        }),
        Err(source) => Err(PipelineError::IdentifierLookup {
            file: file.to_string(),
            source,
        }),
    }
}

/// Resolve identifiers for every file, one lookup per file.
pub async fn resolve_identifiers(
    hosting: &dyn HostingProvider,
    container: &ContainerName,
    files: &[&FileRecord],
    mode: Mode,
) -> Result<HashMap<String, ContentId>, PipelineError> {
    let mut ids = HashMap::new();
    for file in files {
        if let Some(id) = resolve_identifier(hosting, container, &file.name, mode).await? {
            ids.insert(file.name.clone(), id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeHosting, HostingCall};

    #[tokio::test]
    async fn create_mode_never_queries() {
        let hosting = FakeHosting::new();
        let name = ContainerName::derive("t", "n");
        let id = resolve_identifier(&hosting, &name, "index.html", Mode::Create)
            .await
            .unwrap();
        assert_eq!(id, None);
        assert!(hosting.calls().is_empty());
    }

    #[tokio::test]
    async fn revise_mode_returns_current_sha_per_file() {
        let hosting = FakeHosting::new();
        let name = ContainerName::derive("t", "n");
        hosting.seed_file(&name, "index.html", "sha-index");
        hosting.seed_file(&name, "README.md", "sha-readme");

        let a = FileRecord::text("index.html", "");
        let b = FileRecord::text("README.md", "");
        let ids = resolve_identifiers(&hosting, &name, &[&a, &b], Mode::Revise)
            .await
            .unwrap();
        assert_eq!(ids["index.html"], ContentId("sha-index".into()));
        assert_eq!(ids["README.md"], ContentId("sha-readme".into()));

        let lookups = hosting
            .calls()
            .into_iter()
            .filter(|c| matches!(c, HostingCall::FileIdentifier { .. }))
            .count();
        assert_eq!(lookups, 2);
    }

    #[tokio::test]
    async fn revise_mode_requires_existing_file() {
        let hosting = FakeHosting::new();
        let name = ContainerName::derive("t", "n");
        let err = resolve_identifier(&hosting, &name, "index.html", Mode::Revise)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingPriorRevision { ref file, .. } if file == "index.html"
        ));
    }
}
