//! Writing a generated file set to the hosting provider.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{PipelineError, RemoteError};
use crate::hosting::{FileWrite, HostingProvider};
use crate::types::{ContainerName, ContentId, FileRecord, GeneratedFileSet, RevisionId};

/// Write every file in order, entry first. Stops at the first failure;
/// files already written stay written.
///
/// A file with an entry in `identifiers` is overwritten with that sha,
/// any other file is created. Returns the revision of the last write.
pub async fn publish(
    hosting: &dyn HostingProvider,
    container: &ContainerName,
    files: &GeneratedFileSet,
    identifiers: &HashMap<String, ContentId>,
) -> Result<RevisionId, PipelineError> {
    let [entry, summary] = files.files();
    write_record(hosting, container, entry, identifiers).await?;
    write_record(hosting, container, summary, identifiers).await
}

async fn write_record(
    hosting: &dyn HostingProvider,
    container: &ContainerName,
    file: &FileRecord,
    identifiers: &HashMap<String, ContentId>,
) -> Result<RevisionId, PipelineError> {
    let publish_err = |source| PipelineError::Publish {
        file: file.name.clone(),
        source,
    };
    let bytes = file.raw_bytes().map_err(|e| {
        publish_err(RemoteError::transport(format!(
            "stored base64 content is invalid: {e}"
        )))
    })?;
    let prior = identifiers.get(&file.name).cloned();
    let verb = if prior.is_some() { "Update" } else { "Add" };

    let write = FileWrite {
        path: file.name.clone(),
        content: STANDARD.encode(&bytes),
        message: format!("{verb} {}", file.name),
        prior,
    };

    tracing::debug!(
        container = %container,
        file = %file.name,
        update = write.prior.is_some(),
        "Writing file"
    );
    hosting
        .write_file(container, write)
        .await
        .map_err(publish_err)
}
