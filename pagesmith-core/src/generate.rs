//! Code generation step.

use async_trait::async_trait;

use crate::error::{PipelineError, RemoteError};
use crate::types::{ENTRY_FILE, FileRecord, GeneratedFileSet, SUMMARY_FILE};

/// Something that turns a prompt into a single completion.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, RemoteError>;
}

/// Ask the generator for the app and package it with a summary file.
pub async fn generate_files(
    generator: &dyn CodeGenerator,
    prompt: &str,
) -> Result<GeneratedFileSet, PipelineError> {
    let completion = generator
        .complete(prompt)
        .await
        .map_err(PipelineError::Generation)?;
    let code = completion.trim();
    if code.is_empty() {
        return Err(PipelineError::Generation(RemoteError {
            status: None,
            body: "empty completion".into(),
        }));
    }

    Ok(GeneratedFileSet {
        entry: FileRecord::text(ENTRY_FILE, code),
        summary: FileRecord::text(SUMMARY_FILE, render_summary(prompt, code)),
    })
}

fn render_summary(prompt: &str, code: &str) -> String {
    format!(
        "# Generated App\n\n\
         ## Latest code generated from:\n\n{prompt}\n\n\
         ---\n\n\
         ## Generated code\n\n{code}\n"
    )
}
