//! pagesmith-core: the publish pipeline.
//!
//! Turns a task brief into a single-file static web app, publishes it to a
//! GitHub repository with Pages enabled, and reports the commit to an
//! evaluation endpoint. Round 1 creates the repository; round 2 applies an
//! ordered list of revision briefs to the same repository.
//!
//! Remote services sit behind three traits so the pipeline can run against
//! in-memory fakes:
//! - [`generate::CodeGenerator`]: LLM completion
//! - [`hosting::HostingProvider`]: repository, Pages and file contents
//! - [`notify::Notifier`]: evaluation callback

pub mod attachment;
pub mod error;
pub mod generate;
pub mod github;
pub mod hosting;
pub mod llm;
pub mod notify;
pub mod orchestrator;
pub mod prompt;
pub mod publish;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use error::{HostingEnableWarning, PipelineError, RemoteError};
pub use orchestrator::{CycleReport, Orchestrator, TaskReport};
pub use types::{
    Attachment, ContainerName, ContentId, FileRecord, GeneratedFileSet, Mode, ResultRecord,
    RevisionId, SubRound, TaskRequest,
};
