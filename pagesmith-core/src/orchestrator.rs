//! Round orchestrator.
//!
//! Round 1: decode → build prompt → generate → create repo + enable Pages →
//! publish → notify.
//!
//! Round 2: for each sub-round in order: decode → build prompt (revise) →
//! generate → resolve shas → publish → notify. A failing sub-round stops
//! the ones after it; the ones before it stay published and notified.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attachment::decode_attachments;
use crate::error::{HostingEnableWarning, PipelineError};
use crate::generate::{CodeGenerator, generate_files};
use crate::hosting::{HostingProvider, SiteAddress, resolve_identifiers};
use crate::notify::{Notifier, notify};
use crate::prompt::{PromptInput, build_prompt};
use crate::publish::publish;
use crate::types::{Attachment, ContainerName, Mode, ResultRecord, RevisionId, TaskRequest};

/// Pipeline phase, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Decoding,
    Building,
    Generating,
    Provisioning,
    Resolving,
    Publishing,
    Notifying,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Decoding => write!(f, "decoding"),
            Phase::Building => write!(f, "building"),
            Phase::Generating => write!(f, "generating"),
            Phase::Provisioning => write!(f, "provisioning"),
            Phase::Resolving => write!(f, "resolving"),
            Phase::Publishing => write!(f, "publishing"),
            Phase::Notifying => write!(f, "notifying"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// Outcome of one round or sub-round.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// "1" for round 1, "2.i" for the i-th sub-round.
    pub label: String,
    pub revision: RevisionId,
    pub record: ResultRecord,
}

/// Outcome of a whole task request.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub container: ContainerName,
    pub cycles: Vec<CycleReport>,
    pub warnings: Vec<HostingEnableWarning>,
}

impl TaskReport {
    fn new(container: ContainerName) -> Self {
        Self {
            container,
            cycles: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// What one cycle works from.
struct CycleInput<'a> {
    label: String,
    brief: &'a str,
    attachments: &'a [Attachment],
    checks: &'a [String],
    mode: Mode,
}

/// Runs task requests against the three collaborators.
#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn CodeGenerator>,
    hosting: Arc<dyn HostingProvider>,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        hosting: Arc<dyn HostingProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            generator,
            hosting,
            notifier,
        }
    }

    /// Dispatch on the request's round number.
    pub async fn run(&self, task: &TaskRequest) -> Result<TaskReport, PipelineError> {
        match task.round {
            1 => self.run_round1(task).await,
            2 => self.run_round2(task).await,
            other => Err(PipelineError::InvalidRound(other)),
        }
    }

    pub async fn run_round1(&self, task: &TaskRequest) -> Result<TaskReport, PipelineError> {
        let container = task.container();
        let mut report = TaskReport::new(container.clone());
        let input = CycleInput {
            label: "1".to_string(),
            brief: &task.brief,
            attachments: &task.attachments,
            checks: &task.checks,
            mode: Mode::Create,
        };
        let cycle = self.run_cycle(task, &container, input, &mut report).await?;
        report.cycles.push(cycle);
        Ok(report)
    }

    pub async fn run_round2(&self, task: &TaskRequest) -> Result<TaskReport, PipelineError> {
        let container = task.container();
        let mut report = TaskReport::new(container.clone());
        if task.round2.is_empty() {
            tracing::warn!(repo = %container, "Round 2 request has no sub-rounds");
        }
        for (i, sub) in task.round2.iter().enumerate() {
            let input = CycleInput {
                label: format!("2.{}", i + 1),
                brief: &sub.brief,
                attachments: &sub.attachments,
                checks: &sub.checks,
                mode: Mode::Revise,
            };
            let cycle = self.run_cycle(task, &container, input, &mut report).await?;
            report.cycles.push(cycle);
        }
        Ok(report)
    }

    async fn run_cycle(
        &self,
        task: &TaskRequest,
        container: &ContainerName,
        input: CycleInput<'_>,
        report: &mut TaskReport,
    ) -> Result<CycleReport, PipelineError> {
        let label = input.label.as_str();
        let enter = |phase: Phase| {
            tracing::info!(repo = %container, round = label, %phase, "Round phase");
        };

        enter(Phase::Decoding);
        let attachments = decode_attachments(input.attachments)?;

        enter(Phase::Building);
        let prompt = build_prompt(&PromptInput {
            brief: input.brief,
            attachments: &attachments,
            checks: input.checks,
            mode: input.mode,
            container,
        })?;

        enter(Phase::Generating);
        let files = generate_files(self.generator.as_ref(), &prompt).await?;

        let identifiers = match input.mode {
            Mode::Create => {
                enter(Phase::Provisioning);
                if let Some(warning) = self.provision(container).await? {
                    report.warnings.push(warning);
                }
                HashMap::new()
            }
            Mode::Revise => {
                enter(Phase::Resolving);
                resolve_identifiers(self.hosting.as_ref(), container, &files.files(), input.mode)
                    .await?
            }
        };

        enter(Phase::Publishing);
        let revision = publish(self.hosting.as_ref(), container, &files, &identifiers).await?;

        enter(Phase::Notifying);
        let address: SiteAddress = self.hosting.address(container);
        let record = notify(self.notifier.as_ref(), task, &address, revision.clone()).await?;

        enter(Phase::Done);
        tracing::info!(repo = %container, round = label, commit = %revision, "Round completed");
        Ok(CycleReport {
            label: input.label,
            revision,
            record,
        })
    }

    /// Create the repository, then try to enable Pages. Creation failure
    /// is fatal; Pages failure comes back as a warning.
    async fn provision(
        &self,
        container: &ContainerName,
    ) -> Result<Option<HostingEnableWarning>, PipelineError> {
        self.hosting
            .create_container(container)
            .await
            .map_err(|source| PipelineError::ContainerCreate {
                container: container.clone(),
                source,
            })?;

        match self.hosting.enable_hosting(container).await {
            Ok(()) => Ok(None),
            Err(cause) => {
                let warning = HostingEnableWarning {
                    container: container.clone(),
                    cause,
                };
                tracing::warn!("{warning}");
                Ok(Some(warning))
            }
        }
    }
}
