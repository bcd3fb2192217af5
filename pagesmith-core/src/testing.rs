//! In-memory collaborators for tests.
//!
//! Each fake records every call it receives so tests can assert on ordering
//! and arguments, and can be told to fail specific calls.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::RemoteError;
use crate::generate::CodeGenerator;
use crate::hosting::{FileWrite, HostingProvider, SiteAddress};
use crate::notify::Notifier;
use crate::types::{ContainerName, ContentId, ResultRecord, RevisionId};

// ── Generator ──────────────────────────────────────────────────────────

/// Replies from a script, then from a fixed fallback.
pub struct FakeGenerator {
    script: Mutex<VecDeque<Result<String, RemoteError>>>,
    fallback: Result<String, RemoteError>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self::scripted(Vec::new(), Ok(text.to_string()))
    }

    pub fn failing(err: RemoteError) -> Self {
        Self::scripted(Vec::new(), Err(err))
    }

    pub fn scripted(
        script: Vec<Result<String, RemoteError>>,
        fallback: Result<String, RemoteError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CodeGenerator for FakeGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, RemoteError> {
        self.prompts.lock().push(prompt.to_string());
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// ── Hosting ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostingCall {
    CreateContainer { name: ContainerName },
    EnableHosting { name: ContainerName },
    FileIdentifier { name: ContainerName, path: String },
    WriteFile { name: ContainerName, write: FileWrite },
}

#[derive(Default)]
struct HostingState {
    containers: HashSet<ContainerName>,
    files: HashMap<(ContainerName, String), ContentId>,
    calls: Vec<HostingCall>,
    writes: u64,
    fail_create: Option<RemoteError>,
    fail_enable: Option<RemoteError>,
    fail_paths: HashMap<String, RemoteError>,
    fail_nth_write: Option<(u64, RemoteError)>,
}

/// A repository host that behaves like GitHub's contents API: overwriting
/// an existing file needs its current sha, and a stale sha is a conflict.
#[derive(Default)]
pub struct FakeHosting {
    state: Mutex<HostingState>,
}

impl FakeHosting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `name` was already created.
    pub fn add_container(&self, name: &ContainerName) {
        self.state.lock().containers.insert(name.clone());
    }

    /// Pretend `path` already exists in `name` with the given sha.
    pub fn seed_file(&self, name: &ContainerName, path: &str, sha: &str) {
        let mut state = self.state.lock();
        state.containers.insert(name.clone());
        state
            .files
            .insert((name.clone(), path.to_string()), ContentId(sha.to_string()));
    }

    pub fn fail_create(&self, err: RemoteError) {
        self.state.lock().fail_create = Some(err);
    }

    pub fn fail_enable(&self, err: RemoteError) {
        self.state.lock().fail_enable = Some(err);
    }

    /// Every write to `path` fails.
    pub fn fail_writes_to(&self, path: &str, err: RemoteError) {
        self.state.lock().fail_paths.insert(path.to_string(), err);
    }

    /// The n-th write (1-based, counting attempts) fails.
    pub fn fail_nth_write(&self, n: u64, err: RemoteError) {
        self.state.lock().fail_nth_write = Some((n, err));
    }

    pub fn calls(&self) -> Vec<HostingCall> {
        self.state.lock().calls.clone()
    }

    pub fn current_sha(&self, name: &ContainerName, path: &str) -> Option<ContentId> {
        self.state
            .lock()
            .files
            .get(&(name.clone(), path.to_string()))
            .cloned()
    }
}

#[async_trait]
impl HostingProvider for FakeHosting {
    async fn create_container(&self, name: &ContainerName) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(HostingCall::CreateContainer { name: name.clone() });
        if let Some(err) = state.fail_create.clone() {
            return Err(err);
        }
        if !state.containers.insert(name.clone()) {
            return Err(RemoteError::http(422, "name already exists on this account"));
        }
        Ok(())
    }

    async fn enable_hosting(&self, name: &ContainerName) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(HostingCall::EnableHosting { name: name.clone() });
        match state.fail_enable.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn file_identifier(
        &self,
        name: &ContainerName,
        path: &str,
    ) -> Result<Option<ContentId>, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(HostingCall::FileIdentifier {
            name: name.clone(),
            path: path.to_string(),
        });
        Ok(state.files.get(&(name.clone(), path.to_string())).cloned())
    }

    async fn write_file(
        &self,
        name: &ContainerName,
        write: FileWrite,
    ) -> Result<RevisionId, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(HostingCall::WriteFile {
            name: name.clone(),
            write: write.clone(),
        });
        state.writes += 1;
        let n = state.writes;

        if let Some((fail_at, err)) = &state.fail_nth_write
            && *fail_at == n
        {
            return Err(err.clone());
        }
        if let Some(err) = state.fail_paths.get(&write.path) {
            return Err(err.clone());
        }
        if !state.containers.contains(name) {
            return Err(RemoteError::http(404, "Not Found"));
        }

        let key = (name.clone(), write.path.clone());
        match (state.files.get(&key), &write.prior) {
            (Some(_), None) => {
                return Err(RemoteError::http(422, "\"sha\" wasn't supplied."));
            }
            (Some(current), Some(prior)) if current != prior => {
                let msg = format!("{} does not match {prior}", write.path);
                return Err(RemoteError::http(409, msg));
            }
            _ => {}
        }

        state.files.insert(key, ContentId(format!("blob-{n}")));
        Ok(RevisionId(format!("commit-{n}")))
    }

    fn address(&self, name: &ContainerName) -> SiteAddress {
        SiteAddress {
            repo_url: format!("https://github.com/fake/{name}"),
            pages_url: format!("https://fake.github.io/{name}/"),
        }
    }
}

// ── Notifier ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, ResultRecord)>>,
    failure: Mutex<Option<RemoteError>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, err: RemoteError) {
        *self.failure.lock() = Some(err);
    }

    /// Successfully delivered records with their callback urls.
    pub fn delivered(&self) -> Vec<(String, ResultRecord)> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, callback_url: &str, record: &ResultRecord) -> Result<(), RemoteError> {
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        self.delivered
            .lock()
            .push((callback_url.to_string(), record.clone()));
        Ok(())
    }
}
