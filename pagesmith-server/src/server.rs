//! Server state and HTTP listener.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use pagesmith_core::github::{GithubClient, GithubConfig};
use pagesmith_core::llm::LlmClient;
use pagesmith_core::notify::EvaluationClient;
use pagesmith_core::{ContainerName, Orchestrator};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;

/// One async lock per repository, so two requests for the same
/// `{task}-{nonce}` never interleave their sha lookups and writes.
#[derive(Default)]
pub struct ContainerLocks {
    locks: parking_lot::Mutex<HashMap<ContainerName, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContainerLocks {
    pub fn lock_for(&self, name: &ContainerName) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().entry(name.clone()).or_default().clone()
    }

    /// Drop locks nobody is holding or waiting on.
    pub fn prune(&self) {
        self.locks.lock().retain(|_, l| Arc::strong_count(l) > 1);
    }
}

/// State shared by all request handlers.
pub struct SharedState {
    pub secret: String,
    pub orchestrator: Orchestrator,
    pub container_locks: ContainerLocks,
}

pub struct Server {
    config: ServerConfig,
    orchestrator: Orchestrator,
}

impl Server {
    /// Build a server talking to the real LLM, GitHub and evaluation endpoints.
    pub fn new(config: ServerConfig) -> Self {
        let llm = LlmClient::new(config.llm_api_key.clone())
            .with_api_url(&config.llm_api_url)
            .with_model(&config.llm_model)
            .with_max_tokens(config.llm_max_tokens)
            .with_temperature(config.llm_temperature);

        let mut github =
            GithubConfig::new(config.github_token.clone(), config.github_owner.clone());
        github.branch = config.github_branch.clone();
        github.api_url = config.github_api_url.clone();
        github.web_url = config.github_web_url.clone();

        let orchestrator = Orchestrator::new(
            Arc::new(llm),
            Arc::new(GithubClient::new(github)),
            Arc::new(EvaluationClient::new()),
        );
        Self {
            config,
            orchestrator,
        }
    }

    /// Create a server with custom collaborators (for testing).
    pub fn with_orchestrator(config: ServerConfig, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    fn build_state(&self) -> Arc<SharedState> {
        if self.config.secret.is_empty() {
            tracing::warn!("SECRET_KEY not set, every task request will be rejected");
        }
        if self.config.github_owner.is_empty() {
            tracing::warn!("GITHUB_OWNER not set, repository and Pages URLs will be wrong");
        }
        Arc::new(SharedState {
            secret: self.config.secret.clone(),
            orchestrator: self.orchestrator.clone(),
            container_locks: ContainerLocks::default(),
        })
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.listen_addr))?;
        tracing::info!("HTTP listener on {}", self.config.listen_addr);
        let router = crate::web::router(self.build_state());
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server and return the bound address + task handle (for testing).
    pub async fn start(self) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        let addr = listener.local_addr()?;
        tracing::info!("Listening on {addr}");

        let router = crate::web::router(self.build_state());
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await?;
            Ok(())
        });
        Ok((addr, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_container_shares_one_lock() {
        let locks = ContainerLocks::default();
        let a = ContainerName::derive("t", "1");
        let b = ContainerName::derive("t", "2");

        let l1 = locks.lock_for(&a);
        let l2 = locks.lock_for(&a);
        let l3 = locks.lock_for(&b);
        assert!(Arc::ptr_eq(&l1, &l2));
        assert!(!Arc::ptr_eq(&l1, &l3));

        let _guard = l1.lock().await;
        assert!(l2.try_lock().is_err());
        assert!(l3.try_lock().is_ok());
    }

    #[test]
    fn prune_keeps_locks_in_use() {
        let locks = ContainerLocks::default();
        let a = ContainerName::derive("t", "1");
        let held = locks.lock_for(&a);
        let _ = locks.lock_for(&ContainerName::derive("t", "2"));
        locks.prune();
        assert_eq!(locks.locks.lock().len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.locks.lock().is_empty());
    }
}
