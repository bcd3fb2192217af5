//! Evaluation callback.

use async_trait::async_trait;

use crate::error::{PipelineError, RemoteError};
use crate::hosting::SiteAddress;
use crate::types::{ResultRecord, RevisionId, TaskRequest};

/// Delivers result records to the evaluation endpoint.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, callback_url: &str, record: &ResultRecord) -> Result<(), RemoteError>;
}

/// POSTs the record as JSON; any non-2xx response is a failure.
#[derive(Clone, Default)]
pub struct EvaluationClient {
    http: reqwest::Client,
}

impl EvaluationClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for EvaluationClient {
    async fn deliver(&self, callback_url: &str, record: &ResultRecord) -> Result<(), RemoteError> {
        let resp = self.http.post(callback_url).json(record).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::http(status.as_u16(), body));
        }
        Ok(())
    }
}

/// Build the result record for a publish and deliver it.
pub async fn notify(
    notifier: &dyn Notifier,
    task: &TaskRequest,
    address: &SiteAddress,
    revision: RevisionId,
) -> Result<ResultRecord, PipelineError> {
    let record = ResultRecord {
        email: task.email.clone(),
        task: task.task.clone(),
        round: task.round,
        nonce: task.nonce.clone(),
        repo_url: address.repo_url.clone(),
        commit_sha: revision,
        pages_url: address.pages_url.clone(),
    };
    notifier
        .deliver(&task.evaluation_url, &record)
        .await
        .map_err(PipelineError::Notification)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn record() -> ResultRecord {
        ResultRecord {
            email: "student@example.com".into(),
            task: "counter".into(),
            round: 1,
            nonce: "n1".into(),
            repo_url: "https://github.com/owner/counter-n1".into(),
            commit_sha: RevisionId("abc".into()),
            pages_url: "https://owner.github.io/counter-n1/".into(),
        }
    }

    #[tokio::test]
    async fn posts_record_as_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/notify")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::to_value(record()).unwrap()))
            .with_status(200)
            .create_async()
            .await;

        let client = EvaluationClient::new();
        client
            .deliver(&format!("{}/notify", server.url()), &record())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/notify")
            .with_status(400)
            .with_body("bad nonce")
            .create_async()
            .await;

        let client = EvaluationClient::new();
        let err = client
            .deliver(&format!("{}/notify", server.url()), &record())
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::http(400, "bad nonce"));
    }
}
