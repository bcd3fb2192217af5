//! GitHub as the hosting provider: one public repository per container,
//! served through GitHub Pages.
//!
//! Uses the REST v3 endpoints:
//!   POST /user/repos                            create
//!   POST /repos/{owner}/{repo}/pages            enable Pages
//!   GET  /repos/{owner}/{repo}/contents/{path}  current blob sha
//!   PUT  /repos/{owner}/{repo}/contents/{path}  create or update a file

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Deserialize;

use crate::error::RemoteError;
use crate::hosting::{FileWrite, HostingProvider, SiteAddress};
use crate::types::{ContainerName, ContentId, RevisionId};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_WEB_URL: &str = "https://github.com";

const USER_AGENT: &str = "pagesmith";

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: String,
    /// Account that owns the created repositories.
    pub owner: String,
    pub branch: String,
    pub api_url: String,
    pub web_url: String,
}

impl GithubConfig {
    pub fn new(token: String, owner: String) -> Self {
        Self {
            token,
            owner,
            branch: "main".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            web_url: DEFAULT_WEB_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
}

#[derive(Deserialize)]
struct WriteResponse {
    commit: CommitRef,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

pub struct GithubClient {
    config: GithubConfig,
    http: reqwest::Client,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn repo_endpoint(&self, name: &ContainerName) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            utf8_percent_encode(&self.config.owner, SEGMENT),
            utf8_percent_encode(name.as_str(), SEGMENT),
        )
    }

    fn contents_endpoint(&self, name: &ContainerName, path: &str) -> String {
        let path = path
            .split('/')
            .map(|seg| utf8_percent_encode(seg, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/contents/{path}", self.repo_endpoint(name))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
    }
}

async fn error_from(resp: reqwest::Response) -> RemoteError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    RemoteError::http(status, body)
}

#[async_trait]
impl HostingProvider for GithubClient {
    async fn create_container(&self, name: &ContainerName) -> Result<(), RemoteError> {
        let url = format!("{}/user/repos", self.config.api_url.trim_end_matches('/'));
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({
                "name": name.as_str(),
                "private": false,
                "auto_init": false,
                "license_template": "mit",
            }))
            .send()
            .await?;
        if resp.status() != reqwest::StatusCode::CREATED {
            return Err(error_from(resp).await);
        }
        tracing::info!(repo = %name, "Repository created");
        Ok(())
    }

    async fn enable_hosting(&self, name: &ContainerName) -> Result<(), RemoteError> {
        let url = format!("{}/pages", self.repo_endpoint(name));
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({
                "source": { "branch": self.config.branch, "path": "/" },
                "build_type": "legacy",
            }))
            .send()
            .await?;
        if resp.status() != reqwest::StatusCode::CREATED {
            return Err(error_from(resp).await);
        }
        tracing::info!(repo = %name, "Pages enabled");
        Ok(())
    }

    async fn file_identifier(
        &self,
        name: &ContainerName,
        path: &str,
    ) -> Result<Option<ContentId>, RemoteError> {
        let url = self.contents_endpoint(name, path);
        let resp = self
            .request(reqwest::Method::GET, &url)
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await?;
        match resp.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body: ContentsResponse = resp.json().await?;
                Ok(Some(ContentId(body.sha)))
            }
            _ => Err(error_from(resp).await),
        }
    }

    async fn write_file(
        &self,
        name: &ContainerName,
        write: FileWrite,
    ) -> Result<RevisionId, RemoteError> {
        let url = self.contents_endpoint(name, &write.path);
        let mut body = serde_json::json!({
            "message": write.message,
            "content": write.content,
            "branch": self.config.branch,
        });
        if let Some(prior) = write.prior {
            body["sha"] = serde_json::Value::String(prior.0);
        }

        let resp = self
            .request(reqwest::Method::PUT, &url)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::CREATED {
            return Err(error_from(resp).await);
        }
        let parsed: WriteResponse = resp.json().await?;
        Ok(RevisionId(parsed.commit.sha))
    }

    fn address(&self, name: &ContainerName) -> SiteAddress {
        SiteAddress {
            repo_url: format!(
                "{}/{}/{}",
                self.config.web_url.trim_end_matches('/'),
                self.config.owner,
                name
            ),
            pages_url: format!("https://{}.github.io/{}/", self.config.owner, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> GithubClient {
        let mut config = GithubConfig::new("ghp_test".into(), "octo".into());
        config.api_url = server.url();
        GithubClient::new(config)
    }

    fn name() -> ContainerName {
        ContainerName::derive("counter", "n1")
    }

    #[tokio::test]
    async fn create_container_posts_public_repo() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/user/repos")
            .match_header("authorization", "Bearer ghp_test")
            .match_header("accept", "application/vnd.github.v3+json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "counter-n1",
                "private": false,
                "license_template": "mit"
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        client(&server).create_container(&name()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_container_name_collision_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/user/repos")
            .with_status(422)
            .with_body(r#"{"message":"name already exists on this account"}"#)
            .create_async()
            .await;

        let err = client(&server).create_container(&name()).await.unwrap_err();
        assert_eq!(err.status, Some(422));
        assert!(err.body.contains("already exists"));
    }

    #[tokio::test]
    async fn enable_hosting_targets_branch_root() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/octo/counter-n1/pages")
            .match_body(Matcher::Json(serde_json::json!({
                "source": {"branch": "main", "path": "/"},
                "build_type": "legacy"
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        client(&server).enable_hosting(&name()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn file_identifier_found_and_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/counter-n1/contents/index.html")
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .with_status(200)
            .with_body(r#"{"name":"index.html","sha":"blob123"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/octo/counter-n1/contents/README.md")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let gh = client(&server);
        assert_eq!(
            gh.file_identifier(&name(), "index.html").await.unwrap(),
            Some(ContentId("blob123".into()))
        );
        assert_eq!(gh.file_identifier(&name(), "README.md").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_identifier_server_error_is_not_absence() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/counter-n1/contents/index.html")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server)
            .file_identifier(&name(), "index.html")
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(500));
    }

    #[tokio::test]
    async fn write_file_sends_sha_only_for_updates() {
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("PUT", "/repos/octo/counter-n1/contents/index.html")
            .match_body(Matcher::Json(serde_json::json!({
                "message": "Update index.html",
                "content": "PGgxPg==",
                "branch": "main",
                "sha": "blob123"
            })))
            .with_status(200)
            .with_body(r#"{"content":{},"commit":{"sha":"c0ffee"}}"#)
            .create_async()
            .await;
        let create = server
            .mock("PUT", "/repos/octo/counter-n1/contents/README.md")
            .match_body(Matcher::Json(serde_json::json!({
                "message": "Add README.md",
                "content": "IyBoaQ==",
                "branch": "main"
            })))
            .with_status(201)
            .with_body(r#"{"content":{},"commit":{"sha":"beef"}}"#)
            .create_async()
            .await;

        let gh = client(&server);
        let rev = gh
            .write_file(
                &name(),
                FileWrite {
                    path: "index.html".into(),
                    content: "PGgxPg==".into(),
                    message: "Update index.html".into(),
                    prior: Some(ContentId("blob123".into())),
                },
            )
            .await
            .unwrap();
        assert_eq!(rev, RevisionId("c0ffee".into()));

        let rev = gh
            .write_file(
                &name(),
                FileWrite {
                    path: "README.md".into(),
                    content: "IyBoaQ==".into(),
                    message: "Add README.md".into(),
                    prior: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(rev, RevisionId("beef".into()));

        update.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn write_file_conflict_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/repos/octo/counter-n1/contents/index.html")
            .with_status(409)
            .with_body("is at abc but expected def")
            .create_async()
            .await;

        let err = client(&server)
            .write_file(
                &name(),
                FileWrite {
                    path: "index.html".into(),
                    content: String::new(),
                    message: "Update index.html".into(),
                    prior: Some(ContentId("def".into())),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::http(409, "is at abc but expected def"));
    }

    #[test]
    fn address_is_derived_from_owner_and_name() {
        let gh = GithubClient::new(GithubConfig::new("t".into(), "octo".into()));
        let a = gh.address(&name());
        assert_eq!(a.repo_url, "https://github.com/octo/counter-n1");
        assert_eq!(a.pages_url, "https://octo.github.io/counter-n1/");
        assert_eq!(gh.address(&name()), a);
    }
}
