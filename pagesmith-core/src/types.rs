//! Task requests, file records and the identifiers that flow between steps.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// File the generated app lives in. Constant across rounds so round 2
/// overwrites what round 1 published.
pub const ENTRY_FILE: &str = "index.html";

/// Human-readable record of the prompt and the generated code.
pub const SUMMARY_FILE: &str = "README.md";

/// An inbound unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub email: String,
    pub task: String,
    pub round: u8,
    pub nonce: String,
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub checks: Vec<String>,
    pub evaluation_url: String,
    /// Ordered revision briefs, only read for round 2.
    #[serde(default)]
    pub round2: Vec<SubRound>,
}

impl TaskRequest {
    pub fn container(&self) -> ContainerName {
        ContainerName::derive(&self.task, &self.nonce)
    }
}

/// One revision cycle of round 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubRound {
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub checks: Vec<String>,
}

/// A named attachment. `url` must be a `data:` URI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// A named file. When `binary` is set, `content` holds the base64 encoding
/// of the original bytes; otherwise it is the text itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub content: String,
    pub binary: bool,
}

impl FileRecord {
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            binary: false,
        }
    }

    /// Classify raw bytes: valid UTF-8 becomes a text record, anything else
    /// is kept as base64.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::text(name, text),
            Err(e) => Self {
                name: name.into(),
                content: STANDARD.encode(e.into_bytes()),
                binary: true,
            },
        }
    }

    /// The original bytes of the file.
    pub fn raw_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        if self.binary {
            STANDARD.decode(&self.content)
        } else {
            Ok(self.content.as_bytes().to_vec())
        }
    }
}

/// The two files produced by one generation: the app and its summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFileSet {
    pub entry: FileRecord,
    pub summary: FileRecord,
}

impl GeneratedFileSet {
    /// Files in publish order: entry first, then summary.
    pub fn files(&self) -> [&FileRecord; 2] {
        [&self.entry, &self.summary]
    }
}

/// Whether a cycle creates the app from scratch or revises the published one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Revise,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Create => write!(f, "create"),
            Mode::Revise => write!(f, "revise"),
        }
    }
}

/// Repository name, `{task}-{nonce}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn derive(task: &str, nonce: &str) -> Self {
        Self(format!("{task}-{nonce}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blob sha of a file currently in the repository. Required to overwrite it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commit sha produced by a write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(pub String);

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload POSTed to the evaluation endpoint after each publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub email: String,
    pub task: String,
    pub round: u8,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: RevisionId,
    pub pages_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_name_is_task_dash_nonce() {
        let a = ContainerName::derive("captcha-solver", "ab12");
        let b = ContainerName::derive("captcha-solver", "ab12");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "captcha-solver-ab12");
    }

    #[test]
    fn utf8_bytes_become_text_record() {
        let rec = FileRecord::from_bytes("notes.txt", "héllo".as_bytes().to_vec());
        assert!(!rec.binary);
        assert_eq!(rec.content, "héllo");
        assert_eq!(rec.raw_bytes().unwrap(), "héllo".as_bytes());
    }

    #[test]
    fn invalid_utf8_becomes_base64_record() {
        let png_header = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff];
        let rec = FileRecord::from_bytes("logo.png", png_header.clone());
        assert!(rec.binary);
        assert_eq!(rec.content, STANDARD.encode(&png_header));
        assert_eq!(rec.raw_bytes().unwrap(), png_header);
    }

    #[test]
    fn task_request_defaults_optional_lists() {
        let req: TaskRequest = serde_json::from_value(serde_json::json!({
            "email": "student@example.com",
            "task": "counter",
            "round": 1,
            "nonce": "n1",
            "brief": "build a counter app",
            "evaluation_url": "https://example.com/notify"
        }))
        .unwrap();
        assert!(req.attachments.is_empty());
        assert!(req.checks.is_empty());
        assert!(req.round2.is_empty());
        assert_eq!(req.container().as_str(), "counter-n1");
    }

    #[test]
    fn result_record_wire_keys() {
        let rec = ResultRecord {
            email: "e@example.com".into(),
            task: "t".into(),
            round: 2,
            nonce: "n".into(),
            repo_url: "https://github.com/o/t-n".into(),
            commit_sha: RevisionId("abc123".into()),
            pages_url: "https://o.github.io/t-n/".into(),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["commit_sha"], "abc123");
        assert_eq!(v["round"], 2);
        assert_eq!(v["pages_url"], "https://o.github.io/t-n/");
    }
}
