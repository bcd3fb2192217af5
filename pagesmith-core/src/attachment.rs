//! Attachment decoding.
//!
//! Only inline `data:` URIs are accepted. Anything else is rejected rather
//! than fetched, so a task request can never make this service download
//! arbitrary URLs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::PipelineError;
use crate::types::{Attachment, FileRecord};

const DATA_SCHEME: &str = "data:";

/// Decode attachments into file records, preserving input order.
///
/// Entries with an empty name or url are skipped.
pub fn decode_attachments(attachments: &[Attachment]) -> Result<Vec<FileRecord>, PipelineError> {
    let mut files = Vec::with_capacity(attachments.len());
    for att in attachments {
        if att.name.is_empty() || att.url.is_empty() {
            tracing::debug!(name = %att.name, "Skipping attachment without name or url");
            continue;
        }
        files.push(decode_attachment(att)?);
    }
    Ok(files)
}

/// Decode a single `data:` URI attachment.
pub fn decode_attachment(att: &Attachment) -> Result<FileRecord, PipelineError> {
    let Some(rest) = strip_scheme(&att.url) else {
        return Err(PipelineError::AttachmentSourceUnsupported {
            name: att.name.clone(),
        });
    };
    let decode_err = |cause: String| PipelineError::AttachmentDecode {
        name: att.name.clone(),
        cause,
    };

    // The media type header is ignored: every payload is base64.
    let (_header, payload) = rest
        .split_once(',')
        .ok_or_else(|| decode_err("missing ',' separator".into()))?;
    let bytes = decode_base64_lenient(payload).map_err(|e| decode_err(e.to_string()))?;

    Ok(FileRecord::from_bytes(att.name.clone(), bytes))
}

fn strip_scheme(url: &str) -> Option<&str> {
    let prefix = url.get(..DATA_SCHEME.len())?;
    prefix
        .eq_ignore_ascii_case(DATA_SCHEME)
        .then(|| &url[DATA_SCHEME.len()..])
}

/// Base64 decode after removing whitespace and restoring missing `=` padding.
pub fn decode_base64_lenient(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let missing = cleaned.len() % 4;
    if missing != 0 {
        cleaned.extend(std::iter::repeat_n('=', 4 - missing));
    }
    STANDARD.decode(cleaned)
}
