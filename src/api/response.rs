//! Normalization of raw HTTP replies.
//!
//! Everything here is pure: the client reads the reply off the wire into an
//! `HttpReply` and these functions decide what it means.

use serde_json::Value;

use super::client::ClientError;
use crate::models::{AnswerRecord, BatchOutcome, BatchResult, ExportFile, Reference};

/// Answer shown when the service replies without one.
pub(crate) const NO_ANSWER: &str = "No answer found.";

/// File name used for a spreadsheet download that does not name itself.
const DEFAULT_DOWNLOAD_NAME: &str = "answered_questions.xlsx";

/// A fully read HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl HttpReply {
    /// Creates a reply with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            content_disposition: None,
            body: body.into(),
        }
    }

    /// Creates a reply carrying a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string()).with_content_type("application/json")
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_content_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the status line text, e.g. `"500 Internal Server Error"`.
    pub fn status_text(&self) -> String {
        let reason = reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason());
        match reason {
            Some(reason) => format!("{} {}", self.status, reason),
            None => self.status.to_string(),
        }
    }

    /// Returns the `error` message from a JSON body, or the status text.
    fn failure_detail(&self) -> String {
        serde_json::from_slice::<Value>(&self.body)
            .ok()
            .and_then(|json| json.get("error").and_then(Value::as_str).map(str::to_string))
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| self.status_text())
    }

    fn request_failed(&self) -> ClientError {
        ClientError::RequestFailed {
            status: self.status,
            detail: self.failure_detail(),
        }
    }

    fn parse_json(&self) -> Result<Value, ClientError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ClientError::Transport(format!("Malformed JSON response: {e}")))
    }
}

/// Interprets the reply to an ask request.
///
/// A missing or empty `answer` becomes `"No answer found."` and a missing
/// `references` list becomes an empty one.
///
/// # Errors
///
/// `RequestFailed` for a non-2xx status, `Transport` for a body that is not JSON.
pub fn parse_ask_reply(question: &str, reply: &HttpReply) -> Result<AnswerRecord, ClientError> {
    if !reply.is_success() {
        return Err(reply.request_failed());
    }

    let json = reply.parse_json()?;
    let answer = json
        .get("answer")
        .and_then(Value::as_str)
        .filter(|answer| !answer.is_empty())
        .unwrap_or(NO_ANSWER);

    Ok(AnswerRecord::new(question, answer, parse_references(&json)))
}

/// Interprets the reply to a batch upload.
///
/// The content type decides the shape: JSON bodies are read as per-question
/// `results`, anything else is handed back as a file to download.
///
/// # Errors
///
/// `RequestFailed` for a non-2xx status, `Transport` for a JSON body that does
/// not parse, `UnexpectedResponseShape` when the reply declares no content type.
pub fn parse_batch_reply(reply: &HttpReply) -> Result<BatchOutcome, ClientError> {
    if !reply.is_success() {
        return Err(reply.request_failed());
    }

    let Some(content_type) = reply.content_type.as_deref() else {
        return Err(ClientError::UnexpectedResponseShape(
            "batch reply has no content type".to_string(),
        ));
    };

    if is_json_media_type(content_type) {
        let json = reply.parse_json()?;
        let records = json
            .get("results")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(parse_batch_row).collect())
            .unwrap_or_default();
        return Ok(BatchOutcome::Structured(BatchResult::new(records)));
    }

    let file_name = reply
        .content_disposition
        .as_deref()
        .and_then(disposition_file_name)
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());

    Ok(BatchOutcome::RawDownload(ExportFile {
        file_name,
        content_type: content_type.to_string(),
        bytes: reply.body.clone(),
    }))
}

fn parse_references(json: &Value) -> Vec<Reference> {
    json.get("references")
        .and_then(Value::as_array)
        .map(|references| references.iter().map(Reference::from_json).collect())
        .unwrap_or_default()
}

/// Rows keep their position even when fields are missing, so the result
/// stays aligned with the uploaded spreadsheet.
fn parse_batch_row(row: &Value) -> AnswerRecord {
    let question = row.get("question").and_then(Value::as_str).unwrap_or_default();
    let answer = row.get("answer").and_then(Value::as_str).unwrap_or_default();
    AnswerRecord::new(question, answer, parse_references(row))
}

fn is_json_media_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json" || media_type.ends_with("+json")
}

/// Returns the bare file name from a `Content-Disposition` header.
///
/// Only the last path component is kept, so the name can never point outside
/// the directory it is saved in.
fn disposition_file_name(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|name| name.trim_matches('"'))
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
}
