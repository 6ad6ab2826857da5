/// HTTP client for the question-answering service.
///
/// This module provides `ApiClient` for making synchronous requests to the service,
/// along with the error type, the `AnswerApi` trait and a builder for configuration.
use std::fmt;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, warn};

use super::response::{HttpReply, parse_ask_reply, parse_batch_reply};
use crate::models::{AnswerRecord, BatchOutcome, SpreadsheetFile};

/// Header carrying the caller's API key on every request.
pub const API_KEY_HEADER: &str = "X-API-KEY";

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_TOP_K: usize = 3;
const DEFAULT_BATCH_PATH: &str = "/upload_excel";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidCredential,
    InvalidInput,
    RequestFailed,
    TransportError,
    UnexpectedResponseShape,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential => write!(f, "invalid_credential"),
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::RequestFailed => write!(f, "request_failed"),
            Self::TransportError => write!(f, "transport_error"),
            Self::UnexpectedResponseShape => write!(f, "unexpected_response_shape"),
        }
    }
}

/// Errors that can occur when talking to the answering service.
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No API key, or one made only of whitespace. Raised before any request.
    #[error("API key is missing")]
    InvalidCredential,

    /// Empty question, missing file, or unusable client configuration.
    #[error("{0}")]
    InvalidInput(String),

    /// The service answered with a non-2xx status.
    #[error("{detail}")]
    RequestFailed { status: u16, detail: String },

    /// Network failure, timeout, or a body that could not be read or parsed.
    #[error("{0}")]
    Transport(String),

    /// A success reply whose shape cannot be interpreted without guessing.
    #[error("Unexpected response: {0}")]
    UnexpectedResponseShape(String),
}

impl ClientError {
    /// Returns the category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidCredential => FailureKind::InvalidCredential,
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::RequestFailed { .. } => FailureKind::RequestFailed,
            Self::Transport(_) => FailureKind::TransportError,
            Self::UnexpectedResponseShape(_) => FailureKind::UnexpectedResponseShape,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

/// Checks that an API key was supplied, returning it as given.
///
/// The key is otherwise opaque; surrounding whitespace is sent unchanged.
///
/// # Errors
///
/// Returns `InvalidCredential` for an empty or whitespace-only key.
pub fn validate_credential(credential: &str) -> Result<&str, ClientError> {
    if credential.trim().is_empty() {
        return Err(ClientError::InvalidCredential);
    }
    Ok(credential)
}

/// Checks that a question has some text in it.
///
/// # Errors
///
/// Returns `InvalidInput` for an empty or whitespace-only question.
pub fn validate_question(question: &str) -> Result<(), ClientError> {
    if question.trim().is_empty() {
        return Err(ClientError::InvalidInput(
            "Question cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Builder for constructing `ApiClient` instances.
///
/// # Examples
///
/// ```
/// use rfpbot::ApiClientBuilder;
///
/// let client = ApiClientBuilder::new()
///     .base_url("http://localhost:5000")
///     .top_k(5)
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.top_k(), 5);
/// ```
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    top_k: Option<usize>,
    batch_path: Option<String>,
    timeout: Option<Duration>,
    no_proxy: bool,
}

impl ApiClientBuilder {
    /// Creates a new `ApiClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the answering service (e.g. "http://localhost:5000").
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets how many passages the service should retrieve per question.
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Sets the path of the batch upload endpoint.
    pub fn batch_path(mut self, path: impl Into<String>) -> Self {
        self.batch_path = Some(path.into());
        self
    }

    /// Sets the overall timeout for a single request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ignores proxy settings from the environment.
    pub fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    /// Builds the `ApiClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// If `base_url()` was not called, `RFPBOT_HOST` is used, falling back to
    /// `http://localhost:5000`. If `top_k()` was not called, `RFPBOT_TOP_K` is
    /// used when it holds a positive integer, falling back to 3.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the base URL does not parse or `top_k` is zero,
    /// and `Transport` if the underlying HTTP client cannot be created.
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => std::env::var("RFPBOT_HOST").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        reqwest::Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidInput(format!("Invalid URL {base_url}: {e}")))?;

        let top_k = match self.top_k {
            Some(top_k) => top_k,
            None => top_k_from_env(),
        };
        if top_k == 0 {
            return Err(ClientError::InvalidInput(
                "top_k must be at least 1".to_string(),
            ));
        }

        let batch_path = self
            .batch_path
            .unwrap_or_else(|| DEFAULT_BATCH_PATH.to_string());
        let batch_path = if batch_path.starts_with('/') {
            batch_path
        } else {
            format!("/{batch_path}")
        };

        let mut builder = reqwest::blocking::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .connect_timeout(Duration::from_secs(5));
        if self.no_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(ApiClient {
            client,
            base_url,
            top_k,
            batch_path,
        })
    }
}

fn top_k_from_env() -> usize {
    match std::env::var("RFPBOT_TOP_K") {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|top_k| *top_k > 0)
            .unwrap_or_else(|| {
                warn!(value = %raw, "ignoring invalid RFPBOT_TOP_K");
                DEFAULT_TOP_K
            }),
        Err(_) => DEFAULT_TOP_K,
    }
}

/// Operations offered by the answering service.
///
/// This trait is the seam between the interaction controller and the network,
/// so the controller can be driven by a mock in tests.
pub trait AnswerApi: Send + Sync {
    /// Asks a single question.
    fn ask(&self, question: &str, credential: &str) -> Result<AnswerRecord, ClientError>;

    /// Uploads a spreadsheet of questions and returns the answers.
    fn process_batch(
        &self,
        file: &SpreadsheetFile,
        credential: &str,
    ) -> Result<BatchOutcome, ClientError>;
}

/// Synchronous HTTP client for the answering service.
///
/// It should be constructed using `ApiClientBuilder`.
#[derive(Debug)]
pub struct ApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    top_k: usize,
    batch_path: String,
}

impl ApiClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the retrieval size sent with every question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Returns the full URL of the batch upload endpoint.
    pub fn batch_url(&self) -> String {
        format!("{}{}", self.base_url, self.batch_path)
    }

    fn ask_internal(&self, question: &str, credential: &str) -> Result<AnswerRecord, ClientError> {
        let credential = validate_credential(credential)?;
        validate_question(question)?;

        let url = format!("{}/ask", self.base_url);
        let request_body = serde_json::json!({
            "question": question,
            "top_k": self.top_k,
        });
        debug!(%url, top_k = self.top_k, "sending ask request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, credential)
            .json(&request_body)
            .send()?;

        let reply = read_reply(response)?;
        parse_ask_reply(question, &reply).inspect_err(|e| {
            warn!(status = reply.status, kind = %e.kind(), "ask request failed");
        })
    }

    fn process_batch_internal(
        &self,
        file: &SpreadsheetFile,
        credential: &str,
    ) -> Result<BatchOutcome, ClientError> {
        let credential = validate_credential(credential)?;

        let url = self.batch_url();
        debug!(
            %url,
            file_name = file.file_name(),
            size = file.bytes().len(),
            "uploading batch file"
        );

        let part = Part::bytes(file.bytes().to_vec()).file_name(file.file_name().to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, credential)
            .multipart(form)
            .send()?;

        let reply = read_reply(response)?;
        parse_batch_reply(&reply).inspect_err(|e| {
            warn!(status = reply.status, kind = %e.kind(), "batch upload failed");
        })
    }
}

impl AnswerApi for ApiClient {
    fn ask(&self, question: &str, credential: &str) -> Result<AnswerRecord, ClientError> {
        self.ask_internal(question, credential)
    }

    fn process_batch(
        &self,
        file: &SpreadsheetFile,
        credential: &str,
    ) -> Result<BatchOutcome, ClientError> {
        self.process_batch_internal(file, credential)
    }
}

/// Reads status, the headers the parsers need, and the whole body.
fn read_reply(response: reqwest::blocking::Response) -> Result<HttpReply, ClientError> {
    let status = response.status().as_u16();
    let header = |name: reqwest::header::HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header(CONTENT_TYPE);
    let content_disposition = header(CONTENT_DISPOSITION);
    let body = response.bytes()?.to_vec();

    Ok(HttpReply {
        status,
        content_type,
        content_disposition,
        body,
    })
}
