//! Client for the question-answering service's HTTP API.
//!
//! Provides the ask and batch-upload requests, the `AnswerApi` trait the
//! interaction controller depends on, and the normalization of raw HTTP
//! replies into answers or `ClientError` values.
mod client;
mod response;

pub use client::{
    API_KEY_HEADER, AnswerApi, ApiClient, ApiClientBuilder, ClientError, FailureKind,
    validate_credential, validate_question,
};
pub use response::{HttpReply, parse_ask_reply, parse_batch_reply};
