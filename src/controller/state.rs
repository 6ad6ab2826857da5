//! Lifecycle state of the ask and batch workflows.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::FailureKind;
use crate::models::{AnswerRecord, BatchOutcome, BatchResult};

/// Where a workflow is in its request lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No request has been made yet.
    #[default]
    Idle,
    /// A request is outstanding.
    Loading,
    /// The last request succeeded.
    Success,
    /// The last request (or its validation) failed.
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// State of one workflow: its phase, the latest error, and the latest result.
///
/// The latest result survives later failures and new requests; it is only
/// replaced when another request succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState<T> {
    phase: Phase,
    error_message: Option<String>,
    error_kind: Option<FailureKind>,
    last_result: Option<T>,
}

impl<T> Default for WorkflowState<T> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            error_message: None,
            error_kind: None,
            last_result: None,
        }
    }
}

impl<T> WorkflowState<T> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Returns the message of the latest failure, while in the `Error` phase.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the category of the latest failure, while in the `Error` phase.
    pub fn error_kind(&self) -> Option<FailureKind> {
        self.error_kind
    }

    /// Returns the result of the latest successful request.
    pub fn last_result(&self) -> Option<&T> {
        self.last_result.as_ref()
    }

    /// Enters `Loading`, clearing any previous error. Returns `false` if a
    /// request is already outstanding.
    pub(crate) fn begin(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        self.phase = Phase::Loading;
        self.error_message = None;
        self.error_kind = None;
        true
    }

    pub(crate) fn succeed(&mut self, result: T) {
        self.phase = Phase::Success;
        self.error_message = None;
        self.error_kind = None;
        self.last_result = Some(result);
    }

    pub(crate) fn fail(&mut self, kind: FailureKind, message: String) {
        self.phase = Phase::Error;
        self.error_message = Some(message);
        self.error_kind = Some(kind);
    }
}

/// Everything the controller tracks, for both workflows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionState {
    pub(crate) ask: WorkflowState<AnswerRecord>,
    pub(crate) batch: WorkflowState<BatchOutcome>,
}

impl InteractionState {
    pub fn ask(&self) -> &WorkflowState<AnswerRecord> {
        &self.ask
    }

    pub fn batch(&self) -> &WorkflowState<BatchOutcome> {
        &self.batch
    }

    /// Returns the record of the latest successful ask.
    pub fn last_single_answer(&self) -> Option<&AnswerRecord> {
        self.ask.last_result()
    }

    /// Returns the latest structured batch result.
    ///
    /// `None` when no batch has succeeded yet or the latest one came back as
    /// a file download.
    pub fn last_batch_result(&self) -> Option<&BatchResult> {
        self.batch.last_result().and_then(BatchOutcome::as_structured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_workflow_is_idle_and_empty() {
        let state: WorkflowState<String> = WorkflowState::default();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.error_message().is_none());
        assert!(state.last_result().is_none());
    }

    #[test]
    fn begin_refuses_while_loading() {
        let mut state: WorkflowState<String> = WorkflowState::default();
        assert!(state.begin());
        assert!(!state.begin());
        assert_eq!(state.phase(), Phase::Loading);
    }

    #[test]
    fn begin_clears_error_but_keeps_last_result() {
        let mut state = WorkflowState::default();
        state.succeed("first".to_string());
        state.begin();
        state.fail(FailureKind::RequestFailed, "boom".to_string());
        assert_eq!(state.error_message(), Some("boom"));

        assert!(state.begin());
        assert_eq!(state.phase(), Phase::Loading);
        assert!(state.error_message().is_none());
        assert!(state.error_kind().is_none());
        assert_eq!(state.last_result().map(String::as_str), Some("first"));
    }

    #[test]
    fn failure_keeps_previous_result() {
        let mut state = WorkflowState::default();
        state.succeed(1);
        state.fail(FailureKind::TransportError, "offline".to_string());

        assert_eq!(state.phase(), Phase::Error);
        assert_eq!(state.error_kind(), Some(FailureKind::TransportError));
        assert_eq!(state.last_result(), Some(&1));
    }

    #[test]
    fn interaction_state_serializes_phases_in_lowercase() {
        let mut state = InteractionState::default();
        state.ask.begin();

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["ask"]["phase"], "loading");
        assert_eq!(json["batch"]["phase"], "idle");
    }
}
