//! Interaction controller for the ask and batch workflows.
//!
//! The controller owns the lifecycle state of both workflows and is the only
//! place that moves them between phases. Each workflow allows at most one
//! outstanding request; the two workflows are independent of each other.

mod state;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{AnswerApi, ClientError, FailureKind, validate_credential, validate_question};
use crate::export::{self, ExportError};
use crate::models::{AnswerView, BatchOutcome, BatchPreview, ExportFile, SpreadsheetFile};

pub use state::{InteractionState, Phase, WorkflowState};

/// Result of a start action on a workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<T> {
    /// The workflow already had a request outstanding; nothing was sent.
    AlreadyLoading,
    /// The request succeeded.
    Succeeded(T),
    /// Validation or the request failed; the workflow is now in `Error`.
    Failed { kind: FailureKind, message: String },
}

impl<T> Dispatch<T> {
    pub fn is_already_loading(&self) -> bool {
        matches!(self, Self::AlreadyLoading)
    }
}

/// Errors from controller operations that do not issue requests.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("No batch results to export (batch workflow is {0})")]
    NothingToExport(Phase),

    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, Copy)]
enum Workflow {
    Ask,
    Batch,
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ask => write!(f, "ask"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

/// Drives the ask and batch workflows against an [`AnswerApi`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use rfpbot::{ApiClientBuilder, Dispatch, InteractionController};
///
/// let client = ApiClientBuilder::new().build().expect("Failed to create client");
/// let controller = InteractionController::new(Arc::new(client));
///
/// if let Dispatch::Succeeded(view) = controller.ask("What is the refund policy?", "my-key") {
///     println!("{}", view.answer);
/// }
/// ```
pub struct InteractionController {
    api: Arc<dyn AnswerApi>,
    state: Mutex<InteractionState>,
}

impl InteractionController {
    /// Creates a controller with both workflows idle.
    pub fn new(api: Arc<dyn AnswerApi>) -> Self {
        Self {
            api,
            state: Mutex::new(InteractionState::default()),
        }
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> InteractionState {
        self.lock_state().clone()
    }

    /// Asks a single question.
    ///
    /// Does nothing and returns [`Dispatch::AlreadyLoading`] while a previous
    /// ask is outstanding. An empty question or key puts the workflow in
    /// `Error` without sending anything. On success the returned view carries
    /// the cleaned answer; the state keeps the raw record.
    pub fn ask(&self, question: &str, credential: &str) -> Dispatch<AnswerView> {
        let validation =
            validate_credential(credential).and_then(|_| validate_question(question));

        self.dispatch(
            Workflow::Ask,
            |state| &mut state.ask,
            validation,
            || self.api.ask(question, credential),
            |record| AnswerView::from(record),
        )
    }

    /// Uploads a spreadsheet of questions.
    ///
    /// `file` is `None` when the user has not selected one, which puts the
    /// workflow in `Error` without sending anything. The returned outcome is
    /// also kept as the workflow's latest result; a
    /// [`BatchOutcome::RawDownload`] should be saved by the caller right away.
    pub fn process_batch(
        &self,
        file: Option<&SpreadsheetFile>,
        credential: &str,
    ) -> Dispatch<BatchOutcome> {
        let validation = match file {
            Some(_) => validate_credential(credential).map(|_| ()),
            None => Err(ClientError::InvalidInput("No file selected".to_string())),
        };

        self.dispatch(
            Workflow::Batch,
            |state| &mut state.batch,
            validation,
            || match file {
                Some(file) => self.api.process_batch(file, credential),
                None => Err(ClientError::InvalidInput("No file selected".to_string())),
            },
            BatchOutcome::clone,
        )
    }

    /// Produces the download for the latest successful batch.
    ///
    /// Structured results are exported as `answered_questions.csv`; a file the
    /// service sent directly is handed back unchanged.
    ///
    /// # Errors
    ///
    /// Returns `NothingToExport` unless the batch workflow is in `Success`.
    pub fn export(&self) -> Result<ExportFile, ControllerError> {
        let state = self.lock_state();
        let batch = state.batch();
        match (batch.phase(), batch.last_result()) {
            (Phase::Success, Some(BatchOutcome::Structured(result))) => {
                Ok(export::export_batch(result)?)
            }
            (Phase::Success, Some(BatchOutcome::RawDownload(file))) => Ok(file.clone()),
            (phase, _) => Err(ControllerError::NothingToExport(phase)),
        }
    }

    /// Returns the first `limit` rows of the latest structured batch result.
    pub fn preview(&self, limit: usize) -> Option<BatchPreview> {
        self.lock_state()
            .last_batch_result()
            .map(|result| result.preview(limit))
    }

    /// Returns a one-line status for the batch workflow, if it has finished.
    pub fn batch_status(&self) -> Option<String> {
        let state = self.lock_state();
        let batch = state.batch();
        match batch.phase() {
            Phase::Idle | Phase::Loading => None,
            Phase::Success => batch.last_result().map(|outcome| match outcome {
                BatchOutcome::Structured(result) => {
                    format!("Successfully processed {} questions!", result.len())
                }
                BatchOutcome::RawDownload(_) => "File downloaded successfully.".to_string(),
            }),
            Phase::Error => {
                let message = batch.error_message().unwrap_or_default();
                Some(match batch.error_kind() {
                    Some(FailureKind::TransportError) => format!("Upload failed: {message}"),
                    _ => format!("Error: {message}"),
                })
            }
        }
    }

    /// Runs one start action: guard against a second request, validate,
    /// call the service outside the lock, then record the outcome.
    fn dispatch<T, R>(
        &self,
        workflow: Workflow,
        slot: fn(&mut InteractionState) -> &mut WorkflowState<T>,
        validation: Result<(), ClientError>,
        request: impl FnOnce() -> Result<T, ClientError>,
        present: impl FnOnce(&T) -> R,
    ) -> Dispatch<R> {
        {
            let mut state = self.lock_state();
            let workflow_state = slot(&mut *state);

            if !workflow_state.begin() {
                info!(%workflow, "request already in flight, ignoring start action");
                return Dispatch::AlreadyLoading;
            }

            if let Err(e) = validation {
                debug!(%workflow, kind = %e.kind(), "start action rejected");
                let (kind, message) = (e.kind(), e.to_string());
                workflow_state.fail(kind, message.clone());
                return Dispatch::Failed { kind, message };
            }
            debug!(%workflow, "phase -> loading");
        }

        let result = request();

        let mut state = self.lock_state();
        let workflow_state = slot(&mut *state);
        match result {
            Ok(value) => {
                let presented = present(&value);
                workflow_state.succeed(value);
                debug!(%workflow, "phase -> success");
                Dispatch::Succeeded(presented)
            }
            Err(e) => {
                warn!(%workflow, kind = %e.kind(), error = %e, "phase -> error");
                let (kind, message) = (e.kind(), e.to_string());
                workflow_state.fail(kind, message.clone());
                Dispatch::Failed { kind, message }
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, InteractionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
