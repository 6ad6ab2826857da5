pub mod api;
pub mod controller;
pub mod export;
pub mod models;
pub mod sanitizer;
pub mod storage;
pub mod utils;

pub use api::{AnswerApi, ApiClient, ApiClientBuilder, ClientError, FailureKind};
pub use controller::{
    ControllerError, Dispatch, InteractionController, InteractionState, Phase, WorkflowState,
};
pub use export::ExportError;
pub use models::{
    AnswerRecord, AnswerView, BatchOutcome, BatchPreview, BatchResult, ExportFile, Reference,
    SpreadsheetFile,
};
pub use storage::{API_KEY_STORAGE_KEY, LocalStorage, StorageError};
