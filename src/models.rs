mod answer_record;
mod batch;
mod reference;

pub use answer_record::{AnswerRecord, AnswerView};
pub use batch::{BatchOutcome, BatchPreview, BatchResult, ExportFile, SpreadsheetFile};
pub use reference::Reference;
