use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AnswerRecord, AnswerView};

/// Answers for an uploaded spreadsheet, one per input row, in row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult {
    records: Vec<AnswerRecord>,
}

impl BatchResult {
    /// Creates a batch result from records already in row order.
    pub fn new(records: Vec<AnswerRecord>) -> Self {
        Self { records }
    }

    /// Returns the records in row order.
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnswerRecord> {
        self.records.iter()
    }

    /// Returns the first `limit` rows in display form and how many rows were left out.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfpbot::{AnswerRecord, BatchResult};
    ///
    /// let result: BatchResult = (1..=5)
    ///     .map(|i| AnswerRecord::new(format!("Q{i}"), format!("A{i} [1]"), vec![]))
    ///     .collect();
    ///
    /// let preview = result.preview(3);
    /// assert_eq!(preview.rows.len(), 3);
    /// assert_eq!(preview.rows[0].answer, "A1");
    /// assert_eq!(preview.remaining, 2);
    /// ```
    pub fn preview(&self, limit: usize) -> BatchPreview {
        let rows: Vec<AnswerView> = self.records.iter().take(limit).map(AnswerView::from).collect();
        BatchPreview {
            remaining: self.records.len() - rows.len(),
            rows,
        }
    }
}

impl FromIterator<AnswerRecord> for BatchResult {
    fn from_iter<I: IntoIterator<Item = AnswerRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a AnswerRecord;
    type IntoIter = std::slice::Iter<'a, AnswerRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The leading rows of a batch result, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPreview {
    pub rows: Vec<AnswerView>,
    /// Number of rows not included in `rows`.
    pub remaining: usize,
}

/// A file offered to the user for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What the service returned for a batch upload.
///
/// Which variant applies is decided by the response content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// Per-question results, available for preview and export.
    Structured(BatchResult),
    /// A finished spreadsheet from a service that answers uploads with a file.
    RawDownload(ExportFile),
}

impl BatchOutcome {
    /// Returns the structured results, if the service sent them.
    pub fn as_structured(&self) -> Option<&BatchResult> {
        match self {
            Self::Structured(result) => Some(result),
            Self::RawDownload(_) => None,
        }
    }
}

/// A spreadsheet of questions selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetFile {
    file_name: String,
    bytes: Vec<u8>,
}

impl SpreadsheetFile {
    /// Wraps file contents together with the name sent to the service.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads a spreadsheet from disk, keeping its file name for the upload.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "questions.xlsx".to_string());
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
