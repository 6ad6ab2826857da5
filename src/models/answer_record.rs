use serde::{Deserialize, Serialize};

use super::Reference;
use crate::sanitizer;

/// Separator used when references are shown or exported on a single line.
pub(crate) const REFERENCE_SEPARATOR: &str = "; ";

/// One answer from the service, paired with the question that produced it.
///
/// The raw answer text is kept exactly as received. Display and export go
/// through [`AnswerRecord::display_answer`], which derives a cleaned copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    question: String,
    raw_answer: String,
    references: Vec<Reference>,
}

impl AnswerRecord {
    /// Creates a new answer record.
    pub fn new(
        question: impl Into<String>,
        raw_answer: impl Into<String>,
        references: Vec<Reference>,
    ) -> Self {
        Self {
            question: question.into(),
            raw_answer: raw_answer.into(),
            references,
        }
    }

    /// Returns the question text as submitted.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Returns the answer text exactly as the service sent it.
    pub fn raw_answer(&self) -> &str {
        &self.raw_answer
    }

    /// Returns the references attached to this answer.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Returns the answer with citation markers and any trailing
    /// `References:` block removed.
    pub fn display_answer(&self) -> String {
        sanitizer::clean(Some(&self.raw_answer))
    }

    /// Returns each reference rendered as a human-readable string.
    pub fn rendered_references(&self) -> Vec<String> {
        self.references.iter().map(ToString::to_string).collect()
    }

    /// Returns all references on one line, separated by `"; "`.
    ///
    /// Empty when the answer has no references.
    pub fn joined_references(&self) -> String {
        self.rendered_references().join(REFERENCE_SEPARATOR)
    }
}

/// Display form of an [`AnswerRecord`]: the cleaned answer and rendered references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerView {
    pub question: String,
    pub answer: String,
    pub references: Vec<String>,
}

impl From<&AnswerRecord> for AnswerView {
    fn from(record: &AnswerRecord) -> Self {
        Self {
            question: record.question().to_string(),
            answer: record.display_answer(),
            references: record.rendered_references(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_answer_leaves_raw_answer_untouched() {
        let record = AnswerRecord::new(
            "What is the refund policy?",
            "Refunds within 30 days [1]. References: see policy doc",
            vec![Reference::chunk("policy.pdf", 2)],
        );

        assert_eq!(record.display_answer(), "Refunds within 30 days.");
        assert_eq!(
            record.raw_answer(),
            "Refunds within 30 days [1]. References: see policy doc"
        );
    }

    #[test]
    fn joined_references_uses_semicolon_separator() {
        let record = AnswerRecord::new(
            "q",
            "a",
            vec![Reference::label("r1"), Reference::chunk("doc.pdf", 0)],
        );
        assert_eq!(record.joined_references(), "r1; doc.pdf (chunk 0)");
    }

    #[test]
    fn joined_references_is_empty_without_references() {
        let record = AnswerRecord::new("q", "a", Vec::new());
        assert_eq!(record.joined_references(), "");
    }

    #[test]
    fn view_carries_cleaned_answer_and_rendered_references() {
        let record = AnswerRecord::new("Q1", "A1 [1]", vec![Reference::label("r1")]);
        let view = AnswerView::from(&record);

        assert_eq!(view.question, "Q1");
        assert_eq!(view.answer, "A1");
        assert_eq!(view.references, vec!["r1".to_string()]);
    }
}
