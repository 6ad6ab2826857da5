//! CSV export of answered questions.

use thiserror::Error;

use crate::models::{AnswerRecord, BatchResult, ExportFile};

/// File name offered for the exported table.
pub const EXPORT_FILE_NAME: &str = "answered_questions.csv";

/// Content type of the exported table.
pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

const HEADER: [&str; 3] = ["Question", "Answer", "References"];

/// Errors that can occur while writing the export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write CSV row: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush CSV output: {0}")]
    Flush(String),
}

/// Serializes records into a UTF-8 CSV table with a `Question,Answer,References` header.
///
/// Each record becomes one row, in input order: the question as submitted,
/// the cleaned answer, and the rendered references joined with `"; "`.
/// Only fields containing a comma, a double quote or a line break are quoted,
/// with inner quotes doubled. Rows end with `\n`.
///
/// # Examples
///
/// ```
/// use rfpbot::export::to_downloadable_table;
/// use rfpbot::{AnswerRecord, Reference};
///
/// let records = vec![AnswerRecord::new("Q1", "A1 [1]", vec![Reference::label("r1")])];
/// let table = to_downloadable_table(&records).unwrap();
/// assert_eq!(table, b"Question,Answer,References\nQ1,A1,r1\n");
/// ```
///
/// # Errors
///
/// Returns an error if the CSV writer fails.
pub fn to_downloadable_table<'a, I>(records: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = &'a AnswerRecord>,
{
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for record in records {
        let answer = record.display_answer();
        let references = record.joined_references();
        writer.write_record([record.question(), answer.as_str(), references.as_str()])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))
}

/// Exports a batch result as the `answered_questions.csv` download.
///
/// # Errors
///
/// Returns an error if the CSV writer fails.
pub fn export_batch(result: &BatchResult) -> Result<ExportFile, ExportError> {
    Ok(ExportFile {
        file_name: EXPORT_FILE_NAME.to_string(),
        content_type: CSV_CONTENT_TYPE.to_string(),
        bytes: to_downloadable_table(result)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reference;

    fn read_rows(bytes: &[u8]) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes)
            .records()
            .map(|row| row.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn zero_records_yield_header_only() {
        let table = to_downloadable_table(&Vec::<AnswerRecord>::new()).unwrap();
        assert_eq!(table, b"Question,Answer,References\n");
        assert_eq!(read_rows(&table).len(), 1);
    }

    #[test]
    fn plain_fields_are_not_quoted() {
        let records = vec![AnswerRecord::new("What is SLA", "99.9 percent", Vec::new())];
        let table = String::from_utf8(to_downloadable_table(&records).unwrap()).unwrap();
        assert_eq!(table, "Question,Answer,References\nWhat is SLA,99.9 percent,\n");
    }

    #[test]
    fn special_characters_are_quoted_and_round_trip() {
        let answer = "Yes, we support \"SSO\"\nvia SAML";
        let records = vec![AnswerRecord::new(
            "Do you support SSO?",
            format!("{answer} [1]"),
            vec![Reference::label("sso, guide"), Reference::chunk("saml.pdf", 1)],
        )];

        let table = to_downloadable_table(&records).unwrap();
        let text = String::from_utf8(table.clone()).unwrap();
        assert!(text.contains("\"Yes, we support \"\"SSO\"\"\nvia SAML\""));

        let rows = read_rows(&table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "Do you support SSO?");
        assert_eq!(rows[1][1], answer);
        assert_eq!(rows[1][2], "sso, guide; saml.pdf (chunk 1)");
    }

    #[test]
    fn question_with_every_special_character_round_trips() {
        let question = "Cost, \"total\"\nper year?";
        let records = vec![AnswerRecord::new(question, "See pricing.", Vec::new())];

        let rows = read_rows(&to_downloadable_table(&records).unwrap());
        assert_eq!(rows[1][0], question);
    }

    #[test]
    fn rows_follow_input_order() {
        let records: Vec<AnswerRecord> = (1..=5)
            .map(|i| AnswerRecord::new(format!("q{i}"), format!("a{i}"), Vec::new()))
            .collect();

        let rows = read_rows(&to_downloadable_table(&records).unwrap());
        let questions: Vec<&str> = rows[1..].iter().map(|row| row[0].as_str()).collect();
        assert_eq!(questions, vec!["q1", "q2", "q3", "q4", "q5"]);
    }

    #[test]
    fn answers_are_exported_cleaned() {
        let records = vec![AnswerRecord::new(
            "q",
            "Answer [2]. References: [1] dump",
            Vec::new(),
        )];
        let rows = read_rows(&to_downloadable_table(&records).unwrap());
        assert_eq!(rows[1][1], "Answer.");
    }

    #[test]
    fn export_batch_names_the_file() {
        let result = BatchResult::new(vec![AnswerRecord::new("q", "a", Vec::new())]);
        let file = export_batch(&result).unwrap();

        assert_eq!(file.file_name, "answered_questions.csv");
        assert_eq!(file.content_type, "text/csv;charset=utf-8");
        assert_eq!(file.bytes, b"Question,Answer,References\nq,a,\n");
    }
}
