/// End-to-end tests: the interaction controller driving the real HTTP client
/// against a mock server.
use std::sync::Arc;

use mockito::{Matcher, Mock, Server, ServerGuard};
use rfpbot::{
    ApiClientBuilder, BatchOutcome, ControllerError, Dispatch, FailureKind,
    InteractionController, Phase, SpreadsheetFile,
};
use serde_json::{Value, json};

fn controller_for(server: &ServerGuard) -> InteractionController {
    let client = ApiClientBuilder::new()
        .base_url(server.url())
        .no_proxy()
        .build()
        .expect("Failed to create client");
    InteractionController::new(Arc::new(client))
}

fn json_reply(server: &mut ServerGuard, path: &str, status: usize, body: Value) -> Mock {
    server
        .mock("POST", path)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create()
}

#[test]
fn ask_shows_cleaned_answer_and_chunk_reference() {
    // Arrange
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/ask")
        .match_header("x-api-key", "abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "answer": "Refunds within 30 days [1]. References: see policy doc",
                "references": [{ "source": "policy.pdf", "chunkIndex": 2 }]
            })
            .to_string(),
        )
        .create();
    let controller = controller_for(&server);

    // Act
    let dispatch = controller.ask("What is the refund policy?", "abc");

    // Assert
    let Dispatch::Succeeded(view) = dispatch else {
        panic!("expected success");
    };
    mock.assert();
    assert_eq!(view.answer, "Refunds within 30 days.");
    assert_eq!(view.references, vec!["policy.pdf (chunk 2)".to_string()]);
    assert_eq!(controller.state().ask().phase(), Phase::Success);
}

#[test]
fn batch_results_export_in_order() {
    // Arrange
    let mut server = Server::new();
    let _mock = json_reply(
        &mut server,
        "/upload_excel",
        200,
        json!({ "results": [
            { "question": "Q1", "answer": "A1", "references": ["r1"] },
            { "question": "Q2", "answer": "A2", "references": [] }
        ] }),
    );
    let controller = controller_for(&server);
    let file = SpreadsheetFile::new("questions.xlsx", b"PK\x03\x04".to_vec());

    // Act
    let dispatch = controller.process_batch(Some(&file), "abc");
    let export = controller.export().expect("export should succeed");

    // Assert
    assert!(matches!(dispatch, Dispatch::Succeeded(BatchOutcome::Structured(_))));
    assert_eq!(
        controller.batch_status().as_deref(),
        Some("Successfully processed 2 questions!")
    );
    assert_eq!(export.file_name, "answered_questions.csv");
    assert_eq!(export.content_type, "text/csv;charset=utf-8");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(export.bytes.as_slice());
    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|row| row.unwrap().iter().map(str::to_string).collect())
        .collect();
    assert_eq!(
        rows,
        vec![
            vec!["Question", "Answer", "References"],
            vec!["Q1", "A1", "r1"],
            vec!["Q2", "A2", ""],
        ]
    );
}

#[test]
fn server_error_keeps_previous_answer() {
    // Arrange
    let mut server = Server::new();
    let ok = json_reply(&mut server, "/ask", 200, json!({ "answer": "99.9%", "references": [] }));
    let controller = controller_for(&server);
    controller.ask("What is SLA?", "abc");
    ok.remove();
    let _failing = json_reply(&mut server, "/ask", 500, json!({ "error": "server overloaded" }));

    // Act
    let dispatch = controller.ask("What is RTO?", "abc");

    // Assert
    assert!(matches!(
        dispatch,
        Dispatch::Failed { kind: FailureKind::RequestFailed, .. }
    ));
    let state = controller.state();
    assert_eq!(state.ask().phase(), Phase::Error);
    assert!(state.ask().error_message().unwrap().contains("server overloaded"));
    assert_eq!(state.last_single_answer().unwrap().question(), "What is SLA?");
    assert_eq!(state.last_single_answer().unwrap().raw_answer(), "99.9%");
}

#[test]
fn batch_server_error_keeps_previous_result_and_blocks_export() {
    let mut server = Server::new();
    let ok = json_reply(
        &mut server,
        "/upload_excel",
        200,
        json!({ "results": [{ "question": "Q1", "answer": "A1" }] }),
    );
    let controller = controller_for(&server);
    let file = SpreadsheetFile::new("questions.xlsx", b"x".to_vec());

    controller.process_batch(Some(&file), "abc");
    ok.remove();
    let _failing = json_reply(
        &mut server,
        "/upload_excel",
        500,
        json!({ "error": "server overloaded" }),
    );
    controller.process_batch(Some(&file), "abc");

    let state = controller.state();
    assert_eq!(state.last_batch_result().map(|result| result.len()), Some(1));
    assert_eq!(
        controller.batch_status().as_deref(),
        Some("Error: server overloaded")
    );
    assert!(matches!(
        controller.export(),
        Err(ControllerError::NothingToExport(Phase::Error))
    ));
}

#[test]
fn spreadsheet_download_is_passed_through() {
    let xlsx = b"PK\x03\x04answered".to_vec();
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/upload_excel")
        .with_status(200)
        .with_header(
            "content-type",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .with_body(xlsx.clone())
        .create();
    let controller = controller_for(&server);
    let file = SpreadsheetFile::new("questions.xlsx", b"x".to_vec());

    controller.process_batch(Some(&file), "abc");
    let export = controller.export().expect("export should succeed");

    assert_eq!(export.file_name, "answered_questions.xlsx");
    assert_eq!(export.bytes, xlsx);
    assert_eq!(
        controller.batch_status().as_deref(),
        Some("File downloaded successfully.")
    );
}

#[test]
fn unreachable_service_reports_upload_failure() {
    let client = ApiClientBuilder::new()
        .base_url("http://127.0.0.1:9")
        .no_proxy()
        .build()
        .expect("Failed to create client");
    let controller = InteractionController::new(Arc::new(client));
    let file = SpreadsheetFile::new("questions.xlsx", b"x".to_vec());

    let dispatch = controller.process_batch(Some(&file), "abc");

    assert!(matches!(
        dispatch,
        Dispatch::Failed { kind: FailureKind::TransportError, .. }
    ));
    assert!(controller
        .batch_status()
        .is_some_and(|status| status.starts_with("Upload failed: ")));
}

#[test]
fn validation_errors_send_nothing() {
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();
    let controller = controller_for(&server);

    assert!(matches!(
        controller.ask("", "abc"),
        Dispatch::Failed { kind: FailureKind::InvalidInput, .. }
    ));
    assert!(matches!(
        controller.ask("What is SLA?", ""),
        Dispatch::Failed { kind: FailureKind::InvalidCredential, .. }
    ));
    assert!(matches!(
        controller.process_batch(None, "abc"),
        Dispatch::Failed { kind: FailureKind::InvalidInput, .. }
    ));
    mock.assert();
}
