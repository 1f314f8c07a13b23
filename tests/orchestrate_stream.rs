//! End-to-end tests for the streaming run controller against a mock backend.

use std::time::Duration;

use httpmock::prelude::*;
use pestudio::events::StepStatus;
use pestudio::steps::INIT_STEP_ID;
use pestudio::{DatasetExample, OrchestrateRequest, RunController, RunStatus, StudioConfig};

fn dataset() -> Vec<DatasetExample> {
    (0..5)
        .map(|i| DatasetExample {
            input: format!("question {i}"),
            output: format!("answer {i}"),
        })
        .collect()
}

fn request() -> OrchestrateRequest {
    OrchestrateRequest::new("Classify support tickets", "gpt-5-mini", dataset())
}

fn config_for(server: &MockServer) -> StudioConfig {
    StudioConfig {
        base_url: server.base_url(),
        ..StudioConfig::default()
    }
}

fn controller_for(server: &MockServer) -> RunController {
    RunController::new(reqwest::Client::new(), config_for(server))
}

fn sse(events: &[&str]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str("data: ");
        body.push_str(event);
        body.push_str("\n\n");
    }
    body
}

#[tokio::test]
async fn completed_run_reconciles_steps_and_stores_result() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/dspy/orchestrate/stream")
                .header("accept", "text/event-stream")
                .json_body_partial(r#"{"business_task": "Classify support tickets"}"#);
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(sse(&[
                    r#"{"type":"step","step":{"id":"step_1","name":"Analyze Business Goal","tool":"analyze_business_goal","status":"running"}}"#,
                    r#"{"type":"keepalive"}"#,
                    r#"{"type":"step","step":{"id":"step_1","name":"Analyze Business Goal","tool":"analyze_business_goal","status":"success","observation":"task_type=classification"}}"#,
                    r#"{"type":"step","step":{"id":"step_2","name":"Run Compilation","tool":"run_compilation","status":"running"}}"#,
                    r#"{"type":"complete","result":{"success":true,"artifact_id":"v_1234"}}"#,
                ]));
        })
        .await;

    let controller = controller_for(&server);
    let mut handle = controller.start(request()).await;
    let view = handle.wait_terminal().await;

    mock.assert_async().await;
    assert_eq!(view.status, RunStatus::Completed);
    assert_eq!(view.steps.len(), 3);
    assert_eq!(view.steps[0].id, INIT_STEP_ID);
    assert_eq!(view.steps[0].status, StepStatus::Success);
    assert_eq!(view.steps[1].id, "step_1");
    assert_eq!(
        view.steps[1].observation.as_deref(),
        Some("task_type=classification")
    );
    // The step still running at completion was frozen to success.
    assert_eq!(view.steps[2].status, StepStatus::Success);
    assert!(view.steps.iter().all(|s| s.status != StepStatus::Running));
    assert_eq!(
        view.result.as_ref().and_then(|r| r.get("artifact_id")),
        Some(&serde_json::json!("v_1234"))
    );
    assert!(view.error.is_none());
}

#[tokio::test]
async fn backend_error_event_fails_run_and_keeps_history() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/dspy/orchestrate/stream");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(sse(&[
                    r#"{"type":"step","step":{"id":"step_1","name":"Analyze Business Goal","tool":"analyze_business_goal","status":"success"}}"#,
                    r#"{"type":"step","step":{"id":"step_2","name":"Run Compilation","tool":"run_compilation","status":"running"}}"#,
                    r#"{"type":"error","error":"OpenAI API key required for DSPy Agent"}"#,
                ]));
        })
        .await;

    let controller = controller_for(&server);
    let mut handle = controller.start(request()).await;
    let view = handle.wait_terminal().await;

    assert_eq!(view.status, RunStatus::Failed);
    assert_eq!(
        view.error.as_deref(),
        Some("OpenAI API key required for DSPy Agent")
    );
    // Partial history retained; only the in-flight step carries the error.
    assert_eq!(view.steps.len(), 3);
    assert_eq!(view.steps[1].status, StepStatus::Success);
    assert_eq!(view.steps[2].status, StepStatus::Error);
    assert_eq!(
        view.steps[2].error.as_deref(),
        Some("OpenAI API key required for DSPy Agent")
    );
}

#[tokio::test]
async fn undecodable_events_are_skipped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/dspy/orchestrate/stream");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(sse(&[
                    r#"{"type":"mystery","payload":1}"#,
                    "this is not json",
                    r#"{"type":"complete","result":{"success":true}}"#,
                ]));
        })
        .await;

    let controller = controller_for(&server);
    let mut handle = controller.start(request()).await;
    let view = handle.wait_terminal().await;

    assert_eq!(view.status, RunStatus::Completed);
    // Nothing but the init placeholder made it into the list.
    assert_eq!(view.steps.len(), 1);
}

#[tokio::test]
async fn eof_without_terminal_event_is_a_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/dspy/orchestrate/stream");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(sse(&[
                    r#"{"type":"step","step":{"id":"step_1","name":"Analyze Business Goal","tool":"analyze_business_goal","status":"running"}}"#,
                ]));
        })
        .await;

    let controller = controller_for(&server);
    let mut handle = controller.start(request()).await;
    let view = handle.wait_terminal().await;

    assert_eq!(view.status, RunStatus::Failed);
    let error = view.error.expect("error message");
    assert!(error.contains("E-PES-0502"), "unexpected error: {error}");
    // The step that was running when the stream died took the failure.
    assert_eq!(view.steps[1].status, StepStatus::Error);
}

#[tokio::test]
async fn backend_rejection_fails_before_any_step_arrives() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/dspy/orchestrate/stream");
            then.status(400).body("Dataset must have at least 5 examples");
        })
        .await;

    let controller = controller_for(&server);
    let mut handle = controller.start(request()).await;
    let view = handle.wait_terminal().await;

    assert_eq!(view.status, RunStatus::Failed);
    assert!(view
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("Dataset must have at least 5 examples"));
    // Only the init placeholder exists, and it carries the failure.
    assert_eq!(view.steps.len(), 1);
    assert_eq!(view.steps[0].status, StepStatus::Error);
}

#[tokio::test]
async fn starting_a_second_run_cancels_the_first() {
    let server = MockServer::start_async().await;
    // First run hangs long enough to still be "active" when the second starts.
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/dspy/orchestrate/stream");
            then.status(200)
                .header("content-type", "text/event-stream")
                .delay(Duration::from_secs(30))
                .body(sse(&[r#"{"type":"complete","result":{}}"#]));
        })
        .await;

    let controller = controller_for(&server);
    let first = controller.start(request()).await;
    let first_id = first.run_id.clone();
    let second = controller.start(request()).await;

    assert_ne!(first_id, second.run_id);
    assert_eq!(controller.active_run_id().await, Some(second.run_id.clone()));

    // The first producer was aborted: its channel closes without ever
    // reaching a terminal state.
    let mut first = first;
    let closed = tokio::time::timeout(Duration::from_secs(5), first.changed())
        .await
        .expect("first run channel should close");
    assert!(closed.is_none());
    assert_eq!(first.snapshot().status, RunStatus::Running);
}

#[tokio::test]
async fn cancel_is_idempotent_and_clears_the_slot() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/dspy/orchestrate/stream");
            then.status(200)
                .header("content-type", "text/event-stream")
                .delay(Duration::from_secs(30))
                .body(sse(&[r#"{"type":"complete","result":{}}"#]));
        })
        .await;

    let controller = controller_for(&server);
    let _handle = controller.start(request()).await;
    assert!(controller.active_run_id().await.is_some());

    controller.cancel().await;
    assert!(controller.active_run_id().await.is_none());
    controller.cancel().await;
    assert!(controller.active_run_id().await.is_none());
}
