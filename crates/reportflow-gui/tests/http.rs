use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use reportflow_core::{CompletionProvider, CompletionRequest, ReportFlowError};
use reportflow_gui::config::AppConfig;
use reportflow_gui::routes::build_router;
use reportflow_gui::state::AppState;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout, Duration};
use tokio_stream::StreamExt;

const REPORT_JSON: &str = r#"{
    "executive_summary": "S",
    "findings": [{"title": "X", "description": "D", "importance": "high"}],
    "recommendations": [{"action": "A", "rationale": "R", "priority": 3}],
    "conclusion": "C"
}"#;

struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn happy_path() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                ["notes", "insights", REPORT_JSON]
                    .iter()
                    .rev()
                    .map(|s| s.to_string())
                    .collect(),
            ),
        })
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, ReportFlowError> {
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ReportFlowError::Provider("script exhausted".into()))
    }
}

/// Blocks its first completion until the test opens the gate, so a run can
/// be held in flight while the stream is inspected.
struct GatedProvider {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    replies: Mutex<Vec<String>>,
}

impl GatedProvider {
    fn new(gate: oneshot::Receiver<()>) -> Arc<Self> {
        Arc::new(Self {
            gate: Mutex::new(Some(gate)),
            replies: Mutex::new(
                ["notes", "insights", REPORT_JSON]
                    .iter()
                    .rev()
                    .map(|s| s.to_string())
                    .collect(),
            ),
        })
    }
}

#[async_trait]
impl CompletionProvider for GatedProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, ReportFlowError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ReportFlowError::Provider("script exhausted".into()))
    }
}

struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, ReportFlowError> {
        Err(ReportFlowError::ProviderStatus {
            status: 500,
            body: "provider exploded".into(),
        })
    }
}

fn base_config() -> AppConfig {
    AppConfig {
        listen_addr: "127.0.0.1:0".into(),
        max_concurrency: 2,
    }
}

fn server_with(provider: Arc<dyn CompletionProvider>) -> TestServer {
    let state = AppState::new(&base_config(), provider);
    TestServer::new(build_router(state)).unwrap()
}

async fn wait_for_terminal_state(server: &TestServer, analysis_id: &str) -> serde_json::Value {
    timeout(Duration::from_secs(5), async {
        loop {
            let response = server.get(&format!("/api/analyses/{analysis_id}")).await;
            assert_eq!(response.status_code(), 200);
            let body = response.json::<serde_json::Value>();
            if body["state"] != "running" {
                return body;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("analysis did not finish in time")
}

#[tokio::test]
async fn index_serves_the_form_page() {
    let server = server_with(ScriptedProvider::happy_path());

    let response = server.get("/").await;
    assert_eq!(response.status_code(), 200);
    let body = response.text();
    assert!(body.contains("Research Analysis Flow"));
    assert!(body.contains("AI trends in 2024"));
}

#[tokio::test]
async fn blank_topic_is_rejected_without_running() {
    let server = server_with(ScriptedProvider::happy_path());

    let response = server
        .post("/api/analyses")
        .json(&json!({ "topic": "   " }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error"], "Please enter a topic to research.");
}

#[tokio::test]
async fn analysis_runs_to_a_formatted_report() {
    let server = server_with(ScriptedProvider::happy_path());

    let response = server
        .post("/api/analyses")
        .json(&json!({ "topic": "AI trends in 2024" }))
        .await;
    assert_eq!(response.status_code(), 202);
    let analysis_id = response.json::<serde_json::Value>()["analysis_id"]
        .as_str()
        .unwrap()
        .to_string();

    let body = wait_for_terminal_state(&server, &analysis_id).await;
    assert_eq!(body["state"], "completed");
    let report = body["report"].as_str().unwrap();
    assert!(report.starts_with("# Research Report: AI trends in 2024"));
    assert!(report.contains("### X (high importance)"));
}

#[tokio::test]
async fn failed_analysis_surfaces_a_single_error_string() {
    let server = server_with(Arc::new(FailingProvider));

    let response = server
        .post("/api/analyses")
        .json(&json!({ "topic": "doomed" }))
        .await;
    assert_eq!(response.status_code(), 202);
    let analysis_id = response.json::<serde_json::Value>()["analysis_id"]
        .as_str()
        .unwrap()
        .to_string();

    let body = wait_for_terminal_state(&server, &analysis_id).await;
    assert_eq!(body["state"], "failed");
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Error during analysis:"), "got: {error}");
    assert!(body["report"].is_null());
}

#[tokio::test]
async fn stream_carries_processing_then_completed() {
    let (release, gate) = oneshot::channel();
    let state = AppState::new(&base_config(), GatedProvider::new(gate));
    let server = TestServer::new(build_router(state.clone())).unwrap();

    let response = server
        .post("/api/analyses")
        .json(&json!({ "topic": "in flight" }))
        .await;
    assert_eq!(response.status_code(), 202);
    let analysis_id = response.json::<serde_json::Value>()["analysis_id"]
        .as_str()
        .unwrap()
        .to_string();

    // The research stage is still waiting on the gate, so this subscribes
    // to a running analysis.
    let mut stream = state
        .analysis_service()
        .event_stream(&analysis_id)
        .expect("stream for running analysis");

    let first = timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("first event in time")
        .expect("stream should be open")
        .unwrap();
    let first = format!("{first:?}");
    assert!(first.contains("processing"), "got: {first}");
    assert!(
        first.contains("The multi-agent crew is analyzing your topic"),
        "got: {first}"
    );

    release.send(()).expect("run should still be waiting");

    let mut saw_completed = false;
    while let Some(event) = timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("stream should finish in time")
    {
        if format!("{:?}", event.unwrap()).contains("completed") {
            saw_completed = true;
        }
    }
    assert!(saw_completed, "stream should end with the completed event");
}

#[tokio::test]
async fn stream_replays_final_event_after_completion() {
    let server = server_with(ScriptedProvider::happy_path());

    let response = server
        .post("/api/analyses")
        .json(&json!({ "topic": "renewables" }))
        .await;
    let analysis_id = response.json::<serde_json::Value>()["analysis_id"]
        .as_str()
        .unwrap()
        .to_string();

    wait_for_terminal_state(&server, &analysis_id).await;

    let response = server
        .get(&format!("/api/analyses/{analysis_id}/stream"))
        .await;
    assert_eq!(response.status_code(), 200);
    let body = response.text();
    assert!(body.contains("event: completed"), "got: {body}");
    assert!(body.contains("Research Report"));
}

#[tokio::test]
async fn unknown_analysis_is_not_found() {
    let server = server_with(ScriptedProvider::happy_path());

    let response = server.get("/api/analyses/nope").await;
    assert_eq!(response.status_code(), 404);

    let response = server.get("/api/analyses/nope/stream").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn health_endpoints_report_capacity() {
    let server = server_with(ScriptedProvider::happy_path());

    let response = server.get("/health/live").await;
    assert_eq!(response.status_code(), 200);

    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), 200);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["metrics"]["max_concurrency"], 2);
}
