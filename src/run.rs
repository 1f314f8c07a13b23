//! Streaming run controller for DSPy orchestration jobs.
//!
//! One controller drives at most one active run. Starting a run opens the
//! backend's SSE endpoint, seeds the step list with the init placeholder, and
//! spawns a producer task that decodes events, reconciles them into the run
//! view, and publishes snapshots over a watch channel. Cancelling aborts the
//! producer; a terminal event drops the connection and freezes the view.

use std::sync::Arc;

use eventsource_stream::Eventsource;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::config::{errors as config_errors, limits};
use crate::core::StudioConfig;
use crate::dataset::DatasetExample;
use crate::events::{decode_event, OrchestratorEvent, StepEvent};
use crate::net::join_endpoint;
use crate::steps::{fail_last_running, init_step, reconcile, resolve_running};

/// Request payload for `POST /api/dspy/orchestrate/stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrateRequest {
    pub business_task: String,
    pub target_lm: String,
    pub dataset: Vec<DatasetExample>,
    pub quality_profile: String,
    pub optimizer_strategy: String,
    pub provider: String,
    pub model: String,
}

impl OrchestrateRequest {
    pub fn new(business_task: impl Into<String>, target_lm: impl Into<String>, dataset: Vec<DatasetExample>) -> Self {
        Self {
            business_task: business_task.into(),
            target_lm: target_lm.into(),
            dataset,
            quality_profile: "BALANCED".to_string(),
            optimizer_strategy: "auto".to_string(),
            provider: "ollama".to_string(),
            model: "llama2".to_string(),
        }
    }
}

/// Per-run lifecycle: `idle -> running -> {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Snapshot of one run as the consumer sees it. The error, when present,
/// coexists with the step history accumulated up to the failure.
#[derive(Debug, Clone, Serialize)]
pub struct RunView {
    pub run_id: String,
    pub status: RunStatus,
    pub steps: Vec<StepEvent>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl RunView {
    fn new(run_id: String) -> Self {
        Self {
            run_id,
            status: RunStatus::Idle,
            steps: Vec::new(),
            result: None,
            error: None,
        }
    }
}

/// Read side of a run: await snapshot changes until a terminal state.
#[derive(Clone)]
pub struct RunHandle {
    pub run_id: String,
    rx: watch::Receiver<RunView>,
}

impl RunHandle {
    pub fn snapshot(&self) -> RunView {
        self.rx.borrow().clone()
    }

    /// Wait for the next published snapshot. Returns `None` once the producer
    /// is gone and no further change will arrive.
    pub async fn changed(&mut self) -> Option<RunView> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Drive the handle to its terminal snapshot.
    pub async fn wait_terminal(&mut self) -> RunView {
        loop {
            let view = self.snapshot();
            if view.status.is_terminal() {
                return view;
            }
            if self.changed().await.is_none() {
                return self.snapshot();
            }
        }
    }
}

struct ActiveRun {
    run_id: String,
    join: JoinHandle<()>,
}

/// Owns the single active orchestration run.
pub struct RunController {
    http: reqwest::Client,
    config: StudioConfig,
    active: Arc<Mutex<Option<ActiveRun>>>,
}

impl RunController {
    pub fn new(http: reqwest::Client, config: StudioConfig) -> Self {
        Self {
            http,
            config,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a run, cancelling any run still active. The previous producer is
    /// aborted before the new view is seeded, so no stale event can land in
    /// the new step list.
    pub async fn start(&self, request: OrchestrateRequest) -> RunHandle {
        // Hold the slot across abort-and-replace: the previous run is gone
        // before the new producer can publish anything, and the new producer
        // cannot observe the slot until it names this run.
        let mut guard = self.active.lock().await;
        if let Some(previous) = guard.take() {
            previous.join.abort();
            tracing::debug!(run_id = %previous.run_id, "previous run cancelled by restart");
        }

        let run_id = format!("run-{}", Uuid::new_v4());
        let mut view = RunView::new(run_id.clone());
        view.status = RunStatus::Running;
        view.steps.push(init_step());
        let (tx, rx) = watch::channel(view);

        let http = self.http.clone();
        let config = self.config.clone();
        let registry = Arc::clone(&self.active);
        let task_run_id = run_id.clone();
        let join = tokio::spawn(async move {
            stream_run(http, config, task_run_id.clone(), request, tx).await;
            // Producer exit releases the slot, but only if it is still ours.
            let mut guard = registry.lock().await;
            if guard.as_ref().map(|a| a.run_id == task_run_id).unwrap_or(false) {
                *guard = None;
            }
        });

        *guard = Some(ActiveRun {
            run_id: run_id.clone(),
            join,
        });

        RunHandle { run_id, rx }
    }

    /// Abort the active producer, if any. Safe to call at any time; a second
    /// call is a no-op.
    pub async fn cancel(&self) {
        let mut guard = self.active.lock().await;
        if let Some(active) = guard.take() {
            active.join.abort();
            tracing::debug!(run_id = %active.run_id, "orchestration run cancelled");
        }
    }

    pub async fn active_run_id(&self) -> Option<String> {
        self.active.lock().await.as_ref().map(|a| a.run_id.clone())
    }
}

/// Producer: open the SSE subscription and reconcile its events into `tx`
/// until a terminal event, stream failure, or idle timeout.
async fn stream_run(
    http: reqwest::Client,
    config: StudioConfig,
    run_id: String,
    request: OrchestrateRequest,
    tx: watch::Sender<RunView>,
) {
    let url = join_endpoint(&config.base_url, "/api/dspy/orchestrate/stream");
    tracing::debug!(run_id = %run_id, url = %url, "starting orchestration stream");

    let builder = http
        .post(&url)
        .json(&request)
        .header("Accept", "text/event-stream")
        .header("X-Request-Id", &run_id);

    let resp = match timeout(config.handshake_timeout, builder.send()).await {
        Err(_) => {
            fail(&tx, "upstream handshake timed out");
            return;
        }
        Ok(Err(err)) => {
            fail(&tx, &format!("{}: {err}", config_errors::ERR_STREAM_TRANSPORT));
            return;
        }
        Ok(Ok(resp)) => resp,
    };

    let status = resp.status();
    if !status.is_success() {
        let detail = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            _ => status
                .canonical_reason()
                .unwrap_or("upstream failure")
                .to_string(),
        };
        fail(&tx, &format!("backend rejected run ({status}): {detail}"));
        return;
    }

    let mut stream = resp.bytes_stream().eventsource();
    loop {
        let next = timeout(config.stream_idle_timeout, stream.next()).await;
        match next {
            Err(_) => {
                tracing::warn!(run_id = %run_id, "orchestration stream idle timeout");
                fail(&tx, &format!("{}: stream idle timeout", config_errors::ERR_STREAM_IDLE));
                return;
            }
            Ok(None) => {
                // EOF without a terminal event is a failure, not a completion.
                fail(
                    &tx,
                    &format!(
                        "{}: stream ended before completion",
                        config_errors::ERR_STREAM_TRANSPORT
                    ),
                );
                return;
            }
            Ok(Some(Err(err))) => {
                fail(&tx, &format!("{}: {err}", config_errors::ERR_STREAM_TRANSPORT));
                return;
            }
            Ok(Some(Ok(sse))) => {
                if sse.data.len() > limits::MAX_EVENT_BYTES {
                    tracing::warn!(run_id = %run_id, len = sse.data.len(), "oversized event skipped");
                    continue;
                }
                match decode_event(&sse.data) {
                    Ok(OrchestratorEvent::Keepalive) => continue,
                    Ok(OrchestratorEvent::Step { step }) => {
                        tracing::debug!(run_id = %run_id, step_id = %step.id, status = ?step.status, "step event");
                        tx.send_modify(|view| reconcile(&mut view.steps, step));
                    }
                    Ok(OrchestratorEvent::Complete { result }) => {
                        tracing::info!(run_id = %run_id, "orchestration run completed");
                        tx.send_modify(|view| {
                            resolve_running(&mut view.steps);
                            view.result = Some(result);
                            view.status = RunStatus::Completed;
                        });
                        return;
                    }
                    Ok(OrchestratorEvent::Error { error }) => {
                        tracing::warn!(run_id = %run_id, error = %error, "orchestration run failed");
                        tx.send_modify(|view| {
                            fail_last_running(&mut view.steps, &error);
                            view.error = Some(error.clone());
                            view.status = RunStatus::Failed;
                        });
                        return;
                    }
                    Err(err) => {
                        // Partial history is worth more than a hard stop on one
                        // malformed payload; log and keep consuming.
                        tracing::warn!(run_id = %run_id, error = %err, "undecodable event skipped");
                        continue;
                    }
                }
            }
        }
    }
}

fn fail(tx: &watch::Sender<RunView>, message: &str) {
    tx.send_modify(|view| {
        fail_last_running(&mut view.steps, message);
        view.error = Some(message.to_string());
        view.status = RunStatus::Failed;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StepStatus;
    use crate::steps::INIT_STEP_ID;

    #[test]
    fn fail_marks_view_and_last_step() {
        let mut view = RunView::new("run-test".to_string());
        view.status = RunStatus::Running;
        view.steps.push(init_step());
        let (tx, rx) = watch::channel(view);

        fail(&tx, "boom");

        let view = rx.borrow();
        assert_eq!(view.status, RunStatus::Failed);
        assert_eq!(view.error.as_deref(), Some("boom"));
        assert_eq!(view.steps[0].id, INIT_STEP_ID);
        assert_eq!(view.steps[0].status, StepStatus::Error);
        assert_eq!(view.steps[0].error.as_deref(), Some("boom"));
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Idle.is_terminal());
    }

    #[tokio::test]
    async fn cancel_without_active_run_is_a_noop() {
        let controller = RunController::new(reqwest::Client::new(), StudioConfig::default());
        controller.cancel().await;
        controller.cancel().await;
        assert!(controller.active_run_id().await.is_none());
    }
}
