//! Typed boundary for the orchestration event stream.
//!
//! The backend emits one JSON object per SSE `data:` payload. Every payload is
//! decoded into a closed tagged enum here; nothing downstream touches raw
//! `serde_json::Value` except the opaque terminal result.

use serde::{Deserialize, Serialize};

/// Step lifecycle as reported by the backend agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

impl Default for StepStatus {
    fn default() -> Self {
        StepStatus::Pending
    }
}

/// One unit of progress reported by a long-running orchestration job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Everything the orchestration stream can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OrchestratorEvent {
    Step { step: StepEvent },
    Complete { result: serde_json::Value },
    Error { error: String },
    Keepalive,
}

/// Decode a single SSE payload. Unknown tags and malformed shapes are errors;
/// the caller decides whether to skip or fail the stream.
pub fn decode_event(payload: &str) -> Result<OrchestratorEvent, serde_json::Error> {
    serde_json::from_str(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_step_event() {
        let payload = r#"{"type":"step","step":{"id":"step_1","name":"Analyze Business Goal","tool":"analyze_business_goal","status":"running","thought":"Analyzing..."}}"#;
        match decode_event(payload).expect("decode") {
            OrchestratorEvent::Step { step } => {
                assert_eq!(step.id, "step_1");
                assert_eq!(step.status, StepStatus::Running);
                assert_eq!(step.thought.as_deref(), Some("Analyzing..."));
                assert!(step.error.is_none());
            }
            other => panic!("expected step event, got {other:?}"),
        }
    }

    #[test]
    fn decodes_terminal_events() {
        let complete = decode_event(r#"{"type":"complete","result":{"success":true}}"#).unwrap();
        assert!(matches!(complete, OrchestratorEvent::Complete { .. }));

        let error = decode_event(r#"{"type":"error","error":"agent blew up"}"#).unwrap();
        match error {
            OrchestratorEvent::Error { error } => assert_eq!(error, "agent blew up"),
            other => panic!("expected error event, got {other:?}"),
        }

        let keepalive = decode_event(r#"{"type":"keepalive"}"#).unwrap();
        assert_eq!(keepalive, OrchestratorEvent::Keepalive);
    }

    #[test]
    fn rejects_unknown_tags_and_garbage() {
        assert!(decode_event(r#"{"type":"telemetry","n":1}"#).is_err());
        assert!(decode_event("not json").is_err());
        assert!(decode_event(r#"{"type":"step"}"#).is_err());
    }

    #[test]
    fn tolerates_extra_backend_fields() {
        let payload = r#"{"type":"step","step":{"id":"step_2","name":"Register Target LM","tool":"register_target_lm","status":"success","timestamp":"2025-12-02T10:00:00","observation":"registered","extra_field":42}}"#;
        let evt = decode_event(payload).expect("decode with extras");
        assert!(matches!(evt, OrchestratorEvent::Step { .. }));
    }
}
