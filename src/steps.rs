//! Step list reconciliation for orchestration runs.
//!
//! The view keeps one ordered list of step records per run. Events merge into
//! it by id: replace in place on a repeated id, append otherwise. The
//! synthetic init placeholder completes as soon as the first real step lands.

use crate::events::{StepEvent, StepStatus};

/// Id of the synthetic placeholder seeded before the backend reports anything.
pub const INIT_STEP_ID: &str = "init";

/// Placeholder shown while the stream is being established. The backend never
/// emits this id, so it can only be resolved locally.
pub fn init_step() -> StepEvent {
    StepEvent {
        id: INIT_STEP_ID.to_string(),
        name: "Initialize Agent".to_string(),
        tool: "init".to_string(),
        status: StepStatus::Running,
        thought: Some("Connecting to the orchestration backend...".to_string()),
        action: None,
        observation: None,
        duration_ms: None,
        error: None,
        timestamp: None,
    }
}

/// Merge one incoming step event into the ordered step list.
///
/// Same id: the existing record is replaced at its position with the incoming
/// event. New id: appended. When the list is exactly the single init
/// placeholder, the placeholder transitions to success before the append —
/// real work starting means initialization is over. No reordering ever
/// happens; the list stays in insertion order.
pub fn reconcile(steps: &mut Vec<StepEvent>, incoming: StepEvent) {
    if let Some(existing) = steps.iter_mut().find(|s| s.id == incoming.id) {
        *existing = incoming;
        return;
    }
    if let [only] = steps.as_mut_slice() {
        if only.id == INIT_STEP_ID {
            only.status = StepStatus::Success;
        }
    }
    steps.push(incoming);
}

/// Terminal success: freeze every in-flight step.
pub fn resolve_running(steps: &mut [StepEvent]) {
    for step in steps.iter_mut() {
        if step.status == StepStatus::Running {
            step.status = StepStatus::Success;
        }
    }
}

/// Terminal failure: the most recent step, if still running, carries the
/// error. Earlier records are left untouched for diagnosis.
pub fn fail_last_running(steps: &mut [StepEvent], message: &str) {
    if let Some(last) = steps.last_mut() {
        if last.status == StepStatus::Running {
            last.status = StepStatus::Error;
            last.error = Some(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, status: StepStatus) -> StepEvent {
        StepEvent {
            id: id.to_string(),
            name: format!("Step {id}"),
            tool: "tool".to_string(),
            status,
            thought: None,
            action: None,
            observation: None,
            duration_ms: None,
            error: None,
            timestamp: None,
        }
    }

    #[test]
    fn distinct_ids_grow_the_list_by_one_each() {
        let mut steps = vec![init_step()];
        for id in ["step_1", "step_2", "step_3"] {
            reconcile(&mut steps, step(id, StepStatus::Running));
        }
        // 3 distinct ids plus the placeholder none of them reused.
        assert_eq!(steps.len(), 4);
    }

    #[test]
    fn first_real_step_promotes_the_placeholder() {
        let mut steps = vec![init_step()];
        let incoming = step("step_1", StepStatus::Running);
        reconcile(&mut steps, incoming.clone());

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].id, INIT_STEP_ID);
        assert_eq!(steps[0].status, StepStatus::Success);
        assert_eq!(steps[1], incoming);
    }

    #[test]
    fn promotion_only_applies_to_the_lone_placeholder() {
        // Once real steps exist, later appends must not touch older records.
        let mut steps = vec![init_step()];
        reconcile(&mut steps, step("step_1", StepStatus::Running));
        reconcile(&mut steps, step("step_2", StepStatus::Running));
        assert_eq!(steps[1].status, StepStatus::Running);
    }

    #[test]
    fn repeated_id_replaces_in_place() {
        let mut steps = vec![init_step()];
        reconcile(&mut steps, step("step_1", StepStatus::Running));
        reconcile(&mut steps, step("step_2", StepStatus::Running));

        let mut update = step("step_1", StepStatus::Success);
        update.observation = Some("done".to_string());
        reconcile(&mut steps, update.clone());

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1], update);
        assert_eq!(steps[2].id, "step_2");
    }

    #[test]
    fn completion_leaves_no_running_step() {
        let mut steps = vec![init_step()];
        reconcile(&mut steps, step("step_1", StepStatus::Running));
        reconcile(&mut steps, step("step_2", StepStatus::Running));
        resolve_running(&mut steps);
        assert!(steps.iter().all(|s| s.status != StepStatus::Running));
    }

    #[test]
    fn error_marks_only_the_last_running_step() {
        let mut steps = vec![init_step()];
        reconcile(&mut steps, step("step_1", StepStatus::Success));
        reconcile(&mut steps, step("step_2", StepStatus::Running));
        let before: Vec<_> = steps[..2].to_vec();

        fail_last_running(&mut steps, "compilation failed");

        assert_eq!(steps[2].status, StepStatus::Error);
        assert_eq!(steps[2].error.as_deref(), Some("compilation failed"));
        assert_eq!(&steps[..2], before.as_slice());
    }

    #[test]
    fn error_with_settled_last_step_changes_nothing() {
        let mut steps = vec![init_step()];
        reconcile(&mut steps, step("step_1", StepStatus::Success));
        let snapshot = steps.clone();
        fail_last_running(&mut steps, "late failure");
        assert_eq!(steps, snapshot);
    }
}
