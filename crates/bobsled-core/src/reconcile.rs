//! Merge rules for folding live updates into known state.
//!
//! Everything here is a pure function of `(current, update) -> next`, so the
//! rules can be tested without any transport. The view models in
//! [`crate::view`] are thin owners around these functions.
//!
//! Rules:
//! - present patch fields overwrite, absent fields leave the target alone;
//! - a terminal status is absorbing: no later patch changes it;
//! - log text is appended, never replaced;
//! - a patch for an unseen run creates it instead of being dropped.

use crate::{Run, RunId, RunPatch};

/// Merge a patch into a run.
pub fn merge_run(current: &Run, patch: &RunPatch) -> Run {
    let mut next = current.clone();

    if let Some(status) = patch.status {
        if !current.status.is_terminal() {
            next.status = status;
        }
    }
    if let Some(task) = &patch.task {
        next.task = task.clone();
    }
    if let Some(start) = patch.start {
        next.start = Some(start);
    }
    if let Some(end) = patch.end {
        next.end = Some(end);
    }
    if let Some(code) = patch.exit_code {
        next.exit_code = Some(code);
    }
    if let Some(info) = &patch.run_info {
        next.run_info = info.clone();
    }
    if let Some(fragment) = &patch.logs {
        next.logs = append_text(next.logs, fragment);
    }

    next
}

/// Build the first known state of a run from a patch.
pub fn run_from_patch(uuid: RunId, patch: &RunPatch) -> Run {
    merge_run(&Run::new(uuid), patch)
}

/// Apply a patch to the run with `uuid`, inserting it at the head if unseen.
pub fn upsert_run(mut runs: Vec<Run>, uuid: &RunId, patch: &RunPatch) -> Vec<Run> {
    match runs.iter().position(|run| &run.uuid == uuid) {
        Some(idx) => {
            runs[idx] = merge_run(&runs[idx], patch);
        }
        None => {
            runs.insert(0, run_from_patch(uuid.clone(), patch));
        }
    }
    runs
}

/// Insert a freshly started run at the head of the list.
///
/// If the run is already known (an update for it won the race), the known
/// entry wins: the stub only fills fields it has not learned yet, and never
/// its status.
pub fn insert_optimistic(mut runs: Vec<Run>, stub: Run) -> Vec<Run> {
    match runs.iter().position(|run| run.uuid == stub.uuid) {
        Some(idx) => {
            runs[idx] = fill_absent(&runs[idx], stub);
        }
        None => runs.insert(0, stub),
    }
    runs
}

fn fill_absent(known: &Run, stub: Run) -> Run {
    let mut next = known.clone();
    if next.task.as_str().is_empty() {
        next.task = stub.task;
    }
    next.start = next.start.or(stub.start);
    next.end = next.end.or(stub.end);
    next.exit_code = next.exit_code.or(stub.exit_code);
    if next.logs.is_empty() {
        next.logs = stub.logs;
    }
    if next.run_info.is_empty() {
        next.run_info = stub.run_info;
    }
    next
}

/// Append a fragment to a text buffer.
pub fn append_text(mut buffer: String, fragment: &str) -> String {
    buffer.push_str(fragment);
    buffer
}

/// Fragment appended to the heartbeat log for one beat message.
pub fn beat_line(msg: &str) -> String {
    format!("{msg}\n")
}
