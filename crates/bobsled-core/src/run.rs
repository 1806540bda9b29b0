//! Run types and live patches.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{wire, RunId, Status, TaskName};

/// One execution of a Task.
///
/// `start`, `end` and `exit_code` fill in monotonically as the run advances;
/// `logs` only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Backend-assigned identifier, immutable.
    pub uuid: RunId,

    /// Owning task (weak reference by name).
    #[serde(default)]
    pub task: TaskName,

    /// Current status.
    #[serde(default, deserialize_with = "wire::status")]
    pub status: Status,

    /// When the run started.
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub start: Option<DateTime<Utc>>,

    /// When the run finished; absent while running.
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub end: Option<DateTime<Utc>>,

    /// Process exit code; absent until terminal.
    #[serde(default, deserialize_with = "wire::lenient")]
    pub exit_code: Option<i32>,

    /// Log output received so far.
    #[serde(default, deserialize_with = "wire::text")]
    pub logs: String,

    /// Executor-specific details, carried opaquely.
    #[serde(default, deserialize_with = "wire::or_default")]
    pub run_info: Map<String, Value>,
}

impl Run {
    /// Create an empty run record for the given id.
    ///
    /// Used as the base a first patch for an unseen run is merged onto.
    pub fn new(uuid: RunId) -> Self {
        Self {
            uuid,
            task: TaskName::default(),
            status: Status::Pending,
            start: None,
            end: None,
            exit_code: None,
            logs: String::new(),
            run_info: Map::new(),
        }
    }

    /// Builder method to set the owning task.
    pub fn with_task(mut self, task: impl Into<TaskName>) -> Self {
        self.task = task.into();
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Wall-clock duration, known once both ends are.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Check if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A partial Run update delivered by a live channel or an action response.
///
/// Absent fields leave the target untouched; `logs` is an increment to
/// append, not a replacement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunPatch {
    #[serde(default, deserialize_with = "wire::lenient")]
    pub uuid: Option<RunId>,

    #[serde(default, deserialize_with = "wire::lenient")]
    pub task: Option<TaskName>,

    #[serde(default, deserialize_with = "wire::lenient")]
    pub status: Option<Status>,

    #[serde(default, deserialize_with = "wire::timestamp")]
    pub start: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "wire::timestamp")]
    pub end: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "wire::lenient")]
    pub exit_code: Option<i32>,

    #[serde(default, deserialize_with = "wire::non_empty")]
    pub logs: Option<String>,

    #[serde(default, deserialize_with = "wire::lenient")]
    pub run_info: Option<Map<String, Value>>,
}

impl RunPatch {
    /// Create an empty patch addressed to a run.
    pub fn for_run(uuid: impl Into<RunId>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            ..Self::default()
        }
    }

    /// Builder method to set the status.
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Builder method to set a log increment.
    pub fn logs(mut self, fragment: impl Into<String>) -> Self {
        self.logs = Some(fragment.into());
        self
    }

    /// Builder method to set the exit code.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Returns true if applying this patch cannot change anything.
    pub fn is_empty(&self) -> bool {
        self.task.is_none()
            && self.status.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.exit_code.is_none()
            && self.logs.is_none()
            && self.run_info.is_none()
    }

}
