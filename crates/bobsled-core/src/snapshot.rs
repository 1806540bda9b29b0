//! Point-in-time snapshots returned by the read endpoints.

use serde::{Deserialize, Serialize};

use crate::{wire, Run, Task};

/// Body of `GET /api/index`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub tasks: Vec<Task>,

    /// Runs currently pending or running, when the backend includes them.
    #[serde(default, deserialize_with = "wire::items")]
    pub runs: Vec<Run>,
}

/// Body of `GET /api/task/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task: Task,

    #[serde(default, deserialize_with = "wire::items")]
    pub runs: Vec<Run>,
}

/// Body of `GET /api/latest_runs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestRunsSnapshot {
    #[serde(default, deserialize_with = "wire::items")]
    pub runs: Vec<Run>,
}

/// One frame of the `/ws/beat` heartbeat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatMessage {
    pub msg: String,
}

/// A snapshot for any page kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Index(IndexSnapshot),
    Task(TaskSnapshot),
    Run(Run),
    LatestRuns(LatestRunsSnapshot),
}

impl Snapshot {
    /// Short name of the snapshot kind, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Index(_) => "index",
            Self::Task(_) => "task",
            Self::Run(_) => "run",
            Self::LatestRuns(_) => "latest runs",
        }
    }
}
