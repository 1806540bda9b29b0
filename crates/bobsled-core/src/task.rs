//! Task types.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{wire, Run, Status, TaskName};

/// A scheduling trigger attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Cron expression evaluated by the beat process.
    pub cron: String,
}

/// A Task is a named, schedulable unit of work with fixed execution configuration.
///
/// Tasks are only ever observed: the dashboard never builds one locally
/// outside of tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique, stable task name.
    pub name: TaskName,

    /// Container image the executor runs.
    #[serde(default, deserialize_with = "wire::text")]
    pub image: String,

    /// Command and arguments.
    #[serde(default, deserialize_with = "wire::entrypoint")]
    pub entrypoint: Vec<String>,

    /// Name of the environment injected into the run.
    #[serde(default, deserialize_with = "wire::non_empty")]
    pub environment: Option<String>,

    /// Memory limit in MiB, if the backend reported one.
    #[serde(default, deserialize_with = "wire::lenient")]
    pub memory: Option<u32>,

    /// CPU units, if the backend reported them.
    #[serde(default, deserialize_with = "wire::lenient")]
    pub cpu: Option<u32>,

    /// Timeout in minutes (`timeout_minutes` on the wire).
    #[serde(
        default,
        alias = "timeout_minutes",
        rename = "timeout",
        deserialize_with = "wire::minutes"
    )]
    pub timeout_minutes: Option<u32>,

    /// Free-form tags.
    #[serde(default, deserialize_with = "wire::or_default")]
    pub tags: BTreeSet<String>,

    /// Whether the scheduler will start this task on its triggers.
    #[serde(default = "enabled_by_default", deserialize_with = "wire::enabled")]
    pub enabled: bool,

    /// Tasks started after this one succeeds.
    #[serde(default, deserialize_with = "wire::or_default")]
    pub next_tasks: Vec<TaskName>,

    /// Cron triggers.
    #[serde(default, deserialize_with = "wire::or_default")]
    pub triggers: Vec<Trigger>,

    /// Consecutive failures tolerated before alerting.
    #[serde(default, deserialize_with = "wire::lenient")]
    pub error_threshold: Option<u32>,

    /// Most recent run of this task, if any.
    #[serde(default, deserialize_with = "wire::lenient")]
    pub latest_run: Option<Run>,

    /// Recent run statuses, most recent first.
    #[serde(default, deserialize_with = "wire::statuses")]
    pub recent_statuses: Vec<Status>,
}

fn enabled_by_default() -> bool {
    true
}

impl Task {
    /// Create a bare task with the given name and image.
    pub fn new(name: impl Into<TaskName>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            entrypoint: Vec::new(),
            environment: None,
            memory: None,
            cpu: None,
            timeout_minutes: None,
            tags: BTreeSet::new(),
            enabled: true,
            next_tasks: Vec::new(),
            triggers: Vec::new(),
            error_threshold: None,
            latest_run: None,
            recent_statuses: Vec::new(),
        }
    }

    /// Builder method to set the latest run digest.
    pub fn with_latest_run(mut self, run: Run) -> Self {
        self.latest_run = Some(run);
        self
    }

    /// Timeout as a duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_minutes
            .map(|m| Duration::from_secs(u64::from(m) * 60))
    }

    /// Entrypoint joined for display.
    pub fn command_line(&self) -> String {
        self.entrypoint.join(" ")
    }

    /// Status of the latest run, if known.
    pub fn latest_status(&self) -> Option<Status> {
        self.latest_run.as_ref().map(|run| run.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_backend_task() {
        let task: Task = serde_json::from_value(json!({
            "name": "scrape-ak",
            "image": "openstates/scrapers",
            "tags": ["ak", "scrape", "ak"],
            "entrypoint": "os-update ak bills",
            "environment": "",
            "memory": 1024,
            "cpu": 256,
            "enabled": false,
            "timeout_minutes": 0,
            "triggers": [{"cron": "0 4 * * ?"}]
        }))
        .unwrap();

        assert_eq!(task.entrypoint, vec!["os-update", "ak", "bills"]);
        assert_eq!(task.environment, None);
        assert_eq!(task.timeout(), None);
        assert_eq!(task.tags.len(), 2);
        assert!(!task.enabled);
        assert_eq!(task.triggers[0].cron, "0 4 * * ?");
    }

    #[test]
    fn test_decode_digest_and_list_entrypoint() {
        let task: Task = serde_json::from_value(json!({
            "name": "build",
            "entrypoint": ["make", "all"],
            "timeout": 30,
            "next_tasks": ["deploy"],
            "latest_run": {"uuid": "u9", "task": "build", "status": "Error"},
            "recent_statuses": ["Error", "Bogus", "Success"]
        }))
        .unwrap();

        assert_eq!(task.command_line(), "make all");
        assert_eq!(task.timeout(), Some(Duration::from_secs(1800)));
        assert_eq!(task.next_tasks, vec![TaskName::new("deploy")]);
        assert_eq!(task.latest_status(), Some(Status::Error));
        assert_eq!(task.recent_statuses, vec![Status::Error, Status::Success]);
        assert!(task.enabled);
    }

    #[test]
    fn test_malformed_optional_fields_are_absent() {
        let task: Task = serde_json::from_value(json!({
            "name": "odd",
            "memory": "lots",
            "latest_run": 7,
            "tags": null
        }))
        .unwrap();

        assert_eq!(task.memory, None);
        assert!(task.latest_run.is_none());
        assert!(task.tags.is_empty());
    }
}
