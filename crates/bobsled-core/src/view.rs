//! Per-page view models.
//!
//! Each mounted page owns exactly one [`ViewModel`]; every change to it goes
//! through [`ViewModel::apply`], whether it comes from a snapshot fetch, a live
//! channel frame, or an action response.

use std::fmt;
use std::mem;

use crate::reconcile::{append_text, beat_line, insert_optimistic, merge_run, run_from_patch, upsert_run};
use crate::{CoreError, Run, RunId, RunPatch, Snapshot, Task, TaskName};

/// Identity of a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageId {
    /// Task list and scheduler heartbeat.
    Index,
    /// One task with its recent runs.
    Task(TaskName),
    /// One run with its logs.
    Run(RunId),
    /// Recent runs across all tasks.
    LatestRuns,
}

/// Kind of a page, without its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Index,
    Task,
    Run,
    LatestRuns,
}

impl PageId {
    pub fn kind(&self) -> PageKind {
        match self {
            Self::Index => PageKind::Index,
            Self::Task(_) => PageKind::Task,
            Self::Run(_) => PageKind::Run,
            Self::LatestRuns => PageKind::LatestRuns,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Task(name) => write!(f, "task {}", name),
            Self::Run(uuid) => write!(f, "run {}", uuid),
            Self::LatestRuns => write!(f, "latest runs"),
        }
    }
}

/// An update to fold into a view model.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Full replacement from a read endpoint.
    Snapshot(Snapshot),
    /// Incremental run change; must carry its `uuid`.
    Patch(RunPatch),
    /// One heartbeat message.
    Beat(String),
    /// A run just created by a start action.
    Started(Run),
}

impl Update {
    fn name(&self) -> &'static str {
        match self {
            Self::Snapshot(snapshot) => snapshot.kind(),
            Self::Patch(_) => "run patch",
            Self::Beat(_) => "heartbeat",
            Self::Started(_) => "started run",
        }
    }
}

/// Index page state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexView {
    pub tasks: Vec<Task>,
    /// Runs the backend reported as active, newest first.
    pub active_runs: Vec<Run>,
    /// Scheduler heartbeat log.
    pub beat: String,
    pub loaded: bool,
}

/// Task page state.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskView {
    pub name: TaskName,
    pub task: Option<Task>,
    /// Recent runs, newest first.
    pub runs: Vec<Run>,
}

/// Run page state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunView {
    pub uuid: RunId,
    pub run: Option<Run>,
}

/// Latest-runs page state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestRunsView {
    pub runs: Vec<Run>,
    pub loaded: bool,
}

/// The authoritative state of one page.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewModel {
    Index(IndexView),
    Task(TaskView),
    Run(RunView),
    LatestRuns(LatestRunsView),
}

impl ViewModel {
    /// Empty state for a freshly mounted page.
    pub fn new(page: &PageId) -> Self {
        match page {
            PageId::Index => Self::Index(IndexView::default()),
            PageId::Task(name) => Self::Task(TaskView {
                name: name.clone(),
                task: None,
                runs: Vec::new(),
            }),
            PageId::Run(uuid) => Self::Run(RunView {
                uuid: uuid.clone(),
                run: None,
            }),
            PageId::LatestRuns => Self::LatestRuns(LatestRunsView::default()),
        }
    }

    /// Identity of the page this state belongs to.
    pub fn page(&self) -> PageId {
        match self {
            Self::Index(_) => PageId::Index,
            Self::Task(view) => PageId::Task(view.name.clone()),
            Self::Run(view) => PageId::Run(view.uuid.clone()),
            Self::LatestRuns(_) => PageId::LatestRuns,
        }
    }

    /// Fold one update into the page state.
    ///
    /// On error the state is left untouched.
    pub fn apply(&mut self, update: Update) -> Result<(), CoreError> {
        let update_name = update.name();
        let wrong_page = |view: &ViewModel| CoreError::WrongPage {
            page: view.page().to_string(),
            update: update_name.to_string(),
        };

        match (&mut *self, update) {
            (Self::Index(view), Update::Snapshot(Snapshot::Index(snap))) => {
                view.tasks = snap.tasks;
                view.active_runs = snap.runs;
                view.loaded = true;
            }
            (Self::Index(view), Update::Beat(msg)) => {
                view.beat = append_text(mem::take(&mut view.beat), &beat_line(&msg));
            }
            (Self::Index(view), Update::Patch(patch)) => {
                let uuid = patch_uuid(&patch)?;
                view.active_runs = upsert_run(mem::take(&mut view.active_runs), &uuid, &patch);
                for task in &mut view.tasks {
                    refresh_digest(task, &uuid, &patch);
                }
            }
            (Self::Task(view), Update::Snapshot(Snapshot::Task(snap))) => {
                if snap.task.name != view.name {
                    return Err(CoreError::InvalidPayload(format!(
                        "snapshot for task {} on page for {}",
                        snap.task.name, view.name
                    )));
                }
                view.task = Some(snap.task);
                view.runs = snap.runs;
            }
            (Self::Task(view), Update::Patch(patch)) => {
                let uuid = patch_uuid(&patch)?;
                view.runs = upsert_run(mem::take(&mut view.runs), &uuid, &patch);
                if let Some(task) = view.task.as_mut() {
                    refresh_digest(task, &uuid, &patch);
                }
            }
            (Self::Task(view), Update::Started(run)) => {
                view.runs = insert_optimistic(mem::take(&mut view.runs), run);
                if let (Some(task), Some(head)) = (view.task.as_mut(), view.runs.first()) {
                    task.latest_run = Some(head.clone());
                }
            }
            (Self::Run(view), Update::Snapshot(Snapshot::Run(run))) => {
                if run.uuid != view.uuid {
                    return Err(CoreError::InvalidPayload(format!(
                        "snapshot for run {} on page for {}",
                        run.uuid, view.uuid
                    )));
                }
                view.run = Some(run);
            }
            (Self::Run(view), Update::Patch(patch)) => {
                let uuid = patch.uuid.clone().unwrap_or_else(|| view.uuid.clone());
                if uuid != view.uuid {
                    return Err(CoreError::InvalidPayload(format!(
                        "patch for run {} on page for {}",
                        uuid, view.uuid
                    )));
                }
                view.run = Some(match view.run.as_ref() {
                    Some(run) => merge_run(run, &patch),
                    None => run_from_patch(uuid, &patch),
                });
            }
            (Self::LatestRuns(view), Update::Snapshot(Snapshot::LatestRuns(snap))) => {
                view.runs = snap.runs;
                view.loaded = true;
            }
            (Self::LatestRuns(view), Update::Patch(patch)) => {
                let uuid = patch_uuid(&patch)?;
                view.runs = upsert_run(mem::take(&mut view.runs), &uuid, &patch);
            }
            (view, _) => return Err(wrong_page(view)),
        }
        Ok(())
    }

    /// Runs listed on this page, newest first.
    pub fn runs(&self) -> &[Run] {
        match self {
            Self::Index(view) => &view.active_runs,
            Self::Task(view) => &view.runs,
            Self::Run(view) => view.run.as_slice(),
            Self::LatestRuns(view) => &view.runs,
        }
    }

    /// Returns true once the page's first snapshot has been applied.
    pub fn is_loaded(&self) -> bool {
        match self {
            Self::Index(view) => view.loaded,
            Self::Task(view) => view.task.is_some(),
            Self::Run(view) => view.run.is_some(),
            Self::LatestRuns(view) => view.loaded,
        }
    }
}

fn patch_uuid(patch: &RunPatch) -> Result<RunId, CoreError> {
    patch
        .uuid
        .clone()
        .ok_or_else(|| CoreError::InvalidPayload("run patch without uuid".to_string()))
}

/// Keep a task's `latest_run` digest in step with patches for that run.
fn refresh_digest(task: &mut Task, uuid: &RunId, patch: &RunPatch) {
    if let Some(latest) = task.latest_run.as_mut() {
        if &latest.uuid == uuid {
            *latest = merge_run(latest, patch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IndexSnapshot, LatestRunsSnapshot, Status, TaskSnapshot};

    fn index_with(names: &[&str]) -> Snapshot {
        Snapshot::Index(IndexSnapshot {
            tasks: names.iter().map(|n| Task::new(*n, "img")).collect(),
            runs: Vec::new(),
        })
    }

    #[test]
    fn test_index_snapshot_replaces_tasks() {
        let mut view = ViewModel::new(&PageId::Index);
        view.apply(Update::Snapshot(index_with(&["a", "b", "stale"])))
            .unwrap();
        view.apply(Update::Snapshot(index_with(&["a", "b"]))).unwrap();

        let ViewModel::Index(index) = &view else {
            panic!("expected index view");
        };
        let names: Vec<_> = index.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_snapshot_keeps_heartbeat_log() {
        let mut view = ViewModel::new(&PageId::Index);
        view.apply(Update::Beat("pending=0 running=0".into())).unwrap();
        view.apply(Update::Snapshot(index_with(&["a"]))).unwrap();

        let ViewModel::Index(index) = &view else {
            panic!("expected index view");
        };
        assert_eq!(index.beat, "pending=0 running=0\n");
        assert!(view.is_loaded());
    }

    #[test]
    fn test_start_then_live_patch_supersedes_stub() {
        let mut view = ViewModel::new(&PageId::Task(TaskName::new("build")));
        view.apply(Update::Snapshot(Snapshot::Task(TaskSnapshot {
            task: Task::new("build", "img"),
            runs: vec![Run::new(RunId::new("u0")).with_status(Status::Success)],
        })))
        .unwrap();

        view.apply(Update::Started(
            Run::new(RunId::new("u1"))
                .with_task("build")
                .with_status(Status::Pending),
        ))
        .unwrap();
        assert_eq!(view.runs()[0].uuid, RunId::new("u1"));
        assert_eq!(view.runs()[0].status, Status::Pending);

        view.apply(Update::Patch(RunPatch::for_run("u1").status(Status::Running)))
            .unwrap();

        assert_eq!(view.runs().len(), 2);
        assert_eq!(view.runs()[0].status, Status::Running);
        let ViewModel::Task(task_view) = &view else {
            panic!("expected task view");
        };
        let task = task_view.task.as_ref().unwrap();
        assert_eq!(task.latest_status(), Some(Status::Running));
    }

    #[test]
    fn test_late_start_response_keeps_snapshot_status() {
        let mut view = ViewModel::new(&PageId::Task(TaskName::new("build")));
        view.apply(Update::Snapshot(Snapshot::Task(TaskSnapshot {
            task: Task::new("build", "img"),
            runs: vec![Run::new(RunId::new("u1")).with_status(Status::Running)],
        })))
        .unwrap();
        view.apply(Update::Started(
            Run::new(RunId::new("u1"))
                .with_task("build")
                .with_status(Status::Pending),
        ))
        .unwrap();

        assert_eq!(view.runs().len(), 1);
        assert_eq!(view.runs()[0].status, Status::Running);
    }

    #[test]
    fn test_run_page_terminal_guard_and_log_append() {
        let uuid = RunId::new("u2");
        let mut view = ViewModel::new(&PageId::Run(uuid.clone()));
        let mut run = Run::new(uuid.clone()).with_status(Status::Running);
        run.logs = "boot\n".into();
        view.apply(Update::Snapshot(Snapshot::Run(run))).unwrap();

        view.apply(Update::Patch(RunPatch::default().logs("step 1\n")))
            .unwrap();
        view.apply(Update::Patch(
            RunPatch::default().status(Status::Success).exit_code(0),
        ))
        .unwrap();
        view.apply(Update::Patch(RunPatch::default().status(Status::Running)))
            .unwrap();

        let run = &view.runs()[0];
        assert_eq!(run.status, Status::Success);
        assert_eq!(run.exit_code, Some(0));
        assert_eq!(run.logs, "boot\nstep 1\n");
    }

    #[test]
    fn test_run_page_patch_before_snapshot_creates_run() {
        let mut view = ViewModel::new(&PageId::Run(RunId::new("u3")));
        view.apply(Update::Patch(RunPatch::default().status(Status::Running)))
            .unwrap();
        assert_eq!(view.runs()[0].uuid, RunId::new("u3"));
        assert!(view.is_loaded());
    }

    #[test]
    fn test_run_page_rejects_other_run() {
        let mut view = ViewModel::new(&PageId::Run(RunId::new("u3")));
        let before = view.clone();
        let err = view
            .apply(Update::Patch(RunPatch::for_run("u4").status(Status::Running)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));
        assert_eq!(view, before);
    }

    #[test]
    fn test_latest_runs_patch_for_unknown_run_is_inserted() {
        let mut view = ViewModel::new(&PageId::LatestRuns);
        view.apply(Update::Snapshot(Snapshot::LatestRuns(LatestRunsSnapshot {
            runs: vec![Run::new(RunId::new("u1"))],
        })))
        .unwrap();
        view.apply(Update::Patch(RunPatch::for_run("u3").status(Status::Running)))
            .unwrap();

        let ids: Vec<_> = view.runs().iter().map(|r| r.uuid.as_str()).collect();
        assert_eq!(ids, vec!["u3", "u1"]);
    }

    #[test]
    fn test_wrong_page_update_is_rejected() {
        let mut view = ViewModel::new(&PageId::LatestRuns);
        let err = view.apply(Update::Beat("hi".into())).unwrap_err();
        assert_eq!(
            err,
            CoreError::WrongPage {
                page: "latest runs".into(),
                update: "heartbeat".into(),
            }
        );
    }

    #[test]
    fn test_index_patch_refreshes_task_digest() {
        let mut view = ViewModel::new(&PageId::Index);
        let task = Task::new("build", "img")
            .with_latest_run(Run::new(RunId::new("u1")).with_status(Status::Running));
        view.apply(Update::Snapshot(Snapshot::Index(IndexSnapshot {
            tasks: vec![task],
            runs: Vec::new(),
        })))
        .unwrap();

        view.apply(Update::Patch(RunPatch::for_run("u1").status(Status::Error)))
            .unwrap();

        let ViewModel::Index(index) = &view else {
            panic!("expected index view");
        };
        assert_eq!(index.tasks[0].latest_status(), Some(Status::Error));
        assert_eq!(index.active_runs[0].status, Status::Error);
    }
}
