//! State of the mounted page.

use tracing::{debug, warn};

use bobsled_core::{PageId, Run, Update, ViewModel};

use crate::event::{ChannelState, Generation, UiEvent};

/// Footer message left by the last fetch or action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

/// One mounted page: its view model plus display state.
///
/// The page's view model is only ever written by [`Page::apply_event`].
#[derive(Debug)]
pub struct Page {
    /// Session that may write this page.
    pub generation: Generation,

    /// Authoritative state for rendering.
    pub view: ViewModel,

    /// Live channel state, for pages that have one.
    pub channel: Option<ChannelState>,

    /// Last error or acknowledgment.
    pub notice: Option<Notice>,

    /// Selected row in the page's list.
    pub selected: usize,
}

impl Page {
    /// Fresh state for a newly mounted page.
    pub fn new(page: &PageId, generation: Generation) -> Self {
        Self {
            generation,
            view: ViewModel::new(page),
            channel: None,
            notice: None,
            selected: 0,
        }
    }

    /// Identity of this page.
    pub fn id(&self) -> PageId {
        self.view.page()
    }

    /// Re-mount under a new generation, keeping the last-known state.
    pub fn remount(&mut self, generation: Generation) {
        self.generation = generation;
        self.channel = None;
    }

    /// Apply an event from the backend.
    ///
    /// Returns false if the event belongs to another session and was dropped.
    pub fn apply_event(&mut self, event: UiEvent) -> bool {
        if event.generation() != self.generation {
            debug!(
                got = event.generation(),
                current = self.generation,
                "Discarding stale event"
            );
            return false;
        }

        match event {
            UiEvent::Update { update, .. } => {
                let is_snapshot = matches!(update, Update::Snapshot(_));
                match self.view.apply(update) {
                    Ok(()) if is_snapshot => self.notice = None,
                    Ok(()) => {}
                    Err(e) => {
                        warn!(page = %self.id(), error = %e, "Ignoring update");
                        self.set_notice(format!("Ignored update: {}", e), true);
                    }
                }
                self.clamp_selection();
            }
            UiEvent::Channel { state, .. } => {
                self.channel = Some(state);
            }
            UiEvent::Error { message, .. } => {
                self.set_notice(message, true);
            }
            UiEvent::Notice { message, .. } => {
                self.set_notice(message, false);
            }
        }
        true
    }

    fn set_notice(&mut self, text: String, is_error: bool) {
        self.notice = Some(Notice { text, is_error });
    }

    /// Number of selectable rows.
    pub fn row_count(&self) -> usize {
        match &self.view {
            ViewModel::Index(index) => index.tasks.len(),
            ViewModel::Task(_) | ViewModel::LatestRuns(_) => self.view.runs().len(),
            ViewModel::Run(_) => 0,
        }
    }

    pub fn select_next(&mut self) {
        let count = self.row_count();
        if count > 0 {
            self.selected = (self.selected + 1) % count;
        }
    }

    pub fn select_prev(&mut self) {
        let count = self.row_count();
        if count > 0 {
            self.selected = self.selected.checked_sub(1).unwrap_or(count - 1);
        }
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.row_count().saturating_sub(1));
    }

    /// Page opened by Enter on the selected row.
    pub fn selected_target(&self) -> Option<PageId> {
        match &self.view {
            ViewModel::Index(index) => index
                .tasks
                .get(self.selected)
                .map(|task| PageId::Task(task.name.clone())),
            ViewModel::Task(_) | ViewModel::LatestRuns(_) => self
                .view
                .runs()
                .get(self.selected)
                .map(|run| PageId::Run(run.uuid.clone())),
            ViewModel::Run(_) => None,
        }
    }

    /// The run shown on a run page, once loaded.
    pub fn current_run(&self) -> Option<&Run> {
        match &self.view {
            ViewModel::Run(view) => view.run.as_ref(),
            _ => None,
        }
    }
}
