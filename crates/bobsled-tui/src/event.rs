//! Event types for communication between background tasks and UI.

use std::fmt;
use std::time::Duration;

use bobsled_core::{PageId, RunId, TaskName, Update};

/// Number identifying one mounted page session.
///
/// Every mount, including a manual refresh of the same page, gets a fresh
/// generation. Events carry the generation of the session that produced them.
pub type Generation = u64;

/// State of a page's live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    /// Currently attempting to connect.
    Connecting,

    /// Connected and receiving frames.
    Live,

    /// Closed; no further live updates unless a reconnect follows.
    Closed { reason: String },

    /// Closed, will reconnect after the specified duration.
    Waiting { retry_in: Duration },
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting..."),
            Self::Live => write!(f, "live"),
            Self::Closed { reason } => write!(f, "closed ({})", reason),
            Self::Waiting { retry_in } => write!(f, "reconnecting in {}s", retry_in.as_secs()),
        }
    }
}

/// Events sent from background tasks to the UI thread.
#[derive(Debug)]
pub enum UiEvent {
    /// A snapshot, live frame or action result to fold into the page.
    Update {
        generation: Generation,
        update: Update,
    },

    /// Live channel state changed.
    Channel {
        generation: Generation,
        state: ChannelState,
    },

    /// A fetch or action failed.
    Error {
        generation: Generation,
        message: String,
    },

    /// An action was acknowledged.
    Notice {
        generation: Generation,
        message: String,
    },
}

impl UiEvent {
    /// Session that produced this event.
    pub fn generation(&self) -> Generation {
        match self {
            Self::Update { generation, .. }
            | Self::Channel { generation, .. }
            | Self::Error { generation, .. }
            | Self::Notice { generation, .. } => *generation,
        }
    }
}

/// Commands sent from UI to background tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Tear down the current session and start one for this page.
    Mount { page: PageId, generation: Generation },

    /// Start a run of a task.
    StartRun {
        task: TaskName,
        generation: Generation,
    },

    /// Stop a run.
    StopRun { uuid: RunId, generation: Generation },

    /// Quit the application.
    Quit,
}
