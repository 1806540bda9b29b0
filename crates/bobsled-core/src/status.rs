//! Run status taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a Run.
///
/// The set is closed and unordered. `Pending` and `Running` are the only
/// non-terminal states; once a Run reaches any other state it stays there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Run accepted by the backend but not yet started.
    #[default]
    Pending,
    /// Run is executing.
    Running,
    /// Run exited cleanly.
    Success,
    /// Run exited with a failure.
    Error,
    /// Run was stopped by a user.
    UserKilled,
    /// Run exceeded its task's timeout.
    TimedOut,
    /// Run disappeared from the executor without reporting an outcome.
    Missing,
}

impl Status {
    /// Every status, in display order.
    pub const ALL: [Status; 7] = [
        Status::Pending,
        Status::Running,
        Status::Success,
        Status::Error,
        Status::UserKilled,
        Status::TimedOut,
        Status::Missing,
    ];

    /// Returns true if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the run is still active (not terminal).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Wire and display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Success => "Success",
            Self::Error => "Error",
            Self::UserKilled => "UserKilled",
            Self::TimedOut => "TimedOut",
            Self::Missing => "Missing",
        }
    }

    /// Single-glyph icon used in compact history strips.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "…",
            Self::Running => "▶",
            Self::Success => "✔",
            Self::Error => "✘",
            Self::UserKilled => "■",
            Self::TimedOut => "⏱",
            Self::Missing => "?",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
