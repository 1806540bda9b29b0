//! Bobsled Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP/WebSocket
//! - Terminal rendering
//! - Runtime specifics
//!
//! It holds the task/run model as the bobsled API exposes it, and the
//! reconciler that folds snapshots and live patches into per-page view models.

pub mod error;
pub mod ids;
pub mod reconcile;
pub mod run;
pub mod snapshot;
pub mod status;
pub mod task;
pub mod view;
mod wire;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::{RunId, TaskName};
pub use run::{Run, RunPatch};
pub use snapshot::{BeatMessage, IndexSnapshot, LatestRunsSnapshot, Snapshot, TaskSnapshot};
pub use status::Status;
pub use task::{Task, Trigger};
pub use view::{
    IndexView, LatestRunsView, PageId, PageKind, RunView, TaskView, Update, ViewModel,
};
