//! Shared TUI styling and text utilities for the bobsled dashboard.
//!
//! - `theme` - Colors and styles, including the fixed color of each run status
//! - `utils` - Truncation, duration and timestamp formatting, log tailing

pub mod theme;
pub mod utils;

pub use theme::Theme;
pub use utils::{format_duration, format_timestamp, tail_lines, truncate};
