//! Client library for the bobsled API.
//!
//! Provides the HTTP client for snapshots and run actions, and the WebSocket
//! live channels (scheduler heartbeat, run logs).

pub mod error;
pub mod http;
pub mod live;
pub mod origin;

pub use error::ClientError;
pub use http::HttpClient;
pub use live::{ChannelKind, ChannelTarget, LiveChannel};
pub use origin::{Origin, DEFAULT_ORIGIN};
