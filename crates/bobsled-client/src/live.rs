//! WebSocket live channels.
//!
//! A page owns at most one channel. The target is derived from the page once,
//! at connect time, and never changes. Frames are decoded into
//! [`Update`]s and handed out one at a time, in transport order, through
//! [`LiveChannel::next`]; the caller is the single consumer.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use bobsled_core::{BeatMessage, PageId, RunId, RunPatch, Update};

use crate::error::ClientError;
use crate::origin::Origin;

/// What a channel carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    /// Scheduler heartbeat text (`/ws/beat`).
    Beat,
    /// Status and log increments for one run (`/ws/logs/{uuid}`).
    Logs(RunId),
}

/// A resolved channel: what it carries and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub kind: ChannelKind,
    pub url: Url,
}

impl ChannelTarget {
    /// Channel for a page, if that page has one.
    pub fn for_page(origin: &Origin, page: &PageId) -> Option<Self> {
        let (kind, url) = match page {
            PageId::Index => (ChannelKind::Beat, origin.channel_url(&["ws", "beat"])),
            PageId::Run(uuid) => (
                ChannelKind::Logs(uuid.clone()),
                origin.channel_url(&["ws", "logs", uuid.as_str()]),
            ),
            PageId::Task(_) | PageId::LatestRuns => return None,
        };
        Some(Self { kind, url })
    }

    /// Decode one text payload for this channel.
    ///
    /// Returns `None` for payloads that cannot be placed; the caller drops them.
    pub fn decode(&self, text: &str) -> Option<Update> {
        match &self.kind {
            ChannelKind::Beat => match serde_json::from_str::<BeatMessage>(text) {
                Ok(beat) => Some(Update::Beat(beat.msg)),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed heartbeat frame");
                    None
                }
            },
            ChannelKind::Logs(target) => {
                let mut patch: RunPatch = match serde_json::from_str(text) {
                    Ok(patch) => patch,
                    Err(e) => {
                        warn!(error = %e, "Dropping malformed run frame");
                        return None;
                    }
                };
                if let Some(other) = patch.uuid.as_ref().filter(|uuid| *uuid != target) {
                    warn!(target = %target, got = %other, "Dropping frame for another run");
                    return None;
                }
                patch.uuid = Some(target.clone());
                Some(Update::Patch(patch))
            }
        }
    }
}

/// An open live channel.
pub struct LiveChannel {
    target: ChannelTarget,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl LiveChannel {
    /// Open the channel.
    pub async fn connect(target: ChannelTarget) -> Result<Self, ClientError> {
        info!(url = %target.url, "Connecting live channel");
        let (ws, _) = connect_async(target.url.as_str()).await?;
        Ok(Self {
            target,
            ws,
            closed: false,
        })
    }

    /// The target this channel was opened for.
    pub fn target(&self) -> &ChannelTarget {
        &self.target
    }

    /// Next decoded update.
    ///
    /// Returns `Ok(None)` once the server has closed the channel; after an
    /// error or a close every further call returns `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<Update>, ClientError> {
        while !self.closed {
            let Some(frame) = self.ws.next().await else {
                self.closed = true;
                break;
            };
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("Dropping non-UTF-8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(reason)) => {
                    debug!(reason = ?reason, "Live channel closed by server");
                    self.closed = true;
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    self.closed = true;
                    return Err(e.into());
                }
            };
            if let Some(update) = self.target.decode(&text) {
                return Ok(Some(update));
            }
        }
        Ok(None)
    }

    /// Close the channel from our side.
    pub async fn close(mut self) {
        if !self.closed {
            if let Err(e) = self.ws.close(None).await {
                debug!(error = %e, "Error closing live channel");
            }
        }
    }
}
