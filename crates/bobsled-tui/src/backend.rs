//! Background sessions: snapshot fetches, live channels and actions.
//!
//! Runs in a separate thread with its own tokio runtime. At most one page
//! session is alive at a time; mounting a page cancels the previous session,
//! which closes its channel and abandons its snapshot fetch. Start and stop
//! requests always go out; a result that arrives after navigation carries the
//! old generation and is dropped by the UI.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bobsled_client::{ChannelTarget, HttpClient, LiveChannel};
use bobsled_core::{PageId, RunId, Snapshot, TaskName, Update};

use crate::event::{BackendCommand, ChannelState, Generation, UiEvent};

/// Session behaviour.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Delay before re-running the connect sequence after a channel closes.
    /// `None` leaves a closed channel closed.
    pub reconnect: Option<Duration>,
}

/// Run the backend command loop until `Quit` or until the UI goes away.
pub async fn run_backend(
    client: HttpClient,
    config: SessionConfig,
    ui_tx: mpsc::Sender<UiEvent>,
    mut cmd_rx: mpsc::Receiver<BackendCommand>,
) {
    info!(origin = %client.origin(), "Backend started");
    let mut session = CancellationToken::new();

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            BackendCommand::Mount { page, generation } => {
                session.cancel();
                session = CancellationToken::new();
                debug!(page = %page, generation, "Mounting page");
                let ctx = Session {
                    client: client.clone(),
                    config: config.clone(),
                    page,
                    generation,
                    ui_tx: ui_tx.clone(),
                };
                tokio::spawn(ctx.run(session.clone()));
            }
            BackendCommand::StartRun { task, generation } => {
                let ctx = Action::new(&client, generation, &ui_tx);
                tokio::spawn(ctx.start_run(task));
            }
            BackendCommand::StopRun { uuid, generation } => {
                let ctx = Action::new(&client, generation, &ui_tx);
                tokio::spawn(ctx.stop_run(uuid));
            }
            BackendCommand::Quit => {
                info!("Received quit command, shutting down backend");
                break;
            }
        }
    }

    session.cancel();
    info!("Backend shutdown complete");
}

/// Why a session's connect sequence ended.
enum Ended {
    /// Cancelled, or the UI is gone.
    Stopped,
    /// The channel closed; a reconnect may follow.
    Closed { terminal: bool },
    /// The page has no channel.
    NoChannel,
}

/// One mounted page.
struct Session {
    client: HttpClient,
    config: SessionConfig,
    page: PageId,
    generation: Generation,
    ui_tx: mpsc::Sender<UiEvent>,
}

impl Session {
    async fn run(self, token: CancellationToken) {
        loop {
            match self.connect_once(&token).await {
                Ended::Stopped | Ended::NoChannel => break,
                Ended::Closed { terminal: true } => {
                    debug!(page = %self.page, "Run finished, not reconnecting");
                    break;
                }
                Ended::Closed { terminal: false } => {
                    let Some(delay) = self.config.reconnect else {
                        break;
                    };
                    if !self
                        .send_channel(ChannelState::Waiting { retry_in: delay })
                        .await
                    {
                        break;
                    }
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
        debug!(page = %self.page, generation = self.generation, "Session ended");
    }

    /// Fetch the snapshot, then stream the page's channel until it closes.
    async fn connect_once(&self, token: &CancellationToken) -> Ended {
        let fetched = tokio::select! {
            _ = token.cancelled() => return Ended::Stopped,
            fetched = self.client.snapshot(&self.page) => fetched,
        };
        let mut terminal = false;
        let sent = match fetched {
            Ok(snapshot) => {
                terminal = matches!(&snapshot, Snapshot::Run(run) if run.is_terminal());
                self.send(Update::Snapshot(snapshot)).await
            }
            Err(e) => {
                warn!(page = %self.page, error = %e, "Snapshot fetch failed");
                self.send_error(format!("Fetch failed: {}", e)).await
            }
        };
        if !sent {
            return Ended::Stopped;
        }

        let Some(target) = ChannelTarget::for_page(self.client.origin(), &self.page) else {
            return Ended::NoChannel;
        };
        if !self.send_channel(ChannelState::Connecting).await {
            return Ended::Stopped;
        }

        let connected = tokio::select! {
            _ = token.cancelled() => return Ended::Stopped,
            connected = LiveChannel::connect(target) => connected,
        };
        let mut channel = match connected {
            Ok(channel) => channel,
            Err(e) => {
                warn!(page = %self.page, error = %e, "Live channel connect failed");
                let state = ChannelState::Closed {
                    reason: e.to_string(),
                };
                return self.closed(state, terminal).await;
            }
        };
        if !self.send_channel(ChannelState::Live).await {
            channel.close().await;
            return Ended::Stopped;
        }

        loop {
            let next = tokio::select! {
                _ = token.cancelled() => {
                    channel.close().await;
                    return Ended::Stopped;
                }
                next = channel.next() => next,
            };
            match next {
                Ok(Some(update)) => {
                    if let Update::Patch(patch) = &update {
                        terminal |= patch.status.is_some_and(|s| s.is_terminal());
                    }
                    if !self.send(update).await {
                        channel.close().await;
                        return Ended::Stopped;
                    }
                }
                Ok(None) => {
                    info!(page = %self.page, "Live channel closed");
                    let state = ChannelState::Closed {
                        reason: "closed by server".to_string(),
                    };
                    return self.closed(state, terminal).await;
                }
                Err(e) => {
                    warn!(page = %self.page, error = %e, "Live channel failed");
                    let state = ChannelState::Closed {
                        reason: e.to_string(),
                    };
                    return self.closed(state, terminal).await;
                }
            }
        }
    }

    async fn closed(&self, state: ChannelState, terminal: bool) -> Ended {
        if self.send_channel(state).await {
            Ended::Closed { terminal }
        } else {
            Ended::Stopped
        }
    }

    async fn send(&self, update: Update) -> bool {
        let event = UiEvent::Update {
            generation: self.generation,
            update,
        };
        self.ui_tx.send(event).await.is_ok()
    }

    async fn send_channel(&self, state: ChannelState) -> bool {
        let event = UiEvent::Channel {
            generation: self.generation,
            state,
        };
        self.ui_tx.send(event).await.is_ok()
    }

    async fn send_error(&self, message: String) -> bool {
        let event = UiEvent::Error {
            generation: self.generation,
            message,
        };
        self.ui_tx.send(event).await.is_ok()
    }
}

/// A fire-and-forget action on behalf of one session.
struct Action {
    client: HttpClient,
    generation: Generation,
    ui_tx: mpsc::Sender<UiEvent>,
}

impl Action {
    fn new(client: &HttpClient, generation: Generation, ui_tx: &mpsc::Sender<UiEvent>) -> Self {
        Self {
            client: client.clone(),
            generation,
            ui_tx: ui_tx.clone(),
        }
    }

    async fn start_run(self, task: TaskName) {
        info!(task = %task, "Starting run");
        match self.client.start_run(&task).await {
            Ok(run) => {
                let message = format!("Started run {}", run.uuid.short());
                self.emit(UiEvent::Update {
                    generation: self.generation,
                    update: Update::Started(run),
                })
                .await;
                self.emit(UiEvent::Notice {
                    generation: self.generation,
                    message,
                })
                .await;
            }
            Err(e) => {
                warn!(task = %task, error = %e, "Start run failed");
                self.emit(UiEvent::Error {
                    generation: self.generation,
                    message: format!("Start failed: {}", e),
                })
                .await;
            }
        }
    }

    async fn stop_run(self, uuid: RunId) {
        info!(run = %uuid, "Stopping run");
        match self.client.stop_run(&uuid).await {
            Ok(mut patch) => {
                if !patch.is_empty() {
                    patch.uuid.get_or_insert_with(|| uuid.clone());
                    self.emit(UiEvent::Update {
                        generation: self.generation,
                        update: Update::Patch(patch),
                    })
                    .await;
                }
                self.emit(UiEvent::Notice {
                    generation: self.generation,
                    message: format!("Stop requested for {}", uuid.short()),
                })
                .await;
            }
            Err(e) => {
                warn!(run = %uuid, error = %e, "Stop run failed");
                self.emit(UiEvent::Error {
                    generation: self.generation,
                    message: format!("Stop failed: {}", e),
                })
                .await;
            }
        }
    }

    async fn emit(&self, event: UiEvent) {
        if self.ui_tx.send(event).await.is_err() {
            debug!(generation = self.generation, "UI gone, dropping action result");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
    use axum::extract::Path;
    use axum::routing::get;
    use axum::{Json, Router};
    use bobsled_client::Origin;
    use serde_json::{json, Value};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn serve(router: Router) -> HttpClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        HttpClient::new(Origin::parse(&format!("http://{}", addr)).unwrap())
    }

    fn backend() -> Router {
        Router::new()
            .route(
                "/api/index",
                get(|| async { Json(json!({"tasks": [{"name": "build", "image": "img"}]})) }),
            )
            .route(
                "/api/task/:name",
                get(|Path(name): Path<String>| async move {
                    Json(json!({"task": {"name": name, "image": "img"}, "runs": []}))
                }),
            )
            .route(
                "/api/task/:name/run",
                get(|| async { Json(json!({"error": "Task was already running"})) }),
            )
            .route("/api/latest_runs", get(|| async { Json(json!({"runs": []})) }))
    }

    /// Route that counts its hits and answers with `body`.
    fn counted(hits: &Arc<AtomicUsize>, body: Value) -> axum::routing::MethodRouter {
        let hits = hits.clone();
        get(move || {
            hits.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            async move { Json(body) }
        })
    }

    /// Websocket route that sends `frame` once, then closes.
    fn one_frame(frame: &'static str) -> axum::routing::MethodRouter {
        get(move |ws: WebSocketUpgrade| async move {
            ws.on_upgrade(move |mut socket| async move {
                let _ = socket.send(WsMessage::Text(frame.to_string())).await;
                let _ = socket.send(WsMessage::Close(None)).await;
            })
        })
    }

    fn start(client: HttpClient) -> (mpsc::Sender<BackendCommand>, mpsc::Receiver<UiEvent>) {
        let (ui_tx, ui_rx) = mpsc::channel(100);
        let (cmd_tx, cmd_rx) = mpsc::channel(100);
        tokio::spawn(run_backend(client, SessionConfig::default(), ui_tx, cmd_rx));
        (cmd_tx, ui_rx)
    }

    fn session(
        client: HttpClient,
        page: PageId,
        reconnect: Duration,
    ) -> (Session, mpsc::Receiver<UiEvent>) {
        let (ui_tx, ui_rx) = mpsc::channel(100);
        let session = Session {
            client,
            config: SessionConfig {
                reconnect: Some(reconnect),
            },
            page,
            generation: 1,
            ui_tx,
        };
        (session, ui_rx)
    }

    async fn next_event(ui_rx: &mut mpsc::Receiver<UiEvent>) -> UiEvent {
        timeout(WAIT, ui_rx.recv()).await.unwrap().unwrap()
    }

    fn is_waiting(event: &UiEvent) -> bool {
        matches!(
            event,
            UiEvent::Channel {
                state: ChannelState::Waiting { .. },
                ..
            }
        )
    }

    #[tokio::test]
    async fn test_task_page_gets_tagged_snapshot() {
        let (cmd_tx, mut ui_rx) = start(serve(backend()).await);
        cmd_tx
            .send(BackendCommand::Mount {
                page: PageId::Task(TaskName::new("build")),
                generation: 3,
            })
            .await
            .unwrap();

        let event = next_event(&mut ui_rx).await;
        assert_eq!(event.generation(), 3);
        assert!(matches!(
            event,
            UiEvent::Update {
                update: Update::Snapshot(Snapshot::Task(_)),
                ..
            }
        ));
        cmd_tx.send(BackendCommand::Quit).await.unwrap();
    }

    #[tokio::test]
    async fn test_index_channel_failure_is_reported() {
        let (cmd_tx, mut ui_rx) = start(serve(backend()).await);
        cmd_tx
            .send(BackendCommand::Mount {
                page: PageId::Index,
                generation: 1,
            })
            .await
            .unwrap();

        assert!(matches!(next_event(&mut ui_rx).await, UiEvent::Update { .. }));
        assert!(matches!(
            next_event(&mut ui_rx).await,
            UiEvent::Channel {
                state: ChannelState::Connecting,
                ..
            }
        ));
        assert!(matches!(
            next_event(&mut ui_rx).await,
            UiEvent::Channel {
                state: ChannelState::Closed { .. },
                ..
            }
        ));
        cmd_tx.send(BackendCommand::Quit).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_start_is_an_error_event() {
        let (cmd_tx, mut ui_rx) = start(serve(backend()).await);
        cmd_tx
            .send(BackendCommand::StartRun {
                task: TaskName::new("build"),
                generation: 7,
            })
            .await
            .unwrap();

        let UiEvent::Error {
            generation,
            message,
        } = next_event(&mut ui_rx).await
        else {
            panic!("expected error event");
        };
        assert_eq!(generation, 7);
        assert!(message.contains("already running"));
    }

    #[tokio::test]
    async fn test_stop_survives_navigation() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = backend().route("/api/run/:uuid/stop", counted(&hits, json!({})));
        let (cmd_tx, mut ui_rx) = start(serve(router).await);

        cmd_tx
            .send(BackendCommand::StopRun {
                uuid: RunId::new("u1"),
                generation: 1,
            })
            .await
            .unwrap();
        cmd_tx
            .send(BackendCommand::Mount {
                page: PageId::LatestRuns,
                generation: 2,
            })
            .await
            .unwrap();

        loop {
            if let UiEvent::Notice { generation, .. } = next_event(&mut ui_rx).await {
                assert_eq!(generation, 1);
                break;
            }
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        cmd_tx.send(BackendCommand::Quit).await.unwrap();
    }

    #[tokio::test]
    async fn test_action_finishes_after_ui_is_gone() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = backend().route("/api/run/:uuid/stop", counted(&hits, json!({})));
        let client = serve(router).await;
        let (ui_tx, ui_rx) = mpsc::channel(1);
        drop(ui_rx);

        let action = Action::new(&client, 1, &ui_tx);
        timeout(WAIT, action.stop_run(RunId::new("u1"))).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconnect_reruns_snapshot_then_channel() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/api/index", counted(&hits, json!({"tasks": []})))
            .route("/ws/beat", one_frame(r#"{"msg": "pending=0 running=0"}"#));
        let client = serve(router).await;
        let (session, mut ui_rx) = session(client, PageId::Index, Duration::from_millis(20));
        let token = CancellationToken::new();
        tokio::spawn(session.run(token.clone()));

        // Collect until the snapshot that follows the first wait
        let mut seen = Vec::new();
        loop {
            let event = next_event(&mut ui_rx).await;
            let refetched = matches!(
                event,
                UiEvent::Update {
                    update: Update::Snapshot(_),
                    ..
                }
            ) && seen.iter().any(is_waiting);
            seen.push(event);
            if refetched {
                break;
            }
        }
        token.cancel();

        let beats = seen
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    UiEvent::Update {
                        update: Update::Beat(_),
                        ..
                    }
                )
            })
            .count();
        assert_eq!(beats, 1);
        assert!(is_waiting(&seen[seen.len() - 2]));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_finished_run_is_not_reconnected() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/run/:uuid",
                counted(&hits, json!({"uuid": "u1", "status": "Running"})),
            )
            .route("/ws/logs/:uuid", one_frame(r#"{"status": "Success", "exit_code": 0}"#));
        let client = serve(router).await;
        let (session, mut ui_rx) =
            session(client, PageId::Run(RunId::new("u1")), Duration::from_millis(20));
        let handle = tokio::spawn(session.run(CancellationToken::new()));

        timeout(WAIT, handle).await.unwrap().unwrap();
        let mut events = Vec::new();
        while let Ok(event) = ui_rx.try_recv() {
            events.push(event);
        }
        assert!(!events.iter().any(is_waiting));
        assert!(matches!(
            events.last(),
            Some(UiEvent::Channel {
                state: ChannelState::Closed { .. },
                ..
            })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_ends_session() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new().route("/api/index", counted(&hits, json!({"tasks": []})));
        let client = serve(router).await;
        let (session, mut ui_rx) = session(client, PageId::Index, Duration::from_secs(600));
        let token = CancellationToken::new();
        let handle = tokio::spawn(session.run(token.clone()));

        while !is_waiting(&next_event(&mut ui_rx).await) {}
        token.cancel();

        timeout(WAIT, handle).await.unwrap().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
