// ── Live feed driver ──
//
// Background task that owns the `Connection` state machine, the current
// socket `Link`, and the reconnect deadline. Handles talk to it over an
// mpsc channel; everything that mutates connection state happens on this
// one task.

use std::sync::Arc;

use gopark_api::websocket::{
    self, ABNORMAL_CLOSURE, Link, LinkEvent, NORMAL_CLOSURE, ServerMessage,
};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::listeners::{Listeners, Subscription};
use super::state::{Connection, DISCONNECT_REASON, Effect, Phase};
use crate::config::FeedConfig;

/// Connection status for indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting for (or performing) reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
}

#[derive(Debug)]
enum FeedCommand {
    Connect(Option<String>),
    Disconnect,
    SubscribeGate(String),
}

struct FeedInner {
    commands: mpsc::UnboundedSender<FeedCommand>,
    listeners: Listeners,
    status: watch::Receiver<LinkStatus>,
    ws_url: Url,
    cancel: CancellationToken,
}

impl Drop for FeedInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Handle to the shared live connection.
///
/// Construct once with [`LiveFeed::spawn`] and clone it into every view that
/// needs live updates. All methods are fire-and-forget: they never block and
/// never fail. Observe the outcome through [`status`](Self::status).
#[derive(Clone)]
pub struct LiveFeed {
    inner: Arc<FeedInner>,
}

impl LiveFeed {
    /// Start the feed task on the current tokio runtime. The feed stays idle
    /// until the first [`connect`](Self::connect).
    pub fn spawn(config: FeedConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(LinkStatus::Disconnected);
        let listeners = Listeners::new();
        let cancel = CancellationToken::new();
        let ws_url = config.ws_url.clone();

        tokio::spawn(feed_loop(
            config,
            command_rx,
            listeners.clone(),
            status_tx,
            cancel.clone(),
        ));

        Self {
            inner: Arc::new(FeedInner {
                commands,
                listeners,
                status,
                ws_url,
                cancel,
            }),
        }
    }

    /// Ensure the connection is up and, if given, subscribed to `gate_id`.
    ///
    /// The gate slot is shared: the most recent gate wins for every holder
    /// of this feed.
    pub fn connect(&self, gate_id: Option<&str>) {
        self.send(FeedCommand::Connect(gate_id.map(str::to_owned)));
    }

    /// Close the connection and stop reconnecting.
    pub fn disconnect(&self) {
        self.send(FeedCommand::Disconnect);
    }

    /// Retarget the gate subscription without changing connection intent.
    pub fn subscribe_gate(&self, gate_id: &str) {
        self.send(FeedCommand::SubscribeGate(gate_id.to_owned()));
    }

    /// Register a callback for every decoded message.
    pub fn on_message<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.inner.listeners.register(callback)
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.status.borrow() == LinkStatus::Connected
    }

    /// Watch connection status changes.
    pub fn status(&self) -> watch::Receiver<LinkStatus> {
        self.inner.status.clone()
    }

    pub fn ws_url(&self) -> &Url {
        &self.inner.ws_url
    }

    /// Stop the feed task. The socket is closed normally and the reconnect
    /// timer is dropped; later commands are ignored.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    fn send(&self, command: FeedCommand) {
        if self.inner.commands.send(command).is_err() {
            debug!("live feed task has stopped; command dropped");
        }
    }
}

/// Decode one frame and hand it to every listener.
///
/// Malformed frames are logged and dropped; unknown message kinds are
/// skipped silently.
pub fn dispatch_frame(text: &str, listeners: &Listeners) {
    match websocket::decode_frame(text) {
        Ok(Some(message)) => {
            debug!(kind = message.tag(), "live message");
            listeners.deliver(&message);
        }
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "Dropping malformed live message");
        }
    }
}

// ── Task ─────────────────────────────────────────────────────────────

async fn feed_loop(
    config: FeedConfig,
    mut commands: mpsc::UnboundedReceiver<FeedCommand>,
    listeners: Listeners,
    status_tx: watch::Sender<LinkStatus>,
    cancel: CancellationToken,
) {
    let mut conn = Connection::new(config.reconnect);
    let mut link: Option<Link> = None;
    let mut reconnect_at: Option<Instant> = None;

    loop {
        let effects = tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            command = commands.recv() => match command {
                Some(FeedCommand::Connect(gate_id)) => conn.connect(gate_id.as_deref()),
                Some(FeedCommand::Disconnect) => conn.disconnect(),
                Some(FeedCommand::SubscribeGate(gate_id)) => conn.subscribe_gate(&gate_id),
                // Every handle is gone
                None => break,
            },

            event = next_link_event(&mut link) => match event {
                Some(LinkEvent::Opened) => conn.on_open(),
                Some(LinkEvent::Frame(text)) => {
                    dispatch_frame(&text, &listeners);
                    Vec::new()
                }
                Some(LinkEvent::Closed { code, reason }) => {
                    link = None;
                    if code != NORMAL_CLOSURE {
                        warn!(code, reason = %reason, "Live feed connection lost");
                    }
                    conn.on_close(code)
                }
                None => {
                    link = None;
                    conn.on_close(ABNORMAL_CLOSURE)
                }
            },

            () = reconnect_due(reconnect_at) => {
                reconnect_at = None;
                conn.on_reconnect_due()
            }
        };

        for effect in effects {
            match effect {
                Effect::Open => {
                    if let Some(old) = link.take() {
                        old.close(NORMAL_CLOSURE, DISCONNECT_REASON);
                    }
                    info!(url = %config.ws_url, attempt = conn.attempts(), "Opening live feed");
                    link = Some(Link::open(config.ws_url.clone()));
                }
                Effect::Send(message) => match &link {
                    Some(open) if open.send_text(message.encode()) => {}
                    _ => warn!("WebSocket is not connected; message dropped"),
                },
                Effect::Close { code, reason } => {
                    if let Some(old) = link.take() {
                        old.close(code, reason);
                    }
                }
                Effect::ScheduleReconnect(delay) => {
                    reconnect_at = Some(Instant::now() + delay);
                }
                Effect::CancelReconnect => reconnect_at = None,
            }
        }

        let next = status_of(&conn);
        status_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    if let Some(open) = link.take() {
        open.close(NORMAL_CLOSURE, DISCONNECT_REASON);
    }
    status_tx.send_replace(LinkStatus::Disconnected);
    debug!("live feed task stopped");
}

async fn next_link_event(link: &mut Option<Link>) -> Option<LinkEvent> {
    match link {
        Some(link) => link.next_event().await,
        None => std::future::pending().await,
    }
}

async fn reconnect_due(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn status_of(conn: &Connection) -> LinkStatus {
    match conn.phase() {
        Phase::Open => LinkStatus::Connected,
        Phase::Connecting if conn.attempts() > 0 => LinkStatus::Reconnecting {
            attempt: conn.attempts(),
        },
        Phase::Connecting => LinkStatus::Connecting,
        Phase::Idle if conn.reconnect_pending() => LinkStatus::Reconnecting {
            attempt: conn.attempts(),
        },
        Phase::Idle => LinkStatus::Disconnected,
    }
}
