//! Live feed wire format and socket link.
//!
//! The server pushes JSON text frames shaped `{ "type": ..., "payload": ... }`.
//! [`decode_frame`] turns one frame into a typed [`ServerMessage`];
//! [`Link`] owns one WebSocket connection attempt on a background task and
//! reports what happens to it as [`LinkEvent`]s. Reconnection policy is not
//! decided here; `gopark-core` drives links from its connection state machine.
//!
//! # Example
//!
//! ```rust,ignore
//! use gopark_api::websocket::{Link, LinkEvent, decode_frame};
//! use url::Url;
//!
//! let mut link = Link::open(Url::parse("ws://localhost:3000/api/v1/ws")?);
//! while let Some(event) = link.next_event().await {
//!     if let LinkEvent::Frame(text) = event {
//!         println!("{:?}", decode_frame(&text));
//!     }
//! }
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, protocol::CloseFrame, protocol::frame::coding::CloseCode};
use url::Url;

use crate::error::Error;
use crate::types::Zone;

/// Default live feed endpoint.
pub const DEFAULT_WS_URL: &str = "ws://localhost:3000/api/v1/ws";

/// Close code for a clean, intentional closure. Never triggers reconnection.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the connection dropped without a close frame
/// (refused, reset, or ended mid-stream).
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported when the server sent a close frame without a code.
const NO_STATUS_RECEIVED: u16 = 1005;

/// How long [`probe`] waits by default.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// ── Inbound messages ─────────────────────────────────────────────────

/// Audit record pushed when an administrator changes something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAudit {
    pub admin_id: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
    /// ISO-8601 timestamp as sent by the server.
    pub timestamp: String,
}

/// A decoded message from the live feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Full snapshot of one zone.
    ZoneUpdate(Zone),
    /// Administrative action log entry.
    AdminUpdate(AdminAudit),
}

impl ServerMessage {
    /// Wire tag for this message.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ZoneUpdate(_) => "zone-update",
            Self::AdminUpdate(_) => "admin-update",
        }
    }
}

/// Raw envelope every frame arrives in.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Decode one text frame.
///
/// Returns `Ok(None)` for well-formed frames with a tag this client does not
/// know, so newer servers can add message kinds without breaking older
/// clients. Non-JSON frames and known tags with a mismatched payload are
/// [`Error::Decode`].
pub fn decode_frame(text: &str) -> Result<Option<ServerMessage>, Error> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| Error::Decode(e.to_string()))?;

    let message = match envelope.kind.as_str() {
        "zone-update" => serde_json::from_value(envelope.payload).map(ServerMessage::ZoneUpdate),
        "admin-update" => serde_json::from_value(envelope.payload).map(ServerMessage::AdminUpdate),
        _ => return Ok(None),
    };

    message
        .map(Some)
        .map_err(|e| Error::Decode(format!("{}: {e}", envelope.kind)))
}

// ── Outbound messages ────────────────────────────────────────────────

/// Control messages the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Ask the server for updates about one gate's zones.
    Subscribe {
        #[serde(rename = "gateId")]
        gate_id: String,
    },
}

impl ClientMessage {
    pub fn subscribe(gate_id: impl Into<String>) -> Self {
        Self::Subscribe {
            gate_id: gate_id.into(),
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> String {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── Link ─────────────────────────────────────────────────────────────

/// What happened to a [`Link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The handshake completed; frames can be sent.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The connection is gone. Always the last event of a link.
    Closed { code: u16, reason: String },
}

#[derive(Debug)]
enum Outgoing {
    Text(String),
    Close { code: u16, reason: String },
}

/// One WebSocket connection attempt running on a background task.
///
/// Dropping the `Link` drops its event receiver; the task notices on its next
/// send and winds down, so events from a replaced link are never observed.
pub struct Link {
    out_tx: mpsc::UnboundedSender<Outgoing>,
    events: mpsc::UnboundedReceiver<LinkEvent>,
}

impl Link {
    /// Start connecting to `url`. Returns immediately; the outcome arrives
    /// as [`LinkEvent::Opened`] or [`LinkEvent::Closed`].
    pub fn open(url: Url) -> Self {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let closed = match run_link(&url, out_rx, &event_tx).await {
                Ok(closed) => closed,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "WebSocket connection error");
                    LinkEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: e.to_string(),
                    }
                }
            };
            // The owner may have dropped the link already
            let _ = event_tx.send(closed);
        });

        Self { out_tx, events }
    }

    /// Queue a text frame. Returns `false` if the link task has ended.
    pub fn send_text(&self, text: String) -> bool {
        self.out_tx.send(Outgoing::Text(text)).is_ok()
    }

    /// Close the connection with the given code.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.out_tx.send(Outgoing::Close {
            code,
            reason: reason.to_owned(),
        });
    }

    /// Wait for the next event. `None` once the task has finished and every
    /// event has been consumed.
    pub async fn next_event(&mut self) -> Option<LinkEvent> {
        self.events.recv().await
    }
}

/// Connect, forward frames until the socket ends, and return the final
/// `Closed` event. Errors are connection failures before or after the open.
async fn run_link(
    url: &Url,
    mut out_rx: mpsc::UnboundedReceiver<Outgoing>,
    event_tx: &mpsc::UnboundedSender<LinkEvent>,
) -> Result<LinkEvent, Error> {
    tracing::debug!(url = %url, "Connecting to live feed");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!(url = %url, "Live feed connected");
    if event_tx.send(LinkEvent::Opened).is_err() {
        return Ok(closed(NORMAL_CLOSURE, "link dropped"));
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            outgoing = out_rx.recv() => {
                match outgoing {
                    Some(Outgoing::Text(text)) => {
                        write
                            .send(tungstenite::Message::text(text))
                            .await
                            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
                    }
                    Some(Outgoing::Close { code, reason }) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.clone().into(),
                        };
                        // The peer may already be gone; the close is best-effort.
                        let _ = write.send(tungstenite::Message::Close(Some(frame))).await;
                        return Ok(closed(code, &reason));
                    }
                    // Owner dropped the link without closing it
                    None => {
                        let _ = write.send(tungstenite::Message::Close(None)).await;
                        return Ok(closed(NORMAL_CLOSURE, "link dropped"));
                    }
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if event_tx.send(LinkEvent::Frame(text.as_str().to_owned())).is_err() {
                            return Ok(closed(NORMAL_CLOSURE, "link dropped"));
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        let event = match frame {
                            Some(cf) => {
                                tracing::info!(code = u16::from(cf.code), reason = cf.reason.as_str(), "Live feed close frame received");
                                closed(u16::from(cf.code), cf.reason.as_str())
                            }
                            None => {
                                tracing::info!("Live feed close frame received (no payload)");
                                closed(NO_STATUS_RECEIVED, "")
                            }
                        };
                        return Ok(event);
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("Live feed stream ended");
                        return Ok(closed(ABNORMAL_CLOSURE, "stream ended"));
                    }
                    Some(Ok(_)) => {
                        // Binary, Ping, Pong, Frame: tungstenite answers pings itself
                    }
                }
            }
        }
    }
}

fn closed(code: u16, reason: &str) -> LinkEvent {
    LinkEvent::Closed {
        code,
        reason: reason.to_owned(),
    }
}

// ── Probe ────────────────────────────────────────────────────────────

/// Check whether the server accepts a WebSocket connection at `url`.
///
/// Resolves `false` on any connection error or once `timeout` elapses.
/// A successful probe closes its socket immediately.
pub async fn probe(url: &Url, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url.as_str())).await {
        Ok(Ok((mut ws, _))) => {
            let _ = ws.close(None).await;
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(url = %url, error = %e, "Live feed server is not available");
            false
        }
        Err(_) => {
            tracing::warn!(url = %url, timeout_ms = timeout.as_millis(), "Live feed probe timed out");
            false
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
