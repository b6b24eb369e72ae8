// ── Live connection state machine ──
//
// Pure and synchronous: every input returns the effects the driver must
// perform. The async side (`feed.rs`) owns the socket and the timer and
// feeds their outcomes back in, so all reconnect rules live here.

use std::time::Duration;

use gopark_api::websocket::{ClientMessage, NORMAL_CLOSURE};
use tracing::{info, warn};

use crate::config::ReconnectPolicy;

/// Reason sent with the close frame on an explicit disconnect.
pub const DISCONNECT_REASON: &str = "Client disconnecting";

/// Transport phase as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting,
    Open,
}

/// Side effect requested by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a new transport. Any previous transport is already gone.
    Open,
    /// Send a control message on the open transport.
    Send(ClientMessage),
    /// Close the current transport.
    Close { code: u16, reason: &'static str },
    /// Arm the reconnect timer.
    ScheduleReconnect(Duration),
    /// Disarm the reconnect timer.
    CancelReconnect,
}

/// The single logical connection shared by every live-feed subscriber.
#[derive(Debug)]
pub struct Connection {
    phase: Phase,
    /// Caller intent; decides reconnection, not transport presence.
    should_connect: bool,
    /// Shared gate slot. The last `connect`/`subscribe_gate` wins.
    gate_id: Option<String>,
    attempts: u32,
    policy: ReconnectPolicy,
    reconnect_pending: bool,
}

impl Connection {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            phase: Phase::Idle,
            should_connect: false,
            gate_id: None,
            attempts: 0,
            policy,
            reconnect_pending: false,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Open
    }

    pub fn should_connect(&self) -> bool {
        self.should_connect
    }

    pub fn gate_id(&self) -> Option<&str> {
        self.gate_id.as_deref()
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    // ── Caller inputs ────────────────────────────────────────────────

    /// Declare intent to stay connected, optionally (re)targeting a gate.
    ///
    /// While open, a supplied gate is subscribed immediately, even if it is
    /// the same gate as before. While connecting, nothing happens; the gate
    /// is subscribed once the handshake completes.
    pub fn connect(&mut self, gate_id: Option<&str>) -> Vec<Effect> {
        if let Some(gate) = gate_id {
            self.gate_id = Some(gate.to_owned());
        }
        self.should_connect = true;

        match self.phase {
            Phase::Open => gate_id
                .map(|gate| vec![Effect::Send(ClientMessage::subscribe(gate))])
                .unwrap_or_default(),
            Phase::Connecting => Vec::new(),
            Phase::Idle => {
                let mut effects = Vec::with_capacity(2);
                if self.reconnect_pending {
                    self.reconnect_pending = false;
                    effects.push(Effect::CancelReconnect);
                }
                self.phase = Phase::Connecting;
                effects.push(Effect::Open);
                effects
            }
        }
    }

    /// Drop the intent to stay connected and tear the transport down.
    ///
    /// Clears the gate slot. Close events that arrive afterwards are ignored.
    pub fn disconnect(&mut self) -> Vec<Effect> {
        self.should_connect = false;
        self.gate_id = None;

        let mut effects = Vec::with_capacity(2);
        if self.reconnect_pending {
            self.reconnect_pending = false;
            effects.push(Effect::CancelReconnect);
        }
        if self.phase != Phase::Idle {
            effects.push(Effect::Close {
                code: NORMAL_CLOSURE,
                reason: DISCONNECT_REASON,
            });
        }
        self.phase = Phase::Idle;
        effects
    }

    /// Point the shared gate slot at `gate_id`.
    pub fn subscribe_gate(&mut self, gate_id: &str) -> Vec<Effect> {
        self.gate_id = Some(gate_id.to_owned());
        if self.phase == Phase::Open {
            vec![Effect::Send(ClientMessage::subscribe(gate_id))]
        } else {
            warn!(gate_id, "WebSocket is not connected; subscription deferred until open");
            Vec::new()
        }
    }

    // ── Transport inputs ─────────────────────────────────────────────

    /// Handshake completed.
    pub fn on_open(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Connecting {
            return Vec::new();
        }
        self.phase = Phase::Open;
        self.attempts = 0;
        info!(gate_id = self.gate_id.as_deref(), "Live feed open");

        self.gate_id
            .as_deref()
            .map(|gate| vec![Effect::Send(ClientMessage::subscribe(gate))])
            .unwrap_or_default()
    }

    /// Transport closed (or failed to open) with `code`.
    pub fn on_close(&mut self, code: u16) -> Vec<Effect> {
        if self.phase == Phase::Idle {
            return Vec::new();
        }
        self.phase = Phase::Idle;

        if !self.should_connect || code == NORMAL_CLOSURE {
            info!(code, "Live feed closed");
            return Vec::new();
        }

        if self.attempts >= self.policy.max_attempts {
            warn!(
                code,
                attempts = self.attempts,
                "Live feed reconnect attempts exhausted"
            );
            return Vec::new();
        }

        self.attempts += 1;
        self.reconnect_pending = true;
        let delay = self.policy.delay;
        info!(
            code,
            attempt = self.attempts,
            max_attempts = self.policy.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Live feed reconnect scheduled"
        );
        vec![Effect::ScheduleReconnect(delay)]
    }

    /// Reconnect timer fired.
    pub fn on_reconnect_due(&mut self) -> Vec<Effect> {
        if !self.reconnect_pending {
            return Vec::new();
        }
        self.reconnect_pending = false;

        if self.should_connect && self.phase == Phase::Idle {
            self.phase = Phase::Connecting;
            vec![Effect::Open]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ABNORMAL: u16 = 1006;

    fn subscribe(gate: &str) -> Effect {
        Effect::Send(ClientMessage::subscribe(gate))
    }

    fn open_connection(gate: &str) -> Connection {
        let mut conn = Connection::new(ReconnectPolicy::default());
        assert_eq!(conn.connect(Some(gate)), vec![Effect::Open]);
        assert_eq!(conn.on_open(), vec![subscribe(gate)]);
        conn
    }

    #[test]
    fn connect_while_connecting_opens_once() {
        let mut conn = Connection::new(ReconnectPolicy::default());
        assert_eq!(conn.connect(Some("gate_1")), vec![Effect::Open]);
        assert!(conn.connect(Some("gate_2")).is_empty());
        assert_eq!(conn.gate_id(), Some("gate_2"));

        // Only the latest gate is subscribed once the handshake completes.
        assert_eq!(conn.on_open(), vec![subscribe("gate_2")]);
    }

    #[test]
    fn connect_while_open_resends_subscribe() {
        let mut conn = open_connection("gate_1");

        assert_eq!(conn.connect(Some("gate_1")), vec![subscribe("gate_1")]);
        assert_eq!(conn.connect(Some("gate_2")), vec![subscribe("gate_2")]);
        assert!(conn.connect(None).is_empty());
        assert_eq!(conn.gate_id(), Some("gate_2"));
    }

    #[test]
    fn no_reconnect_after_explicit_disconnect() {
        let mut conn = open_connection("gate_1");

        assert_eq!(
            conn.disconnect(),
            vec![Effect::Close {
                code: NORMAL_CLOSURE,
                reason: DISCONNECT_REASON
            }]
        );
        assert!(conn.on_close(ABNORMAL).is_empty());
        assert!(conn.on_reconnect_due().is_empty());
        assert_eq!(conn.phase(), Phase::Idle);
        assert_eq!(conn.gate_id(), None);
    }

    #[test]
    fn disconnect_cancels_pending_reconnect() {
        let mut conn = open_connection("gate_1");
        assert_eq!(
            conn.on_close(ABNORMAL),
            vec![Effect::ScheduleReconnect(Duration::from_millis(2000))]
        );

        assert_eq!(conn.disconnect(), vec![Effect::CancelReconnect]);
        assert!(!conn.reconnect_pending());
        assert!(conn.on_reconnect_due().is_empty());
    }

    #[test]
    fn reconnect_is_bounded_to_three_attempts() {
        let mut conn = Connection::new(ReconnectPolicy::default());
        assert_eq!(conn.connect(Some("gate_1")), vec![Effect::Open]);

        let mut reopens = 0;
        for _ in 0..4 {
            let effects = conn.on_close(ABNORMAL);
            if effects.is_empty() {
                break;
            }
            assert_eq!(
                effects,
                vec![Effect::ScheduleReconnect(Duration::from_millis(2000))]
            );
            assert_eq!(conn.on_reconnect_due(), vec![Effect::Open]);
            reopens += 1;
        }

        assert_eq!(reopens, 3);
        assert_eq!(conn.attempts(), 3);
        assert_eq!(conn.phase(), Phase::Idle);
        assert!(!conn.reconnect_pending());
    }

    #[test]
    fn normal_close_does_not_reconnect() {
        let mut conn = open_connection("gate_1");
        assert!(conn.on_close(NORMAL_CLOSURE).is_empty());
        assert!(!conn.reconnect_pending());
    }

    #[test]
    fn resubscribes_after_reconnect() {
        let mut conn = open_connection("gate_1");
        conn.subscribe_gate("gate_7");

        conn.on_close(ABNORMAL);
        assert_eq!(conn.on_reconnect_due(), vec![Effect::Open]);
        assert_eq!(conn.on_open(), vec![subscribe("gate_7")]);
        assert_eq!(conn.attempts(), 0);
    }

    #[test]
    fn connect_during_backoff_opens_now() {
        let mut conn = open_connection("gate_1");
        conn.on_close(ABNORMAL);

        assert_eq!(
            conn.connect(None),
            vec![Effect::CancelReconnect, Effect::Open]
        );
        // The stale timer firing later must not open a second transport.
        assert!(conn.on_reconnect_due().is_empty());
    }

    #[test]
    fn subscribe_gate_while_idle_is_deferred() {
        let mut conn = Connection::new(ReconnectPolicy::default());
        assert!(conn.subscribe_gate("gate_3").is_empty());

        conn.connect(None);
        assert_eq!(conn.on_open(), vec![subscribe("gate_3")]);
    }

    #[test]
    fn custom_policy_is_respected() {
        let policy = ReconnectPolicy {
            max_attempts: 1,
            delay: Duration::from_millis(50),
        };
        let mut conn = Connection::new(policy);
        conn.connect(None);

        assert_eq!(
            conn.on_close(ABNORMAL),
            vec![Effect::ScheduleReconnect(Duration::from_millis(50))]
        );
        conn.on_reconnect_due();
        assert!(conn.on_close(ABNORMAL).is_empty());
    }
}
