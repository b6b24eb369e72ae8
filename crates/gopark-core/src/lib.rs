//! Realtime data layer between `gopark-api` and UI consumers (the CLI).
//!
//! - **[`LiveFeed`]**: the one shared WebSocket connection. A pure
//!   [`Connection`] state machine decides when to open, subscribe, close and
//!   reconnect; a background task carries the effects out. Subscribers
//!   register callbacks with [`LiveFeed::on_message`] and hold the returned
//!   [`Subscription`].
//!
//! - **[`DataStore`]**: lock-free cache of zone lists per gate and the admin
//!   audit log, reconciled from live messages ([`reconcile`]).
//!
//! - **[`Parking`]**: facade over the REST client, store, feed and the
//!   current [`Session`] for check-in, checkout and admin workflows.

pub mod config;
pub mod error;
pub mod live;
pub mod parking;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{FeedConfig, ReconnectPolicy};
pub use error::CoreError;
pub use live::{Connection, Effect, LinkStatus, Listeners, LiveFeed, Phase, Subscription};
pub use parking::{CheckinKind, Parking};
pub use session::Session;
pub use store::{ADMIN_LOG_CAPACITY, AdminLog, DataStore, ZoneCache, reconcile};

// API surface consumers need without depending on gopark-api directly.
pub use gopark_api::types::{
    CheckinResponse, CheckoutBreakdown, CheckoutResponse, Gate, ParkingStateReportEntry, RateMode,
    Role, Ticket, TicketType, User, Zone, ZoneOpenState,
};
pub use gopark_api::websocket::{AdminAudit, ServerMessage, probe};
pub use gopark_api::{ApiClient, TransportConfig};
