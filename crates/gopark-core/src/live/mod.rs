// ── Live feed ──
//
// One shared WebSocket connection with fixed-delay reconnect and a single
// gate subscription slot replayed on every open.

mod feed;
mod listeners;
pub mod state;

pub use feed::{LinkStatus, LiveFeed, dispatch_frame};
pub use listeners::{Listeners, Subscription};
pub use state::{Connection, Effect, Phase};
