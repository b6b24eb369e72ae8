// gopark-api: Async Rust client for the GoPark parking API (REST + live feed)

pub mod client;
pub mod error;
pub mod transport;
pub mod types;
pub mod websocket;

pub use client::ApiClient;
pub use error::Error;
pub use transport::TransportConfig;
