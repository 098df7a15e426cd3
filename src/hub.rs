//! Live connections and fan-out of outbound envelopes.

mod broadcast;
mod connection;
mod registry;

pub use broadcast::BroadcastHub;
pub use connection::ClientConnection;
pub use registry::ConnectionRegistry;
