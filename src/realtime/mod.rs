//! The realtime channel: who is connected, who speaks for which user, and
//! how messages fan out.

pub mod connection;
pub mod hub;
pub mod protocol;
pub mod registry;

pub use connection::{Connection, ConnectionState, Identity};
pub use hub::{Hub, Outbound, OutboundReceiver};
pub use registry::ConnectionRegistry;

/// Process-unique id of a live transport connection.
pub type ConnectionId = u64;

/// Close code sent to a connection replaced by a newer handshake for the same user.
pub const CLOSE_SUPERSEDED: u16 = 4000;
pub const CLOSE_SUPERSEDED_REASON: &str = "superseded";
