//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits, TCP_NODELAY)
//!     → tls.rs (optional TLS handshake)
//!     → transport.rs (plaintext or TLS byte stream)
//!     → connection.rs (identity, active-connection tracking)
//!     → Hand off to the connection reader
//! ```
//!
//! # Design Decisions
//! - Bounded accept slots prevent resource exhaustion
//! - TLS is optional and handled transparently behind `Transport`
//! - Handshakes run on the connection task, never on the accept loop

pub mod connection;
pub mod listener;
pub mod tls;
pub mod transport;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use tls::TlsError;
pub use transport::Transport;
