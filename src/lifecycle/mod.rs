//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (Server::run):
//!     Validate config → Load TLS material → Spawn workers → Accept
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Close readers → Workers stop dequeuing
//!     → In-flight handlers finish → run() returns
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
