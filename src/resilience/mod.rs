//! Resilience subsystem.
//!
//! # Components
//! - timeouts.rs: optional deadlines for reads, handshakes and handlers
//! - backoff.rs: pause between consecutive accept failures
//!
//! # Design Decisions
//! - Deadlines are opt-in; a disabled deadline waits forever
//! - Nothing is retried on behalf of a client

pub mod backoff;
pub mod timeouts;
