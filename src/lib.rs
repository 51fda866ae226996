//! Concurrent TCP request server.
//!
//! An acceptor terminates plaintext or TLS connections, a reader task per
//! connection parses request heads from the byte stream, and a fixed pool
//! of workers runs the application handler against a bounded job queue.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod worker;

pub use config::ServerConfig;
pub use http::{Handler, Request, ResponseWriter, Server, ServerError};
pub use lifecycle::Shutdown;
