//! Request serving subsystem.
//!
//! # Data Flow
//! ```text
//! Transport (plaintext or TLS)
//!     → reader.rs (one task per connection, parse loop)
//!     → request.rs (request head parser, Request value)
//!     → [job queue → worker pool]
//!     → handler.rs (application callback)
//!     → response.rs (raw bytes back to the same connection)
//!
//! server.rs owns the listener, the worker pool and the accept loop.
//! ```

pub mod handler;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;

pub use handler::Handler;
pub use request::{parse_request, ParseError, ParseLimits, Request, RequestHead};
pub use response::ResponseWriter;
pub use server::{Server, ServerError};
