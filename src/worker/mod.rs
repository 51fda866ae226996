//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! connection readers (many)
//!     → queue.rs (bounded lanes, connection affinity, backpressure)
//!     → pool.rs (N workers, one lane each)
//!     → Handler::call(writer, request)
//! ```

pub mod job;
pub mod pool;
pub mod queue;

pub use job::{InFlight, Job};
pub use pool::WorkerPool;
pub use queue::{bounded, JobQueue, Lane, QueueClosed};
