//! Unit of work passed from a connection reader to a worker.

use tokio::sync::OwnedMutexGuard;

use crate::http::Request;

/// Lock on a connection's in-flight slot.
pub type InFlight = OwnedMutexGuard<()>;

/// A parsed request together with its connection's in-flight slot.
///
/// The worker holds the slot until the handler's future has completed,
/// however early the handler drops the request. The connection reader takes
/// the same slot before it parses again, so one connection never has two
/// requests in a handler at once.
#[derive(Debug)]
pub struct Job {
    pub request: Request,
    pub in_flight: InFlight,
}

impl Job {
    pub fn new(request: Request, in_flight: InFlight) -> Self {
        Self { request, in_flight }
    }
}
