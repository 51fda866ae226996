//! Optional deadlines.
//!
//! Every deadline in the server is optional and disabled by default; a
//! `None` limit waits forever.

use std::future::Future;
use std::time::Duration;

/// Convert an optional seconds setting into a duration.
pub fn from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.map(Duration::from_secs)
}

/// Run `future` to completion, or give up after `limit`.
///
/// Returns `None` when the deadline expired. The future is dropped in that
/// case, cancelling whatever it was doing.
pub async fn with_deadline<F: Future>(limit: Option<Duration>, future: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}
