//! Fixed-size worker pool.
//!
//! # Responsibilities
//! - Run exactly N workers for the lifetime of the server
//! - Each worker drains its own lane and calls the handler once per request
//! - Contain handler panics and optional handler deadlines
//! - Hold the connection's in-flight slot until the handler completes
//!
//! A worker awaits the handler before taking the next request, so at most
//! N handler calls run at any moment.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::task::JoinSet;

use crate::http::Handler;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::worker::job::Job;
use crate::worker::queue::Lane;

/// Handle to the running workers.
#[derive(Debug)]
pub struct WorkerPool {
    workers: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Spawn one worker per lane.
    pub fn spawn(
        lanes: Vec<Lane<Job>>,
        handler: Arc<dyn Handler>,
        handler_timeout: Option<Duration>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let size = lanes.len();
        let mut workers = JoinSet::new();
        for lane in lanes {
            let handler = Arc::clone(&handler);
            let shutdown = shutdown.clone();
            workers.spawn(run_worker(lane, handler, handler_timeout, shutdown));
        }

        tracing::info!(workers = size, "Worker pool started");
        Self { workers, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for every worker to exit.
    pub async fn join(mut self) {
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}

async fn run_worker(
    mut lane: Lane<Job>,
    handler: Arc<dyn Handler>,
    handler_timeout: Option<Duration>,
    mut shutdown: ShutdownSignal,
) {
    let worker = lane.index();
    tracing::trace!(worker, "Worker started");

    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            next = lane.recv() => match next {
                Some(job) => job,
                None => break,
            },
        };
        dispatch(worker, handler.as_ref(), job, handler_timeout).await;
    }

    tracing::trace!(worker, "Worker stopped");
}

/// Run the handler for one request to completion.
async fn dispatch(worker: usize, handler: &dyn Handler, job: Job, handler_timeout: Option<Duration>) {
    let Job { request, in_flight } = job;
    let connection_id = request.connection_id();
    let writer = request.writer();
    let start = Instant::now();

    tracing::debug!(
        worker,
        connection_id = %connection_id,
        method = %request.method(),
        target = %request.target(),
        "Dispatching request"
    );

    // Covers panics in `call` itself, not only in the returned future.
    let handler_writer = writer.clone();
    let call = AssertUnwindSafe(async move { handler.call(handler_writer, request).await })
        .catch_unwind();
    let failed = match with_deadline(handler_timeout, call).await {
        Some(Ok(())) => false,
        Some(Err(_)) => {
            tracing::error!(worker, connection_id = %connection_id, "Handler panicked");
            metrics::record_handler_panic();
            true
        }
        None => {
            tracing::warn!(
                worker,
                connection_id = %connection_id,
                timeout = ?handler_timeout,
                "Handler timed out"
            );
            metrics::record_handler_timeout();
            true
        }
    };
    metrics::record_handler_duration(start);

    // The response may be half written; end the exchange.
    if failed {
        let _ = writer.close().await;
    }
    drop(in_flight);
}
