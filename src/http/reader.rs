//! Connection reader.
//!
//! Owns the read side of one accepted connection. It parses requests one
//! after another and pushes them onto the job queue until the peer closes,
//! a parse fails, or shutdown is triggered. Then it closes the connection.
//!
//! Each connection has one in-flight slot. The reader takes it before
//! parsing and hands it to the worker with the request; the worker releases
//! it only after the handler has finished. The next parse therefore starts
//! only once the previous request has been handled. A full queue lane
//! stalls the reader, which stops reading the socket and lets TCP flow
//! control push back on the client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::sync::Mutex;

use crate::http::request::{parse_request, BufferedReader, ParseError, ParseLimits, Request};
use crate::http::response::ResponseWriter;
use crate::lifecycle::ShutdownSignal;
use crate::net::{ConnectionGuard, Transport};
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::worker::{InFlight, Job, JobQueue};

/// Per-server settings shared by every connection reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderSettings {
    pub limits: ParseLimits,
    pub read_timeout: Option<Duration>,
}

/// Why a connection reader stopped.
#[derive(Debug)]
pub enum ReaderExit {
    Parse(ParseError),
    QueueClosed,
    Shutdown,
}

/// Read requests from `transport` until the connection ends.
pub async fn read_requests(
    transport: Transport,
    guard: ConnectionGuard,
    peer_addr: SocketAddr,
    settings: ReaderSettings,
    queue: JobQueue<Job>,
    mut shutdown: ShutdownSignal,
) -> ReaderExit {
    let connection_id = guard.id();
    let (read_half, write_half) = tokio::io::split(transport);
    let reader = Arc::new(Mutex::new(BufReader::new(read_half)));
    let in_flight = Arc::new(Mutex::new(()));
    let writer = ResponseWriter::new(write_half, connection_id, peer_addr);

    let exit = loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.wait() => break ReaderExit::Shutdown,
            next = read_next(&reader, &in_flight, &writer, &settings) => next,
        };
        let job = match next {
            Ok(job) => job,
            Err(e) => break ReaderExit::Parse(e),
        };

        tokio::select! {
            biased;
            _ = shutdown.wait() => break ReaderExit::Shutdown,
            pushed = queue.push(connection_id, job) => {
                if pushed.is_err() {
                    break ReaderExit::QueueClosed;
                }
                metrics::record_request_enqueued();
            }
        }
    };

    match &exit {
        ReaderExit::Parse(e) if e.is_clean_close() => {
            tracing::debug!("Connection closed by peer");
        }
        ReaderExit::Parse(e) => {
            metrics::record_parse_failure(e.reason());
            tracing::warn!(error = %e, "Closing connection after parse failure");
        }
        ReaderExit::QueueClosed => tracing::debug!("Job queue closed"),
        ReaderExit::Shutdown => tracing::debug!("Connection reader stopped by shutdown"),
    }

    // Let a handler still running for this connection finish writing
    // before the connection is closed.
    let _idle = in_flight.lock().await;
    let _ = writer.close().await;
    drop(guard);
    exit
}

/// Wait for the previous request to be handled, then parse the next one.
async fn read_next(
    reader: &Arc<Mutex<BufferedReader>>,
    in_flight: &Arc<Mutex<()>>,
    writer: &ResponseWriter,
    settings: &ReaderSettings,
) -> Result<Job, ParseError> {
    let slot: InFlight = Arc::clone(in_flight).lock_owned().await;
    let mut buffered = Arc::clone(reader).lock_owned().await;
    let head = match with_deadline(
        settings.read_timeout,
        parse_request(&mut *buffered, &settings.limits),
    )
    .await
    {
        Some(head) => head?,
        None => return Err(ParseError::TimedOut),
    };
    Ok(Job::new(Request::new(head, writer.clone(), buffered), slot))
}
