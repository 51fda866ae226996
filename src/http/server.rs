//! Server setup and accept loop.
//!
//! # Responsibilities
//! - Validate configuration at construction
//! - Load TLS material once at startup
//! - Spawn the worker pool before the first accept
//! - Accept connections on every listener, hand each one to its own
//!   connection task
//! - Stop accepting and wait for workers on shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tracing::Instrument;

use crate::config::{validate_config, ServerConfig, ValidationError};
use crate::http::handler::Handler;
use crate::http::reader::{read_requests, ReaderSettings};
use crate::http::request::ParseLimits;
use crate::lifecycle::ShutdownSignal;
use crate::net::listener::ConnectionPermit;
use crate::net::{tls, ConnectionTracker, Listener, ListenerError, TlsError, Transport};
use crate::observability::metrics;
use crate::resilience::backoff::AcceptBackoff;
use crate::resilience::timeouts::from_secs;
use crate::worker::{self, Job, JobQueue, WorkerPool};

/// Errors that stop the whole server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0:?}")]
    Config(Vec<ValidationError>),
    #[error(transparent)]
    Listen(#[from] ListenerError),
    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// State shared by every connection task of one listener.
#[derive(Clone)]
struct ConnectionContext {
    queue: JobQueue<Job>,
    tls: Option<TlsAcceptor>,
    tracker: ConnectionTracker,
    settings: ReaderSettings,
    handshake_timeout: Option<std::time::Duration>,
}

/// Concurrent request server.
pub struct Server {
    config: ServerConfig,
    handler: Arc<dyn Handler>,
    tracker: ConnectionTracker,
}

impl Server {
    /// Create a server. Fails if the configuration does not validate.
    pub fn new<H: Handler>(config: ServerConfig, handler: H) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ServerError::Config)?;
        Ok(Self {
            config,
            handler: Arc::new(handler),
            tracker: ConnectionTracker::new(),
        })
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Tracker for the server's open connections.
    pub fn connections(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Bind every configured listener and serve until shutdown.
    pub async fn start(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let mut listeners = Vec::with_capacity(1 + self.config.additional_listeners.len());
        for config in std::iter::once(&self.config.listener).chain(&self.config.additional_listeners) {
            listeners.push(Listener::bind(config).await?);
        }
        self.serve(listeners, shutdown).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn run(self, listener: Listener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        self.serve(vec![listener], shutdown).await
    }

    /// Serve on already bound listeners until shutdown.
    ///
    /// All listeners feed the same job queue and worker pool. Each one
    /// terminates TLS with its own material, if it has any.
    pub async fn serve(self, listeners: Vec<Listener>, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let mut bound = Vec::with_capacity(listeners.len());
        for listener in listeners {
            let tls = match listener.tls() {
                Some(tls_config) => Some(tls::load_acceptor(tls_config).await?),
                None => None,
            };
            let address = listener.local_addr().map_err(ListenerError::Bind)?;
            bound.push((listener, address, tls));
        }

        let workers = &self.config.workers;
        let (queue, lanes) = worker::bounded(workers.count, workers.queue_capacity);
        let pool = WorkerPool::spawn(
            lanes,
            Arc::clone(&self.handler),
            from_secs(self.config.timeouts.handler_secs),
            shutdown.clone(),
        );

        let shared = ConnectionContext {
            queue,
            tls: None,
            tracker: self.tracker.clone(),
            settings: ReaderSettings {
                limits: ParseLimits::from(&self.config.limits),
                read_timeout: from_secs(self.config.timeouts.read_secs),
            },
            handshake_timeout: from_secs(self.config.timeouts.handshake_secs),
        };
        tracing::info!(
            listeners = bound.len(),
            workers = pool.size(),
            queue_capacity = shared.queue.capacity(),
            "Server starting"
        );

        let accept_loops = bound.into_iter().map(|(listener, address, tls)| {
            let context = Arc::new(ConnectionContext {
                tls,
                ..shared.clone()
            });
            accept_loop(listener, address, context, shutdown.clone())
        });
        futures_util::future::join_all(accept_loops).await;

        tracing::info!("Accept loops stopped; waiting for workers");
        drop(shared);
        pool.join().await;
        Ok(())
    }
}

/// Accept connections until shutdown, spawning one task per connection.
async fn accept_loop(
    listener: Listener,
    address: SocketAddr,
    context: Arc<ConnectionContext>,
    mut shutdown: ShutdownSignal,
) {
    tracing::info!(
        address = %address,
        tls = context.tls.is_some(),
        "Server accepting connections"
    );

    let mut backoff = AcceptBackoff::default();
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer_addr, permit)) => {
                backoff.on_success();
                metrics::record_connection_accepted();
                tokio::spawn(handle_connection(
                    stream,
                    peer_addr,
                    permit,
                    Arc::clone(&context),
                    shutdown.clone(),
                ));
            }
            Err(e) => {
                metrics::record_accept_error();
                let delay = backoff.on_failure();
                tracing::error!(address = %address, error = %e, retry_in = ?delay, "Error accepting connection");
                tokio::time::sleep(delay).await;
            }
        }
    }
    tracing::debug!(address = %address, "Accept loop stopped");
}

/// Drive one accepted connection: optional TLS handshake, then reading.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    permit: ConnectionPermit,
    context: Arc<ConnectionContext>,
    mut shutdown: ShutdownSignal,
) {
    let guard = context.tracker.track(Some(permit));
    let span = tracing::debug_span!(
        "connection",
        connection_id = %guard.id(),
        peer_addr = %peer_addr
    );

    async move {
        let transport = match &context.tls {
            Some(acceptor) => {
                let handshake = tokio::select! {
                    biased;
                    _ = shutdown.wait() => return,
                    handshake = tls::handshake(acceptor, stream, context.handshake_timeout) => handshake,
                };
                match handshake {
                    Ok(stream) => Transport::from(stream),
                    Err(e) => {
                        metrics::record_tls_handshake_failure();
                        tracing::debug!(error = %e, "TLS handshake failed");
                        return;
                    }
                }
            }
            None => Transport::from(stream),
        };
        tracing::debug!(tls = transport.is_tls(), "Connection ready");

        read_requests(
            transport,
            guard,
            peer_addr,
            context.settings,
            context.queue.clone(),
            shutdown,
        )
        .await;
    }
    .instrument(span)
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, ResponseWriter};

    async fn noop(_writer: ResponseWriter, _request: Request) {}

    #[test]
    fn rejects_zero_workers_at_construction() {
        let mut config = ServerConfig::default();
        config.workers.count = 0;

        match Server::new(config, noop) {
            Err(ServerError::Config(errors)) => {
                assert_eq!(errors, vec![ValidationError::ZeroWorkers]);
            }
            _ => panic!("zero workers must be rejected"),
        }
    }

    #[tokio::test]
    async fn missing_tls_material_is_fatal_at_startup() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.listener.tls = Some(crate::config::TlsConfig {
            cert_path: "/missing/cert.pem".into(),
            key_path: "/missing/key.pem".into(),
        });
        let server = Server::new(config, noop).unwrap();
        let shutdown = crate::lifecycle::Shutdown::new();

        let result = server.start(shutdown.subscribe()).await;
        assert!(matches!(result, Err(ServerError::Tls(TlsError::Load(_)))));
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = ServerConfig::default();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();
        let server = Server::new(config, noop).unwrap();
        let shutdown = crate::lifecycle::Shutdown::new();

        let result = server.start(shutdown.subscribe()).await;
        assert!(matches!(result, Err(ServerError::Listen(ListenerError::Bind(_)))));
    }
}
