//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use conveyor::config::ServerConfig;
use conveyor::net::{ConnectionTracker, Listener};
use conveyor::{Handler, Request, ResponseWriter, Server, ServerError, Shutdown};

/// A server running on ephemeral local ports.
pub struct TestServer {
    /// Address of the primary listener.
    pub addr: SocketAddr,
    /// Addresses of `additional_listeners`, in configuration order.
    pub additional_addrs: Vec<SocketAddr>,
    pub shutdown: Shutdown,
    pub connections: ConnectionTracker,
    pub task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Trigger shutdown and wait for `run` to return.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
    }
}

/// Config for a local server with the given pool sizing.
pub fn config(workers: usize, queue_capacity: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.workers.count = workers;
    config.workers.queue_capacity = queue_capacity;
    config
}

/// Start a server with `handler`, binding every configured listener first.
pub async fn start_server<H: Handler>(config: ServerConfig, handler: H) -> TestServer {
    let mut listeners = Vec::new();
    for listener_config in std::iter::once(&config.listener).chain(&config.additional_listeners) {
        listeners.push(Listener::bind(listener_config).await.unwrap());
    }
    let mut addrs: Vec<SocketAddr> = listeners
        .iter()
        .map(|listener| listener.local_addr().unwrap())
        .collect();
    let addr = addrs.remove(0);

    let server = Server::new(config, handler).unwrap();
    let connections = server.connections();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let task = tokio::spawn(server.serve(listeners, signal));

    TestServer {
        addr,
        additional_addrs: addrs,
        shutdown,
        connections,
        task,
    }
}

/// Writes `200 OK {method} {target}`.
pub async fn echo(writer: ResponseWriter, request: Request) {
    let body = format!("200 OK {} {}", request.method(), request.target());
    writer.write(body.as_bytes()).await.unwrap();
}

/// Send raw bytes and half-close, then collect everything the server sends.
pub async fn exchange(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received))
        .await
        .expect("server did not close the connection")
        .unwrap();
    received
}

/// Read exactly `len` bytes as text.
pub async fn read_text<S: AsyncRead + Unpin>(stream: &mut S, len: usize) -> String {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for response")
        .unwrap();
    String::from_utf8(buf).unwrap()
}
