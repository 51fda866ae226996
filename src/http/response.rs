//! Raw response writing.
//!
//! The writer adds nothing: status line, headers and terminator are the
//! handler's job. Every write is flushed before it returns.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::sync::Mutex;

use crate::net::{ConnectionId, Transport};

/// Write handle bound to exactly one connection.
#[derive(Clone)]
pub struct ResponseWriter {
    inner: Arc<Mutex<WriteHalf<Transport>>>,
    connection_id: ConnectionId,
    peer_addr: SocketAddr,
}

impl ResponseWriter {
    pub(crate) fn new(
        half: WriteHalf<Transport>,
        connection_id: ConnectionId,
        peer_addr: SocketAddr,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(half)),
            connection_id,
            peer_addr,
        }
    }

    /// Write `data` to the connection. Returns the number of bytes written.
    pub async fn write(&self, data: &[u8]) -> io::Result<usize> {
        let mut half = self.inner.lock().await;
        half.write_all(data).await?;
        half.flush().await?;
        Ok(data.len())
    }

    /// Shut down the write side. On TLS connections this sends close_notify.
    pub async fn close(&self) -> io::Result<()> {
        self.inner.lock().await.shutdown().await
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("connection_id", &self.connection_id)
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}
