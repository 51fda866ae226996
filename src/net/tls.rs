//! TLS configuration, certificate loading and handshakes.

use std::io;
use std::path::Path;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;
use crate::resilience::timeouts::with_deadline;

/// Error type for TLS operations.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// Certificate or key could not be loaded. Fatal at startup.
    #[error("Failed to load TLS material: {0}")]
    Load(io::Error),
    /// Handshake with a client failed. Fatal to that connection only.
    #[error("TLS handshake failed: {0}")]
    Handshake(io::Error),
    /// Handshake did not complete in time.
    #[error("TLS handshake timed out")]
    HandshakeTimeout,
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    if !cert_path.exists() {
        return Err(TlsError::Load(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        )));
    }
    if !key_path.exists() {
        return Err(TlsError::Load(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        )));
    }

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(TlsError::Load)
}

/// Build a handshake acceptor from the listener's TLS section.
pub async fn load_acceptor(config: &TlsConfig) -> Result<TlsAcceptor, TlsError> {
    let rustls = load_tls_config(Path::new(&config.cert_path), Path::new(&config.key_path)).await?;
    tracing::info!(cert_path = %config.cert_path, "TLS material loaded");
    Ok(TlsAcceptor::from(rustls.get_inner()))
}

/// Complete the server side of a TLS handshake on an accepted socket.
pub async fn handshake(
    acceptor: &TlsAcceptor,
    stream: TcpStream,
    limit: Option<Duration>,
) -> Result<TlsStream<TcpStream>, TlsError> {
    match with_deadline(limit, acceptor.accept(stream)).await {
        Some(result) => result.map_err(TlsError::Handshake),
        None => Err(TlsError::HandshakeTimeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_certificate_is_load_error() {
        let config = TlsConfig {
            cert_path: "/no/such/cert.pem".into(),
            key_path: "/no/such/key.pem".into(),
        };
        let Err(err) = load_acceptor(&config).await else {
            panic!("loading a missing certificate must fail");
        };
        assert!(matches!(err, TlsError::Load(ref e) if e.kind() == io::ErrorKind::NotFound));
    }
}
