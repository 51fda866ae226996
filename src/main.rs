//! Conveyor request server.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                       CONVEYOR                           │
//!                 │                                                          │
//!   Client ───────┼─▶ listener ─▶ [tls] ─▶ connection reader (one per conn)  │
//!                 │                              │ parse request head        │
//!                 │                              ▼                           │
//!                 │                     job queue lane[conn % N]             │
//!                 │                              │ bounded, blocks when full │
//!                 │                              ▼                           │
//!   Client ◀──────┼──── response writer ◀── worker k ──▶ handler             │
//!                 │                                                          │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use conveyor::config::{load_config, validate_config, ListenerConfig, ServerConfig, TlsConfig};
use conveyor::lifecycle::{signals, Shutdown};
use conveyor::observability::{logging, metrics};
use conveyor::{Request, ResponseWriter, Server};

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(about = "Concurrent TCP request server with a fixed worker pool", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the worker count.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Override the job queue capacity.
    #[arg(short, long)]
    queue_capacity: Option<usize>,

    /// Also serve TLS on this address, sharing the worker pool.
    #[arg(long, requires_all = ["tls_cert", "tls_key"])]
    tls_bind: Option<String>,

    /// Certificate chain (PEM) for --tls-bind.
    #[arg(long)]
    tls_cert: Option<String>,

    /// Private key (PEM) for --tls-bind.
    #[arg(long)]
    tls_key: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(workers) = self.workers {
            config.workers.count = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.workers.queue_capacity = capacity;
        }
        if let (Some(bind_address), Some(cert_path), Some(key_path)) =
            (self.tls_bind, self.tls_cert, self.tls_key)
        {
            config.additional_listeners.push(ListenerConfig {
                bind_address,
                tls: Some(TlsConfig {
                    cert_path,
                    key_path,
                }),
                ..config.listener.clone()
            });
        }
        validate_config(&config).map_err(|errors| format!("{:?}", errors))?;
        Ok(config)
    }
}

/// Fixed keep-alive greeting.
async fn hello(writer: ResponseWriter, request: Request) {
    let body = "Hello!\n";
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n{}",
        body.len(),
        body
    );

    if let Err(e) = writer.write(response.as_bytes()).await {
        tracing::warn!(
            connection_id = %request.connection_id(),
            error = %e,
            "Failed to write response"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("conveyor v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        workers = config.workers.count,
        queue_capacity = config.workers.queue_capacity,
        tls = config.listener.tls.is_some(),
        additional_listeners = config.additional_listeners.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let _signals = signals::spawn_signal_listener(shutdown);

    let server = Server::new(config, hello)?;
    server.start(signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
