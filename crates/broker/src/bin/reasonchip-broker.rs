// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The standalone broker process: binds a worker-facing and
//! a client-facing [`ServerTransport`](reasonchip_transport::ServerTransport)
//! and runs [`Broker`] until SIGINT/SIGTERM/SIGHUP.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use reasonchip_broker::Broker;
use reasonchip_transport::{Endpoint, Role, TlsConfig};

#[derive(Parser)]
#[command(name = "reasonchip-broker", version, about = "ReasonChip broker process")]
struct Args {
    /// Worker-facing listen endpoint, e.g. `tcp://0.0.0.0:51510`
    #[arg(long, default_value = "socket:///tmp/reasonchip-broker-worker.sock")]
    worker_listen: String,

    /// Client-facing listen endpoint, e.g. `tcp://0.0.0.0:51500`
    #[arg(long, default_value = "socket:///tmp/reasonchip-broker-client.sock")]
    client_listen: String,

    /// TLS certificate (PEM) for both listeners; requires --tls-key
    #[arg(long, value_name = "PATH")]
    tls_cert: Option<PathBuf>,

    /// TLS private key (PEM) for both listeners; requires --tls-cert
    #[arg(long, value_name = "PATH")]
    tls_key: Option<PathBuf>,

    /// Additional trust anchor (PEM) beyond the platform's native roots
    #[arg(long, value_name = "PATH")]
    tls_ca: Option<PathBuf>,

    /// Require and verify a peer certificate on both listeners (mutual TLS)
    #[arg(long, default_value_t = false)]
    tls_require_client_auth: bool,
}

fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let spawned = token.clone();

    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let Ok(mut sigint) = signal(SignalKind::interrupt()) else { return };
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else { return };
        let Ok(mut sighup) = signal(SignalKind::hangup()) else { return };

        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            _ = sighup.recv() => tracing::info!("received SIGHUP"),
        }

        spawned.cancel();
    });

    token
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let tls = TlsConfig::from_flags(
        args.tls_cert.as_deref(),
        args.tls_key.as_deref(),
        args.tls_ca.as_deref(),
        args.tls_require_client_auth,
    )
    .context("parsing --tls-* flags")?;

    let worker_endpoint = Endpoint::parse(&args.worker_listen, Role::Worker).context("parsing --worker-listen")?;
    let client_endpoint = Endpoint::parse(&args.client_listen, Role::Client).context("parsing --client-listen")?;

    let worker_transport = reasonchip_transport::bind_server(&worker_endpoint, tls.as_ref())
        .await
        .context("binding worker-facing transport")?;
    let client_transport = reasonchip_transport::bind_server(&client_endpoint, tls.as_ref())
        .await
        .context("binding client-facing transport")?;

    let broker = Broker::new(worker_transport, client_transport);
    broker.start().await.context("starting broker")?;

    tracing::info!(worker = %args.worker_listen, client = %args.client_listen, "broker listening");

    let shutdown = shutdown_token();
    shutdown.cancelled().await;

    tracing::info!("broker shutting down");
    broker.stop().await;

    Ok(())
}
