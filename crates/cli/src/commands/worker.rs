// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! `reasonchip worker`: the broker-attached worker variant. Connects out to the broker's worker-facing endpoint,
//! announces capacity with REGISTER, and runs a
//! [`TaskManager`](reasonchip_taskmanager::TaskManager) whose
//! [`ResultSink`] writes straight back onto the same connection.
//!
//! A single task owns the transport exclusively and pumps an outbound
//! channel into `send()` against `recv()` results, the same shape as
//! [`reasonchip_client::Multiplexor`]'s driver loop — sharing one
//! `Box<dyn ClientTransport>` behind a mutex would let an in-flight
//! `recv()` block every concurrent `send()`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use tokio::sync::mpsc;

use reasonchip_engine::Engine;
use reasonchip_taskmanager::{Incoming, ResultSink, TaskManager};
use reasonchip_transport::{Endpoint, Role};
use reasonchip_wire::Packet;

use crate::exit_code::ExitCode;
use crate::signals::shutdown_token;
use crate::tls_args::TlsArgs;

#[derive(Args)]
pub struct WorkerArgs {
    /// Broker worker-facing endpoint, e.g. `tcp://broker.internal:51510`
    /// or `socket:///tmp/reasonchip-broker-worker.sock`
    #[arg(long)]
    pub broker: String,

    /// Maximum number of workflow runs in flight at once
    #[arg(long, default_value_t = 4)]
    pub tasks: u32,

    /// Register a workflow collection as `name=path` (only `demo=...`
    /// is recognized; dynamic module loading is out of scope)
    #[arg(long = "collection", value_name = "NAME=PATH")]
    pub collections: Vec<String>,

    #[command(flatten)]
    pub tls: TlsArgs,
}

/// Emits RESULTs (and the initial REGISTER) onto the worker's single
/// broker connection via an outbound channel owned by the driver task.
struct ConnectionSink {
    outbound: mpsc::UnboundedSender<Packet>,
}

#[async_trait]
impl ResultSink for ConnectionSink {
    async fn emit(&self, packet: Packet) -> bool {
        self.outbound.send(packet).is_ok()
    }

    async fn register(&self, capacity: u32) -> bool {
        self.outbound.send(Packet::register(capacity)).is_ok()
    }
}

pub async fn handle(args: WorkerArgs) -> Result<ExitCode> {
    let registry = match super::resolve_registry(&args.collections) {
        Ok(registry) => registry,
        Err(code) => return Ok(code),
    };

    let tls = args.tls.config().context("parsing --tls-* flags")?;

    let endpoint = Endpoint::parse(&args.broker, Role::Worker).context("parsing --broker")?;
    let mut transport = reasonchip_transport::connect_client(&endpoint, tls.as_ref())
        .await
        .context("connecting to broker")?;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Packet>();

    let engine = Engine::new(registry);
    let sink = ConnectionSink { outbound: outbound_tx };
    let manager = Arc::new(TaskManager::new(engine, sink, args.tasks));
    let feed = manager.feed();

    let shutdown = shutdown_token();
    let driver_shutdown = shutdown.clone();

    let driver = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = driver_shutdown.cancelled() => break,

                maybe_out = outbound_rx.recv() => {
                    match maybe_out {
                        Some(packet) => {
                            if transport.send(packet).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                incoming = transport.recv() => {
                    let forwarded: Incoming = match incoming {
                        Ok(packet) => Some(packet),
                        Err(_) => None,
                    };
                    let closed = forwarded.is_none();
                    if feed.send(forwarded).await.is_err() || closed {
                        break;
                    }
                }
            }
        }

        let _ = transport.close().await;
    });

    manager.start().await.context("starting task manager")?;

    tracing::info!(broker = %args.broker, tasks = args.tasks, "worker connected and registered");

    shutdown.cancelled().await;
    tracing::info!("worker shutting down");

    manager.stop(Some(Duration::from_secs(10))).await;
    driver.abort();

    Ok(ExitCode::Ok)
}
