// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`TaskManager`]: the bounded-capacity scheduler in front of an
//! [`Engine`](reasonchip_engine::Engine). A `tokio::select!` loop over a
//! [`JoinSet`] of in-flight engine invocations, the incoming-packet
//! channel, and a `dying` [`CancellationToken`] picks whichever
//! completes first, exactly mirroring a first-completed wait over three
//! event sources.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reasonchip_core::Cookie;
use reasonchip_engine::Engine;
use reasonchip_wire::{Packet, PacketType, ResultCode};
use serde_json::Value;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::TaskManagerError;
use crate::sink::ResultSink;

/// One message on the feed channel: `Some(packet)` for a packet
/// received from the worker's transport/bus connection, `None` when
/// that connection has gone away (the feed's equivalent of EOF).
pub type Incoming = Option<Packet>;

/// The bounded-capacity scheduler shared by both worker variants.
///
/// Generic over `R: ResultSink` so the broker-attached and bus-attached
/// workers can reuse one state machine while only swapping how a
/// RESULT leaves the process.
pub struct TaskManager<R: ResultSink> {
    engine: Engine,
    sink: Arc<R>,
    capacity: u32,
    semaphore: Arc<Semaphore>,
    feed_tx: mpsc::Sender<Incoming>,
    feed_rx: tokio::sync::Mutex<Option<mpsc::Receiver<Incoming>>>,
    dying: CancellationToken,
    tasks: Mutex<HashMap<Cookie, CancellationToken>>,
    handler: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<R: ResultSink> TaskManager<R> {
    /// Create a task manager over `engine`, emitting results through
    /// `sink`, admitting at most `capacity` concurrent engine runs.
    pub fn new(engine: Engine, sink: R, capacity: u32) -> Self {
        let (feed_tx, feed_rx) = mpsc::channel(64);
        Self {
            engine,
            sink: Arc::new(sink),
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            feed_tx,
            feed_rx: tokio::sync::Mutex::new(Some(feed_rx)),
            dying: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
            handler: tokio::sync::Mutex::new(None),
        }
    }

    /// A sender that the worker's transport/bus binding feeds incoming
    /// RUN/CANCEL/SHUTDOWN packets into, and `None` when the connection
    /// dies.
    pub fn feed(&self) -> mpsc::Sender<Incoming> {
        self.feed_tx.clone()
    }

    /// How many concurrent engine runs this task manager admits.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// How many engine runs are currently in flight.
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Announce capacity (if the sink requires it) and start the
    /// multiplexing loop.
    pub async fn start(self: &Arc<Self>) -> Result<(), TaskManagerError> {
        if self.capacity == 0 {
            return Err(TaskManagerError::ZeroCapacity);
        }

        let mut handler = self.handler.lock().await;
        if handler.is_some() {
            return Err(TaskManagerError::AlreadyStarted);
        }

        if !self.sink.register(self.capacity).await {
            return Err(TaskManagerError::RegistrationFailed);
        }

        let feed_rx = self
            .feed_rx
            .lock()
            .await
            .take()
            .ok_or(TaskManagerError::AlreadyStarted)?;

        let this = Arc::clone(self);
        *handler = Some(tokio::spawn(this.run_loop(feed_rx)));

        Ok(())
    }

    /// Request shutdown and wait (optionally bounded by `timeout`) for
    /// the multiplexing loop to drain and exit.
    pub async fn stop(&self, timeout: Option<Duration>) -> bool {
        self.dying.cancel();
        self.wait(timeout).await
    }

    /// Wait for the multiplexing loop to finish.
    pub async fn wait(&self, timeout: Option<Duration>) -> bool {
        let handle = self.handler.lock().await.take();
        let Some(handle) = handle else {
            return true;
        };

        let joined = match timeout {
            Some(d) => tokio::time::timeout(d, handle).await,
            None => Ok(handle.await),
        };

        match joined {
            Ok(_) => true,
            Err(_) => false,
        }
    }

    async fn run_loop(self: Arc<Self>, mut feed_rx: mpsc::Receiver<Incoming>) {
        tracing::debug!("entering task manager multiplexing loop");

        let mut running: JoinSet<(Cookie, Packet)> = JoinSet::new();
        let mut incoming_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.dying.cancelled(), if incoming_open => {
                    tracing::debug!("started dying because we were requested to die");
                    incoming_open = false;
                }

                maybe = feed_rx.recv(), if incoming_open => {
                    match maybe {
                        Some(Some(packet)) => {
                            if !self.process_packet(packet, &mut running).await {
                                incoming_open = false;
                                self.dying.cancel();
                            }
                        }
                        _ => {
                            tracing::warn!("incoming feed closed, time to die");
                            incoming_open = false;
                            self.dying.cancel();
                        }
                    }
                }

                Some(joined) = running.join_next(), if !running.is_empty() => {
                    if let Ok((cookie, result)) = joined {
                        self.tasks.lock().remove(&cookie);
                        tracing::debug!(%cookie, "engine run completed");
                        if !self.sink.emit(result).await {
                            tracing::warn!(%cookie, "failed to emit result packet");
                        }
                    }
                }

                else => break,
            }

            if !incoming_open && running.is_empty() {
                break;
            }
        }

        tracing::debug!("exiting task manager multiplexing loop");
    }

    async fn process_packet(&self, packet: Packet, running: &mut JoinSet<(Cookie, Packet)>) -> bool {
        match packet.packet_type {
            PacketType::Run => self.handle_run(packet, running).await,
            PacketType::Cancel => self.handle_cancel(packet).await,
            PacketType::Shutdown => {
                tracing::info!("shutdown request received");
                false
            }
            other => {
                tracing::error!(?other, "unsupported packet type on task manager");
                false
            }
        }
    }

    async fn handle_run(&self, packet: Packet, running: &mut JoinSet<(Cookie, Packet)>) -> bool {
        let (Some(cookie), Some(workflow)) = (packet.cookie, packet.workflow.clone()) else {
            tracing::error!("missing cookie or workflow on RUN packet");
            return true;
        };

        if self.tasks.lock().contains_key(&cookie) {
            tracing::error!(%cookie, "cookie collision has occurred on RUN");
            self.sink
                .emit(Packet::result_terminal(cookie, ResultCode::CookieCollision, None))
                .await;
            return true;
        }

        let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::error!(%cookie, "capacity reached; we should never have been asked");
                self.sink
                    .emit(Packet::result_terminal(cookie, ResultCode::NoCapacity, None))
                    .await;
                return true;
            }
        };

        let cancel = CancellationToken::new();
        self.tasks.lock().insert(cookie, cancel.clone());

        let engine = self.engine.clone();
        let variables = packet.variables.clone();

        running.spawn(async move {
            let _permit = permit;
            let result = run_one(&engine, cookie, &workflow, variables, cancel).await;
            (cookie, result)
        });

        true
    }

    async fn handle_cancel(&self, packet: Packet) -> bool {
        let Some(cookie) = packet.cookie else {
            tracing::error!("missing cookie on CANCEL packet");
            return true;
        };

        match self.tasks.lock().get(&cookie).cloned() {
            Some(cancel) => {
                tracing::info!(%cookie, "cancelling task");
                cancel.cancel();
            }
            None => {
                tracing::warn!(%cookie, "cookie not found trying to cancel, possible race");
            }
        }

        true
    }
}

async fn run_one(
    engine: &Engine,
    cookie: Cookie,
    workflow: &str,
    variables: Option<String>,
    cancel: CancellationToken,
) -> Packet {
    let start = std::time::Instant::now();

    let args = match &variables {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(err) => {
                return Packet::result_exception(cookie, format!("invalid variables: {err}"), Vec::new());
            }
        },
        None => Value::Object(Default::default()),
    };

    let result = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::info!(%cookie, "engine run cancelled");
            Packet::result_terminal(cookie, ResultCode::Cancelled, None)
        }
        outcome = engine.run(workflow, args) => match outcome {
            Ok(value) => match serde_json::to_string(&value) {
                Ok(encoded) => Packet::result_ok(cookie, encoded),
                Err(err) => Packet::result_exception(cookie, err.to_string(), Vec::new()),
            },
            Err(err) => Packet::result_exception(cookie, err.to_string(), vec![format!("{err:?}")]),
        },
    };

    tracing::info!(
        %cookie,
        workflow,
        elapsed_us = start.elapsed().as_micros() as u64,
        "engine task completed",
    );

    result
}
