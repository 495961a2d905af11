// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`BusConsumer`]: binds a durable queue to a topic exchange and feeds
//! decoded RUN packets into a [`TaskManager`](reasonchip_taskmanager::TaskManager).
//! The "ack once the RESULT has been published" rule is implemented by
//! [`AckOnEmit`], a [`ResultSink`] wrapper that acks the originating
//! delivery only after the wrapped sink has actually emitted the
//! matching RESULT.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicRejectOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use parking_lot::Mutex;
use reasonchip_core::Cookie;
use reasonchip_taskmanager::{Incoming, ResultSink};
use reasonchip_wire::Packet;
use tokio::sync::mpsc;

use crate::error::BusError;

/// Delivery ackers keyed by the cookie of the RUN packet they carried,
/// shared between a [`BusConsumer`] and the [`AckOnEmit`] sink wrapping
/// its worker's RESULT emission.
pub type PendingAcks = Arc<Mutex<HashMap<Cookie, Acker>>>;

/// A connected subscriber on a durable queue bound to a topic exchange.
pub struct BusConsumer {
    _connection: Connection,
    channel: Channel,
    queue: String,
    pending: PendingAcks,
}

impl BusConsumer {
    /// Connect to `amqp_url`, declare `queue` and `exchange` (both
    /// durable), and bind the queue to the exchange under `routing_key`.
    /// An empty `exchange` skips the declare/bind step, consuming
    /// directly off `queue` as a plain work queue.
    pub async fn connect(
        amqp_url: &str,
        queue: impl Into<String>,
        exchange: &str,
        routing_key: &str,
    ) -> Result<Self, BusError> {
        let queue = queue.into();

        tracing::debug!(amqp_url, queue, exchange, routing_key, "connecting AMQP consumer");

        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .map_err(BusError::Connect)?;

        let channel = connection.create_channel().await.map_err(BusError::Connect)?;

        channel
            .queue_declare(&queue, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
            .await
            .map_err(BusError::Connect)?;

        if !exchange.is_empty() {
            channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Topic,
                    ExchangeDeclareOptions { durable: true, ..Default::default() },
                    FieldTable::default(),
                )
                .await
                .map_err(BusError::Connect)?;

            channel
                .queue_bind(&queue, exchange, routing_key, QueueBindOptions::default(), FieldTable::default())
                .await
                .map_err(BusError::Connect)?;
        }

        tracing::debug!(queue, "AMQP consumer connected");

        Ok(Self { _connection: connection, channel, queue, pending: Arc::new(Mutex::new(HashMap::new())) })
    }

    /// The shared ack table; hand a clone to the [`AckOnEmit`] wrapping
    /// the worker's [`ResultSink`] so RESULT emission can settle the
    /// originating delivery.
    pub fn pending_acks(&self) -> PendingAcks {
        Arc::clone(&self.pending)
    }

    /// Consume messages, decode each as a [`Packet`], and forward
    /// well-formed RUN packets into `feed`. Malformed bodies are
    /// rejected without requeue immediately; well-formed RUN packets are
    /// held in [`PendingAcks`] until the matching [`AckOnEmit`] settles
    /// them. Returns once the consumer channel is cancelled or the
    /// connection drops.
    pub async fn run(self, feed: mpsc::Sender<Incoming>) -> Result<(), BusError> {
        let mut consumer = self
            .channel
            .basic_consume(&self.queue, "reasonchip-bus-consumer", BasicConsumeOptions::default(), FieldTable::default())
            .await
            .map_err(BusError::Amqp)?;

        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(err) => {
                    tracing::warn!(%err, "AMQP consumer stream error");
                    break;
                }
            };

            let packet: Packet = match serde_json::from_slice(&delivery.data) {
                Ok(packet) => packet,
                Err(err) => {
                    tracing::warn!(%err, "rejecting malformed packet from the bus");
                    let _ = delivery.acker.reject(BasicRejectOptions { requeue: false }).await;
                    continue;
                }
            };

            if !packet.is_well_formed() {
                tracing::warn!(?packet.packet_type, "rejecting ill-formed packet from the bus");
                let _ = delivery.acker.reject(BasicRejectOptions { requeue: false }).await;
                continue;
            }

            match packet.cookie {
                Some(cookie) => {
                    self.pending.lock().insert(cookie, delivery.acker);
                }
                None => {
                    // No cookie to correlate against a RESULT; settle now.
                    let _ = delivery.acker.ack(BasicAckOptions::default()).await;
                }
            }

            if feed.send(Some(packet)).await.is_err() {
                tracing::warn!("task manager feed closed while the bus consumer was still running");
                break;
            }
        }

        let _ = feed.send(None).await;

        Ok(())
    }
}

/// A [`ResultSink`] wrapper that settles the AMQP delivery a RUN packet
/// arrived on only once the matching RESULT has been emitted by `inner`.
/// If `inner.emit` fails the delivery is
/// requeued instead, so a crashed or disconnected worker's in-flight
/// work is retried by another consumer.
pub struct AckOnEmit<R: ResultSink> {
    inner: R,
    pending: PendingAcks,
}

impl<R: ResultSink> AckOnEmit<R> {
    pub fn new(inner: R, pending: PendingAcks) -> Self {
        Self { inner, pending }
    }
}

#[async_trait]
impl<R: ResultSink> ResultSink for AckOnEmit<R> {
    async fn emit(&self, packet: Packet) -> bool {
        let cookie = packet.cookie;
        let ok = self.inner.emit(packet).await;

        let Some(cookie) = cookie else { return ok };
        let Some(acker) = self.pending.lock().remove(&cookie) else {
            return ok;
        };

        let settled = if ok {
            acker.ack(BasicAckOptions::default()).await
        } else {
            acker.nack(BasicNackOptions { requeue: true, ..Default::default() }).await
        };

        if let Err(err) = settled {
            tracing::warn!(%cookie, %err, "failed to settle AMQP delivery");
        }

        ok
    }

    async fn register(&self, capacity: u32) -> bool {
        self.inner.register(capacity).await
    }
}
