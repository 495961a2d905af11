// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`BusProducer`]: publishes packets onto a topic exchange. Used
//! one-shot by `reasonchip dispatch` and continuously by a bus-attached
//! worker to emit RESULTs.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use reasonchip_taskmanager::ResultSink;
use reasonchip_wire::Packet;

use crate::error::BusError;

/// A connected publisher onto a durable topic exchange.
///
/// Implements [`ResultSink`] so a bus-attached worker's [`TaskManager`]
/// (`reasonchip_taskmanager::TaskManager`) can emit RESULT packets to
/// `result_routing_key` the same way a broker-attached worker emits them
/// over a `ClientTransport`. The `dispatch` CLI command instead
/// calls [`BusProducer::publish`] directly, one-shot, with the
/// workflow's own routing key.
pub struct BusProducer {
    _connection: Connection,
    channel: Channel,
    exchange: String,
    result_routing_key: String,
}

impl BusProducer {
    /// Connect to `amqp_url`, declare `exchange` as a durable topic
    /// exchange, and prepare to publish RESULT packets under
    /// `result_routing_key` by default.
    pub async fn connect(
        amqp_url: &str,
        exchange: impl Into<String>,
        result_routing_key: impl Into<String>,
    ) -> Result<Self, BusError> {
        let exchange = exchange.into();
        let result_routing_key = result_routing_key.into();

        tracing::debug!(amqp_url, exchange, "connecting AMQP producer");

        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .map_err(BusError::Connect)?;

        let channel = connection.create_channel().await.map_err(BusError::Connect)?;

        channel
            .exchange_declare(
                &exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(BusError::Connect)?;

        tracing::debug!(exchange, "AMQP producer connected");

        Ok(Self { _connection: connection, channel, exchange, result_routing_key })
    }

    /// Publish `packet` under `routing_key`, persistently. Returns `false`
    /// (never an error) on any publish failure.
    pub async fn publish(&self, routing_key: &str, packet: &Packet) -> bool {
        let body = match serde_json::to_vec(packet) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(%err, "failed to encode packet for the bus");
                return false;
            }
        };

        let props = BasicProperties::default().with_delivery_mode(2); // persistent

        match self
            .channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                props,
            )
            .await
        {
            Ok(confirm) => match confirm.await {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!(%err, "AMQP broker did not confirm publish");
                    false
                }
            },
            Err(err) => {
                tracing::warn!(%err, "failed to publish message to AMQP broker");
                false
            }
        }
    }
}

#[async_trait]
impl ResultSink for BusProducer {
    async fn emit(&self, packet: Packet) -> bool {
        self.publish(&self.result_routing_key, &packet).await
    }
}
