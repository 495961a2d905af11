// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! `reasonchip dispatch`: a one-shot RUN sent to a remote broker or bus.
//!
//! Exactly one of `--broker` or `--amqp-url` selects the target (a
//! configuration problem otherwise — see DESIGN.md): against a broker this
//! waits on the [`Client`](reasonchip_client::Client) for the terminal
//! RESULT and prints it; against the bus this is fire-and-forget — the
//! dispatcher has no reply queue of its own.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use reasonchip_core::Cookie;

use reasonchip_bus::BusProducer;
use reasonchip_client::Multiplexor;
use reasonchip_transport::{Endpoint, Role};
use reasonchip_wire::Packet;

use crate::exit_code::ExitCode;
use crate::tls_args::TlsArgs;
use crate::variables;

#[derive(Args)]
pub struct DispatchArgs {
    /// Dotted workflow name to run
    pub workflow: String,

    /// Broker client-facing endpoint, e.g. `tcp://broker.internal:51500`
    #[arg(long, conflicts_with = "amqp_url")]
    pub broker: Option<String>,

    /// AMQP broker URL to publish the RUN packet to instead of a broker
    #[arg(long = "amqp-url", conflicts_with = "broker")]
    pub amqp_url: Option<String>,

    /// Exchange to publish under (bus dispatch only)
    #[arg(long = "amqp-exchange", default_value = "")]
    pub amqp_exchange: String,

    /// Routing key to publish under (bus dispatch only)
    #[arg(long = "amqp-routing-key", default_value = "")]
    pub amqp_routing_key: String,

    /// JSON file to deep-merge into the run's variables, in order
    #[arg(long = "vars", value_name = "FILE")]
    pub vars: Vec<String>,

    /// Override a single variable as `key=value`, applied after `--vars`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// How long to wait for a broker RESULT before giving up
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub tls: TlsArgs,
}

pub async fn handle(args: DispatchArgs) -> Result<ExitCode> {
    let variables = variables::assemble(&args.vars, &args.set)?;
    let encoded = serde_json::to_string(&variables)?;
    let tls = args.tls.config().context("parsing --tls-* flags")?;

    match (&args.broker, &args.amqp_url) {
        (Some(broker), None) => {
            dispatch_to_broker(broker, &args.workflow, encoded, args.timeout_secs, tls.as_ref()).await
        }
        (None, Some(amqp_url)) => {
            dispatch_to_bus(amqp_url, &args.amqp_exchange, &args.amqp_routing_key, &args.workflow, encoded).await
        }
        (None, None) => {
            eprintln!("error: one of --broker or --amqp-url is required");
            Ok(ExitCode::CommandLineError)
        }
        (Some(_), Some(_)) => unreachable!("clap enforces --broker/--amqp-url are mutually exclusive"),
    }
}

async fn dispatch_to_broker(
    broker: &str,
    workflow: &str,
    variables: String,
    timeout_secs: u64,
    tls: Option<&reasonchip_transport::TlsConfig>,
) -> Result<ExitCode> {
    let endpoint = Endpoint::parse(broker, Role::Client).context("parsing --broker")?;
    let transport = reasonchip_transport::connect_client(&endpoint, tls)
        .await
        .context("connecting to broker")?;

    let multiplexor = Multiplexor::new(transport);
    multiplexor.start().await.context("starting multiplexor")?;

    let mut client = multiplexor.register();
    let cookie = Cookie::new();
    client
        .send_with_cookie(Packet::run(cookie, workflow, Some(variables)))
        .await
        .context("sending RUN")?;

    let reply = client.receive(Some(Duration::from_secs(timeout_secs))).await;
    multiplexor.stop().await;

    match reply {
        Some(packet) => {
            println!("{}", serde_json::to_string_pretty(&packet)?);
            match packet.rc {
                Some(reasonchip_wire::ResultCode::Ok) => Ok(ExitCode::Ok),
                _ => Ok(ExitCode::Error),
            }
        }
        None => {
            eprintln!("error: timed out waiting for a RESULT");
            Ok(ExitCode::Error)
        }
    }
}

async fn dispatch_to_bus(
    amqp_url: &str,
    exchange: &str,
    routing_key: &str,
    workflow: &str,
    variables: String,
) -> Result<ExitCode> {
    if routing_key.is_empty() {
        bail!("--amqp-routing-key is required for bus dispatch");
    }

    let producer = BusProducer::connect(amqp_url, exchange, "")
        .await
        .context("connecting AMQP producer")?;

    let cookie = Cookie::new();
    let packet = Packet::run(cookie, workflow, Some(variables));

    if producer.publish(routing_key, &packet).await {
        println!("dispatched {cookie} to {routing_key}");
        Ok(ExitCode::Ok)
    } else {
        eprintln!("error: failed to publish RUN to the bus");
        Ok(ExitCode::Error)
    }
}
