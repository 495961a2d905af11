// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! SIGINT/SIGTERM/SIGHUP → graceful shutdown, for the long-running
//! `worker` and `serve` subcommands.

use tokio_util::sync::CancellationToken;

/// Spawn a task that cancels the returned token on the first of
/// SIGINT, SIGTERM, or SIGHUP.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let spawned = token.clone();

    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(%err, "failed to install SIGINT handler");
                return;
            }
        };
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler");
                return;
            }
        };
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(%err, "failed to install SIGHUP handler");
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            _ = sighup.recv() => tracing::info!("received SIGHUP"),
        }

        spawned.cancel();
    });

    token
}
