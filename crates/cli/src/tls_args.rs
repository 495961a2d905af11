// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! `--tls-*` flags shared by every subcommand that dials or binds a
//! transport, flattened into each command's own `Args` struct.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use reasonchip_transport::TlsConfig;

#[derive(Args)]
pub struct TlsArgs {
    /// TLS certificate (PEM); requires --tls-key
    #[arg(long, value_name = "PATH")]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM); requires --tls-cert
    #[arg(long, value_name = "PATH")]
    pub tls_key: Option<PathBuf>,

    /// Additional trust anchor (PEM) beyond the platform's native roots
    #[arg(long, value_name = "PATH")]
    pub tls_ca: Option<PathBuf>,

    /// Require and verify a peer certificate (mutual TLS)
    #[arg(long, default_value_t = false)]
    pub tls_require_client_auth: bool,
}

impl TlsArgs {
    /// `None` if no `--tls-*` flag was given.
    pub fn config(&self) -> Result<Option<TlsConfig>> {
        Ok(TlsConfig::from_flags(
            self.tls_cert.as_deref(),
            self.tls_key.as_deref(),
            self.tls_ca.as_deref(),
            self.tls_require_client_auth,
        )?)
    }
}
