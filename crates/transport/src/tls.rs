// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! TLS configuration shared by every socket/TCP/gRPC/HTTP binding.
//! `rustls` throughout, never a second TLS stack.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::TransportError;

/// Cert/key/trust-anchor material for a TLS-wrapped transport.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    /// Additional trust anchors beyond the platform's native roots
    /// (e.g. a private CA for worker/broker mutual TLS).
    pub ca_path: Option<PathBuf>,
    /// Require and verify a client certificate (mutual TLS).
    pub require_client_auth: bool,
}

impl TlsConfig {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            ca_path: None,
            require_client_auth: false,
        }
    }

    pub fn with_ca(mut self, ca_path: impl Into<PathBuf>) -> Self {
        self.ca_path = Some(ca_path.into());
        self
    }

    pub fn with_client_auth_required(mut self, required: bool) -> Self {
        self.require_client_auth = required;
        self
    }

    /// Build a `TlsConfig` from the operator-facing `--tls-cert
    /// --tls-key [--tls-ca] [--tls-require-client-auth]` flags every
    /// binding's CLI surface exposes. `None` when no TLS flags were
    /// given at all; an error if the flags are only partially given
    /// (cert without key, or a CA/client-auth flag without a cert/key
    /// pair to pair them with).
    pub fn from_flags(
        cert_path: Option<&Path>,
        key_path: Option<&Path>,
        ca_path: Option<&Path>,
        require_client_auth: bool,
    ) -> Result<Option<Self>, TransportError> {
        match (cert_path, key_path) {
            (Some(cert), Some(key)) => {
                let mut config = Self::new(cert, key).with_client_auth_required(require_client_auth);
                if let Some(ca) = ca_path {
                    config = config.with_ca(ca);
                }
                Ok(Some(config))
            }
            (None, None) => {
                if ca_path.is_some() || require_client_auth {
                    Err(TransportError::Tls(
                        "--tls-ca and --tls-require-client-auth require --tls-cert and --tls-key".to_string(),
                    ))
                } else {
                    Ok(None)
                }
            }
            _ => Err(TransportError::Tls("--tls-cert and --tls-key must be given together".to_string())),
        }
    }

    /// Build a server-side rustls config from the configured cert/key.
    pub fn server_config(&self) -> Result<Arc<rustls::ServerConfig>, TransportError> {
        let certs = load_certs(&self.cert_path)?;
        let key = load_key(&self.key_path)?;

        let builder = rustls::ServerConfig::builder();

        let config = if self.require_client_auth {
            let ca_path = self
                .ca_path
                .as_ref()
                .ok_or_else(|| TransportError::Tls("client auth requires a ca_path".to_string()))?;
            let roots = load_root_store(ca_path)?;
            let verifier = rustls::server::WebPkiClientVerifier::builder(Arc::new(roots))
                .build()
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(certs, key)
                .map_err(|e| TransportError::Tls(e.to_string()))?
        } else {
            builder
                .with_no_client_auth()
                .with_single_cert(certs, key)
                .map_err(|e| TransportError::Tls(e.to_string()))?
        };

        Ok(Arc::new(config))
    }

    /// Build a client-side rustls config, trusting either the platform's
    /// native roots or the configured `ca_path`.
    pub fn client_config(&self) -> Result<Arc<rustls::ClientConfig>, TransportError> {
        let roots = match &self.ca_path {
            Some(ca_path) => load_root_store(ca_path)?,
            None => {
                let mut roots = rustls::RootCertStore::empty();
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                roots
            }
        };

        let config = rustls::ClientConfig::builder().with_root_certificates(roots).with_no_client_auth();

        Ok(Arc::new(config))
    }

    /// The same trust/identity material as [`Self::server_config`], built
    /// as a tonic `ServerTlsConfig` for the gRPC binding's `Server::builder`
    /// (tonic drives its own TLS handshake on top of rustls rather than
    /// accepting a raw `rustls::ServerConfig`).
    pub fn tonic_server_config(&self) -> Result<tonic::transport::ServerTlsConfig, TransportError> {
        let cert_pem = std::fs::read(&self.cert_path)?;
        let key_pem = std::fs::read(&self.key_path)?;
        let mut config = tonic::transport::ServerTlsConfig::new()
            .identity(tonic::transport::Identity::from_pem(cert_pem, key_pem));

        if self.require_client_auth {
            let ca_path = self
                .ca_path
                .as_ref()
                .ok_or_else(|| TransportError::Tls("client auth requires a ca_path".to_string()))?;
            let ca_pem = std::fs::read(ca_path)?;
            config = config.client_ca_root(tonic::transport::Certificate::from_pem(ca_pem));
        }

        Ok(config)
    }

    /// The same trust material as [`Self::client_config`], built as a
    /// tonic `ClientTlsConfig` for the gRPC binding's `Channel::builder`.
    pub fn tonic_client_config(&self) -> Result<tonic::transport::ClientTlsConfig, TransportError> {
        let mut config = tonic::transport::ClientTlsConfig::new();

        if let Some(ca_path) = &self.ca_path {
            let ca_pem = std::fs::read(ca_path)?;
            config = config.ca_certificate(tonic::transport::Certificate::from_pem(ca_pem));
        }

        Ok(config)
    }
}

fn load_certs(path: &Path) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, TransportError> {
    let bytes = std::fs::read(path)?;
    rustls_pemfile::certs(&mut bytes.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::Tls(format!("{path:?}: {e}")))
}

fn load_key(path: &Path) -> Result<rustls::pki_types::PrivateKeyDer<'static>, TransportError> {
    let bytes = std::fs::read(path)?;
    rustls_pemfile::private_key(&mut bytes.as_slice())
        .map_err(|e| TransportError::Tls(format!("{path:?}: {e}")))?
        .ok_or_else(|| TransportError::Tls(format!("{path:?}: no private key found")))
}

fn load_root_store(path: &Path) -> Result<rustls::RootCertStore, TransportError> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in load_certs(path)? {
        roots
            .add(cert)
            .map_err(|e| TransportError::Tls(format!("{path:?}: {e}")))?;
    }
    Ok(roots)
}
