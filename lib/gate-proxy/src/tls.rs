//! TLS listener configuration for the HTTPS gateway
//!
//! Builds the rustls server configuration and controls whether the
//! handshake requests a client certificate. The accepted peer
//! certificate becomes the gate's connection-level certificate slot.

use anyhow::{anyhow, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use rustls_pemfile::{certs, read_all};
use std::io::BufReader;
use std::sync::Arc;
use tracing::{debug, info};

/// Client authentication mode for incoming TLS connections
#[derive(Clone, Debug, PartialEq)]
pub enum ClientAuthMode {
    /// No client certificate requested during the handshake
    NoClientAuth,
    /// Client certificate requested but connections without one are
    /// still accepted (the gate decides later, possibly via header)
    Optional,
    /// Client certificate required to complete the handshake
    Required,
}

impl ClientAuthMode {
    /// Parse client auth mode from string
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "required" => ClientAuthMode::Required,
            "optional" => ClientAuthMode::Optional,
            _ => ClientAuthMode::NoClientAuth,
        }
    }

    /// Check if client auth is required
    pub fn is_required(&self) -> bool {
        matches!(self, ClientAuthMode::Required)
    }

    /// Check if client auth is optional or required
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ClientAuthMode::NoClientAuth)
    }
}

/// Load certificates from PEM-encoded data
pub fn load_certificates(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(pem_data);
    certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("Failed to parse certificates: {}", e))
}

/// TLS configuration for the HTTPS listener
#[derive(Clone)]
pub struct TlsServerConfig {
    /// Rustls server configuration
    pub config: Arc<ServerConfig>,
    /// Client authentication mode negotiated during the handshake
    pub client_auth: ClientAuthMode,
}

impl TlsServerConfig {
    /// Create a TLS configuration from PEM-encoded certificate and key,
    /// optionally requesting client certificates during the handshake.
    ///
    /// `client_ca_pem` holds the CA bundle used by rustls to accept
    /// client certificates and is required whenever `client_auth` is
    /// enabled. Identity checks beyond the handshake are the gate's
    /// job, not this listener's.
    pub fn from_pem(
        cert_pem: &[u8],
        key_pem: &[u8],
        client_ca_pem: Option<&[u8]>,
        client_auth: ClientAuthMode,
    ) -> Result<Self> {
        debug!("Creating TLS configuration from PEM data");

        let certs_vec = load_certificates(cert_pem)?;
        if certs_vec.is_empty() {
            return Err(anyhow!("No certificates found in PEM data"));
        }
        debug!("Loaded {} certificate(s)", certs_vec.len());

        let private_key = read_private_key(key_pem)?;
        debug!("Loaded private key");

        let config = if client_auth.is_enabled() {
            let ca_pem = client_ca_pem
                .ok_or_else(|| anyhow!("Client auth enabled but no client CA configured"))?;
            let ca_certs = load_certificates(ca_pem)?;
            if ca_certs.is_empty() {
                return Err(anyhow!("No CA certificates found in client CA PEM data"));
            }

            let mut root_store = RootCertStore::empty();
            for cert in ca_certs {
                root_store
                    .add(cert)
                    .map_err(|e| anyhow!("Failed to add CA certificate to root store: {}", e))?;
            }

            let mut builder = WebPkiClientVerifier::builder(Arc::new(root_store));
            if !client_auth.is_required() {
                builder = builder.allow_unauthenticated();
            }
            let verifier = builder
                .build()
                .map_err(|e| anyhow!("Failed to create client certificate verifier: {}", e))?;

            ServerConfig::builder()
                .with_client_cert_verifier(verifier)
                .with_single_cert(certs_vec, private_key)
                .map_err(|e| anyhow!("Failed to create TLS config: {}", e))?
        } else {
            ServerConfig::builder()
                .with_no_client_auth()
                .with_single_cert(certs_vec, private_key)
                .map_err(|e| anyhow!("Failed to create TLS config: {}", e))?
        };

        info!(
            "TLS configuration created with client auth mode: {:?}",
            client_auth
        );

        Ok(Self {
            config: Arc::new(config),
            client_auth,
        })
    }
}

/// Find the first private key in PEM data
fn read_private_key(key_pem: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut key_reader = BufReader::new(key_pem);
    let items: Vec<_> = read_all(&mut key_reader)
        .collect::<Result<_, _>>()
        .map_err(|e| anyhow!("Failed to parse private key: {}", e))?;

    for item in items {
        match item {
            rustls_pemfile::Item::Pkcs8Key(k) => return Ok(PrivateKeyDer::Pkcs8(k)),
            rustls_pemfile::Item::Sec1Key(k) => return Ok(PrivateKeyDer::Sec1(k)),
            rustls_pemfile::Item::Pkcs1Key(k) => return Ok(PrivateKeyDer::Pkcs1(k)),
            _ => {}
        }
    }

    Err(anyhow!("No private key found in PEM data"))
}
