//! Client certificate model backed by raw DER bytes

use gate_core::{GateError, Result};
use x509_parser::prelude::*;

/// Identity facts the gate needs from a resolved client certificate.
///
/// The gate and validator work against this seam so tests can inject
/// certificates with controlled failure modes and track release.
pub trait ResolvedCertificate {
    /// Subject common name, if the certificate carries one.
    fn subject_common_name(&self) -> Result<Option<String>>;

    /// Raw DER bytes of the subject distinguished name.
    fn subject_name_raw(&self) -> Result<Vec<u8>>;

    /// Raw DER bytes of the issuer distinguished name.
    fn issuer_name_raw(&self) -> Result<Vec<u8>>;
}

/// An X.509 client certificate, owned by the request that resolved it.
///
/// Holds the DER encoding and parses on access; the certificate is
/// never mutated after resolution. Release is the drop at the end of
/// the gate's decision scope.
#[derive(Debug, Clone)]
pub struct ClientCertificate {
    der: Vec<u8>,
}

impl ClientCertificate {
    /// Construct from DER bytes, rejecting anything that does not
    /// parse as an X.509 certificate.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        X509Certificate::from_der(&der)
            .map_err(|e| GateError::MalformedCertificate(e.to_string()))?;
        Ok(Self { der })
    }

    /// The DER encoding of this certificate.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    fn parse(&self) -> Result<X509Certificate<'_>> {
        let (_, cert) = X509Certificate::from_der(&self.der)
            .map_err(|e| GateError::MalformedCertificate(e.to_string()))?;
        Ok(cert)
    }
}

impl ResolvedCertificate for ClientCertificate {
    fn subject_common_name(&self) -> Result<Option<String>> {
        let cert = self.parse()?;
        let first_cn = cert.subject().iter_common_name().next();
        match first_cn {
            Some(cn) => {
                let cn = cn.as_str().map_err(|e| {
                    GateError::ValidationInternal(format!("common name not readable: {}", e))
                })?;
                Ok(Some(cn.to_string()))
            }
            None => Ok(None),
        }
    }

    fn subject_name_raw(&self) -> Result<Vec<u8>> {
        Ok(self.parse()?.subject().as_raw().to_vec())
    }

    fn issuer_name_raw(&self) -> Result<Vec<u8>> {
        Ok(self.parse()?.issuer().as_raw().to_vec())
    }
}
