//! Certificate fixtures minted with rcgen for unit tests

use crate::certificate::ResolvedCertificate;
use gate_core::{GateError, Result};
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Self-signed certificate with the given subject CN.
pub(crate) fn self_signed_der(cn: &str) -> Vec<u8> {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, cn);
    let key = KeyPair::generate().expect("generate key");
    let cert = params.self_signed(&key).expect("self-signed cert");
    cert.der().to_vec()
}

/// Self-signed certificate whose subject has no CN attribute at all.
pub(crate) fn self_signed_der_without_cn() -> Vec<u8> {
    let mut params = CertificateParams::default();
    // Default params carry a placeholder CN; start from an empty DN
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::OrganizationName, "example");
    let key = KeyPair::generate().expect("generate key");
    let cert = params.self_signed(&key).expect("self-signed cert");
    cert.der().to_vec()
}

/// Leaf certificate with the given subject CN, signed by a CA with a
/// different subject, so subject and issuer names differ.
pub(crate) fn ca_signed_der(cn: &str, issuer_cn: &str) -> Vec<u8> {
    let mut ca_params = CertificateParams::default();
    ca_params
        .distinguished_name
        .push(DnType::CommonName, issuer_cn);
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca_key = KeyPair::generate().expect("generate CA key");
    let ca_cert = ca_params.self_signed(&ca_key).expect("CA cert");

    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, cn);
    let key = KeyPair::generate().expect("generate leaf key");
    let cert = params
        .signed_by(&key, &ca_cert, &ca_key)
        .expect("CA-signed cert");
    cert.der().to_vec()
}

/// Scripted certificate for exercising the gate without real DER.
///
/// Supports injecting a common-name extraction failure and counting
/// releases (drops) for the exactly-once release guarantee.
pub(crate) struct StubCert {
    cn: Option<String>,
    subject: Vec<u8>,
    issuer: Vec<u8>,
    cn_error: Option<String>,
    release_probe: Option<Arc<AtomicUsize>>,
}

impl StubCert {
    pub(crate) fn new(cn: Option<String>, subject: Vec<u8>, issuer: Vec<u8>) -> Self {
        Self {
            cn,
            subject,
            issuer,
            cn_error: None,
            release_probe: None,
        }
    }

    /// Make `subject_common_name` fail with the given message.
    pub(crate) fn failing_cn(mut self, message: &str) -> Self {
        self.cn_error = Some(message.to_string());
        self
    }

    /// Increment the counter when this certificate is released.
    pub(crate) fn with_release_probe(mut self, probe: Arc<AtomicUsize>) -> Self {
        self.release_probe = Some(probe);
        self
    }
}

impl ResolvedCertificate for StubCert {
    fn subject_common_name(&self) -> Result<Option<String>> {
        match &self.cn_error {
            Some(message) => Err(GateError::ValidationInternal(message.clone())),
            None => Ok(self.cn.clone()),
        }
    }

    fn subject_name_raw(&self) -> Result<Vec<u8>> {
        Ok(self.subject.clone())
    }

    fn issuer_name_raw(&self) -> Result<Vec<u8>> {
        Ok(self.issuer.clone())
    }
}

impl Drop for StubCert {
    fn drop(&mut self) {
        if let Some(probe) = &self.release_probe {
            probe.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Self-signed CA certificate as PEM, for TLS listener tests.
pub(crate) fn ca_cert_pem(cn: &str) -> String {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let key = KeyPair::generate().expect("generate key");
    params.self_signed(&key).expect("CA cert").pem()
}

/// Self-signed certificate and key as PEM, for TLS listener tests.
pub(crate) fn self_signed_pem(cn: &str) -> (String, String) {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, cn);
    let key = KeyPair::generate().expect("generate key");
    let cert = params.self_signed(&key).expect("self-signed cert");
    (cert.pem(), key.serialize_pem())
}
