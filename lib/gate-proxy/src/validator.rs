//! Identity predicate applied to a resolved client certificate

use crate::certificate::ResolvedCertificate;
use gate_core::Result;
use tracing::debug;

/// Evaluate the identity/trust predicate for a resolved certificate.
///
/// Returns `Ok(true)` only when all of the following hold:
/// - the subject common name is present and non-empty,
/// - it equals `expected_cn` ignoring case (Unicode-aware),
/// - the subject name bytes differ from the issuer name bytes
///   (self-signed certificates are rejected regardless of CN).
///
/// Errors raised while extracting certificate fields propagate to the
/// caller, which turns them into a rejection carrying the message.
pub fn validate(cert: &impl ResolvedCertificate, expected_cn: &str) -> Result<bool> {
    let common_name = match cert.subject_common_name()? {
        Some(cn) if !cn.is_empty() => cn,
        _ => {
            debug!("Client certificate has no subject common name");
            return Ok(false);
        }
    };

    if common_name.to_lowercase() != expected_cn.to_lowercase() {
        debug!(
            "Client certificate CN '{}' does not match expected '{}'",
            common_name, expected_cn
        );
        return Ok(false);
    }

    // Subject == issuer means self-signed: no third-party attestation.
    if cert.subject_name_raw()? == cert.issuer_name_raw()? {
        debug!("Client certificate is self-signed, rejecting");
        return Ok(false);
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::ClientCertificate;
    use crate::test_certs::{ca_signed_der, self_signed_der, StubCert};
    use gate_core::GateError;

    #[test]
    fn test_matching_ca_signed_certificate_is_valid() {
        let cert =
            ClientCertificate::from_der(ca_signed_der("gateway-1", "example-ca")).unwrap();
        assert!(validate(&cert, "gateway-1").unwrap());
    }

    #[test]
    fn test_common_name_match_ignores_case() {
        let cert =
            ClientCertificate::from_der(ca_signed_der("Gateway-1", "example-ca")).unwrap();
        assert!(validate(&cert, "GATEWAY-1").unwrap());
    }

    #[test]
    fn test_common_name_match_ignores_non_ascii_case() {
        let cert = StubCert::new(
            Some("münchen-gw".to_string()),
            b"subject".to_vec(),
            b"issuer".to_vec(),
        );
        assert!(validate(&cert, "MÜNCHEN-GW").unwrap());
    }

    #[test]
    fn test_wrong_common_name_is_invalid() {
        let cert =
            ClientCertificate::from_der(ca_signed_der("gateway-2", "example-ca")).unwrap();
        assert!(!validate(&cert, "gateway-1").unwrap());
    }

    #[test]
    fn test_self_signed_rejected_even_with_matching_cn() {
        let cert = ClientCertificate::from_der(self_signed_der("gateway-1")).unwrap();
        assert!(!validate(&cert, "gateway-1").unwrap());
    }

    #[test]
    fn test_missing_common_name_is_invalid() {
        let cert = StubCert::new(None, b"subject".to_vec(), b"issuer".to_vec());
        assert!(!validate(&cert, "gateway-1").unwrap());
    }

    #[test]
    fn test_empty_common_name_is_invalid() {
        let cert = StubCert::new(
            Some(String::new()),
            b"subject".to_vec(),
            b"issuer".to_vec(),
        );
        assert!(!validate(&cert, "").unwrap());
    }

    #[test]
    fn test_extraction_error_propagates() {
        let cert = StubCert::new(
            Some("gateway-1".to_string()),
            b"subject".to_vec(),
            b"issuer".to_vec(),
        )
        .failing_cn("common name not readable");

        let err = validate(&cert, "gateway-1").unwrap_err();
        assert!(matches!(err, GateError::ValidationInternal(_)));
        assert!(err.to_string().contains("common name not readable"));
    }
}
