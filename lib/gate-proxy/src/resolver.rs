//! Client certificate resolution from connection metadata or a forwarded header

use crate::certificate::ClientCertificate;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hyper::header::HeaderMap;
use tracing::debug;

/// Header used by upstream proxies to relay the client certificate
/// across a hop where TLS was terminated. The exact name is a fixed
/// convention; lookup is case-insensitive.
pub const FORWARDED_CERT_HEADER: &str = "X-ARR-ClientCert";

/// Locate a candidate client certificate for the current request.
///
/// Sources in priority order, first success wins:
/// 1. the connection-level certificate slot (DER bytes captured from
///    the TLS session),
/// 2. the `X-ARR-ClientCert` header, whose value is base64-encoded DER.
///
/// Malformed input from either source is swallowed into `None`; the
/// caller cannot distinguish "no certificate" from "unusable
/// certificate" and both degrade to rejection.
pub fn resolve(
    connection_cert: Option<&[u8]>,
    headers: &HeaderMap,
) -> Option<ClientCertificate> {
    if let Some(der) = connection_cert {
        return match ClientCertificate::from_der(der.to_vec()) {
            Ok(cert) => {
                debug!("Resolved client certificate from connection");
                Some(cert)
            }
            Err(e) => {
                debug!("Connection certificate unusable: {}", e);
                None
            }
        };
    }

    from_forwarded_header(headers)
}

/// Decode the forwarded-certificate header, if present and well-formed.
fn from_forwarded_header(headers: &HeaderMap) -> Option<ClientCertificate> {
    let value = headers.get(FORWARDED_CERT_HEADER)?;
    let encoded = value.to_str().ok()?.trim();
    if encoded.is_empty() {
        return None;
    }

    let der = match BASE64.decode(encoded) {
        Ok(der) => der,
        Err(e) => {
            debug!("Forwarded certificate header is not valid base64: {}", e);
            return None;
        }
    };

    match ClientCertificate::from_der(der) {
        Ok(cert) => {
            debug!("Resolved client certificate from {} header", FORWARDED_CERT_HEADER);
            Some(cert)
        }
        Err(e) => {
            debug!("Forwarded certificate is not valid DER: {}", e);
            None
        }
    }
}
