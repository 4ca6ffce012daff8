use thiserror::Error;

pub type Result<T> = std::result::Result<T, GateError>;

/// Errors raised while resolving or validating a client certificate.
///
/// All request-path variants are handled inside the gate; the only
/// externally visible signal is the rejection status and, for
/// `ValidationInternal`, the error message in the response body.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("no client certificate presented")]
    NoCertificatePresented,

    #[error("malformed client certificate: {0}")]
    MalformedCertificate(String),

    #[error("client certificate identity mismatch")]
    IdentityMismatch,

    #[error("certificate validation failed: {0}")]
    ValidationInternal(String),

    #[error("invalid gate configuration: {0}")]
    InvalidConfiguration(String),
}
