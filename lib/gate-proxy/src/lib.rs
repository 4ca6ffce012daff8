//! Client-certificate gate and proxy plumbing for the edge gateway
//!
//! This library provides:
//! - Certificate resolution from connection metadata or the
//!   `X-ARR-ClientCert` forwarded header
//! - The identity predicate and the admit/reject gate decision
//! - TLS listener configuration with client certificate capture
//! - Downstream request forwarding and Prometheus metrics

pub mod certificate;
pub mod forwarder;
pub mod gate;
pub mod metrics;
pub mod resolver;
pub mod tls;
pub mod validator;

#[cfg(test)]
mod test_certs;

pub use certificate::{ClientCertificate, ResolvedCertificate};
pub use forwarder::RequestForwarder;
pub use gate::{rejection_response, ClientCertGate, GateOutcome};
pub use metrics::GateMetrics;
pub use resolver::FORWARDED_CERT_HEADER;
pub use tls::{ClientAuthMode, TlsServerConfig};
