//! Admit/reject gate applied to every inbound request

use crate::certificate::ResolvedCertificate;
use crate::metrics::GateMetrics;
use crate::{resolver, validator};
use gate_core::{GateError, ValidationConfig};
use http_body_util::Full;
use hyper::{body::Bytes, header::HeaderMap, Response, StatusCode};
use tracing::{debug, warn};

/// Per-request outcome of the gate. Consumed immediately by the
/// surrounding pipeline, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Admit the request: invoke the next pipeline stage.
    Forward,
    /// Short-circuit with the given status; the downstream handler is
    /// never invoked for this request.
    Reject {
        status: StatusCode,
        body: Option<String>,
    },
}

impl GateOutcome {
    fn reject() -> Self {
        GateOutcome::Reject {
            status: StatusCode::FORBIDDEN,
            body: None,
        }
    }

    fn reject_with_message(message: String) -> Self {
        GateOutcome::Reject {
            status: StatusCode::FORBIDDEN,
            body: Some(message),
        }
    }

    /// Whether this outcome admits the request.
    pub fn is_forward(&self) -> bool {
        matches!(self, GateOutcome::Forward)
    }

    /// Build the rejection response, or `None` when the request is
    /// admitted.
    pub fn into_response(self) -> Option<Response<Full<Bytes>>> {
        match self {
            GateOutcome::Forward => None,
            GateOutcome::Reject { status, body } => {
                Some(rejection_response(status, body.as_deref()))
            }
        }
    }
}

/// Build a plain-text rejection response.
pub fn rejection_response(status: StatusCode, body: Option<&str>) -> Response<Full<Bytes>> {
    let body = Bytes::from(body.unwrap_or_default().to_string());
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain"),
    );
    response
}

/// Client-certificate gate.
///
/// One logical invocation per inbound request; invocations are
/// independent and share only the immutable configuration (and the
/// metrics registry, whose counters synchronize internally).
pub struct ClientCertGate {
    config: ValidationConfig,
    metrics: Option<GateMetrics>,
}

impl ClientCertGate {
    /// Create a gate with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Create a gate that records decisions into the given metrics.
    pub fn with_metrics(config: ValidationConfig, metrics: GateMetrics) -> Self {
        Self {
            config,
            metrics: Some(metrics),
        }
    }

    /// The configuration this gate was built with.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Decide whether to admit the current request.
    ///
    /// When enforcement is disabled the request is admitted without
    /// inspecting any certificate. Otherwise the certificate is
    /// resolved from the connection slot or the forwarded header and
    /// the identity predicate is applied.
    pub fn evaluate(
        &self,
        connection_cert: Option<&[u8]>,
        headers: &HeaderMap,
    ) -> GateOutcome {
        if !self.config.certificate_check_enabled {
            self.record_admitted("check_disabled");
            return GateOutcome::Forward;
        }

        self.decide(resolver::resolve(connection_cert, headers))
    }

    /// Apply the identity predicate to an already-resolved certificate.
    ///
    /// The certificate is owned by this call and released exactly once
    /// when it returns, whichever path was taken.
    pub fn decide<C: ResolvedCertificate>(&self, resolved: Option<C>) -> GateOutcome {
        let Some(cert) = resolved else {
            debug!("Rejecting request: {}", GateError::NoCertificatePresented);
            self.record_rejected("no_certificate");
            return GateOutcome::reject();
        };

        match validator::validate(&cert, &self.config.expected_common_name) {
            Ok(true) => {
                self.record_admitted("validated");
                GateOutcome::Forward
            }
            Ok(false) => {
                debug!("Rejecting request: {}", GateError::IdentityMismatch);
                self.record_rejected("identity_mismatch");
                GateOutcome::reject()
            }
            Err(e) => {
                warn!("Client certificate validation error: {}", e);
                self.record_rejected("validation_error");
                GateOutcome::reject_with_message(e.to_string())
            }
        }
    }

    fn record_admitted(&self, mode: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_admitted(mode);
        }
    }

    fn record_rejected(&self, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rejected(reason);
        }
    }
}
