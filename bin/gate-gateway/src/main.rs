use anyhow::Result;
use gate_core::ValidationConfig;
use gate_proxy::{
    ClientAuthMode, ClientCertGate, GateMetrics, RequestForwarder, TlsServerConfig,
};
use http_body_util::Full;
use hyper::{
    body::Bytes, server::conn::http1, service::service_fn, Request, Response, StatusCode,
};
use hyper_util::rt::tokio::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::init as tracing_init;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    info!("Starting gate-gateway...");

    // Gate configuration is loaded once and shared read-only
    let validation_config = ValidationConfig::from_env()?;
    info!(
        "Client certificate gate {} (expected CN: '{}')",
        if validation_config.certificate_check_enabled {
            "enabled"
        } else {
            "disabled"
        },
        validation_config.expected_common_name
    );

    let metrics = GateMetrics::new()?;
    let gate = Arc::new(ClientCertGate::with_metrics(
        validation_config,
        metrics.clone(),
    ));
    info!("Client certificate gate initialized");

    let forwarder = Arc::new(RequestForwarder::new(Duration::from_secs(30)));
    info!("Request forwarder initialized with 30s timeout");

    let upstream = Arc::new(
        std::env::var("GATEWAY_UPSTREAM").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string()),
    );
    info!("Forwarding admitted requests to {}", upstream);

    // TLS is what fills the connection-level certificate slot; without
    // it the gate can still authenticate via the forwarded header.
    let tls_config = load_tls_config();
    let tls_acceptor = tls_config
        .as_ref()
        .map(|config| TlsAcceptor::from(config.config.clone()));

    let http_addr: SocketAddr = ([0, 0, 0, 0], 8080).into();
    let http_listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server listening on {}", http_addr);

    if let Some(tls_acceptor) = tls_acceptor {
        let https_addr: SocketAddr = ([0, 0, 0, 0], 8443).into();
        let https_listener = TcpListener::bind(&https_addr).await?;
        info!("HTTPS server listening on {} (TLS configured)", https_addr);

        tokio::task::spawn(accept_https_connections(
            https_listener,
            gate.clone(),
            forwarder.clone(),
            metrics.clone(),
            upstream.clone(),
            tls_acceptor,
        ));
    } else {
        warn!("TLS not configured - HTTPS listener not started");
        warn!("Set GATEWAY_TLS_CERT and GATEWAY_TLS_KEY environment variables to enable HTTPS");
    }

    loop {
        let (stream, peer_addr) = http_listener.accept().await?;
        let io = TokioIo::new(stream);

        let gate = gate.clone();
        let forwarder = forwarder.clone();
        let metrics = metrics.clone();
        let upstream = upstream.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let gate = gate.clone();
                let forwarder = forwarder.clone();
                let metrics = metrics.clone();
                let upstream = upstream.clone();
                // Plain HTTP has no connection certificate slot
                handle_request(req, None, gate, forwarder, metrics, upstream)
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving HTTP connection from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Load TLS configuration from environment variables
fn load_tls_config() -> Option<TlsServerConfig> {
    let cert_path = std::env::var("GATEWAY_TLS_CERT").ok()?;
    let key_path = std::env::var("GATEWAY_TLS_KEY").ok()?;

    let cert_pem = match std::fs::read(&cert_path) {
        Ok(pem) => pem,
        Err(e) => {
            warn!("Failed to read TLS certificate from {}: {}", cert_path, e);
            return None;
        }
    };
    let key_pem = match std::fs::read(&key_path) {
        Ok(pem) => pem,
        Err(e) => {
            warn!("Failed to read TLS key from {}: {}", key_path, e);
            return None;
        }
    };

    let client_auth = std::env::var("GATEWAY_TLS_CLIENT_AUTH")
        .map(|mode| ClientAuthMode::from_string(&mode))
        .unwrap_or(ClientAuthMode::NoClientAuth);

    let client_ca_pem = match std::env::var("GATEWAY_TLS_CLIENT_CA") {
        Ok(ca_path) => match std::fs::read(&ca_path) {
            Ok(pem) => Some(pem),
            Err(e) => {
                warn!("Failed to read client CA from {}: {}", ca_path, e);
                return None;
            }
        },
        Err(_) => None,
    };

    match TlsServerConfig::from_pem(
        &cert_pem,
        &key_pem,
        client_ca_pem.as_deref(),
        client_auth,
    ) {
        Ok(config) => {
            info!(
                "TLS configuration loaded from {} and {}",
                cert_path, key_path
            );
            Some(config)
        }
        Err(e) => {
            warn!("Failed to parse TLS configuration: {}", e);
            None
        }
    }
}

/// Accept HTTPS connections, capturing the peer certificate for the
/// gate's connection-level slot
async fn accept_https_connections(
    listener: TcpListener,
    gate: Arc<ClientCertGate>,
    forwarder: Arc<RequestForwarder>,
    metrics: GateMetrics,
    upstream: Arc<String>,
    tls_acceptor: TlsAcceptor,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let tls_acceptor = tls_acceptor.clone();
                let gate = gate.clone();
                let forwarder = forwarder.clone();
                let metrics = metrics.clone();
                let upstream = upstream.clone();

                tokio::task::spawn(async move {
                    match tls_acceptor.accept(stream).await {
                        Ok(tls_stream) => {
                            // The certificate presented during the
                            // handshake, if any; shared by all requests
                            // on this connection.
                            let peer_cert: Option<Vec<u8>> = tls_stream
                                .get_ref()
                                .1
                                .peer_certificates()
                                .and_then(|certs| certs.first())
                                .map(|cert| cert.as_ref().to_vec());

                            let io = TokioIo::new(tls_stream);
                            let service = service_fn(move |req| {
                                let gate = gate.clone();
                                let forwarder = forwarder.clone();
                                let metrics = metrics.clone();
                                let upstream = upstream.clone();
                                let peer_cert = peer_cert.clone();
                                handle_request(req, peer_cert, gate, forwarder, metrics, upstream)
                            });

                            if let Err(e) =
                                http1::Builder::new().serve_connection(io, service).await
                            {
                                debug!("Error serving HTTPS connection from {}: {}", peer_addr, e);
                            }
                        }
                        Err(e) => {
                            debug!("TLS error from {}: {}", peer_addr, e);
                        }
                    }
                });
            }
            Err(e) => {
                warn!("Error accepting HTTPS connection: {}", e);
            }
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    peer_cert: Option<Vec<u8>>,
    gate: Arc<ClientCertGate>,
    forwarder: Arc<RequestForwarder>,
    metrics: GateMetrics,
    upstream: Arc<String>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {}", method, path);

    // Health check endpoint
    if path == "/healthz" {
        let response = Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("OK\n")))
            .unwrap();
        return Ok(response);
    }

    // Metrics endpoint
    if path == "/metrics" && method == hyper::Method::GET {
        let metrics_text = metrics
            .gather()
            .unwrap_or_else(|_| "Failed to gather metrics\n".to_string());
        let response = Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(Full::new(Bytes::from(metrics_text)))
            .unwrap();
        return Ok(response);
    }

    // Gate decision: rejected requests never reach the upstream
    let outcome = gate.evaluate(peer_cert.as_deref(), req.headers());
    if let Some(rejection) = outcome.into_response() {
        debug!("Request rejected by client certificate gate");
        return Ok(rejection);
    }

    match forwarder.forward(&upstream, req).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Full::new(body)))
        }
        Err(e) => {
            debug!("Forwarder error: {}", e);
            let response = Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from("Internal Server Error\n")))
                .unwrap();
            Ok(response)
        }
    }
}
