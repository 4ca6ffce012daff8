//! Downstream request forwarding for admitted requests

use anyhow::Result;
use http_body_util::{BodyExt, Full};
use hyper::{body::Bytes, Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::tokio::TokioExecutor;
use std::time::Duration;
use tokio::time::timeout as tokio_timeout;
use tracing::{debug, warn};

/// HTTP forwarder for requests the gate admitted, with connection
/// pooling and a per-request timeout.
pub struct RequestForwarder {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl RequestForwarder {
    /// Create a new forwarder with connection pooling
    pub fn new(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        connector.set_keepalive(Some(Duration::from_secs(30)));

        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(connector);

        Self { client, timeout }
    }

    /// Forward a request to the upstream URL and return its response.
    ///
    /// If the caller's request is cancelled while this is in flight,
    /// dropping the returned future aborts the upstream call too.
    pub async fn forward(
        &self,
        upstream_url: &str,
        request: Request<hyper::body::Incoming>,
    ) -> Result<Response<Bytes>> {
        debug!("Forwarding request to: {}", upstream_url);

        let uri: Uri = upstream_url.parse()?;

        let (mut parts, incoming) = request.into_parts();
        let body_bytes = Self::collect_body(incoming).await?;

        // Strip hop-by-hop headers before handing the request upstream
        let mut filtered_headers = hyper::header::HeaderMap::new();
        for (k, v) in parts.headers.iter() {
            if !Self::is_hop_by_hop_header(k.as_str().to_lowercase().as_str()) {
                filtered_headers.insert(k.clone(), v.clone());
            }
        }
        parts.headers = filtered_headers;
        parts.uri = uri;

        let upstream_request = Request::from_parts(parts, Full::new(body_bytes));

        match tokio_timeout(self.timeout, self.client.request(upstream_request)).await {
            Ok(Ok(response)) => {
                debug!("Upstream responded with status: {}", response.status());
                let (response_parts, body) = response.into_parts();
                let response_bytes = Self::collect_body(body).await?;
                Ok(Response::from_parts(response_parts, response_bytes))
            }
            Ok(Err(e)) => {
                warn!("Upstream request error: {}", e);
                Ok(Self::error_response(
                    StatusCode::BAD_GATEWAY,
                    "Error communicating with upstream service\n",
                ))
            }
            Err(_) => {
                warn!("Upstream request timeout after {}s", self.timeout.as_secs());
                Ok(Self::error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "Upstream request timeout\n",
                ))
            }
        }
    }

    /// Collect an entire body into Bytes
    async fn collect_body(body: hyper::body::Incoming) -> Result<Bytes> {
        let collected = body.collect().await?;
        Ok(collected.to_bytes())
    }

    /// Create an error response
    fn error_response(status: StatusCode, message: &str) -> Response<Bytes> {
        let mut response = Response::new(Bytes::from(message.to_string()));
        *response.status_mut() = status;
        response
    }

    /// Check if header is hop-by-hop (should not be forwarded)
    fn is_hop_by_hop_header(name: &str) -> bool {
        matches!(
            name,
            "connection"
                | "keep-alive"
                | "proxy-authenticate"
                | "proxy-authorization"
                | "te"
                | "trailers"
                | "transfer-encoding"
                | "upgrade"
        )
    }
}
