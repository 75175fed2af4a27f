//! HTTP check logic.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::uri::Authority;
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Empty};
use tracing::debug;

use probegrid_health::{CheckError, CheckFuture, CheckResult, Health, HealthCheck, Registry};

const DEFAULT_USER_AGENT: &str = "probegrid-http/0.1";

/// HTTP implementation of [`HealthCheck`].
///
/// The descriptor handed to [`HealthCheck::check`] is the absolute URL of
/// the health endpoint, e.g. `http://10.0.0.7:8080/health`.
#[derive(Debug, Clone)]
pub struct HttpCheck {
    /// Upper bound on connect + request + body read.
    timeout: Duration,
    user_agent: String,
}

impl HttpCheck {
    /// Create a checker bounding each check by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Override the `user-agent` header sent with every check.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-check timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HealthCheck for HttpCheck {
    fn check(&self, descriptor: &str) -> CheckFuture {
        let endpoint = descriptor.to_string();
        let timeout = self.timeout;
        let user_agent = self.user_agent.clone();
        Box::pin(async move { http_check(&endpoint, timeout, &user_agent).await })
    }
}

/// Registry whose targets are HTTP health endpoints.
pub fn http_registry(timeout: Duration) -> Registry {
    Registry::new(Arc::new(HttpCheck::new(timeout)))
}

/// Perform one HTTP health check against `endpoint`.
pub async fn http_check(endpoint: &str, timeout: Duration, user_agent: &str) -> CheckResult {
    let uri: Uri = endpoint
        .parse()
        .map_err(|e| CheckError::InvalidDescriptor(format!("{endpoint}: {e}")))?;
    if uri.scheme_str() != Some("http") {
        return Err(CheckError::InvalidDescriptor(format!(
            "{endpoint}: only http:// endpoints are supported"
        )));
    }
    let authority = uri
        .authority()
        .cloned()
        .ok_or_else(|| CheckError::InvalidDescriptor(format!("{endpoint}: missing host")))?;

    match tokio::time::timeout(timeout, fetch(&uri, &authority, user_agent)).await {
        Ok(result) => result,
        Err(_) => {
            debug!(%uri, ?timeout, "health check timed out");
            Err(CheckError::Timeout(timeout))
        }
    }
}

async fn fetch(uri: &Uri, authority: &Authority, user_agent: &str) -> CheckResult {
    let address = format!("{}:{}", authority.host(), authority.port_u16().unwrap_or(80));

    let stream = tokio::net::TcpStream::connect(&address).await.map_err(|e| {
        debug!(error = %e, %uri, "health check connection failed");
        CheckError::Transport(format!("connect {address}: {e}"))
    })?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| {
            debug!(error = %e, %uri, "health check handshake failed");
            CheckError::Transport(format!("handshake: {e}"))
        })?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let req = Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(HOST, authority.as_str())
        .header(USER_AGENT, user_agent)
        .body(Empty::<Bytes>::new())
        .map_err(|e| CheckError::InvalidDescriptor(e.to_string()))?;

    let resp = sender.send_request(req).await.map_err(|e| {
        debug!(error = %e, %uri, "health check request failed");
        CheckError::Transport(format!("request: {e}"))
    })?;

    let status = resp.status();
    if !status.is_success() {
        debug!(%status, %uri, "health check non-2xx");
        return Err(CheckError::Status(status.as_u16()));
    }

    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| CheckError::Decode(format!("reading body: {e}")))?
        .to_bytes();

    serde_json::from_slice::<Health>(&body).map_err(|e| {
        debug!(error = %e, %uri, "health payload could not be decoded");
        CheckError::Decode(e.to_string())
    })
}
