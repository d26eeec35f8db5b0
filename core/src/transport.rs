//! Transports execute a fully resolved `HttpRequest`.
//!
//! # Design
//! The client never touches the network itself. Everything that depends on
//! an HTTP library lives behind `Transport`, so tests can substitute an
//! in-memory recorder and embedders can bring their own stack. The bundled
//! `UreqTransport` runs a blocking ureq agent on tokio's blocking pool.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP exchange.
///
/// Implementations report every status the server sent as an `HttpResponse`
/// and reserve `Err` for exchanges that did not complete.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use std::time::Duration;

    use async_trait::async_trait;
    use tracing::debug;
    use ureq::typestate::WithBody;
    use ureq::{Agent, RequestBuilder};

    use super::Transport;
    use crate::error::ClientError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Transport backed by a shared ureq `Agent`.
    ///
    /// ureq's status-as-error behavior is disabled so 4xx/5xx replies come
    /// back as data and the client applies its own status policy.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: Agent,
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        /// Use a caller-configured agent. Its status-as-error setting is kept
        /// as is.
        pub fn with_agent(agent: Agent) -> Self {
            Self { agent }
        }

        fn execute(agent: &Agent, request: HttpRequest) -> Result<HttpResponse, ClientError> {
            let HttpRequest {
                method,
                url,
                headers,
                body,
                timeout,
            } = request;
            let url = url.as_str();
            let headers = headers.as_slice();

            let result = match method {
                HttpMethod::Get => prepare(agent.get(url), headers, timeout).call(),
                HttpMethod::Delete => prepare(agent.delete(url), headers, timeout).call(),
                HttpMethod::Head => prepare(agent.head(url), headers, timeout).call(),
                HttpMethod::Options => prepare(agent.options(url), headers, timeout).call(),
                HttpMethod::Post => send_body(prepare(agent.post(url), headers, timeout), body),
                HttpMethod::Put => send_body(prepare(agent.put(url), headers, timeout), body),
                HttpMethod::Patch => send_body(prepare(agent.patch(url), headers, timeout), body),
            };
            let mut response = result.map_err(|e| ClientError::Network(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = if method == HttpMethod::Head {
                String::new()
            } else {
                response
                    .body_mut()
                    .read_to_string()
                    .map_err(|e| ClientError::Network(e.to_string()))?
            };
            debug!(status, "transport exchange complete");

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    /// Attach headers and bound the whole exchange (connect, send, receive)
    /// by `timeout`. On expiry ureq drops the connection.
    fn prepare<B>(
        mut builder: RequestBuilder<B>,
        headers: &[(String, String)],
        timeout: Option<Duration>,
    ) -> RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match timeout {
            Some(timeout) => builder.config().timeout_global(Some(timeout)).build(),
            None => builder,
        }
    }

    fn send_body(
        builder: RequestBuilder<WithBody>,
        body: Option<String>,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match body {
            Some(body) => builder.send(body.as_bytes()),
            None => builder.send_empty(),
        }
    }

    #[async_trait]
    impl Transport for UreqTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
            let agent = self.agent.clone();
            tokio::task::spawn_blocking(move || Self::execute(&agent, request))
                .await
                .map_err(|e| ClientError::Network(format!("transport task failed: {e}")))?
        }
    }
}
