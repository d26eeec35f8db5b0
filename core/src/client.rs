//! Bundled engine: interceptor pipeline on top of a pluggable transport.
//!
//! # Design
//! `Engine` is the factory handed to a facade; every `Client` it creates
//! shares the engine's transport but owns its own defaults and interceptor
//! registrations. A dispatch runs in four steps:
//!
//! 1. merge the per-call config over the instance defaults,
//! 2. thread the result through the request interceptors in registration
//!    order,
//! 3. build an `HttpRequest` and hand it to the transport (skipped when a
//!    request interceptor left the pipeline in a failed state),
//! 4. thread the outcome through the response interceptors.
//!
//! The interceptor lists are snapshotted when a dispatch starts, so several
//! requests may be in flight while registrations are read concurrently.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, debug_span, Instrument};
use uuid::Uuid;

use crate::config::{is_absolute_url, Body, RequestConfig, ResponseType};
use crate::engine::{ClientInstance, HttpEngine, FORM_URLENCODED};
use crate::error::ClientError;
use crate::http::{find_header, HttpMethod, HttpRequest};
use crate::interceptor::{Interceptor, Interceptors};
use crate::response::{Response, ResponseData};
use crate::transport::Transport;

const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Factory for [`Client`] instances sharing one transport.
#[derive(Debug)]
pub struct Engine<T> {
    transport: Arc<T>,
}

impl<T> Clone for Engine<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> Engine<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }
}

impl<T: Transport> HttpEngine for Engine<T> {
    type Instance = Client<T>;

    /// Layer `config` over the built-in defaults. A base URL, when given,
    /// must be absolute since there is no page origin to resolve against.
    fn create(&self, config: RequestConfig) -> Result<Client<T>, ClientError> {
        if let Some(base_url) = config.base_url.as_deref() {
            if !is_absolute_url(base_url) {
                return Err(ClientError::InvalidConfig(format!(
                    "base url must be absolute: {base_url}"
                )));
            }
        }
        let defaults = builtin_defaults().merge(config);
        debug!(base_url = ?defaults.base_url, "client instance created");
        Ok(Client {
            defaults,
            interceptors: Interceptors::default(),
            transport: Arc::clone(&self.transport),
        })
    }
}

fn builtin_defaults() -> RequestConfig {
    let mut defaults = RequestConfig::default().with_response_type(ResponseType::Json);
    defaults
        .headers
        .common
        .insert("Accept".to_string(), DEFAULT_ACCEPT.to_string());
    defaults
}

/// Client instance produced by [`Engine::create`].
pub struct Client<T> {
    defaults: RequestConfig,
    interceptors: Interceptors,
    transport: Arc<T>,
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.defaults)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Client<T> {
    async fn dispatch(
        &self,
        config: RequestConfig,
        request_chain: Vec<Interceptor<RequestConfig>>,
        response_chain: Vec<Interceptor<Response>>,
    ) -> Result<Response, ClientError> {
        let mut state = Ok(config);
        for interceptor in &request_chain {
            state = interceptor.apply(state).await;
        }

        let mut outcome = match state {
            Ok(config) => self.exchange(config).await,
            Err(error) => {
                debug!(%error, "request interceptor rejected, transport skipped");
                Err(error)
            }
        };
        for interceptor in &response_chain {
            outcome = interceptor.apply(outcome).await;
        }
        outcome
    }

    async fn exchange(&self, config: RequestConfig) -> Result<Response, ClientError> {
        let url = config.full_uri()?;
        if !is_absolute_url(&url) {
            return Err(ClientError::InvalidUrl(url));
        }
        let method = config.method.unwrap_or_default();
        let mut headers = config.headers.flatten(method);
        let body = encode_body(config.data.as_ref(), &mut headers)?;

        debug!(%method, %url, "dispatching request");
        let timeout_ms = config.timeout_ms.filter(|ms| *ms > 0);
        let request = HttpRequest {
            method,
            url,
            headers,
            body,
            timeout: timeout_ms.map(Duration::from_millis),
        };
        // The transport enforces the same deadline on its connection; this
        // guard covers transports that ignore it.
        let reply = match timeout_ms {
            Some(timeout_ms) => tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                self.transport.send(request),
            )
            .await
            .map_err(|_| ClientError::Timeout { timeout_ms })??,
            None => self.transport.send(request).await?,
        };

        let status = reply.status;
        let accepted = config.accepts_status(status);
        let response_type = config.response_type.unwrap_or_default();
        let response = Response {
            status,
            headers: reply.headers,
            data: ResponseData::decode(reply.body, response_type),
            config,
        };
        debug!(status, accepted, "response received");

        if accepted {
            Ok(response)
        } else {
            Err(ClientError::Status {
                status,
                response: Box::new(response),
            })
        }
    }
}

#[async_trait]
impl<T: Transport> ClientInstance for Client<T> {
    fn defaults(&self) -> &RequestConfig {
        &self.defaults
    }

    fn defaults_mut(&mut self) -> &mut RequestConfig {
        &mut self.defaults
    }

    fn set_defaults(&mut self, value: RequestConfig) {
        self.defaults = value;
    }

    fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    fn interceptors_mut(&mut self) -> &mut Interceptors {
        &mut self.interceptors
    }

    fn get_uri(&self, config: RequestConfig) -> Result<String, ClientError> {
        self.defaults.merge(config).full_uri()
    }

    async fn request(&self, config: RequestConfig) -> Result<Response, ClientError> {
        let mut config = self.defaults.merge(config);
        config.method = Some(config.method.unwrap_or(HttpMethod::Get));

        let request_chain = self.interceptors.request.iter().cloned().collect();
        let response_chain = self.interceptors.response.iter().cloned().collect();

        let span = debug_span!("request", request_id = %Uuid::new_v4());
        self.dispatch(config, request_chain, response_chain)
            .instrument(span)
            .await
    }
}

/// Encode `data` for the wire, adding a content type where one is implied.
fn encode_body(
    data: Option<&Body>,
    headers: &mut Vec<(String, String)>,
) -> Result<Option<String>, ClientError> {
    let Some(data) = data else {
        return Ok(None);
    };
    let content_type = find_header(headers, "content-type").map(str::to_ascii_lowercase);
    let wants_form = content_type
        .as_deref()
        .is_some_and(|value| value.starts_with(FORM_URLENCODED));

    let encoded = match data {
        Body::Empty => return Ok(None),
        Body::Text(text) => text.clone(),
        Body::Json(Value::String(text)) => text.clone(),
        Body::Json(value) if wants_form => {
            if !value.is_object() {
                return Err(ClientError::InvalidConfig(
                    "form body must be a JSON object".to_string(),
                ));
            }
            let mut pairs = Vec::new();
            flatten_form(None, value, &mut pairs);
            serde_urlencoded::to_string(&pairs)?
        }
        Body::Json(value) => {
            if content_type.is_none() {
                headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
            }
            serde_json::to_string(value)?
        }
    };
    Ok(Some(encoded))
}

/// Flatten a JSON value into form pairs: `a[b]` for nested objects, `a[]`
/// for array items. Nulls are dropped. Only an object has keys to anchor
/// pairs, so callers reject any other top-level value.
fn flatten_form(key: Option<&str>, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (name, nested) in map {
                let nested_key = match key {
                    Some(parent) => format!("{parent}[{name}]"),
                    None => name.clone(),
                };
                flatten_form(Some(&nested_key), nested, pairs);
            }
        }
        Value::Array(items) => {
            let Some(key) = key else {
                return;
            };
            let item_key = format!("{key}[]");
            for item in items {
                flatten_form(Some(&item_key), item, pairs);
            }
        }
        Value::String(text) => {
            if let Some(key) = key {
                pairs.push((key.to_string(), text.clone()));
            }
        }
        Value::Bool(_) | Value::Number(_) => {
            if let Some(key) = key {
                pairs.push((key.to_string(), value.to_string()));
            }
        }
    }
}
