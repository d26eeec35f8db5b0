//! Stable public surface over an engine-created client instance.
//!
//! # Design
//! `ApiClient` owns exactly one client instance, created once from the
//! engine passed to [`ApiClient::new`], and never hands that instance out.
//! Every method forwards to it unchanged: errors, pipeline behavior and
//! body encoding all belong to the engine.
//!
//! `defaults_mut` returns the instance's live configuration, not a copy.
//! Edits made through it, such as adding a common header, apply to every
//! later request. The borrow checker keeps such edits from overlapping with
//! requests still in flight.

use crate::config::{Body, RequestConfig};
use crate::engine::{ClientInstance, HttpEngine};
use crate::error::ClientError;
use crate::interceptor::{Interceptor, InterceptorId, Interceptors};
use crate::response::Response;

/// Facade over a single client instance of type `I`.
#[derive(Debug)]
pub struct ApiClient<I> {
    instance: I,
}

#[cfg(feature = "ureq")]
impl ApiClient<crate::client::Client<crate::transport::UreqTransport>> {
    /// Facade over the bundled engine with a default ureq transport.
    pub fn with_ureq(config: RequestConfig) -> Result<Self, ClientError> {
        let engine = crate::client::Engine::new(crate::transport::UreqTransport::new());
        Self::new(&engine, config)
    }
}

impl<I: ClientInstance> ApiClient<I> {
    /// Ask `engine` for an instance configured with `config`. Engine
    /// failures are returned as is.
    pub fn new<E>(engine: &E, config: RequestConfig) -> Result<Self, ClientError>
    where
        E: HttpEngine<Instance = I>,
    {
        Ok(Self {
            instance: engine.create(config)?,
        })
    }

    pub fn defaults(&self) -> &RequestConfig {
        self.instance.defaults()
    }

    /// Live handle to the instance defaults.
    pub fn defaults_mut(&mut self) -> &mut RequestConfig {
        self.instance.defaults_mut()
    }

    /// Replace the instance defaults wholesale.
    pub fn set_defaults(&mut self, value: RequestConfig) {
        self.instance.set_defaults(value);
    }

    pub fn interceptors(&self) -> &Interceptors {
        self.instance.interceptors()
    }

    pub fn interceptors_mut(&mut self) -> &mut Interceptors {
        self.instance.interceptors_mut()
    }

    /// Returns an id for [`ApiClient::remove_request_interceptor`].
    pub fn add_request_interceptor(
        &mut self,
        interceptor: Interceptor<RequestConfig>,
    ) -> InterceptorId {
        self.instance.interceptors_mut().request.add(interceptor)
    }

    /// Unknown ids are ignored.
    pub fn remove_request_interceptor(&mut self, id: InterceptorId) {
        self.instance.interceptors_mut().request.eject(id);
    }

    /// Returns an id for [`ApiClient::remove_response_interceptor`].
    pub fn add_response_interceptor(&mut self, interceptor: Interceptor<Response>) -> InterceptorId {
        self.instance.interceptors_mut().response.add(interceptor)
    }

    /// Unknown ids are ignored.
    pub fn remove_response_interceptor(&mut self, id: InterceptorId) {
        self.instance.interceptors_mut().response.eject(id);
    }

    pub fn get_uri(&self, config: RequestConfig) -> Result<String, ClientError> {
        self.instance.get_uri(config)
    }

    pub async fn request(&self, config: RequestConfig) -> Result<Response, ClientError> {
        self.instance.request(config).await
    }

    pub async fn get(&self, url: &str, config: RequestConfig) -> Result<Response, ClientError> {
        self.instance.get(url, config).await
    }

    pub async fn delete(&self, url: &str, config: RequestConfig) -> Result<Response, ClientError> {
        self.instance.delete(url, config).await
    }

    pub async fn head(&self, url: &str, config: RequestConfig) -> Result<Response, ClientError> {
        self.instance.head(url, config).await
    }

    pub async fn options(&self, url: &str, config: RequestConfig) -> Result<Response, ClientError> {
        self.instance.options(url, config).await
    }

    pub async fn post(
        &self,
        url: &str,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.instance.post(url, data.into(), config).await
    }

    pub async fn put(
        &self,
        url: &str,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.instance.put(url, data.into(), config).await
    }

    pub async fn patch(
        &self,
        url: &str,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.instance.patch(url, data.into(), config).await
    }

    pub async fn post_form(
        &self,
        url: &str,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.instance.post_form(url, data.into(), config).await
    }

    pub async fn put_form(
        &self,
        url: &str,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.instance.put_form(url, data.into(), config).await
    }

    pub async fn patch_form(
        &self,
        url: &str,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.instance.patch_form(url, data.into(), config).await
    }
}
