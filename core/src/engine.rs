//! Capability traits a facade is built on.
//!
//! # Design
//! An `HttpEngine` is a factory: it is asked once for a configured
//! `ClientInstance` and is not consulted again. The instance owns the live
//! defaults and interceptor registrations and performs dispatch. Only
//! `request` needs a real implementation; the verb helpers are provided
//! here because they do nothing but shape arguments into a
//! `RequestConfig`.

use async_trait::async_trait;

use crate::config::{Body, RequestConfig};
use crate::error::ClientError;
use crate::http::HttpMethod;
use crate::interceptor::Interceptors;
use crate::response::Response;

/// Content type forced by the `*_form` helpers.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Factory for configured client instances.
pub trait HttpEngine {
    type Instance: ClientInstance;

    fn create(&self, config: RequestConfig) -> Result<Self::Instance, ClientError>;
}

/// A configured client: live defaults, interceptors, and dispatch.
#[async_trait]
pub trait ClientInstance: Send + Sync {
    fn defaults(&self) -> &RequestConfig;

    fn defaults_mut(&mut self) -> &mut RequestConfig;

    fn set_defaults(&mut self, value: RequestConfig);

    fn interceptors(&self) -> &Interceptors;

    fn interceptors_mut(&mut self) -> &mut Interceptors;

    /// URI a request made with `config` would target, given current defaults.
    fn get_uri(&self, config: RequestConfig) -> Result<String, ClientError>;

    /// Run `config` through the interceptor pipeline and the transport.
    async fn request(&self, config: RequestConfig) -> Result<Response, ClientError>;

    async fn get(&self, url: &str, config: RequestConfig) -> Result<Response, ClientError> {
        self.request(without_body(HttpMethod::Get, url, config)).await
    }

    async fn delete(&self, url: &str, config: RequestConfig) -> Result<Response, ClientError> {
        self.request(without_body(HttpMethod::Delete, url, config))
            .await
    }

    async fn head(&self, url: &str, config: RequestConfig) -> Result<Response, ClientError> {
        self.request(without_body(HttpMethod::Head, url, config)).await
    }

    async fn options(&self, url: &str, config: RequestConfig) -> Result<Response, ClientError> {
        self.request(without_body(HttpMethod::Options, url, config))
            .await
    }

    async fn post(
        &self,
        url: &str,
        data: Body,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.request(with_body(HttpMethod::Post, url, data, config))
            .await
    }

    async fn put(
        &self,
        url: &str,
        data: Body,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.request(with_body(HttpMethod::Put, url, data, config))
            .await
    }

    async fn patch(
        &self,
        url: &str,
        data: Body,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.request(with_body(HttpMethod::Patch, url, data, config))
            .await
    }

    async fn post_form(
        &self,
        url: &str,
        data: Body,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.request(form(HttpMethod::Post, url, data, config)).await
    }

    async fn put_form(
        &self,
        url: &str,
        data: Body,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.request(form(HttpMethod::Put, url, data, config)).await
    }

    async fn patch_form(
        &self,
        url: &str,
        data: Body,
        config: RequestConfig,
    ) -> Result<Response, ClientError> {
        self.request(form(HttpMethod::Patch, url, data, config)).await
    }
}

fn without_body(method: HttpMethod, url: &str, config: RequestConfig) -> RequestConfig {
    config.with_method(method).with_url(url)
}

fn with_body(method: HttpMethod, url: &str, data: Body, config: RequestConfig) -> RequestConfig {
    let mut config = without_body(method, url, config);
    config.data = data.into_option();
    config
}

fn form(method: HttpMethod, url: &str, data: Body, config: RequestConfig) -> RequestConfig {
    with_body(method, url, data, config).with_header("Content-Type", FORM_URLENCODED)
}
