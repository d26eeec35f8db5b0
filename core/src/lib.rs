//! Stable HTTP client facade over a pluggable engine.
//!
//! # Overview
//! `ApiClient` wraps one client instance obtained from an `HttpEngine` and
//! exposes a fixed method set: default-configuration access, interceptor
//! registration, URI resolution, and request dispatch with per-verb
//! shorthands. It adds no behavior of its own.
//!
//! # Design
//! - `engine` defines the capability traits (`HttpEngine`, `ClientInstance`)
//!   a facade is generic over.
//! - `client` is the bundled engine: it merges configuration, runs the
//!   interceptor pipeline, and encodes/decodes bodies.
//! - `transport` performs the network exchange (host-does-IO). The default
//!   `ureq` feature provides `UreqTransport`; anything implementing
//!   `Transport` can replace it.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
pub mod http;
pub mod interceptor;
pub mod response;
pub mod transport;

pub use client::{Client, Engine};
pub use config::{Body, Headers, RequestConfig, ResponseType};
pub use engine::{ClientInstance, HttpEngine, FORM_URLENCODED};
pub use error::ClientError;
pub use facade::ApiClient;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::{Interceptor, InterceptorId, InterceptorManager, Interceptors};
pub use response::{Response, ResponseData};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
