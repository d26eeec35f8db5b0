//! Request configuration: instance defaults and per-call overrides.
//!
//! # Design
//! A single `RequestConfig` type serves both as the defaults held by a
//! client instance and as the per-call override passed to a dispatch
//! method. Every option is optional so "not set" is distinguishable from
//! "set to the default value", which is what `merge` relies on.
//!
//! Serialized field names follow the camelCase layout common to HTTP client
//! configuration files (`baseURL`, `timeout`, `responseType`), so a defaults
//! file can be loaded with `RequestConfig::from_json`.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::http::HttpMethod;

/// Environment variable read by [`RequestConfig::from_env`] for the base URL.
pub const BASE_URL_ENV: &str = "API_CLIENT_BASE_URL";
/// Environment variable read by [`RequestConfig::from_env`] for the timeout.
pub const TIMEOUT_ENV: &str = "API_CLIENT_TIMEOUT_MS";

const DEFAULT_VALID_STATUS: RangeInclusive<u16> = 200..=299;

/// Options recognised by a client instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub headers: Headers,
    /// Query string parameters, appended url-encoded to the resolved URL.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// Request body. Only meaningful per call, never part of stored defaults.
    #[serde(skip)]
    pub data: Option<Body>,
    /// `0` disables the timeout.
    #[serde(rename = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    /// Statuses treated as success. `None` means `200..=299`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_status: Option<RangeInclusive<u16>>,
}

/// How a response body is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
}

/// Request body before encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl Body {
    pub(crate) fn into_option(self) -> Option<Body> {
        match self {
            Body::Empty => None,
            body => Some(body),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Text(value.to_string())
    }
}

/// Layered header sets.
///
/// `common` applies to every request, `per_method` only to requests of the
/// keyed verb, and `request` to a single request. Later layers win, and
/// names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Headers {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub common: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub per_method: BTreeMap<HttpMethod, BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub request: BTreeMap<String, String>,
}

impl Headers {
    /// Set a request-level header, replacing any entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        remove_ignore_case(&mut self.request, &name);
        self.request.insert(name, value.into());
    }

    /// Look a header up in the request layer, then the common layer.
    /// `per_method` entries are skipped; use [`Headers::get_for`] to see them.
    pub fn get(&self, name: &str) -> Option<&str> {
        get_ignore_case(&self.request, name).or_else(|| get_ignore_case(&self.common, name))
    }

    /// Look a header up the way it would be sent for `method`: request layer,
    /// then `per_method[method]`, then common.
    pub fn get_for(&self, method: HttpMethod, name: &str) -> Option<&str> {
        get_ignore_case(&self.request, name)
            .or_else(|| {
                self.per_method
                    .get(&method)
                    .and_then(|headers| get_ignore_case(headers, name))
            })
            .or_else(|| get_ignore_case(&self.common, name))
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        remove_ignore_case(&mut self.request, name)
    }

    /// Header list sent for a request of `method`.
    pub fn flatten(&self, method: HttpMethod) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        let layers = [
            Some(&self.common),
            self.per_method.get(&method),
            Some(&self.request),
        ];
        for (name, value) in layers.into_iter().flatten().flatten() {
            match out.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(name)) {
                Some(slot) => *slot = (name.clone(), value.clone()),
                None => out.push((name.clone(), value.clone())),
            }
        }
        out
    }

    /// Layer `overrides` on top of `self`, layer by layer.
    pub fn merge(&self, overrides: &Headers) -> Headers {
        let mut merged = self.clone();
        merge_into(&mut merged.common, &overrides.common);
        for (method, headers) in &overrides.per_method {
            merge_into(merged.per_method.entry(*method).or_default(), headers);
        }
        merge_into(&mut merged.request, &overrides.request);
        merged
    }
}

fn get_ignore_case<'a>(map: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn remove_ignore_case(map: &mut BTreeMap<String, String>, name: &str) -> Option<String> {
    let key = map.keys().find(|key| key.eq_ignore_ascii_case(name))?.clone();
    map.remove(&key)
}

fn merge_into(target: &mut BTreeMap<String, String>, source: &BTreeMap<String, String>) {
    for (name, value) in source {
        remove_ignore_case(target, name);
        target.insert(name.clone(), value.clone());
    }
}

impl RequestConfig {
    /// Load a configuration from its JSON form.
    pub fn from_json(raw: &str) -> Result<Self, ClientError> {
        serde_json::from_str(raw).map_err(|e| ClientError::InvalidConfig(e.to_string()))
    }

    /// Read `API_CLIENT_BASE_URL` and `API_CLIENT_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let mut config = RequestConfig::default();
        config.base_url = lookup(BASE_URL_ENV);
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let timeout_ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ClientError::InvalidConfig(format!("{TIMEOUT_ENV}={raw}: {e}")))?;
            config.timeout_ms = Some(timeout_ms);
        }
        Ok(config)
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// `url` and `data` come from `overrides` alone; they never leak from
    /// defaults into a request. `headers` and `params` merge key by key.
    /// Everything else takes the override when set.
    pub fn merge(&self, overrides: RequestConfig) -> RequestConfig {
        let mut params = self.params.clone();
        params.extend(overrides.params);
        RequestConfig {
            url: overrides.url,
            method: overrides.method.or(self.method),
            base_url: overrides.base_url.or_else(|| self.base_url.clone()),
            headers: self.headers.merge(&overrides.headers),
            params,
            data: overrides.data,
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
            response_type: overrides.response_type.or(self.response_type),
            valid_status: overrides
                .valid_status
                .or_else(|| self.valid_status.clone()),
        }
    }

    /// Resolve base URL, url and params into the URI a request would hit.
    pub fn full_uri(&self) -> Result<String, ClientError> {
        let path = build_full_path(self.base_url.as_deref(), self.url.as_deref());
        append_params(path, &self.params)
    }

    pub fn accepts_status(&self, status: u16) -> bool {
        self.valid_status
            .as_ref()
            .unwrap_or(&DEFAULT_VALID_STATUS)
            .contains(&status)
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Body>) -> Self {
        self.data = data.into().into_option();
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    #[must_use]
    pub fn with_valid_status(mut self, valid_status: RangeInclusive<u16>) -> Self {
        self.valid_status = Some(valid_status);
        self
    }
}

/// `scheme://host` and protocol-relative `//host` count as absolute.
pub(crate) fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn build_full_path(base_url: Option<&str>, url: Option<&str>) -> String {
    match (base_url, url) {
        (Some(base), Some(url)) if !is_absolute_url(url) => combine_urls(base, url),
        (_, Some(url)) => url.to_string(),
        (Some(base), None) => base.to_string(),
        (None, None) => String::new(),
    }
}

fn combine_urls(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

fn append_params(mut url: String, params: &BTreeMap<String, String>) -> Result<String, ClientError> {
    if params.is_empty() {
        return Ok(url);
    }
    let query = serde_urlencoded::to_string(params)?;
    if let Some(hash) = url.find('#') {
        url.truncate(hash);
    }
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&query);
    Ok(url)
}
