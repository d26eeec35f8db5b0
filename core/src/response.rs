//! Response descriptor handed back by a dispatch.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{RequestConfig, ResponseType};
use crate::error::ClientError;
use crate::http::find_header;

/// Decoded response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseData {
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl ResponseData {
    /// Decode `body` per `response_type`. A body that does not parse as JSON
    /// is kept as text rather than failing the request.
    pub(crate) fn decode(body: String, response_type: ResponseType) -> Self {
        if body.is_empty() {
            return ResponseData::Empty;
        }
        match response_type {
            ResponseType::Json => match serde_json::from_str(&body) {
                Ok(value) => ResponseData::Json(value),
                Err(_) => ResponseData::Text(body),
            },
            ResponseType::Text => ResponseData::Text(body),
        }
    }
}

/// A completed exchange together with the effective configuration that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub data: ResponseData,
    pub config: RequestConfig,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body into `T`, whichever way it was decoded.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let value = match &self.data {
            ResponseData::Empty => Value::Null,
            ResponseData::Text(text) => serde_json::from_str(text)?,
            ResponseData::Json(value) => value.clone(),
        };
        Ok(serde_json::from_value(value)?)
    }
}
