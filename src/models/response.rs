use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Endpoint;

/// Captured result of one executed HTTP call
///
/// Fields are private so a response cannot change once it has been recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResponse {
    status_code: u16,
    raw_data: Value,
    url: String,
}

impl EndpointResponse {
    pub fn new(status_code: u16, raw_data: Value, url: impl Into<String>) -> Self {
        Self {
            status_code,
            raw_data,
            url: url.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Decoded response body
    pub fn raw_data(&self) -> &Value {
        &self.raw_data
    }

    /// Fully resolved request url
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A definition paired with the response observed for it
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationItem {
    pub definition: Endpoint,
    pub response: EndpointResponse,
}

impl ValidationItem {
    pub fn new(definition: Endpoint, response: EndpointResponse) -> Self {
        Self {
            definition,
            response,
        }
    }
}
