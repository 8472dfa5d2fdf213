use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::ExecError;
use crate::models::{Endpoint, EndpointResponse};

use super::interpolation::{self, ResolvedRequest};
use super::jwt::TokenProvider;

/// Outcome of one resolved request
pub type CallResult = Result<EndpointResponse, ExecError>;

/// Executes endpoint definitions and captures their responses
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute every resolved request of the endpoint
    ///
    /// The outer error covers failures of the whole endpoint (method,
    /// variable expansion, login). Each resolved request gets its own result,
    /// in expansion order.
    async fn execute(&self, endpoint: &Endpoint) -> Result<Vec<CallResult>, ExecError>;
}

/// Configuration for the HTTP executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Headers sent with every request, endpoint headers override them
    pub default_headers: IndexMap<String, String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("endpoint-probe/{}", env!("CARGO_PKG_VERSION")),
            default_headers: IndexMap::new(),
        }
    }
}

impl From<&Config> for ExecutorConfig {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            default_headers: IndexMap::new(),
        }
    }
}

/// reqwest based executor
pub struct HttpExecutor {
    client: Client,
    tokens: TokenProvider,
    config: ExecutorConfig,
}

impl HttpExecutor {
    /// Create a new executor with default config
    pub fn new() -> Result<Self, ExecError> {
        Self::with_config(ExecutorConfig::default())
    }

    /// Create a new executor with custom config
    pub fn with_config(config: ExecutorConfig) -> Result<Self, ExecError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ExecError::Client(e.to_string()))?;

        Ok(Self {
            tokens: TokenProvider::new(client.clone()),
            client,
            config,
        })
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        method: &Method,
        request: &ResolvedRequest,
        bearer: Option<&str>,
    ) -> Result<EndpointResponse, ExecError> {
        let request_err = |reason: String| ExecError::Request {
            url: request.url.clone(),
            reason,
        };

        let mut builder = self.client.request(method.clone(), request.url.as_str());

        for (key, value) in &self.config.default_headers {
            if !endpoint.headers.contains_key(key) {
                builder = builder.header(key.as_str(), value.as_str());
            }
        }
        for (key, value) in &endpoint.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        // A token obtained through JWT login takes precedence over a static value
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        } else if let Some(authorization) = &endpoint.authorization {
            builder = builder.header(AUTHORIZATION, authorization.as_str());
        }

        if let Some(payload) = endpoint.payload.as_ref().filter(|p| !p.is_null()) {
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(|e| request_err(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| request_err(format!("failed to read body: {}", e)))?;

        tracing::debug!(
            endpoint = %endpoint.name,
            url = %request.url,
            status = status,
            "Request completed"
        );

        Ok(EndpointResponse::new(
            status,
            decode_body(endpoint, body),
            request.url.clone(),
        ))
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, endpoint: &Endpoint) -> Result<Vec<CallResult>, ExecError> {
        let method_name = endpoint.method();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| ExecError::InvalidMethod(method_name.clone()))?;

        let requests = interpolation::expand(endpoint)?;

        let bearer = match &endpoint.jwt_login {
            Some(options) => Some(self.tokens.token(options).await?),
            None => None,
        };

        let mut results = Vec::with_capacity(requests.len());
        for request in &requests {
            let result = self.send(endpoint, &method, request, bearer.as_deref()).await;
            if let Err(e) = &result {
                tracing::debug!(endpoint = %endpoint.name, error = %e, "Request failed");
            }
            results.push(result);
        }

        Ok(results)
    }
}

/// Decode a response body according to the expected format
///
/// JSON bodies that fail to parse are kept as a string so the format
/// validator can report them.
pub fn decode_body(endpoint: &Endpoint, body: String) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    if endpoint.expects_json() {
        serde_json::from_str(&body).unwrap_or(Value::String(body))
    } else {
        Value::String(body)
    }
}
