use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_OK_CODE: u16 = 200;

/// A variable interpolated into the base url and the query parameter values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    /// Constant variables carry exactly one value
    #[serde(rename = "constant")]
    pub is_constant: bool,
    /// Every value the variable can take, in declaration order
    pub values: Vec<String>,
}

impl Variable {
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_constant: true,
            values: vec![value.into()],
        }
    }

    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.name)
    }
}

/// Options to fetch a bearer token from a login endpoint before the actual call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtLoginOptions {
    pub url: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub login_payload: Map<String, Value>,
    /// Dotted path of the token inside the login response (defaults to `token`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_key_name: Option<String>,
}

impl JwtLoginOptions {
    pub fn token_key(&self) -> &str {
        self.token_key_name
            .as_deref()
            .filter(|key| !key.is_empty())
            .unwrap_or("token")
    }
}

/// A single query parameter added to the call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub name: String,
    pub value: String,
}

/// Definition of an endpoint under test, in its configuration (snake_case) shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    #[serde(default = "enabled_by_default", skip_serializing_if = "is_enabled")]
    pub enabled: bool,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// An explicit `null` payload stays `Some(Value::Null)`, an absent one is `None`
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload: Option<Value>,
    /// Raw value of the Authorization header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_login: Option<JwtLoginOptions>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excluded_validators: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<QueryDefinition>,
    /// Expected response format (`json`, `text`, ...)
    pub format: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok_code: Option<u16>,
    pub response_schema: Value,
}

fn enabled_by_default() -> bool {
    true
}

fn is_enabled(enabled: &bool) -> bool {
    *enabled
}

/// Decode a field that is present, `null` included, as `Some`
pub(crate) fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Endpoint {
    /// Create an enabled GET endpoint with only the mandatory fields set
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        format: impl Into<String>,
        response_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            base_url: base_url.into(),
            method: None,
            payload: None,
            authorization: None,
            jwt_login: None,
            headers: IndexMap::new(),
            excluded_validators: BTreeSet::new(),
            query_parameters: Vec::new(),
            format: format.into(),
            variables: Vec::new(),
            ok_code: None,
            response_schema,
        }
    }

    /// HTTP method to use, upper-cased
    pub fn method(&self) -> String {
        self.method
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_METHOD)
            .trim()
            .to_uppercase()
    }

    pub fn expected_status(&self) -> u16 {
        self.ok_code.unwrap_or(DEFAULT_OK_CODE)
    }

    pub fn is_excluded(&self, validator: &str) -> bool {
        self.excluded_validators.contains(validator)
    }

    pub fn expects_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}
