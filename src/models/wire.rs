//! Interchange (camelCase) representation of the endpoint model.
//!
//! The configuration shape lives on the model types themselves. This module
//! keeps the second key mapping explicit: every DTO mirrors one model type and
//! converts to and from it without loss.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::endpoint::present_value;
use super::{Endpoint, EndpointResponse, JwtLoginOptions, QueryDefinition, ValidationItem, Variable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDto {
    pub name: String,
    #[serde(rename = "constant")]
    pub is_constant: bool,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtLoginDto {
    pub url: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub login_payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_key_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDefinitionDto {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDto {
    pub name: String,
    #[serde(default = "enabled_by_default", skip_serializing_if = "is_enabled")]
    pub enabled: bool,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_login: Option<JwtLoginDto>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excluded_validators: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<QueryDefinitionDto>,
    pub format: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok_code: Option<u16>,
    pub response_schema: Value,
}

/// Interchange shape of a validation item (`{definition, response}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationItemDto {
    pub definition: EndpointDto,
    pub response: EndpointResponse,
}

fn enabled_by_default() -> bool {
    true
}

fn is_enabled(enabled: &bool) -> bool {
    *enabled
}

impl From<Variable> for VariableDto {
    fn from(variable: Variable) -> Self {
        Self {
            name: variable.name,
            is_constant: variable.is_constant,
            values: variable.values,
        }
    }
}

impl From<VariableDto> for Variable {
    fn from(dto: VariableDto) -> Self {
        Self {
            name: dto.name,
            is_constant: dto.is_constant,
            values: dto.values,
        }
    }
}

impl From<JwtLoginOptions> for JwtLoginDto {
    fn from(options: JwtLoginOptions) -> Self {
        Self {
            url: options.url,
            login_payload: options.login_payload,
            token_key_name: options.token_key_name,
        }
    }
}

impl From<JwtLoginDto> for JwtLoginOptions {
    fn from(dto: JwtLoginDto) -> Self {
        Self {
            url: dto.url,
            login_payload: dto.login_payload,
            token_key_name: dto.token_key_name,
        }
    }
}

impl From<QueryDefinition> for QueryDefinitionDto {
    fn from(query: QueryDefinition) -> Self {
        Self {
            name: query.name,
            value: query.value,
        }
    }
}

impl From<QueryDefinitionDto> for QueryDefinition {
    fn from(dto: QueryDefinitionDto) -> Self {
        Self {
            name: dto.name,
            value: dto.value,
        }
    }
}

impl From<Endpoint> for EndpointDto {
    fn from(endpoint: Endpoint) -> Self {
        Self {
            name: endpoint.name,
            enabled: endpoint.enabled,
            base_url: endpoint.base_url,
            method: endpoint.method,
            payload: endpoint.payload,
            authorization: endpoint.authorization,
            jwt_login: endpoint.jwt_login.map(Into::into),
            headers: endpoint.headers,
            excluded_validators: endpoint.excluded_validators,
            query_parameters: endpoint.query_parameters.into_iter().map(Into::into).collect(),
            format: endpoint.format,
            variables: endpoint.variables.into_iter().map(Into::into).collect(),
            ok_code: endpoint.ok_code,
            response_schema: endpoint.response_schema,
        }
    }
}

impl From<EndpointDto> for Endpoint {
    fn from(dto: EndpointDto) -> Self {
        Self {
            name: dto.name,
            enabled: dto.enabled,
            base_url: dto.base_url,
            method: dto.method,
            payload: dto.payload,
            authorization: dto.authorization,
            jwt_login: dto.jwt_login.map(Into::into),
            headers: dto.headers,
            excluded_validators: dto.excluded_validators,
            query_parameters: dto.query_parameters.into_iter().map(Into::into).collect(),
            format: dto.format,
            variables: dto.variables.into_iter().map(Into::into).collect(),
            ok_code: dto.ok_code,
            response_schema: dto.response_schema,
        }
    }
}

impl From<ValidationItem> for ValidationItemDto {
    fn from(item: ValidationItem) -> Self {
        Self {
            definition: item.definition.into(),
            response: item.response,
        }
    }
}

impl From<ValidationItemDto> for ValidationItem {
    fn from(dto: ValidationItemDto) -> Self {
        Self::new(dto.definition.into(), dto.response)
    }
}

/// Encode an endpoint with interchange keys
pub fn endpoint_to_json(endpoint: &Endpoint) -> serde_json::Result<String> {
    serde_json::to_string(&EndpointDto::from(endpoint.clone()))
}

/// Decode an endpoint from interchange keys
pub fn endpoint_from_json(json: &str) -> serde_json::Result<Endpoint> {
    serde_json::from_str::<EndpointDto>(json).map(Into::into)
}

pub fn item_to_json(item: &ValidationItem) -> serde_json::Result<String> {
    serde_json::to_string(&ValidationItemDto::from(item.clone()))
}

pub fn item_from_json(json: &str) -> serde_json::Result<ValidationItem> {
    serde_json::from_str::<ValidationItemDto>(json).map(Into::into)
}
