use jsonschema::Validator as CompiledSchema;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::models::{Outcome, ValidationItem, ValidationReport, ValidatorOutcome};

/// Maximum number of schema errors reported per response
const MAX_SCHEMA_ERRORS: usize = 5;

/// A named check applied to a captured response
pub trait Validator: Send + Sync {
    /// Name used in `excluded_validators`
    fn name(&self) -> &'static str;

    fn validate(&self, item: &ValidationItem) -> Result<(), String>;
}

/// Observed status code must equal the expected one (200 unless `ok_code` is set)
pub struct StatusValidator;

impl Validator for StatusValidator {
    fn name(&self) -> &'static str {
        "status"
    }

    fn validate(&self, item: &ValidationItem) -> Result<(), String> {
        let expected = item.definition.expected_status();
        let actual = item.response.status_code();
        if actual != expected {
            return Err(format!("expected status {}, got {}", expected, actual));
        }
        Ok(())
    }
}

/// Decoded body must match the declared response format
pub struct FormatValidator;

impl Validator for FormatValidator {
    fn name(&self) -> &'static str {
        "format"
    }

    fn validate(&self, item: &ValidationItem) -> Result<(), String> {
        let body = item.response.raw_data();
        let format = item.definition.format.to_lowercase();

        match format.as_str() {
            // Bodies that failed to parse are kept as a string by `decode_body`.
            // An empty body decodes to null and is left to the schema check.
            "json" => match body {
                Value::String(_) => Err("expected a JSON body, got unparsable text".to_string()),
                _ => Ok(()),
            },
            "text" | "html" | "xml" => match body {
                Value::String(_) | Value::Null => Ok(()),
                _ => Err(format!("expected a {} body", format)),
            },
            other => Err(format!("unknown response format `{}`", other)),
        }
    }
}

/// Body must validate against the endpoint's response schema (JSON Schema)
///
/// Compiled schemas are kept for the validator's lifetime, keyed by their
/// serialized form, so every response of an endpoint reuses one compilation.
#[derive(Default)]
pub struct SchemaValidator {
    compiled: Mutex<HashMap<String, Arc<CompiledSchema>>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct schemas compiled so far
    pub fn compiled_count(&self) -> usize {
        self.compiled.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn compile(&self, schema: &Value) -> Result<Arc<CompiledSchema>, String> {
        let key = schema.to_string();
        if let Ok(compiled) = self.compiled.lock() {
            if let Some(validator) = compiled.get(&key) {
                return Ok(Arc::clone(validator));
            }
        }

        let validator = Arc::new(
            jsonschema::validator_for(schema)
                .map_err(|e| format!("invalid response schema: {}", e))?,
        );
        if let Ok(mut compiled) = self.compiled.lock() {
            compiled.insert(key, Arc::clone(&validator));
        }
        Ok(validator)
    }
}

impl Validator for SchemaValidator {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn validate(&self, item: &ValidationItem) -> Result<(), String> {
        let validator = self.compile(&item.definition.response_schema)?;

        let errors: Vec<String> = validator
            .iter_errors(item.response.raw_data())
            .take(MAX_SCHEMA_ERRORS)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

/// Runs registered validators over validation items
pub struct ValidationEngine {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationEngine {
    /// Engine without any validator
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Engine with the built-in `status`, `format` and `schema` validators
    pub fn with_defaults() -> Self {
        let mut engine = Self::empty();
        engine.register(StatusValidator);
        engine.register(FormatValidator);
        engine.register(SchemaValidator::new());
        engine
    }

    /// Register a validator, replacing one already registered under the same name
    pub fn register<V: Validator + 'static>(&mut self, validator: V) {
        self.validators.retain(|v| v.name() != validator.name());
        self.validators.push(Box::new(validator));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn validate(&self, item: &ValidationItem) -> ValidationReport {
        let definition = &item.definition;

        let known: HashSet<&str> = self.validators.iter().map(|v| v.name()).collect();
        for excluded in &definition.excluded_validators {
            if !known.contains(excluded.as_str()) {
                tracing::warn!(
                    endpoint = %definition.name,
                    validator = %excluded,
                    "Excluded validator is not registered"
                );
            }
        }

        let outcomes = self
            .validators
            .iter()
            .map(|validator| {
                let outcome = if definition.is_excluded(validator.name()) {
                    Outcome::Skipped
                } else {
                    match validator.validate(item) {
                        Ok(()) => Outcome::Passed,
                        Err(reason) => Outcome::Failed { reason },
                    }
                };
                ValidatorOutcome {
                    validator: validator.name().to_string(),
                    outcome,
                }
            })
            .collect();

        ValidationReport {
            endpoint: definition.name.clone(),
            url: item.response.url().to_string(),
            status_code: item.response.status_code(),
            outcomes,
        }
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, EndpointResponse, Variable};
    use serde_json::json;

    fn get_user() -> Endpoint {
        let mut endpoint = Endpoint::new(
            "get-user",
            "https://api.example.com/users/{id}",
            "json",
            json!({
                "type": "object",
                "required": ["id", "name"],
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"}
                }
            }),
        );
        endpoint.ok_code = Some(200);
        endpoint.variables.push(Variable::constant("id", "42"));
        endpoint
    }

    fn item(endpoint: Endpoint, status: u16, body: Value) -> ValidationItem {
        ValidationItem::new(
            endpoint,
            EndpointResponse::new(status, body, "https://api.example.com/users/42"),
        )
    }

    #[test]
    fn test_status_mismatch() {
        let item = item(get_user(), 404, json!({"error": "not found"}));

        assert_eq!(
            StatusValidator.validate(&item),
            Err("expected status 200, got 404".to_string())
        );

        let report = ValidationEngine::with_defaults().validate(&item);
        assert!(!report.passed());
        assert!(report.outcome_of("status").unwrap().is_failure());
        assert_eq!(report.status_code, 404);
        assert_eq!(report.url, "https://api.example.com/users/42");
    }

    #[test]
    fn test_all_pass() {
        let item = item(get_user(), 200, json!({"id": 42, "name": "Ada"}));
        let report = ValidationEngine::with_defaults().validate(&item);

        assert!(report.passed(), "unexpected failures: {:?}", report.outcomes);
        assert_eq!(report.outcomes.len(), 3);
    }

    #[test]
    fn test_schema_failure() {
        let item = item(get_user(), 200, json!({"id": "42"}));
        let err = SchemaValidator::new().validate(&item).unwrap_err();
        assert!(err.contains("name"), "unexpected error: {}", err);
    }

    #[test]
    fn test_schema_compiled_once_per_definition() {
        let validator = SchemaValidator::new();
        let endpoint = get_user();

        for id in [42, 7, 13] {
            let body = json!({"id": id, "name": "user"});
            assert!(validator.validate(&item(endpoint.clone(), 200, body)).is_ok());
        }
        assert!(validator
            .validate(&item(endpoint, 200, json!({"id": 1})))
            .is_err());
        assert_eq!(validator.compiled_count(), 1);

        let other = Endpoint::new("any", "https://api.example.com/", "json", json!({}));
        assert!(validator.validate(&item(other, 200, json!(null))).is_ok());
        assert_eq!(validator.compiled_count(), 2);
    }

    #[test]
    fn test_invalid_schema() {
        let endpoint = Endpoint::new(
            "bad-schema",
            "https://api.example.com/",
            "json",
            json!({"type": 12}),
        );
        let err = SchemaValidator::new()
            .validate(&item(endpoint, 200, json!({})))
            .unwrap_err();
        assert!(err.starts_with("invalid response schema"));
    }

    #[test]
    fn test_excluded_validators_are_skipped() {
        let mut endpoint = get_user();
        endpoint.excluded_validators.insert("status".to_string());
        endpoint.excluded_validators.insert("schema".to_string());
        endpoint.excluded_validators.insert("unknown".to_string());

        let report = ValidationEngine::with_defaults().validate(&item(endpoint, 500, json!({})));

        assert!(report.passed());
        assert_eq!(report.outcome_of("status"), Some(&Outcome::Skipped));
        assert_eq!(report.outcome_of("schema"), Some(&Outcome::Skipped));
        assert_eq!(report.outcome_of("format"), Some(&Outcome::Passed));
    }

    #[test]
    fn test_format_validator() {
        let json_endpoint = get_user();
        assert_eq!(
            FormatValidator.validate(&item(json_endpoint.clone(), 200, json!("<html>"))),
            Err("expected a JSON body, got unparsable text".to_string())
        );
        assert!(FormatValidator
            .validate(&item(json_endpoint, 200, Value::Null))
            .is_ok());

        let text_endpoint = Endpoint::new("text", "https://api.example.com/", "text", json!({}));
        assert!(FormatValidator
            .validate(&item(text_endpoint.clone(), 200, json!("pong")))
            .is_ok());
        assert!(FormatValidator
            .validate(&item(text_endpoint, 200, json!({"a": 1})))
            .is_err());

        let other = Endpoint::new("csv", "https://api.example.com/", "csv", json!({}));
        assert!(FormatValidator.validate(&item(other, 200, json!("a,b"))).is_err());
    }

    #[test]
    fn test_format_accepts_scalar_json() {
        let endpoint = get_user();
        for body in [json!(42), json!(true), json!(1.5), json!([]), json!({})] {
            assert_eq!(
                FormatValidator.validate(&item(endpoint.clone(), 200, body.clone())),
                Ok(()),
                "body {} rejected",
                body
            );
        }
    }

    #[test]
    fn test_format_checks_decoded_body() {
        use crate::services::executor::decode_body;

        let endpoint = get_user();
        let numeric = decode_body(&endpoint, "42".to_string());
        assert!(FormatValidator.validate(&item(endpoint.clone(), 200, numeric)).is_ok());

        let garbage = decode_body(&endpoint, "<html>oops</html>".to_string());
        assert!(FormatValidator.validate(&item(endpoint, 200, garbage)).is_err());
    }

    struct LenientStatusValidator;

    impl Validator for LenientStatusValidator {
        fn name(&self) -> &'static str {
            "status"
        }

        fn validate(&self, _item: &ValidationItem) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut engine = ValidationEngine::with_defaults();
        engine.register(LenientStatusValidator);

        assert_eq!(engine.names(), vec!["format", "schema", "status"]);
        let report = engine.validate(&item(get_user(), 404, json!({"id": 1, "name": "x"})));
        assert!(report.passed());
    }
}
