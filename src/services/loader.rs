use reqwest::header::HeaderName;
use reqwest::Method;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{LoadError, LoadFailure};
use crate::models::Endpoint;

const ENDPOINT_REQUIRED: &[&str] = &["name", "base_url", "format", "response_schema"];
const VARIABLE_REQUIRED: &[&str] = &["name", "constant", "values"];
const QUERY_REQUIRED: &[&str] = &["name", "value"];
const JWT_REQUIRED: &[&str] = &["url"];

/// Endpoints that loaded plus the definitions that were rejected
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub endpoints: Vec<Endpoint>,
    pub failures: Vec<LoadFailure>,
    names: HashSet<String>,
}

impl LoadOutcome {
    fn push(&mut self, entry: Result<Endpoint, LoadFailure>) {
        match entry {
            Ok(endpoint) => {
                if self.names.insert(endpoint.name.clone()) {
                    self.endpoints.push(endpoint);
                } else {
                    self.failures.push(LoadFailure::DuplicateName {
                        endpoint: endpoint.name,
                    });
                }
            }
            Err(failure) => self.failures.push(failure),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parse endpoint definitions from a YAML document
///
/// The document is either a sequence of endpoints or a mapping holding the
/// sequence under `endpoints`.
pub fn parse_endpoints(source: &str) -> Result<LoadOutcome, LoadError> {
    let mut outcome = LoadOutcome::default();
    for entry in decode_document(source)? {
        outcome.push(entry);
    }
    Ok(outcome)
}

/// Load endpoint definitions from a file, or from every YAML file of a directory
///
/// A file that is not a valid definitions document is recorded as
/// `LoadFailure::InvalidFile` and the remaining files still load.
pub async fn load_endpoints(path: &Path) -> Result<LoadOutcome, LoadError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let files = if metadata.is_dir() {
        yaml_files(path).await?
    } else {
        vec![path.to_path_buf()]
    };

    let mut outcome = LoadOutcome::default();
    for file in files {
        let source = tokio::fs::read_to_string(&file)
            .await
            .map_err(|source| LoadError::Io {
                path: file.clone(),
                source,
            })?;
        let entries = match decode_document(&source) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Skipping invalid definitions file");
                outcome.failures.push(LoadFailure::InvalidFile {
                    file: file.display().to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        tracing::debug!(file = %file.display(), entries = entries.len(), "Loaded definitions file");
        for entry in entries {
            outcome.push(entry);
        }
    }

    Ok(outcome)
}

/// Render endpoints back to their configuration document
pub fn render_endpoints(endpoints: &[Endpoint]) -> Result<String, LoadError> {
    Ok(serde_yaml::to_string(endpoints)?)
}

async fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "yaml" || ext == "yml")
            .unwrap_or(false);
        if is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn decode_document(source: &str) -> Result<Vec<Result<Endpoint, LoadFailure>>, LoadError> {
    let document: Value = serde_yaml::from_str(source)?;

    let entries = match document {
        Value::Null => Vec::new(),
        Value::Sequence(entries) => entries,
        Value::Mapping(mut map) => match map.remove("endpoints") {
            Some(Value::Sequence(entries)) => entries,
            Some(Value::Null) => Vec::new(),
            _ => return Err(LoadError::UnexpectedShape),
        },
        _ => return Err(LoadError::UnexpectedShape),
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| decode_entry(index, entry))
        .collect())
}

fn decode_entry(index: usize, entry: Value) -> Result<Endpoint, LoadFailure> {
    let label = entry_label(index, &entry);

    let Value::Mapping(map) = &entry else {
        return Err(malformed(&label, "expected a mapping"));
    };
    check_required(&label, map)?;

    let endpoint: Endpoint =
        serde_yaml::from_value(entry).map_err(|e| malformed(&label, e.to_string()))?;
    check_values(&label, &endpoint)?;

    Ok(endpoint)
}

/// Name of the endpoint if it has one, otherwise its position in the document
fn entry_label(index: usize, entry: &Value) -> String {
    entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index))
}

fn check_required(label: &str, map: &Mapping) -> Result<(), LoadFailure> {
    require_keys(label, map, ENDPOINT_REQUIRED, "")?;

    if let Some(Value::Sequence(variables)) = map.get("variables") {
        for (i, variable) in variables.iter().enumerate() {
            if let Value::Mapping(variable) = variable {
                require_keys(label, variable, VARIABLE_REQUIRED, &format!("variables[{}].", i))?;
            }
        }
    }

    if let Some(Value::Sequence(queries)) = map.get("query_parameters") {
        for (i, query) in queries.iter().enumerate() {
            if let Value::Mapping(query) = query {
                require_keys(label, query, QUERY_REQUIRED, &format!("query_parameters[{}].", i))?;
            }
        }
    }

    if let Some(Value::Mapping(jwt)) = map.get("jwt_login") {
        require_keys(label, jwt, JWT_REQUIRED, "jwt_login.")?;
    }

    Ok(())
}

fn require_keys(
    label: &str,
    map: &Mapping,
    keys: &[&str],
    prefix: &str,
) -> Result<(), LoadFailure> {
    for key in keys {
        match map.get(*key) {
            None | Some(Value::Null) => return Err(missing(label, format!("{}{}", prefix, key))),
            Some(_) => {}
        }
    }
    Ok(())
}

fn check_values(label: &str, endpoint: &Endpoint) -> Result<(), LoadFailure> {
    if endpoint.name.trim().is_empty() {
        return Err(missing(label, "name"));
    }
    if endpoint.base_url.trim().is_empty() {
        return Err(missing(label, "base_url"));
    }
    if endpoint.format.trim().is_empty() {
        return Err(missing(label, "format"));
    }

    if let Some(method) = &endpoint.method {
        if !method.trim().is_empty()
            && Method::from_bytes(method.trim().to_uppercase().as_bytes()).is_err()
        {
            return Err(malformed(label, format!("invalid HTTP method `{}`", method)));
        }
    }

    for name in endpoint.headers.keys() {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(malformed(label, format!("invalid header name `{}`", name)));
        }
    }

    if let Some(jwt) = &endpoint.jwt_login {
        if jwt.url.trim().is_empty() {
            return Err(missing(label, "jwt_login.url"));
        }
    }

    for (i, query) in endpoint.query_parameters.iter().enumerate() {
        if query.name.is_empty() {
            return Err(missing(label, format!("query_parameters[{}].name", i)));
        }
        if query.value.is_empty() {
            return Err(missing(label, format!("query_parameters[{}].value", i)));
        }
    }

    let mut seen = HashSet::new();
    for (i, variable) in endpoint.variables.iter().enumerate() {
        if variable.name.is_empty() {
            return Err(missing(label, format!("variables[{}].name", i)));
        }
        if variable.values.is_empty() {
            return Err(missing(label, format!("variables[{}].values", i)));
        }
        if variable.is_constant && variable.values.len() != 1 {
            return Err(malformed(
                label,
                format!(
                    "constant variable `{}` must have exactly one value, found {}",
                    variable.name,
                    variable.values.len()
                ),
            ));
        }
        if !seen.insert(variable.name.as_str()) {
            return Err(malformed(
                label,
                format!("variable `{}` is declared twice", variable.name),
            ));
        }
    }

    Ok(())
}

fn missing(label: &str, field: impl Into<String>) -> LoadFailure {
    LoadFailure::MissingRequiredField {
        endpoint: label.to_string(),
        field: field.into(),
    }
}

fn malformed(label: &str, reason: impl Into<String>) -> LoadFailure {
    LoadFailure::MalformedValue {
        endpoint: label.to_string(),
        reason: reason.into(),
    }
}
