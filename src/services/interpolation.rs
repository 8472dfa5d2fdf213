use url::Url;

use crate::error::ExecError;
use crate::models::Endpoint;

/// One concrete request produced from an endpoint definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub url: String,
    /// Variable values used for this request, in declaration order
    pub bindings: Vec<(String, String)>,
}

/// Expand an endpoint into one request per combination of variable values
///
/// Combinations follow declaration order: the first variable varies slowest.
/// Placeholders without a matching variable are left untouched.
pub fn expand(endpoint: &Endpoint) -> Result<Vec<ResolvedRequest>, ExecError> {
    let mut combinations: Vec<Vec<(String, String)>> = vec![Vec::new()];

    for variable in &endpoint.variables {
        if variable.values.is_empty() {
            return Err(ExecError::EmptyVariable(variable.name.clone()));
        }
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                variable.values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push((variable.name.clone(), value.clone()));
                    next
                })
            })
            .collect();
    }

    combinations
        .into_iter()
        .map(|bindings| {
            let url = resolve_url(endpoint, &bindings)?;
            Ok(ResolvedRequest { url, bindings })
        })
        .collect()
}

/// Replace every `{name}` placeholder with its bound value
pub fn substitute(text: &str, bindings: &[(String, String)]) -> String {
    let mut result = text.to_string();
    for (name, value) in bindings {
        result = result.replace(&format!("{{{}}}", name), value);
    }
    result
}

fn resolve_url(endpoint: &Endpoint, bindings: &[(String, String)]) -> Result<String, ExecError> {
    let base = substitute(&endpoint.base_url, bindings);
    let mut url = Url::parse(&base).map_err(|e| ExecError::InvalidUrl {
        url: base.clone(),
        reason: e.to_string(),
    })?;

    if !endpoint.query_parameters.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for query in &endpoint.query_parameters {
            pairs.append_pair(&query.name, &substitute(&query.value, bindings));
        }
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryDefinition, Variable};
    use serde_json::json;

    fn endpoint(base_url: &str) -> Endpoint {
        Endpoint::new("test", base_url, "json", json!({}))
    }

    #[test]
    fn test_substitute() {
        let bindings = vec![
            ("id".to_string(), "42".to_string()),
            ("org".to_string(), "acme".to_string()),
        ];
        assert_eq!(
            substitute("/orgs/{org}/users/{id}/{unknown}", &bindings),
            "/orgs/acme/users/42/{unknown}"
        );
    }

    #[test]
    fn test_no_variables_yields_one_request() {
        let requests = expand(&endpoint("https://api.example.com/health")).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.example.com/health");
        assert!(requests[0].bindings.is_empty());
    }

    #[test]
    fn test_cartesian_product_in_order() {
        let mut endpoint = endpoint("https://api.example.com/{region}/items/{id}");
        endpoint.variables = vec![
            Variable {
                name: "region".to_string(),
                is_constant: false,
                values: vec!["eu".to_string(), "us".to_string()],
            },
            Variable {
                name: "id".to_string(),
                is_constant: false,
                values: vec!["1".to_string(), "2".to_string(), "3".to_string()],
            },
        ];

        let urls: Vec<String> = expand(&endpoint).unwrap().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://api.example.com/eu/items/1",
                "https://api.example.com/eu/items/2",
                "https://api.example.com/eu/items/3",
                "https://api.example.com/us/items/1",
                "https://api.example.com/us/items/2",
                "https://api.example.com/us/items/3",
            ]
        );
    }

    #[test]
    fn test_query_parameters_are_interpolated_and_encoded() {
        let mut endpoint = endpoint("https://api.example.com/search?page=1");
        endpoint.variables.push(Variable::constant("term", "rust lang"));
        endpoint.query_parameters = vec![
            QueryDefinition {
                name: "q".to_string(),
                value: "{term}".to_string(),
            },
            QueryDefinition {
                name: "sort".to_string(),
                value: "desc&x".to_string(),
            },
        ];

        let requests = expand(&endpoint).unwrap();
        assert_eq!(
            requests[0].url,
            "https://api.example.com/search?page=1&q=rust+lang&sort=desc%26x"
        );
        assert_eq!(
            requests[0].bindings,
            vec![("term".to_string(), "rust lang".to_string())]
        );
    }

    #[test]
    fn test_empty_variable() {
        let mut endpoint = endpoint("https://api.example.com/{id}");
        endpoint.variables.push(Variable {
            name: "id".to_string(),
            is_constant: false,
            values: Vec::new(),
        });
        assert_eq!(
            expand(&endpoint).unwrap_err(),
            ExecError::EmptyVariable("id".to_string())
        );
    }

    #[test]
    fn test_invalid_url() {
        let result = expand(&endpoint("not a url"));
        assert!(matches!(result, Err(ExecError::InvalidUrl { .. })));
    }
}
