use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    // Definitions
    pub endpoints_path: PathBuf,

    // Execution
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub interval_secs: u64,
    pub user_agent: String,

    // Output
    pub report_format: ReportFormat,
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if exists

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let concurrency: usize = lookup("PROBE_CONCURRENCY")
            .unwrap_or_else(|| "8".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("PROBE_CONCURRENCY"))?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid("PROBE_CONCURRENCY"));
        }

        Ok(Self {
            // Definitions
            endpoints_path: lookup("PROBE_ENDPOINTS")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .ok_or(ConfigError::Missing("PROBE_ENDPOINTS"))?,

            // Execution
            timeout_secs: lookup("PROBE_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PROBE_TIMEOUT_SECS"))?,
            concurrency,
            interval_secs: lookup("PROBE_INTERVAL_SECS")
                .unwrap_or_else(|| "0".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PROBE_INTERVAL_SECS"))?,
            user_agent: lookup("PROBE_USER_AGENT")
                .unwrap_or_else(|| format!("endpoint-probe/{}", env!("CARGO_PKG_VERSION"))),

            // Output
            report_format: match lookup("PROBE_REPORT_FORMAT").as_deref() {
                None | Some("text") => ReportFormat::Text,
                Some("json") => ReportFormat::Json,
                Some(_) => return Err(ConfigError::Invalid("PROBE_REPORT_FORMAT")),
            },
            log_json: matches!(
                lookup("PROBE_LOG_JSON").as_deref(),
                Some("1") | Some("true")
            ),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Interval between runs, `None` when the probe runs once
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("PROBE_ENDPOINTS", "endpoints.yaml")])).unwrap();

        assert_eq!(config.endpoints_path, PathBuf::from("endpoints.yaml"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.interval(), None);
        assert_eq!(config.report_format, ReportFormat::Text);
        assert!(config.user_agent.starts_with("endpoint-probe/"));
        assert!(!config.log_json);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PROBE_ENDPOINTS", "defs"),
            ("PROBE_TIMEOUT_SECS", "5"),
            ("PROBE_CONCURRENCY", "2"),
            ("PROBE_INTERVAL_SECS", "60"),
            ("PROBE_REPORT_FORMAT", "json"),
            ("PROBE_LOG_JSON", "1"),
        ]))
        .unwrap();

        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.report_format, ReportFormat::Json);
        assert!(config.log_json);
    }

    #[test]
    fn test_missing_endpoints() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PROBE_ENDPOINTS")));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[
            ("PROBE_ENDPOINTS", "defs"),
            ("PROBE_CONCURRENCY", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PROBE_CONCURRENCY")));

        let err = Config::from_lookup(lookup(&[
            ("PROBE_ENDPOINTS", "defs"),
            ("PROBE_REPORT_FORMAT", "xml"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PROBE_REPORT_FORMAT")));
    }
}
