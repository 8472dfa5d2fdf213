use jsonwebtoken::{decode, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::ExecError;
use crate::models::JwtLoginOptions;

/// Tokens closer than this to their `exp` claim are fetched again
const EXPIRY_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Option<i64>,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        match self.expires_at {
            Some(exp) => now + EXPIRY_MARGIN_SECS < exp,
            None => true,
        }
    }
}

type TokenSlot = Arc<Mutex<Option<CachedToken>>>;

/// Fetches bearer tokens from login endpoints and caches them per login
pub struct TokenProvider {
    client: Client,
    slots: Mutex<HashMap<String, TokenSlot>>,
}

impl TokenProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return a bearer token for the given login options
    ///
    /// Callers sharing a login wait for a single login call. Different logins
    /// proceed independently.
    pub async fn token(&self, options: &JwtLoginOptions) -> Result<String, ExecError> {
        let slot = self.slot(cache_key(options)).await;

        // Only the per-login slot is held across the login call
        let mut cached = slot.lock().await;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.token.clone());
            }
            tracing::debug!(url = %options.url, "Cached token expired, logging in again");
        }

        let token = self.login(options).await?;
        *cached = Some(CachedToken {
            expires_at: token_expiry(&token),
            token: token.clone(),
        });
        Ok(token)
    }

    async fn slot(&self, key: String) -> TokenSlot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(key).or_default())
    }

    async fn login(&self, options: &JwtLoginOptions) -> Result<String, ExecError> {
        let login_err = |reason: String| ExecError::Login {
            url: options.url.clone(),
            reason,
        };

        tracing::info!(url = %options.url, "Requesting login token");
        let response = self
            .client
            .post(&options.url)
            .json(&options.login_payload)
            .send()
            .await
            .map_err(|e| login_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(login_err(format!("unexpected status {}", status.as_u16())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| login_err(format!("invalid JSON response: {}", e)))?;

        let key = options.token_key();
        match lookup(&body, key) {
            Some(Value::String(token)) if !token.is_empty() => Ok(token.clone()),
            Some(_) => Err(login_err(format!("field `{}` is not a token string", key))),
            None => Err(login_err(format!("field `{}` not found in response", key))),
        }
    }
}

fn cache_key(options: &JwtLoginOptions) -> String {
    format!(
        "{}|{}",
        options.url,
        Value::Object(options.login_payload.clone())
    )
}

/// Follow a dotted path (`data.auth.token`, `tokens.0`) through a JSON value
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[derive(Deserialize)]
struct ExpiryClaims {
    exp: Option<f64>,
}

/// Read the `exp` claim of a JWT without verifying its signature
///
/// Opaque (non-JWT) tokens yield `None`.
pub fn token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()?
        .claims
        .exp
        .map(|exp| exp as i64)
}
