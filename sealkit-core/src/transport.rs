//! HTTP plumbing shared by every ceremony session.

use std::time::Duration;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::SealKitError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("sealkit-core/", env!("CARGO_PKG_VERSION"));

/// Authenticated JSON transport against the service API.
///
/// Every call is a single round trip. Failures, transport-level or
/// service-reported, always propagate and are never retried here:
/// ceremony submissions are stateful, and a blind retry could double-count
/// a share.
#[derive(Debug)]
pub struct Transport {
    http: reqwest::Client,
    address: String,
    token: SecretString,
}

impl Transport {
    pub fn new(address: &str, token: SecretString) -> Self {
        let address = address.trim_end_matches('/').to_string();
        if !address.starts_with("https://") {
            // Dev servers legitimately run plain HTTP; production must not.
            warn!(%address, "service address is not https; shares and tokens travel unprotected");
        }
        Self {
            http: reqwest::Client::new(),
            address,
            token,
        }
    }

    pub fn set_token(&mut self, token: SecretString) {
        self.token = token;
    }

    pub async fn get(&self, path: &str) -> Result<Value, SealKitError> {
        self.dispatch(Method::GET, path, None, None)
            .await?
            .ok_or_else(|| {
                SealKitError::serialization(format!("GET {path} returned an empty body"))
            })
    }

    pub async fn put(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, SealKitError> {
        self.dispatch(Method::PUT, path, body.as_ref(), None).await
    }

    pub async fn put_wrapped(
        &self,
        path: &str,
        body: Value,
        wrap_ttl: &str,
    ) -> Result<Option<Value>, SealKitError> {
        self.dispatch(Method::PUT, path, Some(&body), Some(wrap_ttl))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<(), SealKitError> {
        self.dispatch(Method::DELETE, path, None, None)
            .await
            .map(|_| ())
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        wrap_ttl: Option<&str>,
    ) -> Result<Option<Value>, SealKitError> {
        let url = format!("{}/v1/{path}", self.address);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .timeout(REQUEST_TIMEOUT)
            .header("User-Agent", USER_AGENT)
            .header("X-Vault-Token", self.token.expose_secret());
        if let Some(ttl) = wrap_ttl {
            request = request.header("X-Vault-Wrap-TTL", ttl);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(SealKitError::from_status(
                status.as_u16(),
                parse_error_body(&text),
            ));
        }
        if text.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| SealKitError::serialization(format!("{method} {path}: {e}")))
    }
}

/// Decodes a response body into the expected shape, labelling failures with
/// what was being decoded.
pub fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, SealKitError> {
    serde_json::from_value(value).map_err(|e| SealKitError::serialization(format!("{what}: {e}")))
}

/// The service reports failures as `{"errors": [...]}`; anything else is
/// passed through raw so no diagnostic is lost.
fn parse_error_body(body: &str) -> Vec<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        errors: Vec<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed.errors,
        _ => vec![body.trim().to_string()],
    }
}
