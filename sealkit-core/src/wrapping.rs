//! Single-use response envelopes.
//!
//! Any sensitive payload (a newly issued token, a generated secret) can
//! travel as a wrapped envelope: a short-lived, single-use token stands in
//! for the payload, and whoever unwraps it first gets the real thing while
//! everyone after gets a rejection. The envelope's accessor can revoke it
//! without ever reading the payload.

use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::Client;
use crate::error::SealKitError;
use crate::response::{Secret, WrapInfo};
use crate::transport;

impl Client {
    /// Unwraps a single-use envelope and returns its payload.
    ///
    /// With a `wrap_token`, that envelope is opened in a one-shot request;
    /// the ambient credential authenticates the call and is not disturbed.
    /// Without one, the ambient credential *is* the envelope (self-unwrap):
    /// install the wrapping token with [`Client::set_token`] first.
    ///
    /// Either way the ambient credential is never replaced here. When the
    /// payload is itself a new credential, extract it with
    /// [`Client::unwrap_token`] and install it explicitly.
    ///
    /// Unwrap is strictly single-shot. The service invalidates the envelope
    /// on first read, so a failure is surfaced as-is and must never be
    /// retried; this method does not.
    ///
    /// # Errors
    /// Fails with [`SealKitError::InvalidRequest`] when the envelope was
    /// already consumed, with [`SealKitError::Forbidden`] or
    /// [`SealKitError::InvalidRequest`] when it was revoked through its
    /// accessor before being read, and with transport failures.
    pub async fn unwrap(&self, wrap_token: Option<&str>) -> Result<Secret, SealKitError> {
        let body = wrap_token.map(|token| json!({ "token": token }));
        let value = self
            .transport
            .put("sys/wrapping/unwrap", body)
            .await?
            .ok_or_else(|| SealKitError::serialization("unwrap returned an empty body"))?;
        debug!(self_unwrap = wrap_token.is_none(), "envelope unwrapped");
        transport::decode(value, "unwrapped response")
    }

    /// Unwraps an envelope whose payload is a newly issued token and
    /// returns that token.
    ///
    /// The returned credential is *not* installed as the ambient one;
    /// pass it to [`Client::set_token`] to adopt it.
    ///
    /// # Errors
    /// Same failure modes as [`Client::unwrap`], plus
    /// [`SealKitError::Serialization`] when the payload carries no
    /// credential block.
    pub async fn unwrap_token(
        &self,
        wrap_token: Option<&str>,
    ) -> Result<SecretString, SealKitError> {
        let secret = self.unwrap(wrap_token).await?;
        let auth = secret.auth.ok_or_else(|| {
            SealKitError::serialization("unwrapped payload carries no credential block")
        })?;
        Ok(SecretString::from(auth.client_token))
    }

    /// Revokes an envelope through its accessor without ever reading the
    /// payload. Subsequent unwrap attempts fail.
    ///
    /// # Errors
    /// Returns [`SealKitError::Forbidden`] when the token lacks the
    /// capability, or a transport failure.
    pub async fn revoke_accessor(&self, wrapped_accessor: &str) -> Result<(), SealKitError> {
        self.transport
            .put(
                "auth/token/revoke-accessor",
                Some(json!({ "accessor": wrapped_accessor })),
            )
            .await?;
        debug!("envelope revoked via accessor");
        Ok(())
    }

    /// Issues a write whose response is delivered wrapped, returning the
    /// envelope descriptor instead of the payload. `wrap_ttl` is a duration
    /// string such as `"60s"` bounding how long the envelope stays
    /// unwrappable.
    ///
    /// # Errors
    /// Propagates service rejections and transport failures, and fails with
    /// [`SealKitError::Serialization`] when the service did not wrap the
    /// response.
    pub async fn wrapped_write(
        &self,
        path: &str,
        body: Value,
        wrap_ttl: &str,
    ) -> Result<WrapInfo, SealKitError> {
        let value = self
            .transport
            .put_wrapped(path, body, wrap_ttl)
            .await?
            .ok_or_else(|| SealKitError::serialization("wrapped write returned an empty body"))?;
        let secret: Secret = transport::decode(value, "wrapped response")?;
        secret
            .wrap_info
            .ok_or_else(|| SealKitError::serialization("service did not wrap the response"))
    }
}
