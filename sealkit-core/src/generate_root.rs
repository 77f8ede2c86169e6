//! Root-credential regeneration ceremony.

use base64::{engine::general_purpose::STANDARD, Engine};
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::{Zeroize, Zeroizing};

use crate::ceremony::RoundTracker;
use crate::client::Client;
use crate::error::SealKitError;
use crate::response::RootGenerationStatus;
use crate::transport;

/// How the regenerated credential is protected in transit. Exactly one
/// mode applies per round, by construction.
#[derive(Debug, Clone)]
pub enum RootGenerationMode {
    /// XOR the credential against a caller-supplied base64 one-time pad.
    /// The pad must decode to the credential's length (16 bytes).
    Otp(String),
    /// Encrypt the credential to a base64 PGP public key. Decryption
    /// happens outside this crate.
    PgpKey(String),
}

/// Outcome of one root-generation share submission.
#[derive(Debug)]
pub struct RootGenerationProgress {
    /// Raw round state as reported by the service, including the still
    /// encoded credential once complete.
    pub status: RootGenerationStatus,
    /// The decoded root credential. Present exactly when the round
    /// completed in one-time-pad mode.
    pub root_token: Option<SecretString>,
}

impl Client {
    /// Opens a root-generation session. One session tracks one round.
    #[must_use]
    pub fn generate_root(&self) -> RootGenerationSession<'_> {
        RootGenerationSession {
            client: self,
            round: RoundTracker::new(),
            otp: None,
        }
    }
}

/// Drives root-credential regeneration: master-key shares go in, and on
/// completion the service returns the new root credential protected by the
/// mode chosen at start. In one-time-pad mode the session decodes it; in
/// PGP mode the encrypted blob is passed through untouched.
#[derive(Debug)]
pub struct RootGenerationSession<'c> {
    client: &'c Client,
    round: RoundTracker,
    otp: Option<Zeroizing<String>>,
}

impl RootGenerationSession<'_> {
    /// Whether this process believes a round is active.
    #[must_use]
    pub const fn started(&self) -> bool {
        self.round.started()
    }

    /// Share count as of the last service response seen by this session.
    #[must_use]
    pub const fn progress(&self) -> u32 {
        self.round.progress()
    }

    /// Starts a generation round under the given protection mode.
    ///
    /// # Errors
    /// Fails locally, before any network call, with
    /// [`SealKitError::AlreadyInProgress`] when a round is active and with
    /// [`SealKitError::InvalidBase64`] when the pad is not base64;
    /// otherwise propagates service rejections.
    pub async fn start(
        &mut self,
        mode: RootGenerationMode,
    ) -> Result<RootGenerationStatus, SealKitError> {
        self.round.ensure_can_start()?;

        let body = match &mode {
            RootGenerationMode::Otp(otp) => {
                // A pad that cannot decode would only fail after the whole
                // ceremony ran; reject it before spending a round trip.
                Zeroizing::new(STANDARD.decode(otp).map_err(|source| {
                    SealKitError::InvalidBase64 {
                        what: "one-time pad",
                        source,
                    }
                })?);
                json!({ "otp": otp })
            }
            RootGenerationMode::PgpKey(key) => json!({ "pgp_key": key }),
        };

        let value = self
            .client
            .transport
            .put("sys/generate-root/attempt", Some(body))
            .await?
            .ok_or_else(|| {
                SealKitError::serialization("root generation start returned an empty body")
            })?;
        let status: RootGenerationStatus = transport::decode(value, "root generation status")?;

        if status.started && !status.nonce.is_empty() {
            self.round.begin(&status.nonce);
        }
        if let RootGenerationMode::Otp(otp) = mode {
            self.otp = Some(Zeroizing::new(otp));
        }
        debug!(nonce = %status.nonce, "root generation round started");
        Ok(status)
    }

    /// Refreshes this session's view of the round from the service.
    ///
    /// # Errors
    /// Returns an error on transport failure or an undecodable body.
    pub async fn status(&mut self) -> Result<RootGenerationStatus, SealKitError> {
        let status: RootGenerationStatus = transport::decode(
            self.client.transport.get("sys/generate-root/attempt").await?,
            "root generation status",
        )?;
        if status.started {
            self.round
                .observe(Some(&status.nonce), status.progress, status.complete);
        } else if !self.round.is_complete() {
            self.round.reset();
        }
        Ok(status)
    }

    /// Submits one master-key share.
    ///
    /// On the submission that completes the round, the encoded credential
    /// is decoded against the pad supplied at start (one-time-pad mode
    /// only) and returned alongside the raw status.
    ///
    /// # Errors
    /// Fails with [`SealKitError::NonceMismatch`] (locally when
    /// detectable) when `nonce` disagrees with the active round; with
    /// [`SealKitError::LengthMismatch`] when the pad and the encoded
    /// credential differ in decoded length (the round itself is unaffected
    /// and the raw credential rides along in the error for manual
    /// decoding); otherwise propagates service rejections.
    pub async fn submit_share(
        &mut self,
        share: &str,
        nonce: Option<&str>,
    ) -> Result<RootGenerationProgress, SealKitError> {
        self.round.ensure_nonce(nonce)?;

        let mut body = json!({ "key": share });
        if let Some(nonce) = nonce.or_else(|| self.round.nonce()) {
            body["nonce"] = Value::String(nonce.to_string());
        }
        let value = self
            .client
            .transport
            .put("sys/generate-root/update", Some(body))
            .await?
            .ok_or_else(|| {
                SealKitError::serialization("root generation update returned an empty body")
            })?;
        let status: RootGenerationStatus = transport::decode(value, "root generation progress")?;

        self.round
            .observe(Some(&status.nonce), status.progress, status.complete);

        let root_token = match (
            status.complete,
            status.encoded_root_token.as_deref(),
            self.otp.as_ref(),
        ) {
            (true, Some(encoded), Some(otp)) => {
                info!("root generation complete; decoding credential");
                Some(decode_root_token(encoded, otp)?)
            }
            _ => {
                debug!(
                    progress = status.progress,
                    required = status.required,
                    "root generation share submitted"
                );
                None
            }
        };
        Ok(RootGenerationProgress { status, root_token })
    }

    /// Cancels the round, server-side and local, discarding all progress.
    /// Safe to call when nothing is active.
    ///
    /// # Errors
    /// Returns an error on transport failure.
    pub async fn cancel(&mut self) -> Result<(), SealKitError> {
        self.client
            .transport
            .delete("sys/generate-root/attempt")
            .await?;
        self.round.reset();
        self.otp = None;
        debug!("root generation round canceled");
        Ok(())
    }

    /// Identical effect to [`RootGenerationSession::cancel`]; separate
    /// entry point for resets that are not operator-initiated aborts.
    ///
    /// # Errors
    /// Same failure modes as [`RootGenerationSession::cancel`].
    pub async fn reset(&mut self) -> Result<(), SealKitError> {
        self.cancel().await
    }
}

/// Decodes an XOR-protected root credential.
///
/// Both inputs are base64; their decoded bytes are XORed pairwise and the
/// 16-byte result is formatted as a canonical hyphenated UUID string. The
/// XOR works on the raw byte sequences directly, so the result is identical
/// on every platform regardless of byte order.
///
/// # Errors
/// Fails with [`SealKitError::InvalidBase64`] when either input does not
/// decode, and with [`SealKitError::LengthMismatch`], carrying the raw
/// encoded credential, when the decoded lengths differ. No partial
/// credential is ever produced.
pub fn decode_root_token(
    encoded_root_token: &str,
    otp: &str,
) -> Result<SecretString, SealKitError> {
    let pad = Zeroizing::new(STANDARD.decode(otp).map_err(|source| {
        SealKitError::InvalidBase64 {
            what: "one-time pad",
            source,
        }
    })?);
    let encoded = Zeroizing::new(STANDARD.decode(encoded_root_token).map_err(|source| {
        SealKitError::InvalidBase64 {
            what: "encoded root credential",
            source,
        }
    })?);

    if pad.len() != encoded.len() {
        return Err(SealKitError::LengthMismatch {
            otp_len: pad.len(),
            encoded_len: encoded.len(),
            encoded_root_token: encoded_root_token.to_string(),
        });
    }

    let plain = Zeroizing::new(
        pad.iter()
            .zip(encoded.iter())
            .map(|(p, e)| p ^ e)
            .collect::<Vec<u8>>(),
    );
    let mut bytes: [u8; 16] = plain.as_slice().try_into().map_err(|_| {
        SealKitError::serialization(format!(
            "decoded credential is {} bytes, expected 16",
            plain.len()
        ))
    })?;
    let credential = Uuid::from_bytes(bytes).hyphenated().to_string();
    bytes.zeroize();
    Ok(SecretString::from(credential))
}
