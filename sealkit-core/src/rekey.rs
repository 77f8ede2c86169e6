//! Master-key rekey ceremony and encryption-key rotation.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::ceremony::RoundTracker;
use crate::client::Client;
use crate::error::SealKitError;
use crate::response::{KeyStatus, RekeyResult, RekeyStatus, RekeyUpdate, Secret};
use crate::transport;

/// Parameters for a new rekey round.
#[derive(Debug, Clone)]
pub struct RekeyParams {
    /// Number of shares to split the new master key into.
    pub secret_shares: u32,
    /// Shares required to reconstruct the new master key.
    pub secret_threshold: u32,
    /// Whether the service should retain an encrypted backup of the new
    /// shares, retrievable via [`RekeySession::read_backup`].
    pub backup: bool,
}

impl Default for RekeyParams {
    fn default() -> Self {
        Self {
            secret_shares: 5,
            secret_threshold: 3,
            backup: false,
        }
    }
}

impl Client {
    /// Opens a rekey session. One session tracks one round; the new shares
    /// it produces are handed over exactly once via
    /// [`RekeySession::take_result`].
    #[must_use]
    pub fn rekey(&self) -> RekeySession<'_> {
        RekeySession {
            client: self,
            round: RoundTracker::new(),
            result: None,
        }
    }

    /// Rotates the backend encryption key. A single sudo call, not a
    /// ceremony; no shares are involved.
    ///
    /// # Errors
    /// Returns [`SealKitError::Forbidden`] when the token lacks the
    /// capability, or a transport failure.
    pub async fn rotate(&self) -> Result<(), SealKitError> {
        self.transport.put("sys/rotate", None).await.map(|_| ())
    }

    /// Reads the rotation term of the active encryption key.
    ///
    /// # Errors
    /// Returns an error on transport failure or an undecodable body.
    pub async fn key_status(&self) -> Result<KeyStatus, SealKitError> {
        transport::decode(self.transport.get("sys/key-status").await?, "key status")
    }
}

/// Drives master-key rotation: current-key shares go in, a brand-new share
/// set comes out.
///
/// The completed result is cached here and surrendered exactly once;
/// persisting the new shares is the caller's job; the service does not
/// retain them (outside an explicitly requested backup), and this session
/// refuses to start another round while a result sits unclaimed.
#[derive(Debug)]
pub struct RekeySession<'c> {
    client: &'c Client,
    round: RoundTracker,
    result: Option<RekeyResult>,
}

impl RekeySession<'_> {
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

    /// Whether a completed result is waiting to be taken.
    #[must_use]
    pub const fn has_unclaimed_result(&self) -> bool {
        self.result.is_some()
    }

    /// Starts a rekey round.
    ///
    /// # Errors
    /// Fails locally, before any network call, with
    /// [`SealKitError::AlreadyInProgress`] when a round is active, and with
    /// [`SealKitError::UnclaimedResult`] when a completed round's shares
    /// were never taken; otherwise propagates service rejections.
    pub async fn start(&mut self, params: &RekeyParams) -> Result<RekeyStatus, SealKitError> {
        if self.result.is_some() {
            return Err(SealKitError::UnclaimedResult);
        }
        self.round.ensure_can_start()?;

        let body = json!({
            "secret_shares": params.secret_shares,
            "secret_threshold": params.secret_threshold,
            "backup": params.backup,
        });
        let value = self
            .client
            .transport
            .put("sys/rekey/init", Some(body))
            .await?
            .ok_or_else(|| SealKitError::serialization("rekey start returned an empty body"))?;
        let status: RekeyStatus = transport::decode(value, "rekey status")?;

        if status.started && !status.nonce.is_empty() {
            self.round.begin(&status.nonce);
        }
        debug!(
            nonce = %status.nonce,
            shares = params.secret_shares,
            threshold = params.secret_threshold,
            backup = params.backup,
            "rekey round started"
        );
        Ok(status)
    }

    /// Refreshes this session's view of the round from the service,
    /// including rounds started by another operator.
    ///
    /// # Errors
    /// Returns an error on transport failure or an undecodable body.
    pub async fn status(&mut self) -> Result<RekeyStatus, SealKitError> {
        let status: RekeyStatus = transport::decode(
            self.client.transport.get("sys/rekey/init").await?,
            "rekey status",
        )?;
        if status.started {
            self.round
                .observe(Some(&status.nonce), status.progress, false);
        } else if !self.round.is_complete() {
            self.round.reset();
        }
        Ok(status)
    }

    /// Submits one share of the *current* master key.
    ///
    /// When the submission completes the round, the new shares are cached
    /// for [`RekeySession::take_result`] in addition to being returned.
    ///
    /// # Errors
    /// Fails with [`SealKitError::NonceMismatch`] (locally when
    /// detectable) when `nonce` disagrees with the active round; otherwise
    /// propagates service rejections and transport failures.
    pub async fn submit_share(
        &mut self,
        share: &str,
        nonce: Option<&str>,
    ) -> Result<RekeyUpdate, SealKitError> {
        self.round.ensure_nonce(nonce)?;

        let mut body = json!({ "key": share });
        if let Some(nonce) = nonce.or_else(|| self.round.nonce()) {
            body["nonce"] = Value::String(nonce.to_string());
        }
        let value = self
            .client
            .transport
            .put("sys/rekey/update", Some(body))
            .await?
            .ok_or_else(|| SealKitError::serialization("rekey update returned an empty body"))?;
        let update: RekeyUpdate = transport::decode(value, "rekey progress")?;

        self.round
            .observe(Some(&update.nonce), update.progress, update.complete);

        if update.complete {
            let keys = update.keys.clone().ok_or_else(|| {
                SealKitError::serialization("rekey completed without returning the new shares")
            })?;
            self.result = Some(RekeyResult {
                keys,
                keys_base64: update.keys_base64.clone().unwrap_or_default(),
                backup: update.backup,
                pgp_fingerprints: update.pgp_fingerprints.clone().unwrap_or_default(),
                verification_nonce: update.verification_nonce.clone(),
            });
            info!("rekey complete; new shares are cached until taken");
        } else {
            debug!(
                progress = update.progress,
                required = update.required,
                "rekey share submitted"
            );
        }
        Ok(update)
    }

    /// Surrenders the completed round's new shares, exactly once. After
    /// this the session is idle and a fresh round may start.
    #[must_use = "the new shares are handed over exactly once; losing them makes the new master key unrecoverable"]
    pub fn take_result(&mut self) -> Option<RekeyResult> {
        let result = self.result.take();
        if result.is_some() {
            self.round.reset();
        }
        result
    }

    /// Cancels the round, server-side and local, discarding all progress.
    /// Safe to call when nothing is active.
    ///
    /// An unclaimed result is dropped here, explicitly and with a warning,
    /// which is the only way it is ever discarded.
    ///
    /// # Errors
    /// Returns an error on transport failure.
    pub async fn cancel(&mut self) -> Result<(), SealKitError> {
        self.client.transport.delete("sys/rekey/init").await?;
        if self.result.take().is_some() {
            warn!("rekey canceled with an unclaimed result; the new shares are unrecoverable");
        }
        self.round.reset();
        debug!("rekey round canceled");
        Ok(())
    }

    /// Identical effect to [`RekeySession::cancel`]; separate entry point
    /// for resets that are not operator-initiated aborts.
    ///
    /// # Errors
    /// Same failure modes as [`RekeySession::cancel`].
    pub async fn reset(&mut self) -> Result<(), SealKitError> {
        self.cancel().await
    }

    /// Retrieves the encrypted backup of the new shares, when the round was
    /// started with `backup`.
    ///
    /// # Errors
    /// Returns an error on transport failure or an undecodable body.
    pub async fn read_backup(&self) -> Result<Secret, SealKitError> {
        transport::decode(
            self.client.transport.get("sys/rekey/backup").await?,
            "rekey backup",
        )
    }
}

impl Drop for RekeySession<'_> {
    fn drop(&mut self) {
        if self.result.is_some() {
            warn!("rekey session dropped with an unclaimed result; the new shares are unrecoverable");
        }
    }
}
