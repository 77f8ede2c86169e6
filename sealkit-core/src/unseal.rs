//! The distributed unseal ceremony.

use serde_json::json;
use tracing::debug;

use crate::ceremony::RoundTracker;
use crate::client::Client;
use crate::error::SealKitError;
use crate::response::SealStatus;
use crate::transport;

impl Client {
    /// Opens an unseal session. The session tracks one round of the
    /// ceremony; drop it (or [`UnsealSession::reset`] it) and open another
    /// to run a fresh round.
    #[must_use]
    pub fn unseal(&self) -> UnsealSession<'_> {
        UnsealSession {
            client: self,
            round: RoundTracker::new(),
        }
    }

    /// Reads the seal state without touching any session bookkeeping.
    ///
    /// # Errors
    /// Returns an error on transport failure or an undecodable body.
    pub async fn seal_status(&self) -> Result<SealStatus, SealKitError> {
        transport::decode(self.transport.get("sys/seal-status").await?, "seal status")
    }

    /// Seals the service. Requires a token with sudo capability; undoing
    /// this takes a full unseal ceremony.
    ///
    /// # Errors
    /// Returns [`SealKitError::Forbidden`] when the token lacks the
    /// capability, or a transport failure.
    pub async fn seal(&self) -> Result<(), SealKitError> {
        self.transport.put("sys/seal", None).await.map(|_| ())
    }
}

/// Drives the unseal ceremony: operators feed master-key shares one at a
/// time until the service-reported threshold is reached and the service
/// flips itself unsealed. No local decoding happens; completion is the
/// service's own state transition.
#[derive(Debug)]
pub struct UnsealSession<'c> {
    client: &'c Client,
    round: RoundTracker,
}

impl UnsealSession<'_> {
    /// Whether this process believes a round is active. Refresh with
    /// [`UnsealSession::status`]: another operator may have advanced or
    /// reset the round since.
    #[must_use]
    pub const fn started(&self) -> bool {
        self.round.started()
    }

    /// Share count as of the last service response seen by this session.
    #[must_use]
    pub const fn progress(&self) -> u32 {
        self.round.progress()
    }

    /// Refreshes this session's view of the round from the service.
    ///
    /// # Errors
    /// Returns an error on transport failure or an undecodable body.
    pub async fn status(&mut self) -> Result<SealStatus, SealKitError> {
        let status: SealStatus = transport::decode(
            self.client.transport.get("sys/seal-status").await?,
            "seal status",
        )?;
        self.sync(&status);
        Ok(status)
    }

    /// Submits one master-key share.
    ///
    /// The first submission of a round adopts the service-assigned nonce,
    /// so a round started by another operator can be joined mid-way.
    ///
    /// # Errors
    /// Fails with [`SealKitError::NonceMismatch`], locally and before any
    /// network call, when `nonce` disagrees with the active round;
    /// otherwise propagates service rejections and transport failures.
    pub async fn submit_share(
        &mut self,
        share: &str,
        nonce: Option<&str>,
    ) -> Result<SealStatus, SealKitError> {
        self.round.ensure_nonce(nonce)?;

        let value = self
            .client
            .transport
            .put("sys/unseal", Some(json!({ "key": share })))
            .await?
            .ok_or_else(|| SealKitError::serialization("unseal returned an empty body"))?;
        let status: SealStatus = transport::decode(value, "unseal progress")?;
        self.sync(&status);

        debug!(
            progress = status.progress,
            threshold = status.threshold,
            sealed = status.sealed,
            "unseal share submitted"
        );
        Ok(status)
    }

    /// Feeds shares in order until the service unseals or the shares run
    /// out, which is equivalent to submitting each one individually.
    ///
    /// # Errors
    /// Stops at the first failing submission and propagates it.
    pub async fn submit_shares<I, S>(&mut self, shares: I) -> Result<SealStatus, SealKitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut last = None;
        for share in shares {
            let status = self.submit_share(share.as_ref(), None).await?;
            let unsealed = !status.sealed;
            last = Some(status);
            if unsealed {
                break;
            }
        }
        match last {
            Some(status) => Ok(status),
            None => self.status().await,
        }
    }

    /// Discards all accumulated progress, server-side and local. The next
    /// submission starts a fresh round under a new nonce; submissions
    /// carrying the old nonce are rejected.
    ///
    /// # Errors
    /// Returns an error on transport failure or an undecodable body.
    pub async fn reset(&mut self) -> Result<SealStatus, SealKitError> {
        let value = self
            .client
            .transport
            .put("sys/unseal", Some(json!({ "reset": true })))
            .await?
            .ok_or_else(|| SealKitError::serialization("unseal reset returned an empty body"))?;
        let status: SealStatus = transport::decode(value, "unseal progress")?;
        self.round.reset();
        debug!("unseal round reset");
        Ok(status)
    }

    /// Aborts the round instead of completing it. Identical effect to
    /// [`UnsealSession::reset`]; separate entry point for operator intent.
    ///
    /// # Errors
    /// Same failure modes as [`UnsealSession::reset`].
    pub async fn cancel(&mut self) -> Result<SealStatus, SealKitError> {
        self.reset().await
    }

    fn sync(&mut self, status: &SealStatus) {
        if !status.sealed {
            // Unsealed: the ceremony this round belonged to is over.
            self.round.observe(None, status.progress, true);
        } else if status.progress == 0 {
            self.round.reset();
        } else {
            self.round
                .observe(status.nonce.as_deref(), status.progress, false);
        }
    }
}
