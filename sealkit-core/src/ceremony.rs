//! Local round tracking shared by the ceremony sessions.
//!
//! A threshold ceremony is a short-lived, multi-round exchange: the service
//! assigns a nonce when a round starts, every submission must bind to that
//! nonce, and the share count reported back by the service is authoritative.
//! The tracker holds this process's view of the round: it never counts
//! shares itself and it never talks to the network.

use crate::error::SealKitError;

/// Lifecycle of one ceremony round as seen by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundState {
    /// No round is known to be active.
    Idle,
    /// A round is active under the given service-assigned nonce.
    Started {
        /// Nonce binding submissions to the round.
        nonce: String,
    },
    /// The round reached its threshold. Terminal: a fresh start is required
    /// to run another round.
    Complete,
}

/// Client-side bookkeeping for a threshold ceremony round.
#[derive(Debug)]
pub struct RoundTracker {
    state: RoundState,
    progress: u32,
}

impl Default for RoundTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundTracker {
    pub const fn new() -> Self {
        Self {
            state: RoundState::Idle,
            progress: 0,
        }
    }

    pub const fn started(&self) -> bool {
        matches!(self.state, RoundState::Started { .. })
    }

    pub const fn is_complete(&self) -> bool {
        matches!(self.state, RoundState::Complete)
    }

    pub const fn progress(&self) -> u32 {
        self.progress
    }

    pub fn nonce(&self) -> Option<&str> {
        match &self.state {
            RoundState::Started { nonce } => Some(nonce),
            RoundState::Idle | RoundState::Complete => None,
        }
    }

    /// Fails with [`SealKitError::AlreadyInProgress`] if a round is active.
    /// Called before the start request goes out, so a doomed start never
    /// spends a network round trip.
    pub fn ensure_can_start(&self) -> Result<(), SealKitError> {
        if let RoundState::Started { nonce } = &self.state {
            return Err(SealKitError::AlreadyInProgress {
                nonce: nonce.clone(),
            });
        }
        Ok(())
    }

    /// Enters the round the service just opened.
    pub fn begin(&mut self, nonce: &str) {
        self.state = RoundState::Started {
            nonce: nonce.to_string(),
        };
        self.progress = 0;
    }

    /// Rejects a submission whose explicit nonce disagrees with the active
    /// round, before any network call. A submission without a nonce, or one
    /// made while no round is locally known, passes; the service binds it
    /// and [`RoundTracker::observe`] adopts the result.
    pub fn ensure_nonce(&self, submitted: Option<&str>) -> Result<(), SealKitError> {
        if let (RoundState::Started { nonce }, Some(submitted)) = (&self.state, submitted) {
            if nonce != submitted {
                return Err(SealKitError::nonce_mismatch(nonce, submitted));
            }
        }
        Ok(())
    }

    /// Merges the service's authoritative view of the round: the reported
    /// progress replaces the local count, a reported nonce is adopted
    /// (covering rounds started out-of-band), and reported completion moves
    /// the tracker to its terminal state.
    pub fn observe(&mut self, nonce: Option<&str>, progress: u32, complete: bool) {
        self.progress = progress;
        if complete {
            self.state = RoundState::Complete;
        } else if let Some(nonce) = nonce.filter(|n| !n.is_empty()) {
            self.state = RoundState::Started {
                nonce: nonce.to_string(),
            };
        }
    }

    /// Clears the round and all accumulated progress. Safe to call when
    /// nothing is active.
    pub fn reset(&mut self) {
        self.state = RoundState::Idle;
        self.progress = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_tracker_is_idle() {
        let tracker = RoundTracker::new();
        assert!(!tracker.started());
        assert!(!tracker.is_complete());
        assert_eq!(tracker.progress(), 0);
        assert!(tracker.nonce().is_none());
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let mut tracker = RoundTracker::new();
        tracker.ensure_can_start().unwrap();
        tracker.begin("round-1");

        let err = tracker.ensure_can_start().unwrap_err();
        assert!(matches!(
            err,
            SealKitError::AlreadyInProgress { nonce } if nonce == "round-1"
        ));
    }

    #[test]
    fn test_mismatched_nonce_fails_before_network() {
        let mut tracker = RoundTracker::new();
        tracker.begin("round-1");

        tracker.ensure_nonce(Some("round-1")).unwrap();
        tracker.ensure_nonce(None).unwrap();

        let err = tracker.ensure_nonce(Some("round-0")).unwrap_err();
        assert!(matches!(err, SealKitError::NonceMismatch { .. }));
    }

    #[test]
    fn test_first_submission_adopts_service_nonce() {
        let mut tracker = RoundTracker::new();
        // Round was started out-of-band; any nonce passes locally.
        tracker.ensure_nonce(Some("round-7")).unwrap();

        tracker.observe(Some("round-7"), 1, false);
        assert!(tracker.started());
        assert_eq!(tracker.nonce(), Some("round-7"));
        assert_eq!(tracker.progress(), 1);
    }

    #[test]
    fn test_progress_is_service_authoritative() {
        let mut tracker = RoundTracker::new();
        tracker.begin("round-1");
        tracker.observe(Some("round-1"), 2, false);
        // A duplicate share is rejected service-side: progress stays put.
        tracker.observe(Some("round-1"), 2, false);
        assert_eq!(tracker.progress(), 2);
    }

    #[test]
    fn test_completion_is_terminal_until_fresh_start() {
        let mut tracker = RoundTracker::new();
        tracker.begin("round-1");
        tracker.observe(Some("round-1"), 3, true);
        assert!(tracker.is_complete());
        assert!(!tracker.started());

        // A fresh start is allowed from the terminal state.
        tracker.ensure_can_start().unwrap();
        tracker.begin("round-2");
        assert_eq!(tracker.nonce(), Some("round-2"));
        assert_eq!(tracker.progress(), 0);
    }

    #[test]
    fn test_reset_discards_round_and_progress() {
        let mut tracker = RoundTracker::new();
        tracker.begin("round-1");
        tracker.observe(Some("round-1"), 2, false);

        tracker.reset();
        assert!(!tracker.started());
        assert_eq!(tracker.progress(), 0);

        // Resetting with nothing active is a no-op, not an error.
        tracker.reset();
        assert!(!tracker.started());
    }

    #[test]
    fn test_observe_ignores_empty_nonce() {
        let mut tracker = RoundTracker::new();
        tracker.observe(Some(""), 0, false);
        assert!(!tracker.started());
    }
}
