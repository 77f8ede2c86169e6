//! Error taxonomy for ceremony and wrapping operations.

use thiserror::Error;

/// Errors surfaced by ceremony sessions, response unwrapping, and the
/// underlying transport.
///
/// Service-reported failures are never swallowed: they either map onto one
/// of the typed kinds below or pass through as [`SealKitError::Api`] with
/// the raw status and messages. No operation is retried automatically:
/// ceremonies are stateful and a blind retry risks double-counting a share.
#[derive(Debug, Error)]
pub enum SealKitError {
    /// A share was submitted under a nonce that does not bind to the active
    /// ceremony round. Detected locally when possible, otherwise mapped from
    /// the service's rejection.
    #[error("nonce mismatch: {detail}")]
    NonceMismatch {
        /// What disagreed, e.g. the expected and submitted nonces.
        detail: String,
    },

    /// `start` was called while a ceremony round is already active.
    #[error("ceremony already in progress (nonce {nonce})")]
    AlreadyInProgress {
        /// Nonce of the round that is still running.
        nonce: String,
    },

    /// A completed rekey produced shares that were never claimed. Take the
    /// result or cancel the round before starting a new one.
    #[error("a completed rekey round holds an unclaimed result; take it or cancel before starting a new round")]
    UnclaimedResult,

    /// The one-time pad and the encoded credential decode to different byte
    /// lengths, so the XOR decode cannot proceed. The raw encoded credential
    /// is preserved for manual decoding.
    #[error("one-time pad decodes to {otp_len} bytes but the encoded credential to {encoded_len}")]
    LengthMismatch {
        /// Decoded length of the operator-supplied pad.
        otp_len: usize,
        /// Decoded length of the service-returned credential.
        encoded_len: usize,
        /// The untouched base64 credential, exactly as the service sent it.
        encoded_root_token: String,
    },

    /// An operator-supplied value that must be base64 was not.
    #[error("invalid base64 in {what}")]
    InvalidBase64 {
        /// Which input failed to decode.
        what: &'static str,
        /// Decoder failure.
        #[source]
        source: base64::DecodeError,
    },

    /// The service rejected the request (HTTP 400), including an envelope
    /// that was already unwrapped.
    #[error("invalid request: {}", .errors.join("; "))]
    InvalidRequest {
        /// Service-reported messages.
        errors: Vec<String>,
    },

    /// The credential lacks permission, or an envelope was revoked through
    /// its accessor before being read (HTTP 403).
    #[error("forbidden: {}", .errors.join("; "))]
    Forbidden {
        /// Service-reported messages.
        errors: Vec<String>,
    },

    /// Any other service-reported status, passed through raw.
    #[error("service error (status {status}): {}", .errors.join("; "))]
    Api {
        /// HTTP status code.
        status: u16,
        /// Service-reported messages, or the raw body when unparseable.
        errors: Vec<String>,
    },

    /// Network or TLS failure below the HTTP layer. Always propagated,
    /// never retried.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response body could not be decoded into the expected shape.
    #[error("unexpected response body: {context}")]
    Serialization {
        /// What was being decoded and why it failed.
        context: String,
    },
}

impl SealKitError {
    /// Creates a locally-detected nonce mismatch.
    pub(crate) fn nonce_mismatch(expected: &str, submitted: &str) -> Self {
        Self::NonceMismatch {
            detail: format!("active round is {expected}, submission carried {submitted}"),
        }
    }

    /// Creates a serialization error with context.
    pub(crate) fn serialization(context: impl Into<String>) -> Self {
        Self::Serialization {
            context: context.into(),
        }
    }

    /// Maps a non-success HTTP status and its service messages onto the
    /// taxonomy. A 400 whose message names the round nonce is a
    /// [`SealKitError::NonceMismatch`]; other 400s are invalid requests
    /// (covering consumed envelopes); 403 is forbidden; everything else
    /// passes through with its raw status.
    pub(crate) fn from_status(status: u16, errors: Vec<String>) -> Self {
        match status {
            400 if errors.iter().any(|e| e.contains("nonce")) => Self::NonceMismatch {
                detail: errors.join("; "),
            },
            400 => Self::InvalidRequest { errors },
            403 => Self::Forbidden { errors },
            _ => Self::Api { status, errors },
        }
    }
}
