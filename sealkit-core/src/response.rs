//! Typed response bodies for the ceremony and wrapping endpoints.
//!
//! The service reports loosely-typed JSON; the shapes here pin down every
//! field the ceremony logic branches on. Fields a response legitimately
//! omits default; fields the protocol guarantees are required, so a
//! malformed body fails decoding instead of limping along.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Seal state of the service, returned by the status endpoint and by every
/// unseal share submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealStatus {
    /// Whether the service is currently sealed.
    pub sealed: bool,
    /// Number of shares required to unseal.
    #[serde(rename = "t")]
    pub threshold: u32,
    /// Total number of shares the master key was split into.
    #[serde(rename = "n")]
    pub shares: u32,
    /// Valid shares accumulated in the active round.
    pub progress: u32,
    /// Nonce of the active unseal round, when one is running.
    #[serde(default)]
    pub nonce: Option<String>,
    /// Service version string, when reported.
    #[serde(default)]
    pub version: Option<String>,
}

/// State of the rekey ceremony, from the init/status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RekeyStatus {
    /// Whether a rekey round is active.
    #[serde(default)]
    pub started: bool,
    /// Nonce binding submissions to the active round.
    #[serde(default)]
    pub nonce: String,
    /// Threshold the *new* master key will require.
    #[serde(rename = "t", default)]
    pub threshold: u32,
    /// Number of shares the new master key will be split into.
    #[serde(rename = "n", default)]
    pub shares: u32,
    /// Valid shares of the *current* key accumulated so far.
    #[serde(default)]
    pub progress: u32,
    /// Current-key shares required to complete the round.
    #[serde(default)]
    pub required: u32,
    /// Whether the service will retain an encrypted backup of the new shares.
    #[serde(default)]
    pub backup: bool,
    /// Whether the new shares must be verified before the key is rotated.
    #[serde(default)]
    pub verification_required: bool,
}

/// Outcome of one rekey share submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RekeyUpdate {
    /// Nonce of the round the submission was counted against.
    #[serde(default)]
    pub nonce: String,
    /// Whether the round reached its threshold with this submission.
    #[serde(default)]
    pub complete: bool,
    /// Valid shares accumulated so far.
    #[serde(default)]
    pub progress: u32,
    /// Shares required to complete the round.
    #[serde(default)]
    pub required: u32,
    /// Threshold the new master key will require.
    #[serde(rename = "t", default)]
    pub threshold: u32,
    /// The newly generated shares; present only when `complete`.
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    /// The new shares, base64-encoded; present only when `complete`.
    #[serde(default)]
    pub keys_base64: Option<Vec<String>>,
    /// Whether an encrypted backup of the new shares was retained.
    #[serde(default)]
    pub backup: bool,
    /// Fingerprints of the PGP keys the new shares were encrypted to.
    #[serde(default)]
    pub pgp_fingerprints: Option<Vec<String>>,
    /// Nonce for the verification round, when verification is required.
    #[serde(default)]
    pub verification_nonce: Option<String>,
}

/// The one-shot product of a completed rekey: the new shares and the
/// verification value that vouches for them.
///
/// The service does not retain these (outside an explicitly requested
/// backup) and this crate hands them over exactly once; persisting them is
/// the caller's job, and losing them makes the new master key unrecoverable.
#[derive(Debug, Clone, Serialize)]
pub struct RekeyResult {
    /// The newly generated shares, in service order.
    pub keys: Vec<String>,
    /// The same shares, base64-encoded, when the service provides them.
    pub keys_base64: Vec<String>,
    /// Whether an encrypted backup was retained service-side.
    pub backup: bool,
    /// Fingerprints of the PGP keys the shares were encrypted to.
    pub pgp_fingerprints: Vec<String>,
    /// Verification value for the new shares, when verification is required.
    pub verification_nonce: Option<String>,
}

/// State of the root-credential generation ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootGenerationStatus {
    /// Whether a generation round is active.
    #[serde(default)]
    pub started: bool,
    /// Nonce binding submissions to the active round.
    #[serde(default)]
    pub nonce: String,
    /// Valid shares accumulated so far.
    #[serde(default)]
    pub progress: u32,
    /// Shares required to complete the round.
    #[serde(default)]
    pub required: u32,
    /// Whether the round reached its threshold.
    #[serde(default)]
    pub complete: bool,
    /// The XOR- or PGP-protected credential; present only when `complete`.
    #[serde(default)]
    pub encoded_root_token: Option<String>,
    /// Expected decoded length of the one-time pad, when reported.
    #[serde(default)]
    pub otp_length: Option<u32>,
    /// Fingerprint of the PGP key protecting the credential, in PGP mode.
    #[serde(default)]
    pub pgp_fingerprint: Option<String>,
}

/// The `wrap_info` block delivered in place of a payload when a response is
/// wrapped into a single-use envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapInfo {
    /// Single-use bearer credential that unwraps the envelope.
    pub token: String,
    /// Seconds until the envelope expires if never unwrapped.
    pub ttl: u64,
    /// When the envelope was created.
    #[serde(default)]
    pub creation_time: Option<String>,
    /// The operation whose response was wrapped.
    #[serde(default)]
    pub creation_path: Option<String>,
    /// Accessor usable to revoke the envelope without consuming it.
    #[serde(default)]
    pub wrapped_accessor: Option<String>,
}

/// Credential block of a response that grants a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    /// The granted token.
    pub client_token: String,
    /// Non-secret accessor referencing the token.
    #[serde(default)]
    pub accessor: Option<String>,
    /// Policies attached to the token.
    #[serde(default)]
    pub policies: Vec<String>,
    /// Lease duration in seconds.
    #[serde(default)]
    pub lease_duration: u64,
    /// Whether the lease is renewable.
    #[serde(default)]
    pub renewable: bool,
}

/// Generic response envelope for operations that return structured data,
/// a credential, or a wrapped indirection to either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    /// Identifier of the request that produced this response.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Lease identifier, when the data is leased.
    #[serde(default)]
    pub lease_id: Option<String>,
    /// Lease duration in seconds.
    #[serde(default)]
    pub lease_duration: u64,
    /// Whether the lease is renewable.
    #[serde(default)]
    pub renewable: bool,
    /// Operation-specific payload.
    #[serde(default)]
    pub data: Option<Value>,
    /// Present instead of the payload when the response is wrapped.
    #[serde(default)]
    pub wrap_info: Option<WrapInfo>,
    /// Non-fatal warnings attached by the service.
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    /// Present when the response grants a credential.
    #[serde(default)]
    pub auth: Option<Auth>,
}

/// Status of the backend encryption key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStatus {
    /// Rotation term of the active encryption key.
    pub term: u32,
    /// When the active key was installed.
    #[serde(default)]
    pub install_time: Option<String>,
}
