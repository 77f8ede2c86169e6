//! Client-side engine for the operator ceremonies of a secrets-management
//! service.
//!
//! The hard part of talking to such a service is not the request/response
//! plumbing; it is the short-lived, multi-round state machines behind
//! distributed unsealing, master-key rekeying, and root-credential
//! regeneration: shares accumulate across independent calls, every
//! submission must bind to the active round's nonce, and final results need
//! client-side assembly (including the bytewise XOR decode of a
//! one-time-pad-protected credential). This crate implements exactly those
//! flows, plus the single-use response-wrapping envelopes used to transport
//! any sensitive payload.
//!
//! Everything hangs off an explicit [`Client`] context; ceremony sessions
//! borrow it for the duration of a round:
//!
//! ```no_run
//! use sealkit_core::{Client, SealKitError};
//!
//! # async fn demo() -> Result<(), SealKitError> {
//! let client = Client::new("https://127.0.0.1:8200", "s.root");
//!
//! let mut unseal = client.unseal();
//! let status = unseal.submit_share("share-one", None).await?;
//! if !status.sealed {
//!     println!("service unsealed after {} shares", status.progress);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Every operation is a single network round trip and nothing is ever
//! retried automatically: ceremonies are stateful, and retry policy
//! belongs to the caller, who knows the round's semantics.

mod ceremony;
mod client;
mod error;
mod generate_root;
mod rekey;
mod response;
mod transport;
mod unseal;
mod wrapping;

pub use client::Client;
pub use error::SealKitError;
pub use generate_root::{
    decode_root_token, RootGenerationMode, RootGenerationProgress, RootGenerationSession,
};
pub use rekey::{RekeyParams, RekeySession};
pub use response::{
    Auth, KeyStatus, RekeyResult, RekeyStatus, RekeyUpdate, RootGenerationStatus, SealStatus,
    Secret, WrapInfo,
};
pub use unseal::UnsealSession;

// Re-exported so callers can hold and install credentials without naming
// the secrecy crate themselves.
pub use secrecy::{ExposeSecret, SecretString};
