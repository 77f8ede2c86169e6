//! The explicit session context every operation hangs off.

use secrecy::SecretString;

use crate::transport::Transport;

/// Handle to the service for one operator process.
///
/// The client is an explicit context object: the ambient credential lives
/// here and changes only through [`Client::set_token`]; no operation
/// replaces it as a side effect. Ceremony sessions borrow the client, so
/// the borrow checker keeps a credential swap from racing a round in
/// progress.
///
/// The client holds no interior synchronization. Ceremony state mutation is
/// a read-modify-write over the network, so a multi-threaded embedder must
/// serialize access to one client externally.
#[derive(Debug)]
pub struct Client {
    pub(crate) transport: Transport,
}

impl Client {
    /// Creates a client for the service at `address`, authenticating every
    /// request with `token`.
    #[must_use]
    pub fn new(address: &str, token: impl Into<String>) -> Self {
        Self {
            transport: Transport::new(address, SecretString::from(token.into())),
        }
    }

    /// Replaces the ambient credential.
    ///
    /// This is the only place the active token changes. Operations that
    /// yield a replacement credential (unwrapping a newly issued token,
    /// completing a root generation) return it to the caller, who decides
    /// whether to install it here.
    pub fn set_token(&mut self, token: SecretString) {
        self.transport.set_token(token);
    }
}
