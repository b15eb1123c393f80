//! The error taxonomy surfaced at `SessionBuilder`'s entry points.

use thiserror::Error;

use axo_crypto::CryptoError;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum BuilderError {
    /// Presented identity disagrees with the pinned identity for this name.
    #[error("untrusted identity for {0}")]
    UntrustedIdentity(String),

    /// Signature verification failed, both pre-keys are absent from a
    /// bundle, or a base-key signature mismatches post-initialization.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A pre-key or signed-pre-key store lookup missed, or a message
    /// referenced a pre-key slot it was required to carry.
    #[error("invalid key id: {0}")]
    InvalidKeyId(String),

    /// An inbound message carries an unsupported protocol version.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// `process_key_exchange` saw no matching pending exchange and the
    /// response was not a simultaneous-initiate collision.
    #[error("stale key exchange")]
    StaleKeyExchange,

    /// Reserved for upstream replay detection; the builder never constructs
    /// this — duplicate first-messages are reported as `Ok(None)` instead.
    #[error("duplicate message")]
    DuplicateMessage,

    /// Reserved for the decrypt path; the builder never constructs this.
    #[error("no session")]
    NoSession,

    /// A store backend failure unrelated to a missing key id.
    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl BuilderError {
    /// `StoreError::InvalidKeyId` becomes `BuilderError::InvalidKeyId`
    /// rather than a generic backend error, so callers can pattern-match
    /// directly without unwrapping a nested store error.
    pub(crate) fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKeyId(id) => {
                BuilderError::InvalidKeyId(format!("no record for key id {id}"))
            }
            other => BuilderError::Store(other),
        }
    }
}
