//! The interactive key-exchange frame and its flag bits.

use serde::{Deserialize, Serialize};
use x25519_dalek::PublicKey as X25519Public;

use axo_crypto::keys::IdentityKey;

use crate::pub_key_serde;

/// Wire contract with the peer — chosen once, kept stable.
pub const INITIATE: u8 = 0x01;
pub const RESPONSE: u8 = 0x02;
pub const SIMULTANEOUS_INITIATE: u8 = 0x04;

/// Bitset over `INITIATE` / `RESPONSE` / `SIMULTANEOUS_INITIATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyExchangeFlags(pub u8);

impl KeyExchangeFlags {
    pub fn initiate() -> Self {
        Self(INITIATE)
    }

    pub fn response() -> Self {
        Self(RESPONSE)
    }

    pub fn is_initiate(&self) -> bool {
        self.0 & INITIATE != 0
    }

    pub fn is_response(&self) -> bool {
        self.0 & RESPONSE != 0
    }

    pub fn is_simultaneous_initiate(&self) -> bool {
        self.0 & SIMULTANEOUS_INITIATE != 0
    }

    #[must_use]
    pub fn with_simultaneous_initiate(self) -> Self {
        Self(self.0 | SIMULTANEOUS_INITIATE)
    }
}

/// `(version, max-version, sequence, flags, base-key, base-key-signature,
/// ratchet-key, identity-key)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyExchangeMessage {
    pub version: u8,
    pub max_version: u8,
    pub sequence: u16,
    pub flags: KeyExchangeFlags,
    #[serde(with = "pub_key_serde")]
    pub base_key: X25519Public,
    pub base_key_signature: Vec<u8>,
    #[serde(with = "pub_key_serde")]
    pub ratchet_key: X25519Public,
    pub identity_key: IdentityKey,
}
