//! The pre-key bundle: a directory-published advertisement of a user's
//! long-term and ephemeral keys, consumed by `SessionBuilder::process_bundle`.

use serde::{Deserialize, Serialize};
use x25519_dalek::PublicKey as X25519Public;

use axo_crypto::keys::IdentityKey;

use crate::pub_key_serde;

/// Inbound value object pulled from a pre-key directory. Either the signed
/// pre-key or the one-time pre-key must be present — a bundle with neither
/// is rejected by the builder, never by this type itself (construction
/// stays infallible; validation is the builder's job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreKeyBundle {
    pub registration_id: u32,
    pub device_id: u32,

    pub pre_key_id: Option<u32>,
    #[serde(with = "pub_key_serde::option")]
    pub pre_key: Option<X25519Public>,

    pub signed_pre_key_id: Option<u32>,
    #[serde(with = "pub_key_serde::option")]
    pub signed_pre_key: Option<X25519Public>,
    pub signed_pre_key_signature: Option<Vec<u8>>,

    pub identity_key: IdentityKey,
}

impl PreKeyBundle {
    /// True when the bundle carries a signed pre-key (the v3 path).
    pub fn has_signed_pre_key(&self) -> bool {
        self.signed_pre_key.is_some()
    }

    /// True when neither pre-key is present — rejected by the builder with
    /// `InvalidKey("both prekeys absent")`.
    pub fn both_pre_keys_absent(&self) -> bool {
        self.signed_pre_key.is_none() && self.pre_key.is_none()
    }
}
