//! The first inbound protocol message: a normal ratchet message with a
//! pre-key header prepended, letting the responder derive session state
//! before it can decrypt the inner ciphertext.

use serde::{Deserialize, Serialize};
use x25519_dalek::PublicKey as X25519Public;

use axo_crypto::keys::IdentityKey;

use crate::pub_key_serde;

/// `(version, registration-id, pre-key-id (may be absent), signed-pre-key-id
/// (v3 only), base-key, identity-key, inner-ciphertext)`.
///
/// The absent-pre-key-id sentinel never appears here — `pre_key_id` is an
/// `Option`, not a signed integer -1 or a MAX_VALUE marker. Crossing to a
/// wire-level sentinel, if ever needed, is this type's serialization
/// boundary, not the builder's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreKeyWhisperMessage {
    /// Protocol version: 2 or 3. Any other value is rejected by the builder
    /// with `InvalidMessage`.
    pub version: u8,
    pub registration_id: u32,
    /// Absent means "no one-time pre-key was consumed" (valid on both v2
    /// and v3, though the v2 path additionally requires it be present).
    pub pre_key_id: Option<u32>,
    /// Only meaningful on the v3 path.
    pub signed_pre_key_id: Option<u32>,
    #[serde(with = "pub_key_serde")]
    pub base_key: X25519Public,
    pub identity_key: IdentityKey,
    /// Opaque ratchet-encrypted payload; decoding it is out of scope here.
    pub inner_ciphertext: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let msg = PreKeyWhisperMessage {
            version: 3,
            registration_id: 42,
            pre_key_id: Some(11),
            signed_pre_key_id: Some(7),
            base_key: X25519Public::from([3u8; 32]),
            identity_key: axo_crypto::keys::IdentityKeyPair::generate().public,
            inner_ciphertext: vec![0xAA, 0xBB],
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: PreKeyWhisperMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, 3);
        assert_eq!(back.pre_key_id, Some(11));
        assert_eq!(back.inner_ciphertext, vec![0xAA, 0xBB]);
    }
}
