//! RatchetInitializer — the pure function that turns negotiated key material
//! into a fresh session's root/chain keys.
//!
//! References:
//!   - Signal X3DH spec: <https://signal.org/docs/specifications/x3dh/>
//!   - Signal Double Ratchet spec: <https://signal.org/docs/specifications/doubleratchet/>
//!
//! Three parameter flavors feed this module, one per session-establishment
//! entry point:
//!   - `AliceParameters`     — outbound pre-key-bundle initiation
//!   - `BobParameters`       — inbound pre-key-whisper-message acceptance
//!   - `SymmetricParameters` — interactive key-exchange (either side may be
//!                             "Alice" in the DH math; role is decided by
//!                             comparing base-key bytes so both sides agree)
//!
//! DH calculations mirror X3DH: four Diffie-Hellman computations (the fourth
//! only when a one-time pre-key participates) are concatenated behind a
//! fixed discontinuity pad and expanded via HKDF into a root key and a chain
//! key.

use x25519_dalek::PublicKey as X25519Public;

use crate::{
    error::CryptoError,
    keys::{ECKeyPair, IdentityKey, IdentityKeyPair},
};

/// Discontinuity pad prepended to the DH concatenation, as in X3DH: 32 bytes
/// of 0xFF so an attacker who learns the session's root key cannot derive
/// anything about a symmetric-ratchet key with the same raw DH inputs.
const DISCONTINUITY_PAD: [u8; 32] = [0xFFu8; 32];

/// Freshly derived root key and chain key for a newly initialized session.
/// Forward-secure message encryption (the symmetric ratchet) consumes these;
/// that path is out of scope here.
#[derive(Clone)]
pub struct RatchetKeys {
    pub root_key: [u8; 32],
    pub chain_key: [u8; 32],
}

fn derive(version: u8, dh_concat: &[u8]) -> Result<RatchetKeys, CryptoError> {
    let info = format!("axo-session-v{version}");
    let mut root_key = [0u8; 32];
    let mut chain_key = [0u8; 32];
    crate::kdf::hkdf_expand(dh_concat, Some(&[0u8; 32]), format!("{info}-root").as_bytes(), &mut root_key)?;
    crate::kdf::hkdf_expand(dh_concat, Some(&[0u8; 32]), format!("{info}-chain").as_bytes(), &mut chain_key)?;
    Ok(RatchetKeys { root_key, chain_key })
}

// ── Alice (initiator) parameters ──────────────────────────────────────────────

pub struct AliceParameters<'a> {
    pub our_base_key: &'a ECKeyPair,
    pub our_identity: &'a IdentityKeyPair,
    pub their_identity: &'a IdentityKey,
    /// Their signed pre-key (v3) or one-time pre-key (v2) — the "their
    /// ratchet key" in the pre-key-bundle handshake.
    pub their_ratchet_key: &'a X25519Public,
    /// Present only on the v3 path, when the bundle carried a one-time
    /// pre-key.
    pub their_one_time_pre_key: Option<&'a X25519Public>,
}

/// DH1 = our_identity x their_ratchet_key
/// DH2 = our_base_key  x their_identity
/// DH3 = our_base_key  x their_ratchet_key
/// DH4 = our_base_key  x their_one_time_pre_key   [optional]
pub fn initialize_alice(params: AliceParameters<'_>, version: u8) -> Result<RatchetKeys, CryptoError> {
    let our_identity_x = params.our_identity.to_x25519_secret();
    let their_identity_x = params.their_identity.to_x25519()?;

    let dh1 = our_identity_x.diffie_hellman(params.their_ratchet_key);
    let dh2 = params.our_base_key.diffie_hellman(&their_identity_x);
    let dh3 = params.our_base_key.diffie_hellman(params.their_ratchet_key);

    let mut concat = Vec::with_capacity(32 * 5);
    concat.extend_from_slice(&DISCONTINUITY_PAD);
    concat.extend_from_slice(dh1.as_bytes());
    concat.extend_from_slice(&dh2);
    concat.extend_from_slice(&dh3);

    if let Some(their_opk) = params.their_one_time_pre_key {
        let dh4 = params.our_base_key.diffie_hellman(their_opk);
        concat.extend_from_slice(&dh4);
    }

    derive(version, &concat)
}

// ── Bob (responder) parameters ────────────────────────────────────────────────

pub struct BobParameters<'a> {
    pub our_identity: &'a IdentityKeyPair,
    /// Our signed pre-key (v3) or the consumed one-time pre-key (v2, which
    /// has no separate signed-key concept) — the "our ratchet key" in the
    /// inbound pre-key-whisper-message path.
    pub our_ratchet_key: &'a ECKeyPair,
    /// Present only on the v3 path, when the message carried a one-time
    /// pre-key id.
    pub our_one_time_pre_key: Option<&'a ECKeyPair>,
    pub their_identity: &'a IdentityKey,
    pub their_base_key: &'a X25519Public,
}

/// Mirrors Alice's DH order exactly (DH is commutative):
///   DH1 = our_ratchet_key x their_identity
///   DH2 = our_identity    x their_base_key
///   DH3 = our_ratchet_key x their_base_key
///   DH4 = our_one_time_pre_key x their_base_key   [optional]
pub fn initialize_bob(params: BobParameters<'_>, version: u8) -> Result<RatchetKeys, CryptoError> {
    let our_identity_x = params.our_identity.to_x25519_secret();
    let their_identity_x = params.their_identity.to_x25519()?;

    let dh1 = params.our_ratchet_key.diffie_hellman(&their_identity_x);
    let dh2 = our_identity_x.diffie_hellman(params.their_base_key);
    let dh3 = params.our_ratchet_key.diffie_hellman(params.their_base_key);

    let mut concat = Vec::with_capacity(32 * 5);
    concat.extend_from_slice(&DISCONTINUITY_PAD);
    concat.extend_from_slice(&dh1);
    concat.extend_from_slice(dh2.as_bytes());
    concat.extend_from_slice(&dh3);

    if let Some(our_opk) = params.our_one_time_pre_key {
        let dh4 = our_opk.diffie_hellman(params.their_base_key);
        concat.extend_from_slice(&dh4);
    }

    derive(version, &concat)
}

// ── Symmetric parameters (interactive key exchange) ───────────────────────────

pub struct SymmetricParameters<'a> {
    pub our_base_key: &'a ECKeyPair,
    pub our_ratchet_key: &'a ECKeyPair,
    pub our_identity: &'a IdentityKeyPair,
    pub their_base_key: &'a X25519Public,
    pub their_ratchet_key: &'a X25519Public,
    pub their_identity: &'a IdentityKey,
}

/// Both sides of an interactive key exchange contribute base + ratchet
/// keypairs. Role in the DH math ("who plays Alice") is decided by comparing
/// base-key bytes, so both sides land on the same four DH values regardless
/// of who actually initiated — this resolves the race when both sides send
/// an interactive key-exchange initiate at once.
pub fn initialize_symmetric(params: SymmetricParameters<'_>, version: u8) -> Result<RatchetKeys, CryptoError> {
    let our_identity_x = params.our_identity.to_x25519_secret();
    let their_identity_x = params.their_identity.to_x25519()?;
    let we_are_alice = params.our_base_key.public_bytes() < *params.their_base_key.as_bytes();

    let (dh1, dh2, dh3, dh4) = if we_are_alice {
        (
            *our_identity_x.diffie_hellman(params.their_ratchet_key).as_bytes(),
            params.our_base_key.diffie_hellman(&their_identity_x),
            params.our_base_key.diffie_hellman(params.their_ratchet_key),
            params.our_ratchet_key.diffie_hellman(params.their_ratchet_key),
        )
    } else {
        (
            params.our_ratchet_key.diffie_hellman(&their_identity_x),
            *our_identity_x.diffie_hellman(params.their_base_key).as_bytes(),
            params.our_ratchet_key.diffie_hellman(params.their_base_key),
            params.our_ratchet_key.diffie_hellman(params.their_ratchet_key),
        )
    };

    let mut concat = Vec::with_capacity(32 * 5);
    concat.extend_from_slice(&DISCONTINUITY_PAD);
    concat.extend_from_slice(&dh1);
    concat.extend_from_slice(&dh2);
    concat.extend_from_slice(&dh3);
    concat.extend_from_slice(&dh4);

    derive(version, &concat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alice_and_bob_derive_matching_keys_without_opk() {
        let alice_identity = IdentityKeyPair::generate();
        let bob_identity = IdentityKeyPair::generate();
        let bob_spk = ECKeyPair::generate();
        let alice_base = ECKeyPair::generate();

        let alice_keys = initialize_alice(
            AliceParameters {
                our_base_key: &alice_base,
                our_identity: &alice_identity,
                their_identity: &bob_identity.public,
                their_ratchet_key: bob_spk.public(),
                their_one_time_pre_key: None,
            },
            3,
        )
        .unwrap();

        let bob_keys = initialize_bob(
            BobParameters {
                our_identity: &bob_identity,
                our_ratchet_key: &bob_spk,
                our_one_time_pre_key: None,
                their_identity: &alice_identity.public,
                their_base_key: alice_base.public(),
            },
            3,
        )
        .unwrap();

        assert_eq!(alice_keys.root_key, bob_keys.root_key);
        assert_eq!(alice_keys.chain_key, bob_keys.chain_key);
    }

    #[test]
    fn alice_and_bob_derive_matching_keys_with_opk() {
        let alice_identity = IdentityKeyPair::generate();
        let bob_identity = IdentityKeyPair::generate();
        let bob_spk = ECKeyPair::generate();
        let bob_opk = ECKeyPair::generate();
        let alice_base = ECKeyPair::generate();

        let alice_keys = initialize_alice(
            AliceParameters {
                our_base_key: &alice_base,
                our_identity: &alice_identity,
                their_identity: &bob_identity.public,
                their_ratchet_key: bob_spk.public(),
                their_one_time_pre_key: Some(bob_opk.public()),
            },
            3,
        )
        .unwrap();

        let bob_keys = initialize_bob(
            BobParameters {
                our_identity: &bob_identity,
                our_ratchet_key: &bob_spk,
                our_one_time_pre_key: Some(&bob_opk),
                their_identity: &alice_identity.public,
                their_base_key: alice_base.public(),
            },
            3,
        )
        .unwrap();

        assert_eq!(alice_keys.root_key, bob_keys.root_key);
    }

    #[test]
    fn symmetric_parameters_agree_regardless_of_role() {
        let id_a = IdentityKeyPair::generate();
        let id_b = IdentityKeyPair::generate();
        let base_a = ECKeyPair::generate();
        let ratchet_a = ECKeyPair::generate();
        let base_b = ECKeyPair::generate();
        let ratchet_b = ECKeyPair::generate();

        let keys_a = initialize_symmetric(
            SymmetricParameters {
                our_base_key: &base_a,
                our_ratchet_key: &ratchet_a,
                our_identity: &id_a,
                their_base_key: base_b.public(),
                their_ratchet_key: ratchet_b.public(),
                their_identity: &id_b.public,
            },
            2,
        )
        .unwrap();

        let keys_b = initialize_symmetric(
            SymmetricParameters {
                our_base_key: &base_b,
                our_ratchet_key: &ratchet_b,
                our_identity: &id_b,
                their_base_key: base_a.public(),
                their_ratchet_key: ratchet_a.public(),
                their_identity: &id_a.public,
            },
            2,
        )
        .unwrap();

        assert_eq!(keys_a.root_key, keys_b.root_key);
        assert_eq!(keys_a.chain_key, keys_b.chain_key);
    }
}
