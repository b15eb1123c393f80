//! Identity and ephemeral key types.
//!
//! Each *local identity* holds exactly one long-term `IdentityKeyPair`
//! (Ed25519), persisted by the caller. Each session negotiation consumes one
//! fresh `ECKeyPair` (X25519) generated here and handed to the builder.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

// ── Identity public key ───────────────────────────────────────────────────────

/// A long-lived Curve25519 identity public key (Ed25519 encoding on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey(#[serde(with = "b64_32")] pub [u8; 32]);

impl IdentityKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("identity key must be 32 bytes".into()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Convert this Ed25519 public key to its X25519 counterpart for use in DH.
    pub fn to_x25519(&self) -> Result<X25519Public, CryptoError> {
        crate::agreement::ed25519_pub_to_x25519(&self.0)
    }
}

// ── Identity keypair ──────────────────────────────────────────────────────────

/// Long-term identity signing key. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct IdentityKeyPair {
    #[zeroize(skip)]
    pub public: IdentityKey,
    secret_bytes: [u8; 32],
}

impl IdentityKeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public = IdentityKey(signing_key.verifying_key().to_bytes());
        Self {
            public,
            secret_bytes: signing_key.to_bytes(),
        }
    }

    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&bytes);
        let public = IdentityKey(signing_key.verifying_key().to_bytes());
        Self {
            public,
            secret_bytes: bytes,
        }
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret_bytes
    }

    fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.secret_bytes)
    }

    /// Sign arbitrary bytes; returns a 64-byte raw Ed25519 signature.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.signing_key().sign(msg).to_bytes().to_vec()
    }

    /// Verify a signature made by any Ed25519 identity public key.
    pub fn verify(public: &IdentityKey, msg: &[u8], sig_bytes: &[u8]) -> Result<(), CryptoError> {
        let vk = VerifyingKey::from_bytes(&public.0)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let sig: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("signature must be 64 bytes".into()))?;
        vk.verify(msg, &Signature::from_bytes(&sig))
            .map_err(|_| CryptoError::SignatureVerification)
    }

    /// Convert this identity's public half to X25519 for use in key agreement.
    pub fn to_x25519_public(&self) -> Result<X25519Public, CryptoError> {
        self.public.to_x25519()
    }

    /// This identity's private half as an X25519 static secret, for DH.
    pub fn to_x25519_secret(&self) -> StaticSecret {
        crate::agreement::ed25519_secret_to_x25519(&self.secret_bytes)
    }
}

// ── Ephemeral EC keypair (Curve25519) ─────────────────────────────────────────

/// An ephemeral Curve25519 keypair: generated for one session negotiation,
/// retained inside `SessionState` until superseded.
#[derive(ZeroizeOnDrop)]
pub struct ECKeyPair {
    #[zeroize(skip)]
    public: X25519Public,
    secret: [u8; 32],
}

impl ECKeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519Public::from(&secret);
        Self {
            public,
            secret: secret.to_bytes(),
        }
    }

    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        let public = X25519Public::from(&StaticSecret::from(secret));
        Self { public, secret }
    }

    pub fn public(&self) -> &X25519Public {
        &self.public
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    fn secret_key(&self) -> StaticSecret {
        StaticSecret::from(self.secret)
    }

    /// Raw Diffie-Hellman against a peer's X25519 public key.
    pub fn diffie_hellman(&self, their_public: &X25519Public) -> [u8; 32] {
        *self.secret_key().diffie_hellman(their_public).as_bytes()
    }
}

impl Clone for ECKeyPair {
    fn clone(&self) -> Self {
        Self {
            public: self.public,
            secret: self.secret,
        }
    }
}

impl Drop for ECKeyPair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

mod b64_32 {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(&s)
            .map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
