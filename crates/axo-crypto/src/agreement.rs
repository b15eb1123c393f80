//! Ed25519 <-> X25519 conversion.
//!
//! Identity keys are Ed25519 (signing) but also participate in Diffie-Hellman
//! during session negotiation, so they need a birational map onto Curve25519.
//! This mirrors libsignal's IK -> X25519 conversion.

use sha2::{Digest, Sha512};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Convert an Ed25519 signing key (32-byte seed) to an X25519 static secret
/// via clamped SHA-512 expansion, the same transform `ed25519-dalek` uses
/// internally to derive its scalar.
pub fn ed25519_secret_to_x25519(ed_secret: &[u8; 32]) -> StaticSecret {
    let mut h = Sha512::digest(ed_secret);
    h[0] &= 248;
    h[31] &= 127;
    h[31] |= 64;
    let mut key = [0u8; 32];
    key.copy_from_slice(&h[..32]);
    h.as_mut_slice().zeroize();
    StaticSecret::from(key)
}

/// Convert an Ed25519 verifying key (public, 32 bytes) to an X25519 public
/// key via the birational map from the twisted Edwards curve to Montgomery
/// form.
pub fn ed25519_pub_to_x25519(ed_pub: &[u8; 32]) -> Result<X25519Public, CryptoError> {
    use curve25519_dalek::edwards::CompressedEdwardsY;
    let compressed = CompressedEdwardsY::from_slice(ed_pub)
        .map_err(|_| CryptoError::InvalidKey("invalid Ed25519 public key".into()))?;
    let point = compressed
        .decompress()
        .ok_or_else(|| CryptoError::InvalidKey("Ed25519 public key decompression failed".into()))?;
    Ok(X25519Public::from(point.to_montgomery().to_bytes()))
}
