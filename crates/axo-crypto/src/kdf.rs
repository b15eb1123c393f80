//! HKDF-SHA256 key derivation.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::CryptoError;

/// Expand `ikm` + `info` into `output.len()` bytes of key material.
/// `salt` may be `None` (HKDF then uses an all-zero salt).
pub fn hkdf_expand(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    output: &mut [u8],
) -> Result<(), CryptoError> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    hk.expand(info, output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

/// Derive a 32-byte key via HKDF-SHA256.
pub fn hkdf_expand_32(ikm: &[u8], salt: Option<&[u8]>, info: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut out = [0u8; 32];
    hkdf_expand(ikm, salt, info, &mut out)?;
    Ok(out)
}
