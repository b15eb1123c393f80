//! Serde helpers for `x25519_dalek::PublicKey`, base64url-encoded on the
//! wire (no padding), matching `axo-crypto::keys::IdentityKey`'s encoding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{self, Deserialize, Deserializer, Serializer};
use x25519_dalek::PublicKey as X25519Public;

pub fn serialize<S>(key: &X25519Public, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&URL_SAFE_NO_PAD.encode(key.as_bytes()))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<X25519Public, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(&s)
        .map_err(serde::de::Error::custom)?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| serde::de::Error::custom("expected 32 bytes"))?;
    Ok(X25519Public::from(arr))
}

pub mod option {
    use super::*;

    pub fn serialize<S>(key: &Option<X25519Public>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match key {
            Some(k) => serializer.serialize_some(&URL_SAFE_NO_PAD.encode(k.as_bytes())),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<X25519Public>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            None => Ok(None),
            Some(s) => {
                let bytes = URL_SAFE_NO_PAD
                    .decode(&s)
                    .map_err(serde::de::Error::custom)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 bytes"))?;
                Ok(Some(X25519Public::from(arr)))
            }
        }
    }
}
