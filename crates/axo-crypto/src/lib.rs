//! axo-crypto — cryptographic primitives for the session establishment core
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Pure functions only: nothing here touches a store or a network.
//!
//! # Module layout
//! - `keys`         — identity keypairs, ephemeral EC keypairs (Curve25519 + Ed25519)
//! - `agreement`    — Ed25519 <-> X25519 conversion, raw Diffie-Hellman
//! - `kdf`          — HKDF-SHA256 key derivation
//! - `ratchet_init` — RatchetInitializer: Alice/Bob/symmetric parameters -> fresh root/chain keys
//! - `error`        — unified error type

pub mod agreement;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod ratchet_init;

pub use error::CryptoError;
