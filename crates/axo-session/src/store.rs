//! Store contracts consumed by `SessionBuilder`. Durable backends are out of
//! scope here — this module only defines the interfaces a backend must
//! satisfy, plus the error variants a backend may surface. An in-memory
//! reference implementation lives in the sibling `axo-store` crate.
//!
//! All operations are synchronous from the builder's perspective; higher
//! layers are responsible for serializing concurrent access per remote
//! address.

use thiserror::Error;

use axo_crypto::keys::{IdentityKey, IdentityKeyPair};

use crate::address::AxolotlAddress;
use crate::records::{PreKeyRecord, SessionRecord, SignedPreKeyRecord};

/// Failures surfaced by a store backend, kept distinct from
/// [`crate::error::BuilderError`]: any I/O failure is surfaced unchanged as a
/// store-error variant rather than folded into the protocol-error taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A pre-key or signed-pre-key lookup missed.
    #[error("no record for key id {0}")]
    InvalidKeyId(u32),
    /// Any other backend failure (I/O, serialization, lock poisoning, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

pub trait SessionStore {
    /// Returns a fresh blank record if none exists for `address`.
    fn load_session(&self, address: &AxolotlAddress) -> Result<SessionRecord, StoreError>;
    fn contains_session(&self, address: &AxolotlAddress) -> Result<bool, StoreError>;
    fn store_session(
        &mut self,
        address: &AxolotlAddress,
        record: SessionRecord,
    ) -> Result<(), StoreError>;
    fn delete_session(&mut self, address: &AxolotlAddress) -> Result<(), StoreError>;
}

pub trait PreKeyStore {
    /// Fails with `InvalidKeyId` if `id` is absent.
    fn load_pre_key(&self, id: u32) -> Result<PreKeyRecord, StoreError>;
    fn contains_pre_key(&self, id: u32) -> Result<bool, StoreError>;
    fn store_pre_key(&mut self, id: u32, record: PreKeyRecord) -> Result<(), StoreError>;
    fn remove_pre_key(&mut self, id: u32) -> Result<(), StoreError>;
}

pub trait SignedPreKeyStore {
    /// Fails with `InvalidKeyId` if `id` is absent.
    fn load_signed_pre_key(&self, id: u32) -> Result<SignedPreKeyRecord, StoreError>;
    fn contains_signed_pre_key(&self, id: u32) -> Result<bool, StoreError>;
    fn store_signed_pre_key(&mut self, id: u32, record: SignedPreKeyRecord) -> Result<(), StoreError>;
    fn remove_signed_pre_key(&mut self, id: u32) -> Result<(), StoreError>;
}

pub trait IdentityKeyStore {
    fn identity_key_pair(&self) -> Result<&IdentityKeyPair, StoreError>;
    fn local_registration_id(&self) -> Result<u32, StoreError>;
    /// True if `name` has no pinned identity yet, or if `key` matches the pin.
    fn is_trusted_identity(&self, name: &str, key: &IdentityKey) -> Result<bool, StoreError>;
    /// Pins `key` for `name` if unset; idempotent if it already matches.
    fn save_identity(&mut self, name: &str, key: IdentityKey) -> Result<(), StoreError>;
}

/// Everything a `SessionBuilder` needs from a backend, bundled into one
/// supertrait. A single concrete store (such as `axo-store`'s `MemoryStore`)
/// implements all four underlying traits on one struct; a blanket impl below
/// means the builder can borrow it once rather than needing four disjoint
/// `&mut` borrows of the same value.
pub trait ProtocolStore: SessionStore + PreKeyStore + SignedPreKeyStore + IdentityKeyStore {}

impl<T> ProtocolStore for T where T: SessionStore + PreKeyStore + SignedPreKeyStore + IdentityKeyStore {}
