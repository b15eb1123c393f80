//! `MemoryStore` — an in-memory implementation of every `axo-session` store
//! trait, backed by plain `HashMap`s. Good enough for tests and single-process
//! prototypes; nothing here is durable across a restart.

use std::collections::HashMap;

use axo_crypto::keys::{IdentityKey, IdentityKeyPair};
use axo_session::{
    AxolotlAddress, IdentityKeyStore, PreKeyRecord, PreKeyStore, SessionRecord, SessionStore,
    SignedPreKeyRecord, SignedPreKeyStore, StoreError,
};

pub struct MemoryStore {
    identity_key_pair: IdentityKeyPair,
    local_registration_id: u32,
    trusted_identities: HashMap<String, IdentityKey>,
    sessions: HashMap<AxolotlAddress, SessionRecord>,
    pre_keys: HashMap<u32, PreKeyRecord>,
    signed_pre_keys: HashMap<u32, SignedPreKeyRecord>,
}

impl MemoryStore {
    pub fn new(identity_key_pair: IdentityKeyPair, local_registration_id: u32) -> Self {
        Self {
            identity_key_pair,
            local_registration_id,
            trusted_identities: HashMap::new(),
            sessions: HashMap::new(),
            pre_keys: HashMap::new(),
            signed_pre_keys: HashMap::new(),
        }
    }

    pub fn add_pre_key(&mut self, record: PreKeyRecord) {
        self.pre_keys.insert(record.id, record);
    }

    pub fn add_signed_pre_key(&mut self, record: SignedPreKeyRecord) {
        self.signed_pre_keys.insert(record.id, record);
    }
}

impl SessionStore for MemoryStore {
    fn load_session(&self, address: &AxolotlAddress) -> Result<SessionRecord, StoreError> {
        Ok(self
            .sessions
            .get(address)
            .cloned()
            .unwrap_or_else(SessionRecord::new))
    }

    fn contains_session(&self, address: &AxolotlAddress) -> Result<bool, StoreError> {
        Ok(self.sessions.contains_key(address))
    }

    fn store_session(
        &mut self,
        address: &AxolotlAddress,
        record: SessionRecord,
    ) -> Result<(), StoreError> {
        self.sessions.insert(address.clone(), record);
        Ok(())
    }

    fn delete_session(&mut self, address: &AxolotlAddress) -> Result<(), StoreError> {
        self.sessions.remove(address);
        Ok(())
    }
}

impl PreKeyStore for MemoryStore {
    fn load_pre_key(&self, id: u32) -> Result<PreKeyRecord, StoreError> {
        self.pre_keys.get(&id).cloned().ok_or(StoreError::InvalidKeyId(id))
    }

    fn contains_pre_key(&self, id: u32) -> Result<bool, StoreError> {
        Ok(self.pre_keys.contains_key(&id))
    }

    fn store_pre_key(&mut self, id: u32, record: PreKeyRecord) -> Result<(), StoreError> {
        self.pre_keys.insert(id, record);
        Ok(())
    }

    fn remove_pre_key(&mut self, id: u32) -> Result<(), StoreError> {
        self.pre_keys.remove(&id);
        Ok(())
    }
}

impl SignedPreKeyStore for MemoryStore {
    fn load_signed_pre_key(&self, id: u32) -> Result<SignedPreKeyRecord, StoreError> {
        self.signed_pre_keys
            .get(&id)
            .cloned()
            .ok_or(StoreError::InvalidKeyId(id))
    }

    fn contains_signed_pre_key(&self, id: u32) -> Result<bool, StoreError> {
        Ok(self.signed_pre_keys.contains_key(&id))
    }

    fn store_signed_pre_key(
        &mut self,
        id: u32,
        record: SignedPreKeyRecord,
    ) -> Result<(), StoreError> {
        self.signed_pre_keys.insert(id, record);
        Ok(())
    }

    fn remove_signed_pre_key(&mut self, id: u32) -> Result<(), StoreError> {
        self.signed_pre_keys.remove(&id);
        Ok(())
    }
}

impl IdentityKeyStore for MemoryStore {
    fn identity_key_pair(&self) -> Result<&IdentityKeyPair, StoreError> {
        Ok(&self.identity_key_pair)
    }

    fn local_registration_id(&self) -> Result<u32, StoreError> {
        Ok(self.local_registration_id)
    }

    fn is_trusted_identity(&self, name: &str, key: &IdentityKey) -> Result<bool, StoreError> {
        match self.trusted_identities.get(name) {
            Some(pinned) => Ok(pinned == key),
            None => Ok(true),
        }
    }

    fn save_identity(&mut self, name: &str, key: IdentityKey) -> Result<(), StoreError> {
        tracing::debug!(name, "pinning identity");
        self.trusted_identities.insert(name.to_string(), key);
        Ok(())
    }
}
