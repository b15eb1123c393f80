//! `SessionBuilder` — the state machine orchestrating all four session
//! establishment entry points.

use rand::RngCore;
use x25519_dalek::PublicKey as X25519Public;

use axo_crypto::keys::{ECKeyPair, IdentityKey, IdentityKeyPair};
use axo_crypto::ratchet_init::{
    initialize_alice, initialize_bob, initialize_symmetric, AliceParameters, BobParameters,
    RatchetKeys, SymmetricParameters,
};
use axo_proto::{KeyExchangeFlags, KeyExchangeMessage, PreKeyBundle, PreKeyWhisperMessage};

use crate::address::AxolotlAddress;
use crate::error::BuilderError;
use crate::records::{SessionRecord, SessionState, UnacknowledgedPreKeyMessage};
use crate::store::ProtocolStore;

/// Highest protocol version this builder negotiates on outbound
/// pre-key-bundle establishment.
pub const CURRENT_VERSION: u8 = 3;

/// Distinguishes "nothing changed, this was a replay" from "a new state was
/// installed, and here's the pre-key id (if any) for the caller to delete" —
/// needed because both outcomes can carry the same `Option<u32>` payload.
enum WhisperOutcome {
    Duplicate,
    Installed(Option<u32>),
}

fn install_ratchet(state: &mut SessionState, keys: RatchetKeys) {
    state.root_key = Some(keys.root_key);
    state.chain_key = Some(keys.chain_key);
}

/// Bound to one (stores, remote-address) pair for the duration of a call.
/// Construct a fresh one per entry-point invocation; it borrows the store
/// trait objects rather than owning them, so the caller keeps full control
/// over transaction boundaries and lock scope around a single call.
pub struct SessionBuilder<'a> {
    store: &'a mut dyn ProtocolStore,
    remote_address: AxolotlAddress,
}

impl<'a> SessionBuilder<'a> {
    pub fn new(store: &'a mut dyn ProtocolStore, remote_address: AxolotlAddress) -> Self {
        Self {
            store,
            remote_address,
        }
    }

    fn require_trusted(&self, identity_key: &IdentityKey) -> Result<(), BuilderError> {
        let trusted = self
            .store
            .is_trusted_identity(self.remote_address.name(), identity_key)
            .map_err(BuilderError::from_store)?;
        if !trusted {
            return Err(BuilderError::UntrustedIdentity(
                self.remote_address.name().to_string(),
            ));
        }
        Ok(())
    }

    fn pin_identity(&mut self, identity_key: IdentityKey) -> Result<(), BuilderError> {
        self.store
            .save_identity(self.remote_address.name(), identity_key)
            .map_err(BuilderError::from_store)
    }

    fn our_identity(&self) -> Result<&IdentityKeyPair, BuilderError> {
        self.store.identity_key_pair().map_err(BuilderError::from_store)
    }

    // ── 4.2.1: process(preKeyBundle) — outbound initiation, "Alice" ──────

    pub fn process_pre_key_bundle(&mut self, bundle: &PreKeyBundle) -> Result<(), BuilderError> {
        self.require_trusted(&bundle.identity_key)?;

        if let Some(signed_pre_key) = bundle.signed_pre_key {
            let signature = bundle
                .signed_pre_key_signature
                .as_ref()
                .ok_or_else(|| BuilderError::InvalidKey("Invalid signature on device key".into()))?;
            IdentityKeyPair::verify(&bundle.identity_key, signed_pre_key.as_bytes(), signature)
                .map_err(|_| BuilderError::InvalidKey("Invalid signature on device key".into()))?;
        }
        if bundle.both_pre_keys_absent() {
            return Err(BuilderError::InvalidKey("both prekeys absent".into()));
        }

        let supports_v3 = bundle.has_signed_pre_key();
        let version = if supports_v3 { 3 } else { 2 };
        let our_base_key = ECKeyPair::generate();

        let their_ratchet_key: X25519Public = if supports_v3 {
            bundle.signed_pre_key.expect("checked above")
        } else {
            bundle.pre_key.expect("checked above: one of the two is present")
        };
        let their_one_time_pre_key_id = if bundle.pre_key.is_some() {
            bundle.pre_key_id
        } else {
            None
        };
        let their_one_time_pre_key = if supports_v3 { bundle.pre_key.as_ref() } else { None };

        let mut record = self
            .store
            .load_session(&self.remote_address)
            .map_err(BuilderError::from_store)?;
        if !record.is_fresh() {
            record.archive_current_state();
        }

        let our_identity = self.our_identity()?;
        let ratchet_keys = initialize_alice(
            AliceParameters {
                our_base_key: &our_base_key,
                our_identity,
                their_identity: &bundle.identity_key,
                their_ratchet_key: &their_ratchet_key,
                their_one_time_pre_key,
            },
            version,
        )?;

        let mut state = SessionState {
            session_version: version,
            local_registration_id: self
                .store
                .local_registration_id()
                .map_err(BuilderError::from_store)?,
            remote_registration_id: bundle.registration_id,
            alice_base_key: Some(our_base_key.public_bytes()),
            unacknowledged_pre_key_message: Some(UnacknowledgedPreKeyMessage {
                pre_key_id: their_one_time_pre_key_id,
                signed_pre_key_id: bundle.signed_pre_key_id,
                our_base_key: our_base_key.public_bytes(),
            }),
            ..Default::default()
        };
        install_ratchet(&mut state, ratchet_keys);
        record.install_session_state(state);

        // Session commit precedes identity pinning: a crash between the two
        // leaves a recoverable session-less state, never a pinned identity
        // with no session behind it.
        self.store
            .store_session(&self.remote_address, record)
            .map_err(BuilderError::from_store)?;
        self.pin_identity(bundle.identity_key.clone())?;
        tracing::debug!(remote = %self.remote_address, version, "established outbound session");
        Ok(())
    }

    // ── 4.2.2: process(sessionRecord, preKeyWhisperMessage) — inbound, "Bob" ──

    pub fn process_pre_key_whisper_message(
        &mut self,
        record: &mut SessionRecord,
        message: &PreKeyWhisperMessage,
    ) -> Result<Option<u32>, BuilderError> {
        self.require_trusted(&message.identity_key)?;

        let outcome = match message.version {
            3 => self.process_pre_key_whisper_v3(record, message)?,
            2 => self.process_pre_key_whisper_v2(record, message)?,
            other => {
                return Err(BuilderError::InvalidMessage(format!(
                    "unknown version {other}"
                )))
            }
        };

        match outcome {
            WhisperOutcome::Duplicate => Ok(None),
            WhisperOutcome::Installed(pre_key_id) => {
                self.pin_identity(message.identity_key.clone())?;
                tracing::debug!(
                    remote = %self.remote_address,
                    version = message.version,
                    ?pre_key_id,
                    "installed inbound session"
                );
                Ok(pre_key_id)
            }
        }
    }

    fn process_pre_key_whisper_v3(
        &mut self,
        record: &mut SessionRecord,
        message: &PreKeyWhisperMessage,
    ) -> Result<WhisperOutcome, BuilderError> {
        if record.has_session_state(3, message.base_key.as_bytes()) {
            tracing::debug!("duplicate v3 first message, ignoring");
            return Ok(WhisperOutcome::Duplicate);
        }

        let signed_pre_key_id = message.signed_pre_key_id.ok_or_else(|| {
            BuilderError::InvalidKeyId("v3 message did not carry a signed pre-key id".into())
        })?;
        let our_signed_pre_key = self
            .store
            .load_signed_pre_key(signed_pre_key_id)
            .map_err(BuilderError::from_store)?;

        let our_one_time_pre_key = match message.pre_key_id {
            Some(id) => Some(
                self.store
                    .load_pre_key(id)
                    .map_err(BuilderError::from_store)?,
            ),
            None => None,
        };

        let our_identity = self.our_identity()?;
        let ratchet_keys = initialize_bob(
            BobParameters {
                our_identity,
                our_ratchet_key: &our_signed_pre_key.key_pair,
                our_one_time_pre_key: our_one_time_pre_key.as_ref().map(|r| &r.key_pair),
                their_identity: &message.identity_key,
                their_base_key: &message.base_key,
            },
            3,
        )?;

        if !record.is_fresh() {
            record.archive_current_state();
        }
        let mut state = SessionState {
            session_version: 3,
            local_registration_id: self
                .store
                .local_registration_id()
                .map_err(BuilderError::from_store)?,
            remote_registration_id: message.registration_id,
            alice_base_key: Some(*message.base_key.as_bytes()),
            ..Default::default()
        };
        install_ratchet(&mut state, ratchet_keys);
        record.install_session_state(state);

        Ok(WhisperOutcome::Installed(message.pre_key_id))
    }

    fn process_pre_key_whisper_v2(
        &mut self,
        record: &mut SessionRecord,
        message: &PreKeyWhisperMessage,
    ) -> Result<WhisperOutcome, BuilderError> {
        let pre_key_id = message
            .pre_key_id
            .ok_or_else(|| BuilderError::InvalidKeyId("V2 requires one time prekey id".into()))?;

        let pre_key_exists = self
            .store
            .contains_pre_key(pre_key_id)
            .map_err(BuilderError::from_store)?;
        if !pre_key_exists {
            let already_established = self
                .store
                .contains_session(&self.remote_address)
                .map_err(BuilderError::from_store)?;
            if already_established {
                tracing::debug!(pre_key_id, "v2 pre-key already consumed, session exists");
                return Ok(WhisperOutcome::Duplicate);
            }
            return Err(BuilderError::InvalidKeyId(format!(
                "no record for key id {pre_key_id}"
            )));
        }

        let our_one_time_pre_key = self
            .store
            .load_pre_key(pre_key_id)
            .map_err(BuilderError::from_store)?;

        let our_identity = self.our_identity()?;
        let ratchet_keys = initialize_bob(
            BobParameters {
                our_identity,
                our_ratchet_key: &our_one_time_pre_key.key_pair,
                our_one_time_pre_key: None,
                their_identity: &message.identity_key,
                their_base_key: &message.base_key,
            },
            2,
        )?;

        if !record.is_fresh() {
            record.archive_current_state();
        }
        let mut state = SessionState {
            session_version: 2,
            local_registration_id: self
                .store
                .local_registration_id()
                .map_err(BuilderError::from_store)?,
            remote_registration_id: message.registration_id,
            alice_base_key: Some(*message.base_key.as_bytes()),
            ..Default::default()
        };
        install_ratchet(&mut state, ratchet_keys);
        record.install_session_state(state);

        Ok(WhisperOutcome::Installed(Some(pre_key_id)))
    }

    // ── 4.2.3: process() — outbound interactive initiate ──────────────────

    pub fn process_key_exchange_initiate(&mut self) -> Result<KeyExchangeMessage, BuilderError> {
        let mut sequence_bytes = [0u8; 2];
        rand::rngs::OsRng.fill_bytes(&mut sequence_bytes);
        let sequence = u16::from_be_bytes(sequence_bytes);

        let our_base_key = ECKeyPair::generate();
        let our_ratchet_key = ECKeyPair::generate();
        let our_identity = self.our_identity()?;
        let base_key_signature = our_identity.sign(our_base_key.public_bytes().as_slice());
        let identity_public = our_identity.public.clone();

        let mut record = self
            .store
            .load_session(&self.remote_address)
            .map_err(BuilderError::from_store)?;
        record.session_state_mut().pending_key_exchange = Some(crate::records::PendingKeyExchange {
            sequence,
            our_base_key,
            our_ratchet_key,
        });

        let response = {
            let pending = record
                .session_state()
                .pending_key_exchange
                .as_ref()
                .expect("just inserted");
            KeyExchangeMessage {
                version: 2,
                max_version: CURRENT_VERSION,
                sequence,
                flags: KeyExchangeFlags::initiate(),
                base_key: *pending.our_base_key.public(),
                base_key_signature,
                ratchet_key: *pending.our_ratchet_key.public(),
                identity_key: identity_public,
            }
        };

        self.store
            .store_session(&self.remote_address, record)
            .map_err(BuilderError::from_store)?;
        tracing::debug!(remote = %self.remote_address, sequence, "initiated interactive key exchange");
        Ok(response)
    }

    // ── 4.2.4: process(keyExchangeMessage) — interactive response ─────────

    pub fn process_key_exchange(
        &mut self,
        message: &KeyExchangeMessage,
    ) -> Result<Option<KeyExchangeMessage>, BuilderError> {
        self.require_trusted(&message.identity_key)?;

        if message.flags.is_initiate() {
            Ok(Some(self.process_initiate(message)?))
        } else {
            self.process_response(message)?;
            Ok(None)
        }
    }

    fn process_initiate(&mut self, message: &KeyExchangeMessage) -> Result<KeyExchangeMessage, BuilderError> {
        if message.version >= 3 {
            IdentityKeyPair::verify(
                &message.identity_key,
                message.base_key.as_bytes(),
                &message.base_key_signature,
            )
            .map_err(|_| BuilderError::InvalidKey("Bad signature".into()))?;
        }

        let mut record = self
            .store
            .load_session(&self.remote_address)
            .map_err(BuilderError::from_store)?;

        let had_pending = record.session_state().has_pending_key_exchange();
        let (our_base_key, our_ratchet_key) = if let Some(pending) =
            record.session_state_mut().pending_key_exchange.take()
        {
            (pending.our_base_key, pending.our_ratchet_key)
        } else {
            (ECKeyPair::generate(), ECKeyPair::generate())
        };
        let our_identity = self.our_identity()?;

        if !record.is_fresh() {
            record.archive_current_state();
        }

        let version = message.max_version.min(CURRENT_VERSION);
        let ratchet_keys = initialize_symmetric(
            SymmetricParameters {
                our_base_key: &our_base_key,
                our_ratchet_key: &our_ratchet_key,
                our_identity,
                their_base_key: &message.base_key,
                their_ratchet_key: &message.ratchet_key,
                their_identity: &message.identity_key,
            },
            version,
        )?;

        let base_key_signature = our_identity.sign(our_base_key.public_bytes().as_slice());
        let identity_public = our_identity.public.clone();

        let mut state = SessionState {
            session_version: version,
            local_registration_id: self
                .store
                .local_registration_id()
                .map_err(BuilderError::from_store)?,
            remote_registration_id: 0,
            alice_base_key: Some(our_base_key.public_bytes()),
            ..Default::default()
        };
        install_ratchet(&mut state, ratchet_keys);
        record.install_session_state(state);

        self.store
            .store_session(&self.remote_address, record)
            .map_err(BuilderError::from_store)?;
        self.pin_identity(message.identity_key.clone())?;

        let mut flags = KeyExchangeFlags::response();
        if had_pending {
            flags = flags.with_simultaneous_initiate();
        }
        tracing::debug!(
            remote = %self.remote_address,
            sequence = message.sequence,
            version,
            simultaneous = had_pending,
            "responded to interactive initiate"
        );
        Ok(KeyExchangeMessage {
            version,
            max_version: CURRENT_VERSION,
            sequence: message.sequence,
            flags,
            base_key: *our_base_key.public(),
            base_key_signature,
            ratchet_key: *our_ratchet_key.public(),
            identity_key: identity_public,
        })
    }

    fn process_response(&mut self, message: &KeyExchangeMessage) -> Result<(), BuilderError> {
        let mut record = self
            .store
            .load_session(&self.remote_address)
            .map_err(BuilderError::from_store)?;

        let is_sim_response = message.flags.is_simultaneous_initiate();
        let pending = match record.session_state_mut().pending_key_exchange.take() {
            Some(pending) if pending.sequence == message.sequence => pending,
            other => {
                // put back whatever didn't match, if anything
                record.session_state_mut().pending_key_exchange = other;
                if is_sim_response {
                    tracing::debug!(
                        remote = %self.remote_address,
                        sequence = message.sequence,
                        "our initiate won a simultaneous-initiate race, ignoring peer's response"
                    );
                    return Ok(());
                }
                return Err(BuilderError::StaleKeyExchange);
            }
        };

        let our_identity = self.our_identity()?;
        if !record.is_fresh() {
            record.archive_current_state();
        }

        let version = message.max_version.min(CURRENT_VERSION);
        let ratchet_keys = initialize_symmetric(
            SymmetricParameters {
                our_base_key: &pending.our_base_key,
                our_ratchet_key: &pending.our_ratchet_key,
                our_identity,
                their_base_key: &message.base_key,
                their_ratchet_key: &message.ratchet_key,
                their_identity: &message.identity_key,
            },
            version,
        )?;

        if version >= 3 {
            IdentityKeyPair::verify(
                &message.identity_key,
                message.base_key.as_bytes(),
                &message.base_key_signature,
            )
            .map_err(|_| BuilderError::InvalidKey("Base key signature doesn't match".into()))?;
        }

        let mut state = SessionState {
            session_version: version,
            local_registration_id: self
                .store
                .local_registration_id()
                .map_err(BuilderError::from_store)?,
            remote_registration_id: 0,
            alice_base_key: Some(pending.our_base_key.public_bytes()),
            ..Default::default()
        };
        install_ratchet(&mut state, ratchet_keys);
        record.install_session_state(state);

        self.store
            .store_session(&self.remote_address, record)
            .map_err(BuilderError::from_store)?;
        self.pin_identity(message.identity_key.clone())?;
        tracing::debug!(
            remote = %self.remote_address,
            sequence = message.sequence,
            version,
            "completed interactive key exchange"
        );
        Ok(())
    }
}
