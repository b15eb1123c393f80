//! Integration tests for session establishment end to end.
//!
//! Tests cover:
//!  1. Outbound pre-key-bundle establishment, then rerun with a different
//!     identity is rejected as untrusted
//!  2. Inbound v3 pre-key-whisper-message: first message consumes the
//!     one-time pre-key, replay is a no-op
//!  3. Inbound v2 pre-key-whisper-message: missing pre-key with an existing
//!     session is a no-op, without one is `InvalidKeyId`
//!  4. Bad signed-pre-key signature is rejected and never installed
//!  5. Interactive key exchange, including a simultaneous-initiate collision
//!     that still converges on one shared root key
//!  6. Stale key-exchange response
//!  7. Archive bound across repeated re-establishment

use x25519_dalek::PublicKey as X25519Public;

use axo_crypto::keys::{ECKeyPair, IdentityKeyPair};
use axo_proto::{KeyExchangeFlags, KeyExchangeMessage, PreKeyBundle, PreKeyWhisperMessage};
use axo_session::{
    AxolotlAddress, BuilderError, IdentityKeyStore, PreKeyRecord, PreKeyStore, SessionBuilder,
    SessionRecord, SessionStore, SignedPreKeyRecord, ARCHIVED_STATES_MAX,
};
use axo_store::MemoryStore;

struct Party {
    store: MemoryStore,
    address: AxolotlAddress,
}

impl Party {
    fn new(name: &str, registration_id: u32) -> Self {
        Self {
            store: MemoryStore::new(IdentityKeyPair::generate(), registration_id),
            address: AxolotlAddress::new(name, 1),
        }
    }

    fn builder(&mut self, remote: AxolotlAddress) -> SessionBuilder<'_> {
        SessionBuilder::new(&mut self.store, remote)
    }

    fn identity_public(&self) -> axo_crypto::keys::IdentityKey {
        self.store.identity_key_pair().unwrap().public.clone()
    }
}

fn add_signed_pre_key(party: &mut Party, id: u32) -> (X25519Public, Vec<u8>) {
    let key_pair = ECKeyPair::generate();
    let public = *key_pair.public();
    let signature = party
        .store
        .identity_key_pair()
        .unwrap()
        .sign(public.as_bytes());
    party
        .store
        .add_signed_pre_key(SignedPreKeyRecord::new(id, key_pair, signature.clone(), 0));
    (public, signature)
}

fn add_pre_key(party: &mut Party, id: u32) -> X25519Public {
    let key_pair = ECKeyPair::generate();
    let public = *key_pair.public();
    party.store.add_pre_key(PreKeyRecord::new(id, key_pair));
    public
}

fn v3_bundle(bob: &mut Party, pre_key_id: u32, signed_pre_key_id: u32) -> PreKeyBundle {
    let pre_key = add_pre_key(bob, pre_key_id);
    let (signed_pre_key, signature) = add_signed_pre_key(bob, signed_pre_key_id);
    PreKeyBundle {
        registration_id: bob.store.local_registration_id().unwrap(),
        device_id: 1,
        pre_key_id: Some(pre_key_id),
        pre_key: Some(pre_key),
        signed_pre_key_id: Some(signed_pre_key_id),
        signed_pre_key: Some(signed_pre_key),
        signed_pre_key_signature: Some(signature),
        identity_key: bob.identity_public(),
    }
}

fn v2_bundle(bob: &mut Party, pre_key_id: u32) -> PreKeyBundle {
    let pre_key = add_pre_key(bob, pre_key_id);
    PreKeyBundle {
        registration_id: bob.store.local_registration_id().unwrap(),
        device_id: 1,
        pre_key_id: Some(pre_key_id),
        pre_key: Some(pre_key),
        signed_pre_key_id: None,
        signed_pre_key: None,
        signed_pre_key_signature: None,
        identity_key: bob.identity_public(),
    }
}

#[test]
fn bundle_establishment_then_identity_change_is_untrusted() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut alice = Party::new("alice", 1);
    let mut bob = Party::new("bob", 2);
    let bundle = v3_bundle(&mut bob, 11, 7);

    alice
        .builder(bob.address.clone())
        .process_pre_key_bundle(&bundle)
        .unwrap();
    assert!(alice.store.contains_session(&bob.address).unwrap());

    let mut impostor_bundle = bundle.clone();
    impostor_bundle.identity_key = IdentityKeyPair::generate().public;
    let err = alice
        .builder(bob.address.clone())
        .process_pre_key_bundle(&impostor_bundle)
        .unwrap_err();
    assert!(matches!(err, BuilderError::UntrustedIdentity(_)));
}

#[test]
fn v3_whisper_message_installs_once_then_is_a_duplicate_no_op() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut alice = Party::new("alice", 1);
    let mut bob = Party::new("bob", 2);
    let bundle = v3_bundle(&mut bob, 11, 7);

    alice
        .builder(bob.address.clone())
        .process_pre_key_bundle(&bundle)
        .unwrap();
    let alice_state = alice.store.load_session(&bob.address).unwrap();
    let base_key = alice_state.session_state().alice_base_key.unwrap();

    let whisper = PreKeyWhisperMessage {
        version: 3,
        registration_id: alice.store.local_registration_id().unwrap(),
        pre_key_id: Some(11),
        signed_pre_key_id: Some(7),
        base_key: X25519Public::from(base_key),
        identity_key: alice.identity_public(),
        inner_ciphertext: vec![0xAA],
    };

    let mut bob_record = bob.store.load_session(&alice.address).unwrap();
    let outcome = bob
        .builder(alice.address.clone())
        .process_pre_key_whisper_message(&mut bob_record, &whisper)
        .unwrap();
    assert_eq!(outcome, Some(11));
    bob.store.store_session(&alice.address, bob_record).unwrap();
    bob.store.remove_pre_key(11).unwrap();

    let mut bob_record_again = bob.store.load_session(&alice.address).unwrap();
    let outcome_again = bob
        .builder(alice.address.clone())
        .process_pre_key_whisper_message(&mut bob_record_again, &whisper)
        .unwrap();
    assert_eq!(outcome_again, None);
}

#[test]
fn v2_whisper_message_duplicate_vs_missing_pre_key() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut alice = Party::new("alice", 1);
    let mut bob = Party::new("bob", 2);
    let bundle = v2_bundle(&mut bob, 21);

    alice
        .builder(bob.address.clone())
        .process_pre_key_bundle(&bundle)
        .unwrap();
    let alice_state = alice.store.load_session(&bob.address).unwrap();
    let base_key = alice_state.session_state().alice_base_key.unwrap();

    let whisper = PreKeyWhisperMessage {
        version: 2,
        registration_id: alice.store.local_registration_id().unwrap(),
        pre_key_id: Some(21),
        signed_pre_key_id: None,
        base_key: X25519Public::from(base_key),
        identity_key: alice.identity_public(),
        inner_ciphertext: vec![0xBB],
    };

    let mut bob_record = bob.store.load_session(&alice.address).unwrap();
    let outcome = bob
        .builder(alice.address.clone())
        .process_pre_key_whisper_message(&mut bob_record, &whisper)
        .unwrap();
    assert_eq!(outcome, Some(21));
    bob.store.store_session(&alice.address, bob_record).unwrap();
    bob.store.remove_pre_key(21).unwrap();

    // session already exists, pre-key already consumed: a no-op, not an error
    let mut bob_record_again = bob.store.load_session(&alice.address).unwrap();
    let outcome_again = bob
        .builder(alice.address.clone())
        .process_pre_key_whisper_message(&mut bob_record_again, &whisper)
        .unwrap();
    assert_eq!(outcome_again, None);

    // a stranger with no session and no pre-key gets a hard error instead
    let stranger = AxolotlAddress::new("carol", 1);
    let mut stranger_record = SessionRecord::new();
    let err = bob
        .builder(stranger)
        .process_pre_key_whisper_message(&mut stranger_record, &whisper)
        .unwrap_err();
    assert!(matches!(err, BuilderError::InvalidKeyId(_)));
}

#[test]
fn bad_signed_pre_key_signature_is_rejected_without_mutation() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut alice = Party::new("alice", 1);
    let mut bob = Party::new("bob", 2);
    let pre_key = add_pre_key(&mut bob, 11);
    let signed = ECKeyPair::generate();
    let signed_public = *signed.public();
    bob.store
        .add_signed_pre_key(SignedPreKeyRecord::new(7, signed, vec![0u8; 64], 0));

    let bundle = PreKeyBundle {
        registration_id: bob.store.local_registration_id().unwrap(),
        device_id: 1,
        pre_key_id: Some(11),
        pre_key: Some(pre_key),
        signed_pre_key_id: Some(7),
        signed_pre_key: Some(signed_public),
        signed_pre_key_signature: Some(vec![0u8; 64]),
        identity_key: bob.identity_public(),
    };

    let err = alice
        .builder(bob.address.clone())
        .process_pre_key_bundle(&bundle)
        .unwrap_err();
    assert!(matches!(err, BuilderError::InvalidKey(_)));
    assert!(!alice.store.contains_session(&bob.address).unwrap());
}

#[test]
fn simultaneous_initiate_converges_on_one_shared_root_key() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut alice = Party::new("alice", 1);
    let mut bob = Party::new("bob", 2);

    let alice_initiate = alice.builder(bob.address.clone()).process_key_exchange_initiate().unwrap();
    let bob_initiate = bob.builder(alice.address.clone()).process_key_exchange_initiate().unwrap();

    let alice_response = alice
        .builder(bob.address.clone())
        .process_key_exchange(&bob_initiate)
        .unwrap()
        .expect("responding to an initiate always yields a response");
    let bob_response = bob
        .builder(alice.address.clone())
        .process_key_exchange(&alice_initiate)
        .unwrap()
        .expect("responding to an initiate always yields a response");

    assert!(alice_response.flags.is_simultaneous_initiate());
    assert!(bob_response.flags.is_simultaneous_initiate());

    // each side's own initiate already completed establishment while
    // responding to the peer's; the trailing responses are ignored
    let alice_final = alice
        .builder(bob.address.clone())
        .process_key_exchange(&bob_response)
        .unwrap();
    let bob_final = bob
        .builder(alice.address.clone())
        .process_key_exchange(&alice_response)
        .unwrap();
    assert!(alice_final.is_none());
    assert!(bob_final.is_none());

    let alice_record = alice.store.load_session(&bob.address).unwrap();
    let bob_record = bob.store.load_session(&alice.address).unwrap();
    assert_eq!(
        alice_record.session_state().root_key,
        bob_record.session_state().root_key
    );
    assert!(alice_record.session_state().root_key.is_some());
}

#[test]
fn stale_key_exchange_response_with_no_pending_and_no_simultaneous_flag_errors() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut erin = Party::new("erin", 1);
    let frank = Party::new("frank", 2);

    let bogus_response = KeyExchangeMessage {
        version: 3,
        max_version: 3,
        sequence: 4242,
        flags: KeyExchangeFlags::response(),
        base_key: X25519Public::from([9u8; 32]),
        base_key_signature: vec![],
        ratchet_key: X25519Public::from([8u8; 32]),
        identity_key: frank.identity_public(),
    };

    let err = erin
        .builder(frank.address.clone())
        .process_key_exchange(&bogus_response)
        .unwrap_err();
    assert!(matches!(err, BuilderError::StaleKeyExchange));
}

#[test]
fn archive_bound_holds_across_many_bundle_reestablishments() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut alice = Party::new("alice", 1);
    let mut bob = Party::new("bob", 2);

    for i in 0..(ARCHIVED_STATES_MAX as u32 + 5) {
        let bundle = v3_bundle(&mut bob, 100 + i * 2, 100 + i * 2 + 1);
        alice
            .builder(bob.address.clone())
            .process_pre_key_bundle(&bundle)
            .unwrap();
    }

    let record = alice.store.load_session(&bob.address).unwrap();
    assert_eq!(record.archive_len(), ARCHIVED_STATES_MAX);
}
