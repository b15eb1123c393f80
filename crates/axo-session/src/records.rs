//! `PreKeyRecord`, `SignedPreKeyRecord`, `SessionState`, and `SessionRecord` —
//! the mutable data model a `SessionBuilder` reads and writes.

use std::collections::VecDeque;
use std::fmt;
use std::mem;

use zeroize::ZeroizeOnDrop;

use axo_crypto::keys::ECKeyPair;

/// A published one-time key. Consumed exactly once on successful inbound
/// session establishment, then removed from the store by the caller.
#[derive(Clone)]
pub struct PreKeyRecord {
    pub id: u32,
    pub key_pair: ECKeyPair,
}

impl PreKeyRecord {
    pub fn new(id: u32, key_pair: ECKeyPair) -> Self {
        Self { id, key_pair }
    }
}

/// A medium-lived signed pre-key, rotated on a slow cadence.
#[derive(Clone)]
pub struct SignedPreKeyRecord {
    pub id: u32,
    pub key_pair: ECKeyPair,
    pub signature: Vec<u8>,
    pub timestamp: u64,
}

impl SignedPreKeyRecord {
    pub fn new(id: u32, key_pair: ECKeyPair, signature: Vec<u8>, timestamp: u64) -> Self {
        Self {
            id,
            key_pair,
            signature,
            timestamp,
        }
    }
}

/// The pre-key header of an established-but-unacknowledged session, kept
/// around until the peer's first real message proves they installed it.
#[derive(Debug, Clone, Copy)]
pub struct UnacknowledgedPreKeyMessage {
    pub pre_key_id: Option<u32>,
    pub signed_pre_key_id: Option<u32>,
    pub our_base_key: [u8; 32],
}

/// In-memory record of an outbound `KeyExchangeMessage` awaiting the peer's
/// response. Holds the keypairs generated for the exchange so a
/// simultaneous-initiate collision can reuse them instead of re-negotiating.
/// Our long-term identity is not snapshotted here — there's exactly one per
/// local identity, always re-fetched from the identity store.
#[derive(Clone)]
pub struct PendingKeyExchange {
    pub sequence: u16,
    pub our_base_key: ECKeyPair,
    pub our_ratchet_key: ECKeyPair,
}

impl fmt::Debug for PendingKeyExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingKeyExchange")
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Mutable record of an established or pending session. A blank
/// `SessionState` (the `Default`) has no version, no registration ids, and no
/// ratchet keys — `SessionRecord` starts every address out with one.
///
/// `root_key`/`chain_key` are the negotiated ratchet secrets; zeroized on
/// drop, so archiving a superseded state or evicting it out of the archive
/// never leaves live key material sitting in freed memory.
#[derive(Default, Clone, ZeroizeOnDrop)]
pub struct SessionState {
    #[zeroize(skip)]
    pub session_version: u8,
    #[zeroize(skip)]
    pub local_registration_id: u32,
    #[zeroize(skip)]
    pub remote_registration_id: u32,
    /// Alice's ephemeral base-key bytes — the fingerprint distinguishing one
    /// negotiated session from another for the same address.
    #[zeroize(skip)]
    pub alice_base_key: Option<[u8; 32]>,
    pub root_key: Option<[u8; 32]>,
    pub chain_key: Option<[u8; 32]>,
    #[zeroize(skip)]
    pub unacknowledged_pre_key_message: Option<UnacknowledgedPreKeyMessage>,
    #[zeroize(skip)]
    pub pending_key_exchange: Option<PendingKeyExchange>,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("session_version", &self.session_version)
            .field("local_registration_id", &self.local_registration_id)
            .field("remote_registration_id", &self.remote_registration_id)
            .field("has_ratchet_keys", &self.root_key.is_some())
            .field(
                "has_pending_key_exchange",
                &self.pending_key_exchange.is_some(),
            )
            .finish()
    }
}

impl SessionState {
    pub fn has_pending_key_exchange(&self) -> bool {
        self.pending_key_exchange.is_some()
    }
}

/// Bound on archived superseded states per address. Oldest is evicted once
/// this is exceeded.
pub const ARCHIVED_STATES_MAX: usize = 40;

/// `(current SessionState, bounded archive of superseded states, fresh-flag)`.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    current: SessionState,
    archive: VecDeque<SessionState>,
    fresh: bool,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            current: SessionState::default(),
            archive: VecDeque::new(),
            fresh: true,
        }
    }
}

impl SessionRecord {
    /// A fresh, blank record — what `SessionStore::load_session` returns when
    /// no record exists yet for an address.
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first `archive_current_state()` or until a ratchet
    /// state is installed via `install_session_state`.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Push `current` into the archive and replace it with a blank state.
    /// Archive capacity is `ARCHIVED_STATES_MAX`; the oldest entry is
    /// evicted once that bound is exceeded.
    pub fn archive_current_state(&mut self) {
        let superseded = mem::take(&mut self.current);
        self.archive.push_front(superseded);
        while self.archive.len() > ARCHIVED_STATES_MAX {
            self.archive.pop_back();
        }
        self.fresh = false;
    }

    /// Install a freshly negotiated state as `current`.
    pub fn install_session_state(&mut self, state: SessionState) {
        self.current = state;
        self.fresh = false;
    }

    /// The replay/duplicate-establishment guard: true once a state with this
    /// exact `(version, alice_base_key)` pair has already been installed.
    /// Matches `current` first, then the archive.
    pub fn has_session_state(&self, version: u8, alice_base_key: &[u8; 32]) -> bool {
        let matches = |s: &SessionState| {
            s.session_version == version && s.alice_base_key.as_ref() == Some(alice_base_key)
        };
        matches(&self.current) || self.archive.iter().any(matches)
    }

    pub fn session_state(&self) -> &SessionState {
        &self.current
    }

    pub fn session_state_mut(&mut self) -> &mut SessionState {
        &mut self.current
    }

    pub fn archive_len(&self) -> usize {
        self.archive.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_starts_fresh_and_blank() {
        let record = SessionRecord::new();
        assert!(record.is_fresh());
        assert_eq!(record.session_state().session_version, 0);
    }

    #[test]
    fn archiving_clears_fresh_flag_and_preserves_state() {
        let mut record = SessionRecord::new();
        record.session_state_mut().session_version = 3;
        record.session_state_mut().alice_base_key = Some([7u8; 32]);
        record.archive_current_state();

        assert!(!record.is_fresh());
        assert_eq!(record.archive_len(), 1);
        assert!(record.has_session_state(3, &[7u8; 32]));
        assert_eq!(record.session_state().session_version, 0);
    }

    #[test]
    fn archive_is_bounded_and_evicts_oldest() {
        let mut record = SessionRecord::new();
        for i in 0..(ARCHIVED_STATES_MAX + 5) {
            record.session_state_mut().session_version = 3;
            record.session_state_mut().alice_base_key = Some([i as u8; 32]);
            record.archive_current_state();
        }
        assert_eq!(record.archive_len(), ARCHIVED_STATES_MAX);
        // the five oldest (i = 0..5) must have been evicted
        assert!(!record.has_session_state(3, &[0u8; 32]));
        // the most recent must still be present
        assert!(record.has_session_state(3, &[(ARCHIVED_STATES_MAX + 4) as u8; 32]));
    }
}
