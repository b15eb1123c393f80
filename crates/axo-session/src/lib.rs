//! axo-session — the Session Establishment Core: `SessionBuilder`'s state
//! machine, the `SessionRecord`/`SessionState` data model, and the store
//! contracts it is built against.
//!
//! Out of scope, by design: the cryptographic primitives themselves (see
//! `axo-crypto`), the symmetric ratchet that runs after establishment, wire
//! parsing, and persistence backends. An in-memory reference implementation
//! of the store traits defined here lives in the sibling `axo-store` crate,
//! used by this crate's own tests as a dev-dependency.
//!
//! # Module layout
//! - `address`  — `AxolotlAddress`
//! - `records`  — `PreKeyRecord`, `SignedPreKeyRecord`, `SessionState`, `SessionRecord`
//! - `store`    — `SessionStore`/`PreKeyStore`/`SignedPreKeyStore`/`IdentityKeyStore`, `StoreError`
//! - `error`    — `BuilderError`, the taxonomy surfaced at every entry point
//! - `builder`  — `SessionBuilder` and its four entry points

pub mod address;
pub mod builder;
pub mod error;
pub mod records;
pub mod store;

pub use address::AxolotlAddress;
pub use builder::{SessionBuilder, CURRENT_VERSION};
pub use error::BuilderError;
pub use records::{
    PreKeyRecord, SessionRecord, SessionState, SignedPreKeyRecord, ARCHIVED_STATES_MAX,
};
pub use store::{
    IdentityKeyStore, PreKeyStore, ProtocolStore, SessionStore, SignedPreKeyStore, StoreError,
};
