//! axo-store — reference store implementations for `axo-session`.
//!
//! `MemoryStore` is a plain-`HashMap`-backed implementation of every store
//! trait `axo-session` defines. It is not durable across a restart and
//! exists for tests and single-process prototypes; a real deployment is
//! expected to bring its own persistence-backed implementation of those
//! traits.

pub mod memory;

pub use memory::MemoryStore;
