//! axo-proto — value objects exchanged at the session-establishment
//! boundary: pre-key bundles, pre-key whisper messages, and key-exchange
//! messages.
//!
//! Wire-format parsing/framing is explicitly out of scope; these are
//! in-memory value objects only, constructed by a transport layer and handed
//! to `axo-session::SessionBuilder`.
//!
//! # Module layout
//! - `bundle`   — `PreKeyBundle`, the directory-published key advertisement
//! - `message`  — `PreKeyWhisperMessage`, the embedded-pre-key first message
//! - `exchange` — `KeyExchangeMessage` and its flag bits

pub mod bundle;
pub mod exchange;
pub mod message;
mod pub_key_serde;

pub use bundle::PreKeyBundle;
pub use exchange::{KeyExchangeFlags, KeyExchangeMessage};
pub use message::PreKeyWhisperMessage;
