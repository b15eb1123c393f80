//! `AxolotlAddress` — a remote session counterpart, identified by name and
//! device id. A given (local identity, remote address) pair owns at most one
//! session record.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxolotlAddress {
    name: String,
    device_id: u32,
}

impl AxolotlAddress {
    pub fn new(name: impl Into<String>, device_id: u32) -> Self {
        Self {
            name: name.into(),
            device_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }
}

impl fmt::Display for AxolotlAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.device_id)
    }
}
