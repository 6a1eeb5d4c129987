//! Connection identity

use std::fmt;

use uuid::Uuid;

/// Hex digits of the UUID shown in logs
const DISPLAY_LEN: usize = 8;

/// Identity of one accepted connection
///
/// Only compared, never used to address a client. Displays as a short hex
/// prefix to keep log lines readable; `Debug` shows the full UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

// Random, never nil.
impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Uuid::encode_buffer();
        let hex = self.0.simple().encode_lower(&mut buf);
        f.write_str(&hex[..DISPLAY_LEN])
    }
}
