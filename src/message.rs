//! Relayed message type
//!
//! There is no protocol: a message is whatever bytes one read returned.
//! The bytes are relayed unchanged; text decoding is only for logs.

use std::borrow::Cow;
use std::sync::Arc;

/// Maximum characters shown in a log preview
const PREVIEW_CHARS: usize = 80;

/// An immutable chunk of bytes read from one connection
///
/// Cloning shares the underlying buffer, so fanning one message out to many
/// destinations does not copy it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(Arc<[u8]>);

impl Message {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode as UTF-8, replacing invalid sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Short single-line rendering for logs
    pub fn preview(&self) -> String {
        let text = self.text();
        let text = text.trim_end_matches(['\r', '\n']);
        let mut preview: String = text
            .chars()
            .take(PREVIEW_CHARS)
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        if text.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }
}

impl From<&[u8]> for Message {
    fn from(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::from(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_preserved() {
        let raw = [0x68, 0x69, 0xff, 0x0a];
        let msg = Message::from(&raw[..]);
        assert_eq!(msg.as_bytes(), &raw);
        assert_eq!(msg.len(), 4);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let msg = Message::from(vec![b'o', b'k', 0xff]);
        assert_eq!(msg.text(), "ok\u{fffd}");
    }

    #[test]
    fn test_preview_strips_newline() {
        let msg = Message::from("hello\r\n");
        assert_eq!(msg.preview(), "hello");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(200);
        let msg = Message::from(long.as_str());
        let preview = msg.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_clone_shares_buffer() {
        let msg = Message::from("shared");
        let copy = msg.clone();
        assert!(Arc::ptr_eq(&msg.0, &copy.0));
    }
}
