// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Message identity: a stable content hash and the `Message-ID` header,
//! used together to detect whether a message has already been copied.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 over the raw message bytes.
pub fn content_hash(raw: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw);
    hex::encode(hasher.finalize())
}

/// The trimmed `Message-ID` header value, or `None` if absent or unparseable.
pub fn extract_message_id(raw: &[u8]) -> Option<String> {
    let message = mail_parser::MessageParser::default().parse(raw)?;
    message
        .message_id()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        let a = content_hash(b"hello world");
        let b = content_hash(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn content_hash_changes_with_any_byte() {
        let a = content_hash(b"hello world");
        let b = content_hash(b"hello worle");
        assert_ne!(a, b);
    }

    #[test]
    fn extracts_message_id_header() {
        let raw = b"From: a@example.com\r\nMessage-ID: <abc123@example.com>\r\n\r\nbody";
        assert_eq!(
            extract_message_id(raw).as_deref(),
            Some("<abc123@example.com>")
        );
    }

    #[test]
    fn missing_message_id_is_none() {
        let raw = b"From: a@example.com\r\n\r\nbody";
        assert_eq!(extract_message_id(raw), None);
    }
}
