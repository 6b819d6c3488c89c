// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The narrow per-account IMAP contracts the Route Runner drives. Kept
//! trait-based (rather than a single concrete client) so the engine can be
//! exercised against in-memory fakes in tests.

use async_trait::async_trait;

use crate::imap::ImapError;

/// Everything the engine needs from a source (Gmail-style) account.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Selects the account's inbox read-only and returns its current UIDVALIDITY.
    async fn uidnamespace(&self) -> Result<u32, ImapError>;

    /// `UID SEARCH UID n:*` — ascending UIDs strictly greater than `last_uid`.
    async fn search_after(&self, last_uid: u32) -> Result<Vec<u32>, ImapError>;

    /// `UID SEARCH SINCE <date>` — ascending UIDs with internal date >= `since`.
    async fn search_since(&self, since: &str) -> Result<Vec<u32>, ImapError>;

    /// The raw RFC822 bytes of one message.
    async fn fetch_raw(&self, uid: u32) -> Result<Vec<u8>, ImapError>;

    /// Best-effort logout.
    async fn close(&self);
}

/// Everything the engine needs from the single destination (Outlook-style) mailbox.
#[async_trait]
pub trait DestinationClient: Send + Sync {
    /// Selects `folder` read-only; creates it first if missing and permitted.
    async fn ensure_folder(&self, folder: &str, create_if_missing: bool) -> Result<(), ImapError>;

    /// Appends `raw` to `folder` without a `\Seen` flag.
    async fn append_raw(&self, folder: &str, raw: &[u8]) -> Result<(), ImapError>;

    /// Best-effort logout.
    async fn close(&self);
}
