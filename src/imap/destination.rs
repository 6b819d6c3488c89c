// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;

use crate::contracts::DestinationClient;
use crate::imap::error::ImapError;
use crate::imap::session::ImapSession;

/// A connected destination (Outlook-style) mailbox, shared across every
/// route in a cycle.
pub struct ImapDestinationClient {
    session: ImapSession,
}

impl ImapDestinationClient {
    pub async fn connect(
        host: &str,
        port: u16,
        email: &str,
        access_token: &str,
        connect_timeout: Duration,
        append_timeout: Duration,
    ) -> Result<Self, ImapError> {
        let session = ImapSession::connect_xoauth2(
            host,
            port,
            email,
            access_token,
            connect_timeout,
            append_timeout,
        )
        .await?;
        Ok(Self { session })
    }
}

#[async_trait]
impl DestinationClient for ImapDestinationClient {
    async fn ensure_folder(&self, folder: &str, create_if_missing: bool) -> Result<(), ImapError> {
        self.session.ensure_folder(folder, create_if_missing).await
    }

    async fn append_raw(&self, folder: &str, raw: &[u8]) -> Result<(), ImapError> {
        self.session.append_raw(folder, raw).await
    }

    async fn close(&self) {
        self.session.close().await
    }
}
