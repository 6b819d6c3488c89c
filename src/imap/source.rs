// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;

use crate::contracts::SourceClient;
use crate::imap::error::ImapError;
use crate::imap::session::ImapSession;

const INBOX: &str = "INBOX";

/// A connected Gmail-style source account.
pub struct ImapSourceClient {
    session: ImapSession,
}

impl ImapSourceClient {
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
impl SourceClient for ImapSourceClient {
    async fn uidnamespace(&self) -> Result<u32, ImapError> {
        self.session.select_readonly_uidvalidity(INBOX).await
    }

    async fn search_after(&self, last_uid: u32) -> Result<Vec<u32>, ImapError> {
        self.session.uid_search_after(INBOX, last_uid).await
    }

    async fn search_since(&self, since: &str) -> Result<Vec<u32>, ImapError> {
        self.session.uid_search_since(INBOX, since).await
    }

    async fn fetch_raw(&self, uid: u32) -> Result<Vec<u8>, ImapError> {
        self.session.fetch_raw(uid).await
    }

    async fn close(&self) {
        self.session.close().await
    }
}
