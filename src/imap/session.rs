// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A single IMAP session type shared by both the source and destination
//! sides of a route. The wire protocol is identical in both directions;
//! what differs is which subset of operations each side calls (see
//! `crate::contracts`).

use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use async_imap::Client as AsyncImapInternalClient;
use log::{debug, info};
use native_tls::TlsConnector;
use tokio::net::TcpStream as TokioTcpStream;
use tokio::sync::Mutex as TokioMutex;
use tokio_native_tls::TlsConnector as TokioTlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::imap::error::ImapError;
use crate::imap::xoauth2::XOAuth2Authenticator;

pub type TlsImapSession =
    async_imap::Session<Compat<tokio_native_tls::TlsStream<TokioTcpStream>>>;

/// A connected, authenticated IMAP session.
///
/// Wraps the `async-imap` session behind a mutex so a single connection
/// can be driven from sequential `&self` calls; append runs on a blocking
/// thread with its own timeout since the underlying socket read/write
/// timeouts alone don't bound a stalled server well.
#[derive(Debug, Clone)]
pub struct ImapSession {
    session: Arc<TokioMutex<TlsImapSession>>,
    append_timeout: Duration,
}

impl ImapSession {
    /// Connects and authenticates via SASL XOAUTH2.
    pub async fn connect_xoauth2(
        host: &str,
        port: u16,
        email: &str,
        access_token: &str,
        connect_timeout: Duration,
        append_timeout: Duration,
    ) -> Result<Self, ImapError> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ImapError::Connection(format!("could not resolve {host}:{port}")))?;

        info!("connecting to IMAP host {addr} (XOAUTH2, as {email})");

        let tcp_stream = tokio::time::timeout(connect_timeout, TokioTcpStream::connect(addr))
            .await
            .map_err(|_| ImapError::Timeout("TCP connect timed out".into()))??;
        tcp_stream.set_nodelay(true)?;

        let std_stream = tcp_stream.into_std()?;
        std_stream.set_read_timeout(Some(append_timeout))?;
        std_stream.set_write_timeout(Some(append_timeout))?;
        let tcp_stream = TokioTcpStream::from_std(std_stream)?;

        let native_tls_connector = TlsConnector::builder()
            .build()
            .map_err(|e| ImapError::Tls(e.to_string()))?;
        let tls_connector = TokioTlsConnector::from(native_tls_connector);

        let tls_stream = tokio::time::timeout(connect_timeout, tls_connector.connect(host, tcp_stream))
            .await
            .map_err(|_| ImapError::Timeout("TLS handshake timed out".into()))?
            .map_err(|e| ImapError::Tls(e.to_string()))?;

        let unauthenticated = AsyncImapInternalClient::new(tls_stream.compat());
        let authenticator = XOAuth2Authenticator::new(email, access_token);

        let session = tokio::time::timeout(
            connect_timeout,
            unauthenticated.authenticate("XOAUTH2", authenticator),
        )
        .await
        .map_err(|_| ImapError::Timeout("XOAUTH2 authentication timed out".into()))?
        .map_err(|(err, _client)| ImapError::Auth(format!("XOAUTH2 auth failed: {err:?}")))?;

        info!("IMAP XOAUTH2 authentication succeeded for {email}");

        Ok(Self {
            session: Arc::new(TokioMutex::new(session)),
            append_timeout,
        })
    }

    /// Selects the mailbox read-only and returns its UIDVALIDITY.
    pub async fn select_readonly_uidvalidity(&self, mailbox: &str) -> Result<u32, ImapError> {
        let mut guard = self.session.lock().await;
        let mb = guard
            .examine(mailbox)
            .await
            .map_err(ImapError::from)?;
        mb.uid_validity
            .ok_or_else(|| ImapError::BadResponse("server did not report UIDVALIDITY".into()))
    }

    /// Selects `folder` read-only; if that fails and `create_if_missing` is
    /// set, issues CREATE and treats success as folder-ready.
    pub async fn ensure_folder(&self, folder: &str, create_if_missing: bool) -> Result<(), ImapError> {
        let mut guard = self.session.lock().await;
        match guard.examine(folder).await {
            Ok(_) => Ok(()),
            Err(_) if create_if_missing => {
                guard.create(folder).await.map_err(ImapError::from)?;
                Ok(())
            }
            Err(e) => Err(ImapError::FolderNotFound(format!("{folder}: {e}"))),
        }
    }

    /// `UID SEARCH UID n:*` — ascending, deduplicated, strictly greater than `last_uid`.
    pub async fn uid_search_after(&self, mailbox: &str, last_uid: u32) -> Result<Vec<u32>, ImapError> {
        let start = last_uid.saturating_add(1).max(1);
        let criteria = format!("UID {start}:*");
        self.uid_search_in(mailbox, &criteria, Some(last_uid)).await
    }

    /// `UID SEARCH SINCE <dd-Mon-yyyy>`.
    pub async fn uid_search_since(&self, mailbox: &str, since: &str) -> Result<Vec<u32>, ImapError> {
        let criteria = format!("SINCE {since}");
        self.uid_search_in(mailbox, &criteria, None).await
    }

    async fn uid_search_in(
        &self,
        mailbox: &str,
        criteria: &str,
        strictly_greater_than: Option<u32>,
    ) -> Result<Vec<u32>, ImapError> {
        let mut guard = self.session.lock().await;
        guard.examine(mailbox).await.map_err(ImapError::from)?;
        debug!("UID SEARCH {criteria} in {mailbox}");
        let set = guard.uid_search(criteria).await.map_err(ImapError::from)?;
        let mut uids: Vec<u32> = set.into_iter().collect();
        if let Some(floor) = strictly_greater_than {
            uids.retain(|uid| *uid > floor);
        }
        uids.sort_unstable();
        uids.dedup();
        Ok(uids)
    }

    /// `UID FETCH n BODY[]` — the raw RFC822 bytes of one message.
    pub async fn fetch_raw(&self, uid: u32) -> Result<Vec<u8>, ImapError> {
        use futures_util::TryStreamExt;
        let mut guard = self.session.lock().await;
        let mut stream = guard
            .uid_fetch(uid.to_string(), "BODY[]")
            .await
            .map_err(ImapError::from)?;
        if let Some(fetched) = stream.try_next().await.map_err(ImapError::from)? {
            fetched
                .body()
                .map(|b| b.to_vec())
                .ok_or_else(|| ImapError::Fetch(format!("UID {uid}: no body in fetch response")))
        } else {
            Err(ImapError::Fetch(format!("UID {uid}: server returned no fetch result")))
        }
    }

    /// `APPEND <folder> {bytes}` with no flag list, so the message lands unread.
    pub async fn append_raw(&self, folder: &str, raw: &[u8]) -> Result<(), ImapError> {
        let session_arc = self.session.clone();
        let folder = folder.to_string();
        let raw = raw.to_vec();
        let append_timeout = self.append_timeout;

        let blocking_task = tokio::task::spawn_blocking(move || {
            let handle = tokio::runtime::Handle::current();
            let mut guard = handle.block_on(session_arc.lock());
            handle.block_on(guard.append(&folder, &raw))
        });

        match tokio::time::timeout(append_timeout, blocking_task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(ImapError::from(e)),
            Ok(Err(join_err)) => Err(ImapError::Unknown(format!("APPEND task panicked: {join_err}"))),
            Err(_elapsed) => Err(ImapError::Timeout(format!(
                "APPEND timed out after {append_timeout:?}"
            ))),
        }
    }

    /// Best-effort logout; errors are not actionable here.
    pub async fn close(&self) {
        let mut guard = self.session.lock().await;
        let _ = guard.logout().await;
    }
}
