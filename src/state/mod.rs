// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub mod dynamo;
pub mod error;
pub mod types;

pub use error::{StateError, StateResult};
pub use types::{RoutePk, Watermark};

use async_trait::async_trait;

/// The durable key-value contract the engine drives for every route.
///
/// All operations are atomic at the record level. `claim_uid` is the sole
/// cross-process concurrency primitive: exactly one caller observes `true`
/// for any given `(pk, uidvalidity, uid)`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fails fast with `StateError::Unavailable` if the backing table cannot
    /// be reached. Must be called before any source/destination connection
    /// is opened for a cycle.
    async fn assert_available(&self) -> StateResult<()>;

    async fn get_watermark(&self, pk: &RoutePk) -> StateResult<Watermark>;

    async fn set_watermark(&self, pk: &RoutePk, uidvalidity: u32, last_uid: u32) -> StateResult<()>;

    /// Conditionally creates a PENDING record. Returns `true` if this call
    /// created it, `false` if a record (PENDING or DONE) already existed.
    async fn claim_uid(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<bool>;

    async fn finalize_uid(
        &self,
        pk: &RoutePk,
        uidvalidity: u32,
        uid: u32,
        message_id: Option<&str>,
        content_hash: &str,
        ttl_days: u32,
    ) -> StateResult<()>;

    async fn abandon_pending(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<()>;

    async fn uid_record_exists(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<bool>;

    async fn record_failure(
        &self,
        pk: &RoutePk,
        uidvalidity: u32,
        uid: u32,
        error_message: &str,
        ttl_days: u32,
    ) -> StateResult<()>;

    /// Scans the route's DONE records for a matching content hash or
    /// Message-ID. Used only during a UIDVALIDITY resync pass.
    async fn payload_already_copied(
        &self,
        pk: &RoutePk,
        message_id: Option<&str>,
        content_hash: &str,
    ) -> StateResult<bool>;
}
