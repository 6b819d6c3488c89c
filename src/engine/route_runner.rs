// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Executes one source-to-destination route end to end: claim/copy/finalize
//! per candidate UID, then advances the route's watermark.

use std::time::Duration;

use chrono::Utc;
use log::info;

use crate::config::{AppConfig, RouteConfig};
use crate::contracts::DestinationClient;
use crate::engine::connectors::{SourceConnector, SourceTokenRefresher};
use crate::engine::error::EngineError;
use crate::engine::result::{RouteRunResult, RouteStatus};
use crate::fingerprint;
use crate::retry::with_retry;
use crate::state::{RoutePk, StateStore};

/// Runs one route to completion. Per-UID append failures are recorded and
/// absorbed here; only setup-phase faults (token refresh, connect, folder
/// setup, UIDVALIDITY lookup, search) propagate to the caller, which the
/// Cycle Driver turns into a `route_error` result.
pub async fn run_route<Store, Conn, Refresher, Dest>(
    route: &RouteConfig,
    config: &AppConfig,
    state: &Store,
    connector: &Conn,
    refresher: &Refresher,
    destination: &Dest,
    cycle_id: &str,
    dry_run: bool,
) -> Result<RouteRunResult, EngineError>
where
    Store: StateStore,
    Conn: SourceConnector,
    Refresher: SourceTokenRefresher,
    Dest: DestinationClient,
{
    let route_id = route.route_id();
    info!("route_cycle_started cycle_id={cycle_id} route_id={route_id}");

    let max_attempts = config.imap_max_retries;
    let base_delay = Duration::from_secs_f64(config.imap_retry_base_seconds);

    let pk = RoutePk::new(&route.source_email, &route.destination_email, &route.destination_folder);
    let watermark = state.get_watermark(&pk).await?;

    let access_token = with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
        refresher.refresh(route).await.map_err(EngineError::from)
    })
    .await?;

    let source = with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
        connector.connect(route, &access_token).await.map_err(EngineError::from)
    })
    .await?;

    let result = run_route_body(
        route, &route_id, config, state, &pk, watermark, &source, destination, cycle_id, dry_run,
        max_attempts, base_delay,
    )
    .await;

    source.close().await;
    info!("route_cycle_finished cycle_id={cycle_id} route_id={route_id}");
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_route_body<Store, Src, Dest>(
    route: &RouteConfig,
    route_id: &str,
    config: &AppConfig,
    state: &Store,
    pk: &RoutePk,
    watermark: crate::state::Watermark,
    source: &Src,
    destination: &Dest,
    cycle_id: &str,
    dry_run: bool,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<RouteRunResult, EngineError>
where
    Store: StateStore,
    Src: crate::contracts::SourceClient,
    Dest: DestinationClient,
{
    with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
        destination
            .ensure_folder(&route.destination_folder, route.create_folder_if_missing)
            .await
            .map_err(EngineError::from)
    })
    .await?;

    let current_uidvalidity = with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
        source.uidnamespace().await.map_err(EngineError::from)
    })
    .await?;

    let resync = watermark.uidvalidity.is_some_and(|prior| prior != current_uidvalidity);

    let candidate_uids = if resync {
        let since = (Utc::now() - chrono::Duration::hours(i64::from(config.uidvalidity_resync_hours)))
            .format("%d-%b-%Y")
            .to_string();
        with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
            source.search_since(&since).await.map_err(EngineError::from)
        })
        .await?
    } else {
        with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
            source.search_after(watermark.last_uid).await.map_err(EngineError::from)
        })
        .await?
    };

    let mut copied = 0u32;
    let mut skipped_duplicates = 0u32;
    let mut failed = 0u32;
    let mut processed_uids: Vec<u32> = Vec::new();
    let mut failed_uids: Vec<u32> = Vec::new();

    for uid in candidate_uids {
        processed_uids.push(uid);

        let raw = with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
            source.fetch_raw(uid).await.map_err(EngineError::from)
        })
        .await?;

        let message_id = fingerprint::extract_message_id(&raw);
        let content_hash = fingerprint::content_hash(&raw);

        if resync
            && state
                .payload_already_copied(pk, message_id.as_deref(), &content_hash)
                .await?
        {
            skipped_duplicates += 1;
            info!("resync_duplicate_detected cycle_id={cycle_id} route_id={route_id}");
            continue;
        }

        if dry_run {
            if state.uid_record_exists(pk, current_uidvalidity, uid).await? {
                skipped_duplicates += 1;
                info!("dry_run_duplicate_skip cycle_id={cycle_id} route_id={route_id}");
            } else {
                info!("dry_run_would_copy cycle_id={cycle_id} route_id={route_id}");
            }
            continue;
        }

        let claimed = state.claim_uid(pk, current_uidvalidity, uid).await?;
        if !claimed {
            skipped_duplicates += 1;
            info!("uid_already_claimed_or_done_skip cycle_id={cycle_id} route_id={route_id}");
            continue;
        }

        let append_result = with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
            destination.append_raw(&route.destination_folder, &raw).await.map_err(EngineError::from)
        })
        .await;

        match append_result {
            Ok(()) => {
                state
                    .finalize_uid(
                        pk,
                        current_uidvalidity,
                        uid,
                        message_id.as_deref(),
                        &content_hash,
                        config.uid_record_ttl_days,
                    )
                    .await?;
                copied += 1;
            }
            Err(err) => {
                failed += 1;
                failed_uids.push(uid);
                state.abandon_pending(pk, current_uidvalidity, uid).await?;
                state
                    .record_failure(pk, current_uidvalidity, uid, &err.to_string(), config.fail_record_ttl_days)
                    .await?;
                log::error!("message_copy_failed_continue cycle_id={cycle_id} route_id={route_id}: {err}");
            }
        }
    }

    if !dry_run {
        let new_last_uid = if processed_uids.is_empty() {
            watermark.last_uid
        } else if let Some(min_failed) = failed_uids.iter().min() {
            watermark.last_uid.max(min_failed.saturating_sub(1))
        } else {
            watermark.last_uid.max(*processed_uids.iter().max().expect("non-empty"))
        };
        state.set_watermark(pk, current_uidvalidity, new_last_uid).await?;
    }

    let status = if failed == 0 { RouteStatus::Ok } else { RouteStatus::PartialFailure };
    Ok(RouteRunResult {
        route_id: route_id.to_string(),
        status,
        copied,
        skipped_duplicates,
        failed,
        detail: format!("copied={copied}, skipped_duplicates={skipped_duplicates}, failed={failed}"),
    })
}
