// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Drives one full sync cycle: checks the fail-safe gate, opens the shared
//! destination connection once, then runs every configured route against it.

use std::time::Duration;

use log::{error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::contracts::DestinationClient;
use crate::engine::connectors::{DestinationConnector, DestinationTokenRefresher, SourceConnector, SourceTokenRefresher};
use crate::engine::error::EngineError;
use crate::engine::result::{RouteRunResult, SyncRunResult};
use crate::engine::route_runner::run_route;
use crate::retry::with_retry;
use crate::state::StateStore;

/// Runs one sync cycle across every route in `config.routes`.
///
/// Returns `Err` only when the fail-safe gate trips (the state store is
/// unreachable) or the destination token/connection cannot be established —
/// both are fatal to the entire cycle. Any other per-route fault is captured
/// as a `RouteStatus::RouteError` entry in the returned result, never
/// propagated.
pub async fn run_cycle<Store, SrcConn, SrcRefresher, DestConn, DestRefresher>(
    config: &AppConfig,
    state: &Store,
    source_connector: &SrcConn,
    source_refresher: &SrcRefresher,
    destination_connector: &DestConn,
    destination_refresher: &DestRefresher,
    dry_run: bool,
    started_at_epoch: i64,
) -> Result<SyncRunResult, EngineError>
where
    Store: StateStore,
    SrcConn: SourceConnector,
    SrcRefresher: SourceTokenRefresher,
    DestConn: DestinationConnector,
    DestRefresher: DestinationTokenRefresher,
{
    let cycle_id = Uuid::new_v4().to_string();
    info!("sync_cycle_started cycle_id={cycle_id} routes={}", config.routes.len());

    state.assert_available().await?;

    let max_attempts = config.imap_max_retries;
    let base_delay = Duration::from_secs_f64(config.imap_retry_base_seconds);

    let destination_token =
        with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
            destination_refresher.refresh().await.map_err(EngineError::from)
        })
        .await?;

    let destination = with_retry(max_attempts, base_delay, EngineError::is_transient, || async {
        destination_connector.connect(&destination_token).await.map_err(EngineError::from)
    })
    .await?;

    let mut route_results: Vec<RouteRunResult> = Vec::with_capacity(config.routes.len());
    for route in &config.routes {
        let route_id = route.route_id();
        let outcome = run_route(
            route,
            config,
            state,
            source_connector,
            source_refresher,
            &destination,
            &cycle_id,
            dry_run,
        )
        .await;

        match outcome {
            Ok(result) => route_results.push(result),
            Err(err) => {
                error!("route_cycle_error cycle_id={cycle_id} route_id={route_id}: {err}");
                route_results.push(RouteRunResult::route_error(route_id, err.to_string()));
            }
        }
    }

    destination.close().await;

    let finished_at_epoch = chrono::Utc::now().timestamp();
    info!("sync_cycle_finished cycle_id={cycle_id}");

    Ok(SyncRunResult {
        cycle_id,
        started_at_epoch,
        finished_at_epoch,
        routes_processed: route_results.len(),
        route_results,
    })
}
