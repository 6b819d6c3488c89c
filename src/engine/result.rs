// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Ok,
    PartialFailure,
    RouteError,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteRunResult {
    pub route_id: String,
    pub status: RouteStatus,
    pub copied: u32,
    pub skipped_duplicates: u32,
    pub failed: u32,
    pub detail: String,
}

impl RouteRunResult {
    pub fn route_error(route_id: String, detail: String) -> Self {
        Self {
            route_id,
            status: RouteStatus::RouteError,
            copied: 0,
            skipped_duplicates: 0,
            failed: 1,
            detail,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunResult {
    pub cycle_id: String,
    pub started_at_epoch: i64,
    pub finished_at_epoch: i64,
    pub routes_processed: usize,
    pub route_results: Vec<RouteRunResult>,
}
