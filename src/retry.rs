// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bounded exponential backoff over a caller-classified set of transient
//! faults.

use std::future::Future;
use std::time::Duration;

use log::warn;

/// Retries `op` up to `max_attempts` times (at least 1), doubling the delay
/// after each failed attempt starting from `base_delay`. Only errors for
/// which `is_transient` returns `true` are retried; anything else, or the
/// final attempt's error, propagates to the caller.
pub async fn with_retry<T, E, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = base_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let attempts_remaining = attempt < max_attempts;
                if attempts_remaining && is_transient(&err) {
                    warn!(
                        "transient error on attempt {attempt}/{max_attempts}, retrying in {delay:?}: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    continue;
                }
                return Err(err);
            }
        }
    }
}
