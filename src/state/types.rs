// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

/// Partition key identifying one route in the state store's keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutePk(String);

impl RoutePk {
    pub fn new(source_account: &str, destination_mailbox: &str, folder: &str) -> Self {
        Self(format!(
            "ROUTE#{source_account}#DEST#{destination_mailbox}#FOLDER#{folder}"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn uid_sort_key(uidvalidity: u32, uid: u32) -> String {
        format!("UID#{uidvalidity}#{uid}")
    }

    pub(crate) fn fail_sort_key(uidvalidity: u32, uid: u32) -> String {
        format!("FAIL#{uidvalidity}#{uid}")
    }
}

impl fmt::Display for RoutePk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-route replay position. `uidvalidity` is absent until the route has
/// completed at least one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Watermark {
    pub uidvalidity: Option<u32>,
    pub last_uid: u32,
}
