// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    /// The fail-safe gate: the backing table could not be reached. Fatal
    /// to the whole cycle before any mailbox connection is opened.
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    /// Any other store operation failed. Fatal to the current route only.
    #[error("state store error: {0}")]
    Operation(String),
}
