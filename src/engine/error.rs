// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::imap::ImapError;
use crate::oauth::OAuthError;
use crate::state::StateError;

/// Fatal-to-the-cycle (or fatal-to-the-route) faults. Per-UID append
/// failures never reach this type; they are recorded and absorbed inside
/// the Route Runner.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The fail-safe gate tripped. Fatal to the whole cycle.
    #[error("state store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("state store error: {0}")]
    Store(String),

    #[error(transparent)]
    Transport(#[from] ImapError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Transport(e) => e.is_transient(),
            EngineError::OAuth(e) => e.is_transient(),
            EngineError::Store(_) | EngineError::StoreUnavailable(_) => false,
        }
    }
}

impl From<StateError> for EngineError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Unavailable(msg) => EngineError::StoreUnavailable(msg),
            StateError::Operation(msg) => EngineError::Store(msg),
        }
    }
}
