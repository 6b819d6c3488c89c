// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! OAuth2 refresh-token exchange for the source and destination providers.
//!
//! Only the refresh-token grant is implemented: routes are configured with
//! pre-obtained refresh tokens and a fresh access token is pulled once per
//! cycle, so there is no device-code flow and nothing is cached to disk.

pub mod gmail;
pub mod microsoft;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token endpoint rejected the request: {error} - {error_description}")]
    TokenError {
        error: String,
        error_description: String,
    },

    #[error("token endpoint response was missing access_token")]
    MissingAccessToken,
}

impl OAuthError {
    /// True for faults the retry wrapper should treat as transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, OAuthError::Http(_))
    }
}

/// A freshly exchanged access token. Never persisted across cycles.
#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    error: Option<String>,
    error_description: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    3600
}

pub(crate) fn parse_token_response(body: TokenResponse) -> Result<OAuthToken, OAuthError> {
    if let Some(access_token) = body.access_token {
        Ok(OAuthToken {
            access_token,
            token_type: body.token_type,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
        })
    } else if let Some(error) = body.error {
        Err(OAuthError::TokenError {
            error,
            error_description: body.error_description.unwrap_or_default(),
        })
    } else {
        Err(OAuthError::MissingAccessToken)
    }
}
