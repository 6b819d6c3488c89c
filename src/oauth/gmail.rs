// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Google OAuth2 token refresh, used to obtain access tokens for a Gmail
//! source mailbox.

use std::time::Duration;

use reqwest::Client;

use super::{parse_token_response, OAuthError, OAuthToken, TokenResponse};

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct GmailOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Exchanges a refresh token for a fresh access token.
pub async fn refresh_access_token(
    http: &Client,
    config: &GmailOAuthConfig,
    refresh_token: &str,
    timeout: Duration,
) -> Result<OAuthToken, OAuthError> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let response = http
        .post(TOKEN_ENDPOINT)
        .timeout(timeout)
        .form(&params)
        .send()
        .await?;
    let body: TokenResponse = response.json().await?;
    parse_token_response(body)
}
