// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Microsoft identity platform token refresh, used to obtain access tokens
//! for the Outlook/Microsoft 365 destination mailbox.

use std::time::Duration;

use reqwest::Client;

use super::{parse_token_response, OAuthError, OAuthToken, TokenResponse};

const SCOPE: &str = "https://outlook.office.com/IMAP.AccessAsUser.All offline_access";

#[derive(Debug, Clone)]
pub struct MicrosoftOAuthConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl MicrosoftOAuthConfig {
    fn token_endpoint(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        )
    }
}

/// Exchanges a refresh token for a fresh access token.
pub async fn refresh_access_token(
    http: &Client,
    config: &MicrosoftOAuthConfig,
    refresh_token: &str,
    timeout: Duration,
) -> Result<OAuthToken, OAuthError> {
    let mut params = vec![
        ("client_id", config.client_id.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
        ("scope", SCOPE),
    ];
    if let Some(secret) = &config.client_secret {
        params.push(("client_secret", secret.as_str()));
    }

    let response = http
        .post(config.token_endpoint())
        .timeout(timeout)
        .form(&params)
        .send()
        .await?;
    let body: TokenResponse = response.json().await?;
    parse_token_response(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_endpoint_uses_configured_tenant() {
        let config = MicrosoftOAuthConfig {
            tenant_id: "contoso-tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: None,
        };
        assert_eq!(
            config.token_endpoint(),
            "https://login.microsoftonline.com/contoso-tenant/oauth2/v2.0/token"
        );
    }
}
