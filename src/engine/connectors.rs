// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Factories that turn a fresh access token into a connected client, and
//! into the token itself. Kept separate from the clients (mirroring the
//! teacher's `*_client_factory`/`*_refresh_fn` constructor-injection
//! pattern) so tests can swap in fakes without touching the Route Runner
//! or Cycle Driver.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use crate::config::RouteConfig;
use crate::contracts::{DestinationClient, SourceClient};
use crate::imap::{ImapDestinationClient, ImapError, ImapSourceClient};
use crate::oauth::{gmail, microsoft, OAuthError};

#[async_trait]
pub trait SourceConnector: Send + Sync {
    type Client: SourceClient;

    async fn connect(&self, route: &RouteConfig, access_token: &str) -> Result<Self::Client, ImapError>;
}

#[async_trait]
pub trait DestinationConnector: Send + Sync {
    type Client: DestinationClient;

    async fn connect(&self, access_token: &str) -> Result<Self::Client, ImapError>;
}

#[async_trait]
pub trait SourceTokenRefresher: Send + Sync {
    async fn refresh(&self, route: &RouteConfig) -> Result<String, OAuthError>;
}

#[async_trait]
pub trait DestinationTokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, OAuthError>;
}

pub struct ImapSourceConnector {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub append_timeout: Duration,
}

#[async_trait]
impl SourceConnector for ImapSourceConnector {
    type Client = ImapSourceClient;

    async fn connect(&self, route: &RouteConfig, access_token: &str) -> Result<Self::Client, ImapError> {
        ImapSourceClient::connect(
            &self.host,
            self.port,
            &route.source_email,
            access_token,
            self.connect_timeout,
            self.append_timeout,
        )
        .await
    }
}

pub struct ImapDestinationConnector {
    pub host: String,
    pub port: u16,
    pub email: String,
    pub connect_timeout: Duration,
    pub append_timeout: Duration,
}

#[async_trait]
impl DestinationConnector for ImapDestinationConnector {
    type Client = ImapDestinationClient;

    async fn connect(&self, access_token: &str) -> Result<Self::Client, ImapError> {
        ImapDestinationClient::connect(
            &self.host,
            self.port,
            &self.email,
            access_token,
            self.connect_timeout,
            self.append_timeout,
        )
        .await
    }
}

/// Refreshes a route's Gmail-style source token via Google's token endpoint.
pub struct GmailTokenRefresher {
    pub http: HttpClient,
    pub timeout: Duration,
}

#[async_trait]
impl SourceTokenRefresher for GmailTokenRefresher {
    async fn refresh(&self, route: &RouteConfig) -> Result<String, OAuthError> {
        let config = gmail::GmailOAuthConfig {
            client_id: route.source_client_id.clone(),
            client_secret: route.source_client_secret.clone(),
        };
        let token = gmail::refresh_access_token(&self.http, &config, &route.source_refresh_token, self.timeout).await?;
        Ok(token.access_token)
    }
}

/// Refreshes the shared Microsoft destination token.
pub struct MicrosoftTokenRefresher {
    pub http: HttpClient,
    pub config: microsoft::MicrosoftOAuthConfig,
    pub refresh_token: String,
    pub timeout: Duration,
}

#[async_trait]
impl DestinationTokenRefresher for MicrosoftTokenRefresher {
    async fn refresh(&self) -> Result<String, OAuthError> {
        let token =
            microsoft::refresh_access_token(&self.http, &self.config, &self.refresh_token, self.timeout).await?;
        Ok(token.access_token)
    }
}
