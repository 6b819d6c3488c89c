// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One-shot CLI entrypoint.
//!
//! Loads configuration, wires up the state store, connectors, and token
//! refreshers, runs exactly one sync cycle, prints a JSON summary to
//! stdout, and exits. There is no in-process scheduling loop: periodic
//! invocation is an external scheduler's job (cron, a container
//! orchestrator's periodic job, etc.), which is why the process always
//! performs one cycle and exits rather than looping internally - so
//! process memory is reclaimed by the OS between cycles.
//!
//! Exit codes: 0 success, 2 configuration error, 3 store unavailable /
//! store-fatal.

use std::collections::HashMap;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::error;
use reqwest::Client as HttpClient;

use mailsync::config::{self, AppConfig};
use mailsync::engine::connectors::{
    GmailTokenRefresher, ImapDestinationConnector, ImapSourceConnector, MicrosoftTokenRefresher,
};
use mailsync::engine::{run_cycle, EngineError};
use mailsync::oauth::microsoft::MicrosoftOAuthConfig;
use mailsync::state::dynamo::DynamoStateStore;

#[derive(Parser)]
#[command(name = "mailsync", about = "One-way IMAP mailbox replicator")]
struct Cli {
    /// Run the cycle without claiming UIDs or appending any mail.
    #[arg(long)]
    dry_run: bool,
}

fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

async fn build_state_store(config: &AppConfig) -> Result<DynamoStateStore, EngineError> {
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;
    let client = aws_sdk_dynamodb::Client::new(&aws_config);
    Ok(DynamoStateStore::new(client, config.dynamodb_table.clone()))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let env = process_env();

    let config = match config::load_config(&env) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.to_lowercase()),
    )
    .init();

    let dry_run = cli.dry_run || config::is_dry_run_enabled(&env);
    let started_at_epoch = chrono::Utc::now().timestamp();

    let state = match build_state_store(&config).await {
        Ok(store) => store,
        Err(err) => {
            error!("failed to initialize state store: {err}");
            return ExitCode::from(3);
        }
    };

    let http = HttpClient::new();
    let timeout = Duration::from_secs(u64::from(config.imap_timeout_seconds));

    let source_connector = ImapSourceConnector {
        host: config.source_imap_host.clone(),
        port: config.source_imap_port,
        connect_timeout: timeout,
        append_timeout: timeout,
    };
    let source_refresher = GmailTokenRefresher { http: http.clone(), timeout };

    let destination_connector = ImapDestinationConnector {
        host: config.destination_imap_host.clone(),
        port: config.destination_imap_port,
        email: config.destination_email.clone(),
        connect_timeout: timeout,
        append_timeout: timeout,
    };
    let destination_refresher = MicrosoftTokenRefresher {
        http,
        config: MicrosoftOAuthConfig {
            tenant_id: config.ms_tenant.clone(),
            client_id: config.ms_client_id.clone(),
            client_secret: config.ms_client_secret.clone(),
        },
        refresh_token: config.ms_refresh_token.clone(),
        timeout,
    };

    let outcome = run_cycle(
        &config,
        &state,
        &source_connector,
        &source_refresher,
        &destination_connector,
        &destination_refresher,
        dry_run,
        started_at_epoch,
    )
    .await;

    match outcome {
        Ok(result) => {
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{json}"),
                Err(err) => error!("failed to serialize cycle result: {err}"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("sync cycle aborted: {err}");
            match err {
                EngineError::StoreUnavailable(_) | EngineError::Store(_) => ExitCode::from(3),
                EngineError::Transport(_) | EngineError::OAuth(_) => ExitCode::from(3),
            }
        }
    }
}
