// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Process configuration: a validated, immutable snapshot built once per
//! invocation from the environment.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("{0} must be an integer")]
    NotAnInteger(String),

    #[error("{0} must be a number")]
    NotANumber(String),

    #[error("{0} must be greater than zero")]
    NotPositive(String),

    #[error("invalid JSON in SYNC_ROUTES_JSON: {0}")]
    InvalidRoutesJson(#[from] serde_json::Error),

    #[error("SYNC_ROUTES_JSON must be a JSON array of route objects")]
    RoutesNotAnArray,

    #[error("SYNC_ROUTES_FILE does not exist: {0}")]
    RoutesFileMissing(String),

    #[error("at least one route must be provided")]
    NoRoutes,

    #[error("all routes must target one shared destination mailbox; expected {expected}, found {found}")]
    MismatchedDestination { expected: String, found: String },
}

/// One source-mailbox to destination-folder replication route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    pub source_email: String,
    pub source_client_id: String,
    pub source_client_secret: String,
    pub source_refresh_token: String,
    pub destination_email: String,
    pub destination_folder: String,
    pub create_folder_if_missing: bool,
}

impl RouteConfig {
    pub fn route_id(&self) -> String {
        format!(
            "source={}|dest={}|folder={}",
            self.source_email, self.destination_email, self.destination_folder
        )
    }
}

/// The full, validated process configuration for one invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub aws_region: String,
    pub dynamodb_table: String,
    pub destination_email: String,
    pub ms_client_id: String,
    pub ms_client_secret: Option<String>,
    pub ms_tenant: String,
    pub ms_refresh_token: String,
    pub sync_interval_seconds: u32,
    pub uidvalidity_resync_hours: u32,
    pub uid_record_ttl_days: u32,
    pub fail_record_ttl_days: u32,
    pub imap_timeout_seconds: u32,
    pub imap_max_retries: u32,
    pub imap_retry_base_seconds: f64,
    pub source_imap_host: String,
    pub source_imap_port: u16,
    pub destination_imap_host: String,
    pub destination_imap_port: u16,
    pub log_level: String,
    pub routes: Vec<RouteConfig>,
}

impl AppConfig {
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

#[derive(Debug, Deserialize)]
struct RouteObject {
    source_email: Option<String>,
    destination_email: Option<String>,
    destination_folder: Option<String>,
    source_client_id: Option<String>,
    source_client_secret: Option<String>,
    source_refresh_token: Option<String>,
    create_folder_if_missing: Option<bool>,
}

fn env_var(env: &HashMap<String, String>, name: &str) -> Option<String> {
    env.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(env: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    env_var(env, name).ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw {
        None => default,
        Some(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"),
    }
}

fn parse_int(name: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.parse().map_err(|_| ConfigError::NotAnInteger(name.to_string()))
}

fn parse_positive_int(name: &str, raw: &str) -> Result<u32, ConfigError> {
    let value = parse_int(name, raw)?;
    if value == 0 {
        return Err(ConfigError::NotPositive(name.to_string()));
    }
    Ok(value)
}

fn parse_positive_float(name: &str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| ConfigError::NotANumber(name.to_string()))?;
    if value <= 0.0 {
        return Err(ConfigError::NotPositive(name.to_string()));
    }
    Ok(value)
}

fn default_or(env: &HashMap<String, String>, name: &str, default: &str) -> String {
    env_var(env, name).unwrap_or_else(|| default.to_string())
}

fn load_route_objects(env: &HashMap<String, String>) -> Result<Vec<RouteObject>, ConfigError> {
    if let Some(raw) = env_var(env, "SYNC_ROUTES_JSON") {
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let array = value.as_array().ok_or(ConfigError::RoutesNotAnArray)?;
        return array
            .iter()
            .map(|v| serde_json::from_value(v.clone()).map_err(ConfigError::from))
            .collect();
    }

    if let Some(path) = env_var(env, "SYNC_ROUTES_FILE") {
        let raw = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::RoutesFileMissing(path.clone()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let array = value.as_array().ok_or(ConfigError::RoutesNotAnArray)?;
        return array
            .iter()
            .map(|v| serde_json::from_value(v.clone()).map_err(ConfigError::from))
            .collect();
    }

    // Backward-compatible single-route mode: one route built from discrete variables.
    Ok(vec![RouteObject {
        source_email: Some(required(env, "SOURCE_EMAIL")?),
        destination_email: None,
        destination_folder: Some(required(env, "DESTINATION_FOLDER")?),
        source_client_id: Some(required(env, "SOURCE_CLIENT_ID")?),
        source_client_secret: Some(required(env, "SOURCE_CLIENT_SECRET")?),
        source_refresh_token: Some(required(env, "SOURCE_REFRESH_TOKEN")?),
        create_folder_if_missing: None,
    }])
}

fn route_from_object(
    obj: RouteObject,
    default_destination_email: &str,
    env: &HashMap<String, String>,
) -> Result<RouteConfig, ConfigError> {
    let source_email = obj
        .source_email
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| required(env, "SOURCE_EMAIL"), Ok)?;
    let destination_folder = obj
        .destination_folder
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| required(env, "DESTINATION_FOLDER"), Ok)?;
    let destination_email = obj
        .destination_email
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default_destination_email.to_string());
    let source_client_id = obj
        .source_client_id
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| required(env, "SOURCE_CLIENT_ID"), Ok)?;
    let source_client_secret = obj
        .source_client_secret
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| required(env, "SOURCE_CLIENT_SECRET"), Ok)?;
    let source_refresh_token = obj
        .source_refresh_token
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| required(env, "SOURCE_REFRESH_TOKEN"), Ok)?;

    Ok(RouteConfig {
        source_email,
        source_client_id,
        source_client_secret,
        source_refresh_token,
        destination_email,
        destination_folder,
        create_folder_if_missing: obj.create_folder_if_missing.unwrap_or(false),
    })
}

/// Loads and validates configuration from a process environment snapshot.
pub fn load_config(env: &HashMap<String, String>) -> Result<AppConfig, ConfigError> {
    let destination_email = required(env, "DESTINATION_EMAIL")?;

    let route_objects = load_route_objects(env)?;
    if route_objects.is_empty() {
        return Err(ConfigError::NoRoutes);
    }
    let routes = route_objects
        .into_iter()
        .map(|obj| route_from_object(obj, &destination_email, env))
        .collect::<Result<Vec<_>, _>>()?;
    for route in &routes {
        if route.destination_email != destination_email {
            return Err(ConfigError::MismatchedDestination {
                expected: destination_email,
                found: route.destination_email.clone(),
            });
        }
    }

    let sync_interval_seconds = parse_positive_int(
        "SYNC_INTERVAL_SECONDS",
        &default_or(env, "SYNC_INTERVAL_SECONDS", "300"),
    )?;
    let uidvalidity_resync_hours = parse_positive_int(
        "UIDVALIDITY_RESYNC_HOURS",
        &default_or(env, "UIDVALIDITY_RESYNC_HOURS", "24"),
    )?;
    let uid_record_ttl_days = parse_positive_int(
        "UID_RECORD_TTL_DAYS",
        &default_or(env, "UID_RECORD_TTL_DAYS", "365"),
    )?;
    let fail_record_ttl_days = parse_positive_int(
        "FAIL_RECORD_TTL_DAYS",
        &default_or(env, "FAIL_RECORD_TTL_DAYS", "14"),
    )?;
    let imap_timeout_seconds = parse_positive_int(
        "IMAP_TIMEOUT_SECONDS",
        &default_or(env, "IMAP_TIMEOUT_SECONDS", "30"),
    )?;
    let imap_max_retries =
        parse_positive_int("IMAP_MAX_RETRIES", &default_or(env, "IMAP_MAX_RETRIES", "3"))?;
    let imap_retry_base_seconds = parse_positive_float(
        "IMAP_RETRY_BASE_SECONDS",
        &default_or(env, "IMAP_RETRY_BASE_SECONDS", "1.0"),
    )?;

    let source_imap_host = default_or(env, "SOURCE_IMAP_HOST", "imap.gmail.com");
    let source_imap_port =
        parse_int("SOURCE_IMAP_PORT", &default_or(env, "SOURCE_IMAP_PORT", "993"))? as u16;
    let destination_imap_host = default_or(env, "DESTINATION_IMAP_HOST", "outlook.office365.com");
    let destination_imap_port = parse_int(
        "DESTINATION_IMAP_PORT",
        &default_or(env, "DESTINATION_IMAP_PORT", "993"),
    )? as u16;

    Ok(AppConfig {
        aws_region: required(env, "AWS_REGION")?,
        dynamodb_table: required(env, "DYNAMODB_TABLE")?,
        destination_email,
        ms_client_id: required(env, "MS_CLIENT_ID")?,
        ms_client_secret: env_var(env, "MS_CLIENT_SECRET"),
        ms_tenant: default_or(env, "MS_TENANT", "consumers"),
        ms_refresh_token: required(env, "MS_REFRESH_TOKEN")?,
        sync_interval_seconds,
        uidvalidity_resync_hours,
        uid_record_ttl_days,
        fail_record_ttl_days,
        imap_timeout_seconds,
        imap_max_retries,
        imap_retry_base_seconds,
        source_imap_host,
        source_imap_port,
        destination_imap_host,
        destination_imap_port,
        log_level: default_or(env, "LOG_LEVEL", "INFO"),
        routes,
    })
}

/// Reads the `DRY_RUN` environment variable independent of full config load,
/// so a CLI invocation flag can override it without reloading everything.
pub fn is_dry_run_enabled(env: &HashMap<String, String>) -> bool {
    parse_bool(env_var(env, "DRY_RUN").as_deref(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> HashMap<String, String> {
        HashMap::from([
            ("AWS_REGION".to_string(), "us-east-1".to_string()),
            ("DYNAMODB_TABLE".to_string(), "mailsync-state".to_string()),
            ("DESTINATION_EMAIL".to_string(), "dest@outlook.com".to_string()),
            ("MS_CLIENT_ID".to_string(), "client".to_string()),
            ("MS_REFRESH_TOKEN".to_string(), "refresh".to_string()),
            ("SOURCE_EMAIL".to_string(), "src@gmail.com".to_string()),
            ("DESTINATION_FOLDER".to_string(), "Archive/Synced".to_string()),
            ("SOURCE_CLIENT_ID".to_string(), "gclient".to_string()),
            ("SOURCE_CLIENT_SECRET".to_string(), "gsecret".to_string()),
            ("SOURCE_REFRESH_TOKEN".to_string(), "grefresh".to_string()),
        ])
    }

    #[test]
    fn single_route_mode_builds_one_route_with_defaults() {
        let config = load_config(&base_env()).unwrap();
        assert_eq!(config.route_count(), 1);
        assert_eq!(config.sync_interval_seconds, 300);
        assert_eq!(config.uidvalidity_resync_hours, 24);
        assert_eq!(config.routes[0].destination_email, "dest@outlook.com");
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let mut env = base_env();
        env.remove("AWS_REGION");
        assert!(matches!(load_config(&env), Err(ConfigError::MissingVar(name)) if name == "AWS_REGION"));
    }

    #[test]
    fn multi_route_json_rejects_mismatched_destination() {
        let mut env = base_env();
        env.insert(
            "SYNC_ROUTES_JSON".to_string(),
            r#"[{"source_email":"a@gmail.com","destination_folder":"F1","source_client_id":"c","source_client_secret":"s","source_refresh_token":"r"},
               {"source_email":"b@gmail.com","destination_email":"other@outlook.com","destination_folder":"F2","source_client_id":"c","source_client_secret":"s","source_refresh_token":"r"}]"#
                .to_string(),
        );
        assert!(matches!(
            load_config(&env),
            Err(ConfigError::MismatchedDestination { .. })
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut env = base_env();
        env.insert("SYNC_INTERVAL_SECONDS".to_string(), "0".to_string());
        assert!(matches!(load_config(&env), Err(ConfigError::NotPositive(_))));
    }

    #[test]
    fn dry_run_flag_parses_common_truthy_spellings() {
        let mut env = HashMap::new();
        env.insert("DRY_RUN".to_string(), "true".to_string());
        assert!(is_dry_run_enabled(&env));
        env.insert("DRY_RUN".to_string(), "0".to_string());
        assert!(!is_dry_run_enabled(&env));
    }
}
