// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end tests for the claim/copy/finalize engine against in-memory
//! fakes of every collaborator trait. No network, filesystem, or AWS
//! access is required.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mailsync::config::{AppConfig, RouteConfig};
use mailsync::contracts::{DestinationClient, SourceClient};
use mailsync::engine::connectors::{
    DestinationConnector, DestinationTokenRefresher, SourceConnector, SourceTokenRefresher,
};
use mailsync::engine::result::RouteStatus;
use mailsync::engine::{route_runner, EngineError};
use mailsync::imap::ImapError;
use mailsync::oauth::OAuthError;
use mailsync::state::{RoutePk, StateError, StateResult, StateStore, Watermark};

// ---------------------------------------------------------------------
// In-memory state store
// ---------------------------------------------------------------------

#[derive(Clone)]
enum UidRecord {
    Pending,
    Done {
        message_id: Option<String>,
        content_hash: String,
    },
}

#[derive(Default)]
struct InMemoryStateStore {
    available: Mutex<bool>,
    watermarks: Mutex<HashMap<String, Watermark>>,
    uid_records: Mutex<HashMap<(String, u32, u32), UidRecord>>,
    failures: Mutex<Vec<(String, u32, u32, String)>>,
}

impl InMemoryStateStore {
    fn new() -> Self {
        Self {
            available: Mutex::new(true),
            ..Default::default()
        }
    }

    fn unavailable() -> Self {
        Self {
            available: Mutex::new(false),
            ..Default::default()
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn assert_available(&self) -> StateResult<()> {
        if *self.available.lock().unwrap() {
            Ok(())
        } else {
            Err(StateError::Unavailable("table not reachable".to_string()))
        }
    }

    async fn get_watermark(&self, pk: &RoutePk) -> StateResult<Watermark> {
        Ok(self
            .watermarks
            .lock()
            .unwrap()
            .get(pk.as_str())
            .copied()
            .unwrap_or_default())
    }

    async fn set_watermark(&self, pk: &RoutePk, uidvalidity: u32, last_uid: u32) -> StateResult<()> {
        self.watermarks.lock().unwrap().insert(
            pk.as_str().to_string(),
            Watermark {
                uidvalidity: Some(uidvalidity),
                last_uid,
            },
        );
        Ok(())
    }

    async fn claim_uid(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<bool> {
        let mut records = self.uid_records.lock().unwrap();
        let key = (pk.as_str().to_string(), uidvalidity, uid);
        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key, UidRecord::Pending);
        Ok(true)
    }

    async fn finalize_uid(
        &self,
        pk: &RoutePk,
        uidvalidity: u32,
        uid: u32,
        message_id: Option<&str>,
        content_hash: &str,
        _ttl_days: u32,
    ) -> StateResult<()> {
        let key = (pk.as_str().to_string(), uidvalidity, uid);
        self.uid_records.lock().unwrap().insert(
            key,
            UidRecord::Done {
                message_id: message_id.map(str::to_string),
                content_hash: content_hash.to_string(),
            },
        );
        Ok(())
    }

    async fn abandon_pending(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<()> {
        let key = (pk.as_str().to_string(), uidvalidity, uid);
        self.uid_records.lock().unwrap().remove(&key);
        Ok(())
    }

    async fn uid_record_exists(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<bool> {
        let key = (pk.as_str().to_string(), uidvalidity, uid);
        Ok(self.uid_records.lock().unwrap().contains_key(&key))
    }

    async fn record_failure(
        &self,
        pk: &RoutePk,
        uidvalidity: u32,
        uid: u32,
        error_message: &str,
        _ttl_days: u32,
    ) -> StateResult<()> {
        self.failures.lock().unwrap().push((
            pk.as_str().to_string(),
            uidvalidity,
            uid,
            error_message.to_string(),
        ));
        Ok(())
    }

    async fn payload_already_copied(
        &self,
        pk: &RoutePk,
        message_id: Option<&str>,
        content_hash: &str,
    ) -> StateResult<bool> {
        let records = self.uid_records.lock().unwrap();
        Ok(records.iter().any(|((route, _, _), record)| {
            route == pk.as_str()
                && match record {
                    UidRecord::Done {
                        message_id: done_mid,
                        content_hash: done_hash,
                    } => {
                        done_hash == content_hash
                            || (message_id.is_some() && done_mid.as_deref() == message_id)
                    }
                    UidRecord::Pending => false,
                }
        }))
    }
}

// ---------------------------------------------------------------------
// Fake source client / connector / refresher
// ---------------------------------------------------------------------

#[derive(Clone)]
struct FakeSourceClient {
    uidvalidity: u32,
    after: Vec<u32>,
    since: Vec<u32>,
    messages: HashMap<u32, Vec<u8>>,
    search_after_calls: Arc<AtomicUsize>,
    search_since_calls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl FakeSourceClient {
    fn new(uidvalidity: u32) -> Self {
        Self {
            uidvalidity,
            after: Vec::new(),
            since: Vec::new(),
            messages: HashMap::new(),
            search_after_calls: Arc::new(AtomicUsize::new(0)),
            search_since_calls: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn with_message(mut self, uid: u32, body: &str) -> Self {
        self.messages.insert(uid, body.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl SourceClient for FakeSourceClient {
    async fn uidnamespace(&self) -> Result<u32, ImapError> {
        Ok(self.uidvalidity)
    }

    async fn search_after(&self, _last_uid: u32) -> Result<Vec<u32>, ImapError> {
        self.search_after_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.after.clone())
    }

    async fn search_since(&self, _since: &str) -> Result<Vec<u32>, ImapError> {
        self.search_since_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.since.clone())
    }

    async fn fetch_raw(&self, uid: u32) -> Result<Vec<u8>, ImapError> {
        self.messages
            .get(&uid)
            .cloned()
            .ok_or_else(|| ImapError::Fetch(format!("no such uid {uid}")))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeSourceConnector {
    client: FakeSourceClient,
}

#[async_trait]
impl SourceConnector for FakeSourceConnector {
    type Client = FakeSourceClient;

    async fn connect(&self, _route: &RouteConfig, _access_token: &str) -> Result<Self::Client, ImapError> {
        Ok(self.client.clone())
    }
}

struct FakeSourceRefresher;

#[async_trait]
impl SourceTokenRefresher for FakeSourceRefresher {
    async fn refresh(&self, _route: &RouteConfig) -> Result<String, OAuthError> {
        Ok("fake-source-token".to_string())
    }
}

struct FailingGate;

#[async_trait]
impl SourceTokenRefresher for FailingGate {
    async fn refresh(&self, _route: &RouteConfig) -> Result<String, OAuthError> {
        Ok("unused".to_string())
    }
}

// ---------------------------------------------------------------------
// Fake destination client / connector / refresher
// ---------------------------------------------------------------------

#[derive(Default)]
struct FakeDestinationClient {
    appended: Mutex<Vec<(String, Vec<u8>)>>,
    fail_payloads: Vec<Vec<u8>>,
    closed: AtomicBool,
}

impl FakeDestinationClient {
    fn new(fail_payloads: Vec<Vec<u8>>) -> Self {
        Self {
            fail_payloads,
            ..Default::default()
        }
    }
}

#[async_trait]
impl DestinationClient for FakeDestinationClient {
    async fn ensure_folder(&self, _folder: &str, _create_if_missing: bool) -> Result<(), ImapError> {
        Ok(())
    }

    async fn append_raw(&self, folder: &str, raw: &[u8]) -> Result<(), ImapError> {
        if self.fail_payloads.iter().any(|p| p == raw) {
            return Err(ImapError::Command("simulated append failure".to_string()));
        }
        self.appended.lock().unwrap().push((folder.to_string(), raw.to_vec()));
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeDestinationConnector {
    fail_payloads: Vec<Vec<u8>>,
}

#[async_trait]
impl DestinationConnector for FakeDestinationConnector {
    type Client = FakeDestinationClient;

    async fn connect(&self, _access_token: &str) -> Result<Self::Client, ImapError> {
        Ok(FakeDestinationClient::new(self.fail_payloads.clone()))
    }
}

struct FakeDestinationRefresher;

#[async_trait]
impl DestinationTokenRefresher for FakeDestinationRefresher {
    async fn refresh(&self) -> Result<String, OAuthError> {
        Ok("fake-destination-token".to_string())
    }
}

// ---------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------

fn test_route(source_email: &str, destination_folder: &str) -> RouteConfig {
    RouteConfig {
        source_email: source_email.to_string(),
        source_client_id: "client-id".to_string(),
        source_client_secret: "client-secret".to_string(),
        source_refresh_token: "refresh-token".to_string(),
        destination_email: "dest@outlook.com".to_string(),
        destination_folder: destination_folder.to_string(),
        create_folder_if_missing: true,
    }
}

fn test_config(routes: Vec<RouteConfig>) -> AppConfig {
    AppConfig {
        aws_region: "us-east-1".to_string(),
        dynamodb_table: "mailsync-state".to_string(),
        destination_email: "dest@outlook.com".to_string(),
        ms_client_id: "ms-client".to_string(),
        ms_client_secret: None,
        ms_tenant: "consumers".to_string(),
        ms_refresh_token: "ms-refresh".to_string(),
        sync_interval_seconds: 300,
        uidvalidity_resync_hours: 24,
        uid_record_ttl_days: 365,
        fail_record_ttl_days: 14,
        imap_timeout_seconds: 30,
        imap_max_retries: 1,
        imap_retry_base_seconds: 0.001,
        source_imap_host: "imap.gmail.com".to_string(),
        source_imap_port: 993,
        destination_imap_host: "outlook.office365.com".to_string(),
        destination_imap_port: 993,
        log_level: "error".to_string(),
        routes,
    }
}

// ---------------------------------------------------------------------
// S1 - steady-state append
// ---------------------------------------------------------------------

#[tokio::test]
async fn s1_steady_state_append_copies_all_and_advances_watermark() {
    let route = test_route("g1@gmail.com", "Archive/Synced");
    let config = test_config(vec![route.clone()]);
    let state = InMemoryStateStore::new();
    let pk = RoutePk::new(&route.source_email, &route.destination_email, &route.destination_folder);
    state.set_watermark(&pk, 300, 100).await.unwrap();

    let mut source = FakeSourceClient::new(300);
    source.after = vec![101, 102, 103];
    for uid in &source.after.clone() {
        source = source.with_message(*uid, &format!("msg-{uid}"));
    }
    let connector = FakeSourceConnector { client: source };
    let refresher = FakeSourceRefresher;
    let destination = FakeDestinationClient::default();

    let result = route_runner::run_route(
        &route, &config, &state, &connector, &refresher, &destination, "cycle-1", false,
    )
    .await
    .unwrap();

    assert_eq!(result.status, RouteStatus::Ok);
    assert_eq!(result.copied, 3);
    assert_eq!(result.skipped_duplicates, 0);
    assert_eq!(result.failed, 0);
    assert_eq!(destination.appended.lock().unwrap().len(), 3);

    let watermark = state.get_watermark(&pk).await.unwrap();
    assert_eq!(watermark.last_uid, 103);
    assert_eq!(watermark.uidvalidity, Some(300));

    for uid in [101, 102, 103] {
        assert!(state.uid_record_exists(&pk, 300, uid).await.unwrap());
    }
}

// ---------------------------------------------------------------------
// S2 - partial failure keeps replay window
// ---------------------------------------------------------------------

#[tokio::test]
async fn s2_partial_failure_keeps_replay_window_open() {
    let route = test_route("g1@gmail.com", "Archive/Synced");
    let config = test_config(vec![route.clone()]);
    let state = InMemoryStateStore::new();
    let pk = RoutePk::new(&route.source_email, &route.destination_email, &route.destination_folder);
    state.set_watermark(&pk, 300, 100).await.unwrap();

    let mut source = FakeSourceClient::new(300);
    source.after = vec![101, 102, 103];
    source = source
        .with_message(101, "msg-101")
        .with_message(102, "msg-102")
        .with_message(103, "msg-103");
    let connector = FakeSourceConnector { client: source };
    let refresher = FakeSourceRefresher;
    let destination = FakeDestinationClient::new(vec![b"msg-102".to_vec()]);

    let result = route_runner::run_route(
        &route, &config, &state, &connector, &refresher, &destination, "cycle-2", false,
    )
    .await
    .unwrap();

    assert_eq!(result.status, RouteStatus::PartialFailure);
    assert_eq!(result.copied, 2);
    assert_eq!(result.failed, 1);

    let watermark = state.get_watermark(&pk).await.unwrap();
    // min(failed) - 1 = 101, which ties the unchanged prior watermark.
    assert_eq!(watermark.last_uid, 101);

    assert!(!state.uid_record_exists(&pk, 300, 102).await.unwrap());
    assert_eq!(state.failures.lock().unwrap().len(), 1);
}

// ---------------------------------------------------------------------
// S3 - UIDVALIDITY change triggers resync with content dedupe
// ---------------------------------------------------------------------

#[tokio::test]
async fn s3_uidvalidity_change_triggers_resync_with_dedupe() {
    let route = test_route("g1@gmail.com", "Archive/Synced");
    let config = test_config(vec![route.clone()]);
    let state = InMemoryStateStore::new();
    let pk = RoutePk::new(&route.source_email, &route.destination_email, &route.destination_folder);
    state.set_watermark(&pk, 100, 50).await.unwrap();

    // Pre-seed a DONE record whose content hash matches UID 60's body, as if
    // it was already copied under the prior UIDVALIDITY namespace.
    let already_copied_body = b"duplicate-body".to_vec();
    let hash = mailsync::fingerprint::content_hash(&already_copied_body);
    state
        .finalize_uid(&pk, 100, 999, None, &hash, 365)
        .await
        .unwrap();

    let mut source = FakeSourceClient::new(200);
    source.since = vec![60, 61];
    source = source.with_message(60, "duplicate-body").with_message(61, "fresh-body");
    let search_since_calls = source.search_since_calls.clone();
    let search_after_calls = source.search_after_calls.clone();
    let connector = FakeSourceConnector { client: source };
    let refresher = FakeSourceRefresher;
    let destination = FakeDestinationClient::default();

    let result = route_runner::run_route(
        &route, &config, &state, &connector, &refresher, &destination, "cycle-3", false,
    )
    .await
    .unwrap();

    assert_eq!(search_since_calls.load(Ordering::SeqCst), 1);
    assert_eq!(search_after_calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.copied, 1);
    assert_eq!(result.skipped_duplicates, 1);

    let watermark = state.get_watermark(&pk).await.unwrap();
    assert_eq!(watermark.uidvalidity, Some(200));
    assert_eq!(watermark.last_uid, 61);
}

// ---------------------------------------------------------------------
// S4 - multi-route isolation (via the cycle driver)
// ---------------------------------------------------------------------

struct MultiRouteSourceConnector {
    clients: HashMap<String, FakeSourceClient>,
}

#[async_trait]
impl SourceConnector for MultiRouteSourceConnector {
    type Client = FakeSourceClient;

    async fn connect(&self, route: &RouteConfig, _access_token: &str) -> Result<Self::Client, ImapError> {
        Ok(self.clients.get(&route.source_email).cloned().unwrap())
    }
}

#[tokio::test]
async fn s4_multi_route_isolation_uses_independent_watermarks() {
    let route_a = test_route("g1@gmail.com", "Folder1");
    let route_b = test_route("g2@gmail.com", "Folder2");
    let config = test_config(vec![route_a.clone(), route_b.clone()]);

    let state = InMemoryStateStore::new();
    let pk_a = RoutePk::new(&route_a.source_email, &route_a.destination_email, &route_a.destination_folder);
    let pk_b = RoutePk::new(&route_b.source_email, &route_b.destination_email, &route_b.destination_folder);
    state.set_watermark(&pk_a, 700, 10).await.unwrap();
    state.set_watermark(&pk_b, 800, 20).await.unwrap();

    let mut client_a = FakeSourceClient::new(700);
    client_a.after = vec![11];
    client_a = client_a.with_message(11, "a-11");

    let mut client_b = FakeSourceClient::new(800);
    client_b.after = vec![21];
    client_b = client_b.with_message(21, "b-21");

    let source_connector = MultiRouteSourceConnector {
        clients: HashMap::from([
            ("g1@gmail.com".to_string(), client_a),
            ("g2@gmail.com".to_string(), client_b),
        ]),
    };
    let source_refresher = FakeSourceRefresher;
    let destination_connector = FakeDestinationConnector { fail_payloads: vec![] };
    let destination_refresher = FakeDestinationRefresher;

    let result = mailsync::engine::run_cycle(
        &config,
        &state,
        &source_connector,
        &source_refresher,
        &destination_connector,
        &destination_refresher,
        false,
        0,
    )
    .await
    .unwrap();

    assert_eq!(result.routes_processed, 2);
    assert!(result.route_results.iter().all(|r| r.status == RouteStatus::Ok && r.copied == 1));

    let watermark_a = state.get_watermark(&pk_a).await.unwrap();
    let watermark_b = state.get_watermark(&pk_b).await.unwrap();
    assert_eq!(watermark_a.last_uid, 11);
    assert_eq!(watermark_b.last_uid, 21);
}

// ---------------------------------------------------------------------
// S5 - fail-safe abort
// ---------------------------------------------------------------------

#[tokio::test]
async fn s5_fail_safe_gate_aborts_before_any_client_is_built() {
    let route = test_route("g1@gmail.com", "Archive/Synced");
    let config = test_config(vec![route]);
    let state = InMemoryStateStore::unavailable();

    let connect_attempts = Arc::new(AtomicUsize::new(0));

    struct CountingSourceConnector {
        attempts: Arc<AtomicUsize>,
    }
    #[async_trait]
    impl SourceConnector for CountingSourceConnector {
        type Client = FakeSourceClient;
        async fn connect(&self, _route: &RouteConfig, _access_token: &str) -> Result<Self::Client, ImapError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSourceClient::new(1))
        }
    }

    let source_connector = CountingSourceConnector {
        attempts: connect_attempts.clone(),
    };
    let source_refresher = FailingGate;
    let destination_connector = FakeDestinationConnector { fail_payloads: vec![] };
    let destination_refresher = FakeDestinationRefresher;

    let result = mailsync::engine::run_cycle(
        &config,
        &state,
        &source_connector,
        &source_refresher,
        &destination_connector,
        &destination_refresher,
        false,
        0,
    )
    .await;

    assert!(matches!(result, Err(EngineError::StoreUnavailable(_))));
    assert_eq!(connect_attempts.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------
// S6 / claim-finalize laws - idempotent claim under concurrency
// ---------------------------------------------------------------------

#[tokio::test]
async fn s6_second_claim_on_same_uid_is_rejected() {
    let route = test_route("g1@gmail.com", "Archive/Synced");
    let pk = RoutePk::new(&route.source_email, &route.destination_email, &route.destination_folder);
    let state = InMemoryStateStore::new();

    assert!(state.claim_uid(&pk, 200, 999).await.unwrap());
    assert!(!state.claim_uid(&pk, 200, 999).await.unwrap());
}

#[tokio::test]
async fn claim_finalize_abandon_laws_hold() {
    let route = test_route("g1@gmail.com", "Archive/Synced");
    let pk = RoutePk::new(&route.source_email, &route.destination_email, &route.destination_folder);
    let state = InMemoryStateStore::new();

    assert!(state.claim_uid(&pk, 1, 1).await.unwrap());
    state.finalize_uid(&pk, 1, 1, None, "hash", 30).await.unwrap();
    assert!(!state.claim_uid(&pk, 1, 1).await.unwrap());

    assert!(state.claim_uid(&pk, 1, 2).await.unwrap());
    state.abandon_pending(&pk, 1, 2).await.unwrap();
    assert!(state.claim_uid(&pk, 1, 2).await.unwrap());
}

// ---------------------------------------------------------------------
// Dry-run purity
// ---------------------------------------------------------------------

#[tokio::test]
async fn dry_run_never_claims_appends_or_advances_the_watermark() {
    let route = test_route("g1@gmail.com", "Archive/Synced");
    let config = test_config(vec![route.clone()]);
    let state = InMemoryStateStore::new();
    let pk = RoutePk::new(&route.source_email, &route.destination_email, &route.destination_folder);
    state.set_watermark(&pk, 300, 100).await.unwrap();

    let mut source = FakeSourceClient::new(300);
    source.after = vec![101];
    source = source.with_message(101, "msg-101");
    let connector = FakeSourceConnector { client: source };
    let refresher = FakeSourceRefresher;
    let destination = FakeDestinationClient::default();

    let result = route_runner::run_route(
        &route, &config, &state, &connector, &refresher, &destination, "cycle-dry", true,
    )
    .await
    .unwrap();

    assert_eq!(result.copied, 0);
    assert!(destination.appended.lock().unwrap().is_empty());
    assert!(!state.uid_record_exists(&pk, 300, 101).await.unwrap());

    let watermark = state.get_watermark(&pk).await.unwrap();
    assert_eq!(watermark.last_uid, 100);
}

// ---------------------------------------------------------------------
// Hash determinism (delegates to fingerprint::content_hash, exercised
// more thoroughly in src/fingerprint.rs's own unit tests)
// ---------------------------------------------------------------------

#[test]
fn content_hash_is_stable_across_calls() {
    let a = mailsync::fingerprint::content_hash(b"same body");
    let b = mailsync::fingerprint::content_hash(b"same body");
    assert_eq!(a, b);
}
