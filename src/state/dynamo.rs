// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! DynamoDB-backed implementation of the state store contract.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use super::error::{StateError, StateResult};
use super::types::{RoutePk, Watermark};
use super::StateStore;

const PENDING: &str = "PENDING";
const DONE: &str = "DONE";

pub struct DynamoStateStore {
    client: Client,
    table_name: String,
}

impl DynamoStateStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn key(pk: &RoutePk, sk: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(pk.as_str().to_string())),
            ("SK".to_string(), AttributeValue::S(sk.to_string())),
        ])
    }
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the epoch")
        .as_secs() as i64
}

fn get_n(item: &HashMap<String, AttributeValue>, key: &str) -> Option<i64> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
}

fn get_s<'a>(item: &'a HashMap<String, AttributeValue>, key: &str) -> Option<&'a str> {
    item.get(key).and_then(|v| v.as_s().ok()).map(|s| s.as_str())
}

#[async_trait]
impl StateStore for DynamoStateStore {
    async fn assert_available(&self) -> StateResult<()> {
        let response = self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| {
                StateError::Unavailable(format!("table {}: {e}", self.table_name))
            })?;

        match response.table().and_then(|t| t.table_status()) {
            Some(_) => Ok(()),
            None => Err(StateError::Unavailable(format!(
                "describe_table returned no status for {}",
                self.table_name
            ))),
        }
    }

    async fn get_watermark(&self, pk: &RoutePk) -> StateResult<Watermark> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(pk, "WATERMARK")))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StateError::Operation(format!("get_watermark: {e}")))?;

        let Some(item) = response.item() else {
            return Ok(Watermark::default());
        };
        Ok(Watermark {
            uidvalidity: get_n(item, "uidvalidity").map(|v| v as u32),
            last_uid: get_n(item, "last_uid").unwrap_or(0) as u32,
        })
    }

    async fn set_watermark(&self, pk: &RoutePk, uidvalidity: u32, last_uid: u32) -> StateResult<()> {
        let mut item = Self::key(pk, "WATERMARK");
        item.insert("uidvalidity".into(), AttributeValue::N(uidvalidity.to_string()));
        item.insert("last_uid".into(), AttributeValue::N(last_uid.to_string()));
        item.insert("updated_at".into(), AttributeValue::N(now_epoch().to_string()));

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StateError::Operation(format!("set_watermark: {e}")))?;
        Ok(())
    }

    async fn claim_uid(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<bool> {
        let sk = RoutePk::uid_sort_key(uidvalidity, uid);
        let now = now_epoch();
        let mut item = Self::key(pk, &sk);
        item.insert("status".into(), AttributeValue::S(PENDING.to_string()));
        item.insert("created_at".into(), AttributeValue::N(now.to_string()));
        item.insert("updated_at".into(), AttributeValue::N(now.to_string()));

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(SK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let is_conditional_failure = err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception());
                if is_conditional_failure {
                    Ok(false)
                } else {
                    Err(StateError::Operation(format!("claim_uid: {err}")))
                }
            }
        }
    }

    async fn finalize_uid(
        &self,
        pk: &RoutePk,
        uidvalidity: u32,
        uid: u32,
        message_id: Option<&str>,
        content_hash: &str,
        ttl_days: u32,
    ) -> StateResult<()> {
        let sk = RoutePk::uid_sort_key(uidvalidity, uid);
        let now = now_epoch();
        let ttl = now + i64::from(ttl_days) * 86_400;

        let mut item = Self::key(pk, &sk);
        item.insert("status".into(), AttributeValue::S(DONE.to_string()));
        item.insert("copied_at".into(), AttributeValue::N(now.to_string()));
        item.insert("updated_at".into(), AttributeValue::N(now.to_string()));
        item.insert(
            "rfc822_sha256".into(),
            AttributeValue::S(content_hash.to_string()),
        );
        item.insert("ttl".into(), AttributeValue::N(ttl.to_string()));
        if let Some(mid) = message_id {
            item.insert("message_id_header".into(), AttributeValue::S(mid.to_string()));
        }

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StateError::Operation(format!("finalize_uid: {e}")))?;
        Ok(())
    }

    async fn abandon_pending(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<()> {
        let sk = RoutePk::uid_sort_key(uidvalidity, uid);
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(pk, &sk)))
            .send()
            .await
            .map_err(|e| StateError::Operation(format!("abandon_pending: {e}")))?;
        Ok(())
    }

    async fn uid_record_exists(&self, pk: &RoutePk, uidvalidity: u32, uid: u32) -> StateResult<bool> {
        let sk = RoutePk::uid_sort_key(uidvalidity, uid);
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(pk, &sk)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StateError::Operation(format!("uid_record_exists: {e}")))?;
        Ok(response.item().is_some())
    }

    async fn record_failure(
        &self,
        pk: &RoutePk,
        uidvalidity: u32,
        uid: u32,
        error_message: &str,
        ttl_days: u32,
    ) -> StateResult<()> {
        let sk = RoutePk::fail_sort_key(uidvalidity, uid);
        let now = now_epoch();
        let ttl = now + i64::from(ttl_days) * 86_400;

        let existing = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(pk, &sk)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StateError::Operation(format!("record_failure (read): {e}")))?;

        let retry_count = existing
            .item()
            .and_then(|item| get_n(item, "retry_count"))
            .unwrap_or(0)
            + 1;

        let truncated: String = error_message.chars().take(1024).collect();

        let mut item = Self::key(pk, &sk);
        item.insert("last_error".into(), AttributeValue::S(truncated));
        item.insert("retry_count".into(), AttributeValue::N(retry_count.to_string()));
        item.insert("updated_at".into(), AttributeValue::N(now.to_string()));
        item.insert("ttl".into(), AttributeValue::N(ttl.to_string()));

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StateError::Operation(format!("record_failure (write): {e}")))?;
        Ok(())
    }

    async fn payload_already_copied(
        &self,
        pk: &RoutePk,
        message_id: Option<&str>,
        content_hash: &str,
    ) -> StateResult<bool> {
        let mut exclusive_start_key = None;
        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :pk AND begins_with(#sk, :prefix)")
                .expression_attribute_names("#pk", "PK")
                .expression_attribute_names("#sk", "SK")
                .expression_attribute_values(":pk", AttributeValue::S(pk.as_str().to_string()))
                .expression_attribute_values(":prefix", AttributeValue::S("UID#".to_string()))
                .consistent_read(true);
            if let Some(key) = exclusive_start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let response = request
                .send()
                .await
                .map_err(|e| StateError::Operation(format!("payload_already_copied: {e}")))?;

            for item in response.items() {
                if get_s(item, "status") != Some(DONE) {
                    continue;
                }
                if get_s(item, "rfc822_sha256") == Some(content_hash) {
                    return Ok(true);
                }
                if let Some(mid) = message_id {
                    if get_s(item, "message_id_header") == Some(mid) {
                        return Ok(true);
                    }
                }
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(false)
    }
}
