//! Remote mirroring of per-user health state.
//!
//! Local writes are the durable source of truth for a session; the remote
//! record is a best-effort, last-writer-wins mirror. Pushes merge partial
//! fields and always stamp `lastUpdated`; pulls happen only at load time,
//! where a present remote record wins over the local cache.
//!
//! Known limitation: concurrent writes from multiple devices resolve by
//! last writer wins, with no causal ordering.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::firestore::{document_fields, to_wire_fields, FirestoreClient};

/// Characters Firestore rejects inside a path segment.
const ILLEGAL_PATH_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// Fallback id for unauthenticated sessions.
pub const GUEST_ID: &str = "guest";

/// Makes a user id safe to embed in a document path. A missing or empty
/// id maps to the guest sentinel instead of failing the call.
pub fn sanitize_user_id(user_id: Option<&str>) -> String {
    match user_id {
        Some(id) if !id.is_empty() => id
            .chars()
            .map(|c| if ILLEGAL_PATH_CHARS.contains(&c) { '_' } else { c })
            .collect(),
        _ => GUEST_ID.to_string(),
    }
}

#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Merge `fields` into the user's health record. Unspecified fields on
    /// the remote record are left untouched. Stamps `lastUpdated` (epoch ms).
    async fn push(&self, user_id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Fetch the whole health record. `Ok(None)` when none exists yet.
    async fn pull(&self, user_id: &str) -> Result<Option<Value>>;
}

fn stamp_last_updated(fields: &mut Map<String, Value>) {
    fields.insert(
        "lastUpdated".to_string(),
        json!(Utc::now().timestamp_millis()),
    );
}

/// Firestore-backed sync. The record lives at `users/{uid}/health/summary`.
#[derive(Clone)]
pub struct FirestoreSync {
    client: FirestoreClient,
}

impl FirestoreSync {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn record_path(user_id: &str) -> String {
        format!("users/{}/health/summary", sanitize_user_id(Some(user_id)))
    }
}

#[async_trait]
impl RemoteSync for FirestoreSync {
    async fn push(&self, user_id: &str, mut fields: Map<String, Value>) -> Result<()> {
        stamp_last_updated(&mut fields);
        let paths: Vec<String> = fields.keys().cloned().collect();
        let mask: Vec<&str> = paths.iter().map(String::as_str).collect();
        self.client
            .patch_document(&Self::record_path(user_id), to_wire_fields(&fields), &mask)
            .await?;
        Ok(())
    }

    async fn pull(&self, user_id: &str) -> Result<Option<Value>> {
        let doc = self.client.get_document(&Self::record_path(user_id)).await?;
        Ok(doc.map(|d| document_fields(&d)))
    }
}

/// In-memory sync backend with merge semantics, used by tests and by
/// offline sessions. Tracks push counts per user.
#[derive(Default)]
pub struct MemoryRemote {
    records: std::sync::Mutex<HashMap<String, Map<String, Value>>>,
    pushes: std::sync::Mutex<HashMap<String, usize>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_count(&self, user_id: &str) -> usize {
        self.pushes
            .lock()
            .map(|p| p.get(&sanitize_user_id(Some(user_id))).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Seed a record directly, bypassing push accounting.
    pub fn seed(&self, user_id: &str, record: Value) {
        if let (Ok(mut records), Some(obj)) = (self.records.lock(), record.as_object()) {
            records.insert(sanitize_user_id(Some(user_id)), obj.clone());
        }
    }

    /// Current value of one field, for assertions.
    pub fn field(&self, user_id: &str, name: &str) -> Option<Value> {
        self.records
            .lock()
            .ok()
            .and_then(|r| r.get(&sanitize_user_id(Some(user_id)))?.get(name).cloned())
    }
}

#[async_trait]
impl RemoteSync for MemoryRemote {
    async fn push(&self, user_id: &str, mut fields: Map<String, Value>) -> Result<()> {
        stamp_last_updated(&mut fields);
        let key = sanitize_user_id(Some(user_id));
        {
            let mut pushes = self
                .pushes
                .lock()
                .map_err(|_| anyhow::anyhow!("remote mock poisoned"))?;
            *pushes.entry(key.clone()).or_insert(0) += 1;
        }
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("remote mock poisoned"))?;
        let record = records.entry(key).or_default();
        for (k, v) in fields {
            record.insert(k, v);
        }
        Ok(())
    }

    async fn pull(&self, user_id: &str) -> Result<Option<Value>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("remote mock poisoned"))?;
        Ok(records
            .get(&sanitize_user_id(Some(user_id)))
            .map(|r| Value::Object(r.clone())))
    }
}

/// Remote backend that rejects every call; used to verify that local
/// state survives sync failures.
pub struct FailingRemote;

#[async_trait]
impl RemoteSync for FailingRemote {
    async fn push(&self, _user_id: &str, _fields: Map<String, Value>) -> Result<()> {
        Err(anyhow::anyhow!("remote unavailable"))
    }

    async fn pull(&self, _user_id: &str) -> Result<Option<Value>> {
        Err(anyhow::anyhow!("remote unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_illegal_path_characters() {
        assert_eq!(sanitize_user_id(Some("a.b#c$d[e]f")), "a_b_c_d_e_f");
        assert_eq!(sanitize_user_id(Some("plain-id_123")), "plain-id_123");
    }

    #[test]
    fn missing_id_maps_to_guest() {
        assert_eq!(sanitize_user_id(None), GUEST_ID);
        assert_eq!(sanitize_user_id(Some("")), GUEST_ID);
    }

    #[tokio::test]
    async fn push_merges_and_stamps_last_updated() {
        let remote = MemoryRemote::new();
        let mut first = Map::new();
        first.insert("waterIntake".to_string(), json!(500));
        remote.push("u1", first).await.unwrap();

        let mut second = Map::new();
        second.insert("dailySteps".to_string(), json!(4000));
        remote.push("u1", second).await.unwrap();

        let record = remote.pull("u1").await.unwrap().unwrap();
        assert_eq!(record["waterIntake"], json!(500));
        assert_eq!(record["dailySteps"], json!(4000));
        assert!(record["lastUpdated"].as_i64().unwrap() > 0);
        assert_eq!(remote.push_count("u1"), 2);
    }

    #[tokio::test]
    async fn pull_without_record_is_none() {
        let remote = MemoryRemote::new();
        assert!(remote.pull("nobody").await.unwrap().is_none());
    }
}
