//! Repository over the execution records, serializing mutate-then-persist.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backend::{StoreBackend, StoreError};
use crate::model::{ExecutionFields, ExecutionRecord};

/// In-memory map of execution records guarded by one async mutex, persisted
/// through the backend after every mutation. The mutex closes the
/// read-modify-save race between overlapping requests for the same key.
pub struct ExecutionStore {
    backend: Arc<dyn StoreBackend>,
    records: Mutex<HashMap<String, ExecutionRecord>>,
}

impl ExecutionStore {
    /// Loads the full document from the backend. A missing document yields an
    /// empty store; a malformed one propagates `StoreError::Malformed` so the
    /// process fails loudly instead of continuing with corrupt data.
    pub fn load(backend: Arc<dyn StoreBackend>) -> Result<Self, StoreError> {
        let records = backend.load()?;
        Ok(Self {
            backend,
            records: Mutex::new(records),
        })
    }

    /// Applies one accepted check-in: create-if-absent (capturing the
    /// first-request identity fields), increment the execution counter,
    /// dedupe-append the origin and bump the per-game counter. Persists and
    /// returns a snapshot of the updated record.
    pub async fn record_execution(
        &self,
        key: &str,
        fields: &ExecutionFields,
    ) -> Result<ExecutionRecord, StoreError> {
        let mut guard = self.records.lock().await;
        let record = guard.entry(key.to_string()).or_insert_with(|| ExecutionRecord {
            user: fields.user.clone(),
            display_name: fields.display_name.clone(),
            created_timestamp: fields.created_timestamp.clone(),
            ..ExecutionRecord::default()
        });

        record.executions = record.executions.saturating_add(1);
        if let Some(origin) = fields.origin.as_deref() {
            if !record.origins.iter().any(|seen| seen == origin) {
                record.origins.push(origin.to_string());
            }
        }
        let game_key = fields.game_key();
        let count = record.games.entry(game_key).or_insert(0);
        *count = count.saturating_add(1);

        let snapshot = record.clone();
        self.backend.save(&guard)?;
        Ok(snapshot)
    }

    /// Current record for `key`, if any.
    pub async fn snapshot(&self, key: &str) -> Option<ExecutionRecord> {
        self.records.lock().await.get(key).cloned()
    }

    pub async fn set_category_id(&self, key: &str, id: &str) -> Result<(), StoreError> {
        self.set_remote_id(key, id, |record| &mut record.category_id)
            .await
    }

    pub async fn set_channel_id(&self, key: &str, id: &str) -> Result<(), StoreError> {
        self.set_remote_id(key, id, |record| &mut record.channel_id)
            .await
    }

    pub async fn set_message_id(&self, key: &str, id: &str) -> Result<(), StoreError> {
        self.set_remote_id(key, id, |record| &mut record.message_id)
            .await
    }

    pub async fn set_game_message_id(&self, key: &str, id: &str) -> Result<(), StoreError> {
        self.set_remote_id(key, id, |record| &mut record.game_message_id)
            .await
    }

    /// Write-once setter for the remote identifier fields; an already-set
    /// identifier is kept and the call is a persisted no-op.
    async fn set_remote_id<F>(&self, key: &str, id: &str, field: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ExecutionRecord) -> &mut Option<String>,
    {
        let mut guard = self.records.lock().await;
        let Some(record) = guard.get_mut(key) else {
            return Ok(());
        };
        let slot = field(record);
        if slot.is_none() {
            *slot = Some(id.to_string());
            self.backend.save(&guard)?;
        }
        Ok(())
    }
}
