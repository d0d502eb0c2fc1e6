//! Deduplication keys recorded in the store.
//!
//! Redelivery is the only retry mechanism, so any step that mutates state
//! records a key once it has been applied; a redelivered step finds the key
//! and skips the mutation.
//!
//! Keys are kept for a retention window and then pruned. The window must
//! outlast the longest time a message can still be redelivered, including
//! orders parked in the replenish loop; past it a redelivery would apply
//! its step again.

use chrono::{DateTime, Utc};
use common::RecordId;
use queue::{MessageId, QueueName};
use serde_json::{Value, json};
use store::{PutMode, RecordStore, ScanRequest, StoreError, Table};

use crate::error::Result;

/// Key for one reserved recipe line of an order.
pub fn reserve_key(order_id: RecordId, index: usize, ingredient_id: RecordId) -> String {
    format!("reserve:{order_id}:{index}:{ingredient_id}")
}

/// Key for one applied replenishment.
pub fn replenish_key(message_id: MessageId) -> String {
    format!("replenish:{message_id}")
}

/// Key for a message fully handled by a stage.
pub fn processed_key(queue: QueueName, message_id: MessageId) -> String {
    format!("processed:{queue}:{message_id}")
}

/// Records and looks up deduplication keys.
#[derive(Clone)]
pub struct IdempotencyGuard<S> {
    store: S,
}

impl<S: RecordStore> IdempotencyGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns true if `key` has been recorded.
    pub async fn is_recorded(&self, key: &str) -> Result<bool> {
        Ok(self.store.get(Table::Idempotency, key).await?.is_some())
    }

    /// Records `key`. Returns false if it was already present.
    pub async fn record(&self, key: &str) -> Result<bool> {
        let item = json!({ "id": key, "recordedAt": Utc::now() });
        match self.store.put(Table::Idempotency, item, PutMode::IfAbsent).await {
            Ok(()) => Ok(true),
            Err(StoreError::ConditionFailed { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes keys recorded before `cutoff`. Returns how many were removed.
    ///
    /// Keys without a readable `recordedAt` are kept.
    #[tracing::instrument(skip(self))]
    pub async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        let mut request = ScanRequest::default();
        loop {
            let page = self.store.scan(Table::Idempotency, request).await?;
            for item in &page.items {
                let Some(key) = item.get("id").and_then(Value::as_str) else {
                    continue;
                };
                if recorded_at(item).is_some_and(|at| at < cutoff)
                    && self.store.delete(Table::Idempotency, key).await?
                {
                    removed += 1;
                }
            }
            match page.last_key {
                Some(last) => request = ScanRequest::default().after(last),
                None => break,
            }
        }
        if removed > 0 {
            tracing::info!(removed, "pruned idempotency keys");
        }
        Ok(removed)
    }
}

fn recorded_at(item: &Value) -> Option<DateTime<Utc>> {
    let raw = item.get("recordedAt")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
