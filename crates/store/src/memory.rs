use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::expression::ExpressionError;
use crate::scan::MAX_PAGE_LIMIT;
use crate::store::item_key;
use crate::{
    Page, PutMode, RecordStore, Result, ReturnValues, ScanRequest, StoreError, Table,
    UpdateExpression,
};

/// In-memory record store implementation for testing and local runs.
///
/// Each table is a key-ordered map, so scans page deterministically. A
/// single write lock covers every update, which makes conditional updates
/// atomic the same way a row lock does in the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<HashMap<Table, BTreeMap<String, Value>>>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of items in a table.
    pub async fn count(&self, table: Table) -> usize {
        self.tables
            .read()
            .await
            .get(&table)
            .map_or(0, BTreeMap::len)
    }

    /// Returns every item in a table, in key order.
    pub async fn items(&self, table: Table) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(&table)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        self.tables.write().await.clear();
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Value>> {
        let tables = self.tables.read().await;
        Ok(tables.get(&table).and_then(|items| items.get(key)).cloned())
    }

    async fn put(&self, table: Table, item: Value, mode: PutMode) -> Result<()> {
        let key = item_key(table, &item)?;
        let mut tables = self.tables.write().await;
        let items = tables.entry(table).or_default();

        if mode == PutMode::IfAbsent && items.contains_key(&key) {
            return Err(StoreError::ConditionFailed { table, key });
        }

        items.insert(key, item);
        Ok(())
    }

    async fn update(
        &self,
        table: Table,
        key: &str,
        expression: UpdateExpression,
    ) -> Result<Option<Value>> {
        let mut tables = self.tables.write().await;
        let current = tables
            .get_mut(&table)
            .and_then(|items| items.get_mut(key))
            .ok_or_else(|| StoreError::NotFound {
                table,
                key: key.to_string(),
            })?;

        let updated = expression.apply(current).map_err(|e| match e {
            ExpressionError::ConditionFailed => {
                metrics::counter!("store_condition_failures_total", "table" => table.as_str())
                    .increment(1);
                StoreError::ConditionFailed {
                    table,
                    key: key.to_string(),
                }
            }
            ExpressionError::Invalid(reason) => StoreError::InvalidExpression(reason),
        })?;

        let old = std::mem::replace(current, updated);
        Ok(match expression.returns() {
            ReturnValues::None => None,
            ReturnValues::AllOld => Some(old),
            ReturnValues::AllNew => Some(current.clone()),
        })
    }

    async fn scan(&self, table: Table, request: ScanRequest) -> Result<Page<Value>> {
        let tables = self.tables.read().await;
        let Some(items) = tables.get(&table) else {
            return Ok(Page::new(Vec::new(), None));
        };

        let lower = match &request.start_key {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        let mut range = items.range((lower, Bound::Unbounded));

        let page: Vec<(String, Value)> = range
            .by_ref()
            .take(request.limit.min(MAX_PAGE_LIMIT))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let has_more = range.next().is_some();

        let last_key = if has_more {
            page.last().map(|(k, _)| k.clone())
        } else {
            None
        };
        Ok(Page::new(
            page.into_iter().map(|(_, v)| v).collect(),
            last_key,
        ))
    }

    async fn delete(&self, table: Table, key: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(&table)
            .is_some_and(|items| items.remove(key).is_some()))
    }
}
