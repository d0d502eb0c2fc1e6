use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Page, Result, ScanRequest, StoreError, UpdateExpression};

/// The tables the saga reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Orders,
    Recipes,
    Ingredients,
    Purchases,
    /// Keys of already-applied saga steps.
    Idempotency,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Orders,
        Table::Recipes,
        Table::Ingredients,
        Table::Purchases,
        Table::Idempotency,
    ];

    /// Returns the table name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Orders => "orders",
            Table::Recipes => "recipes",
            Table::Ingredients => "ingredients",
            Table::Purchases => "purchases",
            Table::Idempotency => "idempotency",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a put treats an existing item with the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PutMode {
    /// Replace any existing item.
    #[default]
    Overwrite,
    /// Fail with `ConditionFailed` if the key already exists.
    IfAbsent,
}

/// Extracts the primary key (`id`) of a document.
pub(crate) fn item_key(table: Table, item: &Value) -> Result<String> {
    item.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(StoreError::MissingKey(table))
}

/// Core trait for record store implementations.
///
/// Items are JSON objects keyed by their string `id` attribute. No
/// operation spans more than one item.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Retrieves an item by primary key.
    async fn get(&self, table: Table, key: &str) -> Result<Option<Value>>;

    /// Writes an item, keyed by its `id` attribute.
    async fn put(&self, table: Table, item: Value, mode: PutMode) -> Result<()>;

    /// Applies an update expression to an existing item atomically.
    ///
    /// Fails with `NotFound` if the item is absent and with `ConditionFailed`
    /// if the expression's condition does not hold. Returns the item as
    /// requested by the expression's [`ReturnValues`](crate::ReturnValues).
    async fn update(
        &self,
        table: Table,
        key: &str,
        expression: UpdateExpression,
    ) -> Result<Option<Value>>;

    /// Returns one page of items in key order.
    async fn scan(&self, table: Table, request: ScanRequest) -> Result<Page<Value>>;

    /// Removes an item. Returns false if it was absent.
    async fn delete(&self, table: Table, key: &str) -> Result<bool>;
}

/// Extension trait providing typed access to records.
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Retrieves and deserializes an item.
    async fn get_record<T: DeserializeOwned + Send>(
        &self,
        table: Table,
        key: &str,
    ) -> Result<Option<T>> {
        match self.get(table, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serializes and writes an item, replacing any existing one.
    async fn put_record<T: Serialize + Sync>(&self, table: Table, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.put(table, value, PutMode::Overwrite).await
    }

    /// Scans and deserializes one page of items.
    async fn scan_records<T: DeserializeOwned + Send>(
        &self,
        table: Table,
        request: ScanRequest,
    ) -> Result<Page<T>> {
        let page = self.scan(table, request).await?;
        Ok(page.try_map(serde_json::from_value)?)
    }
}

// Blanket implementation for all RecordStore implementations
impl<T: RecordStore + ?Sized> RecordStoreExt for T {}
