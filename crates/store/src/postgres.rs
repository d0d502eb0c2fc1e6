use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::expression::ExpressionError;
use crate::scan::MAX_PAGE_LIMIT;
use crate::store::item_key;
use crate::{
    Page, PutMode, RecordStore, Result, ReturnValues, ScanRequest, StoreError, Table,
    UpdateExpression,
};

/// PostgreSQL-backed record store implementation.
///
/// Every table lives in one `records` relation keyed by
/// `(table_name, id)`, with the document in a JSONB `body` column.
/// Conditional updates lock the row with `SELECT ... FOR UPDATE`, evaluate
/// the expression and write the result back inside one transaction.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT body FROM records WHERE table_name = $1 AND id = $2")
            .bind(table.as_str())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("body")?)),
            None => Ok(None),
        }
    }

    async fn put(&self, table: Table, item: Value, mode: PutMode) -> Result<()> {
        let key = item_key(table, &item)?;

        let sql = match mode {
            PutMode::Overwrite => {
                r#"
                INSERT INTO records (table_name, id, body)
                VALUES ($1, $2, $3)
                ON CONFLICT (table_name, id) DO UPDATE SET body = EXCLUDED.body
                "#
            }
            PutMode::IfAbsent => {
                r#"
                INSERT INTO records (table_name, id, body)
                VALUES ($1, $2, $3)
                ON CONFLICT (table_name, id) DO NOTHING
                "#
            }
        };

        let result = sqlx::query(sql)
            .bind(table.as_str())
            .bind(&key)
            .bind(&item)
            .execute(&self.pool)
            .await?;

        if mode == PutMode::IfAbsent && result.rows_affected() == 0 {
            return Err(StoreError::ConditionFailed { table, key });
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, expression), fields(expression = %expression.render()))]
    async fn update(
        &self,
        table: Table,
        key: &str,
        expression: UpdateExpression,
    ) -> Result<Option<Value>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT body FROM records WHERE table_name = $1 AND id = $2 FOR UPDATE",
        )
        .bind(table.as_str())
        .bind(key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(StoreError::NotFound {
                table,
                key: key.to_string(),
            });
        };
        let current: Value = row.try_get("body")?;

        let updated = expression.apply(&current).map_err(|e| match e {
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

        sqlx::query("UPDATE records SET body = $3 WHERE table_name = $1 AND id = $2")
            .bind(table.as_str())
            .bind(key)
            .bind(&updated)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(match expression.returns() {
            ReturnValues::None => None,
            ReturnValues::AllOld => Some(current),
            ReturnValues::AllNew => Some(updated),
        })
    }

    async fn scan(&self, table: Table, request: ScanRequest) -> Result<Page<Value>> {
        // Fetch one extra row to learn whether another page follows.
        let fetch = i64::try_from(request.limit.min(MAX_PAGE_LIMIT)).unwrap_or(0) + 1;

        let rows = sqlx::query(
            r#"
            SELECT id, body
            FROM records
            WHERE table_name = $1 AND ($2::text IS NULL OR id > $2)
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(table.as_str())
        .bind(request.start_key.as_deref())
        .bind(fetch)
        .fetch_all(&self.pool)
        .await?;

        let has_more = rows.len() > request.limit;
        let mut items = Vec::with_capacity(rows.len().min(request.limit));
        let mut last_key = None;
        for row in rows.into_iter().take(request.limit) {
            last_key = Some(row.try_get::<String, _>("id")?);
            items.push(row.try_get::<Value, _>("body")?);
        }

        Ok(Page::new(items, if has_more { last_key } else { None }))
    }

    async fn delete(&self, table: Table, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE table_name = $1 AND id = $2")
            .bind(table.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
