use chrono::Utc;
use domain::{OrderStatus, UpdateStatusRequest};
use store::{RecordStore, ReturnValues, StoreError, Table, UpdateExpression};

use crate::error::{Result, SagaError};

/// Writes an order's status.
///
/// The write is an unconditional overwrite. A write that moves the status
/// backwards is applied and logged as a regression.
pub struct UpdateOrderStatus<S> {
    store: S,
}

impl<S: RecordStore> UpdateOrderStatus<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the status the order had before the write.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id, status = %request.status))]
    pub async fn handle(&self, request: UpdateStatusRequest) -> Result<OrderStatus> {
        let expression = UpdateExpression::new()
            .set("#status", ":status")
            .set("#updatedAt", ":now")
            .name("#status", "status")
            .name("#updatedAt", "updatedAt")
            .value(":status", request.status.as_str())
            .value(":now", serde_json::to_value(Utc::now())?)
            .return_values(ReturnValues::AllOld);

        let old = self
            .store
            .update(Table::Orders, &request.order_id.key(), expression)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => SagaError::OrderNotFound(request.order_id),
                e => e.into(),
            })?;

        let previous = match old.and_then(|item| item.get("status").cloned()) {
            Some(status) => serde_json::from_value(status)?,
            None => OrderStatus::default(),
        };

        if previous.is_regression(request.status) {
            tracing::warn!(
                from = %previous,
                to = %request.status,
                "Order status regression"
            );
        } else {
            tracing::info!(from = %previous, "Order status updated");
        }
        Ok(previous)
    }
}
