//! Order record and status.

mod state;

pub use state::OrderStatus;

use chrono::{DateTime, Utc};
use common::RecordId;
use serde::{Deserialize, Serialize};

/// A customer order for one recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: RecordId,
    pub recipe_id: RecordId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order with a fresh id.
    pub fn new(recipe_id: RecordId) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            recipe_id,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
