use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use domain::Purchase;
use queue::MessageQueue;
use store::{Page, RecordStore, RecordStoreExt, Table};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::ListParams;

/// GET /purchases: the purchase ledger, one page at a time.
#[tracing::instrument(skip(state))]
pub async fn list<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Purchase>>, ApiError>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let scan = params.scan(state.page_limit)?;
    Ok(Json(state.store.scan_records(Table::Purchases, scan).await?))
}
