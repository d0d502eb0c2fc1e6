//! Order ingress.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use domain::{CreateOrderRequest, Order, parse};
use queue::MessageQueue;
use serde::Serialize;
use store::{Page, RecordStore, RecordStoreExt, Table};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::ListParams;

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub id: String,
}

/// POST /orders: places an order for an existing recipe and starts its saga.
#[tracing::instrument(skip(state, body))]
pub async fn create<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let request: CreateOrderRequest = parse(Some(body.as_ref()))?;
    let order = state.create_order.handle(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            id: order.id.to_string(),
        }),
    ))
}

/// GET /orders: one page of orders.
#[tracing::instrument(skip(state))]
pub async fn list<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Order>>, ApiError>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let scan = params.scan(state.page_limit)?;
    let page = state.store.scan_records(Table::Orders, scan).await?;
    Ok(Json(page))
}
