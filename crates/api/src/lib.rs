//! HTTP ingress for the restaurant fulfillment saga.
//!
//! Accepts orders, recipes and ingredients, lists every table page by page,
//! and exposes health and Prometheus metrics. Orders are handed to the saga
//! through the process-orders queue; the stage workers run in the same
//! process (see `main.rs`).

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use queue::MessageQueue;
use saga::{CreateIngredient, CreateOrder, CreateRecipe, QueuePublisher};
use store::RecordStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S, Q> {
    pub store: S,
    pub create_order: CreateOrder<S, QueuePublisher<Q>>,
    pub create_recipe: CreateRecipe<S>,
    pub create_ingredient: CreateIngredient<S>,
    /// Page size when a list request names none.
    pub page_limit: usize,
}

impl<S, Q> AppState<S, Q>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    pub fn new(store: S, queue: Q, page_limit: usize) -> Self {
        Self {
            create_order: CreateOrder::new(store.clone(), QueuePublisher::new(queue)),
            create_recipe: CreateRecipe::new(store.clone()),
            create_ingredient: CreateIngredient::new(store.clone()),
            store,
            page_limit: page_limit.max(1),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, Q>(state: Arc<AppState<S, Q>>, metrics_handle: PrometheusHandle) -> Router
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::scrape))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list::<S, Q>).post(routes::orders::create::<S, Q>),
        )
        .route(
            "/kitchen/recipes",
            get(routes::kitchen::list_recipes::<S, Q>)
                .post(routes::kitchen::create_recipe::<S, Q>),
        )
        .route(
            "/kitchen/ingredients",
            get(routes::kitchen::list_ingredients::<S, Q>)
                .post(routes::kitchen::create_ingredient::<S, Q>),
        )
        .route("/purchases", get(routes::purchases::list::<S, Q>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
