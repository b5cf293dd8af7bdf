//! HTTP and WebSocket server for the kitchen display system.
//!
//! Provides REST endpoints for orders and counters, the terminal WebSocket,
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::CounterRegistry;
use fanout::{BroadcastRouter, Dispatcher, SubscriptionRegistry};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{OrderService, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S>))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/create", post(routes::orders::create::<S>))
        .route("/orders/by_status", get(routes::orders::by_status::<S>))
        .route(
            "/orders/clear_all",
            axum::routing::delete(routes::orders::clear_all::<S>),
        )
        .route("/orders/ready-to-serve", get(routes::orders::ready_to_serve::<S>))
        .route(
            "/orders/update-item-status",
            post(routes::orders::update_item_status::<S>),
        )
        .route(
            "/orders/counter/{counter_id}",
            get(routes::orders::for_counter::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .put(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route(
            "/orders/{id}/update_status",
            post(routes::orders::update_status::<S>),
        )
        .route(
            "/counters",
            get(routes::counters::list::<S>).post(routes::counters::create::<S>),
        )
        .route("/counters/reset", post(routes::counters::reset::<S>))
        .route(
            "/counters/{id}",
            put(routes::counters::update::<S>).delete(routes::counters::delete::<S>),
        )
        .route(
            "/counters/{id}/categories",
            get(routes::counters::categories::<S>).post(routes::counters::assign_categories::<S>),
        )
        .route("/categories", get(routes::counters::all_categories::<S>))
        .route("/ws/orders", get(routes::ws::orders::<S>))
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

/// Creates the application state around an order store.
///
/// The returned dispatcher must be spawned for changes to reach terminals.
pub fn create_default_state<S: OrderStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> (Arc<AppState<S>>, Dispatcher) {
    let counters = CounterRegistry::new();
    let subscriptions = SubscriptionRegistry::new();
    let router = BroadcastRouter::new(subscriptions.clone());
    let (publisher, dispatcher) = Dispatcher::new(router);

    let state = Arc::new(AppState {
        orders: OrderService::new(store, counters.clone()),
        counters,
        subscriptions,
        publisher,
        subscriber_buffer: config.subscriber_buffer,
        delivery_timeout: config.delivery_timeout,
    });

    (state, dispatcher)
}
