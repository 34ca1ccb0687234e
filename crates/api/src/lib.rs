//! HTTP surface of the nursery storefront.
//!
//! Cart, checkout and order endpoints for customers, order and catalog
//! management for admins, plus health and Prometheus metrics. Handlers are
//! thin: they extract input, call the checkout coordinator or a read model,
//! and map [`error::ApiError`] to a status code.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{CheckoutCoordinator, InMemoryNotifier, InMemoryPaymentProcessor};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{CustomerOrdersView, OrderStatsView, ProjectionProcessor};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;
use routes::{admin, carts, orders, system};

/// Creates the router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(system::health))
        .route(
            "/users/{user_id}/cart",
            get(carts::get::<S>).delete(carts::clear::<S>),
        )
        .route("/users/{user_id}/cart/items", post(carts::add_item::<S>))
        .route(
            "/users/{user_id}/cart/items/{product_id}",
            axum::routing::patch(carts::update_item::<S>).delete(carts::remove_item::<S>),
        )
        .route(
            "/users/{user_id}/cart/coupon",
            post(carts::apply_coupon::<S>).delete(carts::remove_coupon::<S>),
        )
        .route("/carts/merge", post(carts::merge::<S>))
        .route(
            "/users/{user_id}/orders",
            post(orders::create::<S>).get(orders::list::<S>),
        )
        .route("/users/{user_id}/orders/{order_id}", get(orders::get::<S>))
        .route(
            "/users/{user_id}/orders/{order_id}/cancel",
            post(orders::cancel::<S>),
        )
        .route(
            "/users/{user_id}/orders/{order_id}/payment/retry",
            post(orders::retry_payment::<S>),
        )
        .route(
            "/admin/orders/{order_id}/status",
            post(admin::change_status::<S>),
        )
        .route(
            "/admin/orders/{order_id}/payment-status",
            post(admin::change_payment_status::<S>),
        )
        .route("/admin/orders/stats", get(admin::stats::<S>))
        .route("/admin/products", post(admin::list_product::<S>))
        .route(
            "/admin/products/{product_id}/stock",
            post(admin::adjust_stock::<S>),
        )
        .with_state(state)
        .route_layer(axum::middleware::from_fn(system::track_metrics))
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the coordinator, in-memory collaborators and read models over
/// `event_store`.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let payment = InMemoryPaymentProcessor::new();
    let notifier = InMemoryNotifier::new();
    let checkout = CheckoutCoordinator::with_config(
        event_store.clone(),
        payment.clone(),
        notifier.clone(),
        config.checkout_config(),
    );

    let order_history = CustomerOrdersView::new();
    let order_stats = OrderStatsView::new();
    let mut projection_processor = ProjectionProcessor::new(event_store.clone());
    projection_processor.register(Box::new(order_history.clone()));
    projection_processor.register(Box::new(order_stats.clone()));

    Arc::new(AppState {
        checkout,
        payment,
        notifier,
        order_history,
        order_stats,
        projection_processor,
        event_store,
    })
}
