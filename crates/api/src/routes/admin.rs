//! Back-office endpoints: order status, payment status, stats, catalog.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AggregateId, Money, ProductId};
use domain::{Catalog, OrderStatus, PaymentStatus, ProductSnapshot, StatusUpdate, StockReason};
use event_store::EventStore;
use projections::OrderStats;
use serde::Deserialize;

use super::AppState;
use super::orders::OrderResponse;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct PaymentStatusRequest {
    pub status: PaymentStatus,
}

#[derive(Deserialize)]
pub struct ListProductRequest {
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
    #[serde(default)]
    pub min_stock_level: Option<u32>,
}

#[derive(Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    #[serde(default = "restock")]
    pub reason: StockReason,
}

fn restock() -> StockReason {
    StockReason::Restock
}

/// POST /admin/orders/{order_id}/status
#[tracing::instrument(skip(state, req), fields(to = %req.status))]
pub async fn change_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<AggregateId>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let mut update = StatusUpdate::to(req.status);
    if let Some(tracking) = req.tracking_number {
        update = update.with_tracking_number(tracking);
    }
    if let Some(reason) = req.reason {
        update = update.with_reason(reason);
    }

    let order = state.checkout.transition_order(order_id, update).await?;
    Ok(Json(OrderResponse::of(&order)?))
}

/// POST /admin/orders/{order_id}/payment-status
#[tracing::instrument(skip(state, req), fields(to = %req.status))]
pub async fn change_payment_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<AggregateId>,
    Json(req): Json<PaymentStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .checkout
        .set_payment_status(order_id, req.status)
        .await?;
    Ok(Json(OrderResponse::of(&order)?))
}

/// GET /admin/orders/stats
#[tracing::instrument(skip(state))]
pub async fn stats<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrderStats>, ApiError> {
    state.refresh_projections().await?;
    Ok(Json(state.order_stats.stats().await))
}

/// POST /admin/products
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn list_product<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ListProductRequest>,
) -> Result<(StatusCode, Json<ProductSnapshot>), ApiError> {
    let product = state
        .checkout
        .products()
        .list_product(
            &req.name,
            Money::from_cents(req.price_cents),
            req.stock,
            req.min_stock_level,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// POST /admin/products/{product_id}/stock
#[tracing::instrument(skip(state, req), fields(delta = req.delta))]
pub async fn adjust_stock<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<ProductId>,
    Json(req): Json<AdjustStockRequest>,
) -> Result<Json<ProductSnapshot>, ApiError> {
    let product = state
        .checkout
        .products()
        .adjust_stock(product_id, req.delta, req.reason)
        .await?;
    Ok(Json(product))
}
