//! Customer order endpoints: checkout, history, cancellation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use checkout::CheckoutRequest;
use common::{AggregateId, UserId};
use domain::{
    Address, AppliedCoupon, Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, Totals,
};
use event_store::EventStore;
use projections::{OrderPage, OrderQuery};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

/// Payment details the client needs to complete payment.
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub intent_id: String,
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: AggregateId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub lines: Vec<OrderLine>,
    pub coupon: Option<AppliedCoupon>,
    pub totals: Totals,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
    pub payment_intent: Option<PaymentIntentResponse>,
    pub payment_setup_error: Option<String>,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub can_be_cancelled: bool,
    pub can_be_refunded: bool,
    pub placed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderResponse {
    pub fn of(order: &Order) -> Result<Self, ApiError> {
        use domain::Aggregate;

        let (Some(id), Some(user_id), Some(order_number)) =
            (order.id(), order.user_id(), order.order_number())
        else {
            return Err(ApiError::Internal("order has not been placed".into()));
        };

        Ok(Self {
            id,
            order_number: order_number.to_string(),
            user_id,
            status: order.status(),
            payment_status: order.payment_status(),
            payment_method: order.payment_method(),
            lines: order.lines().to_vec(),
            coupon: order.coupon().cloned(),
            totals: *order.totals(),
            shipping_address: order.shipping_address().cloned(),
            billing_address: order.billing_address().cloned(),
            notes: order.notes().map(String::from),
            payment_intent: order.payment_intent().map(|intent| PaymentIntentResponse {
                intent_id: intent.intent_id.clone(),
                client_secret: intent.client_secret.clone(),
            }),
            payment_setup_error: order.payment_setup_error().map(String::from),
            tracking_number: order.tracking_number().map(String::from),
            cancellation_reason: order.cancellation_reason().map(String::from),
            can_be_cancelled: order.can_be_cancelled(),
            can_be_refunded: order.can_be_refunded(),
            placed_at: order.placed_at(),
            updated_at: order.updated_at(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /users/{user_id}/orders: checkout.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<UserId>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.checkout.place_order(user_id, req).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::of(&order)?)))
}

/// GET /users/{user_id}/orders?status=&page=&limit=
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<UserId>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<OrderPage>, ApiError> {
    state.refresh_projections().await?;
    let page = state.order_history.orders_for_user(user_id, query).await;
    Ok(Json(page))
}

/// GET /users/{user_id}/orders/{order_id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, order_id)): Path<(UserId, AggregateId)>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .checkout
        .orders()
        .get_order_for_user(user_id, order_id)
        .await?;
    Ok(Json(OrderResponse::of(&order)?))
}

/// POST /users/{user_id}/orders/{order_id}/cancel
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, order_id)): Path<(UserId, AggregateId)>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .checkout
        .cancel_order(user_id, order_id, req.reason)
        .await?;
    Ok(Json(OrderResponse::of(&order)?))
}

/// POST /users/{user_id}/orders/{order_id}/payment/retry
#[tracing::instrument(skip(state))]
pub async fn retry_payment<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, order_id)): Path<(UserId, AggregateId)>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .checkout
        .retry_payment_setup(user_id, order_id)
        .await?;
    Ok(Json(OrderResponse::of(&order)?))
}
