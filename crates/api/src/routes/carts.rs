//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{ProductId, UserId};
use domain::{CartOwner, CartView};
use event_store::EventStore;
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

#[derive(Deserialize)]
pub struct MergeCartsRequest {
    pub session_id: String,
    pub user_id: UserId,
}

/// GET /users/{user_id}/cart
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<CartView>, ApiError> {
    let view = state.checkout.carts().get_cart(&CartOwner::User(user_id)).await?;
    Ok(Json(view))
}

/// DELETE /users/{user_id}/cart
#[tracing::instrument(skip(state))]
pub async fn clear<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .checkout
        .carts()
        .clear_cart(&CartOwner::User(user_id))
        .await?;
    Ok(Json(view))
}

/// POST /users/{user_id}/cart/items
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<UserId>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .checkout
        .carts()
        .add_item(&CartOwner::User(user_id), req.product_id, req.quantity)
        .await?;
    Ok(Json(view))
}

/// PATCH /users/{user_id}/cart/items/{product_id}
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, product_id)): Path<(UserId, ProductId)>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .checkout
        .carts()
        .update_item_quantity(&CartOwner::User(user_id), product_id, req.quantity)
        .await?;
    Ok(Json(view))
}

/// DELETE /users/{user_id}/cart/items/{product_id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, product_id)): Path<(UserId, ProductId)>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .checkout
        .carts()
        .remove_item(&CartOwner::User(user_id), product_id)
        .await?;
    Ok(Json(view))
}

/// POST /users/{user_id}/cart/coupon
#[tracing::instrument(skip(state, req))]
pub async fn apply_coupon<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<UserId>,
    Json(req): Json<ApplyCouponRequest>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .checkout
        .carts()
        .apply_coupon(&CartOwner::User(user_id), &req.code)
        .await?;
    Ok(Json(view))
}

/// DELETE /users/{user_id}/cart/coupon
#[tracing::instrument(skip(state))]
pub async fn remove_coupon<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .checkout
        .carts()
        .remove_coupon(&CartOwner::User(user_id))
        .await?;
    Ok(Json(view))
}

/// POST /carts/merge: folds a guest session's cart into a user's cart.
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id))]
pub async fn merge<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<MergeCartsRequest>,
) -> Result<Json<CartView>, ApiError> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("session_id is required".into()));
    }
    let view = state
        .checkout
        .carts()
        .merge_guest_cart(&req.session_id, req.user_id)
        .await?;
    Ok(Json(view))
}
