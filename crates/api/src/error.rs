//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::DomainError;
use projections::ProjectionError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Checkout(err) => checkout_status(err),
            ApiError::Projection(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::Validation(_)
        | CheckoutError::InvalidCoupon(_)
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::ProductUnavailable { .. } => StatusCode::BAD_REQUEST,
        CheckoutError::NotFound { .. } => StatusCode::NOT_FOUND,
        CheckoutError::InvalidStatusTransition { .. }
        | CheckoutError::InvalidState(_)
        | CheckoutError::Conflict => StatusCode::CONFLICT,
        CheckoutError::PaymentSetupFailed { .. } => StatusCode::BAD_GATEWAY,
        CheckoutError::Domain(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = serde_json::json!({ "error": self.to_string() });

        match &self {
            ApiError::Checkout(err) => {
                body["reason"] = err.reason().into();
                if let CheckoutError::PaymentSetupFailed { order_id, .. } = err {
                    body["order_id"] = order_id.to_string().into();
                }
            }
            ApiError::BadRequest(_) => body["reason"] = "validation".into(),
            ApiError::Projection(_) | ApiError::Internal(_) => {}
        }

        if status.is_server_error() {
            tracing::error!(error = %self, "internal server error");
        }

        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Checkout(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AggregateId, ProductId};
    use domain::{CouponError, OrderStatus};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CheckoutError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                CheckoutError::InvalidCoupon(CouponError::Empty),
                StatusCode::BAD_REQUEST,
            ),
            (
                CheckoutError::InsufficientStock {
                    product_id: ProductId::new(),
                    name: "Fern".into(),
                    requested: 3,
                    available: 1,
                },
                StatusCode::BAD_REQUEST,
            ),
            (CheckoutError::not_found("Order", "x"), StatusCode::NOT_FOUND),
            (
                CheckoutError::InvalidStatusTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Cancelled,
                },
                StatusCode::CONFLICT,
            ),
            (CheckoutError::Conflict, StatusCode::CONFLICT),
            (
                CheckoutError::PaymentSetupFailed {
                    order_id: AggregateId::new(),
                    reason: "down".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_domain_not_found_maps_to_404() {
        let err = ApiError::from(DomainError::not_found("Cart", "abc"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Cart not found: abc");
    }

    #[test]
    fn test_messages_pass_through() {
        let err = ApiError::BadRequest("session_id is required".into());
        assert_eq!(err.to_string(), "session_id is required");

        let err = ApiError::from(CheckoutError::Conflict);
        assert_eq!(err.to_string(), CheckoutError::Conflict.to_string());
        assert!(std::error::Error::source(&ApiError::Internal("boom".into())).is_none());
    }
}
