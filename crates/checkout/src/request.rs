//! Checkout input and its structural validation.

use std::collections::HashSet;

use common::ProductId;
use domain::{Address, CartPolicy, PaymentMethod};
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// A product and the quantity the customer wants of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// What the customer submits at checkout.
///
/// An empty `lines` list means "everything in my cart".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub lines: Vec<RequestedLine>,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    pub fn new(shipping_address: Address, payment_method: PaymentMethod) -> Self {
        Self {
            lines: Vec::new(),
            shipping_address,
            billing_address: None,
            payment_method,
            coupon_code: None,
            notes: None,
        }
    }

    pub fn with_line(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.lines.push(RequestedLine {
            product_id,
            quantity,
        });
        self
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    pub fn with_billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks the request's shape without touching any state.
    pub fn validate(&self, policy: &CartPolicy) -> Result<(), CheckoutError> {
        let mut seen = HashSet::with_capacity(self.lines.len());
        for line in &self.lines {
            if line.quantity == 0 || line.quantity > policy.max_quantity {
                return Err(CheckoutError::validation(format!(
                    "quantity {} for product {} is outside 1..={}",
                    line.quantity, line.product_id, policy.max_quantity
                )));
            }
            if !seen.insert(line.product_id) {
                return Err(CheckoutError::validation(format!(
                    "product {} appears more than once",
                    line.product_id
                )));
            }
        }

        self.shipping_address
            .validate()
            .map_err(|e| CheckoutError::validation(format!("shipping address: {e}")))?;
        if let Some(billing) = &self.billing_address {
            billing
                .validate()
                .map_err(|e| CheckoutError::validation(format!("billing address: {e}")))?;
        }

        if self.coupon_code.as_deref().is_some_and(|code| code.trim().is_empty()) {
            return Err(CheckoutError::validation("coupon code is empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            street: "9 Ivy Court".into(),
            city: "Boise".into(),
            state: "ID".into(),
            zip_code: "83702".into(),
            country: "US".into(),
        }
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest::new(address(), PaymentMethod::CreditCard)
    }

    #[test]
    fn test_valid_request() {
        let req = request().with_line(ProductId::new(), 3).with_coupon("save10");
        assert!(req.validate(&CartPolicy::default()).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_products() {
        let id = ProductId::new();
        let req = request().with_line(id, 1).with_line(id, 2);
        let err = req.validate(&CartPolicy::default()).unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(msg) if msg.contains("more than once")));
    }

    #[test]
    fn test_rejects_out_of_range_quantities() {
        let policy = CartPolicy::default();
        assert!(request().with_line(ProductId::new(), 0).validate(&policy).is_err());
        assert!(request().with_line(ProductId::new(), 100).validate(&policy).is_err());
        assert!(request().with_line(ProductId::new(), 99).validate(&policy).is_ok());
    }

    #[test]
    fn test_rejects_incomplete_addresses() {
        let mut req = request();
        req.shipping_address.country = " ".into();
        assert!(req.validate(&CartPolicy::default()).is_err());

        let billing = Address {
            street: String::new(),
            ..address()
        };
        let req = request().with_billing_address(billing);
        let err = req.validate(&CartPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("billing address"));
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let json = serde_json::json!({
            "shipping_address": address(),
            "payment_method": "cash_on_delivery"
        });
        let req: CheckoutRequest = serde_json::from_value(json).unwrap();
        assert!(req.lines.is_empty());
        assert_eq!(req.payment_method, PaymentMethod::CashOnDelivery);
        assert!(req.coupon_code.is_none());
    }
}
