//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pricing::PricedLine;

use super::OrderError;

/// A line item frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl PricedLine for OrderLine {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Postal address captured with the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Address {
    /// Every field must be non-blank.
    pub fn validate(&self) -> Result<(), OrderError> {
        let fields = [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(OrderError::InvalidAddress { field: *field }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    CashOnDelivery,
    BankTransfer,
}

impl PaymentMethod {
    /// Pay-on-delivery orders are settled at the door.
    pub fn requires_payment_intent(&self) -> bool {
        !matches!(self, PaymentMethod::CashOnDelivery)
    }
}

/// Customer-facing order reference, `PN` + unix millis + 3 random digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: u16 = rand::thread_rng().gen_range(0..1000);
        Self(format!("PN{}{suffix:03}", now.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a payment intent held by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRef {
    pub intent_id: String,
    pub client_secret: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            street: "12 Fern Lane".into(),
            city: "Portland".into(),
            state: "OR".into(),
            zip_code: "97201".into(),
            country: "US".into(),
        }
    }

    #[test]
    fn test_address_validation_names_field() {
        assert!(address().validate().is_ok());

        let missing_zip = Address {
            zip_code: "  ".into(),
            ..address()
        };
        assert!(matches!(
            missing_zip.validate(),
            Err(OrderError::InvalidAddress { field: "zip_code" })
        ));
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc::now();
        let number = OrderNumber::generate(now);
        let millis = now.timestamp_millis().to_string();

        assert!(number.as_str().starts_with(&format!("PN{millis}")));
        assert_eq!(number.as_str().len(), 2 + millis.len() + 3);
        assert!(number.as_str()[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_only_cash_on_delivery_skips_payment_intent() {
        assert!(!PaymentMethod::CashOnDelivery.requires_payment_intent());
        for method in [
            PaymentMethod::CreditCard,
            PaymentMethod::DebitCard,
            PaymentMethod::Paypal,
            PaymentMethod::BankTransfer,
        ] {
            assert!(method.requires_payment_intent());
        }
    }
}
