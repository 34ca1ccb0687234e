//! Payment processor trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, UserId};
use domain::PaymentIntentRef;
use thiserror::Error;
use tokio::sync::RwLock;

/// The processor refused or could not be reached.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PaymentError(pub String);

/// Parameters for a new payment intent.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Amount in minor currency units (cents).
    pub amount_minor: i64,
    pub currency: String,
    /// Free-form metadata forwarded to the processor.
    pub metadata: HashMap<String, String>,
}

impl PaymentRequest {
    pub fn for_order(
        order_id: AggregateId,
        order_number: &str,
        user_id: UserId,
        amount_minor: i64,
        currency: &str,
    ) -> Self {
        let metadata = HashMap::from([
            ("order_id".to_string(), order_id.to_string()),
            ("order_number".to_string(), order_number.to_string()),
            ("user_id".to_string(), user_id.to_string()),
        ]);
        Self {
            amount_minor,
            currency: currency.to_string(),
            metadata,
        }
    }
}

/// Creates payment intents with an external processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentIntentRef, PaymentError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    intents: HashMap<String, PaymentRequest>,
    next_id: u32,
    fail_with: Option<String>,
}

/// In-memory payment processor for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProcessor {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `reason`, or succeed again with `None`.
    pub async fn set_failure(&self, reason: Option<&str>) {
        self.state.write().await.fail_with = reason.map(str::to_string);
    }

    pub async fn intent_count(&self) -> usize {
        self.state.read().await.intents.len()
    }

    /// The request behind an intent, if it exists.
    pub async fn intent(&self, intent_id: &str) -> Option<PaymentRequest> {
        self.state.read().await.intents.get(intent_id).cloned()
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_payment_intent(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentIntentRef, PaymentError> {
        let mut state = self.state.write().await;

        if let Some(reason) = &state.fail_with {
            return Err(PaymentError(reason.clone()));
        }

        state.next_id += 1;
        let intent_id = format!("pi_{:06}", state.next_id);
        let intent = PaymentIntentRef {
            client_secret: format!("{intent_id}_secret"),
            intent_id: intent_id.clone(),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
        };
        state.intents.insert(intent_id, request);

        Ok(intent)
    }
}
