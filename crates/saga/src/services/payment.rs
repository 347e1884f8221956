//! Payment gateway capability and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, Payment, PaymentStatus};

use crate::error::SagaError;

/// External payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a payment.
    ///
    /// On success the gateway records its transaction ID on the payment.
    async fn charge(&self, payment: &mut Payment) -> Result<(), SagaError>;

    /// Refunds `amount` of a previous charge.
    async fn refund(&self, provider_payment_id: &str, amount: Money) -> Result<(), SagaError>;

    /// Returns the gateway's view of a payment.
    async fn status(&self, provider_payment_id: &str) -> Result<PaymentStatus, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    payments: HashMap<String, (Money, PaymentStatus)>,
    charge_calls: usize,
    refund_calls: usize,
    next_id: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline charges.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Configures the gateway to fail refunds.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Number of charge calls, successful or not.
    pub fn charge_calls(&self) -> usize {
        self.state.read().unwrap().charge_calls
    }

    /// Number of refund calls, successful or not.
    pub fn refund_calls(&self) -> usize {
        self.state.read().unwrap().refund_calls
    }

    /// Amount captured for a transaction, if it exists.
    pub fn captured_amount(&self, provider_payment_id: &str) -> Option<Money> {
        self.state
            .read()
            .unwrap()
            .payments
            .get(provider_payment_id)
            .map(|(amount, _)| *amount)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(&self, payment: &mut Payment) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();
        state.charge_calls += 1;

        if state.fail_on_charge {
            return Err(SagaError::Gateway("Payment declined".to_string()));
        }

        state.next_id += 1;
        let provider_payment_id = format!("PAY-{:04}", state.next_id);
        state.payments.insert(
            provider_payment_id.clone(),
            (payment.amount().rounded(), PaymentStatus::Completed),
        );
        payment.set_provider_payment_id(provider_payment_id);
        Ok(())
    }

    async fn refund(&self, provider_payment_id: &str, amount: Money) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();
        state.refund_calls += 1;

        if state.fail_on_refund {
            return Err(SagaError::Gateway("Refund rejected".to_string()));
        }

        let (captured, status) = state
            .payments
            .get_mut(provider_payment_id)
            .ok_or_else(|| SagaError::Gateway(format!("unknown payment {provider_payment_id}")))?;
        if *status == PaymentStatus::Refunded {
            return Err(SagaError::Gateway(format!(
                "payment {provider_payment_id} already refunded"
            )));
        }
        if amount > *captured {
            return Err(SagaError::Gateway(format!(
                "refund {amount} exceeds captured {captured}"
            )));
        }
        *status = PaymentStatus::Refunded;
        Ok(())
    }

    async fn status(&self, provider_payment_id: &str) -> Result<PaymentStatus, SagaError> {
        self.state
            .read()
            .unwrap()
            .payments
            .get(provider_payment_id)
            .map(|(_, status)| *status)
            .ok_or_else(|| SagaError::Gateway(format!("unknown payment {provider_payment_id}")))
    }
}
