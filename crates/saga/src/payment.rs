//! Payment lifecycle on top of a payment gateway.

use chrono::Utc;
use common::BookingId;
use domain::{DomainError, Money, Payment, PaymentMethod, PaymentStatus};

use crate::error::{Result, SagaError};
use crate::services::PaymentGateway;

/// Creates, charges, refunds and queries payments.
///
/// Every operation mutates the payment in place; the gateway is the only
/// network boundary. The processor never retries: retry policy belongs to
/// the caller.
pub struct PaymentProcessor<G: PaymentGateway> {
    gateway: G,
    currency: String,
}

impl<G: PaymentGateway> PaymentProcessor<G> {
    /// Creates a processor charging in `currency`.
    pub fn new(gateway: G, currency: impl Into<String>) -> Self {
        Self {
            gateway,
            currency: currency.into(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Creates a pending payment with no provider ID.
    pub fn create(&self, order_id: BookingId, amount: Money, method: PaymentMethod) -> Payment {
        Payment::new(order_id, amount, self.currency.clone(), method)
    }

    /// Charges a pending payment.
    ///
    /// On success the payment is completed and carries the gateway's ID. On
    /// failure it is marked failed with the gateway's reason and the error is
    /// returned.
    #[tracing::instrument(skip(self, payment), fields(payment_id = %payment.id(), order_id = %payment.order_id()))]
    pub async fn charge(&self, payment: &mut Payment) -> Result<()> {
        if payment.status() != PaymentStatus::Pending {
            return Err(DomainError::InvalidPaymentTransition {
                from: payment.status(),
                to: PaymentStatus::Completed,
            }
            .into());
        }

        match self.gateway.charge(payment).await {
            Ok(()) => {
                payment.mark_completed(Utc::now())?;
                metrics::counter!("payments_charged_total").increment(1);
                tracing::info!(
                    provider_payment_id = payment.provider_payment_id().unwrap_or_default(),
                    amount = %payment.amount(),
                    "payment charged"
                );
                Ok(())
            }
            Err(e) => {
                payment.mark_failed(e.to_string())?;
                metrics::counter!("payments_failed_total").increment(1);
                tracing::warn!(error = %e, "payment charge failed");
                Err(e)
            }
        }
    }

    /// Refunds a completed payment in full.
    ///
    /// Fails without calling the gateway unless the payment is completed.
    #[tracing::instrument(skip(self, payment), fields(payment_id = %payment.id(), order_id = %payment.order_id()))]
    pub async fn refund(&self, payment: &mut Payment) -> Result<()> {
        if payment.status() != PaymentStatus::Completed {
            return Err(DomainError::InvalidPaymentTransition {
                from: payment.status(),
                to: PaymentStatus::Refunded,
            }
            .into());
        }

        let provider_payment_id = payment
            .provider_payment_id()
            .ok_or_else(|| SagaError::Inconsistent {
                booking_id: payment.order_id(),
                reason: "completed payment has no provider payment id".to_string(),
            })?
            .to_string();

        self.gateway
            .refund(&provider_payment_id, payment.amount().rounded())
            .await?;

        payment.mark_refunded(Utc::now())?;
        metrics::counter!("payments_refunded_total").increment(1);
        tracing::info!(%provider_payment_id, "payment refunded");
        Ok(())
    }

    /// Returns the gateway's view of a payment.
    ///
    /// A payment the gateway has never seen reports its local status.
    pub async fn status(&self, payment: &Payment) -> Result<PaymentStatus> {
        match payment.provider_payment_id() {
            Some(id) => self.gateway.status(id).await,
            None => Ok(payment.status()),
        }
    }
}
