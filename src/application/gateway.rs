use crate::domain::payment::{CheckoutRequest, GatewayError, Payer, VerifiedPayment};
use crate::domain::ports::PaymentProvider;
use crate::domain::reference::{PaymentPurpose, TxRef};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{info, warn};

/// A checkout the payer still has to complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSession {
    pub tx_ref: String,
    pub checkout_url: String,
}

/// Builds references and talks to the payment provider.
#[derive(Clone)]
pub struct GatewayClient {
    provider: Arc<dyn PaymentProvider>,
    last_issued: Arc<AtomicI64>,
}

impl GatewayClient {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            provider,
            last_issued: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Registers a payment with the provider and returns where to pay.
    pub async fn initialize(
        &self,
        purpose: PaymentPurpose,
        amount: Decimal,
        currency: &str,
        payer: Payer,
    ) -> Result<CheckoutSession, GatewayError> {
        if amount <= Decimal::ZERO {
            return Err(GatewayError::InvalidAmount(format!(
                "{amount} is not a payable amount"
            )));
        }
        if currency.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("currency is required".to_string()));
        }
        if payer.name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("payer name is required".to_string()));
        }

        let tx_ref = TxRef::new(purpose, self.next_timestamp());
        let checkout = CheckoutRequest {
            tx_ref,
            amount,
            currency: currency.trim().to_string(),
            payer,
            title: checkout_title(&purpose).to_string(),
        };
        let checkout_url = self.provider.initialize(&checkout).await.inspect_err(|e| {
            warn!(reference = %tx_ref, error = %e, "payment initialization failed");
        })?;
        info!(reference = %tx_ref, %amount, "payment initialized");

        Ok(CheckoutSession {
            tx_ref: tx_ref.to_string(),
            checkout_url,
        })
    }

    pub async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        self.provider.verify(reference).await
    }

    /// Milliseconds since the epoch, strictly increasing across calls so two
    /// checkouts for the same entity never share a reference.
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_issued.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_issued.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}

fn checkout_title(purpose: &PaymentPurpose) -> &'static str {
    match purpose {
        PaymentPurpose::Application(_) => "For Application",
        PaymentPurpose::ConnectPurchase { .. } => "Connect Purchase",
    }
}
