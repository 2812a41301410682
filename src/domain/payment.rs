use super::reference::TxRef;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
    #[error("invalid payment amount: {0}")]
    InvalidAmount(String),
    #[error("invalid payment request: {0}")]
    InvalidRequest(String),
    #[error("payment gateway rejected the call: {0}")]
    Rejected(String),
    #[error("payment gateway response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Pending,
    Failed,
}

impl PaymentStatus {
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" | "successful" | "completed" => PaymentStatus::Success,
            "pending" => PaymentStatus::Pending,
            _ => PaymentStatus::Failed,
        }
    }
}

/// Who is asked to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payer {
    pub name: String,
    pub phone_number: Option<String>,
}

/// Outbound payment initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub tx_ref: TxRef,
    pub amount: Decimal,
    pub currency: String,
    pub payer: Payer,
    pub title: String,
}

/// Provider-side view of a payment, as returned by its verification endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    /// Reference echoed by the provider, if it sent one back.
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}
