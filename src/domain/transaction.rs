use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

/// The external payment that settled an application. Written once, when the
/// application is approved.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub tx_ref: String,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn settled(
        tx_ref: impl Into<String>,
        amount: Decimal,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if amount < Decimal::ZERO {
            return Err(PaymentError::Validation(
                "transaction amount cannot be negative".to_string(),
            ));
        }
        Ok(Self {
            tx_ref: tx_ref.into(),
            amount,
            status: TransactionStatus::Success,
            paid_at,
        })
    }
}
