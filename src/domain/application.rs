use super::ids::{ApplicationId, RequestId, UserId};
use super::request::ServiceRequest;
use super::transaction::Transaction;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// An officer's bid on a service request.
///
/// Lifecycle: `pending -> approved` or `pending -> rejected`; both targets are
/// terminal. While pending, `escrowed_connects` are held against the officer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Application {
    pub id: ApplicationId,
    pub request_id: RequestId,
    pub officer_id: UserId,
    pub price: Decimal,
    pub proposal: String,
    pub status: ApplicationStatus,
    /// Connects debited from the officer when the application was submitted.
    pub escrowed_connects: u32,
    pub transaction: Option<Transaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Application {
    pub fn submit(
        request: &ServiceRequest,
        officer_id: UserId,
        price: Decimal,
        proposal: &str,
    ) -> Result<Self> {
        validate_price(price)?;
        let proposal = validate_proposal(proposal)?;
        let now = Utc::now();
        Ok(Self {
            id: ApplicationId::new(),
            request_id: request.id,
            officer_id,
            price,
            proposal,
            status: ApplicationStatus::Pending,
            escrowed_connects: request.required_connect,
            transaction: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn ensure_pending(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(PaymentError::AlreadyDecided(self.status));
        }
        Ok(())
    }

    /// Moves to `rejected` and returns the connects owed back to the officer.
    pub fn reject(&mut self) -> Result<u32> {
        self.ensure_pending()?;
        self.status = ApplicationStatus::Rejected;
        self.updated_at = Utc::now();
        Ok(self.escrowed_connects)
    }

    /// Moves to `approved`, recording the settling payment. The escrow is
    /// consumed, not refunded.
    pub fn approve(&mut self, transaction: Transaction) -> Result<()> {
        self.ensure_pending()?;
        self.status = ApplicationStatus::Approved;
        self.transaction = Some(transaction);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Lets the officer adjust the bid while it is still pending.
    pub fn revise(&mut self, price: Option<Decimal>, proposal: Option<&str>) -> Result<()> {
        self.ensure_pending()?;
        if let Some(price) = price {
            validate_price(price)?;
        }
        let proposal = proposal.map(validate_proposal).transpose()?;
        if let Some(price) = price {
            self.price = price;
        }
        if let Some(proposal) = proposal {
            self.proposal = proposal;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(PaymentError::Validation(
            "application price must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_proposal(proposal: &str) -> Result<String> {
    let trimmed = proposal.trim();
    if trimmed.is_empty() {
        return Err(PaymentError::Validation("proposal is required".to_string()));
    }
    Ok(trimmed.to_string())
}
