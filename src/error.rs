use crate::domain::application::ApplicationStatus;
use crate::domain::payment::GatewayError;
use crate::domain::request::RequestStatus;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Insufficient connects: {required} required, {available} available")]
    InsufficientBalance { required: u32, available: u32 },
    #[error("Officer has already applied to this request")]
    DuplicateApplication,
    #[error("Request is {0} and no longer accepts applications")]
    RequestClosed(RequestStatus),
    #[error("Application is already {0}")]
    AlreadyDecided(ApplicationStatus),
    #[error("Request is no longer active")]
    RequestInactive,
    #[error("Payment initialization failed: {0}")]
    PaymentInit(#[source] GatewayError),
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Payment verification failed for {reference}: {reason}")]
    VerificationFailed { reference: String, reason: String },
    #[error("Unrecognized transaction reference: {0}")]
    UnrecognizedReference(String),
    #[error("Paid amount {paid} is below the expected {expected}")]
    AmountMismatch { expected: Decimal, paid: Decimal },
    #[error("Write conflict: {0}")]
    Conflict(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification used by callers that only need to know how to react
/// (reject input, retry later, surface a conflict).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    InsufficientBalance,
    External,
    Internal,
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::UnrecognizedReference(_)
            | Self::AmountMismatch { .. }
            | Self::Csv(_) => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateApplication
            | Self::RequestClosed(_)
            | Self::AlreadyDecided(_)
            | Self::RequestInactive
            | Self::Conflict(_) => ErrorKind::Conflict,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::PaymentInit(_) | Self::Gateway(_) | Self::VerificationFailed { .. } => {
                ErrorKind::External
            }
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
            #[cfg(feature = "storage-rocksdb")]
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(Box::new(std::io::Error::other(message.into())))
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            PaymentError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            PaymentError::AlreadyDecided(ApplicationStatus::Approved).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            PaymentError::InsufficientBalance {
                required: 3,
                available: 1
            }
            .kind(),
            ErrorKind::InsufficientBalance
        );
        assert_eq!(
            PaymentError::Gateway(GatewayError::Unavailable("timeout".into())).kind(),
            ErrorKind::External
        );
        assert_eq!(
            PaymentError::not_found("user", "abc").kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_display_messages() {
        let err = PaymentError::InsufficientBalance {
            required: 3,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient connects: 3 required, 1 available"
        );
        assert_eq!(
            PaymentError::not_found("application", "42").to_string(),
            "application 42 not found"
        );
    }
}
