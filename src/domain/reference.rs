//! Transaction references.
//!
//! A reference is the only piece of domain intent that survives the round trip
//! through the payment gateway, so it has to be self-describing:
//!
//! ```text
//! app-<applicationId>-<timestamp>
//! conn-<userId>-<quantity>-<timestamp>
//! ```
//!
//! Identifiers use the hyphen-free UUID form and the timestamp is milliseconds
//! since the Unix epoch.

use super::ids::{ApplicationId, UserId};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DELIMITER: char = '-';
const APPLICATION_TAG: &str = "app";
const CONNECT_PURCHASE_TAG: &str = "conn";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("unknown reference type `{0}`")]
    UnknownTag(String),
    #[error("malformed reference: {0}")]
    Malformed(String),
}

/// What a payment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentPurpose {
    Application(ApplicationId),
    ConnectPurchase { user: UserId, quantity: u32 },
}

impl PaymentPurpose {
    pub fn tag(&self) -> &'static str {
        match self {
            PaymentPurpose::Application(_) => APPLICATION_TAG,
            PaymentPurpose::ConnectPurchase { .. } => CONNECT_PURCHASE_TAG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxRef {
    pub purpose: PaymentPurpose,
    /// Milliseconds since the Unix epoch; the uniqueness salt.
    pub issued_at: i64,
}

impl TxRef {
    pub fn new(purpose: PaymentPurpose, issued_at: i64) -> Self {
        Self { purpose, issued_at }
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.purpose {
            PaymentPurpose::Application(id) => {
                write!(f, "{APPLICATION_TAG}{DELIMITER}{id}{DELIMITER}{}", self.issued_at)
            }
            PaymentPurpose::ConnectPurchase { user, quantity } => write!(
                f,
                "{CONNECT_PURCHASE_TAG}{DELIMITER}{user}{DELIMITER}{quantity}{DELIMITER}{}",
                self.issued_at
            ),
        }
    }
}

impl FromStr for TxRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ReferenceError::Malformed(String::new()));
        }
        let parts: Vec<&str> = s.split(DELIMITER).collect();
        let malformed = || ReferenceError::Malformed(s.to_string());

        match parts.as_slice() {
            [APPLICATION_TAG, id, issued_at] => {
                let id = id.parse().map_err(|_| malformed())?;
                let issued_at = parse_timestamp(issued_at).ok_or_else(malformed)?;
                Ok(TxRef::new(PaymentPurpose::Application(id), issued_at))
            }
            [CONNECT_PURCHASE_TAG, user, quantity, issued_at] => {
                let user = user.parse().map_err(|_| malformed())?;
                let quantity = quantity
                    .parse::<u32>()
                    .ok()
                    .filter(|q| *q > 0)
                    .ok_or_else(malformed)?;
                let issued_at = parse_timestamp(issued_at).ok_or_else(malformed)?;
                Ok(TxRef::new(
                    PaymentPurpose::ConnectPurchase { user, quantity },
                    issued_at,
                ))
            }
            [APPLICATION_TAG | CONNECT_PURCHASE_TAG, ..] => Err(malformed()),
            [tag, ..] => Err(ReferenceError::UnknownTag((*tag).to_string())),
            [] => Err(malformed()),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_reference_format() {
        let id = ApplicationId::new();
        let reference = TxRef::new(PaymentPurpose::Application(id), 1_700_000_000_123);
        let rendered = reference.to_string();
        assert_eq!(rendered, format!("app-{id}-1700000000123"));
        assert_eq!(rendered.parse::<TxRef>().unwrap(), reference);
    }

    #[test]
    fn test_connect_reference_format() {
        let user = UserId::new();
        let reference = TxRef::new(
            PaymentPurpose::ConnectPurchase { user, quantity: 4 },
            1_700_000_000_999,
        );
        let rendered = reference.to_string();
        assert_eq!(rendered, format!("conn-{user}-4-1700000000999"));
        assert_eq!(rendered.parse::<TxRef>().unwrap(), reference);
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            "refund-abc-1".parse::<TxRef>(),
            Err(ReferenceError::UnknownTag("refund".to_string()))
        );
    }

    #[test]
    fn test_malformed_references() {
        let user = UserId::new();
        for raw in [
            "".to_string(),
            "app".to_string(),
            "app-nothex-123".to_string(),
            format!("app-{user}"),
            format!("app-{user}-12x"),
            format!("conn-{user}-0-123"),
            format!("conn-{user}-four-123"),
            format!("conn-{user}-123"),
            format!("app-{user}-1-2"),
        ] {
            assert!(
                matches!(raw.parse::<TxRef>(), Err(ReferenceError::Malformed(_))),
                "expected {raw:?} to be malformed"
            );
        }
    }

    #[test]
    fn test_hyphenated_uuid_is_not_accepted() {
        let raw = format!("app-{}-1", uuid::Uuid::new_v4().hyphenated());
        assert!(raw.parse::<TxRef>().is_err());
    }
}
