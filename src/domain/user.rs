use super::ids::UserId;
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Citizen,
    Officer,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Citizen => "citizen",
            Role::Officer => "officer",
            Role::Admin => "admin",
        };
        f.write_str(label)
    }
}

/// Which users a read may return.
///
/// Deactivated users are hidden from ordinary lookups but must still be
/// reachable when money is owed to them (refunds, purchased connects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    ActiveOnly,
    IncludeInactive,
}

/// A platform user and their connects balance.
///
/// `connects` is unsigned, so a negative balance is unrepresentable; `debit`
/// refuses to go below zero instead of wrapping.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    /// Internal credit balance spent to apply to requests.
    pub connects: u32,
    /// The last connect-purchase reference credited to this user.
    pub last_reconciled_tx_ref: Option<String>,
    pub active: bool,
    /// Optimistic concurrency version, bumped by the store on every commit.
    pub version: u64,
}

impl User {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            phone_number: None,
            role,
            connects: 0,
            last_reconciled_tx_ref: None,
            active: true,
            version: 0,
        }
    }

    pub fn with_connects(mut self, connects: u32) -> Self {
        self.connects = connects;
        self
    }

    pub fn with_phone(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn is_visible(&self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::ActiveOnly => self.active,
            Visibility::IncludeInactive => true,
        }
    }

    /// Removes connects if the balance covers them. Leaves the balance
    /// untouched on failure.
    pub fn debit(&mut self, amount: u32) -> Result<()> {
        if amount > self.connects {
            return Err(PaymentError::InsufficientBalance {
                required: amount,
                available: self.connects,
            });
        }
        self.connects -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: u32) -> Result<()> {
        self.connects = self
            .connects
            .checked_add(amount)
            .ok_or_else(|| PaymentError::internal("connects balance overflow"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_success() {
        let mut user = User::new("Abebe", Role::Officer).with_connects(5);
        user.debit(3).unwrap();
        assert_eq!(user.connects, 2);
    }

    #[test]
    fn test_debit_insufficient_leaves_balance() {
        let mut user = User::new("Abebe", Role::Officer).with_connects(2);
        let result = user.debit(3);
        assert!(matches!(
            result,
            Err(PaymentError::InsufficientBalance {
                required: 3,
                available: 2
            })
        ));
        assert_eq!(user.connects, 2);
    }

    #[test]
    fn test_debit_exact_balance() {
        let mut user = User::new("Abebe", Role::Officer).with_connects(3);
        user.debit(3).unwrap();
        assert_eq!(user.connects, 0);
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let mut user = User::new("Abebe", Role::Officer).with_connects(u32::MAX);
        assert!(user.credit(1).is_err());
        assert_eq!(user.connects, u32::MAX);
    }

    #[test]
    fn test_visibility() {
        let mut user = User::new("Almaz", Role::Citizen);
        assert!(user.is_visible(Visibility::ActiveOnly));
        user.active = false;
        assert!(!user.is_visible(Visibility::ActiveOnly));
        assert!(user.is_visible(Visibility::IncludeInactive));
    }
}
